use acor_seir::model::{HarmonicConfig, LossKind, Rate};
use acor_seir::{information_criteria, parse_numeric, AcorError, Bounds, Challenge, Observations, SeirModel};

const FLU: [f64; 15] = [
    1.0, 3.0, 8.0, 28.0, 75.0, 221.0, 281.0, 255.0, 235.0, 190.0, 125.0, 70.0, 28.0, 12.0, 5.0,
];

fn flu_observations() -> Observations {
    Observations::new((0..15).map(f64::from).collect(), FLU.to_vec()).unwrap()
}

#[test]
fn test_default_layout_dimension_and_labels() {
    let model = SeirModel::default();
    assert_eq!(model.dim(), 22);
    let labels = model.labels();
    assert_eq!(labels.len(), 22);
    assert_eq!(labels[0], "beta0");
    assert_eq!(labels.last().map(String::as_str), Some("k"));

    let config = HarmonicConfig::new(2, 1, 0).unwrap();
    assert_eq!(config.dimension(), 3 * 3 + 4);
    let model = SeirModel::new(config).unwrap();
    assert_eq!(model.layout().slot(Rate::Beta).terms(), 2);
    assert_eq!(model.default_bounds().dim(), model.dim());
}

#[test]
fn test_flu_midpoint_fitness() {
    let model = SeirModel::default().with_observations(flu_observations());
    let params = model.default_bounds().midpoint();

    let cost = model.fitness(&params);
    assert!(cost.is_finite());
    assert!(cost >= 0.0);
    // Scoring is a pure function of the parameters.
    assert_eq!(cost, model.score(&params));
    assert_eq!(model.predict_infected(&params).unwrap().len(), FLU.len());
}

#[test]
fn test_losses_rank_perfect_prediction_at_zero() {
    let observed = [1.0, 2.0, 3.0];
    for loss in [LossKind::Mse, LossKind::Mae, LossKind::Huber { delta: 1.0 }] {
        assert_eq!(loss.evaluate(&observed, &observed), 0.0);
        assert!(loss.evaluate(&observed, &[2.0, 3.0, 4.0]) > 0.0);
    }
    assert!(LossKind::Huber { delta: 0.0 }.validate().is_err());
}

#[test]
fn test_invalid_model_configuration() {
    assert!(matches!(
        SeirModel::default().with_population(0),
        Err(AcorError::Configuration(_))
    ));
    assert!(SeirModel::default()
        .with_loss(LossKind::Huber { delta: -1.0 })
        .is_err());
    assert!(Challenge::validate(&SeirModel::default()).is_err());
}

#[test]
fn test_information_criteria() {
    let (aic, bic) = information_criteria(4.0, 7, 15);
    assert!(aic.is_finite() && bic.is_finite());
    // ln(15) > 2, so BIC penalizes the parameter count harder than AIC.
    assert!(bic > aic);

    assert_eq!(information_criteria(0.0, 7, 15), (f64::INFINITY, f64::INFINITY));
    assert_eq!(information_criteria(1.0, 7, 0), (f64::INFINITY, f64::INFINITY));
}

#[test]
fn test_bounds_from_expressions() {
    let bounds = Bounds::from_expressions(&[("-2*pi", "2*pi"), ("0", "1/2")]).unwrap();
    assert!((bounds.high(0) - 2.0 * std::f64::consts::PI).abs() < 1e-12);
    assert_eq!(bounds.high(1), 0.5);

    assert!(Bounds::from_expressions(&[("1", "0")]).is_err());
    assert!(matches!(parse_numeric("2 +"), Err(AcorError::Expression(_))));
    assert_eq!(parse_numeric(" (1 + 2) * 3 ").unwrap(), 9.0);
}
