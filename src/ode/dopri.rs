//! Dormand–Prince 5(4) embedded Runge–Kutta pair.

use super::{IntegrationError, OdeSystem, Stepper};

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights, also the last stage row (FSAL).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the fifth- and fourth-order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Explicit adaptive Dormand–Prince stepper.
#[derive(Debug, Clone, Copy, Default)]
pub struct DormandPrince;

impl<const N: usize> Stepper<N> for DormandPrince {
    const ORDER: i32 = 4;

    fn attempt<F: OdeSystem<N>>(
        &self,
        system: &F,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> Result<([f64; N], [f64; N]), IntegrationError> {
        let stage = |coeffs: &[(f64, &[f64; N])]| -> [f64; N] {
            let mut out = *y;
            for (a, k) in coeffs {
                for i in 0..N {
                    out[i] += h * a * k[i];
                }
            }
            out
        };

        let k1 = system.rhs(t, y);
        let k2 = system.rhs(t + C2 * h, &stage(&[(A21, &k1)]));
        let k3 = system.rhs(t + C3 * h, &stage(&[(A31, &k1), (A32, &k2)]));
        let k4 = system.rhs(t + C4 * h, &stage(&[(A41, &k1), (A42, &k2), (A43, &k3)]));
        let k5 = system.rhs(
            t + C5 * h,
            &stage(&[(A51, &k1), (A52, &k2), (A53, &k3), (A54, &k4)]),
        );
        let k6 = system.rhs(
            t + h,
            &stage(&[(A61, &k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)]),
        );
        let y_new = stage(&[(B1, &k1), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)]);
        let k7 = system.rhs(t + h, &y_new);

        let mut err = [0.0; N];
        for i in 0..N {
            err[i] = h
                * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
        }

        Ok((y_new, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Linear;

    impl OdeSystem<1> for Linear {
        fn rhs(&self, t: f64, _y: &[f64; 1]) -> [f64; 1] {
            [4.0 * t.powi(3)]
        }
    }

    #[test]
    fn test_quartic_integrand_is_exact() {
        // A fifth-order method integrates y' = 4t^3 exactly.
        let (y, err) = DormandPrince.attempt(&Linear, 0.0, &[0.0], 0.5).unwrap();
        assert!((y[0] - 0.0625).abs() < 1e-14);
        assert!(err[0].abs() < 1e-12);
    }

    #[test]
    fn test_weights_are_consistent() {
        assert!((B1 + B3 + B4 + B5 + B6 - 1.0).abs() < 1e-14);
        assert!((E1 + E3 + E4 + E5 + E6 + E7).abs() < 1e-14);
    }
}
