//! Linearly-implicit Rosenbrock 2(3) stepper (Shampine & Reichelt's
//! `ode23s` scheme) with a finite-difference Jacobian.

use super::{IntegrationError, OdeSystem, Stepper};

/// Implicit stepper for stiff regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock23;

impl<const N: usize> Stepper<N> for Rosenbrock23 {
    const ORDER: i32 = 2;

    fn attempt<F: OdeSystem<N>>(
        &self,
        system: &F,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> Result<([f64; N], [f64; N]), IntegrationError> {
        let d = 1.0 / (2.0 + std::f64::consts::SQRT_2);
        let e32 = 6.0 + std::f64::consts::SQRT_2;

        let f0 = system.rhs(t, y);
        let jac = jacobian(system, t, y, &f0);
        let dt = f64::EPSILON.sqrt() * t.abs().max(1.0);
        let f_t = system.rhs(t + dt, y);
        let mut time_deriv = [0.0; N];
        for i in 0..N {
            time_deriv[i] = (f_t[i] - f0[i]) / dt;
        }

        // W = I - h d J
        let mut w = [[0.0; N]; N];
        for i in 0..N {
            for j in 0..N {
                let identity = if i == j { 1.0 } else { 0.0 };
                w[i][j] = identity - h * d * jac[i][j];
            }
        }
        let lu = Lu::factorize(w).ok_or(IntegrationError::SingularMatrix { t })?;

        let mut rhs1 = [0.0; N];
        for i in 0..N {
            rhs1[i] = f0[i] + h * d * time_deriv[i];
        }
        let k1 = lu.solve(rhs1);

        let mut mid = *y;
        for i in 0..N {
            mid[i] += 0.5 * h * k1[i];
        }
        let f1 = system.rhs(t + 0.5 * h, &mid);
        let mut rhs2 = [0.0; N];
        for i in 0..N {
            rhs2[i] = f1[i] - k1[i];
        }
        let mut k2 = lu.solve(rhs2);
        for i in 0..N {
            k2[i] += k1[i];
        }

        let mut y_new = *y;
        for i in 0..N {
            y_new[i] += h * k2[i];
        }
        let f2 = system.rhs(t + h, &y_new);
        let mut rhs3 = [0.0; N];
        for i in 0..N {
            rhs3[i] = f2[i] - e32 * (k2[i] - f1[i]) - 2.0 * (k1[i] - f0[i]) + h * d * time_deriv[i];
        }
        let k3 = lu.solve(rhs3);

        let mut err = [0.0; N];
        for i in 0..N {
            err[i] = h / 6.0 * (k1[i] - 2.0 * k2[i] + k3[i]);
        }

        Ok((y_new, err))
    }
}

/// Forward-difference Jacobian `J[i][j] = df_i / dy_j`.
fn jacobian<const N: usize, F: OdeSystem<N>>(
    system: &F,
    t: f64,
    y: &[f64; N],
    f0: &[f64; N],
) -> [[f64; N]; N] {
    let mut jac = [[0.0; N]; N];
    let sqrt_eps = f64::EPSILON.sqrt();
    for j in 0..N {
        let delta = sqrt_eps * y[j].abs().max(1e-5);
        let mut shifted = *y;
        shifted[j] += delta;
        let f = system.rhs(t, &shifted);
        for i in 0..N {
            jac[i][j] = (f[i] - f0[i]) / delta;
        }
    }
    jac
}

/// LU factorization with partial pivoting of a small dense matrix.
struct Lu<const N: usize> {
    lu: [[f64; N]; N],
    perm: [usize; N],
}

impl<const N: usize> Lu<N> {
    fn factorize(mut a: [[f64; N]; N]) -> Option<Self> {
        let mut perm = [0usize; N];
        for (i, p) in perm.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..N {
            let mut pivot_row = k;
            let mut pivot_abs = a[k][k].abs();
            for r in (k + 1)..N {
                if a[r][k].abs() > pivot_abs {
                    pivot_abs = a[r][k].abs();
                    pivot_row = r;
                }
            }
            if !pivot_abs.is_finite() || pivot_abs < 1e-300 {
                return None;
            }
            a.swap(k, pivot_row);
            perm.swap(k, pivot_row);

            for r in (k + 1)..N {
                let factor = a[r][k] / a[k][k];
                a[r][k] = factor;
                for c in (k + 1)..N {
                    a[r][c] -= factor * a[k][c];
                }
            }
        }

        Some(Self { lu: a, perm })
    }

    fn solve(&self, b: [f64; N]) -> [f64; N] {
        let mut x = [0.0; N];
        for i in 0..N {
            x[i] = b[self.perm[i]];
        }
        // Forward substitution with the unit lower triangle.
        for i in 0..N {
            for j in 0..i {
                x[i] -= self.lu[i][j] * x[j];
            }
        }
        for i in (0..N).rev() {
            for j in (i + 1)..N {
                x[i] -= self.lu[i][j] * x[j];
            }
            x[i] /= self.lu[i][i];
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lu_solves_permuted_system() {
        let a = [[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let lu = Lu::factorize(a).unwrap();
        let x = lu.solve([5.0, 3.0, 6.0]);
        for (row, b) in a.iter().zip([5.0, 3.0, 6.0]) {
            let lhs: f64 = row.iter().zip(&x).map(|(r, v)| r * v).sum();
            assert!((lhs - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_lu_detects_singular_matrix() {
        let a = [[1.0, 2.0], [2.0, 4.0]];
        assert!(Lu::factorize(a).is_none());
    }

    struct Stiff;

    impl OdeSystem<1> for Stiff {
        fn rhs(&self, _t: f64, y: &[f64; 1]) -> [f64; 1] {
            [-1.0e6 * y[0]]
        }
    }

    #[test]
    fn test_large_step_on_stiff_decay_stays_bounded() {
        // An explicit method would explode with h = 0.1 here.
        let (y, _) = Rosenbrock23.attempt(&Stiff, 0.0, &[1.0], 0.1).unwrap();
        assert!(y[0].abs() < 1.0);
    }
}
