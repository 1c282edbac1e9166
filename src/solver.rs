//! Iterative sparse linear solvers.
//!
//! Once specialized, the Poisson system is no longer symmetric: identity rows
//! drop their neighbor couplings but those neighbors still couple back to
//! them. Conjugate gradient is therefore out; the default is Jacobi
//! preconditioned BiCGSTAB, with successive over-relaxation as a simpler
//! alternative. Both converge here because every row is diagonally dominant
//! and every weakly dominant row chains to a strictly dominant one (an
//! identity row or the canvas edge).

use tracing::debug;

use crate::sparse::CsrMatrix;

/// Failures reported by the linear solvers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    /// The relative residual did not drop below the tolerance in time.
    #[error("no convergence after {iterations} iterations (relative residual {residual:e})")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Relative residual `||b - Ax|| / ||b||` at the last iterate.
        residual: f64,
    },

    /// BiCGSTAB hit a zero inner product and cannot continue.
    #[error("solver breakdown at iteration {iteration}")]
    Breakdown {
        /// Iteration at which the breakdown was detected.
        iteration: usize,
    },

    /// A row has a zero (or missing) diagonal, so the system is singular for
    /// these methods.
    #[error("zero diagonal in row {row}")]
    ZeroDiagonal {
        /// Offending row.
        row: usize,
    },

    /// The right-hand side or initial guess does not match the matrix.
    #[error("dimension mismatch: matrix is {rows}x{cols}, vector has {len} entries")]
    DimensionMismatch {
        /// Matrix rows.
        rows: usize,
        /// Matrix columns.
        cols: usize,
        /// Offending vector length.
        len: usize,
    },
}

/// Which iterative method to run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SolverKind {
    /// Jacobi-preconditioned BiCGSTAB.
    #[default]
    BiCgStab,
    /// Gauss-Seidel with over-relaxation factor `omega` in `(0, 2)`.
    /// `omega = 1` is plain Gauss-Seidel.
    GaussSeidel {
        /// Relaxation factor.
        omega: f64,
    },
}

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Method to use.
    pub kind: SolverKind,
    /// Target relative residual `||b - Ax|| / ||b||`.
    pub tolerance: f64,
    /// Iteration cap; exceeding it is reported as [`SolveError::NotConverged`].
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::default(),
            tolerance: 1e-10,
            max_iterations: 10_000,
        }
    }
}

/// A converged solution plus how it was reached.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The solution vector.
    pub x: Vec<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
}

/// Solve `a * x = b` starting from `x0` (zeros when `None`).
///
/// # Errors
///
/// Returns a [`SolveError`] on dimension mismatch, zero diagonal, breakdown,
/// or when `config.max_iterations` is exhausted.
pub fn solve(
    a: &CsrMatrix,
    b: &[f64],
    x0: Option<&[f64]>,
    config: &SolverConfig,
) -> Result<Solution, SolveError> {
    check_len(a, b.len())?;
    if let Some(x0) = x0 {
        check_len(a, x0.len())?;
    }
    if a.rows() != a.cols() {
        return Err(SolveError::DimensionMismatch {
            rows: a.rows(),
            cols: a.cols(),
            len: b.len(),
        });
    }

    let inv_diag = inverse_diagonal(a)?;

    let b_norm = norm(b);
    if b_norm == 0.0 {
        return Ok(Solution {
            x: vec![0.0; b.len()],
            iterations: 0,
            residual: 0.0,
        });
    }

    let x = x0.map_or_else(|| vec![0.0; b.len()], <[f64]>::to_vec);

    let solution = match config.kind {
        SolverKind::BiCgStab => bicgstab(a, b, x, &inv_diag, b_norm, config)?,
        SolverKind::GaussSeidel { omega } => sor(a, b, x, &inv_diag, omega, b_norm, config)?,
    };
    debug!(
        iterations = solution.iterations,
        residual = solution.residual,
        kind = ?config.kind,
        "linear solve converged"
    );
    Ok(solution)
}

fn check_len(a: &CsrMatrix, len: usize) -> Result<(), SolveError> {
    if len == a.rows() {
        Ok(())
    } else {
        Err(SolveError::DimensionMismatch {
            rows: a.rows(),
            cols: a.cols(),
            len,
        })
    }
}

fn inverse_diagonal(a: &CsrMatrix) -> Result<Vec<f64>, SolveError> {
    (0..a.rows())
        .map(|r| {
            let d = a.diagonal(r);
            if d == 0.0 {
                Err(SolveError::ZeroDiagonal { row: r })
            } else {
                Ok(1.0 / d)
            }
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

fn residual_into(a: &CsrMatrix, b: &[f64], x: &[f64], r: &mut [f64]) {
    a.mul_vec_into(x, r);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }
}

/// Right-preconditioned BiCGSTAB with `M = diag(A)`.
#[allow(clippy::needless_range_loop)]
fn bicgstab(
    a: &CsrMatrix,
    b: &[f64],
    mut x: Vec<f64>,
    inv_diag: &[f64],
    b_norm: f64,
    config: &SolverConfig,
) -> Result<Solution, SolveError> {
    let n = b.len();
    let mut r = vec![0.0; n];
    residual_into(a, b, &x, &mut r);

    let mut rel = norm(&r) / b_norm;
    if rel <= config.tolerance {
        return Ok(Solution {
            x,
            iterations: 0,
            residual: rel,
        });
    }

    let r_hat = r.clone();
    let mut p = vec![0.0; n];
    let mut v = vec![0.0; n];
    let mut y = vec![0.0; n];
    let mut s = vec![0.0; n];
    let mut z = vec![0.0; n];
    let mut t = vec![0.0; n];
    let (mut rho, mut alpha, mut omega) = (1.0_f64, 1.0_f64, 1.0_f64);

    for iteration in 1..=config.max_iterations {
        let rho_next = dot(&r_hat, &r);
        if rho_next == 0.0 || omega == 0.0 {
            return Err(SolveError::Breakdown { iteration });
        }
        let beta = (rho_next / rho) * (alpha / omega);
        rho = rho_next;

        for i in 0..n {
            p[i] = r[i] + beta * (p[i] - omega * v[i]);
            y[i] = inv_diag[i] * p[i];
        }
        a.mul_vec_into(&y, &mut v);

        let rv = dot(&r_hat, &v);
        if rv == 0.0 {
            return Err(SolveError::Breakdown { iteration });
        }
        alpha = rho / rv;

        for i in 0..n {
            s[i] = r[i] - alpha * v[i];
        }
        rel = norm(&s) / b_norm;
        if rel <= config.tolerance {
            for i in 0..n {
                x[i] += alpha * y[i];
            }
            return Ok(Solution {
                x,
                iterations: iteration,
                residual: rel,
            });
        }

        for i in 0..n {
            z[i] = inv_diag[i] * s[i];
        }
        a.mul_vec_into(&z, &mut t);
        let tt = dot(&t, &t);
        if tt == 0.0 {
            return Err(SolveError::Breakdown { iteration });
        }
        omega = dot(&t, &s) / tt;

        for i in 0..n {
            x[i] += alpha * y[i] + omega * z[i];
            r[i] = s[i] - omega * t[i];
        }

        rel = norm(&r) / b_norm;
        if rel <= config.tolerance {
            return Ok(Solution {
                x,
                iterations: iteration,
                residual: rel,
            });
        }
    }

    Err(SolveError::NotConverged {
        iterations: config.max_iterations,
        residual: rel,
    })
}

/// Successive over-relaxation sweeps in natural (row-major) order.
fn sor(
    a: &CsrMatrix,
    b: &[f64],
    mut x: Vec<f64>,
    inv_diag: &[f64],
    omega: f64,
    b_norm: f64,
    config: &SolverConfig,
) -> Result<Solution, SolveError> {
    let mut r = vec![0.0; b.len()];
    residual_into(a, b, &x, &mut r);
    let mut rel = norm(&r) / b_norm;
    if rel <= config.tolerance {
        return Ok(Solution {
            x,
            iterations: 0,
            residual: rel,
        });
    }

    for iteration in 1..=config.max_iterations {
        for i in 0..b.len() {
            let (cols, vals) = a.row(i);
            let off_diag: f64 = cols
                .iter()
                .zip(vals)
                .filter(|&(&c, _)| c != i)
                .map(|(&c, &v)| v * x[c])
                .sum();
            let gs = (b[i] - off_diag) * inv_diag[i];
            x[i] += omega * (gs - x[i]);
        }

        residual_into(a, b, &x, &mut r);
        rel = norm(&r) / b_norm;
        if rel <= config.tolerance {
            return Ok(Solution {
                x,
                iterations: iteration,
                residual: rel,
            });
        }
    }

    Err(SolveError::NotConverged {
        iterations: config.max_iterations,
        residual: rel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::build_base_operator;

    fn tridiagonal(n: usize) -> CsrMatrix {
        CsrMatrix::from_rows(
            n,
            (0..n).map(|i| {
                let mut row = vec![(i, 4.0)];
                if i > 0 {
                    row.push((i - 1, -1.0));
                }
                if i + 1 < n {
                    row.push((i + 1, -2.0));
                }
                row
            }),
        )
    }

    fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn bicgstab_solves_nonsymmetric_system() {
        let a = tridiagonal(20);
        #[allow(clippy::cast_precision_loss)]
        let expected: Vec<f64> = (0..20).map(|i| (i as f64).sin() * 50.0).collect();
        let b = a.mul_vec(&expected);
        let sol = solve(&a, &b, None, &SolverConfig::default()).unwrap();
        assert!(max_abs_diff(&sol.x, &expected) < 1e-6);
        assert!(sol.residual <= 1e-10);
    }

    #[test]
    fn gauss_seidel_agrees_with_bicgstab() {
        let a = build_base_operator(6, 7).unwrap();
        let b: Vec<f64> = (0..42).map(|i| f64::from(i % 5) * 10.0 + 1.0).collect();

        let krylov = solve(&a, &b, None, &SolverConfig::default()).unwrap();
        let sor_cfg = SolverConfig {
            kind: SolverKind::GaussSeidel { omega: 1.5 },
            ..SolverConfig::default()
        };
        let sor = solve(&a, &b, None, &sor_cfg).unwrap();
        assert!(max_abs_diff(&krylov.x, &sor.x) < 1e-6);
    }

    #[test]
    fn zero_rhs_short_circuits() {
        let a = tridiagonal(5);
        let sol = solve(&a, &[0.0; 5], None, &SolverConfig::default()).unwrap();
        assert_eq!(sol.iterations, 0);
        assert!(sol.x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn exact_initial_guess_needs_no_iterations() {
        let a = tridiagonal(4);
        let x = [1.0, 2.0, 3.0, 4.0];
        let b = a.mul_vec(&x);
        let sol = solve(&a, &b, Some(&x), &SolverConfig::default()).unwrap();
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let a = build_base_operator(10, 10).unwrap();
        let b = vec![1.0; 100];
        let cfg = SolverConfig {
            kind: SolverKind::GaussSeidel { omega: 1.0 },
            tolerance: 1e-14,
            max_iterations: 2,
        };
        let err = solve(&a, &b, None, &cfg).unwrap_err();
        assert!(matches!(err, SolveError::NotConverged { iterations: 2, .. }));
    }

    #[test]
    fn zero_diagonal_is_rejected() {
        let a = CsrMatrix::from_rows(2, vec![vec![(1, 1.0)], vec![(1, 1.0)]]);
        let err = solve(&a, &[1.0, 1.0], None, &SolverConfig::default()).unwrap_err();
        assert_eq!(err, SolveError::ZeroDiagonal { row: 0 });
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let a = tridiagonal(3);
        let err = solve(&a, &[1.0, 2.0], None, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::DimensionMismatch { len: 2, .. }));
    }
}
