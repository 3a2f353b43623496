//! Dense symmetric solves for the normal equations.

use ndarray::{Array1, Array2};

/// Relative ridge added to the diagonal when a system is not positive definite.
const RIDGE_SCALE: f64 = 1e-8;

/// Solve `a x = b` for a symmetric positive (semi-)definite `a`.
///
/// Tries a plain Cholesky factorization first. A singular or indefinite `a`
/// is retried once with a tiny ridge on the diagonal, scaled to the mean
/// diagonal magnitude. Returns `None` if that still fails.
pub fn solve_symmetric(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    if n == 0 {
        return Some(Array1::zeros(0));
    }

    if let Some(l) = cholesky(a) {
        return Some(substitute(&l, b));
    }

    let mean_diag = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
    let ridge = RIDGE_SCALE * mean_diag.max(1.0);
    let mut regularized = a.clone();
    for k in 0..n {
        regularized[[k, k]] += ridge;
    }
    cholesky(&regularized).map(|l| substitute(&l, b))
}

/// Lower-triangular `l` with `a = l lᵀ`, or `None` if a pivot is not positive.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if !diag.is_finite() || diag <= 0.0 {
                    return None;
                }
                l[[i, i]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Forward then backward substitution through `l` and `lᵀ`.
fn substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}
