//! Two-component principal component projection used by the report scatter plot
//!
//! The covariance matrix is built with faer; the leading eigenvectors come from
//! power iteration with deflation, which is deterministic for a fixed input and
//! plenty for a handful of features.

use faer::Mat;
use serde::Serialize;

use super::error::CascadeError;

const N_COMPONENTS: usize = 2;
const MAX_POWER_ITERATIONS: usize = 1_000;
const POWER_TOLERANCE: f64 = 1e-12;

/// Fitted projection onto the first two principal axes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pca {
    mean: Vec<f64>,
    components: Vec<Vec<f64>>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, CascadeError> {
        if rows.len() < 2 {
            return Err(CascadeError::InsufficientData(format!(
                "PCA needs at least 2 rows, got {}",
                rows.len()
            )));
        }
        let d = rows[0].len();
        if d < N_COMPONENTS {
            return Err(CascadeError::InsufficientData(format!(
                "PCA needs at least {} features, got {}",
                N_COMPONENTS, d
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != d) {
            return Err(CascadeError::ShapeMismatch {
                expected: d,
                found: row.len(),
            });
        }

        let n = rows.len();
        let mut mean = vec![0.0; d];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);

        let mut centered = Mat::<f64>::zeros(n, d);
        for (i, row) in rows.iter().enumerate() {
            for (j, (v, m)) in row.iter().zip(&mean).enumerate() {
                centered[(i, j)] = v - m;
            }
        }

        let mut cov = centered.transpose() * &centered;
        let denom = (n - 1) as f64;
        for i in 0..d {
            for j in 0..d {
                cov[(i, j)] /= denom;
            }
        }
        let total_variance: f64 = (0..d).map(|i| cov[(i, i)]).sum();

        let mut components = Vec::with_capacity(N_COMPONENTS);
        let mut explained_variance = Vec::with_capacity(N_COMPONENTS);
        for _ in 0..N_COMPONENTS {
            let (eigenvalue, vector) = leading_eigenpair(&cov);
            deflate(&mut cov, eigenvalue, &vector);
            explained_variance.push(eigenvalue.max(0.0));
            components.push(vector);
        }

        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| {
                if total_variance > 0.0 {
                    v / total_variance
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Self {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// Principal axes, one unit vector per component
    pub fn components(&self) -> &[Vec<f64>] {
        &self.components
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    /// Share of total variance captured by each component
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<[f64; 2], CascadeError> {
        if row.len() != self.mean.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: self.mean.len(),
                found: row.len(),
            });
        }
        let project = |component: &[f64]| -> f64 {
            row.iter()
                .zip(&self.mean)
                .zip(component)
                .map(|((v, m), c)| (v - m) * c)
                .sum()
        };
        Ok([project(&self.components[0]), project(&self.components[1])])
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>, CascadeError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

/// Dominant eigenpair of a symmetric PSD matrix by power iteration.
/// The returned vector has unit length and its largest-magnitude entry positive.
fn leading_eigenpair(matrix: &Mat<f64>) -> (f64, Vec<f64>) {
    let d = matrix.nrows();
    // Uneven start so it is unlikely to be orthogonal to the dominant axis
    let mut v: Vec<f64> = (0..d).map(|i| 1.0 + 0.1 * i as f64).collect();
    normalize(&mut v);

    for _ in 0..MAX_POWER_ITERATIONS {
        let mut next = multiply(matrix, &v);
        if normalize(&mut next) == 0.0 {
            // Remaining spectrum is zero; any unit vector will do
            return (0.0, orient(v));
        }
        let shift: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if shift < POWER_TOLERANCE {
            break;
        }
    }

    let mv = multiply(matrix, &v);
    let eigenvalue: f64 = v.iter().zip(&mv).map(|(a, b)| a * b).sum();
    (eigenvalue, orient(v))
}

/// Remove an eigenpair from the matrix: A <- A - lambda * v v'
fn deflate(matrix: &mut Mat<f64>, eigenvalue: f64, vector: &[f64]) {
    let d = matrix.nrows();
    for i in 0..d {
        for j in 0..d {
            matrix[(i, j)] -= eigenvalue * vector[i] * vector[j];
        }
    }
}

fn multiply(matrix: &Mat<f64>, v: &[f64]) -> Vec<f64> {
    (0..matrix.nrows())
        .map(|i| (0..matrix.ncols()).map(|j| matrix[(i, j)] * v[j]).sum())
        .collect()
}

/// Scale to unit length in place, returning the original norm
fn normalize(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

fn orient(mut v: Vec<f64>) -> Vec<f64> {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_aligned_data() {
        // Variance 4 along x, 1 along y
        let rows = vec![
            vec![-2.0, 0.0],
            vec![2.0, 0.0],
            vec![0.0, -1.0],
            vec![0.0, 1.0],
        ];
        let pca = Pca::fit(&rows).unwrap();

        assert!((pca.components()[0][0] - 1.0).abs() < 1e-9);
        assert!(pca.components()[0][1].abs() < 1e-9);
        assert!((pca.components()[1][1].abs() - 1.0).abs() < 1e-9);
        assert!((pca.explained_variance_ratio()[0] - 0.8).abs() < 1e-9);
        assert!((pca.explained_variance_ratio()[1] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_components_are_orthonormal() {
        let rows = crate::pipeline::iris::load_iris().features;
        let pca = Pca::fit(&rows).unwrap();
        let [a, b] = [&pca.components()[0], &pca.components()[1]];

        let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        assert!(dot.abs() < 1e-6);
        assert!((a.iter().map(|x| x * x).sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(pca.explained_variance()[0] >= pca.explained_variance()[1]);
    }

    #[test]
    fn test_iris_first_component_dominates() {
        let rows = crate::pipeline::iris::load_iris().features;
        let pca = Pca::fit(&rows).unwrap();
        // Raw Iris: PC1 explains about 92% of the variance
        assert!(pca.explained_variance_ratio()[0] > 0.9);
    }

    #[test]
    fn test_projection_is_centered() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![2.0, 1.0, 0.0], vec![4.0, 4.0, 1.0]];
        let pca = Pca::fit(&rows).unwrap();
        let projected = pca.transform(&rows).unwrap();
        let sum0: f64 = projected.iter().map(|p| p[0]).sum();
        assert!(sum0.abs() < 1e-9);
    }

    #[test]
    fn test_sign_is_normalized() {
        let rows = vec![vec![-1.0, -3.0], vec![1.0, 3.0], vec![0.5, 1.4]];
        let pca = Pca::fit(&rows).unwrap();
        let c = &pca.components()[0];
        let largest = if c[0].abs() > c[1].abs() { c[0] } else { c[1] };
        assert!(largest > 0.0);
    }

    #[test]
    fn test_fit_rejects_tiny_inputs() {
        assert!(Pca::fit(&[vec![1.0, 2.0]]).is_err());
        assert!(Pca::fit(&[vec![1.0], vec![2.0]]).is_err());
    }

    #[test]
    fn test_transform_wrong_width() {
        let pca = Pca::fit(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0]]).unwrap();
        assert!(matches!(
            pca.transform_row(&[1.0]),
            Err(CascadeError::ShapeMismatch { .. })
        ));
    }
}
