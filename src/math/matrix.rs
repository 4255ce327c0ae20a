use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Dense row-major matrix. Weight matrices are stored as `[inputs][outputs]`,
/// so a layer's forward pass is the row vector `x` times the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Builds a matrix from row data. An empty `data` yields a 0×0 matrix.
    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        Matrix {
            rows: data.len(),
            cols: data.first().map(|r| r.len()).unwrap_or(0),
            data,
        }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Both uniforms in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Fills a `rows × cols` matrix with N(0, 1) noise scaled by `scale`.
    pub fn gaussian<R: Rng + ?Sized>(rows: usize, cols: usize, scale: f64, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = Matrix::sample_standard_normal(rng) * scale;
            }
        }
        res
    }

    /// Row vector times matrix: `out[j] = Σ_i x[i] · self[i][j]`.
    ///
    /// Caller guarantees `x.len() == self.rows`.
    pub fn vec_mul(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.cols];
        for (xi, row) in x.iter().zip(self.data.iter()) {
            for (o, w) in out.iter_mut().zip(row.iter()) {
                *o += xi * w;
            }
        }
        out
    }

    /// Matrix times column vector: `out[i] = Σ_j self[i][j] · v[j]`.
    ///
    /// Caller guarantees `v.len() == self.cols`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        self.data
            .iter()
            .map(|row| row.iter().zip(v.iter()).map(|(w, x)| w * x).sum())
            .collect()
    }

    /// Outer product `a ⊗ b`, shape `[a.len()][b.len()]`.
    pub fn outer(a: &[f64], b: &[f64]) -> Matrix {
        Matrix::from_data(
            a.iter()
                .map(|x| b.iter().map(|y| x * y).collect())
                .collect(),
        )
    }

    pub fn same_shape(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|row| row.iter().all(|x| x.is_finite()))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn vec_mul_uses_input_by_output_layout() {
        let m = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(m.vec_mul(&[1.0, 1.0]), vec![5.0, 7.0, 9.0]);
        assert_eq!(m.mul_vec(&[1.0, 0.0, 1.0]), vec![4.0, 10.0]);
    }

    #[test]
    fn outer_product_shape() {
        let o = Matrix::outer(&[1.0, 2.0], &[3.0, 4.0, 5.0]);
        assert_eq!((o.rows, o.cols), (2, 3));
        assert_eq!(o.data[1], vec![6.0, 8.0, 10.0]);
        assert!(o.same_shape(&Matrix::zeros(2, 3)));
    }

    #[test]
    fn gaussian_is_seeded_and_scaled() {
        let a = Matrix::gaussian(4, 4, 0.5, &mut StdRng::seed_from_u64(7));
        let b = Matrix::gaussian(4, 4, 0.5, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.is_finite());
        let zero = Matrix::gaussian(3, 2, 0.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(zero, Matrix::zeros(3, 2));
    }
}
