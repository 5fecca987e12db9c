use std::ops::{Add, Mul};

use rand_distr::{Distribution, Uniform};
use tracing::debug;

use crate::error::{FixtureError, Result};
use crate::nn::convolution2d::Dimensions;

/// Arithmetic used while sliding the kernel.
/// Values are always stored as f64; `F32` narrows them first and widens the result,
/// the way a single precision layer does when its output is read back as double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    F32,
    F64,
}

/// Matrix is implemented as a single dimensional vector of f64s.
/// This implementation of Matrix is row-major, which is also the C order npy files use.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Matrix {
    rows: usize,
    columns: usize,
    values: Vec<f64>
}

impl Matrix {
    /// Returns size of underlying vector.
    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Returns number of rows this matrix has.
    pub fn row_count(&self) -> usize { self.rows }

    /// Returns number of columns this matrix has.
    pub fn column_count(&self) -> usize { self.columns }

    pub fn shape(&self) -> (usize, usize) { (self.rows, self.columns) }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions { height: self.rows, width: self.columns }
    }

    /// Returns a slice of the values this matrix has.
    pub fn read_values(&self) -> &[f64] { &self.values }

    /// Returns a new Matrix.
    /// Panics if the values don't fill the shape exactly.
    pub fn new(rows: usize, columns: usize, values: Vec<f64>) -> Self {
        assert_eq!(rows * columns, values.len(), "The length of matrix values doesn't match its shape.");

        Self {
            rows, columns, values
        }
    }

    /// Builds a matrix from nested rows, e.g. the fixture constants.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let columns = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if columns == 0 {
            return Err(FixtureError::EmptyMatrix);
        }

        let mut values = Vec::with_capacity(rows.len() * columns);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != columns {
                return Err(FixtureError::RaggedRows { row, expected: columns, actual: r.len() });
            }
            values.extend_from_slice(r);
        }

        Ok(Self::new(rows.len(), columns, values))
    }

    /// Returns an rows x column matrix filled with random values specified by uniform distribution.
    pub fn new_randomized_uniform(rows: usize, columns: usize, uniform: Uniform<f64>) -> Self {
        assert!(columns > 0);
        assert!(rows > 0);

        let mut rng = rand::thread_rng();
        let element_count = columns * rows;
        let values = uniform.sample_iter(&mut rng).take(element_count).collect();

        Self::new(rows, columns, values)
    }

    /// Scales matrix by a scalar.
    pub fn scale(&self, scalar: f64) -> Self {
        let values = self.values.iter().map(|v| v * scalar).collect();
        Self::new(self.rows, self.columns, values)
    }

    /// Adds the same value to every element.
    pub fn add_scalar(&self, scalar: f64) -> Self {
        let values = self.values.iter().map(|v| v + scalar).collect();
        Self::new(self.rows, self.columns, values)
    }

    /// Valid (unpadded) cross correlation with stride 1, kernel is not flipped.
    /// Output has shape (rows - kernel rows + 1, columns - kernel columns + 1),
    /// with bias added to every element.
    pub fn valid_cross_correlation(&self, kernel: &Matrix, bias: f64, precision: Precision) -> Result<Self> {
        let i_d = self.dimensions();
        let k_d = kernel.dimensions();
        if kernel.is_empty() || self.is_empty() {
            return Err(FixtureError::EmptyMatrix);
        }
        if k_d.height > i_d.height || k_d.width > i_d.width {
            return Err(FixtureError::KernelTooLarge { kernel: k_d.shape(), input: i_d.shape() });
        }

        let values = match precision {
            Precision::F64 => correlate(&self.values, &i_d, &kernel.values, &k_d, bias),
            Precision::F32 => {
                let input: Vec<f32> = self.values.iter().map(|&v| v as f32).collect();
                let filter: Vec<f32> = kernel.values.iter().map(|&v| v as f32).collect();

                correlate(&input, &i_d, &filter, &k_d, bias as f32)
                    .into_iter()
                    .map(f64::from)
                    .collect()
            }
        };

        let o_d = Dimensions {
            height: i_d.height - k_d.height + 1,
            width: i_d.width - k_d.width + 1
        };
        debug!(input = ?i_d.shape(), kernel = ?k_d.shape(), output = ?o_d.shape(), ?precision, "cross correlated");

        Ok(Self::new(o_d.height, o_d.width, values))
    }
}

fn correlate<T>(input: &[T], i_d: &Dimensions, kernel: &[T], k_d: &Dimensions, bias: T) -> Vec<T>
where
    T: Copy + Default + Add<Output = T> + Mul<Output = T>
{
    let feature_rows = i_d.height - k_d.height + 1;
    let feature_columns = i_d.width - k_d.width + 1;
    let mut values = Vec::with_capacity(feature_rows * feature_columns);

    // Slides the kernel from top to bottom
    for feature_row in 0..feature_rows {
        // Slides the kernel from left to right
        for feature_column in 0..feature_columns {
            let mut c_accum = T::default();

            for kernel_row in 0..k_d.height {
                let input_row_start_index = (feature_row + kernel_row) * i_d.width + feature_column;
                let input_row_end_index = input_row_start_index + k_d.width;

                let kernel_row_start_index = kernel_row * k_d.width;
                let kernel_row_end_index = kernel_row_start_index + k_d.width;

                let x = &input[input_row_start_index..input_row_end_index];
                let y = &kernel[kernel_row_start_index..kernel_row_end_index];

                c_accum = c_accum + dot_product(x, y);
            }

            values.push(c_accum + bias);
        }
    }

    values
}

/// Dot product of two equal length slices.
fn dot_product<T>(lhs: &[T], rhs: &[T]) -> T
where
    T: Copy + Default + Add<Output = T> + Mul<Output = T>
{
    lhs.iter().zip(rhs).fold(T::default(), |sum, (&x, &y)| sum + x * y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let actual = Matrix::from_rows(&[
            [1f64, 2., 3.],
            [4., 5., 6.]
        ]).unwrap();

        let expected = Matrix::new(2, 3, vec![
                1., 2., 3.,
                4., 5., 6.
            ]);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows: Vec<Vec<f64>> = vec![vec![1., 2.], vec![3.]];
        let err = Matrix::from_rows(&rows).unwrap_err();

        assert!(matches!(err, FixtureError::RaggedRows { row: 1, expected: 2, actual: 1 }));
    }

    #[test]
    fn test_from_rows_rejects_empty() {
        let rows: Vec<Vec<f64>> = vec![];
        assert!(matches!(Matrix::from_rows(&rows), Err(FixtureError::EmptyMatrix)));
    }

    #[test]
    #[should_panic]
    fn test_new_with_wrong_length() {
        Matrix::new(2, 2, vec![1.; 3]);
    }

    #[test]
    fn test_scale() {
        let tc = Matrix::new(2, 3, vec![
                1., 2., 3.,
                4., 5., 6.
            ]);

        let actual = tc.scale(3.);
        let expected = Matrix::new(2, 3, vec![
                3., 6., 9.,
                12., 15., 18.
            ]);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_cross_correlation_is_not_flipped() {
        let input = Matrix::new(3, 3, vec![
            1., 2., 3.,
            4., 5., 6.,
            7., 8., 9.
        ]);
        // Picks the top left of each window, a flipped kernel would pick bottom right.
        let kernel = Matrix::new(2, 2, vec![
            1., 0.,
            0., 0.
        ]);

        let actual = input.valid_cross_correlation(&kernel, 0., Precision::F64).unwrap();
        let expected = Matrix::new(2, 2, vec![1., 2., 4., 5.]);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_cross_correlation_adds_bias() {
        let input = Matrix::new(2, 2, vec![1., 2., 3., 4.]);
        let kernel = Matrix::new(2, 2, vec![1., 1., 1., 1.]);

        let actual = input.valid_cross_correlation(&kernel, 0.5, Precision::F64).unwrap();

        assert_eq!(actual, Matrix::new(1, 1, vec![10.5]));
    }

    #[test]
    fn test_cross_correlation_kernel_too_large() {
        let input = Matrix::new(2, 3, vec![0.; 6]);
        let kernel = Matrix::new(3, 1, vec![0.; 3]);

        let err = input.valid_cross_correlation(&kernel, 0., Precision::F32).unwrap_err();
        assert!(matches!(err, FixtureError::KernelTooLarge { kernel: (3, 1), input: (2, 3) }));
    }

    #[test]
    fn test_f32_precision_narrows_values() {
        let input = Matrix::new(1, 1, vec![0.1]);
        let kernel = Matrix::new(1, 1, vec![1.]);

        let narrowed = input.valid_cross_correlation(&kernel, 0., Precision::F32).unwrap();
        let exact = input.valid_cross_correlation(&kernel, 0., Precision::F64).unwrap();

        assert_eq!(narrowed.read_values(), &[0.1f32 as f64]);
        assert_eq!(exact.read_values(), &[0.1]);
        assert_ne!(narrowed, exact);
    }

    #[test]
    fn test_random_matrix() {
        let m = Matrix::new_randomized_uniform(4, 5, Uniform::new_inclusive(-1., 1.));

        assert_eq!(m.shape(), (4, 5));
        assert!(m.read_values().iter().all(|v| (-1. ..=1.).contains(v)));
    }
}
