use crate::error::{FixtureError, Result};
use crate::geoalg::matrix::{Matrix, Precision};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub height: usize,
    pub width: usize
}

impl Dimensions {
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Single channel, single filter 2d convolution with a scalar bias.
/// Assumes stride of 1 and no padding.
#[derive(Debug, Clone)]
pub struct Convolution2d {
    pub kernel: Matrix,        // Same as weights
    pub bias: f64,
    pub precision: Precision,
}

impl Convolution2d {
    pub fn new(kernel: Matrix, bias: f64) -> Self {
        Convolution2d { kernel, bias, precision: Precision::default() }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn kernel_dimensions(&self) -> Dimensions {
        self.kernel.dimensions()
    }

    /// Shape forward produces for an input of shape `i_d`.
    pub fn output_dimensions(&self, i_d: &Dimensions) -> Result<Dimensions> {
        let k_d = self.kernel_dimensions();
        if k_d.height > i_d.height || k_d.width > i_d.width {
            return Err(FixtureError::KernelTooLarge { kernel: k_d.shape(), input: i_d.shape() });
        }

        Ok(Dimensions {
            height: i_d.height - k_d.height + 1,
            width: i_d.width - k_d.width + 1
        })
    }

    pub fn forward(&self, inputs: &Matrix) -> Result<Matrix> {
        inputs.valid_cross_correlation(&self.kernel, self.bias, self.precision)
    }
}
