use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{FixtureError, Result};
use crate::geoalg::matrix::{Matrix, Precision};
use crate::nn::convolution2d::Convolution2d;
use crate::npy_reader::NpyReader;
use crate::npy_writer::NpyWriter;

/// Fixed 4x5 input shared by every variant.
pub const INPUT: [[f64; 5]; 4] = [
    [-1., -0.9, -0.8, -0.7, -0.6],
    [-0.5, -0.4, -0.3, -0.2, -0.1],
    [0.1, 0.2, 0.3, 0.4, 0.5],
    [0.6, 0.7, 0.8, 0.9, 1.]
];

/// Fixed 2x3 kernel shared by every variant.
pub const FILTER: [[f64; 3]; 2] = [
    [0.1, 0.2, 0.3],
    [-0.2, 0.2, -0.3]
];

/// Bias of the biased variant, the others use zero.
pub const BIAS: f64 = 0.1;

pub const DATA_FILE: &str = "data.npy";
pub const OUTPUT_FILE: &str = "output.npy";

/// Values read back must match what was written to within this.
const VERIFY_TOLERANCE: f64 = 1e-12;

/// Which set of files gets written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Zero bias, filter saved as `weights.npy`.
    Plain,
    /// Zero bias, filter saved as `filter_weights.npy`.
    Filter,
    /// Bias of 0.1, filter and bias saved as `filter_weights.npy` and `filter_bias.npy`.
    #[default]
    Biased,
}

impl Variant {
    pub fn bias(&self) -> f64 {
        match self {
            Variant::Plain | Variant::Filter => 0.,
            Variant::Biased => BIAS,
        }
    }

    pub fn weights_file_name(&self) -> &'static str {
        match self {
            Variant::Plain => "weights.npy",
            Variant::Filter | Variant::Biased => "filter_weights.npy",
        }
    }

    pub fn bias_file_name(&self) -> Option<&'static str> {
        match self {
            Variant::Biased => Some("filter_bias.npy"),
            Variant::Plain | Variant::Filter => None,
        }
    }
}

/// Shape of the array stored in the bias file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BiasLayout {
    /// Shape `(1,)`, one entry per filter.
    #[default]
    PerFilter,
    /// Shape `()`.
    Scalar,
    /// The filter matrix instead of the bias. Only for reproducing old fixtures byte for byte.
    FilterCopy,
}

#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub variant: Variant,
    pub input: Matrix,
    pub filter: Matrix,
    pub bias: f64,
    pub precision: Precision,
    pub bias_layout: BiasLayout,
}

impl FixtureConfig {
    pub fn for_variant(variant: Variant) -> Result<Self> {
        Ok(FixtureConfig {
            variant,
            input: Matrix::from_rows(&INPUT)?,
            filter: Matrix::from_rows(&FILTER)?,
            bias: variant.bias(),
            precision: Precision::default(),
            bias_layout: BiasLayout::default(),
        })
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_bias_layout(mut self, bias_layout: BiasLayout) -> Self {
        self.bias_layout = bias_layout;
        self
    }

    /// Runs the one forward pass. Touches no files.
    pub fn generate(&self) -> Result<FixtureSet> {
        let layer = Convolution2d::new(self.filter.clone(), self.bias).with_precision(self.precision);
        let output = layer.forward(&self.input)?;

        Ok(FixtureSet {
            variant: self.variant,
            input: self.input.clone(),
            filter: self.filter.clone(),
            bias: self.bias,
            bias_layout: self.bias_layout,
            output
        })
    }
}

/// Everything one variant writes, already computed.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSet {
    pub variant: Variant,
    pub input: Matrix,
    pub filter: Matrix,
    pub bias: f64,
    pub bias_layout: BiasLayout,
    pub output: Matrix,
}

impl FixtureSet {
    /// Writes every file of the variant into `dir`, replacing existing ones.
    /// Returns the paths in the order written.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(FixtureError::io(dir))?;

        let mut written = Vec::new();

        let path = dir.join(DATA_FILE);
        NpyWriter::create(&path)?.write_matrix(&self.input)?;
        written.push(path);

        let path = dir.join(self.variant.weights_file_name());
        NpyWriter::create(&path)?.write_matrix(&self.filter)?;
        written.push(path);

        if let Some(name) = self.variant.bias_file_name() {
            let path = dir.join(name);
            let writer = NpyWriter::create(&path)?;
            match self.bias_layout {
                BiasLayout::PerFilter => writer.write_vector(&[self.bias])?,
                BiasLayout::Scalar => writer.write_scalar(self.bias)?,
                BiasLayout::FilterCopy => {
                    warn!(path = %path.display(), "writing filter weights into the bias file");
                    writer.write_matrix(&self.filter)?
                }
            }
            written.push(path);
        }

        let path = dir.join(OUTPUT_FILE);
        NpyWriter::create(&path)?.write_matrix(&self.output)?;
        written.push(path);

        for path in &written {
            info!(path = %path.display(), "wrote fixture");
        }

        Ok(written)
    }

    /// Reads the variant's files back from `dir` and compares them with this set.
    pub fn verify_in(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();

        expect_array(dir, DATA_FILE, &[self.input.row_count(), self.input.column_count()], self.input.read_values())?;
        expect_array(
            dir,
            self.variant.weights_file_name(),
            &[self.filter.row_count(), self.filter.column_count()],
            self.filter.read_values())?;

        if let Some(name) = self.variant.bias_file_name() {
            match self.bias_layout {
                BiasLayout::PerFilter => expect_array(dir, name, &[1], &[self.bias])?,
                BiasLayout::Scalar => expect_array(dir, name, &[], &[self.bias])?,
                BiasLayout::FilterCopy => expect_array(
                    dir,
                    name,
                    &[self.filter.row_count(), self.filter.column_count()],
                    self.filter.read_values())?,
            }
        }

        expect_array(dir, OUTPUT_FILE, &[self.output.row_count(), self.output.column_count()], self.output.read_values())?;

        info!(dir = %dir.display(), variant = ?self.variant, "fixtures verified");
        Ok(())
    }
}

fn expect_array(dir: &Path, name: &str, shape: &[usize], values: &[f64]) -> Result<()> {
    let array = NpyReader::open(dir.join(name))?.read_array()?;
    let mismatch = |detail: String| FixtureError::Mismatch { file: name.to_string(), detail };

    if array.shape != shape {
        return Err(mismatch(format!("shape {:?}, expected {:?}", array.shape, shape)));
    }

    for (index, (&actual, &expected)) in array.values.iter().zip(values).enumerate() {
        if (actual - expected).abs() > VERIFY_TOLERANCE {
            return Err(mismatch(format!("value {actual} at {index}, expected {expected}")));
        }
    }

    Ok(())
}
