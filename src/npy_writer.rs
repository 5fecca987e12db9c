use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{FixtureError, Result};
use crate::geoalg::matrix::Matrix;

pub(crate) const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Preamble (magic, version, header length, header) is padded to this many bytes.
const HEADER_ALIGNMENT: usize = 64;

/// Spare room numpy reserves so the first axis can grow in place.
const GROWTH_AXIS_MAX_DIGITS: usize = 21;

/// Writes single f64 arrays in NumPy `.npy` format v1.0, little-endian C order.
pub struct NpyWriter {
    path: PathBuf,
    writer: BufWriter<File>
}

impl NpyWriter {
    /// Creates or truncates the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<NpyWriter> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(FixtureError::io(&path))?;

        Ok(NpyWriter { path, writer: BufWriter::new(file) })
    }

    /// 2-d array with the matrix's shape.
    pub fn write_matrix(self, matrix: &Matrix) -> Result<()> {
        let (rows, columns) = matrix.shape();
        self.write_array(&[rows, columns], matrix.read_values())
    }

    /// 0-d array.
    pub fn write_scalar(self, value: f64) -> Result<()> {
        self.write_array(&[], &[value])
    }

    /// 1-d array.
    pub fn write_vector(self, values: &[f64]) -> Result<()> {
        self.write_array(&[values.len()], values)
    }

    fn write_array(mut self, shape: &[usize], data: &[f64]) -> Result<()> {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());

        let header = header_for(shape);
        let io = FixtureError::io(&self.path);

        let result = (|| {
            self.writer.write_all(NPY_MAGIC)?;
            self.writer.write_all(&[1u8, 0u8])?;
            self.writer.write_all(&(header.len() as u16).to_le_bytes())?;
            self.writer.write_all(header.as_bytes())?;
            for &value in data {
                self.writer.write_all(&value.to_le_bytes())?;
            }
            self.writer.flush()
        })();

        result.map_err(io)
    }
}

/// Python tuple literal for the shape, e.g. `()`, `(3,)`, `(4, 5)`.
pub(crate) fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Header dict padded with spaces and ended by a newline.
fn header_for(shape: &[usize]) -> String {
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape_literal(shape)
    );

    let growth = shape
        .first()
        .map(|d| GROWTH_AXIS_MAX_DIGITS.saturating_sub(d.to_string().len()))
        .unwrap_or(0);

    // magic + version + header length
    let prefix_len = NPY_MAGIC.len() + 2 + 2;
    let unpadded = prefix_len + dict.len() + growth + 1;
    // Always at least one space, a full block when already aligned.
    let padding = growth + HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT;

    format!("{dict}{}\n", " ".repeat(padding))
}
