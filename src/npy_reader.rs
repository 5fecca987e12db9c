use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{FixtureError, Result};
use crate::geoalg::matrix::Matrix;
use crate::npy_writer::NPY_MAGIC;

/// Array read back from an npy file, values widened to f64.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub values: Vec<f64>
}

impl NpyArray {
    /// Only 2-d arrays convert to a matrix.
    pub fn into_matrix(self) -> Option<Matrix> {
        match self.shape[..] {
            [rows, columns] => Some(Matrix::new(rows, columns, self.values)),
            _ => None
        }
    }
}

pub struct NpyReader {
    path: PathBuf,
    reader: BufReader<File>
}

impl NpyReader {
    pub fn open(path: impl AsRef<Path>) -> Result<NpyReader> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(FixtureError::io(&path))?;

        Ok(NpyReader { path, reader: BufReader::new(file) })
    }

    pub fn read_array(mut self) -> Result<NpyArray> {
        let mut magic = [0u8; 6];
        self.read_exact(&mut magic)?;
        if &magic != NPY_MAGIC {
            return Err(FixtureError::InvalidMagic(magic.to_vec()));
        }

        let mut version = [0u8; 2];
        self.read_exact(&mut version)?;
        let header_len = match version[0] {
            1 => {
                let mut buf = [0u8; 2];
                self.read_exact(&mut buf)?;
                u16::from_le_bytes(buf) as usize
            }
            2 => {
                let mut buf = [0u8; 4];
                self.read_exact(&mut buf)?;
                u32::from_le_bytes(buf) as usize
            }
            major => return Err(FixtureError::UnsupportedVersion { major, minor: version[1] })
        };

        let mut header_bytes = vec![0u8; header_len];
        self.read_exact(&mut header_bytes)?;
        let header = std::str::from_utf8(&header_bytes)
            .map_err(|e| FixtureError::InvalidHeader(format!("header is not UTF-8: {e}")))?
            .trim();

        let descr = dict_value(header, "descr")?;
        if dict_value(header, "fortran_order")?.starts_with("True") {
            return Err(FixtureError::FortranOrder);
        }
        let shape = parse_shape(dict_value(header, "shape")?)?;

        let values = match descr.trim_matches('\'') {
            "<f8" => {
                let mut data = vec![0u8; byte_len(&shape, 8)?];
                self.read_exact(&mut data)?;
                data.chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect()
            }
            "<f4" => {
                let mut data = vec![0u8; byte_len(&shape, 4)?];
                self.read_exact(&mut data)?;
                data.chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                    .collect()
            }
            other => return Err(FixtureError::UnsupportedDescr(other.to_string()))
        };

        Ok(NpyArray { shape, values })
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(FixtureError::io(&self.path))
    }
}

/// Size of the data section, rejecting shapes whose size overflows.
fn byte_len(shape: &[usize], element_size: usize) -> Result<usize> {
    shape
        .iter()
        .try_fold(element_size, |len, &d| len.checked_mul(d))
        .ok_or_else(|| FixtureError::InvalidHeader(format!("shape {shape:?} is too large")))
}

/// Raw text of a value in the header dict, up to (not including) the next top level comma.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let quoted = format!("'{key}'");
    let start = header
        .find(&quoted)
        .ok_or_else(|| FixtureError::InvalidHeader(format!("missing {key}")))?;
    let after = header[start + quoted.len()..]
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| FixtureError::InvalidHeader(format!("no value for {key}")))?
        .trim_start();

    let mut depth = 0usize;
    for (i, c) in after.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | '}' if depth == 0 => return Ok(after[..i].trim()),
            _ => {}
        }
    }

    Err(FixtureError::InvalidHeader(format!("unterminated {key}")))
}

fn parse_shape(literal: &str) -> Result<Vec<usize>> {
    let inner = literal
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| FixtureError::InvalidHeader(format!("bad shape {literal}")))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| FixtureError::InvalidHeader(format!("bad shape dim {s}: {e}")))
        })
        .collect()
}
