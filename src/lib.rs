pub mod error;
pub mod geoalg;
pub mod nn;
pub mod fixture;
pub mod npy_writer;
pub mod npy_reader;

pub use error::{FixtureError, Result};
