//! Regenerates the convolution golden fixtures.
//!
//! ```bash
//! # Final variant (bias 0.1) into the current directory
//! conv_fixtures
//!
//! # Zero bias variant with the filter saved as weights.npy
//! conv_fixtures generate --variant plain --out-dir fixtures/
//!
//! # Check existing files against freshly computed values
//! conv_fixtures verify --out-dir fixtures/ --variant plain
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use conv_fixtures::fixture::{BiasLayout, FixtureConfig, Variant};
use conv_fixtures::geoalg::matrix::Precision;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "conv_fixtures")]
#[command(about = "Write input, filter, bias and output .npy fixtures for a 2d convolution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    options: FixtureOptions,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Compute and write the fixture files (default)
    Generate,
    /// Re-read the fixture files and compare them with freshly computed values
    Verify,
}

/// Accepted before or after the subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct FixtureOptions {
    /// Directory the .npy files are written to or read from
    #[arg(short, long, global = true, default_value = ".")]
    out_dir: PathBuf,

    #[arg(short, long, global = true, value_enum, default_value_t = VariantArg::Biased)]
    variant: VariantArg,

    /// Arithmetic used for the forward pass
    #[arg(short, long, global = true, value_enum, default_value_t = PrecisionArg::F32)]
    precision: PrecisionArg,

    /// Array written to the bias file
    #[arg(short, long, global = true, value_enum, default_value_t = BiasLayoutArg::PerFilter)]
    bias_layout: BiasLayoutArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum VariantArg {
    /// Zero bias, filter saved as weights.npy
    Plain,
    /// Zero bias, filter saved as filter_weights.npy
    Filter,
    /// Bias 0.1, adds filter_bias.npy
    Biased,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum PrecisionArg {
    F32,
    F64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum BiasLayoutArg {
    /// Shape (1,)
    PerFilter,
    /// Shape ()
    Scalar,
    /// Filter matrix, reproduces old fixtures
    FilterCopy,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Plain => Variant::Plain,
            VariantArg::Filter => Variant::Filter,
            VariantArg::Biased => Variant::Biased,
        }
    }
}

impl From<PrecisionArg> for Precision {
    fn from(arg: PrecisionArg) -> Self {
        match arg {
            PrecisionArg::F32 => Precision::F32,
            PrecisionArg::F64 => Precision::F64,
        }
    }
}

impl From<BiasLayoutArg> for BiasLayout {
    fn from(arg: BiasLayoutArg) -> Self {
        match arg {
            BiasLayoutArg::PerFilter => BiasLayout::PerFilter,
            BiasLayoutArg::Scalar => BiasLayout::Scalar,
            BiasLayoutArg::FilterCopy => BiasLayout::FilterCopy,
        }
    }
}

impl FixtureOptions {
    fn config(&self) -> Result<FixtureConfig> {
        Ok(FixtureConfig::for_variant(self.variant.into())?
            .with_precision(self.precision.into())
            .with_bias_layout(self.bias_layout.into()))
    }
}

impl Cli {
    fn resolved_command(&self) -> Command {
        self.command.unwrap_or(Command::Generate)
    }
}

/// `RUST_LOG` directives, or info when unset or empty.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let cli = Cli::parse();

    match cli.resolved_command() {
        Command::Generate => generate(&cli.options),
        Command::Verify => verify(&cli.options),
    }
}

fn generate(options: &FixtureOptions) -> Result<()> {
    let set = options.config()?.generate().context("Failed to compute convolution output")?;
    let written = set
        .write_to(&options.out_dir)
        .with_context(|| format!("Failed to write fixtures to {}", options.out_dir.display()))?;

    tracing::info!("Wrote {} files for {:?}", written.len(), set.variant);
    Ok(())
}

fn verify(options: &FixtureOptions) -> Result<()> {
    let set = options.config()?.generate().context("Failed to compute convolution output")?;
    set.verify_in(&options.out_dir)
        .with_context(|| format!("Fixtures in {} are stale", options.out_dir.display()))?;

    Ok(())
}
