use clap::arg_enum;
use std::path::PathBuf;
use structopt::StructOpt;
use thiserror::Error;

pub const DEFAULT_EPSILON: f64 = 1e-6;
pub const DEFAULT_DENSITY: f64 = 1.0;

#[derive(Error, Debug)]
/// Error types for command line options
pub enum ConfigError {
    #[error("epsilon must be between 0 and 1")]
    Epsilon,
    #[error("density must be a positive finite number")]
    Density,
    #[error("Not a decimal number")]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error("Error parsing config")]
    Clap(#[from] clap::Error),
}

arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StlFormat {
        Auto,
        Binary,
        Ascii
    }
}

impl Default for StlFormat {
    fn default() -> Self { StlFormat::Auto }
}

fn parse_epsilon(src: &str) -> Result<f64, ConfigError> {
    let epsilon = src.parse::<f64>()?;
    if !(0. ..=1.).contains(&epsilon) {
        Err(ConfigError::Epsilon)
    } else {
        Ok(epsilon)
    }
}

fn parse_density(src: &str) -> Result<f64, ConfigError> {
    let density = src.parse::<f64>()?;
    if density <= 0. || !density.is_finite() {
        Err(ConfigError::Density)
    } else {
        Ok(density)
    }
}

// set up program arguments
#[derive(Debug, StructOpt)]
#[structopt(name = "stl_analyzer", about = "Report geometry and mass properties of STL meshes")]
pub struct Opt {
    #[structopt(parse(from_os_str), required = true)]
    pub inputs: Vec<PathBuf>,

    /// distance under which vertices are merged
    #[structopt(short, long, default_value = "1e-6", parse(try_from_str = parse_epsilon))]
    pub epsilon: f64,

    #[structopt(short, long, default_value = "1.0", parse(try_from_str = parse_density))]
    pub density: f64,

    #[structopt(short, long, possible_values = &StlFormat::variants(), default_value = "auto", case_insensitive = true)]
    pub format: StlFormat,

    /// print reports as a JSON array
    #[structopt(long)]
    pub json: bool,

    #[structopt(long)]
    pub debug: bool,
}

/// Settings for a single analysis run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub epsilon: f64,
    pub density: f64,
    pub format: StlFormat,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            epsilon: DEFAULT_EPSILON,
            density: DEFAULT_DENSITY,
            format: StlFormat::Auto,
        }
    }
}

impl From<&Opt> for AnalysisConfig {
    fn from(opt: &Opt) -> Self {
        AnalysisConfig {
            epsilon: opt.epsilon,
            density: opt.density,
            format: opt.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(args: &[&str]) -> Result<Opt, ConfigError> {
        let mut full = vec!["stl_analyzer"];
        full.extend_from_slice(args);
        Ok(Opt::from_iter_safe(&full)?)
    }

    #[test]
    fn test_defaults() {
        let opt = opt(&["part.stl"]).unwrap();
        let config = AnalysisConfig::from(&opt);
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(opt.inputs, vec![PathBuf::from("part.stl")]);
        assert!(!opt.json);
    }

    #[test]
    fn test_options() {
        let opt = opt(&["-e", "0.01", "--density", "2.5", "--format", "BINARY", "--json", "a.stl", "b.stl"]).unwrap();
        let config = AnalysisConfig::from(&opt);
        assert_eq!(config.epsilon, 0.01);
        assert_eq!(config.density, 2.5);
        assert_eq!(config.format, StlFormat::Binary);
        assert_eq!(opt.inputs.len(), 2);
        assert!(opt.json);
    }

    #[test]
    fn test_invalid_values() {
        assert!(opt(&["--density", "0", "a.stl"]).is_err());
        assert!(opt(&["--epsilon", "-1", "a.stl"]).is_err());
        assert!(opt(&["--epsilon", "abc", "a.stl"]).is_err());
        assert!(opt(&[]).is_err());
        assert!(parse_density("-3").is_err());
        assert!(parse_epsilon("0").is_ok());
    }
}
