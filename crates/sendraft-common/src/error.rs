//! Error types shared by the sendraft crates

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Settings loading and validation errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to load configuration from {}", path.display())]
    #[diagnostic(code(config::load))]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to save configuration to {}", path.display())]
    #[diagnostic(code(config::save))]
    Save {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("unsupported configuration file format: {}", path.display())]
    #[diagnostic(
        code(config::format),
        help("use a .json or .toml file for the configuration")
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid value for {var}: {message}")]
    #[diagnostic(code(config::env))]
    InvalidEnv { var: &'static str, message: String },

    #[error("could not determine the user configuration directory")]
    #[diagnostic(code(config::dir), help("pass --config with an explicit path"))]
    NoConfigDir,
}

/// Errors raised before a response was received from the remote API
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    #[diagnostic(code(transport::request))]
    Request { url: String, message: String },

    #[error("could not build request for {url}: {message}")]
    #[diagnostic(code(transport::build))]
    Build { url: String, message: String },
}
