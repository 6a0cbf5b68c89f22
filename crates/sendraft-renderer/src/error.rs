use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that stop a run before any reference is processed.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("no API key configured")]
    #[diagnostic(
        code(render::config_missing),
        help("set one with `sendraft config --api-key <KEY>` or SENDRAFT_API_KEY")
    )]
    ConfigMissing,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Vault(#[from] VaultError),
}

#[derive(Debug, Error, Diagnostic)]
pub enum VaultError {
    #[error("vault directory not found: {}", path.display())]
    #[diagnostic(code(render::vault::not_found))]
    NotFound { path: PathBuf },

    #[error("vault path is not a directory: {}", path.display())]
    #[diagnostic(code(render::vault::not_a_directory))]
    NotADirectory { path: PathBuf },
}

/// Failures while downscaling. The pipeline recovers by uploading the original bytes.
#[derive(Debug, Error, Diagnostic)]
pub enum TransformError {
    #[error("failed to decode {file_name}")]
    #[diagnostic(code(render::transform::decode))]
    Decode {
        file_name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode resized {file_name}")]
    #[diagnostic(code(render::transform::encode))]
    Encode {
        file_name: String,
        #[source]
        source: image::ImageError,
    },
}
