//! Shared plumbing for sendraft: persisted settings, the HTTP transport used to talk to
//! the newsletter API, error types and tracing setup.

pub mod client;
pub mod config;
pub mod error;
pub mod telemetry;

pub use crate::client::{ApiRequest, ApiResponse, FilePart, HttpClient, ReqwestClient, RequestBody};
pub use crate::config::{Config, FileStore, Loader, ResizeConfig, ResizeMode, Saver};
pub use crate::error::{ConfigError, TransportError};
