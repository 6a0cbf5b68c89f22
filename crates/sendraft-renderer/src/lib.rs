//! Sendraft renderer
//!
//! Turns a markdown note into a Buttondown draft: local image embeds are uploaded to the
//! image hosting endpoint, their markers rewritten to the hosted URLs, and the result
//! submitted as a draft email.
//!

pub mod error;
pub mod pipeline;
pub mod publish;
pub mod resolve;
pub mod rewrite;
pub mod scan;
pub mod transform;
pub mod types;
pub mod upload;
pub mod vault;

pub use error::{RenderError, TransformError, VaultError};
pub use pipeline::{Pipeline, RunSettings, Stage};
pub use resolve::{AssetStore, MemoryStore, StoredItem};
pub use scan::scan;
pub use types::{
    ImageKind, ImageReference, MarkerSyntax, PipelineResult, PublishFailure, PublishOutcome,
    ReferenceReport, Resize, ResolvedAsset, SkipReason, UploadOutcome,
};
pub use vault::VaultStore;
