//! One run: scan the note, upload what resolves, rewrite, and submit the draft.
//!
//! References are handled strictly one after another. The rewriter searches the working
//! text for each marker, so only one task may mutate it at a time.

use std::fmt;

use sendraft_common::telemetry::count;
use sendraft_common::{Config, HttpClient, ResizeConfig};
use tracing::Instrument;

use crate::error::RenderError;
use crate::publish::publish_draft;
use crate::resolve::{AssetStore, resolve_asset};
use crate::rewrite::rewrite_marker;
use crate::scan::scan;
use crate::transform::transform;
use crate::types::{
    ImageReference, PipelineResult, PublishOutcome, ReferenceReport, UploadOutcome,
};
use crate::upload::upload_image;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Scanning,
    Resolving,
    Skipped,
    Transforming,
    Uploading,
    Rewriting,
    Publishing,
    Done,
    PublishFailed,
}

impl Stage {
    /// Whether `next` may follow `self`. There are no transitions out of the terminal
    /// stages and none back to earlier stages of the same reference.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Idle, Scanning)
                | (Scanning | Skipped | Uploading | Rewriting, Resolving | Publishing)
                | (Resolving, Skipped | Transforming)
                | (Transforming, Uploading)
                | (Uploading, Rewriting)
                | (Publishing, Done | PublishFailed)
        )
    }
}

/// Settings snapshot taken when the pipeline is built. Not affected by later changes
/// to the stored configuration.
#[derive(Clone)]
pub struct RunSettings {
    api_key: String,
    resize: ResizeConfig,
}

impl RunSettings {
    pub fn new(api_key: impl Into<String>, resize: ResizeConfig) -> Self {
        Self {
            api_key: api_key.into().trim().to_owned(),
            resize,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key(), config.resize_config())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSettings")
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<unset>" })
            .field("resize", &self.resize)
            .finish()
    }
}

/// Mutable state of a single run.
struct Run {
    stage: Stage,
    working: String,
    reports: Vec<ReferenceReport>,
}

impl Run {
    fn new(body: &str) -> Self {
        Self {
            stage: Stage::Idle,
            working: body.to_owned(),
            reports: Vec::new(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "invalid stage transition {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::debug!(from = ?self.stage, to = ?next, "stage");
        self.stage = next;
    }
}

pub struct Pipeline<S, C> {
    settings: RunSettings,
    store: S,
    client: C,
}

impl<S: AssetStore, C: HttpClient> Pipeline<S, C> {
    pub fn new(config: &Config, store: S, client: C) -> Self {
        Self::with_settings(RunSettings::from_config(config), store, client)
    }

    pub fn with_settings(settings: RunSettings, store: S, client: C) -> Self {
        Self {
            settings,
            store,
            client,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Upload the note's images, rewrite it, and create a draft from the result.
    ///
    /// Fails only when no API key is configured, before any network call. Per-image
    /// failures and a failed submission are reported in the returned result.
    #[tracing::instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn run(&self, title: &str, body: &str) -> Result<PipelineResult, RenderError> {
        if !self.settings.has_api_key() {
            tracing::warn!("no API key configured, nothing sent");
            return Err(RenderError::ConfigMissing);
        }

        let mut run = Run::new(body);
        self.process(&mut run).await;

        run.advance(Stage::Publishing);
        let publish = publish_draft(&self.client, &self.settings.api_key, title, &run.working).await;
        match publish {
            PublishOutcome::Published { .. } => {
                count("sendraft_drafts_total");
                run.advance(Stage::Done);
            }
            PublishOutcome::Failed(_) => run.advance(Stage::PublishFailed),
        }

        Ok(PipelineResult {
            body: run.working,
            references: run.reports,
            publish,
        })
    }

    async fn process(&self, run: &mut Run) {
        run.advance(Stage::Scanning);
        // Markers always come from the untouched input, never from the working text.
        let references = scan(&run.working);
        tracing::debug!(count = references.len(), "found image markers");

        for reference in references {
            let span = tracing::info_span!("reference", marker = %reference.raw);
            let report = self.process_reference(run, reference).instrument(span).await;
            run.reports.push(report);
        }
    }

    async fn process_reference(&self, run: &mut Run, reference: ImageReference) -> ReferenceReport {
        run.advance(Stage::Resolving);
        let asset = match resolve_asset(&self.store, &reference).await {
            Ok(asset) => asset,
            Err(reason) => {
                run.advance(Stage::Skipped);
                tracing::debug!(%reason, "skipping");
                count("sendraft_images_skipped_total");
                return ReferenceReport::skipped(reference, reason);
            }
        };

        run.advance(Stage::Transforming);
        let (bytes, resize) = match transform(&asset, &self.settings.resize) {
            Ok(transformed) => (transformed.bytes, transformed.resize),
            Err(e) => {
                tracing::warn!(error = %e, "resize failed, uploading original");
                (asset.bytes().clone(), None)
            }
        };
        if let Some(resize) = &resize {
            tracing::info!(
                file = asset.file_name(),
                from = ?resize.from,
                to = ?resize.to,
                "resized image"
            );
        }

        run.advance(Stage::Uploading);
        let outcome = upload_image(
            &self.client,
            &self.settings.api_key,
            asset.file_name(),
            asset.kind(),
            bytes,
        )
        .await;

        if let UploadOutcome::Success { url } = &outcome {
            run.advance(Stage::Rewriting);
            if !rewrite_marker(&mut run.working, &reference.raw, &reference.alt, url) {
                tracing::warn!(%url, "uploaded but marker no longer present in text");
            }
            count("sendraft_images_uploaded_total");
        } else {
            count("sendraft_upload_failures_total");
        }

        ReferenceReport {
            reference,
            file_name: Some(asset.file_name().to_owned()),
            resize,
            outcome,
        }
    }
}
