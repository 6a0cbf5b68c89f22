//! Short user-facing messages for the outcome of a run.

use std::fmt;

use sendraft_renderer::{PublishOutcome, ReferenceReport, UploadOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MissingKey,
    Resized {
        name: String,
        from: (u32, u32),
        to: (u32, u32),
    },
    InvalidKey {
        name: String,
    },
    HttpFailure {
        name: String,
        status: u16,
    },
    UploadError {
        name: String,
    },
    Sent,
    SendFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => f.write_str(
                "Please set your API key first: sendraft config --api-key <KEY>\n\
                 You can find it under Settings > API on buttondown.email",
            ),
            Self::Resized { name, from, to } => write!(
                f,
                "Resized {name} from {}x{} to {}x{}",
                from.0, from.1, to.0, to.1
            ),
            Self::InvalidKey { name } => {
                write!(f, "Failed to upload image {name}: Invalid API key")
            }
            Self::HttpFailure { name, status } => {
                write!(f, "Failed to upload image {name}: HTTP {status}")
            }
            Self::UploadError { name } => {
                write!(f, "Error uploading image {name}. Check the log for details.")
            }
            Self::Sent => f.write_str("Sent draft to Buttondown"),
            Self::SendFailed => f.write_str(
                "Something went wrong sending draft to Buttondown. Check the log for details.",
            ),
        }
    }
}

impl Notice {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Resized { .. } | Self::Sent)
    }
}

/// Notices for one reference. Skipped references are silent.
pub fn for_reference(report: &ReferenceReport) -> Vec<Notice> {
    let name = report.display_name().to_owned();
    let mut notices = Vec::new();
    if let Some(resize) = report.resize {
        notices.push(Notice::Resized {
            name: name.clone(),
            from: resize.from,
            to: resize.to,
        });
    }
    match &report.outcome {
        UploadOutcome::Success { .. } | UploadOutcome::Skipped(_) => {}
        UploadOutcome::AuthFailure => notices.push(Notice::InvalidKey { name }),
        UploadOutcome::HttpFailure { status, .. } => notices.push(Notice::HttpFailure {
            name,
            status: status.as_u16(),
        }),
        UploadOutcome::NetworkFailure { .. } => notices.push(Notice::UploadError { name }),
    }
    notices
}

pub fn for_publish(outcome: &PublishOutcome) -> Notice {
    match outcome {
        PublishOutcome::Published { .. } => Notice::Sent,
        PublishOutcome::Failed(_) => Notice::SendFailed,
    }
}
