use std::path::PathBuf;
use thiserror::Error;

use crate::feature::FeatureFormat;

/// Errors raised by the annotation and model layers.
///
/// Soft anomalies (odd GTF attribute pairs, junction signatures that fall off
/// the read, malformed intron spans) never reach this type; they are logged
/// with `tracing::warn!` where they occur.
#[derive(Debug, Error)]
pub enum QcError {
    #[error("unable to determine annotation format of {path}")]
    Format { path: PathBuf },

    #[error("{format} record at line {line_no}: {reason}: {line:?}")]
    Parse {
        format: FeatureFormat,
        line_no: usize,
        reason: String,
        line: String,
    },

    #[error("missing required attribute '{attribute}' ({context})")]
    Attribute {
        attribute: &'static str,
        context: String,
    },

    #[error("transcript model: {0}")]
    Model(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QcError>;
