//! Crate-level error type
//!
//! Each layer has its own error enum; [`RenderError`] wraps all of them so a
//! frame can surface whichever layer failed.

use thiserror::Error;

use crate::backend::traits::BackendError;
use crate::render_graph::{DescriptionError, GraphError};
use crate::resources::CatalogError;

/// Umbrella error for rendering a frame
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Description(#[from] DescriptionError),
    #[error("Missing asset: {0}")]
    MissingAsset(String),
    #[error("Attachment '{0}' has no backing texture")]
    MissingAttachmentStorage(String),
    #[error("Pass '{pass}' failed: {source}")]
    PassFailed {
        pass: String,
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Name of the pass that aborted the frame, if any.
    pub fn failed_pass(&self) -> Option<&str> {
        match self {
            RenderError::PassFailed { pass, .. } => Some(pass),
            _ => None,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
