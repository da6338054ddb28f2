//! Error type shared by the renderer core.

use thiserror::Error;

/// Convenient result alias used across stencil.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Failures surfaced by the renderer core.
///
/// Only [`Error::MissingCollaborator`] is meant to reach the host: every other
/// variant is contained at the node that produced it and turned into a
/// placeholder element.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A collaborator the caller depends on was not provided by the environment.
    #[error("{0} is required!")]
    MissingCollaborator(&'static str),
    /// The environment loader failed to produce a renderer.
    #[error("failed to load renderer: {0}")]
    RendererLoad(String),
    /// An async component provider failed.
    #[error("failed to load async renderer `{0}`")]
    AsyncRenderer(String),
    /// A schema document was not a JSON object.
    #[error("invalid schema: {0}")]
    InvalidSchema(#[source] serde_json::Error),
    /// Environment configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
}
