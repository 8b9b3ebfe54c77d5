//! The remote image editing capability.

use crate::error::Result;
use crate::image::types::{GeneratedResult, GenerationRequest};
use async_trait::async_trait;

/// A remote service that edits images from a prompt.
///
/// [`crate::EditSession`] holds one of these, so the client, its
/// credential and its lifetime are chosen by whoever builds the session.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Sends one request and decodes the response.
    ///
    /// A response with no usable parts is an empty [`GeneratedResult`],
    /// not an error.
    async fn edit(&self, request: &GenerationRequest) -> Result<GeneratedResult>;

    /// Returns the name of this editor for display.
    fn name(&self) -> &str;

    /// Checks if the service is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
