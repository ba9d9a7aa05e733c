// Client capability module: the narrow interface the runner uses to talk to
// the remote web backend. The runner never sees HTTP or cookies; it only
// sees a `WebSession` that can be initialized, asked to generate content,
// opened as a multi-turn exchange, asked to save an image, and released.
//
// The production implementation lives in `gateway`. Tests plug in their own
// session to script every response shape without a network.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Options passed to `WebSession::initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Timeout applied to initialization and to every remote call.
    pub timeout: Duration,
    /// Release the session after each call instead of keeping it open.
    pub auto_close: bool,
    /// Re-initialize once and replay the call when the backend reports an
    /// expired session.
    pub auto_refresh: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            timeout: Duration::from_secs(120),
            auto_close: false,
            auto_refresh: true,
        }
    }
}

/// One generated image. Either the backend shipped the bytes inline or it
/// handed us a URL that has to be fetched with the session's cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageArtifact {
    Inline {
        data: Vec<u8>,
        title: Option<String>,
    },
    Remote {
        url: String,
        title: Option<String>,
    },
}

/// What a single remote call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub text: Option<String>,
    /// Reasoning trace, when the model exposes one.
    pub thoughts: Option<String>,
    pub images: Vec<ImageArtifact>,
}

impl Response {
    /// Text if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn thoughts(&self) -> Option<&str> {
        self.thoughts.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// Failures raised by a session implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing credentials: {0}")]
    Credentials(String),

    #[error("session is not initialized")]
    NotInitialized,

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A multi-turn exchange opened with `WebSession::start_exchange`. Turns
/// share the conversation context of the exchange.
pub trait Exchange {
    fn send_turn(&mut self, prompt: &str, files: &[PathBuf]) -> Result<Response, ClientError>;
}

/// An authenticated handle to the remote service.
pub trait WebSession {
    type Exchange<'a>: Exchange
    where
        Self: 'a;

    fn initialize(&mut self, options: &SessionOptions) -> Result<(), ClientError>;

    /// Single-shot request. `files` may be empty.
    fn generate(
        &mut self,
        prompt: &str,
        files: &[PathBuf],
        model: &str,
    ) -> Result<Response, ClientError>;

    fn start_exchange(&mut self, model: &str) -> Self::Exchange<'_>;

    /// Persist `image` as `dir/filename`, returning the written path.
    fn save_image(
        &mut self,
        image: &ImageArtifact,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, ClientError>;

    /// Close the session. Must be safe to call on a session whose
    /// initialization failed.
    fn release(&mut self);
}
