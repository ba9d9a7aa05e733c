// Error taxonomy for one invocation. Every variant ends the process with
// exit code 1; the binary prints each one exactly once to stderr.

use thiserror::Error;

use crate::args::UsageError;
use crate::client::ClientError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// The session could not be created or initialized. Not retried.
    #[error("{0}")]
    SessionInit(#[source] ClientError),

    /// A remote call failed during dispatch.
    #[error("{0}")]
    Remote(#[source] ClientError),

    /// Image generation ran out of fallbacks. The response text has already
    /// been written to stdout.
    #[error("No images generated")]
    NoImages { text: Option<String> },

    #[error("Failed to save image to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Extra line printed after the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RunError::Usage(UsageError::MissingPrompt) => Some("Use --help for usage information"),
            RunError::SessionInit(_) => {
                Some("Make sure you're logged into gemini.google.com in Chrome")
            }
            _ => None,
        }
    }

    /// Prefix the binary puts in front of the message.
    pub fn prefix(&self) -> &'static str {
        match self {
            RunError::SessionInit(_) => "Error initializing client",
            _ => "Error",
        }
    }
}
