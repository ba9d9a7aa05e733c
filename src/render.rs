// Output rendering: turns a response into what lands on stdout, either the
// JSON summary object or plain text.

use std::io::{self, Write};

use serde::Serialize;

use crate::client::Response;

pub const EMPTY_RESPONSE: &str = "(empty response)";

/// Machine-readable summary printed with `--json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JsonOutput {
    pub text: Option<String>,
    pub thoughts: Option<String>,
    pub has_images: bool,
    pub image_count: usize,
}

impl JsonOutput {
    /// Summary of a text response. Thoughts are included only on request.
    pub fn from_response(response: &Response, show_thoughts: bool) -> Self {
        JsonOutput {
            text: response.text.clone(),
            thoughts: if show_thoughts {
                response.thoughts.clone()
            } else {
                None
            },
            has_images: response.has_images(),
            image_count: response.images.len(),
        }
    }

    /// Summary of a saved image.
    pub fn saved(path: &str, image_count: usize) -> Self {
        JsonOutput {
            text: Some(format!("Saved: {}", path)),
            thoughts: None,
            has_images: true,
            image_count,
        }
    }
}

pub fn write_json<W: Write>(out: &mut W, output: &JsonOutput) -> io::Result<()> {
    let json = serde_json::to_string_pretty(output)?;
    writeln!(out, "{}", json)
}

/// Plain rendering of a text response, with the thinking trace framed
/// above the answer when requested.
pub fn write_text<W: Write>(out: &mut W, response: &Response, show_thoughts: bool) -> io::Result<()> {
    if show_thoughts {
        if let Some(thoughts) = response.thoughts() {
            writeln!(out, "=== Thinking ===")?;
            writeln!(out, "{}", thoughts)?;
            writeln!(out, "\n=== Response ===")?;
        }
    }
    writeln!(out, "{}", response.text().unwrap_or(EMPTY_RESPONSE))
}

/// Plain rendering of a saved image.
pub fn write_saved<W: Write>(out: &mut W, path: &str, response: &Response) -> io::Result<()> {
    writeln!(out, "Saved: {}", path)?;
    if let Some(text) = response.text() {
        writeln!(out, "\nResponse: {}", text)?;
    }
    Ok(())
}
