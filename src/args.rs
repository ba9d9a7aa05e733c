// Argument parsing. The parser is a pure function over the token list: it
// never prints and never exits. The binary decides what to do with a help
// request or a usage error.

use thiserror::Error;

/// Model used when `--model` is not given.
pub const DEFAULT_MODEL: &str = "gemini-3.0-pro";

pub const HELP_TEXT: &str = "\
Usage: webapi [OPTIONS] PROMPT

All-purpose Gemini 3 Pro client with Thinking enabled.
Uses browser cookies for authentication - no API key required.

Arguments:
  PROMPT                Text prompt for query/generation

Options:
  --file, -f FILE       Input file (repeatable; MP4, PDF, PNG, JPG, etc.)
  --youtube URL         YouTube video URL to analyze
  --generate-image FILE Generate image and save to FILE
  --edit IMAGE          Edit existing image (use with --output)
  --output, -o FILE     Output file path (for image generation/editing)
  --aspect RATIO        Aspect ratio for image generation (16:9, 1:1, 4:3, 3:4)
  --show-thoughts       Display model's thinking process
  --model MODEL         Model to use (default: gemini-3.0-pro)
  --json                Output response as JSON
  --help, -h            Show this help message

Examples:
  # Text query
  webapi \"Explain quantum computing\"

  # Analyze local video
  webapi \"Summarize this video\" --file video.mp4

  # Analyze YouTube video
  webapi \"What are the key points?\" --youtube \"https://youtube.com/watch?v=...\"

  # Analyze document
  webapi \"Summarize this report\" --file report.pdf

  # Generate image
  webapi \"A sunset over mountains\" --generate-image sunset.png

  # Edit image
  webapi \"Make the sky purple\" --edit photo.jpg --output edited.png

  # Show thinking process
  webapi \"Solve this step by step: What is 15% of 240?\" --show-thoughts

Environment:
  ORACLE_GEMINI_SECURE_1PSID    __Secure-1PSID cookie value
  ORACLE_GEMINI_SECURE_1PSIDTS  __Secure-1PSIDTS cookie value
  ORACLE_GEMINI_NID             NID cookie value (optional)
  WEBAPI_GATEWAY_URL            Gateway base URL (default: http://localhost:8765)
  WEBAPI_COOKIE_FILE            Cookie store used when the variables above are unset
  WEBAPI_LOG                    Log filter (default: error)

Prerequisites:
  1. Log into gemini.google.com in Chrome
  2. Export the session cookies or store them in the cookie file";

/// A fully parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub prompt: String,
    pub files: Vec<String>,
    pub youtube: Option<String>,
    /// Output filename for a generated image.
    pub generate_image: Option<String>,
    /// Input image to edit.
    pub edit: Option<String>,
    pub output: Option<String>,
    pub aspect: Option<String>,
    pub show_thoughts: bool,
    pub model: String,
    pub json_output: bool,
}

impl Request {
    /// A request for `prompt` with every option at its default.
    pub fn new(prompt: impl Into<String>) -> Self {
        Request {
            prompt: prompt.into(),
            files: Vec::new(),
            youtube: None,
            generate_image: None,
            edit: None,
            output: None,
            aspect: None,
            show_thoughts: false,
            model: DEFAULT_MODEL.to_string(),
            json_output: false,
        }
    }

    /// Generating or editing an image.
    pub fn is_image_request(&self) -> bool {
        self.generate_image().is_some() || self.edit().is_some()
    }

    // Accessors below treat an empty value the same as an absent one.

    pub fn youtube(&self) -> Option<&str> {
        given(&self.youtube)
    }

    pub fn generate_image(&self) -> Option<&str> {
        given(&self.generate_image)
    }

    pub fn edit(&self) -> Option<&str> {
        given(&self.edit)
    }

    pub fn output(&self) -> Option<&str> {
        given(&self.output)
    }

    pub fn aspect(&self) -> Option<&str> {
        given(&self.aspect)
    }
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Help,
    Run(Request),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("{flag} requires {what}")]
    MissingValue {
        flag: &'static str,
        what: &'static str,
    },
    #[error("Unknown option {0}")]
    UnknownOption(String),
    #[error("PROMPT is required")]
    MissingPrompt,
}

/// Parse `args` (without the program name).
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Parsed, UsageError> {
    let mut files = Vec::new();
    let mut youtube = None;
    let mut generate_image = None;
    let mut edit = None;
    let mut output = None;
    let mut aspect = None;
    let mut show_thoughts = false;
    let mut model = DEFAULT_MODEL.to_string();
    let mut json_output = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut tokens = args.iter().map(AsRef::as_ref);
    while let Some(arg) = tokens.next() {
        let mut value = |flag: &'static str, what: &'static str| {
            tokens
                .next()
                .map(str::to_string)
                .ok_or(UsageError::MissingValue { flag, what })
        };
        match arg {
            "--help" | "-h" => return Ok(Parsed::Help),
            "--file" | "-f" => files.push(value("--file", "a path")?),
            "--youtube" => youtube = non_empty(value("--youtube", "a URL")?),
            "--generate-image" => {
                generate_image = non_empty(value("--generate-image", "an output filename")?)
            }
            "--edit" => edit = non_empty(value("--edit", "an input image")?),
            "--output" | "-o" => output = non_empty(value("--output", "a filename")?),
            "--aspect" => aspect = non_empty(value("--aspect", "a ratio")?),
            "--model" => model = value("--model", "a model name")?,
            "--show-thoughts" => show_thoughts = true,
            "--json" => json_output = true,
            word if !word.starts_with('-') => positional.push(word),
            other => return Err(UsageError::UnknownOption(other.to_string())),
        }
    }

    if positional.is_empty() {
        return Err(UsageError::MissingPrompt);
    }

    Ok(Parsed::Run(Request {
        prompt: positional.join(" "),
        files,
        youtube,
        generate_image,
        edit,
        output,
        aspect,
        show_thoughts,
        model,
        json_output,
    }))
}
