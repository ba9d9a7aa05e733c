// Request runner: executes one parsed `Request` against a `WebSession`.
//
// Order of work:
// 1. augment the prompt (aspect ratio, YouTube link, image prefix)
// 2. resolve attachment paths, failing before any session exists
// 3. create and initialize the session
// 4. dispatch (edit exchange, files, or plain prompt)
// 5. for image requests, retry on the fallback models when the backend
//    answered with the bare image placeholder, then save the first image
// 6. render to the output writer
//
// The session is wrapped in `SessionGuard` as soon as it exists, so it is
// released exactly once whichever step fails.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::args::{Request, DEFAULT_MODEL};
use crate::client::{ClientError, Exchange, Response, SessionOptions, WebSession};
use crate::error::RunError;
use crate::logging::{self, Spinner};
use crate::render::{self, JsonOutput, EMPTY_RESPONSE};

/// Models tried, in order, when the default model fails to deliver an image.
pub const FALLBACK_MODELS: [&str; 2] = ["gemini-2.5-pro", "gemini-2.5-flash"];

/// Text the backend sometimes returns instead of an image payload.
// Brittle: this is an undocumented backend quirk, matched by prefix.
pub const IMAGE_PLACEHOLDER_PREFIX: &str = "http://googleusercontent.com/image_generation_content/";

pub const DEFAULT_IMAGE_FILE: &str = "generated.png";

const EDIT_SOURCE_TURN: &str = "Here is an image to edit";

/// Build the prompt actually sent to the model.
pub fn augment_prompt(request: &Request) -> String {
    let mut prompt = request.prompt.clone();
    if let Some(aspect) = request.aspect() {
        if request.is_image_request() {
            prompt = format!("{} (aspect ratio: {})", prompt, aspect);
        }
    }
    if let Some(url) = request.youtube() {
        prompt = format!("{}\n\nYouTube video: {}", prompt, url);
    }
    if request.generate_image().is_some() && request.edit().is_none() {
        prompt = format!("Generate an image: {}", prompt);
    }
    prompt
}

/// Attachments resolved to absolute paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub files: Vec<PathBuf>,
    pub edit: Option<PathBuf>,
}

/// Check every attachment exists and make it absolute.
pub fn resolve_paths(request: &Request) -> Result<ResolvedPaths, RunError> {
    let mut files = Vec::with_capacity(request.files.len());
    for raw in &request.files {
        let path = resolve(raw).ok_or_else(|| RunError::FileNotFound(raw.clone()))?;
        files.push(path);
    }
    let edit = match request.edit() {
        Some(raw) => Some(resolve(raw).ok_or_else(|| RunError::ImageNotFound(raw.to_string()))?),
        None => None,
    };
    Ok(ResolvedPaths { files, edit })
}

fn resolve(raw: &str) -> Option<PathBuf> {
    let path = Path::new(raw);
    if !path.exists() {
        return None;
    }
    path.canonicalize().ok()
}

/// Where a generated image is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// The path as the user gave it, used in `Saved:` lines.
    pub display: String,
    pub dir: PathBuf,
    pub filename: String,
}

impl OutputTarget {
    pub fn for_request(request: &Request) -> Self {
        let display = request
            .generate_image()
            .or_else(|| request.output())
            .unwrap_or(DEFAULT_IMAGE_FILE)
            .to_string();
        let path = Path::new(&display);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_IMAGE_FILE.to_string());
        OutputTarget {
            display,
            dir,
            filename,
        }
    }
}

/// True when an image request should be retried on the fallback models.
pub fn needs_fallback(response: &Response, model: &str) -> bool {
    !response.has_images()
        && model == DEFAULT_MODEL
        && response
            .text()
            .map_or(false, |text| text.starts_with(IMAGE_PLACEHOLDER_PREFIX))
}

/// The three request shapes the runner can send.
#[derive(Debug, Clone, Copy)]
enum Shape<'a> {
    Edit(&'a Path),
    Files(&'a [PathBuf]),
    Plain,
}

impl<'a> Shape<'a> {
    fn for_paths(paths: &'a ResolvedPaths) -> Self {
        match (&paths.edit, paths.files.is_empty()) {
            (Some(image), _) => Shape::Edit(image),
            (None, false) => Shape::Files(&paths.files),
            (None, true) => Shape::Plain,
        }
    }

    /// Prompt text sent for this shape.
    fn prompt(&self, prompt: &str) -> String {
        match self {
            Shape::Edit(_) => format!("Use image generation tool to {}", prompt),
            _ => prompt.to_string(),
        }
    }
}

fn dispatch<S: WebSession>(
    session: &mut S,
    shape: Shape<'_>,
    prompt: &str,
    model: &str,
) -> Result<Response, ClientError> {
    debug!(?shape, model, "dispatching request");
    let _spinner = Spinner::start(format!("Waiting for {}", model));
    match shape {
        Shape::Edit(image) => {
            let mut exchange = session.start_exchange(model);
            exchange.send_turn(EDIT_SOURCE_TURN, &[image.to_path_buf()])?;
            exchange.send_turn(prompt, &[])
        }
        Shape::Files(files) => session.generate(prompt, files, model),
        Shape::Plain => session.generate(prompt, &[], model),
    }
}

/// Owns the session for one invocation and releases it on drop.
struct SessionGuard<S: WebSession> {
    session: S,
}

impl<S: WebSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        debug!("releasing session");
        self.session.release();
    }
}

/// Runs requests, writing rendered output to `out`.
pub struct Runner<W: Write> {
    out: W,
    options: SessionOptions,
}

impl<W: Write> Runner<W> {
    pub fn new(out: W) -> Self {
        Runner {
            out,
            options: SessionOptions::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Execute `request`. `make_session` is only called once every
    /// attachment has been found on disk.
    pub fn run<S, F>(&mut self, request: &Request, make_session: F) -> Result<(), RunError>
    where
        S: WebSession,
        F: FnOnce() -> S,
    {
        let prompt = augment_prompt(request);
        let paths = resolve_paths(request)?;

        logging::status("Initializing Gemini client...");
        let mut guard = SessionGuard {
            session: make_session(),
        };
        guard
            .session
            .initialize(&self.options)
            .map_err(RunError::SessionInit)?;

        let result = self.execute(&mut guard.session, request, &prompt, &paths);
        drop(guard);
        result
    }

    fn execute<S: WebSession>(
        &mut self,
        session: &mut S,
        request: &Request,
        prompt: &str,
        paths: &ResolvedPaths,
    ) -> Result<(), RunError> {
        let shape = Shape::for_paths(paths);
        let prompt = shape.prompt(prompt);

        logging::status(&format!("Querying {}...", request.model));
        let mut response =
            dispatch(session, shape, &prompt, &request.model).map_err(RunError::Remote)?;

        if !request.is_image_request() {
            return self.render_text(request, &response);
        }

        if needs_fallback(&response, &request.model) {
            for model in FALLBACK_MODELS {
                logging::status(&format!("Retrying image generation with {}...", model));
                response = dispatch(session, shape, &prompt, model).map_err(RunError::Remote)?;
                if response.has_images() {
                    info!(model, "fallback model produced an image");
                    break;
                }
            }
        }

        if !response.has_images() {
            logging::status("No images generated. Response text:");
            writeln!(self.out, "{}", response.text().unwrap_or(EMPTY_RESPONSE))?;
            return Err(RunError::NoImages {
                text: response.text,
            });
        }

        let target = OutputTarget::for_request(request);
        let written = session
            .save_image(&response.images[0], &target.dir, &target.filename)
            .map_err(|source| RunError::Save {
                path: target.display.clone(),
                source,
            })?;
        debug!(path = %written.display(), "image saved");

        let count = response.images.len();
        if count > 1 {
            logging::status(&format!("({} images generated, saved first one)", count));
        }

        if request.json_output {
            render::write_json(&mut self.out, &JsonOutput::saved(&target.display, count))?;
        } else {
            render::write_saved(&mut self.out, &target.display, &response)?;
        }
        Ok(())
    }

    fn render_text(&mut self, request: &Request, response: &Response) -> Result<(), RunError> {
        if request.json_output {
            let output = JsonOutput::from_response(response, request.show_thoughts);
            render::write_json(&mut self.out, &output)?;
        } else {
            render::write_text(&mut self.out, response, request.show_thoughts)?;
        }
        Ok(())
    }
}
