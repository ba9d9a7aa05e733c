//! Scripted `WebSession` used by the runner tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use webapi_cli::client::{
    ClientError, Exchange, ImageArtifact, Response, SessionOptions, WebSession,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Generate,
    Turn,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub prompt: String,
    pub files: Vec<PathBuf>,
    pub model: String,
}

/// Everything the session saw, shared with the test after the session
/// has been moved into the runner.
#[derive(Debug, Default)]
pub struct Log {
    pub options: Option<SessionOptions>,
    pub calls: Vec<Call>,
    pub saved: Vec<(PathBuf, String, ImageArtifact)>,
    pub releases: usize,
}

impl Log {
    pub fn models(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.model.as_str()).collect()
    }
}

pub struct FakeSession {
    replies: VecDeque<Result<Response, ClientError>>,
    init_error: Option<ClientError>,
    log: Rc<RefCell<Log>>,
}

impl FakeSession {
    pub fn new(replies: Vec<Result<Response, ClientError>>) -> (Self, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let session = FakeSession {
            replies: replies.into(),
            init_error: None,
            log: Rc::clone(&log),
        };
        (session, log)
    }

    pub fn failing_init(error: ClientError) -> (Self, Rc<RefCell<Log>>) {
        let (mut session, log) = Self::new(vec![]);
        session.init_error = Some(error);
        (session, log)
    }

    fn next_reply(&mut self, call: Call) -> Result<Response, ClientError> {
        self.log.borrow_mut().calls.push(call);
        self.replies
            .pop_front()
            .unwrap_or_else(|| Ok(Response::default()))
    }
}

pub struct FakeExchange<'a> {
    session: &'a mut FakeSession,
    model: String,
}

impl Exchange for FakeExchange<'_> {
    fn send_turn(&mut self, prompt: &str, files: &[PathBuf]) -> Result<Response, ClientError> {
        let call = Call {
            kind: CallKind::Turn,
            prompt: prompt.to_string(),
            files: files.to_vec(),
            model: self.model.clone(),
        };
        self.session.next_reply(call)
    }
}

impl WebSession for FakeSession {
    type Exchange<'a> = FakeExchange<'a>;

    fn initialize(&mut self, options: &SessionOptions) -> Result<(), ClientError> {
        self.log.borrow_mut().options = Some(options.clone());
        match self.init_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn generate(
        &mut self,
        prompt: &str,
        files: &[PathBuf],
        model: &str,
    ) -> Result<Response, ClientError> {
        let call = Call {
            kind: CallKind::Generate,
            prompt: prompt.to_string(),
            files: files.to_vec(),
            model: model.to_string(),
        };
        self.next_reply(call)
    }

    fn start_exchange(&mut self, model: &str) -> FakeExchange<'_> {
        FakeExchange {
            session: self,
            model: model.to_string(),
        }
    }

    fn save_image(
        &mut self,
        image: &ImageArtifact,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, ClientError> {
        self.log
            .borrow_mut()
            .saved
            .push((dir.to_path_buf(), filename.to_string(), image.clone()));
        Ok(dir.join(filename))
    }

    fn release(&mut self) {
        self.log.borrow_mut().releases += 1;
    }
}

pub fn text(text: &str) -> Response {
    Response {
        text: Some(text.to_string()),
        ..Response::default()
    }
}

pub fn with_images(text: Option<&str>, count: usize) -> Response {
    Response {
        text: text.map(String::from),
        thoughts: None,
        images: (0..count)
            .map(|i| ImageArtifact::Inline {
                data: vec![i as u8],
                title: None,
            })
            .collect(),
    }
}

pub fn placeholder() -> Response {
    text("http://googleusercontent.com/image_generation_content/0")
}

pub fn remote_error() -> ClientError {
    ClientError::Status {
        status: 500,
        body: "backend exploded".into(),
    }
}
