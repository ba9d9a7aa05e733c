// Gateway session: the production `WebSession`. It holds a small blocking
// HTTP client that talks to the gateway fronting the web backend, carrying
// the browser session cookies in a cookie jar.
//
// Endpoints used:
// - POST   /v1/session   open a session, returns an access token
// - POST   /v1/generate  multipart prompt + attachments, returns the reply
// - DELETE /v1/session   close the session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::cookie::Jar;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ClientError, Exchange, ImageArtifact, Response, SessionOptions, WebSession};
use crate::config::{
    load_cookie_file, CredentialSource, Credentials, GatewayConfig, COOKIE_1PSID, COOKIE_1PSIDTS,
    COOKIE_NID,
};

/// Reply of `POST /v1/session`.
#[derive(Deserialize, Debug)]
struct SessionInfo {
    access_token: String,
}

/// Reply of `POST /v1/generate`.
#[derive(Deserialize, Debug)]
struct GenerateReply {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thoughts: Option<String>,
    #[serde(default)]
    images: Vec<ImagePayload>,
    /// Conversation metadata, echoed back on the next turn of an exchange.
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct ImagePayload {
    #[serde(default)]
    url: Option<String>,
    /// Base64-encoded image bytes.
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl ImagePayload {
    fn into_artifact(self) -> Result<ImageArtifact, ClientError> {
        match (self.data, self.url) {
            (Some(data), _) => {
                let bytes = BASE64
                    .decode(data.trim())
                    .map_err(|e| ClientError::Decode(format!("image data: {}", e)))?;
                Ok(ImageArtifact::Inline {
                    data: bytes,
                    title: self.title,
                })
            }
            (None, Some(url)) => Ok(ImageArtifact::Remote {
                url,
                title: self.title,
            }),
            (None, None) => Err(ClientError::Decode(
                "image entry has neither data nor url".into(),
            )),
        }
    }
}

impl GenerateReply {
    fn into_response(self) -> Result<Response, ClientError> {
        let images = self
            .images
            .into_iter()
            .map(ImagePayload::into_artifact)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Response {
            text: self.text,
            thoughts: self.thoughts,
            images,
        })
    }
}

/// Cookies to send, from explicit credentials or the ambient cookie store.
pub fn session_cookies(
    credentials: &Credentials,
    cookie_file: Option<&Path>,
) -> Result<Vec<(String, String)>, ClientError> {
    match credentials.source() {
        CredentialSource::Explicit {
            secure_1psid,
            secure_1psidts,
            nid,
        } => {
            debug!("using session cookies from the environment");
            let mut cookies = vec![
                (COOKIE_1PSID.to_string(), secure_1psid),
                (COOKIE_1PSIDTS.to_string(), secure_1psidts),
            ];
            if let Some(nid) = nid {
                cookies.push((COOKIE_NID.to_string(), nid));
            }
            Ok(cookies)
        }
        CredentialSource::Ambient => {
            let path = cookie_file.ok_or_else(|| {
                ClientError::Credentials("no cookie store location available".into())
            })?;
            debug!(path = %path.display(), "using session cookies from cookie store");
            let stored = load_cookie_file(path)?;
            if !stored.contains_key(COOKIE_1PSID) {
                return Err(ClientError::Credentials(format!(
                    "{} not found in {}",
                    COOKIE_1PSID,
                    path.display()
                )));
            }
            let mut cookies: Vec<(String, String)> = stored.into_iter().collect();
            cookies.sort();
            Ok(cookies)
        }
    }
}

/// MIME type for an attachment, guessed from its extension.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("txt") | Some("md") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("html") | Some("htm") => "text/html",
        _ => "application/octet-stream",
    }
}

/// Turn a non-success reply into `ClientError::Status`.
fn check_status(res: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ClientError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().unwrap_or_default();
    Err(ClientError::Status { status, body })
}

pub struct GatewaySession {
    config: GatewayConfig,
    credentials: Credentials,
    options: SessionOptions,
    client: Option<Client>,
    access_token: Option<String>,
}

impl GatewaySession {
    /// Nothing touches the network until `initialize`.
    pub fn new(config: GatewayConfig, credentials: Credentials) -> Self {
        GatewaySession {
            config,
            credentials,
            options: SessionOptions::default(),
            client: None,
            access_token: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn client(&self) -> Result<&Client, ClientError> {
        self.client.as_ref().ok_or(ClientError::NotInitialized)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn open(&mut self) -> Result<(), ClientError> {
        let body = serde_json::json!({ "auto_refresh": self.options.auto_refresh });
        let res = self
            .client()?
            .post(self.url("/v1/session"))
            .json(&body)
            .send()?;
        let info: SessionInfo = check_status(res)?.json()?;
        debug!("gateway session opened");
        self.access_token = Some(info.access_token);
        Ok(())
    }

    fn build_form(
        prompt: &str,
        files: &[PathBuf],
        model: &str,
        metadata: Option<&Value>,
    ) -> Result<multipart::Form, ClientError> {
        let mut form = multipart::Form::new()
            .text("prompt", prompt.to_string())
            .text("model", model.to_string());
        if let Some(metadata) = metadata {
            form = form.text("metadata", metadata.to_string());
        }
        for path in files {
            let bytes = std::fs::read(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".into());
            let part = multipart::Part::bytes(bytes)
                .file_name(name)
                .mime_str(guess_mime(path))?;
            form = form.part("file", part);
        }
        Ok(form)
    }

    /// One generate call, refreshing the session once on 401 when enabled.
    fn call(
        &mut self,
        prompt: &str,
        files: &[PathBuf],
        model: &str,
        metadata: Option<&Value>,
    ) -> Result<GenerateReply, ClientError> {
        if self.access_token.is_none() {
            self.open()?;
        }

        let mut refreshed = false;
        let reply = loop {
            let form = Self::build_form(prompt, files, model, metadata)?;
            let request = self.client()?.post(self.url("/v1/generate")).multipart(form);
            let res = self.authorized(request).send()?;

            if res.status() == StatusCode::UNAUTHORIZED && self.options.auto_refresh && !refreshed {
                warn!("gateway session expired, refreshing");
                refreshed = true;
                self.open()?;
                continue;
            }
            break check_status(res)?.json::<GenerateReply>()?;
        };

        if self.options.auto_close {
            self.close();
        }
        Ok(reply)
    }

    fn close(&mut self) {
        if self.access_token.is_none() {
            return;
        }
        let result = self.client().map(|client| client.delete(self.url("/v1/session")));
        if let Ok(request) = result {
            match self.authorized(request).send().map_err(ClientError::from).and_then(check_status) {
                Ok(_) => debug!("gateway session closed"),
                Err(e) => warn!(error = %e, "failed to close gateway session"),
            }
        }
        self.access_token = None;
    }

    fn resolve_image_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            self.url(url)
        } else {
            url.to_string()
        }
    }
}

/// Multi-turn exchange sharing one conversation.
pub struct GatewayExchange<'a> {
    session: &'a mut GatewaySession,
    model: String,
    metadata: Option<Value>,
}

impl Exchange for GatewayExchange<'_> {
    fn send_turn(&mut self, prompt: &str, files: &[PathBuf]) -> Result<Response, ClientError> {
        let mut reply = self
            .session
            .call(prompt, files, &self.model, self.metadata.as_ref())?;
        if let Some(metadata) = reply.metadata.take() {
            self.metadata = Some(metadata);
        }
        reply.into_response()
    }
}

impl WebSession for GatewaySession {
    type Exchange<'a> = GatewayExchange<'a>;

    fn initialize(&mut self, options: &SessionOptions) -> Result<(), ClientError> {
        self.options = options.clone();

        let base = Url::parse(&self.config.base_url)
            .map_err(|e| anyhow!("invalid gateway URL {}: {}", self.config.base_url, e))?;
        let cookies = session_cookies(&self.credentials, self.config.cookie_file.as_deref())?;
        let jar = Arc::new(Jar::default());
        for (name, value) in &cookies {
            jar.add_cookie_str(&format!("{}={}", name, value), &base);
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(options.timeout)
            .build()?;
        self.client = Some(client);
        self.open()
    }

    fn generate(
        &mut self,
        prompt: &str,
        files: &[PathBuf],
        model: &str,
    ) -> Result<Response, ClientError> {
        self.call(prompt, files, model, None)?.into_response()
    }

    fn start_exchange(&mut self, model: &str) -> GatewayExchange<'_> {
        GatewayExchange {
            session: self,
            model: model.to_string(),
            metadata: None,
        }
    }

    fn save_image(
        &mut self,
        image: &ImageArtifact,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, ClientError> {
        let bytes = match image {
            ImageArtifact::Inline { data, .. } => data.clone(),
            ImageArtifact::Remote { url, .. } => {
                let res = self.client()?.get(self.resolve_image_url(url)).send()?;
                check_status(res)?.bytes()?.to_vec()
            }
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(filename);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    fn release(&mut self) {
        self.close();
        self.client = None;
    }
}
