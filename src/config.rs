// Configuration: everything the tool reads from the environment is read
// here, once, into plain structs. The runner and the gateway session take
// these structs as arguments so tests can inject their own values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const ENV_SECURE_1PSID: &str = "ORACLE_GEMINI_SECURE_1PSID";
pub const ENV_SECURE_1PSIDTS: &str = "ORACLE_GEMINI_SECURE_1PSIDTS";
pub const ENV_NID: &str = "ORACLE_GEMINI_NID";
pub const ENV_GATEWAY_URL: &str = "WEBAPI_GATEWAY_URL";
pub const ENV_COOKIE_FILE: &str = "WEBAPI_COOKIE_FILE";

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8765";

pub const COOKIE_1PSID: &str = "__Secure-1PSID";
pub const COOKIE_1PSIDTS: &str = "__Secure-1PSIDTS";
pub const COOKIE_NID: &str = "NID";

/// Session cookies supplied through the environment. All three are
/// optional; they only count as explicit credentials when both primary
/// values are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub secure_1psid: Option<String>,
    pub secure_1psidts: Option<String>,
    pub nid: Option<String>,
}

/// Where session cookies come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit {
        secure_1psid: String,
        secure_1psidts: String,
        nid: Option<String>,
    },
    /// Cookies stored by a prior browser login.
    Ambient,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Credentials {
            secure_1psid: get(ENV_SECURE_1PSID),
            secure_1psidts: get(ENV_SECURE_1PSIDTS),
            nid: get(ENV_NID),
        }
    }

    pub fn source(&self) -> CredentialSource {
        match (&self.secure_1psid, &self.secure_1psidts) {
            (Some(psid), Some(psidts)) => CredentialSource::Explicit {
                secure_1psid: psid.clone(),
                secure_1psidts: psidts.clone(),
                nid: self.nid.clone(),
            },
            _ => CredentialSource::Ambient,
        }
    }
}

/// Settings for the HTTP gateway session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Cookie store used when no explicit credentials are set.
    pub cookie_file: Option<PathBuf>,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_GATEWAY_URL)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.into());
        let cookie_file = lookup(ENV_COOKIE_FILE)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(default_cookie_file);
        GatewayConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_file,
        }
    }
}

/// `<config_dir>/webapi/cookies.json`, if the platform has a config dir.
pub fn default_cookie_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("webapi").join("cookies.json"))
}

/// Load a cookie store: a flat JSON object mapping cookie names to values.
pub fn load_cookie_file(path: &Path) -> Result<HashMap<String, String>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cookie store {}", path.display()))?;
    let cookies: HashMap<String, String> = serde_json::from_str(&data)
        .with_context(|| format!("Parsing cookie store {}", path.display()))?;
    Ok(cookies)
}
