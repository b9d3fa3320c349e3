//! File-backed configuration.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! log_requests = true
//! prefix_matching = "prefix"   # or "substring"
//! static_folder = "public"
//! static_path = "/assets"
//! templates = ["views/index.html", "views/layout.html"]
//! max_body_size = 1048576
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::prefix::Matching;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Emit one `info` event per request before dispatching it.
    pub log_requests: bool,
    /// Resolve static folders and template files under
    /// [`SERVERLESS_ROOT`](crate::SERVERLESS_ROOT).
    pub serverless: bool,
    /// Selection rule for mounted static folders and template sets.
    /// Mounted middleware always uses [`Matching::Prefix`].
    pub prefix_matching: Matching,
    pub static_folder: Option<PathBuf>,
    /// URL path the static folder is served under; `/` when unset.
    pub static_path: Option<String>,
    pub templates: Vec<PathBuf>,
    /// Largest request body the server buffers, in bytes. Larger bodies are
    /// answered with `413 Payload Too Large`.
    pub max_body_size: usize,
}

/// 2 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3000,
            log_requests: false,
            serverless: false,
            prefix_matching: Matching::Prefix,
            static_folder: None,
            static_path: None,
            templates: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// `host:port`, ready for [`Server::bind`](crate::Server::bind).
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
