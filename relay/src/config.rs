//! Relay configuration: CLI flags with environment fallbacks.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;

/// Model used when no override is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1";

#[derive(Parser)]
#[command(name = "portfolio-relay", about = "Chat relay for the portfolio site")]
pub struct Cli {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Credential for the upstream chat-completion API.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model override. Surrounding quotes are stripped.
    #[arg(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub openai_base_url: String,

    /// Read the system prompt from this file instead of the built-in one.
    #[arg(long)]
    pub knowledge_file: Option<PathBuf>,

    /// Serve the built site from this directory alongside the API.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

/// Validated relay settings.
///
/// The credential stays optional: a missing key is reported per request as a
/// 500 rather than refusing to start.
#[derive(Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub model: String,
    pub upstream_url: String,
    pub knowledge_file: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Minimal config pointed at `upstream_url`, used by tests and embedders.
    pub fn new(api_key: Option<&str>, model: Option<&str>, upstream_url: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            model: resolve_model(model),
            upstream_url: upstream_url.to_string(),
            knowledge_file: None,
            static_dir: None,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Cli> for RelayConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            api_key: cli.openai_api_key.filter(|k| !k.is_empty()),
            model: resolve_model(cli.openai_model.as_deref()),
            upstream_url: cli.openai_base_url,
            knowledge_file: cli.knowledge_file,
            static_dir: cli.static_dir,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("upstream_url", &self.upstream_url)
            .field("knowledge_file", &self.knowledge_file)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

/// Trim, then strip one pair of matching surrounding `"` or `'`, then trim again.
pub fn normalize_model(raw: &str) -> &str {
    let v = raw.trim();
    let quoted = v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')));
    if quoted {
        v[1..v.len() - 1].trim()
    } else {
        v
    }
}

/// The configured model, or [`DEFAULT_MODEL`] when unset or blank.
pub fn resolve_model(raw: Option<&str>) -> String {
    match raw.map(normalize_model) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => DEFAULT_MODEL.to_string(),
    }
}
