use std::path::PathBuf;

use serde::Deserialize;
use typed_builder::TypedBuilder;

pub const DEFAULT_BASE_URL: &str = "https://schedula.sportstg.com";

/// Connection settings.  Built once and moved into the transport.
#[derive(Clone, Debug, TypedBuilder)]
pub struct SessionConfig {
    #[builder(default = DEFAULT_BASE_URL.to_owned(), setter(into))]
    pub base_url: String,
    /// HTTP(S) proxy address, e.g. `http://127.0.0.1:8080`.
    #[builder(default, setter(strip_option, into))]
    pub proxy: Option<String>,
    /// Skips certificate verification.  Only meant for an intercepting proxy.
    #[builder(default)]
    pub accept_invalid_certs: bool,
    #[builder(default, setter(strip_option, into))]
    pub user_agent: Option<String>,
}

/// Contents of the optional TOML configuration file.  Command line flags
/// take precedence over every field.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub proxy: Option<String>,
    pub accept_invalid_certs: bool,
    pub user_agent: Option<String>,
    pub credentials_path: Option<PathBuf>,
    /// Season label to pull, e.g. `"2020"`.
    pub season: Option<String>,
}

impl FileConfig {
    pub fn session(&self, proxy: Option<String>) -> SessionConfig {
        SessionConfig {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            proxy: proxy.or_else(|| self.proxy.clone()),
            accept_invalid_certs: self.accept_invalid_certs,
            user_agent: self.user_agent.clone(),
        }
    }
}
