use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::backends::{default_registry, BackendChain, DebugTrailer, ExternalBackend};
use crate::notice::DEFAULT_AUTHOR_LIMIT;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// A JSON configuration document was malformed.
    #[error("invalid configuration document: {source}")]
    Json {
        /// Parser error.
        #[from]
        source: serde_json::Error,
    },
}

/// Engine settings. Every field has a default, so partial documents load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Try the in-process libgit2 backend first.
    pub in_process_backend: bool,
    /// External diff tool, invoked as `<command> <old-file> <new-file>`.
    pub external_command: Option<String>,
    /// Time budget for one external invocation.
    pub external_timeout_secs: u64,
    /// Directory for the external tool's temporary files.
    pub temp_dir: Option<Utf8PathBuf>,
    /// Append a generator trailer to freshly computed bodies.
    pub debug_comments: bool,
    /// Host name included in the generator trailer.
    pub hostname: Option<String>,
    /// Namespace for cache keys.
    pub cache_key_prefix: String,
    /// Leave the line-1 hunk label empty.
    pub reduced_line_numbers: bool,
    /// Author count beyond which the multi-edit notice says "many".
    pub multi_notice_author_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            in_process_backend: true,
            external_command: None,
            external_timeout_secs: 10,
            temp_dir: None,
            debug_comments: false,
            hostname: None,
            cache_key_prefix: "revdiff".to_owned(),
            reduced_line_numbers: false,
            multi_notice_author_limit: DEFAULT_AUTHOR_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `REVDIFF_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(|var| env::var(var).ok())
    }

    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] when the document is malformed.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Applies overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("REVDIFF_IN_PROCESS") {
            self.in_process_backend = parse_bool("REVDIFF_IN_PROCESS", &value)?;
        }
        if let Some(value) = lookup("REVDIFF_EXTERNAL_DIFF") {
            self.external_command = Some(value).filter(|command| !command.is_empty());
        }
        if let Some(value) = lookup("REVDIFF_EXTERNAL_TIMEOUT") {
            self.external_timeout_secs = parse_u64("REVDIFF_EXTERNAL_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("REVDIFF_TEMP_DIR") {
            self.temp_dir = Some(Utf8PathBuf::from(value));
        }
        if let Some(value) = lookup("REVDIFF_DEBUG_COMMENTS") {
            self.debug_comments = parse_bool("REVDIFF_DEBUG_COMMENTS", &value)?;
        }
        if let Some(value) = lookup("REVDIFF_SHOW_HOSTNAME") {
            if parse_bool("REVDIFF_SHOW_HOSTNAME", &value)? {
                self.hostname = lookup("HOSTNAME").filter(|host| !host.is_empty());
            }
        }
        if let Some(value) = lookup("REVDIFF_CACHE_PREFIX") {
            self.cache_key_prefix = value;
        }
        Ok(self)
    }

    /// External backend described by this configuration.
    #[must_use]
    pub fn external_backend(&self) -> ExternalBackend {
        let backend = self
            .external_command
            .as_ref()
            .map_or_else(ExternalBackend::disabled, ExternalBackend::new)
            .with_timeout(Duration::from_secs(self.external_timeout_secs));
        match &self.temp_dir {
            Some(dir) => backend.with_temp_dir(dir.as_std_path()),
            None => backend,
        }
    }

    /// Backend chain described by this configuration.
    #[must_use]
    pub fn backend_chain(&self) -> BackendChain {
        let chain = BackendChain::new(default_registry(
            self.in_process_backend,
            self.external_backend(),
        ));
        if self.debug_comments {
            chain.with_debug_trailer(DebugTrailer::new(self.hostname.clone()))
        } else {
            chain
        }
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_owned(),
        }),
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_owned(),
    })
}
