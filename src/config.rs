//! `quill.toml` configuration.
//!
//! ```toml
//! escape = "mysql"
//!
//! [database]
//! url = "mysql://root@localhost/shop"
//! max_connections = 5
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::QuillResult;
use crate::sanitize::{Escape, ManualEscape, MySqlEscape, Sanitizer};

pub const CONFIG_FILE: &str = "quill.toml";

/// Which escaping rules detached queries use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// Double single quotes; safe under any `sql_mode`.
    #[default]
    Manual,
    /// Backslash escaping, as the MySQL client library does it.
    Mysql,
}

impl EscapeMode {
    pub fn sanitizer(self) -> Sanitizer {
        let escaper: Arc<dyn Escape> = match self {
            EscapeMode::Manual => Arc::new(ManualEscape),
            EscapeMode::Mysql => Arc::new(MySqlEscape),
        };
        Sanitizer::new(escaper)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub escape: EscapeMode,
}

impl QuillConfig {
    pub fn from_toml(content: &str) -> QuillResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> QuillResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load from `explicit`, else the first of `./quill.toml` and
    /// `<config dir>/quill/quill.toml` that exists, else defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> QuillResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::candidates().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("quill").join(CONFIG_FILE));
        }
        paths
    }

    /// Replace the database URL when `url` is set (e.g. from the environment).
    pub fn with_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.database.url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_config() {
        let config = QuillConfig::from_toml(
            r#"
            escape = "mysql"

            [database]
            url = "mysql://root@localhost/shop"
            max_connections = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.escape, EscapeMode::Mysql);
        assert_eq!(config.database.url.as_deref(), Some("mysql://root@localhost/shop"));
        assert_eq!(config.database.max_connections, 12);
    }

    #[test]
    fn test_defaults() {
        let config = QuillConfig::from_toml("").unwrap();
        assert_eq!(config, QuillConfig::default());
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_bad_escape_mode() {
        assert!(QuillConfig::from_toml(r#"escape = "shouty""#).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        assert!(QuillConfig::load(Some(Path::new("/nonexistent/quill.toml"))).is_err());
    }

    #[test]
    fn test_url_override() {
        let config = QuillConfig::default().with_url(Some("mysql://h/db".to_string()));
        assert_eq!(config.database.url.as_deref(), Some("mysql://h/db"));
        let config = config.with_url(None);
        assert_eq!(config.database.url.as_deref(), Some("mysql://h/db"));
    }

    #[test]
    fn test_escape_mode_sanitizer() {
        assert_eq!(EscapeMode::Manual.sanitizer().quote("it's"), "'it''s'");
        assert_eq!(EscapeMode::Mysql.sanitizer().quote("it's"), "'it\\'s'");
    }
}
