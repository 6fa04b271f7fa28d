//! Transfer endpoints.
//!
//! The `files_url` configuration key says how a platform's storage is
//! reached. It is parsed once, at platform construction, into an
//! [`Endpoint`]. Supported forms:
//!
//! | `files_url`                 | Scheme  | Destination grammar |
//! |-----------------------------|---------|---------------------|
//! | `/data/shared`              | `""`    | `path`              |
//! | `file:///data`              | `file`  | `path`              |
//! | `ssh://user@node1:2222`     | `ssh`   | `user@node1:path`   |
//! | `rsync://storage`           | `rsync` | `storage::path`     |
//!
//! Anything else is a construction-time [`ConfigError`].

use std::path::Path;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};
use url::Url;

use crate::error::ConfigError;

/// How files reach a platform's storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Scheme {
    /// Bare path, no transport
    #[strum(serialize = "")]
    Local,
    /// Local or already-shared filesystem
    #[strum(serialize = "file")]
    File,
    /// Commands wrapped in a remote shell, rsync over ssh
    #[strum(serialize = "ssh")]
    Ssh,
    /// rsync daemon (`host::path`); directories are created over ssh
    #[strum(serialize = "rsync")]
    Rsync,
}

impl Scheme {
    /// Whether commands for this scheme run on another host
    pub fn is_remote(&self) -> bool {
        matches!(self, Scheme::Ssh | Scheme::Rsync)
    }
}

/// Parsed form of a transfer URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    user: Option<String>,
    port: Option<u16>,
}

impl Endpoint {
    /// Endpoint for the local filesystem
    pub fn local() -> Self {
        Self {
            scheme: Scheme::Local,
            host: String::new(),
            user: None,
            port: None,
        }
    }

    /// Parse a `files_url` value.
    pub fn parse(files_url: &str) -> Result<Self, ConfigError> {
        let trimmed = files_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidUrl {
                url: files_url.to_string(),
                reason: "empty url".to_string(),
            });
        }

        if trimmed.starts_with('/') {
            return Ok(Self::local());
        }

        let url = match Url::parse(trimmed) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => return Ok(Self::local()),
            Err(e) => {
                return Err(ConfigError::InvalidUrl {
                    url: files_url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let scheme = Scheme::from_str(url.scheme())
            .map_err(|_| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;

        let host = url.host_str().unwrap_or_default().to_string();
        if scheme.is_remote() && host.is_empty() {
            return Err(ConfigError::InvalidUrl {
                url: files_url.to_string(),
                reason: format!("{} urls need a host", scheme),
            });
        }

        let user = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        Ok(Self {
            scheme,
            host,
            user,
            port: url.port(),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `user@host`, or just `host` when no user was given
    pub fn authority(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Address of `path` in the grammar of this endpoint's transfer tool
    pub fn destination(&self, path: &Path) -> String {
        match self.scheme {
            Scheme::Local | Scheme::File => path.display().to_string(),
            Scheme::Ssh => format!("{}:{}", self.authority(), path.display()),
            Scheme::Rsync => format!("{}::{}", self.authority(), path.display()),
        }
    }
}
