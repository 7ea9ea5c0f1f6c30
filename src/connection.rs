//! Capture server address configuration and URL normalization.
//!
//! - [`ServerAddress`]: Validated server URL with source tracking
//! - [`AddressSource`]: Where the address configuration came from
//! - [`AddressError`]: User-friendly validation errors
//!
//! # Address Resolution Precedence
//!
//! Addresses are resolved in this order (highest priority first):
//! 1. `--server` on the command line
//! 2. `ASTROPI_URL` environment variable
//! 3. `server.url` from the configuration file
//! 4. Default: `http://127.0.0.1:5000`
//!
//! # Example
//!
//! ```
//! use astropi_control::connection::{AddressSource, ServerAddress};
//!
//! let addr = ServerAddress::parse("astropi.local", AddressSource::CommandLine)?;
//! assert_eq!(addr.as_str(), "http://astropi.local:5000/");
//! # Ok::<(), astropi_control::connection::AddressError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use url::Url;

/// Environment variable consulted by [`resolve_address`].
pub const SERVER_URL_ENV: &str = "ASTROPI_URL";

/// Default HTTP port of the capture server.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default server address when no configuration is provided.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Source of the server address configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSource {
    /// Hardcoded default
    Default,
    /// `server.url` in the configuration file
    ConfigFile,
    /// `ASTROPI_URL` environment variable
    Environment,
    /// `--server` flag
    CommandLine,
}

impl AddressSource {
    /// Returns the priority for address resolution (higher = preferred).
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::ConfigFile => 1,
            Self::Environment => 2,
            Self::CommandLine => 3,
        }
    }

    /// Returns a short label for display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ConfigFile => "config",
            Self::Environment => "env",
            Self::CommandLine => "cli",
        }
    }
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::ConfigFile => write!(f, "Configuration file"),
            Self::Environment => write!(f, "Environment ({SERVER_URL_ENV})"),
            Self::CommandLine => write!(f, "Command line"),
        }
    }
}

/// Validated capture server address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddress {
    /// The normalized URL (always has scheme and port)
    url: String,
    /// Where this address came from
    source: AddressSource,
    /// Original input string (for display/debugging)
    original: String,
}

impl ServerAddress {
    /// Parse and normalize a server URL.
    ///
    /// Accepts bare `host`, `host:port` or full `http(s)://` URLs.
    pub fn parse(input: &str, source: AddressSource) -> Result<Self, AddressError> {
        let normalized = normalize_url(input)?;
        Ok(Self {
            url: normalized.to_string(),
            source,
            original: input.to_string(),
        })
    }

    /// Returns the normalized URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Returns where this address came from.
    #[must_use]
    pub fn source(&self) -> AddressSource {
        self.source
    }

    /// Returns the original input string before normalization.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Returns `true` if this address uses TLS (https scheme).
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.url.starts_with("https://")
    }

    /// Join an API path (e.g. `/status`) onto the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, AddressError> {
        let base = Url::parse(&self.url).map_err(|e| AddressError::InvalidUrl(e.to_string()))?;
        base.join(path.trim_start_matches('/'))
            .map_err(|e| AddressError::InvalidUrl(e.to_string()))
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self {
            url: format!("{DEFAULT_SERVER_URL}/"),
            source: AddressSource::Default,
            original: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

/// URL validation error with user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Input was empty or whitespace-only
    EmptyInput,
    /// URL parsing failed
    InvalidUrl(String),
    /// No host was found in the URL
    MissingHost,
    /// Port could not be set
    InvalidPort(String),
    /// Unsupported URL scheme (only http/https allowed)
    UnsupportedScheme(String),
}

impl std::error::Error for AddressError {}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Address cannot be empty"),
            Self::InvalidUrl(e) => write!(f, "Invalid URL: {e}"),
            Self::MissingHost => write!(f, "URL must include a host"),
            Self::InvalidPort(e) => write!(f, "Invalid port: {e}"),
            Self::UnsupportedScheme(s) => write!(f, "Unsupported scheme '{s}' (use http or https)"),
        }
    }
}

/// Turn operator input into a base URL for the capture server.
///
/// Bare hosts get `http://` and port 5000. Any path on the input is kept, so
/// a server mounted under a prefix (`http://pi.local/astro/`) resolves
/// endpoints relative to it.
pub fn normalize_url(input: &str) -> Result<Url, AddressError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AddressError::EmptyInput);
    }

    let candidate: Cow<'_, str> = if input.contains("://") {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("http://{input}"))
    };
    let mut url = Url::parse(&candidate).map_err(|e| AddressError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(AddressError::UnsupportedScheme(other.to_string())),
    }
    if !url.has_host() {
        return Err(AddressError::MissingHost);
    }
    // The server listens on 5000 whatever the scheme
    if url.port().is_none() {
        url.set_port(Some(DEFAULT_SERVER_PORT))
            .map_err(|()| AddressError::InvalidPort(format!("cannot set a port on {url}")))?;
    }
    // Url::join replaces the last segment unless the path ends in '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Resolve the server address from multiple sources with precedence.
///
/// Invalid higher-priority inputs are skipped with a warning rather than
/// failing, so a typo in the environment does not mask a valid config file.
pub fn resolve_address(cli: Option<&str>, configured: Option<&str>) -> ServerAddress {
    if let Some(input) = cli.filter(|s| !s.trim().is_empty()) {
        match ServerAddress::parse(input, AddressSource::CommandLine) {
            Ok(addr) => return addr,
            Err(e) => tracing::warn!(input, error = %e, "Ignoring invalid --server address"),
        }
    }

    if let Ok(env_url) = std::env::var(SERVER_URL_ENV) {
        match ServerAddress::parse(&env_url, AddressSource::Environment) {
            Ok(addr) => return addr,
            Err(e) => tracing::warn!(input = %env_url, error = %e, "Ignoring invalid {SERVER_URL_ENV}"),
        }
    }

    if let Some(input) = configured {
        match ServerAddress::parse(input, AddressSource::ConfigFile) {
            Ok(addr) => return addr,
            Err(e) => tracing::warn!(input, error = %e, "Ignoring invalid server.url"),
        }
    }

    ServerAddress::default()
}
