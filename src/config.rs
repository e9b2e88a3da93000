//! Connection configuration.
//!
//! A [`ClientConfig`] is assembled once, before the client exists, and is
//! never mutated afterwards. The executor keeps it behind an `Arc` and reads
//! it for every request.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{Result, YetiError};

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Which generation of the Yeti REST API a client talks to.
///
/// The two generations disagree on the API key header name and on page
/// numbering. Everything else generation-specific lives in the adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiGeneration {
    /// The original `/api/` endpoints (`observable/`, `observablesearch/`, ...).
    #[default]
    Legacy,
    /// The `/api/v2/` endpoints (`observables/`, `entities/search`, ...).
    V2,
}

impl ApiGeneration {
    /// Header carrying the API key.
    pub fn api_key_header(self) -> &'static str {
        match self {
            Self::Legacy => "X-Api-Key",
            Self::V2 => "x-yeti-apikey",
        }
    }

    /// Convert a zero-based logical page into the page number sent on the wire.
    pub fn wire_page(self, page: u32) -> u32 {
        match self {
            Self::Legacy => page.saturating_add(1),
            Self::V2 => page,
        }
    }
}

impl FromStr for ApiGeneration {
    type Err = YetiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "legacy" => Ok(Self::Legacy),
            "v2" | "2" => Ok(Self::V2),
            other => Err(YetiError::ConfigMissing(format!(
                "unknown API version '{other}' (expected v1 or v2)"
            ))),
        }
    }
}

/// Username and password sent as HTTP basic auth.
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// Immutable connection settings for a Yeti instance.
///
/// # Example
///
/// ```no_run
/// use yetiapi::{ApiGeneration, ClientConfig};
///
/// # fn example() -> yetiapi::Result<()> {
/// let config = ClientConfig::new("https://yeti.example.com/api")?
///     .with_api_key("secret")
///     .with_verify_tls(false)
///     .with_generation(ApiGeneration::Legacy);
/// # Ok(())
/// # }
/// ```
pub struct ClientConfig {
    base_url: Url,
    api_key: Option<SecretString>,
    basic_auth: Option<BasicAuth>,
    verify_tls: bool,
    generation: ApiGeneration,
    timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("generation", &self.generation)
            .field("verify_tls", &self.verify_tls)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_basic_auth", &self.basic_auth.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Create a configuration for the given base URL.
    ///
    /// The URL is normalized to end with exactly one `/` so that endpoint
    /// paths can be joined onto it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            api_key: None,
            basic_auth: None,
            verify_tls: true,
            generation: ApiGeneration::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build a configuration from environment variables.
    ///
    /// - `YETI_URL` (optional) - base URL, defaults to `http://localhost:5000/api`
    /// - `YETI_API_KEY` (optional) - API key
    /// - `YETI_USERNAME` / `YETI_PASSWORD` (optional) - basic auth, both required together
    /// - `YETI_VERIFY_TLS` (optional) - `0`, `false` or `no` disables certificate checks
    /// - `YETI_API_VERSION` (optional) - `v1` (default) or `v2`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, if only one half of the basic
    /// auth pair is set, or if the API version is not recognized.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("YETI_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(key) = env::var("YETI_API_KEY") {
            if !key.is_empty() {
                config = config.with_api_key(key);
            }
        }

        match (env::var("YETI_USERNAME"), env::var("YETI_PASSWORD")) {
            (Ok(user), Ok(password)) => config = config.with_basic_auth(user, password),
            (Err(_), Err(_)) => {}
            _ => {
                return Err(YetiError::ConfigMissing(
                    "YETI_USERNAME and YETI_PASSWORD must be set together".to_string(),
                ))
            }
        }

        if let Ok(verify) = env::var("YETI_VERIFY_TLS") {
            config = config.with_verify_tls(parse_flag(&verify));
        }

        if let Ok(version) = env::var("YETI_API_VERSION") {
            config = config.with_generation(version.parse()?);
        }

        Ok(config)
    }

    /// Send this API key with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Send basic-auth credentials with every request.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password: SecretString::from(password.into()),
        });
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Select the API generation.
    #[must_use]
    pub fn with_generation(mut self, generation: ApiGeneration) -> Self {
        self.generation = generation;
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn generation(&self) -> ApiGeneration {
        self.generation
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim_end_matches('/');
    Ok(Url::parse(&format!("{trimmed}/"))?)
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_single_trailing_slash() {
        for raw in [
            "http://localhost:5000/api",
            "http://localhost:5000/api/",
            "http://localhost:5000/api//",
        ] {
            let config = ClientConfig::new(raw).unwrap();
            assert_eq!(config.base_url().as_str(), "http://localhost:5000/api/");
        }
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(YetiError::Url(_))
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ClientConfig::new("http://localhost:5000/api")
            .unwrap()
            .with_api_key("super-secret-key")
            .with_basic_auth("analyst", "hunter2");
        let debug = format!("{config:?}");
        assert!(debug.contains("has_api_key: true"));
        assert!(!debug.contains("super-secret-key"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_generation_header_and_paging() {
        assert_eq!(ApiGeneration::Legacy.api_key_header(), "X-Api-Key");
        assert_eq!(ApiGeneration::V2.api_key_header(), "x-yeti-apikey");
        assert_eq!(ApiGeneration::Legacy.wire_page(0), 1);
        assert_eq!(ApiGeneration::V2.wire_page(0), 0);
        assert_eq!(ApiGeneration::Legacy.wire_page(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_generation_from_str() {
        assert_eq!("v1".parse::<ApiGeneration>().unwrap(), ApiGeneration::Legacy);
        assert_eq!("V2".parse::<ApiGeneration>().unwrap(), ApiGeneration::V2);
        assert!("v3".parse::<ApiGeneration>().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" No "));
        assert!(!parse_flag("0"));
    }
}
