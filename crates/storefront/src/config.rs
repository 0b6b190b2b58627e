//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BACKEND_URL` - Origin of the backend API (default: `http://localhost:5000`)
//! - `USER_JWT_SECRET` - HS256 secret for decoding session tokens (falls back to `JWT_SECRET`)
//! - `SITE_URL` - Public URL of the storefront (falls back to `NEXT_PUBLIC_SITE_URL`,
//!   default: `http://localhost:3000`)
//! - `GOOGLE_CLIENT_ID` - Google sign-in client ID (falls back to `NEXT_PUBLIC_GOOGLE_CLIENT_ID`)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STATIC_DIR` - Compiled front-end bundle (default: `public`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront gateway configuration.
///
/// Implements `Debug` manually to redact the JWT secret.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub site_url: String,
    /// Backend API origin; requests go to `{backend_url}/api/...`
    pub backend_url: Url,
    /// Secret for verifying session tokens locally. `None` disables local decoding.
    pub jwt_secret: Option<SecretString>,
    /// Google sign-in client ID, exposed to the front-end bundle
    pub google_client_id: Option<String>,
    /// Directory holding the compiled front-end bundle
    pub static_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("site_url", &self.site_url)
            .field("backend_url", &self.backend_url.as_str())
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("google_client_id", &self.google_client_id)
            .field("static_dir", &self.static_dir)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish_non_exhaustive()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or if the JWT secret
    /// fails validation (length, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let backend_url = parse_backend_url(&get_env_or_default("BACKEND_URL", DEFAULT_BACKEND_URL))?;
        let site_url = get_first_env(&["SITE_URL", "NEXT_PUBLIC_SITE_URL"])
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        let jwt_secret = get_jwt_secret()?;
        let google_client_id = get_first_env(&["GOOGLE_CLIENT_ID", "NEXT_PUBLIC_GOOGLE_CLIENT_ID"]);
        let static_dir = PathBuf::from(get_env_or_default("STOREFRONT_STATIC_DIR", "public"));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            host,
            port,
            site_url,
            backend_url,
            jwt_secret,
            google_client_id,
            static_dir,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Configuration for tests and local tooling: everything defaulted except
    /// the backend origin.
    #[must_use]
    pub fn with_backend(backend_url: Url) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            site_url: DEFAULT_SITE_URL.to_string(),
            backend_url,
            jwt_secret: None,
            google_client_id: None,
            static_dir: PathBuf::from("public"),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (controls `Secure` cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get the first set variable from a list of names, in order.
fn get_first_env(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| get_optional_env(key))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.parse::<f32>()
            .ok()
            .filter(|rate| (0.0..=1.0).contains(rate))
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(key.to_string(), "must be between 0.0 and 1.0".into())
            })
    })
}

/// Parse and validate the backend origin. Any path component is dropped.
fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), msg);

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("must have a host".to_string()));
    }
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Load the JWT secret from `USER_JWT_SECRET`, falling back to `JWT_SECRET`.
fn get_jwt_secret() -> Result<Option<SecretString>, ConfigError> {
    for key in ["USER_JWT_SECRET", "JWT_SECRET"] {
        if let Some(value) = get_optional_env(key) {
            validate_jwt_secret(&value, key)?;
            return Ok(Some(SecretString::from(value)));
        }
    }
    Ok(None)
}

fn validate_jwt_secret(value: &str, var_name: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    validate_secret_strength(value, var_name)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_jwt_secret_too_short() {
        assert!(validate_jwt_secret("aB3$xY9!", "USER_JWT_SECRET").is_err());
    }

    #[test]
    fn test_validate_jwt_secret_valid() {
        assert!(validate_jwt_secret("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%", "USER_JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_backend_url_strips_path() {
        let url = parse_backend_url("https://api.maison.example/v1/?x=1").unwrap();
        assert_eq!(url.as_str(), "https://api.maison.example/");
    }

    #[test]
    fn test_parse_backend_url_rejects_other_schemes() {
        assert!(parse_backend_url("ftp://api.maison.example").is_err());
        assert!(parse_backend_url("not a url").is_err());
    }

    #[test]
    fn test_socket_addr_and_secure() {
        let mut config = StorefrontConfig::with_backend(Url::parse(DEFAULT_BACKEND_URL).unwrap());
        config.port = 3000;
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(!config.is_secure());

        config.site_url = "https://maison.example".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut config = StorefrontConfig::with_backend(Url::parse(DEFAULT_BACKEND_URL).unwrap());
        config.jwt_secret = Some(SecretString::from("super_private_signing_key"));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_signing_key"));
    }
}
