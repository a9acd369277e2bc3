//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AUTH0_ISSUER_BASE_URL` - Base URL of the token issuer (e.g. `https://tenant.auth0.com/`)
//! - `AUTH0_AUDIENCE` - Resource identifier that access tokens must be issued for
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3001)
//! - `ALLOWED_ORIGINS` - Comma-separated browser origins allowed by CORS
//! - `AUTH0_MGMT_CLIENT_ID` / `AUTH0_MGMT_CLIENT_SECRET` - Machine credentials for
//!   the administrative API (both or neither)
//! - `AUTH0_MGMT_AUDIENCE` - Administrative API audience (default: `{issuer}/api/v2/`)
//! - `AUTH0_CLAIMS_NAMESPACE` - Prefix of custom claims (e.g. `https://pizza42.example.com/`)
//! - `IDP_TIMEOUT_SECS` - Timeout for identity provider calls (default: 5)
//! - `DB_TIMEOUT_SECS` - Timeout for a single storage statement (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

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
    "insert",
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

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Browser origins allowed to call the API
    pub allowed_origins: Vec<String>,
    /// Identity provider settings
    pub identity: IdentityProviderConfig,
    /// Upper bound for a single storage statement
    pub storage_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Identity provider (token issuer and administrative API) settings.
#[derive(Debug, Clone)]
pub struct IdentityProviderConfig {
    /// Issuer base URL as configured.
    pub issuer_base_url: Url,
    /// Audience access tokens must carry.
    pub audience: String,
    /// Machine credentials for the administrative API, if configured.
    pub management: Option<ManagementCredentials>,
    /// Audience requested for administrative API credentials.
    pub management_audience: String,
    /// Prefix of namespaced custom claims.
    pub claims_namespace: Option<String>,
    /// Upper bound for any call to the provider.
    pub timeout: Duration,
}

/// Client credentials for the administrative API.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct ManagementCredentials {
    /// Machine client id
    pub client_id: String,
    /// Machine client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for ManagementCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the client secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let identity = IdentityProviderConfig::load(&env)?;
        let database_url = SecretString::from(env.required("DATABASE_URL")?);
        let host = env.parsed::<IpAddr>("HOST", "0.0.0.0")?;
        let port = env.parsed::<u16>("PORT", "3001")?;
        let allowed_origins = env
            .optional("ALLOWED_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .transpose()?
            .unwrap_or_default();
        let storage_timeout = env.timeout("DB_TIMEOUT_SECS", "5")?;

        Ok(Self {
            database_url,
            host,
            port,
            allowed_origins,
            identity,
            storage_timeout,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl IdentityProviderConfig {
    fn load<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_issuer = env.required("AUTH0_ISSUER_BASE_URL")?;
        let issuer_base_url = Url::parse(&raw_issuer).map_err(|e| {
            ConfigError::InvalidEnvVar("AUTH0_ISSUER_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(issuer_base_url.scheme(), "https" | "http") {
            return Err(ConfigError::InvalidEnvVar(
                "AUTH0_ISSUER_BASE_URL".to_string(),
                "must be an http(s) URL".to_string(),
            ));
        }

        let audience = env.required("AUTH0_AUDIENCE")?;

        let management = match (
            env.optional("AUTH0_MGMT_CLIENT_ID"),
            env.optional("AUTH0_MGMT_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(secret)) => {
                validate_secret_strength(&secret, "AUTH0_MGMT_CLIENT_SECRET")?;
                Some(ManagementCredentials {
                    client_id,
                    client_secret: SecretString::from(secret),
                })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar(
                    "AUTH0_MGMT_CLIENT_SECRET".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("AUTH0_MGMT_CLIENT_ID".to_string()));
            }
        };

        let issuer = trimmed_issuer(&issuer_base_url);
        let management_audience = env
            .optional("AUTH0_MGMT_AUDIENCE")
            .unwrap_or_else(|| format!("{issuer}/api/v2/"));

        Ok(Self {
            issuer_base_url,
            audience,
            management,
            management_audience,
            claims_namespace: env.optional("AUTH0_CLAIMS_NAMESPACE"),
            timeout: env.timeout("IDP_TIMEOUT_SECS", "5")?,
        })
    }

    /// Issuer without trailing slash, the form used for comparisons and URLs.
    #[must_use]
    pub fn issuer(&self) -> String {
        trimmed_issuer(&self.issuer_base_url)
    }

    /// URL of the issuer's published key set.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    /// URL of the client-credentials token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.issuer())
    }

    /// URL of the administrative user-profile endpoint for a subject.
    #[must_use]
    pub fn user_url(&self, subject: &str) -> String {
        format!(
            "{}/api/v2/users/{}?fields=email_verified&include_fields=true",
            self.issuer(),
            urlencoding::encode(subject)
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment lookup with the shared parsing rules.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable parsed into `T`, falling back to `default`.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .unwrap_or_else(|| default.to_string())
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get a positive number of seconds.
    fn timeout(&self, key: &str, default: &str) -> Result<Duration, ConfigError> {
        match self.parsed::<u64>(key, default)? {
            0 => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be at least 1 second".to_string(),
            )),
            secs => Ok(Duration::from_secs(secs)),
        }
    }
}

fn trimmed_issuer(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// Parse the comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|origin| {
            Url::parse(origin)
                .map(|_| origin.trim_end_matches('/').to_string())
                .map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "ALLOWED_ORIGINS".to_string(),
                        format!("{origin}: {e}"),
                    )
                })
        })
        .collect()
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
    let len = s.chars().count() as f64;
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    fn base_vars() -> HashMap<&'static str, String> {
        HashMap::from([
            ("AUTH0_ISSUER_BASE_URL", "https://pizza.eu.auth0.com/".to_string()),
            ("AUTH0_AUDIENCE", "https://api.pizza.test".to_string()),
            ("DATABASE_URL", "postgres://localhost/orders".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<ServerConfig, ConfigError> {
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars()).unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3001");
        assert!(config.allowed_origins.is_empty());
        assert!(config.identity.management.is_none());
        assert_eq!(config.identity.issuer(), "https://pizza.eu.auth0.com");
        assert_eq!(
            config.identity.management_audience,
            "https://pizza.eu.auth0.com/api/v2/"
        );
        assert_eq!(config.identity.timeout, Duration::from_secs(5));
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_required_variables_are_fatal() {
        for key in ["AUTH0_ISSUER_BASE_URL", "AUTH0_AUDIENCE", "DATABASE_URL"] {
            let mut vars = base_vars();
            vars.remove(key);
            let err = load(&vars).unwrap_err();
            assert!(
                matches!(err, ConfigError::MissingEnvVar(ref k) if k == key),
                "expected missing {key}, got {err}"
            );
        }
    }

    #[test]
    fn test_blank_required_variable_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert("AUTH0_AUDIENCE", "   ".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_invalid_issuer_is_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH0_ISSUER_BASE_URL", "pizza.auth0.com".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));

        vars.insert("AUTH0_ISSUER_BASE_URL", "ftp://pizza.auth0.com".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_invalid_port_and_timeouts() {
        let mut vars = base_vars();
        vars.insert("PORT", "http".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(k, _)) if k == "PORT"));

        let mut vars = base_vars();
        vars.insert("IDP_TIMEOUT_SECS", "0".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(k, _)) if k == "IDP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_allowed_origins_are_split_and_trimmed() {
        let mut vars = base_vars();
        vars.insert(
            "ALLOWED_ORIGINS",
            "http://localhost:3000, https://pizza.example.org/ ,".to_string(),
        );
        let config = load(&vars).unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "https://pizza.example.org"]
        );
    }

    #[test]
    fn test_management_credentials_must_come_in_pairs() {
        let mut vars = base_vars();
        vars.insert("AUTH0_MGMT_CLIENT_ID", "m2m-client".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingEnvVar(k)) if k == "AUTH0_MGMT_CLIENT_SECRET"
        ));

        vars.insert("AUTH0_MGMT_CLIENT_SECRET", STRONG_SECRET.to_string());
        let config = load(&vars).unwrap();
        let management = config.identity.management.unwrap();
        assert_eq!(management.client_id, "m2m-client");
    }

    #[test]
    fn test_management_secret_placeholder_is_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH0_MGMT_CLIENT_ID", "m2m-client".to_string());
        vars.insert("AUTH0_MGMT_CLIENT_SECRET", "your-client-secret".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_provider_urls() {
        let config = load(&base_vars()).unwrap();
        let identity = &config.identity;
        assert_eq!(
            identity.jwks_url(),
            "https://pizza.eu.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(identity.token_url(), "https://pizza.eu.auth0.com/oauth/token");
        assert_eq!(
            identity.user_url("auth0|abc 1"),
            "https://pizza.eu.auth0.com/api/v2/users/auth0%7Cabc%201?fields=email_verified&include_fields=true"
        );
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(STRONG_SECRET) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababab", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_management_credentials_debug_redacts_secret() {
        let creds = ManagementCredentials {
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_confidential_value"),
        };

        let debug_output = format!("{creds:?}");
        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_confidential_value"));
    }
}
