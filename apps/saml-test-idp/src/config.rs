//! Test IdP configuration loading and types.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use testidp_saml::{parse_sp_metadata, IdentityRecord, RelyingPartyConfig, SamlError, SigningCredentials};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no {0} provided (use {0} or {0}_path)")]
    MissingPem(&'static str),

    #[error("service provider '{entity_id}': {source}")]
    Metadata {
        entity_id: String,
        #[source]
        source: SamlError,
    },

    #[error("invalid signing credentials: {0}")]
    Credentials(#[source] SamlError),

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Upper bound for pending request TTL and assertion validity (one day).
pub const MAX_LIFETIME_SECS: u64 = 86_400;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub idp: IdpConfig,
    #[serde(default)]
    pub service_providers: Vec<ServiceProviderConfig>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL; derived from host and port when absent
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Identity provider settings. PEM material is given inline or by path.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpConfig {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default = "default_assertion_validity")]
    pub assertion_validity_secs: u64,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            entity_id: None,
            certificate: None,
            certificate_path: None,
            private_key: None,
            private_key_path: None,
            assertion_validity_secs: default_assertion_validity(),
        }
    }
}

fn default_assertion_validity() -> u64 {
    300
}

/// A relying party and the identities offered to it.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceProviderConfig {
    pub entity_id: String,
    #[serde(default)]
    pub acs_url: Option<String>,
    #[serde(default)]
    pub metadata_file: Option<PathBuf>,
    #[serde(default = "default_name_id_format")]
    pub name_id_format: String,
    #[serde(default)]
    pub users: Vec<IdentityRecord>,
}

fn default_name_id_format() -> String {
    "email".to_string()
}

/// Pending request lifetime and sweeping.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,
    /// Zero disables the background sweep
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_pending_ttl() -> u64 {
    testidp_saml::DEFAULT_PENDING_TTL_SECONDS.unsigned_abs()
}

fn default_cleanup_interval() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Relative paths inside the file resolve against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&content)?;
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?
                .join(path)
        };
        if let Some(dir) = absolute.parent() {
            config.base_dir = dir.to_path_buf();
        }
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.base_dir = PathBuf::from(".");
        config.validate()?;
        Ok(config)
    }

    /// Reject lifetimes outside `1..=MAX_LIFETIME_SECS`.
    pub fn validate(&self) -> ConfigResult<()> {
        check_lifetime("idp.assertion_validity_secs", self.idp.assertion_validity_secs)?;
        check_lifetime("session.pending_ttl_secs", self.session.pending_ttl_secs)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TESTIDP_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("TESTIDP_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid TESTIDP_PORT"),
            }
        }
        if let Ok(base_url) = std::env::var("TESTIDP_BASE_URL") {
            self.server.base_url = Some(base_url);
        }
    }

    /// Resolve `path` against the configuration directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.server.base_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://{}:{}", self.server.host, self.server.port),
        }
    }

    pub fn idp_entity_id(&self) -> String {
        match &self.idp.entity_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}/metadata", self.base_url()),
        }
    }

    pub fn assertion_validity(&self) -> chrono::Duration {
        lifetime(self.idp.assertion_validity_secs)
    }

    pub fn pending_ttl(&self) -> chrono::Duration {
        lifetime(self.session.pending_ttl_secs)
    }

    pub fn load_certificate_pem(&self) -> ConfigResult<String> {
        self.load_pem(
            "certificate",
            self.idp.certificate.as_deref(),
            self.idp.certificate_path.as_deref(),
        )
    }

    pub fn load_private_key_pem(&self) -> ConfigResult<String> {
        self.load_pem(
            "private_key",
            self.idp.private_key.as_deref(),
            self.idp.private_key_path.as_deref(),
        )
    }

    /// Inline PEM wins over a path.
    fn load_pem(
        &self,
        what: &'static str,
        inline: Option<&str>,
        path: Option<&Path>,
    ) -> ConfigResult<String> {
        if let Some(pem) = inline.filter(|p| !p.trim().is_empty()) {
            return Ok(pem.to_string());
        }
        let Some(path) = path else {
            return Err(ConfigError::MissingPem(what));
        };
        let path = self.resolve_path(path);
        std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })
    }

    /// Parse the configured certificate and key into signing credentials.
    pub fn signing_credentials(&self) -> ConfigResult<SigningCredentials> {
        let certificate = self.load_certificate_pem()?;
        let private_key = self.load_private_key_pem()?;
        SigningCredentials::from_pem(&certificate, &private_key).map_err(ConfigError::Credentials)
    }

    /// Relying party definitions with any metadata files loaded and parsed.
    pub fn relying_parties(&self) -> ConfigResult<Vec<RelyingPartyConfig>> {
        self.service_providers
            .iter()
            .map(|sp| {
                let metadata = match &sp.metadata_file {
                    Some(file) => Some(self.load_sp_metadata(&sp.entity_id, file)?),
                    None => None,
                };
                Ok(RelyingPartyConfig {
                    entity_id: sp.entity_id.clone(),
                    acs_url: sp.acs_url.clone().filter(|url| !url.is_empty()),
                    metadata,
                    name_id_format: Some(sp.name_id_format.clone()),
                    identities: sp.users.clone(),
                })
            })
            .collect()
    }

    fn load_sp_metadata(
        &self,
        entity_id: &str,
        file: &Path,
    ) -> ConfigResult<testidp_saml::SpMetadata> {
        let path = self.resolve_path(file);
        let xml = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let metadata = parse_sp_metadata(&xml).map_err(|source| ConfigError::Metadata {
            entity_id: entity_id.to_string(),
            source,
        })?;
        if metadata.entity_id != entity_id {
            tracing::warn!(
                configured = %entity_id,
                metadata = %metadata.entity_id,
                path = %path.display(),
                "SP metadata entityID differs from configured entity_id"
            );
        }
        Ok(metadata)
    }
}

fn check_lifetime(field: &'static str, secs: u64) -> ConfigResult<()> {
    if secs == 0 || secs > MAX_LIFETIME_SECS {
        return Err(ConfigError::Invalid {
            field,
            message: format!("{secs} is outside 1..={MAX_LIFETIME_SECS} seconds"),
        });
    }
    Ok(())
}

/// Seconds as a duration, clamped to `MAX_LIFETIME_SECS`.
fn lifetime(secs: u64) -> chrono::Duration {
    let secs = i64::try_from(secs.min(MAX_LIFETIME_SECS)).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
}
