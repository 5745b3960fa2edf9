//! Process-wide settings, loaded once at start and immutable afterwards.
//!
//! Settings come from a JSON document, from flat key/value pairs (the shape of
//! an `appsettings`-style key store, e.g. `MySql:Host`), or both, with
//! `DATASOURCE__<KIND>__<FIELD>` environment variables layered on top.
//! Everything is validated while loading; a [`Settings`] value that exists is
//! always usable.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::datasource::{Credentials, DataSourceKind};
use crate::error::{ConfigError, ConfigErrorKind};
use crate::routing::{RouteSpec, RoutingTable};
use crate::Secret;

/// Prefix of environment variables that override backend fields.
pub const ENV_PREFIX: &str = "DATASOURCE__";

/// Connection settings for one backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Server host name
    pub host: String,
    /// Database name
    pub database: String,
    /// Server port
    pub port: Option<u16>,
    /// Login, when configured
    pub credentials: Option<Arc<Credentials>>,
}

impl BackendConfig {
    /// Creates a backend with host and database only.
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            port: None,
            credentials: None,
        }
    }

    fn validate(&self, scope: &str, kind: DataSourceKind) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() || self.database.trim().is_empty() {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidBackend,
                format!("{} backend '{}' needs a host and a database", scope, kind),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBackend {
    #[serde(default)]
    host: String,
    #[serde(default)]
    database: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<Secret<String>>,
}

impl RawBackend {
    fn into_config(self, scope: &str, kind: DataSourceKind) -> Result<BackendConfig, ConfigError> {
        let credentials = match (self.username, self.password) {
            (Some(username), Some(password)) => Some(Arc::new(Credentials { username, password })),
            (None, None) => None,
            _ => {
                return Err(ConfigError::new(
                    ConfigErrorKind::InvalidBackend,
                    format!("{} backend '{}' needs both username and password", scope, kind),
                ))
            }
        };
        let config = BackendConfig {
            host: self.host,
            database: self.database,
            port: self.port,
            credentials,
        };
        config.validate(scope, kind)?;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default)]
    tenant_claim: Option<String>,
    #[serde(default)]
    backends: HashMap<DataSourceKind, RawBackend>,
    #[serde(default)]
    tenants: HashMap<String, HashMap<DataSourceKind, RawBackend>>,
    #[serde(default)]
    routes: Vec<RouteSpec>,
}

/// Validated, immutable settings shared by the resolver and the customizer.
///
/// # Examples
///
/// ```
/// use datasource_router::{DataSourceKind, Settings};
///
/// let settings = Settings::from_json_str(r#"{
///     "backends": { "mysql": { "host": "db.example.com", "database": "orders" } },
///     "routes": [
///         { "id": "sp_Customer_Orders", "procedure": "sp_customer_orders",
///           "params": [ { "name": "customer", "source": "user_id" } ] }
///     ]
/// }"#).unwrap();
///
/// assert_eq!(settings.backend(DataSourceKind::MySql).unwrap().host, "db.example.com");
/// assert_eq!(settings.routes().len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawSettings")]
pub struct Settings {
    tenant_claim: Option<String>,
    backends: HashMap<DataSourceKind, BackendConfig>,
    tenants: HashMap<String, HashMap<DataSourceKind, BackendConfig>>,
    routes: RoutingTable,
}

impl TryFrom<RawSettings> for Settings {
    type Error = ConfigError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let mut backends = HashMap::new();
        for (kind, backend) in raw.backends {
            backends.insert(kind, backend.into_config("default", kind)?);
        }

        let mut tenants = HashMap::new();
        for (tenant, kinds) in raw.tenants {
            let scope = format!("tenant '{}'", tenant);
            let mut resolved = HashMap::new();
            for (kind, backend) in kinds {
                resolved.insert(kind, backend.into_config(&scope, kind)?);
            }
            tenants.insert(tenant, resolved);
        }

        if let Some(claim) = &raw.tenant_claim {
            if claim.trim().is_empty() {
                return Err(ConfigError::new(
                    ConfigErrorKind::InvalidValue,
                    "tenant_claim must not be empty",
                ));
            }
        }

        Ok(Settings {
            tenant_claim: raw.tenant_claim,
            backends,
            tenants,
            routes: RoutingTable::from_specs(raw.routes)?,
        })
    }
}

impl Settings {
    /// Starts an empty settings value; add backends and routes with the builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default backend for a kind.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBackend` if host or database is empty.
    pub fn with_backend(
        mut self,
        kind: DataSourceKind,
        backend: BackendConfig,
    ) -> Result<Self, ConfigError> {
        backend.validate("default", kind)?;
        self.backends.insert(kind, backend);
        Ok(self)
    }

    /// Sets a tenant-specific backend for a kind.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBackend` if host or database is empty.
    pub fn with_tenant_backend(
        mut self,
        tenant: impl Into<String>,
        kind: DataSourceKind,
        backend: BackendConfig,
    ) -> Result<Self, ConfigError> {
        let tenant = tenant.into();
        backend.validate(&format!("tenant '{}'", tenant), kind)?;
        self.tenants.entry(tenant).or_default().insert(kind, backend);
        Ok(self)
    }

    /// Names the claim that selects the tenant; the user id is used when unset.
    pub fn with_tenant_claim(mut self, claim: impl Into<String>) -> Self {
        self.tenant_claim = Some(claim.into());
        self
    }

    /// Replaces the routing table.
    pub fn with_routes(mut self, routes: RoutingTable) -> Self {
        self.routes = routes;
        self
    }

    /// Parses and validates a JSON settings document.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed JSON or unknown fields, or the validation
    /// error of the first invalid backend or route.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(json).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Parse, format!("invalid settings JSON: {}", e))
        })?;
        Settings::try_from(raw)
    }

    /// Reads and validates a JSON settings file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                ConfigErrorKind::Io,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        let settings = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            backends = settings.backends.len(),
            tenants = settings.tenants.len(),
            routes = settings.routes.len(),
            "loaded data source settings"
        );
        Ok(settings)
    }

    /// Builds backend settings from flat keys.
    ///
    /// Keys are `<kind><sep><field>` with `.` or `:` as separator, matched
    /// case-insensitively: `mysql.host`, `MySql:Database`, `sqlserver.port`.
    /// Fields: `host`, `database`, `port`, `username`, `password`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` for unrecognized keys, `InvalidValue` for a
    /// non-numeric port, and `InvalidBackend` for incomplete backends.
    pub fn from_key_values<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw: HashMap<DataSourceKind, RawBackend> = HashMap::new();
        for (key, value) in pairs {
            let (kind, field) = split_key(key.as_ref(), &[".", ":"])?;
            set_field(raw.entry(kind).or_default(), &field, value.into(), key.as_ref())?;
        }
        Settings::try_from(RawSettings {
            backends: raw,
            ..RawSettings::default()
        })
    }

    /// Applies `DATASOURCE__<KIND>__<FIELD>` overrides from `vars` to the default backends.
    ///
    /// Variables without the prefix are ignored. A kind without a backend yet
    /// gets one, which must end up complete. An existing login is kept unless
    /// both `USERNAME` and `PASSWORD` are overridden.
    ///
    /// # Errors
    ///
    /// As [`from_key_values`](Self::from_key_values).
    pub fn with_env_overrides<I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut touched: HashMap<DataSourceKind, RawBackend> = HashMap::new();
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let (kind, field) = split_key(rest, &["__"])?;
            let slot = touched.entry(kind).or_insert_with(|| {
                self.backends
                    .get(&kind)
                    .map(RawBackend::seeded_from)
                    .unwrap_or_default()
            });
            set_field(slot, &field, value, &key)?;
            tracing::debug!(key = %key, "applied settings override from environment");
        }
        for (kind, raw) in touched {
            let inherited = self
                .backends
                .get(&kind)
                .and_then(|existing| existing.credentials.clone());
            let mut backend = raw.into_config("default", kind)?;
            if backend.credentials.is_none() {
                backend.credentials = inherited;
            }
            self.backends.insert(kind, backend);
        }
        Ok(self)
    }

    /// Applies overrides from the process environment.
    ///
    /// Variables whose name is not UTF-8 or lacks the prefix are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for a prefixed variable whose value is not
    /// UTF-8, otherwise as [`with_env_overrides`](Self::with_env_overrides).
    pub fn with_env(self) -> Result<Self, ConfigError> {
        let vars = prefixed_env_vars(std::env::vars_os())?;
        self.with_env_overrides(vars)
    }

    /// The default backend for a kind.
    pub fn backend(&self, kind: DataSourceKind) -> Option<&BackendConfig> {
        self.backends.get(&kind)
    }

    /// The backend for a kind as seen by a tenant, falling back to the default.
    pub fn backend_for(&self, tenant: &str, kind: DataSourceKind) -> Option<&BackendConfig> {
        self.tenants
            .get(tenant)
            .and_then(|kinds| kinds.get(&kind))
            .or_else(|| self.backend(kind))
    }

    /// The claim naming the tenant, if configured.
    pub fn tenant_claim(&self) -> Option<&str> {
        self.tenant_claim.as_deref()
    }

    /// The compiled routing table.
    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }
}

impl RawBackend {
    // Credentials are not copied back out of their `Secret`; the caller
    // re-attaches the existing login unless both username and password are overridden.
    fn seeded_from(config: &BackendConfig) -> Self {
        RawBackend {
            host: config.host.clone(),
            database: config.database.clone(),
            port: config.port,
            username: None,
            password: None,
        }
    }
}

fn prefixed_env_vars<I>(vars: I) -> Result<Vec<(String, String)>, ConfigError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut prefixed = Vec::new();
    for (key, value) in vars {
        let Some(key) = key.to_str().filter(|k| k.starts_with(ENV_PREFIX)) else {
            continue;
        };
        let value = value.into_string().map_err(|_| {
            ConfigError::new(
                ConfigErrorKind::InvalidValue,
                format!("'{}' is not valid UTF-8", key),
            )
        })?;
        prefixed.push((key.to_string(), value));
    }
    Ok(prefixed)
}

fn split_key(key: &str, separators: &[&str]) -> Result<(DataSourceKind, String), ConfigError> {
    let unknown = || {
        ConfigError::new(
            ConfigErrorKind::UnknownKey,
            format!("unrecognized settings key '{}'", key),
        )
    };
    let (kind, field) = separators
        .iter()
        .find_map(|sep| key.split_once(*sep))
        .ok_or_else(unknown)?;
    let kind = kind.parse::<DataSourceKind>().map_err(|_| unknown())?;
    Ok((kind, field.to_ascii_lowercase()))
}

fn set_field(raw: &mut RawBackend, field: &str, value: String, key: &str) -> Result<(), ConfigError> {
    match field {
        "host" => raw.host = value,
        "database" => raw.database = value,
        "port" => {
            let port = value.trim().parse::<u16>().map_err(|_| {
                ConfigError::new(
                    ConfigErrorKind::InvalidValue,
                    format!("'{}' is not a valid port", key),
                )
            })?;
            raw.port = Some(port);
        }
        "username" => raw.username = Some(value),
        "password" => raw.password = Some(Secret::new(value)),
        _ => {
            return Err(ConfigError::new(
                ConfigErrorKind::UnknownKey,
                format!("unrecognized settings key '{}'", key),
            ))
        }
    }
    Ok(())
}
