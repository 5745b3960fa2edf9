use std::fmt;

use crate::{DataSourceKind, SanitizationErrorKind};

/// Errors surfaced by this crate.
///
/// Each variant is a local decision error; the transport layer maps them to
/// client-facing status codes.
#[derive(Debug)]
pub enum Error {
    /// Settings failed to load or validate
    Config(ConfigError),
    /// A data source could not be resolved
    Resolve(ResolveError),
    /// A data item could not be customized
    Customize(CustomizeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Resolve(e) => write!(f, "resolution error: {}", e),
            Error::Customize(e) => write!(f, "customization error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Resolve(e) => Some(e),
            Error::Customize(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        Error::Resolve(e)
    }
}

impl From<CustomizeError> for Error {
    fn from(e: CustomizeError) -> Self {
        Error::Customize(e)
    }
}

/// Settings failed to load or validate.
///
/// Raised at load time so a bad routing table never serves a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// The kind of configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// A route declares more than one outcome, or a key is routed twice
    AmbiguousRoute,
    /// A route declares no outcome
    MissingOutcome,
    /// A route is keyed by neither or both of id and table
    InvalidRouteKey,
    /// Query placeholders and declared params disagree
    InvalidTemplate,
    /// A backend has an empty host or database
    InvalidBackend,
    /// A flat settings key is not recognized
    UnknownKey,
    /// A settings value has the wrong shape
    InvalidValue,
    /// The settings document is not valid JSON
    Parse,
    /// The settings file could not be read
    Io,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErrorKind::AmbiguousRoute => write!(f, "ambiguous route"),
            ConfigErrorKind::MissingOutcome => write!(f, "route without outcome"),
            ConfigErrorKind::InvalidRouteKey => write!(f, "invalid route key"),
            ConfigErrorKind::InvalidTemplate => write!(f, "invalid query template"),
            ConfigErrorKind::InvalidBackend => write!(f, "invalid backend"),
            ConfigErrorKind::UnknownKey => write!(f, "unknown settings key"),
            ConfigErrorKind::InvalidValue => write!(f, "invalid settings value"),
            ConfigErrorKind::Parse => write!(f, "settings parse error"),
            ConfigErrorKind::Io => write!(f, "settings I/O error"),
        }
    }
}

/// A data source descriptor could not be resolved to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    kind: ResolveErrorKind,
    message: String,
}

impl ResolveError {
    /// Creates a new resolution error.
    pub fn new(kind: ResolveErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ResolveErrorKind {
        &self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ResolveError {}

/// The kind of resolution error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// No backend is configured for the requested kind
    UnconfiguredDataSource {
        /// The kind that has no configuration
        kind: DataSourceKind,
    },
    /// The configured tenant claim is missing from the user context
    MissingTenantClaim {
        /// Name of the claim
        claim: String,
    },
}

impl fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveErrorKind::UnconfiguredDataSource { kind } => {
                write!(f, "unconfigured data source '{}'", kind)
            }
            ResolveErrorKind::MissingTenantClaim { claim } => {
                write!(f, "missing tenant claim '{}'", claim)
            }
        }
    }
}

/// A data item could not be customized.
///
/// Messages name the route and parameter involved, never the claim value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomizeError {
    kind: CustomizeErrorKind,
    message: String,
}

impl CustomizeError {
    /// Creates a new customization error.
    pub fn new(kind: CustomizeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &CustomizeErrorKind {
        &self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CustomizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CustomizeError {}

/// The kind of customization error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomizeErrorKind {
    /// A parameter draws on a claim the user context does not carry
    MissingClaim {
        /// Name of the claim
        claim: String,
    },
    /// A parameter value failed sanitization
    InvalidParameter {
        /// Name of the parameter
        param: String,
        /// Why the value was rejected
        reason: SanitizationErrorKind,
    },
}

impl fmt::Display for CustomizeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomizeErrorKind::MissingClaim { claim } => write!(f, "missing claim '{}'", claim),
            CustomizeErrorKind::InvalidParameter { param, reason } => {
                write!(f, "invalid parameter '{}' ({})", param, reason)
            }
        }
    }
}
