//! Data source descriptors and backend kinds.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Secret;

/// The relational backend a data source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// MySQL / MariaDB
    MySql,
    /// Microsoft SQL Server
    SqlServer,
    /// PostgreSQL
    PostgreSql,
    /// Oracle Database
    Oracle,
}

impl DataSourceKind {
    /// All supported kinds, in declaration order.
    pub const ALL: [DataSourceKind; 4] = [
        DataSourceKind::MySql,
        DataSourceKind::SqlServer,
        DataSourceKind::PostgreSql,
        DataSourceKind::Oracle,
    ];

    /// The lowercase name used in settings keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceKind::MySql => "mysql",
            DataSourceKind::SqlServer => "sqlserver",
            DataSourceKind::PostgreSql => "postgresql",
            DataSourceKind::Oracle => "oracle",
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known [`DataSourceKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown data source kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for DataSourceKind {
    type Err = UnknownKind;

    /// Parses a kind case-insensitively. `postgres` and `mssql` are accepted aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(DataSourceKind::MySql),
            "sqlserver" | "mssql" => Ok(DataSourceKind::SqlServer),
            "postgresql" | "postgres" => Ok(DataSourceKind::PostgreSql),
            "oracle" => Ok(DataSourceKind::Oracle),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Login used by the external executor to open a connection.
///
/// Shared behind `Arc` so a resolved descriptor can be cloned without
/// duplicating the password.
#[derive(Debug)]
pub struct Credentials {
    /// Database user name
    pub username: String,
    /// Database password
    pub password: Secret<String>,
}

/// A logical backend connection.
///
/// Arrives from the transport layer with only `kind` set. The
/// [`ConnectionResolver`](crate::ConnectionResolver) returns a copy with host,
/// database, port and credentials filled in.
///
/// Credentials are never serialized: a descriptor echoed back to the client
/// carries no login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDescriptor {
    /// Backend kind
    pub kind: DataSourceKind,
    /// Optional identifier of the data source inside the dashboard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Server host name
    #[serde(default)]
    pub host: String,
    /// Database (catalog) name
    #[serde(default)]
    pub database: String,
    /// Server port, when not the backend default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Login, when configured
    #[serde(skip)]
    pub credentials: Option<Arc<Credentials>>,
}

impl DataSourceDescriptor {
    /// Creates an unresolved descriptor for the given kind.
    pub fn new(kind: DataSourceKind) -> Self {
        Self {
            kind,
            id: None,
            host: String::new(),
            database: String::new(),
            port: None,
            credentials: None,
        }
    }

    /// Returns true once host and database are both populated.
    pub fn is_resolved(&self) -> bool {
        !self.host.is_empty() && !self.database.is_empty()
    }
}

impl PartialEq for DataSourceDescriptor {
    /// Credentials compare by identity of the shared login, not by password.
    fn eq(&self, other: &Self) -> bool {
        let same_credentials = match (&self.credentials, &other.credentials) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };

        self.kind == other.kind
            && self.id == other.id
            && self.host == other.host
            && self.database == other.database
            && self.port == other.port
            && same_credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("MySql".parse::<DataSourceKind>(), Ok(DataSourceKind::MySql));
        assert_eq!(
            "SQLSERVER".parse::<DataSourceKind>(),
            Ok(DataSourceKind::SqlServer)
        );
        assert_eq!(
            "postgres".parse::<DataSourceKind>(),
            Ok(DataSourceKind::PostgreSql)
        );
        assert!("sqlite".parse::<DataSourceKind>().is_err());
    }

    #[test]
    fn kind_display_round_trips_through_from_str() {
        for kind in DataSourceKind::ALL {
            assert_eq!(kind.to_string().parse::<DataSourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(DataSourceKind::PostgreSql).unwrap(),
            json!("postgresql")
        );
    }

    #[test]
    fn new_descriptor_is_unresolved() {
        let descriptor = DataSourceDescriptor::new(DataSourceKind::MySql);

        assert!(!descriptor.is_resolved());
        assert!(descriptor.host.is_empty());
        assert!(descriptor.credentials.is_none());
    }

    #[test]
    fn descriptor_deserializes_with_defaults() {
        let descriptor: DataSourceDescriptor =
            serde_json::from_value(json!({ "kind": "mysql" })).unwrap();

        assert_eq!(descriptor, DataSourceDescriptor::new(DataSourceKind::MySql));
    }

    #[test]
    fn credentials_are_never_serialized() {
        let mut descriptor = DataSourceDescriptor::new(DataSourceKind::MySql);
        descriptor.host = "db.example.com".to_string();
        descriptor.database = "orders".to_string();
        descriptor.credentials = Some(Arc::new(Credentials {
            username: "reporting".to_string(),
            password: Secret::new("pa55word".to_string()),
        }));

        let wire = serde_json::to_string(&descriptor).unwrap();
        assert!(!wire.contains("reporting"));
        assert!(!wire.contains("pa55word"));

        let debug = format!("{:?}", descriptor);
        assert!(!debug.contains("pa55word"));
    }

    #[test]
    fn equality_uses_shared_credentials() {
        let login = Arc::new(Credentials {
            username: "u".to_string(),
            password: Secret::new("p".to_string()),
        });

        let mut a = DataSourceDescriptor::new(DataSourceKind::Oracle);
        a.credentials = Some(Arc::clone(&login));
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = a.clone();
        c.credentials = Some(Arc::new(Credentials {
            username: "u".to_string(),
            password: Secret::new("p".to_string()),
        }));
        assert_ne!(a, c);
    }
}
