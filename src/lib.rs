//! Tenant-aware data source resolution and query customization for dashboard servers.
//!
//! A dashboard server asks this crate two things for every data request:
//! - **Which backend?** [`ConnectionResolver`] turns a bare
//!   [`DataSourceDescriptor`] into one with host, database and credentials for
//!   the calling tenant.
//! - **Which query?** [`QueryCustomizer`] looks the requested item up in a
//!   declarative [`RoutingTable`] and leaves it alone, swaps in a parameterized
//!   literal query, redirects it to a stored procedure, or rejects it.
//!
//! Caller-derived values (the user id, identity claims, the dashboard id) are
//! only ever bound as separate parameters. They enter as [`Tainted<T>`], pass a
//! [`Sanitizer`] and leave as [`Verified<T>`]; query text always comes from
//! [`Settings`].
//!
//! # Core Types
//!
//! - [`Settings`]: validated backends, tenant overrides and routes, loaded once
//! - [`DataSourceRouter`]: the [`DataSourceProvider`] the transport layer holds
//! - [`QueryDirective`]: how the executor should fetch an item
//! - [`Secret<T>`]: wrapper that redacts backend passwords in logs and output
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use datasource_router::{
//!     DataItemRequest, DataSourceDescriptor, DataSourceKind, DataSourceProvider,
//!     DataSourceRouter, ParamValue, Settings, UserContext,
//! };
//!
//! let settings = Settings::from_json_str(r#"{
//!     "backends": { "mysql": { "host": "db.example.com", "database": "orders" } },
//!     "routes": [
//!         { "id": "Customer_Orders",
//!           "query": "SELECT * FROM customer_orders_details WHERE customer_id = :customer",
//!           "params": [ { "name": "customer", "source": "user_id" } ] }
//!     ]
//! }"#).expect("valid settings");
//! let router = DataSourceRouter::new(Arc::new(settings));
//!
//! let item = DataItemRequest::new("Customer_Orders", DataSourceDescriptor::new(DataSourceKind::MySql));
//! let item = router
//!     .change_data_source_item(&UserContext::new("42"), "sales", item)
//!     .unwrap()
//!     .expect("item is served");
//!
//! let query = item.custom_query().unwrap();
//! assert!(!query.text.contains("42"));
//! assert_eq!(query.parameters["customer"], ParamValue::Text("42".to_string()));
//! assert_eq!(item.data_source.host, "db.example.com");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod customizer;
mod datasource;
mod error;
mod item;
mod logging;
mod provider;
mod request;
mod resolver;
mod routing;
mod sanitizer;
mod secret;
mod tainted;
mod verified;

#[cfg(test)]
mod test_utils;

pub use config::{BackendConfig, Settings, ENV_PREFIX};
pub use customizer::QueryCustomizer;
pub use datasource::{Credentials, DataSourceDescriptor, DataSourceKind, UnknownKind};
pub use error::{
    ConfigError, ConfigErrorKind, CustomizeError, CustomizeErrorKind, Error, ResolveError,
    ResolveErrorKind,
};
pub use item::{DataItemRequest, ParameterizedQuery, Parameters, QueryDirective};
pub use logging::DecisionLog;
pub use provider::{DataSourceProvider, DataSourceRouter};
pub use request::UserContext;
pub use resolver::{ConfiguredResolver, ConnectionResolver};
pub use routing::{ParamSource, ParamSpec, RouteOutcome, RouteSpec, RoutingTable};
pub use sanitizer::{ParamSanitizer, ParamValue, SanitizationError, SanitizationErrorKind, Sanitizer};
pub use secret::Secret;
pub use tainted::Tainted;
pub use verified::Verified;
