//! The entry points the transport layer calls.

use std::sync::Arc;

use crate::config::Settings;
use crate::customizer::QueryCustomizer;
use crate::error::Error;
use crate::resolver::{ConfiguredResolver, ConnectionResolver};
use crate::{DataItemRequest, DataSourceDescriptor, UserContext};

/// Hook invoked by the dashboard server for each data request.
///
/// Both calls are synchronous and keep no state between requests. Inputs
/// arrive already deserialized; outputs are serialized back by the caller.
pub trait DataSourceProvider: Send + Sync {
    /// Resolves connection parameters for a data source.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolve` when no connection is configured for the
    /// descriptor's kind or the caller's tenant.
    fn change_data_source(
        &self,
        ctx: &UserContext,
        descriptor: &DataSourceDescriptor,
    ) -> Result<DataSourceDescriptor, Error>;

    /// Customizes one data item, or returns `None` when it must not be served.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolve` or `Error::Customize` as
    /// [`QueryCustomizer::customize`] does.
    fn change_data_source_item(
        &self,
        ctx: &UserContext,
        dashboard_id: &str,
        item: DataItemRequest,
    ) -> Result<Option<DataItemRequest>, Error>;
}

/// [`DataSourceProvider`] backed by a [`QueryCustomizer`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use datasource_router::{
///     DataItemRequest, DataSourceDescriptor, DataSourceKind, DataSourceProvider,
///     DataSourceRouter, Settings, UserContext,
/// };
///
/// let settings = Settings::from_json_str(r#"{
///     "backends": { "mysql": { "host": "db.example.com", "database": "orders" } },
///     "routes": [ { "table": "Legacy", "reject": true } ]
/// }"#).unwrap();
/// let router = DataSourceRouter::new(Arc::new(settings));
/// let ctx = UserContext::new("42");
///
/// let resolved = router
///     .change_data_source(&ctx, &DataSourceDescriptor::new(DataSourceKind::MySql))
///     .unwrap();
/// assert_eq!(resolved.database, "orders");
///
/// let legacy = DataItemRequest::new("Old", DataSourceDescriptor::new(DataSourceKind::MySql))
///     .with_table("Legacy");
/// assert!(router.change_data_source_item(&ctx, "sales", legacy).unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct DataSourceRouter<R = ConfiguredResolver> {
    customizer: QueryCustomizer<R>,
}

impl DataSourceRouter<ConfiguredResolver> {
    /// Creates a router whose resolver and routing table share `settings`.
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            customizer: QueryCustomizer::new(settings),
        }
    }
}

impl<R: ConnectionResolver> DataSourceRouter<R> {
    /// Wraps an already configured customizer.
    pub fn from_customizer(customizer: QueryCustomizer<R>) -> Self {
        Self { customizer }
    }

    /// The customizer behind this router.
    pub fn customizer(&self) -> &QueryCustomizer<R> {
        &self.customizer
    }
}

impl<R: ConnectionResolver> DataSourceProvider for DataSourceRouter<R> {
    fn change_data_source(
        &self,
        ctx: &UserContext,
        descriptor: &DataSourceDescriptor,
    ) -> Result<DataSourceDescriptor, Error> {
        Ok(self.customizer.resolver().resolve(ctx, descriptor)?)
    }

    fn change_data_source_item(
        &self,
        ctx: &UserContext,
        dashboard_id: &str,
        item: DataItemRequest,
    ) -> Result<Option<DataItemRequest>, Error> {
        self.customizer.customize(ctx, dashboard_id, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataSourceKind, ParamSanitizer, QueryDirective};

    fn router() -> DataSourceRouter {
        let settings = Settings::from_json_str(
            r#"{
                "backends": { "sqlserver": { "host": "mssql.local", "database": "Northwind" } },
                "routes": [
                    { "id": "CustOrderHist", "procedure": "CustOrderHist",
                      "params": [ { "name": "@CustomerID", "source": "user_id" } ] }
                ]
            }"#,
        )
        .unwrap();
        DataSourceRouter::new(Arc::new(settings))
    }

    #[test]
    fn change_data_source_resolves() {
        let resolved = router()
            .change_data_source(
                &UserContext::new("ALFKI"),
                &DataSourceDescriptor::new(DataSourceKind::SqlServer),
            )
            .unwrap();

        assert_eq!(resolved.host, "mssql.local");
        assert_eq!(resolved.database, "Northwind");
    }

    #[test]
    fn change_data_source_surfaces_resolve_errors() {
        let err = router()
            .change_data_source(
                &UserContext::new("ALFKI"),
                &DataSourceDescriptor::new(DataSourceKind::MySql),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Resolve(_)));
    }

    #[test]
    fn change_data_source_item_redirects() {
        let item = DataItemRequest::new(
            "CustOrderHist",
            DataSourceDescriptor::new(DataSourceKind::SqlServer),
        );

        let item = router()
            .change_data_source_item(&UserContext::new("ALFKI"), "northwind", item)
            .unwrap()
            .unwrap();

        assert!(matches!(item.directive, QueryDirective::ProcedureCall { .. }));
        assert!(item.data_source.is_resolved());
    }

    #[test]
    fn router_is_usable_as_trait_object() {
        let provider: Arc<dyn DataSourceProvider> = Arc::new(router());

        let item = DataItemRequest::new(
            "Products",
            DataSourceDescriptor::new(DataSourceKind::SqlServer),
        );
        let item = provider
            .change_data_source_item(&UserContext::new("ALFKI"), "northwind", item)
            .unwrap()
            .unwrap();

        assert_eq!(item.directive, QueryDirective::Passthrough);
    }

    #[test]
    fn from_customizer_keeps_its_sanitizer() {
        let customizer = router()
            .customizer()
            .clone()
            .with_sanitizer(ParamSanitizer::new(3));
        let router = DataSourceRouter::from_customizer(customizer);

        let item = DataItemRequest::new(
            "CustOrderHist",
            DataSourceDescriptor::new(DataSourceKind::SqlServer),
        );
        let err = router
            .change_data_source_item(&UserContext::new("ALFKI"), "northwind", item)
            .unwrap_err();

        assert!(matches!(err, Error::Customize(_)));
    }
}
