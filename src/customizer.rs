//! Per-request query customization.

use std::sync::Arc;

use serde_json::Value;

use crate::config::Settings;
use crate::error::{CustomizeError, CustomizeErrorKind, Error};
use crate::item::{DataItemRequest, ParameterizedQuery, Parameters, QueryDirective};
use crate::logging::DecisionLog;
use crate::resolver::{ConfiguredResolver, ConnectionResolver};
use crate::routing::{ParamSource, ParamSpec, RouteOutcome};
use crate::{ParamSanitizer, Sanitizer, Tainted, UserContext};

/// Rewrites data item requests according to the routing table.
///
/// For each item the customizer resolves the data source, then looks the item
/// up by id and by table:
/// - no route: the item passes through with only its data source resolved
/// - literal route: the item gets a [`QueryDirective::LiteralQuery`]
/// - procedure route: the item gets a [`QueryDirective::ProcedureCall`]
/// - reject route: the item is dropped (`Ok(None)`)
///
/// Every bound value is read from the user context as [`Tainted`], passed
/// through a [`ParamSanitizer`] and stored as a separate parameter. Query
/// text always comes from settings.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use datasource_router::{
///     DataItemRequest, DataSourceDescriptor, DataSourceKind, ParamValue, QueryCustomizer,
///     Settings, UserContext,
/// };
///
/// let settings = Settings::from_json_str(r#"{
///     "backends": { "mysql": { "host": "db.example.com", "database": "orders" } },
///     "routes": [
///         { "id": "sp_Customer_Orders", "procedure": "sp_customer_orders",
///           "params": [ { "name": "customer", "source": "user_id" } ] }
///     ]
/// }"#).unwrap();
/// let customizer = QueryCustomizer::new(Arc::new(settings));
///
/// let item = DataItemRequest::new(
///     "sp_Customer_Orders",
///     DataSourceDescriptor::new(DataSourceKind::MySql),
/// );
/// let item = customizer
///     .customize(&UserContext::new("42"), "sales", item)
///     .unwrap()
///     .expect("not rejected");
///
/// assert_eq!(item.procedure(), Some("sp_customer_orders"));
/// assert_eq!(
///     item.procedure_parameters().unwrap().get("customer"),
///     Some(&ParamValue::Text("42".to_string()))
/// );
/// assert!(item.custom_query().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct QueryCustomizer<R = ConfiguredResolver> {
    settings: Arc<Settings>,
    resolver: R,
    sanitizer: ParamSanitizer,
}

impl QueryCustomizer<ConfiguredResolver> {
    /// Creates a customizer that resolves connections from the same settings.
    pub fn new(settings: Arc<Settings>) -> Self {
        let resolver = ConfiguredResolver::new(Arc::clone(&settings));
        Self::with_resolver(settings, resolver)
    }
}

impl<R: ConnectionResolver> QueryCustomizer<R> {
    /// Creates a customizer with a custom connection resolver.
    pub fn with_resolver(settings: Arc<Settings>, resolver: R) -> Self {
        Self {
            settings,
            resolver,
            sanitizer: ParamSanitizer::default(),
        }
    }

    /// Replaces the sanitizer applied to bound values.
    pub fn with_sanitizer(mut self, sanitizer: ParamSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// The resolver used for data sources.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The settings this customizer reads.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Customizes one data item for the user in `ctx`.
    ///
    /// Returns `Ok(None)` when the routing table rejects the item. The
    /// resolved data source and the directive are both computed before the
    /// item is touched.
    ///
    /// # Errors
    ///
    /// - `Error::Resolve` if the data source cannot be resolved
    /// - `Error::Customize` with `MissingClaim` if a parameter draws on a claim
    ///   the context does not carry
    /// - `Error::Customize` with `InvalidParameter` if a bound value fails
    ///   sanitization
    pub fn customize(
        &self,
        ctx: &UserContext,
        dashboard_id: &str,
        mut item: DataItemRequest,
    ) -> Result<Option<DataItemRequest>, Error> {
        let log = DecisionLog::new(ctx.user_id(), dashboard_id, &item.id);

        let data_source = self.resolver.resolve(ctx, &item.data_source)?;

        let outcome = self
            .settings
            .routes()
            .lookup(&item.id, item.table.as_deref());

        let directive = match outcome {
            None => {
                log.debug(format_args!("no route, passing through"));
                QueryDirective::Passthrough
            }
            Some(RouteOutcome::Reject) => {
                log.info(format_args!("item rejected by routing table"));
                return Ok(None);
            }
            Some(RouteOutcome::Literal { text, params }) => {
                let parameters = self.bind(ctx, dashboard_id, &log, params)?;
                QueryDirective::LiteralQuery(ParameterizedQuery {
                    text: text.clone(),
                    parameters,
                })
            }
            Some(RouteOutcome::Procedure { name, params }) => {
                let parameters = self.bind(ctx, dashboard_id, &log, params)?;
                QueryDirective::ProcedureCall {
                    name: name.clone(),
                    parameters,
                }
            }
        };

        if let Some(outcome) = outcome {
            log.info(format_args!("applied {} route", outcome.mode()));
        }

        item.data_source = data_source;
        item.directive = directive;
        Ok(Some(item))
    }

    fn bind(
        &self,
        ctx: &UserContext,
        dashboard_id: &str,
        log: &DecisionLog<'_>,
        params: &[ParamSpec],
    ) -> Result<Parameters, CustomizeError> {
        let mut bound = Parameters::new();

        for param in params {
            let tainted = match &param.source {
                ParamSource::UserId => ctx.tainted_user_id(),
                ParamSource::DashboardId => Tainted::new(Value::String(dashboard_id.to_string())),
                ParamSource::Property(claim) => {
                    ctx.tainted_property(claim).ok_or_else(|| {
                        log.warn(format_args!(
                            "param '{}' needs missing claim '{}'",
                            param.name, claim
                        ));
                        CustomizeError::new(
                            CustomizeErrorKind::MissingClaim {
                                claim: claim.clone(),
                            },
                            format!("item '{}' param '{}'", log.item_id(), param.name),
                        )
                    })?
                }
            };

            let verified = self.sanitizer.sanitize(tainted).map_err(|e| {
                log.warn(format_args!("param '{}' rejected: {}", param.name, e.kind()));
                CustomizeError::new(
                    CustomizeErrorKind::InvalidParameter {
                        param: param.name.clone(),
                        reason: e.kind(),
                    },
                    format!("item '{}': {}", log.item_id(), e.message()),
                )
            })?;

            bound.insert(param.name.clone(), verified.into_inner());
        }

        Ok(bound)
    }
}
