//! Connection resolution: which physical backend serves a data source.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{ResolveError, ResolveErrorKind};
use crate::{DataSourceDescriptor, UserContext};

/// Fills in connection fields for a data source on behalf of a user.
///
/// Implementations must be safe to call concurrently and must not block on
/// I/O in the request path. A resolver backed by an external store (a secrets
/// service, a tenant directory) should cache or prefetch behind this same
/// synchronous interface.
///
/// The input descriptor is never mutated; the returned descriptor is the one
/// the caller keeps.
pub trait ConnectionResolver: Send + Sync {
    /// Resolves `descriptor` for the user in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` when no connection can be chosen for the
    /// descriptor's kind or for the caller's tenant.
    fn resolve(
        &self,
        ctx: &UserContext,
        descriptor: &DataSourceDescriptor,
    ) -> Result<DataSourceDescriptor, ResolveError>;
}

impl<R: ConnectionResolver + ?Sized> ConnectionResolver for Arc<R> {
    fn resolve(
        &self,
        ctx: &UserContext,
        descriptor: &DataSourceDescriptor,
    ) -> Result<DataSourceDescriptor, ResolveError> {
        (**self).resolve(ctx, descriptor)
    }
}

/// Resolver that reads backends from [`Settings`].
///
/// The tenant key is the claim named by [`Settings::tenant_claim`] when set,
/// otherwise the user id. A tenant-specific backend wins over the default
/// backend for the same kind.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use datasource_router::{
///     BackendConfig, ConfiguredResolver, ConnectionResolver, DataSourceDescriptor,
///     DataSourceKind, Settings, UserContext,
/// };
///
/// let settings = Settings::new()
///     .with_backend(DataSourceKind::MySql, BackendConfig::new("db.example.com", "orders"))
///     .unwrap();
/// let resolver = ConfiguredResolver::new(Arc::new(settings));
///
/// let resolved = resolver
///     .resolve(&UserContext::new("42"), &DataSourceDescriptor::new(DataSourceKind::MySql))
///     .unwrap();
///
/// assert_eq!(resolved.host, "db.example.com");
/// assert_eq!(resolved.database, "orders");
/// ```
#[derive(Debug, Clone)]
pub struct ConfiguredResolver {
    settings: Arc<Settings>,
}

impl ConfiguredResolver {
    /// Creates a resolver over shared settings.
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// The settings this resolver reads.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    fn tenant_key<'c>(&self, ctx: &'c UserContext) -> Result<&'c str, ResolveError> {
        match self.settings.tenant_claim() {
            None => Ok(ctx.user_id()),
            Some(claim) => ctx
                .property(claim)
                .and_then(|value| value.as_str())
                .ok_or_else(|| {
                    ResolveError::new(
                        ResolveErrorKind::MissingTenantClaim {
                            claim: claim.to_string(),
                        },
                        "user context carries no string value for the tenant claim",
                    )
                }),
        }
    }
}

impl ConnectionResolver for ConfiguredResolver {
    fn resolve(
        &self,
        ctx: &UserContext,
        descriptor: &DataSourceDescriptor,
    ) -> Result<DataSourceDescriptor, ResolveError> {
        let tenant = self.tenant_key(ctx)?;
        let backend = self
            .settings
            .backend_for(tenant, descriptor.kind)
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = ?ctx.user_id(),
                    kind = %descriptor.kind,
                    "no backend configured for data source"
                );
                ResolveError::new(
                    ResolveErrorKind::UnconfiguredDataSource {
                        kind: descriptor.kind,
                    },
                    "no default or tenant backend is configured",
                )
            })?;

        tracing::debug!(
            user_id = ?ctx.user_id(),
            kind = %descriptor.kind,
            host = %backend.host,
            database = %backend.database,
            "resolved data source"
        );

        Ok(DataSourceDescriptor {
            kind: descriptor.kind,
            id: descriptor.id.clone(),
            host: backend.host.clone(),
            database: backend.database.clone(),
            port: backend.port,
            credentials: backend.credentials.clone(),
        })
    }
}
