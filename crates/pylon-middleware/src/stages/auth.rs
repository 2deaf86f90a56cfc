//! Auth middleware.
//!
//! Resolves which auth option the call uses. Options come from the
//! operation's [`AuthResolver`] in preference order; the first option whose
//! scheme is enabled and whose identity resolves wins. Every rejected option
//! is recorded so a failure can name all of them.

use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use pylon_core::auth::{AuthParams, AuthResolver, AuthSchemeRegistry, ResolvedAuth};
use pylon_core::identity::IdentityResolverMap;
use pylon_core::{
    AuthFailure, AuthFailureReason, BoxFuture, OperationContext, Output, PipelineError,
};
use pylon_telemetry::metrics;
use std::sync::Arc;

/// Middleware attaching a [`ResolvedAuth`] to the context.
///
/// # Behavior
///
/// For each option in order:
///
/// 1. A scheme id missing from the registry is rejected as not enabled
/// 2. A scheme without an identity resolver is rejected
/// 3. An identity resolution failure is recorded and the next option tried
/// 4. The first resolved identity is attached together with the scheme's
///    signer and the option's properties
///
/// If nothing resolves the call fails with [`PipelineError::Auth`].
#[derive(Clone)]
pub struct AuthMiddleware {
    resolver: Arc<dyn AuthResolver>,
    schemes: Arc<AuthSchemeRegistry>,
    identity_resolvers: Arc<IdentityResolverMap>,
}

impl AuthMiddleware {
    /// Creates the middleware.
    pub fn new(
        resolver: Arc<dyn AuthResolver>,
        schemes: Arc<AuthSchemeRegistry>,
        identity_resolvers: Arc<IdentityResolverMap>,
    ) -> Self {
        Self {
            resolver,
            schemes,
            identity_resolvers,
        }
    }

    /// Resolves the auth decision for `operation`.
    pub async fn resolve(&self, operation: &str) -> Result<ResolvedAuth, PipelineError> {
        let options = self.resolver.resolve(&AuthParams::new(operation));
        let mut failures = Vec::with_capacity(options.len());

        for option in options {
            let Some(scheme) = self.schemes.get(&option.scheme_id) else {
                failures.push(AuthFailure {
                    scheme_id: option.scheme_id,
                    reason: AuthFailureReason::SchemeNotEnabled,
                });
                continue;
            };

            let Some(identity_resolver) = scheme.identity_resolver(&self.identity_resolvers)
            else {
                failures.push(AuthFailure {
                    scheme_id: option.scheme_id,
                    reason: AuthFailureReason::NoIdentityResolver {
                        identity_type: scheme.identity_type(),
                    },
                });
                continue;
            };

            let resolved = identity_resolver.identity(&option.identity_properties).await;
            match resolved {
                Ok(identity) => {
                    return Ok(ResolvedAuth {
                        signer: scheme.signer(),
                        scheme_id: option.scheme_id,
                        signer_properties: option.signer_properties,
                        identity,
                        identity_properties: option.identity_properties,
                    });
                }
                Err(err) => failures.push(AuthFailure {
                    scheme_id: option.scheme_id,
                    reason: AuthFailureReason::IdentityResolution(err.to_string()),
                }),
            }
        }

        Err(PipelineError::Auth {
            operation: operation.to_string(),
            failures,
        })
    }
}

impl std::fmt::Debug for AuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddleware")
            .field("schemes", &self.schemes)
            .finish_non_exhaustive()
    }
}

impl<I, O> Middleware<I, O> for AuthMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Auth.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            let resolved = self.resolve(ctx.operation_name()).await;
            match resolved {
                Ok(auth) => {
                    tracing::debug!(parent: ctx.span(), auth_scheme = %auth.scheme_id, "auth resolved");
                    ctx.set_auth(auth);
                    next.run(input, ctx).await
                }
                Err(err) => {
                    tracing::warn!(parent: ctx.span(), error = %err, "auth resolution failed");
                    metrics::record_auth_failure(ctx.operation_name());
                    Output::from_error(err)
                }
            }
        })
    }
}
