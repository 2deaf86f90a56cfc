//! The client facade.

use crate::{CallOptions, ClientError, Operation, Plugin, ReqwestHttpClient};
use pylon_config::ClientConfig;
use pylon_core::auth::{
    AnonymousScheme, AuthOption, AuthResolver, AuthScheme, AuthSchemeRegistry, StaticAuthResolver,
};
use pylon_core::identity::{IdentityResolver, IdentityResolverMap, IdentityType};
use pylon_core::{
    HttpClient, Interceptor, InterceptorList, OperationContext, Output, PipelineError,
};
use pylon_middleware::{
    AuthMiddleware, Backoff, BuildMiddleware, ExponentialBackoff, InitializeMiddleware,
    MiddlewareStack, ParseMiddleware, QuotaConfig, RetryConfig, RetryMiddleware, RetryPolicy,
    SendMiddleware, SignMiddleware, StandardRetryPolicy, Stubs, ValidateMiddleware,
};
use std::fmt;
use std::sync::Arc;

/// Where Send dispatches requests.
enum Transport {
    Http(Arc<dyn HttpClient>),
    Stubbed,
}

struct ClientInner {
    config: ClientConfig,
    endpoint: Option<http::Uri>,
    transport: Transport,
    stubs: Stubs,
    schemes: Arc<AuthSchemeRegistry>,
    identity_resolvers: Arc<IdentityResolverMap>,
    auth_resolver: Arc<dyn AuthResolver>,
    interceptors: InterceptorList,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff: Arc<dyn Backoff>,
}

/// Runs operations through the standard middleware stack.
///
/// Cloning is cheap; clones share configuration, collaborators and stubs.
///
/// # Example
///
/// ```
/// use pylon::{CallOptions, Client, Operation};
/// use pylon_config::ClientConfig;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct Ping {}
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Pong { ok: bool }
///
/// # tokio_test::block_on(async {
/// let client = Client::builder().config(ClientConfig::testing()).build().unwrap();
/// client.stubs().add_response(
///     "Ping",
///     http::Response::builder().status(200).body(r#"{"ok":true}"#.into()).unwrap(),
/// );
///
/// let op = Operation::<Ping, Pong>::json("Ping");
/// let output = client.call(&op, Ping {}, CallOptions::new()).await;
/// assert_eq!(output.data, Some(Pong { ok: true }));
/// # });
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the stub queue used when `stub_responses` is enabled.
    #[must_use]
    pub fn stubs(&self) -> &Stubs {
        &self.inner.stubs
    }

    /// Assembles the standard stack for `op`.
    pub fn stack<I, O>(&self, op: &Operation<I, O>) -> MiddlewareStack<I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let inner = &self.inner;
        let auth_resolver = op
            .auth_resolver()
            .unwrap_or_else(|| Arc::clone(&inner.auth_resolver));
        let send = match &inner.transport {
            Transport::Http(client) => SendMiddleware::new(Arc::clone(client)),
            Transport::Stubbed => SendMiddleware::stubbed(inner.stubs.clone()),
        };

        MiddlewareStack::builder()
            .layer(InitializeMiddleware::new())
            .layer(ValidateMiddleware::new(op.validator(), inner.config.validate_input))
            .layer(BuildMiddleware::new(op.builder()))
            .layer(AuthMiddleware::new(
                auth_resolver,
                Arc::clone(&inner.schemes),
                Arc::clone(&inner.identity_resolvers),
            ))
            .layer(RetryMiddleware::new(
                Arc::clone(&inner.retry_policy),
                Arc::clone(&inner.backoff),
                retry_config(&inner.config),
            ))
            .layer(SignMiddleware::new())
            .layer(ParseMiddleware::new(op.error_parser(), op.data_parser()))
            .layer(send)
            .build()
    }

    /// Creates the context for one call of `op`.
    ///
    /// The request starts with the operation's method and the endpoint joined
    /// with its path. Per-call interceptors run after the client's own.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUri`] if the endpoint and path do not
    /// form a valid URI.
    pub fn context<I, O>(
        &self,
        op: &Operation<I, O>,
        options: &CallOptions,
    ) -> Result<OperationContext, ClientError> {
        let uri = self.request_uri(op.path())?;
        let mut request = http::Request::new(bytes::Bytes::new());
        *request.method_mut() = op.method().clone();
        *request.uri_mut() = uri;

        let mut interceptors = self.inner.interceptors.clone();
        interceptors.extend(options.interceptors());

        let mut ctx = OperationContext::with_request(op.name(), request)
            .with_interceptors(interceptors)
            .with_timeout(
                options
                    .timeout()
                    .or_else(|| self.inner.config.http.operation_timeout()),
            );
        if let Some(cancel) = options.cancel_signal() {
            ctx = ctx.with_cancel_signal(cancel);
        }

        let span = pylon_telemetry::operation_span(ctx.operation_name(), ctx.invocation_id());
        Ok(ctx.with_span(span))
    }

    /// Calls `op` with `input`.
    pub async fn call<I, O>(&self, op: &Operation<I, O>, mut input: I, options: CallOptions) -> Output<O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let mut ctx = match self.context(op, &options) {
            Ok(ctx) => ctx,
            Err(err) => return Output::from_error(PipelineError::build(err.to_string())),
        };
        self.call_with_context(op, &mut input, &mut ctx).await
    }

    /// Calls `op` with a caller-owned context, leaving it inspectable afterwards.
    pub async fn call_with_context<I, O>(
        &self,
        op: &Operation<I, O>,
        input: &mut I,
        ctx: &mut OperationContext,
    ) -> Output<O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        self.stack(op).call(input, ctx).await
    }

    fn request_uri(&self, path: &str) -> Result<http::Uri, ClientError> {
        let uri = match &self.inner.endpoint {
            Some(endpoint) => {
                let base = endpoint.to_string();
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    path.trim_start_matches('/')
                )
            }
            None => path.to_string(),
        };
        uri.parse()
            .map_err(|e: http::uri::InvalidUri| ClientError::invalid_uri(uri.clone(), e.to_string()))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.config.endpoint)
            .field("stub_responses", &self.inner.config.stub_responses)
            .field("schemes", &self.inner.schemes)
            .field("interceptors", &self.inner.interceptors.len())
            .finish_non_exhaustive()
    }
}

fn retry_config(config: &ClientConfig) -> RetryConfig {
    RetryConfig {
        max_attempts: config.retry.max_attempts,
        max_retry_after: config.retry.max_backoff(),
        quota: QuotaConfig {
            initial: config.retry.initial_quota,
            retry_cost: config.retry.retry_cost,
            timeout_retry_cost: config.retry.timeout_retry_cost,
            no_retry_increment: config.retry.no_retry_increment,
        },
    }
}

/// Builder for [`Client`].
///
/// Unset collaborators default to:
/// - a `reqwest` transport (none when `stub_responses` is on)
/// - every built-in auth scheme
/// - an auth resolver offering only `smithy.api#noAuth`
/// - [`StandardRetryPolicy`] with exponential back-off from the config
pub struct ClientBuilder {
    config: ClientConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    schemes: AuthSchemeRegistry,
    identity_resolvers: IdentityResolverMap,
    auth_resolver: Option<Arc<dyn AuthResolver>>,
    interceptors: InterceptorList,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    backoff: Option<Arc<dyn Backoff>>,
    stubs: Stubs,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl ClientBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            http_client: None,
            schemes: AuthSchemeRegistry::with_defaults(),
            identity_resolvers: IdentityResolverMap::new(),
            auth_resolver: None,
            interceptors: InterceptorList::new(),
            retry_policy: None,
            backoff: None,
            stubs: Stubs::new(),
            plugins: Vec::new(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Edits the configuration in place.
    #[must_use]
    pub fn map_config(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Sets the transport.
    #[must_use]
    pub fn http_client(mut self, client: impl HttpClient) -> Self {
        self.http_client = Some(Arc::new(client));
        self
    }

    /// Enables an auth scheme, replacing any scheme with the same id.
    #[must_use]
    pub fn auth_scheme(mut self, scheme: impl AuthScheme) -> Self {
        self.schemes.register(Arc::new(scheme));
        self
    }

    /// Replaces the enabled auth schemes.
    #[must_use]
    pub fn auth_schemes(mut self, schemes: AuthSchemeRegistry) -> Self {
        self.schemes = schemes;
        self
    }

    /// Registers the identity resolver for `identity_type`.
    #[must_use]
    pub fn identity_resolver(
        mut self,
        identity_type: IdentityType,
        resolver: impl IdentityResolver,
    ) -> Self {
        self.identity_resolvers
            .insert(identity_type, Arc::new(resolver));
        self
    }

    /// Sets the auth resolver used by operations without their own.
    #[must_use]
    pub fn auth_resolver(mut self, resolver: impl AuthResolver) -> Self {
        self.auth_resolver = Some(Arc::new(resolver));
        self
    }

    /// Adds a client-wide interceptor.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: impl RetryPolicy) -> Self {
        self.retry_policy = Some(Arc::new(policy));
        self
    }

    /// Sets the back-off strategy.
    #[must_use]
    pub fn backoff(mut self, backoff: impl Backoff) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Uses `stubs` as the stub queue, e.g. to share one across clients.
    #[must_use]
    pub fn stubs(mut self, stubs: Stubs) -> Self {
        self.stubs = stubs;
        self
    }

    /// Adds a plugin, applied at build time in registration order.
    #[must_use]
    pub fn plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Applies plugins, validates the configuration and builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the configuration is invalid or the default
    /// transport cannot be created.
    pub fn build(mut self) -> Result<Client, ClientError> {
        let plugins = std::mem::take(&mut self.plugins);
        for plugin in &plugins {
            tracing::debug!(plugin = plugin.name(), "applying client plugin");
            self = plugin.apply(self);
        }

        self.config.validate()?;
        let endpoint = self.config.endpoint_uri()?;

        let transport = if self.config.stub_responses {
            Transport::Stubbed
        } else {
            match self.http_client {
                Some(client) => Transport::Http(client),
                None => Transport::Http(Arc::new(ReqwestHttpClient::new(
                    self.config.http.connect_timeout(),
                )?)),
            }
        };

        let auth_resolver = self.auth_resolver.unwrap_or_else(|| {
            Arc::new(StaticAuthResolver::new(vec![AuthOption::new(
                AnonymousScheme::SCHEME_ID,
            )]))
        });
        let backoff = self.backoff.unwrap_or_else(|| {
            Arc::new(ExponentialBackoff::new(
                self.config.retry.base_backoff(),
                self.config.retry.max_backoff(),
            ))
        });

        pylon_telemetry::describe_metrics();
        tracing::debug!(
            endpoint = ?self.config.endpoint,
            stub_responses = self.config.stub_responses,
            schemes = ?self.schemes.scheme_ids(),
            plugins = plugins.len(),
            "client built"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                endpoint,
                transport,
                stubs: self.stubs,
                schemes: Arc::new(self.schemes),
                identity_resolvers: Arc::new(self.identity_resolvers),
                auth_resolver,
                interceptors: self.interceptors,
                retry_policy: self
                    .retry_policy
                    .unwrap_or_else(|| Arc::new(StandardRetryPolicy)),
                backoff,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("schemes", &self.schemes)
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
