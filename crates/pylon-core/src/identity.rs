//! Identities and identity resolvers.
//!
//! An [`Identity`] is the credential a signer applies to a request. Identities
//! are produced by an [`IdentityResolver`] looked up by [`IdentityType`] in an
//! [`IdentityResolverMap`]. The pipeline resolves one identity per call and
//! does not cache it; wrap a resolver in [`CachingIdentityResolver`] to reuse
//! identities across calls.

use crate::auth::AuthProperties;
use crate::error::IdentityError;
use crate::http::BoxFuture;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The kind of identity a scheme needs, used as the resolver map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityType {
    /// No credentials.
    Anonymous,
    /// Username and password.
    Login,
    /// Bearer token.
    Token,
    /// API key.
    ApiKey,
    /// An application-defined identity type.
    Custom(String),
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Login => f.write_str("login"),
            Self::Token => f.write_str("token"),
            Self::ApiKey => f.write_str("api_key"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// A resolved credential.
///
/// `Debug` output never includes secret material.
#[derive(Clone, PartialEq, Eq)]
pub enum Identity {
    /// No credentials.
    Anonymous,
    /// Username and password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
        /// When the credentials stop being valid.
        expiration: Option<DateTime<Utc>>,
    },
    /// Bearer token.
    Token {
        /// Token value.
        token: String,
        /// When the token stops being valid.
        expiration: Option<DateTime<Utc>>,
    },
    /// API key.
    ApiKey {
        /// Key value.
        key: String,
        /// When the key stops being valid.
        expiration: Option<DateTime<Utc>>,
    },
    /// An application-defined identity.
    Custom {
        /// Name of the identity type.
        identity_type: String,
        /// Arbitrary credential properties.
        properties: BTreeMap<String, String>,
        /// When the identity stops being valid.
        expiration: Option<DateTime<Utc>>,
    },
}

impl Identity {
    /// Creates a login identity without expiration.
    #[must_use]
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Login {
            username: username.into(),
            password: password.into(),
            expiration: None,
        }
    }

    /// Creates a token identity without expiration.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: token.into(),
            expiration: None,
        }
    }

    /// Creates an API key identity without expiration.
    #[must_use]
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey {
            key: key.into(),
            expiration: None,
        }
    }

    /// Sets the expiration. Has no effect on `Anonymous`.
    #[must_use]
    pub fn with_expiration(mut self, at: DateTime<Utc>) -> Self {
        match &mut self {
            Self::Anonymous => {}
            Self::Login { expiration, .. }
            | Self::Token { expiration, .. }
            | Self::ApiKey { expiration, .. }
            | Self::Custom { expiration, .. } => *expiration = Some(at),
        }
        self
    }

    /// Returns the identity type.
    #[must_use]
    pub fn identity_type(&self) -> IdentityType {
        match self {
            Self::Anonymous => IdentityType::Anonymous,
            Self::Login { .. } => IdentityType::Login,
            Self::Token { .. } => IdentityType::Token,
            Self::ApiKey { .. } => IdentityType::ApiKey,
            Self::Custom { identity_type, .. } => IdentityType::Custom(identity_type.clone()),
        }
    }

    /// Returns the expiration, if any.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Anonymous => None,
            Self::Login { expiration, .. }
            | Self::Token { expiration, .. }
            | Self::ApiKey { expiration, .. }
            | Self::Custom { expiration, .. } => *expiration,
        }
    }

    /// Returns true if the identity expires at or before `now + window`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let Some(expiration) = self.expiration() else {
            return false;
        };
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(window)
            .map_or(true, |deadline| expiration <= deadline)
    }

    /// Returns true if the identity has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(Utc::now(), Duration::ZERO)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Login {
                username,
                expiration,
                ..
            } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("expiration", expiration)
                .finish(),
            Self::Token { expiration, .. } => f
                .debug_struct("Token")
                .field("token", &"<redacted>")
                .field("expiration", expiration)
                .finish(),
            Self::ApiKey { expiration, .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<redacted>")
                .field("expiration", expiration)
                .finish(),
            Self::Custom {
                identity_type,
                properties,
                expiration,
            } => f
                .debug_struct("Custom")
                .field("identity_type", identity_type)
                .field("properties", &properties.keys().collect::<Vec<_>>())
                .field("expiration", expiration)
                .finish(),
        }
    }
}

/// Produces identities for an identity type.
pub trait IdentityResolver: Send + Sync + 'static {
    /// Resolves an identity using the auth option's identity properties.
    fn identity<'a>(
        &'a self,
        properties: &'a AuthProperties,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>>;
}

/// Always resolves the same identity.
#[derive(Debug, Clone)]
pub struct StaticIdentityResolver {
    identity: Identity,
}

impl StaticIdentityResolver {
    /// Creates a resolver for `identity`.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn identity<'a>(
        &'a self,
        _properties: &'a AuthProperties,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        let identity = self.identity.clone();
        Box::pin(async move { Ok(identity) })
    }
}

/// Resolves the anonymous identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentityResolver;

impl IdentityResolver for AnonymousIdentityResolver {
    fn identity<'a>(
        &'a self,
        _properties: &'a AuthProperties,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        Box::pin(async { Ok(Identity::Anonymous) })
    }
}

/// Resolves identities by calling an async function.
///
/// # Example
///
/// ```
/// use pylon_core::identity::{FnIdentityResolver, Identity};
///
/// let resolver = FnIdentityResolver::new(|_props| async {
///     Ok(Identity::token("from-vault"))
/// });
/// ```
pub struct FnIdentityResolver<F> {
    f: F,
}

impl<F> FnIdentityResolver<F> {
    /// Wraps `f`.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(&AuthProperties) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Identity, IdentityError>> + Send + 'static,
    {
        Self { f }
    }
}

impl<F, Fut> IdentityResolver for FnIdentityResolver<F>
where
    F: Fn(&AuthProperties) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Identity, IdentityError>> + Send + 'static,
{
    fn identity<'a>(
        &'a self,
        properties: &'a AuthProperties,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        Box::pin((self.f)(properties))
    }
}

impl<F> fmt::Debug for FnIdentityResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnIdentityResolver").finish_non_exhaustive()
    }
}

/// Caches identities of an inner resolver until they near expiration.
///
/// Entries are keyed by the identity properties they were resolved with, so
/// options asking for different properties never share a credential.
/// Identities without an expiration are cached forever.
pub struct CachingIdentityResolver<R> {
    inner: R,
    refresh_window: Duration,
    cached: RwLock<HashMap<AuthProperties, Identity>>,
}

impl<R: IdentityResolver> CachingIdentityResolver<R> {
    /// Default time before expiration at which the identity is refreshed.
    pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(60);

    /// Wraps `inner` with the default refresh window.
    pub fn new(inner: R) -> Self {
        Self::with_refresh_window(inner, Self::DEFAULT_REFRESH_WINDOW)
    }

    /// Wraps `inner`, refreshing identities that expire within `window`.
    pub fn with_refresh_window(inner: R, window: Duration) -> Self {
        Self {
            inner,
            refresh_window: window,
            cached: RwLock::new(HashMap::new()),
        }
    }

    /// Drops every cached identity.
    pub fn invalidate(&self) {
        self.cached.write().clear();
    }

    fn fresh(&self, properties: &AuthProperties) -> Option<Identity> {
        self.cached
            .read()
            .get(properties)
            .filter(|identity| !identity.expires_within(Utc::now(), self.refresh_window))
            .cloned()
    }
}

impl<R: IdentityResolver> IdentityResolver for CachingIdentityResolver<R> {
    fn identity<'a>(
        &'a self,
        properties: &'a AuthProperties,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        Box::pin(async move {
            if let Some(identity) = self.fresh(properties) {
                return Ok(identity);
            }
            let identity = self.inner.identity(properties).await?;
            tracing::debug!(identity_type = %identity.identity_type(), "refreshed cached identity");
            self.cached
                .write()
                .insert(properties.clone(), identity.clone());
            Ok(identity)
        })
    }
}

impl<R> fmt::Debug for CachingIdentityResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingIdentityResolver")
            .field("refresh_window", &self.refresh_window)
            .finish_non_exhaustive()
    }
}

/// Identity resolvers keyed by identity type.
#[derive(Clone, Default)]
pub struct IdentityResolverMap {
    resolvers: HashMap<IdentityType, Arc<dyn IdentityResolver>>,
}

impl IdentityResolverMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for `identity_type`, replacing any previous one.
    pub fn insert(&mut self, identity_type: IdentityType, resolver: Arc<dyn IdentityResolver>) {
        self.resolvers.insert(identity_type, resolver);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, identity_type: IdentityType, resolver: impl IdentityResolver) -> Self {
        self.insert(identity_type, Arc::new(resolver));
        self
    }

    /// Returns the resolver for `identity_type`.
    #[must_use]
    pub fn get(&self, identity_type: &IdentityType) -> Option<Arc<dyn IdentityResolver>> {
        self.resolvers.get(identity_type).cloned()
    }

    /// Returns true if a resolver exists for `identity_type`.
    #[must_use]
    pub fn contains(&self, identity_type: &IdentityType) -> bool {
        self.resolvers.contains_key(identity_type)
    }

    /// Returns the number of registered resolvers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns true if no resolver is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl fmt::Debug for IdentityResolverMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.resolvers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
        ttl: Option<chrono::Duration>,
    }

    impl IdentityResolver for Counting {
        fn identity<'a>(
            &'a self,
            _properties: &'a AuthProperties,
        ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let identity = Identity::token(format!("token-{n}"));
            let identity = match self.ttl {
                Some(ttl) => identity.with_expiration(Utc::now() + ttl),
                None => identity,
            };
            Box::pin(async move { Ok(identity) })
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", Identity::login("alice", "hunter2"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));

        let rendered = format!("{:?}", Identity::token("secret-token"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn test_expiration() {
        let now = Utc::now();
        let identity = Identity::token("t").with_expiration(now + chrono::Duration::seconds(30));

        assert!(!identity.is_expired());
        assert!(identity.expires_within(now, Duration::from_secs(60)));
        assert!(!Identity::Anonymous.expires_within(now, Duration::from_secs(3600)));
        assert_eq!(Identity::Anonymous.with_expiration(now).expiration(), None);
    }

    #[test]
    fn test_identity_type_display() {
        assert_eq!(IdentityType::ApiKey.to_string(), "api_key");
        assert_eq!(IdentityType::Custom("sigv4".into()).to_string(), "sigv4");
        assert_eq!(Identity::api_key("k").identity_type(), IdentityType::ApiKey);
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticIdentityResolver::new(Identity::token("abc"));
        let identity = resolver.identity(&AuthProperties::new()).await.unwrap();
        assert_eq!(identity, Identity::token("abc"));
    }

    #[tokio::test]
    async fn test_fn_resolver_sees_properties() {
        let resolver = FnIdentityResolver::new(|props: &AuthProperties| {
            let key = props.get("key").cloned().unwrap_or_default();
            async move { Ok(Identity::api_key(key)) }
        });

        let mut props = AuthProperties::new();
        props.insert("key".to_string(), "k-1".to_string());

        let identity = resolver.identity(&props).await.unwrap();
        assert_eq!(identity, Identity::api_key("k-1"));
    }

    #[tokio::test]
    async fn test_caching_resolver_reuses_non_expiring_identity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CachingIdentityResolver::new(Counting {
            calls: Arc::clone(&calls),
            ttl: None,
        });
        let props = AuthProperties::new();

        let first = resolver.identity(&props).await.unwrap();
        let second = resolver.identity(&props).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        resolver.invalidate();
        resolver.identity(&props).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_resolver_refreshes_near_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CachingIdentityResolver::with_refresh_window(
            Counting {
                calls: Arc::clone(&calls),
                ttl: Some(chrono::Duration::seconds(30)),
            },
            Duration::from_secs(60),
        );
        let props = AuthProperties::new();

        let first = resolver.identity(&props).await.unwrap();
        let second = resolver.identity(&props).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_resolver_keys_by_properties() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CachingIdentityResolver::new(Counting {
            calls: Arc::clone(&calls),
            ttl: None,
        });
        let tenant = |name: &str| {
            let mut props = AuthProperties::new();
            props.insert("tenant".to_string(), name.to_string());
            props
        };

        let a = resolver.identity(&tenant("a")).await.unwrap();
        let b = resolver.identity(&tenant("b")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(resolver.identity(&tenant("a")).await.unwrap(), a);
        assert_eq!(resolver.identity(&tenant("b")).await.unwrap(), b);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolver_map() {
        let map = IdentityResolverMap::new()
            .with(IdentityType::Token, StaticIdentityResolver::new(Identity::token("t")));

        assert!(map.contains(&IdentityType::Token));
        assert!(map.get(&IdentityType::Login).is_none());
        assert_eq!(map.len(), 1);
    }
}
