use super::option::AuthProperties;
use super::signers::{AnonymousSigner, HttpApiKeySigner, HttpBasicSigner, HttpBearerSigner, Signer};
use crate::identity::{AnonymousIdentityResolver, Identity, IdentityResolver, IdentityResolverMap, IdentityType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named way of authenticating requests.
///
/// A scheme has exactly one signer and asks the resolver map for the
/// resolver of its identity type.
pub trait AuthScheme: Send + Sync + 'static {
    /// Stable scheme id, e.g. `smithy.api#httpBasicAuth`.
    fn scheme_id(&self) -> &str;

    /// The signer applying this scheme's identity.
    fn signer(&self) -> Arc<dyn Signer>;

    /// The identity type this scheme signs with.
    fn identity_type(&self) -> IdentityType;

    /// Picks the identity resolver for this scheme.
    fn identity_resolver(
        &self,
        resolvers: &IdentityResolverMap,
    ) -> Option<Arc<dyn IdentityResolver>> {
        resolvers.get(&self.identity_type())
    }
}

/// `smithy.api#noAuth`: never signs and always resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousScheme;

impl AnonymousScheme {
    /// The scheme id.
    pub const SCHEME_ID: &'static str = "smithy.api#noAuth";
}

impl AuthScheme for AnonymousScheme {
    fn scheme_id(&self) -> &str {
        Self::SCHEME_ID
    }

    fn signer(&self) -> Arc<dyn Signer> {
        Arc::new(AnonymousSigner)
    }

    fn identity_type(&self) -> IdentityType {
        IdentityType::Anonymous
    }

    fn identity_resolver(
        &self,
        resolvers: &IdentityResolverMap,
    ) -> Option<Arc<dyn IdentityResolver>> {
        let fallback: Arc<dyn IdentityResolver> = Arc::new(AnonymousIdentityResolver);
        Some(resolvers.get(&IdentityType::Anonymous).unwrap_or(fallback))
    }
}

/// `smithy.api#httpBasicAuth` with a `Login` identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBasicScheme;

impl HttpBasicScheme {
    /// The scheme id.
    pub const SCHEME_ID: &'static str = "smithy.api#httpBasicAuth";
}

impl AuthScheme for HttpBasicScheme {
    fn scheme_id(&self) -> &str {
        Self::SCHEME_ID
    }

    fn signer(&self) -> Arc<dyn Signer> {
        Arc::new(HttpBasicSigner)
    }

    fn identity_type(&self) -> IdentityType {
        IdentityType::Login
    }
}

/// `smithy.api#httpBearerAuth` with a `Token` identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBearerScheme;

impl HttpBearerScheme {
    /// The scheme id.
    pub const SCHEME_ID: &'static str = "smithy.api#httpBearerAuth";
}

impl AuthScheme for HttpBearerScheme {
    fn scheme_id(&self) -> &str {
        Self::SCHEME_ID
    }

    fn signer(&self) -> Arc<dyn Signer> {
        Arc::new(HttpBearerSigner)
    }

    fn identity_type(&self) -> IdentityType {
        IdentityType::Token
    }
}

/// `smithy.api#httpApiKeyAuth` with an `ApiKey` identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpApiKeyScheme;

impl HttpApiKeyScheme {
    /// The scheme id.
    pub const SCHEME_ID: &'static str = "smithy.api#httpApiKeyAuth";
}

impl AuthScheme for HttpApiKeyScheme {
    fn scheme_id(&self) -> &str {
        Self::SCHEME_ID
    }

    fn signer(&self) -> Arc<dyn Signer> {
        Arc::new(HttpApiKeySigner)
    }

    fn identity_type(&self) -> IdentityType {
        IdentityType::ApiKey
    }
}

/// The schemes enabled on a client, keyed by scheme id.
#[derive(Clone, Default)]
pub struct AuthSchemeRegistry {
    schemes: HashMap<String, Arc<dyn AuthScheme>>,
}

impl AuthSchemeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in scheme.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AnonymousScheme));
        registry.register(Arc::new(HttpBasicScheme));
        registry.register(Arc::new(HttpBearerScheme));
        registry.register(Arc::new(HttpApiKeyScheme));
        registry
    }

    /// Registers `scheme`, replacing any scheme with the same id.
    pub fn register(&mut self, scheme: Arc<dyn AuthScheme>) {
        self.schemes.insert(scheme.scheme_id().to_string(), scheme);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, scheme: impl AuthScheme) -> Self {
        self.register(Arc::new(scheme));
        self
    }

    /// Returns the scheme registered under `scheme_id`.
    #[must_use]
    pub fn get(&self, scheme_id: &str) -> Option<&Arc<dyn AuthScheme>> {
        self.schemes.get(scheme_id)
    }

    /// Returns true if `scheme_id` is registered.
    #[must_use]
    pub fn contains(&self, scheme_id: &str) -> bool {
        self.schemes.contains_key(scheme_id)
    }

    /// Returns the registered scheme ids, sorted.
    #[must_use]
    pub fn scheme_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for AuthSchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.scheme_ids()).finish()
    }
}

/// The auth decision for one call, consumed by the Sign layer.
#[derive(Clone)]
pub struct ResolvedAuth {
    /// Id of the chosen scheme.
    pub scheme_id: String,
    /// The scheme's signer.
    pub signer: Arc<dyn Signer>,
    /// Signer properties from the chosen option.
    pub signer_properties: AuthProperties,
    /// The resolved identity.
    pub identity: Identity,
    /// Identity properties from the chosen option.
    pub identity_properties: AuthProperties,
}

impl fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAuth")
            .field("scheme_id", &self.scheme_id)
            .field("signer_properties", &self.signer_properties)
            .field("identity", &self.identity)
            .field("identity_properties", &self.identity_properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentityResolver;

    #[test]
    fn test_default_registry() {
        let registry = AuthSchemeRegistry::with_defaults();
        assert_eq!(
            registry.scheme_ids(),
            vec![
                "smithy.api#httpApiKeyAuth",
                "smithy.api#httpBasicAuth",
                "smithy.api#httpBearerAuth",
                "smithy.api#noAuth",
            ]
        );
    }

    #[test]
    fn test_scheme_looks_up_resolver_by_identity_type() {
        let resolvers = IdentityResolverMap::new()
            .with(IdentityType::Token, StaticIdentityResolver::new(Identity::token("t")));

        assert!(HttpBearerScheme.identity_resolver(&resolvers).is_some());
        assert!(HttpBasicScheme.identity_resolver(&resolvers).is_none());
    }

    #[test]
    fn test_anonymous_scheme_always_resolves() {
        let resolvers = IdentityResolverMap::new();
        assert!(AnonymousScheme.identity_resolver(&resolvers).is_some());
    }
}
