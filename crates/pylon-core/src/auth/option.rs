use std::collections::BTreeMap;
use std::fmt;

/// String properties attached to an auth option for its signer or resolver.
pub type AuthProperties = BTreeMap<String, String>;

/// One way to authenticate an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOption {
    /// Id of the scheme to use, e.g. `smithy.api#httpBearerAuth`.
    pub scheme_id: String,
    /// Properties passed to the scheme's signer.
    pub signer_properties: AuthProperties,
    /// Properties passed to the identity resolver.
    pub identity_properties: AuthProperties,
}

impl AuthOption {
    /// Creates an option for `scheme_id` with no properties.
    #[must_use]
    pub fn new(scheme_id: impl Into<String>) -> Self {
        Self {
            scheme_id: scheme_id.into(),
            signer_properties: AuthProperties::new(),
            identity_properties: AuthProperties::new(),
        }
    }

    /// Adds a signer property.
    #[must_use]
    pub fn with_signer_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.signer_properties.insert(key.into(), value.into());
        self
    }

    /// Adds an identity property.
    #[must_use]
    pub fn with_identity_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.identity_properties.insert(key.into(), value.into());
        self
    }
}

/// Inputs to auth option resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    /// The operation being called.
    pub operation_name: String,
}

impl AuthParams {
    /// Creates parameters for `operation_name`.
    #[must_use]
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
        }
    }
}

/// Lists the auth options for an operation, most preferred first.
///
/// Implemented by generated code. Closures work too:
///
/// ```
/// use pylon_core::auth::{AuthOption, AuthParams, AuthResolver};
///
/// let resolver = |params: &AuthParams| match params.operation_name.as_str() {
///     "Health" => vec![AuthOption::new("smithy.api#noAuth")],
///     _ => vec![AuthOption::new("smithy.api#httpBearerAuth")],
/// };
/// assert_eq!(resolver.resolve(&AuthParams::new("Health"))[0].scheme_id, "smithy.api#noAuth");
/// ```
pub trait AuthResolver: Send + Sync + 'static {
    /// Returns the ordered auth options for `params`.
    fn resolve(&self, params: &AuthParams) -> Vec<AuthOption>;
}

impl<F> AuthResolver for F
where
    F: Fn(&AuthParams) -> Vec<AuthOption> + Send + Sync + 'static,
{
    fn resolve(&self, params: &AuthParams) -> Vec<AuthOption> {
        self(params)
    }
}

/// Returns the same options for every operation.
#[derive(Clone, Default)]
pub struct StaticAuthResolver {
    options: Vec<AuthOption>,
}

impl StaticAuthResolver {
    /// Creates a resolver returning `options`.
    #[must_use]
    pub fn new(options: Vec<AuthOption>) -> Self {
        Self { options }
    }
}

impl AuthResolver for StaticAuthResolver {
    fn resolve(&self, _params: &AuthParams) -> Vec<AuthOption> {
        self.options.clone()
    }
}

impl fmt::Debug for StaticAuthResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.options.iter().map(|o| &o.scheme_id))
            .finish()
    }
}
