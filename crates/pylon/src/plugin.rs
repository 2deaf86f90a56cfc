//! Client plugins.
//!
//! A plugin bundles client customisations, e.g. an interceptor together with
//! the identity resolver it needs. Plugins run in registration order when
//! [`ClientBuilder::build`](crate::ClientBuilder::build) is called, before
//! the configuration is validated.

use crate::ClientBuilder;
use std::fmt;

/// A reusable client customisation.
///
/// # Example
///
/// ```
/// use pylon::{Client, ClientBuilder, Plugin};
/// use pylon_config::ClientConfig;
///
/// struct NoRetries;
///
/// impl Plugin for NoRetries {
///     fn name(&self) -> &'static str {
///         "no_retries"
///     }
///
///     fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
///         builder.map_config(|config| config.retry.max_attempts = 1)
///     }
/// }
///
/// let client = Client::builder()
///     .config(ClientConfig::testing())
///     .plugin(NoRetries)
///     .build()
///     .unwrap();
/// assert_eq!(client.config().retry.max_attempts, 1);
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Returns the plugin name, used in logs.
    fn name(&self) -> &'static str;

    /// Applies the plugin to `builder`.
    fn apply(&self, builder: ClientBuilder) -> ClientBuilder;
}

/// A plugin built from a closure.
pub struct FnPlugin<F> {
    name: &'static str,
    func: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(ClientBuilder) -> ClientBuilder + Send + Sync + 'static,
{
    /// Creates a named closure plugin.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(ClientBuilder) -> ClientBuilder + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        (self.func)(builder)
    }
}

impl<F> fmt::Debug for FnPlugin<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPlugin").field("name", &self.name).finish()
    }
}
