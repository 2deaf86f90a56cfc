//! # Pylon
//!
//! **Execution core for generated service clients**
//!
//! Generated clients describe each API operation as an [`Operation`]: a
//! request builder, an optional validator, an error parser and a data parser.
//! [`Client::call`] runs it through a fixed middleware stack:
//!
//! ```text
//! Initialize → Validate → Build → Auth → Retry ┬→ Sign → Parse → Send
//!                                               └── once per attempt ──┘
//! ```
//!
//! Interceptors observe or modify every phase, registered per client or per
//! call. Auth options are resolved against the client's enabled schemes and
//! identity resolvers; retries are classified by a retry policy and paid for
//! from a per-call token quota.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pylon::prelude::*;
//!
//! let client = Client::builder()
//!     .config(ConfigLoader::new().with_env_prefix("PYLON").load()?)
//!     .identity_resolver(IdentityType::Token, StaticIdentityResolver::new(Identity::token(token)))
//!     .auth_resolver(StaticAuthResolver::new(vec![AuthOption::new(HttpBearerScheme::SCHEME_ID)]))
//!     .build()?;
//!
//! let get_widget = Operation::<GetWidgetInput, Widget>::json("GetWidget").with_path("/widgets/get");
//! let widget = client
//!     .call(&get_widget, GetWidgetInput { id }, CallOptions::new())
//!     .await
//!     .into_result()?;
//! ```

#![doc(html_root_url = "https://docs.rs/pylon/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod operation;
mod options;
mod plugin;
mod transport;

pub use client::{Client, ClientBuilder};
pub use error::ClientError;
pub use operation::Operation;
pub use options::CallOptions;
pub use plugin::{FnPlugin, Plugin};
pub use transport::ReqwestHttpClient;

// Re-export the member crates
pub use pylon_config as config;
pub use pylon_core as core;
pub use pylon_middleware as middleware;
pub use pylon_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use pylon::prelude::*;
///
/// let config = ClientConfig::testing();
/// assert!(config.stub_responses);
/// ```
pub mod prelude {
    pub use crate::{CallOptions, Client, ClientBuilder, ClientError, Operation, Plugin};
    pub use pylon_config::{ClientConfig, ConfigLoader};
    pub use pylon_core::auth::{
        AnonymousScheme, AuthOption, HttpApiKeyScheme, HttpBasicScheme, HttpBearerScheme,
        StaticAuthResolver,
    };
    pub use pylon_core::identity::{Identity, IdentityType, StaticIdentityResolver};
    pub use pylon_core::{
        CancelSignal, Hook, Interceptor, InterceptorContext, Output, PipelineError,
    };
}
