//! Auth options, schemes and signers.
//!
//! Auth resolution works in three steps:
//!
//! 1. An [`AuthResolver`] lists the [`AuthOption`]s for an operation, in
//!    preference order.
//! 2. Each option names an [`AuthScheme`] by id. The scheme knows its
//!    [`Signer`] and which [`IdentityType`](crate::identity::IdentityType) it
//!    needs.
//! 3. The first option whose scheme is registered and whose identity resolves
//!    becomes the call's [`ResolvedAuth`].
//!
//! The built-in schemes cover anonymous access, HTTP Basic, HTTP Bearer and
//! API keys.

mod option;
mod scheme;
mod signers;

pub use option::{AuthOption, AuthParams, AuthProperties, AuthResolver, StaticAuthResolver};
pub use scheme::{
    AnonymousScheme, AuthScheme, AuthSchemeRegistry, HttpApiKeyScheme, HttpBasicScheme,
    HttpBearerScheme, ResolvedAuth,
};
pub use signers::{
    AnonymousSigner, ApiKeyLocation, HttpApiKeySigner, HttpBasicSigner, HttpBearerSigner, Signer,
};
