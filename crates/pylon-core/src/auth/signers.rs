use super::option::AuthProperties;
use crate::error::SigningError;
use crate::http::HttpRequest;
use crate::identity::Identity;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use http::Uri;

/// Applies an identity to a transport request.
///
/// `sign` runs once per attempt. `reset` runs before every retry and must
/// undo whatever `sign` added, so the next attempt starts from the unsigned
/// request.
pub trait Signer: Send + Sync + 'static {
    /// Signs `request` with `identity`.
    fn sign(
        &self,
        request: &mut HttpRequest,
        identity: &Identity,
        properties: &AuthProperties,
    ) -> Result<(), SigningError>;

    /// Removes the signature from `request`.
    #[allow(unused_variables)]
    fn reset(&self, request: &mut HttpRequest, properties: &AuthProperties) {}
}

/// Leaves requests untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSigner;

impl Signer for AnonymousSigner {
    fn sign(
        &self,
        _request: &mut HttpRequest,
        _identity: &Identity,
        _properties: &AuthProperties,
    ) -> Result<(), SigningError> {
        Ok(())
    }
}

/// Sets `Authorization: Basic base64(username:password)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBasicSigner;

impl Signer for HttpBasicSigner {
    fn sign(
        &self,
        request: &mut HttpRequest,
        identity: &Identity,
        _properties: &AuthProperties,
    ) -> Result<(), SigningError> {
        let Identity::Login {
            username, password, ..
        } = identity
        else {
            return Err(unexpected_identity("login", identity));
        };

        let encoded = STANDARD.encode(format!("{username}:{password}"));
        let value = sensitive_header(&format!("Basic {encoded}"))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }

    fn reset(&self, request: &mut HttpRequest, _properties: &AuthProperties) {
        request.headers_mut().remove(AUTHORIZATION);
    }
}

/// Sets `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBearerSigner;

impl Signer for HttpBearerSigner {
    fn sign(
        &self,
        request: &mut HttpRequest,
        identity: &Identity,
        _properties: &AuthProperties,
    ) -> Result<(), SigningError> {
        let Identity::Token { token, .. } = identity else {
            return Err(unexpected_identity("token", identity));
        };

        let value = sensitive_header(&format!("Bearer {token}"))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }

    fn reset(&self, request: &mut HttpRequest, _properties: &AuthProperties) {
        request.headers_mut().remove(AUTHORIZATION);
    }
}

/// Where an API key is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    /// A request header named by the `name` property.
    Header,
    /// A query parameter named by the `name` property.
    Query,
}

impl ApiKeyLocation {
    fn from_properties(properties: &AuthProperties) -> Result<Self, SigningError> {
        match properties.get("in").map(String::as_str) {
            Some("header") => Ok(Self::Header),
            Some("query") => Ok(Self::Query),
            Some(other) => Err(SigningError::new(format!(
                "unsupported api key location '{other}', expected 'header' or 'query'"
            ))),
            None => Err(SigningError::new("missing signer property 'in'")),
        }
    }
}

/// Places an API key in a header or query parameter.
///
/// Signer properties:
/// - `name`: header or query parameter name (required)
/// - `in`: `header` or `query` (required)
/// - `scheme`: optional prefix for header values, e.g. `ApiKey`
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpApiKeySigner;

impl Signer for HttpApiKeySigner {
    fn sign(
        &self,
        request: &mut HttpRequest,
        identity: &Identity,
        properties: &AuthProperties,
    ) -> Result<(), SigningError> {
        let Identity::ApiKey { key, .. } = identity else {
            return Err(unexpected_identity("api_key", identity));
        };
        let name = properties
            .get("name")
            .ok_or_else(|| SigningError::new("missing signer property 'name'"))?;

        match ApiKeyLocation::from_properties(properties)? {
            ApiKeyLocation::Header => {
                let header = HeaderName::try_from(name.as_str())
                    .map_err(|e| SigningError::new(format!("invalid header name '{name}': {e}")))?;
                let value = match properties.get("scheme") {
                    Some(scheme) => sensitive_header(&format!("{scheme} {key}"))?,
                    None => sensitive_header(key)?,
                };
                request.headers_mut().insert(header, value);
            }
            ApiKeyLocation::Query => {
                let uri = with_query_param(request.uri(), name, key)?;
                *request.uri_mut() = uri;
            }
        }
        Ok(())
    }

    fn reset(&self, request: &mut HttpRequest, properties: &AuthProperties) {
        let Some(name) = properties.get("name") else {
            return;
        };
        match ApiKeyLocation::from_properties(properties) {
            Ok(ApiKeyLocation::Header) => {
                if let Ok(header) = HeaderName::try_from(name.as_str()) {
                    request.headers_mut().remove(header);
                }
            }
            Ok(ApiKeyLocation::Query) => {
                if let Ok(uri) = without_query_param(request.uri(), name) {
                    *request.uri_mut() = uri;
                }
            }
            Err(_) => {}
        }
    }
}

fn unexpected_identity(expected: &str, identity: &Identity) -> SigningError {
    SigningError::new(format!(
        "expected a {expected} identity, got {}",
        identity.identity_type()
    ))
}

fn sensitive_header(value: &str) -> Result<HeaderValue, SigningError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| SigningError::new("credential contains characters invalid in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

fn with_query_param(uri: &Uri, name: &str, value: &str) -> Result<Uri, SigningError> {
    let pair = serde_urlencoded::to_string(&[(name, value)][..])
        .map_err(|e| SigningError::new(format!("failed to encode query parameter: {e}")))?;
    let path_and_query = match uri.query() {
        Some(query) if !query.is_empty() => format!("{}?{query}&{pair}", uri.path()),
        _ => format!("{}?{pair}", uri.path()),
    };
    replace_path_and_query(uri, &path_and_query)
}

fn without_query_param(uri: &Uri, name: &str) -> Result<Uri, SigningError> {
    let Some(query) = uri.query() else {
        return Ok(uri.clone());
    };
    let mut pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| SigningError::new(format!("failed to decode query: {e}")))?;
    pairs.retain(|(key, _)| key != name);

    let path_and_query = if pairs.is_empty() {
        uri.path().to_string()
    } else {
        let kept = serde_urlencoded::to_string(&pairs)
            .map_err(|e| SigningError::new(format!("failed to encode query: {e}")))?;
        format!("{}?{kept}", uri.path())
    };
    replace_path_and_query(uri, &path_and_query)
}

fn replace_path_and_query(uri: &Uri, path_and_query: &str) -> Result<Uri, SigningError> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|e| SigningError::new(format!("invalid request uri: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| SigningError::new(format!("invalid request uri: {e}")))
}
