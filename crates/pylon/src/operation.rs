//! Per-operation units supplied by generated code.

use pylon_core::auth::AuthResolver;
use pylon_core::codec::{
    DataParser, ErrorParser, JsonBody, JsonDataParser, RequestBuilder, Validator,
};
use pylon_core::error_parser::HttpErrorParser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Everything the client needs to run one API operation.
///
/// # Example
///
/// ```
/// use pylon::Operation;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct GetWidgetInput { id: String }
///
/// #[derive(Deserialize)]
/// struct Widget { id: String }
///
/// let op = Operation::<GetWidgetInput, Widget>::json("GetWidget")
///     .with_method(http::Method::GET)
///     .with_path("/widgets");
/// assert_eq!(op.name(), "GetWidget");
/// ```
pub struct Operation<I, O> {
    name: String,
    method: http::Method,
    path: String,
    builder: Arc<dyn RequestBuilder<I>>,
    validator: Option<Arc<dyn Validator<I>>>,
    error_parser: Arc<dyn ErrorParser>,
    data_parser: Arc<dyn DataParser<O>>,
    auth_resolver: Option<Arc<dyn AuthResolver>>,
}

impl<I, O> Operation<I, O> {
    /// Creates an operation from its builder and parsers.
    ///
    /// Defaults to `POST /`.
    pub fn new(
        name: impl Into<String>,
        builder: Arc<dyn RequestBuilder<I>>,
        error_parser: Arc<dyn ErrorParser>,
        data_parser: Arc<dyn DataParser<O>>,
    ) -> Self {
        Self {
            name: name.into(),
            method: http::Method::POST,
            path: "/".to_string(),
            builder,
            validator: None,
            error_parser,
            data_parser,
            auth_resolver: None,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the path appended to the client endpoint.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the input validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator<I>) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Overrides the client's auth resolver for this operation.
    #[must_use]
    pub fn with_auth_resolver(mut self, resolver: impl AuthResolver) -> Self {
        self.auth_resolver = Some(Arc::new(resolver));
        self
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &http::Method {
        &self.method
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn builder(&self) -> Arc<dyn RequestBuilder<I>> {
        Arc::clone(&self.builder)
    }

    pub(crate) fn validator(&self) -> Option<Arc<dyn Validator<I>>> {
        self.validator.clone()
    }

    pub(crate) fn error_parser(&self) -> Arc<dyn ErrorParser> {
        Arc::clone(&self.error_parser)
    }

    pub(crate) fn data_parser(&self) -> Arc<dyn DataParser<O>> {
        Arc::clone(&self.data_parser)
    }

    pub(crate) fn auth_resolver(&self) -> Option<Arc<dyn AuthResolver>> {
        self.auth_resolver.clone()
    }
}

impl<I, O> Operation<I, O>
where
    I: Serialize + 'static,
    O: DeserializeOwned + 'static,
{
    /// Creates an operation with a JSON body, JSON output and the JSON error parser.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Arc::new(JsonBody),
            Arc::new(HttpErrorParser::json()),
            Arc::new(JsonDataParser::<O>::new()),
        )
    }
}

impl<I, O> Clone for Operation<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            builder: Arc::clone(&self.builder),
            validator: self.validator.clone(),
            error_parser: Arc::clone(&self.error_parser),
            data_parser: Arc::clone(&self.data_parser),
            auth_resolver: self.auth_resolver.clone(),
        }
    }
}

impl<I, O> fmt::Debug for Operation<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}
