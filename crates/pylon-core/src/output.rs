//! The typed result of a pipeline traversal.

use crate::error::PipelineError;

/// What every middleware layer returns to its caller.
///
/// A traversal ends with either `data` or `error` populated. Interceptors may
/// rewrite either field in place, so both are plain public fields rather than
/// a `Result`.
#[derive(Debug)]
pub struct Output<O> {
    /// The parsed operation output.
    pub data: Option<O>,
    /// The failure surfaced by the pipeline.
    pub error: Option<PipelineError>,
}

impl<O> Output<O> {
    /// An output with neither data nor error, as produced by the Send layer.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
        }
    }

    /// A successful output.
    #[must_use]
    pub fn from_data(data: O) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// A failed output.
    #[must_use]
    pub fn from_error(error: impl Into<PipelineError>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    /// Returns true if an error is set.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Sets `error` and discards any parsed data.
    pub fn fail(&mut self, error: impl Into<PipelineError>) {
        self.data = None;
        self.error = Some(error.into());
    }

    /// Converts into a `Result`, preferring the error.
    ///
    /// Returns `Err(PipelineError::MissingResponse)` if neither field is set.
    pub fn into_result(self) -> Result<O, PipelineError> {
        match (self.data, self.error) {
            (_, Some(err)) => Err(err),
            (Some(data), None) => Ok(data),
            (None, None) => Err(PipelineError::MissingResponse),
        }
    }
}

impl<O> Default for Output<O> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<O> From<Result<O, PipelineError>> for Output<O> {
    fn from(result: Result<O, PipelineError>) -> Self {
        match result {
            Ok(data) => Self::from_data(data),
            Err(err) => Self::from_error(err),
        }
    }
}
