//! Interceptor hook protocol.
//!
//! Interceptors observe and modify a call at fixed [`Hook`]s. Every hook
//! method on [`Interceptor`] has a no-op default, so an interceptor implements
//! only the hooks it cares about.
//!
//! "Modify" hooks receive `&mut InterceptorContext` and may rewrite the input,
//! request, response or output in place. "Read" hooks receive
//! `&InterceptorContext` and can only observe, though they may still fail.
//!
//! # Example
//!
//! ```
//! use pylon_core::{HookResult, Interceptor, InterceptorContext};
//!
//! struct UserAgent;
//!
//! impl Interceptor for UserAgent {
//!     fn modify_before_signing(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
//!         ctx.request_mut()
//!             .headers_mut()
//!             .insert("user-agent", http::HeaderValue::from_static("pylon/0.1"));
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::{BoxError, InterceptorError, PipelineError};
use crate::http::{HttpRequest, HttpResponse};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Result returned by every hook method.
pub type HookResult = Result<(), BoxError>;

/// The fixed set of interceptor extension points, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Before anything else runs.
    ReadBeforeExecution,
    /// Before the input is serialized.
    ModifyBeforeSerialization,
    /// Before the input is serialized.
    ReadBeforeSerialization,
    /// After the builder populated the request.
    ReadAfterSerialization,
    /// Before the first attempt.
    ModifyBeforeRetryLoop,
    /// Before each attempt.
    ReadBeforeAttempt,
    /// Before the request is signed.
    ModifyBeforeSigning,
    /// Before the request is signed.
    ReadBeforeSigning,
    /// After the request was signed.
    ReadAfterSigning,
    /// Before the request is sent.
    ModifyBeforeTransmit,
    /// Before the request is sent.
    ReadBeforeTransmit,
    /// After the response was received.
    ReadAfterTransmit,
    /// Before the response is parsed.
    ModifyBeforeDeserialization,
    /// Before the response is parsed.
    ReadBeforeDeserialization,
    /// After the response was parsed.
    ReadAfterDeserialization,
    /// Before an attempt is completed.
    ModifyBeforeAttemptCompletion,
    /// After each attempt.
    ReadAfterAttempt,
    /// Before the call completes.
    ModifyBeforeCompletion,
    /// After everything else ran.
    ReadAfterExecution,
}

impl Hook {
    /// Returns the snake_case name of this hook.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReadBeforeExecution => "read_before_execution",
            Self::ModifyBeforeSerialization => "modify_before_serialization",
            Self::ReadBeforeSerialization => "read_before_serialization",
            Self::ReadAfterSerialization => "read_after_serialization",
            Self::ModifyBeforeRetryLoop => "modify_before_retry_loop",
            Self::ReadBeforeAttempt => "read_before_attempt",
            Self::ModifyBeforeSigning => "modify_before_signing",
            Self::ReadBeforeSigning => "read_before_signing",
            Self::ReadAfterSigning => "read_after_signing",
            Self::ModifyBeforeTransmit => "modify_before_transmit",
            Self::ReadBeforeTransmit => "read_before_transmit",
            Self::ReadAfterTransmit => "read_after_transmit",
            Self::ModifyBeforeDeserialization => "modify_before_deserialization",
            Self::ReadBeforeDeserialization => "read_before_deserialization",
            Self::ReadAfterDeserialization => "read_after_deserialization",
            Self::ModifyBeforeAttemptCompletion => "modify_before_attempt_completion",
            Self::ReadAfterAttempt => "read_after_attempt",
            Self::ModifyBeforeCompletion => "modify_before_completion",
            Self::ReadAfterExecution => "read_after_execution",
        }
    }

    /// Returns true for hooks that receive mutable access.
    #[must_use]
    pub const fn is_modify(&self) -> bool {
        matches!(
            self,
            Self::ModifyBeforeSerialization
                | Self::ModifyBeforeRetryLoop
                | Self::ModifyBeforeSigning
                | Self::ModifyBeforeTransmit
                | Self::ModifyBeforeDeserialization
                | Self::ModifyBeforeAttemptCompletion
                | Self::ModifyBeforeCompletion
        )
    }

    /// Returns all hooks in call order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ReadBeforeExecution,
            Self::ModifyBeforeSerialization,
            Self::ReadBeforeSerialization,
            Self::ReadAfterSerialization,
            Self::ModifyBeforeRetryLoop,
            Self::ReadBeforeAttempt,
            Self::ModifyBeforeSigning,
            Self::ReadBeforeSigning,
            Self::ReadAfterSigning,
            Self::ModifyBeforeTransmit,
            Self::ReadBeforeTransmit,
            Self::ReadAfterTransmit,
            Self::ModifyBeforeDeserialization,
            Self::ReadBeforeDeserialization,
            Self::ReadAfterDeserialization,
            Self::ModifyBeforeAttemptCompletion,
            Self::ReadAfterAttempt,
            Self::ModifyBeforeCompletion,
            Self::ReadAfterExecution,
        ]
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-erased access to the call's `Output`.
pub struct OutputView<'a> {
    data: &'a mut (dyn Any + Send),
    error: &'a mut Option<PipelineError>,
}

impl<'a> OutputView<'a> {
    /// Wraps the fields of an `Output<O>`; `data` must be the `Option<O>`.
    pub fn new<O: Send + 'static>(
        data: &'a mut Option<O>,
        error: &'a mut Option<PipelineError>,
    ) -> Self {
        Self { data, error }
    }
}

/// What an interceptor sees at a hook.
pub struct InterceptorContext<'a> {
    operation_name: &'a str,
    attempt: u32,
    input: &'a mut (dyn Any + Send),
    request: &'a mut HttpRequest,
    response: Option<&'a mut HttpResponse>,
    output: Option<OutputView<'a>>,
}

impl<'a> InterceptorContext<'a> {
    /// Assembles a hook context from borrowed call state.
    pub fn new(
        operation_name: &'a str,
        attempt: u32,
        input: &'a mut (dyn Any + Send),
        request: &'a mut HttpRequest,
        response: Option<&'a mut HttpResponse>,
        output: Option<OutputView<'a>>,
    ) -> Self {
        Self {
            operation_name,
            attempt,
            input,
            request,
            response,
            output,
        }
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        self.operation_name
    }

    /// Returns the current attempt number; `0` before the retry loop.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the typed input if it is a `T`.
    #[must_use]
    pub fn input<T: 'static>(&self) -> Option<&T> {
        self.input.downcast_ref()
    }

    /// Returns the typed input mutably if it is a `T`.
    pub fn input_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.input.downcast_mut()
    }

    /// Returns the transport request.
    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &*self.request
    }

    /// Returns the transport request mutably.
    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut *self.request
    }

    /// Returns the transport response, once one has been received.
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_deref()
    }

    /// Returns the transport response mutably.
    pub fn response_mut(&mut self) -> Option<&mut HttpResponse> {
        self.response.as_deref_mut()
    }

    /// Returns true if an output exists at this hook.
    #[must_use]
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Returns the parsed output data if it is an `O`.
    #[must_use]
    pub fn output_data<O: 'static>(&self) -> Option<&O> {
        self.output
            .as_ref()?
            .data
            .downcast_ref::<Option<O>>()?
            .as_ref()
    }

    /// Returns the output data slot mutably if the output type is `O`.
    pub fn output_data_mut<O: 'static>(&mut self) -> Option<&mut Option<O>> {
        self.output.as_mut()?.data.downcast_mut::<Option<O>>()
    }

    /// Returns the output error, if any.
    #[must_use]
    pub fn output_error(&self) -> Option<&PipelineError> {
        self.output.as_ref()?.error.as_ref()
    }

    /// Returns the output error slot mutably.
    pub fn output_error_mut(&mut self) -> Option<&mut Option<PipelineError>> {
        self.output.as_mut().map(|output| &mut *output.error)
    }
}

/// An extension that runs at pipeline hooks.
///
/// All hook methods default to no-ops.
#[allow(unused_variables)]
pub trait Interceptor: Send + Sync + 'static {
    /// Name used in error messages and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Before anything else runs.
    fn read_before_execution(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the input before serialization.
    fn modify_before_serialization(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the input before serialization.
    fn read_before_serialization(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the serialized request.
    fn read_after_serialization(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the request before the first attempt.
    fn modify_before_retry_loop(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Before each attempt.
    fn read_before_attempt(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the request before signing.
    fn modify_before_signing(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the request before signing.
    fn read_before_signing(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the signed request.
    fn read_after_signing(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the request before it is sent.
    fn modify_before_transmit(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the request before it is sent.
    fn read_before_transmit(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the transport response.
    fn read_after_transmit(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the response before parsing.
    fn modify_before_deserialization(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the response before parsing.
    fn read_before_deserialization(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// Observes the parsed output.
    fn read_after_deserialization(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the output of an attempt.
    fn modify_before_attempt_completion(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// After each attempt.
    fn read_after_attempt(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// May rewrite the final output.
    fn modify_before_completion(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
        Ok(())
    }

    /// After everything else ran.
    fn read_after_execution(&self, ctx: &InterceptorContext<'_>) -> HookResult {
        Ok(())
    }
}

fn dispatch(interceptor: &dyn Interceptor, hook: Hook, ctx: &mut InterceptorContext<'_>) -> HookResult {
    match hook {
        Hook::ReadBeforeExecution => interceptor.read_before_execution(ctx),
        Hook::ModifyBeforeSerialization => interceptor.modify_before_serialization(ctx),
        Hook::ReadBeforeSerialization => interceptor.read_before_serialization(ctx),
        Hook::ReadAfterSerialization => interceptor.read_after_serialization(ctx),
        Hook::ModifyBeforeRetryLoop => interceptor.modify_before_retry_loop(ctx),
        Hook::ReadBeforeAttempt => interceptor.read_before_attempt(ctx),
        Hook::ModifyBeforeSigning => interceptor.modify_before_signing(ctx),
        Hook::ReadBeforeSigning => interceptor.read_before_signing(ctx),
        Hook::ReadAfterSigning => interceptor.read_after_signing(ctx),
        Hook::ModifyBeforeTransmit => interceptor.modify_before_transmit(ctx),
        Hook::ReadBeforeTransmit => interceptor.read_before_transmit(ctx),
        Hook::ReadAfterTransmit => interceptor.read_after_transmit(ctx),
        Hook::ModifyBeforeDeserialization => interceptor.modify_before_deserialization(ctx),
        Hook::ReadBeforeDeserialization => interceptor.read_before_deserialization(ctx),
        Hook::ReadAfterDeserialization => interceptor.read_after_deserialization(ctx),
        Hook::ModifyBeforeAttemptCompletion => interceptor.modify_before_attempt_completion(ctx),
        Hook::ReadAfterAttempt => interceptor.read_after_attempt(ctx),
        Hook::ModifyBeforeCompletion => interceptor.modify_before_completion(ctx),
        Hook::ReadAfterExecution => interceptor.read_after_execution(ctx),
    }
}

/// An ordered list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorList {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Appends every interceptor of `other`, keeping their order.
    pub fn extend(&mut self, other: &InterceptorList) {
        self.interceptors.extend(other.interceptors.iter().cloned());
    }

    /// Returns the number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Iterates interceptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        self.interceptors.iter()
    }

    /// Runs `hook` on every interceptor in registration order.
    ///
    /// With `aggregate_errors == false` the first failure is returned and the
    /// remaining interceptors are skipped. With `true` every interceptor runs
    /// and all failures are returned together as
    /// [`PipelineError::Interceptors`].
    pub fn invoke(
        &self,
        hook: Hook,
        ctx: &mut InterceptorContext<'_>,
        aggregate_errors: bool,
    ) -> Result<(), PipelineError> {
        let mut failures = Vec::new();

        for interceptor in &self.interceptors {
            if let Err(source) = dispatch(interceptor.as_ref(), hook, ctx) {
                let err = InterceptorError {
                    hook,
                    interceptor: interceptor.name().to_string(),
                    source,
                };
                if !aggregate_errors {
                    return Err(PipelineError::Interceptor(err));
                }
                failures.push(err);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Interceptors(failures))
        }
    }
}

impl fmt::Debug for InterceptorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.interceptors.iter().map(|i| i.name()))
            .finish()
    }
}

impl From<Vec<Arc<dyn Interceptor>>> for InterceptorList {
    fn from(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }
}

impl FromIterator<Arc<dyn Interceptor>> for InterceptorList {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Interceptor>>>(iter: T) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use parking_lot::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Interceptor for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn read_before_execution(&self, _ctx: &InterceptorContext<'_>) -> HookResult {
            self.log.lock().push(self.label.to_string());
            if self.fail {
                Err(format!("{} failed", self.label).into())
            } else {
                Ok(())
            }
        }
    }

    struct Rewriter;

    impl Interceptor for Rewriter {
        fn modify_before_serialization(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
            if let Some(input) = ctx.input_mut::<String>() {
                input.push_str("-rewritten");
            }
            Ok(())
        }

        fn modify_before_completion(&self, ctx: &mut InterceptorContext<'_>) -> HookResult {
            if let Some(slot) = ctx.output_data_mut::<u32>() {
                *slot = Some(99);
            }
            if let Some(error) = ctx.output_error_mut() {
                *error = None;
            }
            Ok(())
        }
    }

    fn recorders(entries: &[(&'static str, bool)]) -> (InterceptorList, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let list = entries
            .iter()
            .map(|(label, fail)| {
                Arc::new(Recorder {
                    label: *label,
                    log: Arc::clone(&log),
                    fail: *fail,
                }) as Arc<dyn Interceptor>
            })
            .collect();
        (list, log)
    }

    fn invoke(list: &InterceptorList, hook: Hook, aggregate: bool) -> Result<(), PipelineError> {
        let mut input = String::new();
        let mut request = http::Request::new(Bytes::new());
        let mut ctx = InterceptorContext::new("Op", 0, &mut input, &mut request, None, None);
        list.invoke(hook, &mut ctx, aggregate)
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let (list, log) = recorders(&[("a", false), ("b", false), ("c", false)]);
        invoke(&list, Hook::ReadBeforeExecution, false).expect("no failures");
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fail_fast_skips_remaining() {
        let (list, log) = recorders(&[("a", false), ("b", true), ("c", true)]);
        let err = invoke(&list, Hook::ReadBeforeExecution, false).unwrap_err();

        assert_eq!(*log.lock(), vec!["a", "b"]);
        match err {
            PipelineError::Interceptor(err) => {
                assert_eq!(err.interceptor, "b");
                assert_eq!(err.hook, Hook::ReadBeforeExecution);
            }
            other => panic!("expected single interceptor error, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_runs_all_and_collects() {
        let (list, log) = recorders(&[("a", true), ("b", false), ("c", true)]);
        let err = invoke(&list, Hook::ReadBeforeExecution, true).unwrap_err();

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        match err {
            PipelineError::Interceptors(errors) => {
                let names: Vec<_> = errors.iter().map(|e| e.interceptor.as_str()).collect();
                assert_eq!(names, vec!["a", "c"]);
            }
            other => panic!("expected aggregated errors, got {other:?}"),
        }
    }

    #[test]
    fn test_unimplemented_hooks_are_noops() {
        let (list, log) = recorders(&[("a", true)]);
        for hook in Hook::all() {
            if *hook != Hook::ReadBeforeExecution {
                invoke(&list, *hook, false).expect("default hooks never fail");
            }
        }
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_modify_hooks_rewrite_input_and_output() {
        let list = InterceptorList::from(vec![Arc::new(Rewriter) as Arc<dyn Interceptor>]);
        let mut input = "original".to_string();
        let mut request = http::Request::new(Bytes::new());
        let mut data: Option<u32> = Some(1);
        let mut error = Some(PipelineError::Cancelled);

        {
            let mut ctx = InterceptorContext::new("Op", 1, &mut input, &mut request, None, None);
            list.invoke(Hook::ModifyBeforeSerialization, &mut ctx, false)
                .expect("rewrite succeeds");
        }
        {
            let output = OutputView::new(&mut data, &mut error);
            let mut ctx =
                InterceptorContext::new("Op", 1, &mut input, &mut request, None, Some(output));
            list.invoke(Hook::ModifyBeforeCompletion, &mut ctx, false)
                .expect("rewrite succeeds");
        }

        assert_eq!(input, "original-rewritten");
        assert_eq!(data, Some(99));
        assert!(error.is_none());
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(Hook::all().len(), 19);
        assert_eq!(Hook::ReadAfterAttempt.to_string(), "read_after_attempt");
        assert!(Hook::ModifyBeforeTransmit.is_modify());
        assert!(!Hook::ReadBeforeTransmit.is_modify());
    }
}
