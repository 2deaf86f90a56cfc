//! Interceptors for asserting hook behavior.

use parking_lot::Mutex;
use pylon_core::{Hook, HookResult, Interceptor, InterceptorContext};
use std::sync::Arc;

/// Routes every hook method to `self.$handler(Hook::..)`.
macro_rules! route_all_hooks {
    ($handler:ident) => {
        route_all_hooks!(@read $handler;
            read_before_execution => ReadBeforeExecution,
            read_before_serialization => ReadBeforeSerialization,
            read_after_serialization => ReadAfterSerialization,
            read_before_attempt => ReadBeforeAttempt,
            read_before_signing => ReadBeforeSigning,
            read_after_signing => ReadAfterSigning,
            read_before_transmit => ReadBeforeTransmit,
            read_after_transmit => ReadAfterTransmit,
            read_before_deserialization => ReadBeforeDeserialization,
            read_after_deserialization => ReadAfterDeserialization,
            read_after_attempt => ReadAfterAttempt,
            read_after_execution => ReadAfterExecution,
        );
        route_all_hooks!(@modify $handler;
            modify_before_serialization => ModifyBeforeSerialization,
            modify_before_retry_loop => ModifyBeforeRetryLoop,
            modify_before_signing => ModifyBeforeSigning,
            modify_before_transmit => ModifyBeforeTransmit,
            modify_before_deserialization => ModifyBeforeDeserialization,
            modify_before_attempt_completion => ModifyBeforeAttemptCompletion,
            modify_before_completion => ModifyBeforeCompletion,
        );
    };
    (@read $handler:ident; $($method:ident => $hook:ident,)*) => {
        $(
            fn $method(&self, _ctx: &InterceptorContext<'_>) -> HookResult {
                self.$handler(Hook::$hook)
            }
        )*
    };
    (@modify $handler:ident; $($method:ident => $hook:ident,)*) => {
        $(
            fn $method(&self, _ctx: &mut InterceptorContext<'_>) -> HookResult {
                self.$handler(Hook::$hook)
            }
        )*
    };
}

/// Records every hook it sees, in order.
///
/// Clones share the recording, so a test can keep one handle and register
/// the other on a client.
#[derive(Debug, Clone, Default)]
pub struct RecordingInterceptor {
    hooks: Arc<Mutex<Vec<Hook>>>,
}

impl RecordingInterceptor {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded hooks.
    #[must_use]
    pub fn hooks(&self) -> Vec<Hook> {
        self.hooks.lock().clone()
    }

    /// Returns the recorded hook names.
    #[must_use]
    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.lock().iter().map(Hook::name).collect()
    }

    /// Returns how often `hook` ran.
    #[must_use]
    pub fn count(&self, hook: Hook) -> usize {
        self.hooks.lock().iter().filter(|h| **h == hook).count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.hooks.lock().clear();
    }

    #[allow(clippy::unnecessary_wraps)]
    fn record(&self, hook: Hook) -> HookResult {
        self.hooks.lock().push(hook);
        Ok(())
    }
}

impl Interceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        "recording"
    }

    route_all_hooks!(record);
}

/// Fails at one hook and passes every other.
#[derive(Debug, Clone)]
pub struct FailingInterceptor {
    name: String,
    hook: Hook,
    message: String,
}

impl FailingInterceptor {
    /// Creates an interceptor failing at `hook` with `message`.
    pub fn new(hook: Hook, message: impl Into<String>) -> Self {
        Self {
            name: format!("failing_at_{}", hook.name()),
            hook,
            message: message.into(),
        }
    }

    /// Returns the hook this interceptor fails at.
    #[must_use]
    pub fn hook(&self) -> Hook {
        self.hook
    }

    fn check(&self, hook: Hook) -> HookResult {
        if hook == self.hook {
            return Err(self.message.clone().into());
        }
        Ok(())
    }
}

impl Interceptor for FailingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    route_all_hooks!(check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pylon_core::{InterceptorList, PipelineError};

    fn invoke(list: &InterceptorList, hook: Hook) -> Result<(), PipelineError> {
        let mut input = ();
        let mut request = http::Request::new(Bytes::new());
        let mut ctx = InterceptorContext::new("Op", 1, &mut input, &mut request, None, None);
        list.invoke(hook, &mut ctx, false)
    }

    #[test]
    fn test_recording_sees_every_hook() {
        let recorder = RecordingInterceptor::new();
        let list: InterceptorList = vec![Arc::new(recorder.clone()) as Arc<dyn Interceptor>].into();

        for hook in Hook::all() {
            invoke(&list, *hook).unwrap();
        }

        assert_eq!(recorder.hooks(), Hook::all().to_vec());
        assert_eq!(recorder.count(Hook::ReadAfterAttempt), 1);
        assert_eq!(recorder.hook_names()[0], "read_before_execution");

        recorder.clear();
        assert!(recorder.hooks().is_empty());
    }

    #[test]
    fn test_failing_only_at_its_hook() {
        let failing = FailingInterceptor::new(Hook::ReadBeforeSigning, "no signing today");
        assert_eq!(failing.name(), "failing_at_read_before_signing");
        let list: InterceptorList = vec![Arc::new(failing) as Arc<dyn Interceptor>].into();

        assert!(invoke(&list, Hook::ModifyBeforeSigning).is_ok());
        let err = invoke(&list, Hook::ReadBeforeSigning).unwrap_err();
        match err {
            PipelineError::Interceptor(err) => {
                assert_eq!(err.hook, Hook::ReadBeforeSigning);
                assert_eq!(err.interceptor, "failing_at_read_before_signing");
                assert_eq!(err.source.to_string(), "no signing today");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
