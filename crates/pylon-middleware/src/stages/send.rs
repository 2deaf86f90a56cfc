//! Send middleware.
//!
//! The terminal layer. Dispatches the transport request through the
//! [`HttpClient`], or takes a canned outcome from [`Stubs`] when the client
//! is stubbed. The send races the call's cancellation signal and optional
//! timeout.

use super::invoke_hook;
use crate::middleware::{Middleware, Next};
use crate::stack::Stage;
use crate::stubs::Stubs;
use pylon_core::{BoxFuture, HttpClient, HttpResponse, Hook, OperationContext, Output, PipelineError};
use std::sync::Arc;

#[derive(Clone)]
enum Transport {
    Client(Arc<dyn HttpClient>),
    Stubbed(Stubs),
}

/// Middleware sending the request.
///
/// # Behavior
///
/// 1. `modify_before_transmit`, then `read_before_transmit`
/// 2. Sends the request; a response is stored in the context, a transport
///    failure becomes the output error
/// 3. `read_after_transmit`, which also runs after a transport failure
#[derive(Clone)]
pub struct SendMiddleware {
    transport: Transport,
}

impl SendMiddleware {
    /// Sends through `client`.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            transport: Transport::Client(client),
        }
    }

    /// Answers from `stubs` without any network access.
    #[must_use]
    pub fn stubbed(stubs: Stubs) -> Self {
        Self {
            transport: Transport::Stubbed(stubs),
        }
    }

    /// Returns true if this layer answers from stubs.
    #[must_use]
    pub fn is_stubbed(&self) -> bool {
        matches!(self.transport, Transport::Stubbed(_))
    }

    async fn transmit(&self, ctx: &OperationContext) -> Result<HttpResponse, PipelineError> {
        if ctx.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let client = match &self.transport {
            Transport::Stubbed(stubs) => return Ok(stubs.next(ctx.operation_name())?),
            Transport::Client(client) => client,
        };

        let send = async {
            let request = ctx.request();
            match ctx.timeout() {
                Some(timeout) => match tokio::time::timeout(timeout, client.send(request)).await {
                    Ok(result) => result.map_err(PipelineError::from),
                    Err(_) => Err(PipelineError::TimedOut(timeout)),
                },
                None => client.send(request).await.map_err(PipelineError::from),
            }
        };

        tokio::select! {
            biased;
            () = ctx.cancel_signal().cancelled() => Err(PipelineError::Cancelled),
            result = send => result,
        }
    }
}

impl std::fmt::Debug for SendMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendMiddleware")
            .field("stubbed", &self.is_stubbed())
            .finish()
    }
}

impl<I, O> Middleware<I, O> for SendMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        Stage::Send.name()
    }

    fn call<'a>(
        &'a self,
        input: &'a mut I,
        ctx: &'a mut OperationContext,
        _next: Next<'a, I, O>,
    ) -> BoxFuture<'a, Output<O>> {
        Box::pin(async move {
            for hook in [Hook::ModifyBeforeTransmit, Hook::ReadBeforeTransmit] {
                if let Err(err) = invoke_hook(ctx, hook, input) {
                    return Output::from_error(err);
                }
            }

            let mut output = Output::empty();
            let result = self.transmit(ctx).await;
            match result {
                Ok(response) => {
                    tracing::debug!(
                        parent: ctx.span(),
                        status = response.status().as_u16(),
                        attempt = ctx.retry().attempts,
                        "response received"
                    );
                    ctx.set_response(response);
                }
                Err(err) => {
                    tracing::debug!(parent: ctx.span(), error = %err, "send failed");
                    output.fail(err);
                }
            }

            if let Err(err) =
                ctx.invoke_interceptors(Hook::ReadAfterTransmit, input, Some(&mut output))
            {
                output.fail(err);
            }
            output
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::MiddlewareStack;
    use bytes::Bytes;
    use pylon_core::{CancelSignal, TransportError, TransportErrorKind};
    use pylon_test::MockHttpClient;
    use std::time::Duration;

    fn stack(send: SendMiddleware) -> MiddlewareStack<(), ()> {
        MiddlewareStack::builder().layer(send).build()
    }

    #[tokio::test]
    async fn test_response_is_stored() {
        let client = MockHttpClient::new();
        client.push_response(http::Response::builder().status(202).body(Bytes::new()).unwrap());
        let mut ctx = OperationContext::new("Op");

        let output = stack(SendMiddleware::new(Arc::new(client.clone())))
            .call(&mut (), &mut ctx)
            .await;

        assert!(output.error.is_none());
        assert_eq!(ctx.response().map(|r| r.status().as_u16()), Some(202));
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let client = MockHttpClient::new();
        client.push_error(TransportError::connect("refused"));
        let mut ctx = OperationContext::new("Op");

        let output = stack(SendMiddleware::new(Arc::new(client)))
            .call(&mut (), &mut ctx)
            .await;

        let err = output.error.unwrap();
        assert_eq!(
            err.as_transport_error().map(TransportError::kind),
            Some(TransportErrorKind::Connect)
        );
        assert!(ctx.response().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let client = MockHttpClient::new();
        let cancel = CancelSignal::new();
        cancel.cancel();
        let mut ctx = OperationContext::new("Op").with_cancel_signal(cancel);

        let output = stack(SendMiddleware::new(Arc::new(client.clone())))
            .call(&mut (), &mut ctx)
            .await;

        assert!(matches!(output.error, Some(PipelineError::Cancelled)));
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let client = MockHttpClient::new().with_latency(Duration::from_secs(30));
        let mut ctx = OperationContext::new("Op").with_timeout(Some(Duration::from_secs(1)));

        let output = stack(SendMiddleware::new(Arc::new(client)))
            .call(&mut (), &mut ctx)
            .await;

        assert!(matches!(
            output.error,
            Some(PipelineError::TimedOut(t)) if t == Duration::from_secs(1)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_send() {
        let client = MockHttpClient::new().with_latency(Duration::from_secs(30));
        let cancel = CancelSignal::new();
        let mut ctx = OperationContext::new("Op").with_cancel_signal(cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });
        let output = stack(SendMiddleware::new(Arc::new(client)))
            .call(&mut (), &mut ctx)
            .await;
        trigger.await.unwrap();

        assert!(matches!(output.error, Some(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_stubbed_never_touches_client() {
        let stubs = Stubs::new();
        stubs.add_response(
            "Op",
            http::Response::builder().status(418).body(Bytes::new()).unwrap(),
        );
        let send = SendMiddleware::stubbed(stubs);
        assert!(send.is_stubbed());
        let mut ctx = OperationContext::new("Op");

        let output = stack(send).call(&mut (), &mut ctx).await;

        assert!(output.error.is_none());
        assert_eq!(ctx.response().map(|r| r.status().as_u16()), Some(418));
    }
}
