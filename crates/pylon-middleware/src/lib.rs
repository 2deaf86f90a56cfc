//! # Pylon Middleware
//!
//! Ordered middleware stack and the standard pipeline layers for Pylon
//! clients.
//!
//! Every operation call runs through one [`MiddlewareStack`]. Each layer
//! receives the typed input, the per-call [`OperationContext`] and a [`Next`]
//! handle, and returns the [`Output`] of the traversal.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Initialize → Validate → Build → Auth → Retry ┬→ Sign → Parse → Send
//!                                              └── once per attempt ──┘
//! ```
//!
//! | Stage | Middleware | Purpose                                        |
//! |-------|------------|------------------------------------------------|
//! | 1     | Initialize | Execution hooks, operation metrics             |
//! | 2     | Validate   | Optional input validation                      |
//! | 3     | Build      | Typed input to transport request               |
//! | 4     | Auth       | First viable auth option                       |
//! | 5     | Retry      | Attempt loop with back-off and token quota     |
//! | 6     | Sign       | Applies the resolved signer                    |
//! | 7     | Parse      | Modeled error or typed output                  |
//! | 8     | Send       | Transport dispatch, cancellation and timeout   |
//!
//! ## Example
//!
//! ```
//! use pylon_middleware::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 8);
//! assert_eq!(stages[0].name(), "initialize");
//! assert_eq!(stages[7].name(), "send");
//! ```
//!
//! [`OperationContext`]: pylon_core::OperationContext
//! [`Output`]: pylon_core::Output

#![doc(html_root_url = "https://docs.rs/pylon-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod retry;
pub mod stack;
pub mod stages;
mod stubs;

pub use middleware::{FnMiddleware, Middleware, Next};
pub use retry::{
    AttemptResult, Backoff, ExponentialBackoff, FixedBackoff, QuotaConfig, RetryConfig,
    RetryDecision, RetryPolicy, RetryQuota, StandardRetryPolicy,
};
pub use stack::{BoxedMiddleware, MiddlewareStack, StackBuilder, StackError, Stage};
pub use stages::{
    AuthMiddleware, BuildMiddleware, InitializeMiddleware, ParseMiddleware, RetryMiddleware,
    SendMiddleware, SignMiddleware, ValidateMiddleware,
};
pub use stubs::Stubs;
