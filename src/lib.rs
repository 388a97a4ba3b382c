// dbretry: request lifecycle and retry orchestration for a database client
// Exposes the retry layer as a library; the binary is a thin inspection tool

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod reason;
pub mod request;
pub mod retry;
pub mod simulation;
pub mod timeouts;
pub mod validation;

pub use error::{ErrorKind, RequestError};
pub use orchestrator::{RequestBehaviour, RetryOrchestrator};
pub use reason::RetryReason;
pub use request::{Request, RequestBuilder, Service};
pub use retry::{BestEffortRetryStrategy, FailFastRetryStrategy, RetryAction, RetryStrategy};
pub use timeouts::{TimeoutOverrides, Timeouts};
