//! Retry logic for model calls
//!
//! Exponential backoff with jitter for rate limits (429) and transient server
//! errors (500, 502, 503, 504). Applied beneath the model-call wrappers, so
//! a retried request still counts as a single wrapped call.

mod backoff;

pub use backoff::{is_retryable_status, with_retry, IsRetryable, RetryConfig};
