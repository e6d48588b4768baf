//! TextGenerator trait definition.
//!
//! The remote generation service is a consumed interface, not owned:
//! failure (including a deadline expiry) is a normal outcome for callers to
//! handle, never a crash condition.

use parlance_types::chat::GenerationParams;
use parlance_types::error::GenerateError;

use std::time::Duration;

/// Client interface to the remote text-generation service.
///
/// The deadline is an explicit parameter rather than ambient state; it
/// bounds only this call and nothing the caller has already committed.
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation for `prompt` under `deadline`.
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
        deadline: Duration,
    ) -> impl std::future::Future<Output = Result<String, GenerateError>> + Send;
}
