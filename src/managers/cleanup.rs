use std::future::Future;
use tracing::{debug, warn};

use crate::error::Result;

/// Run a teardown step, logging and swallowing any failure
///
/// Used for every resource removal in the ticket lifecycle. Resources that
/// are already gone only log at debug level; anything else is a warning.
pub async fn best_effort<F>(step: &str, fut: F) -> bool
where
    F: Future<Output = Result<()>>,
{
    match fut.await {
        Ok(()) => true,
        Err(e) if e.is_missing() => {
            debug!("Cleanup '{}' skipped, already gone: {}", step, e);
            false
        }
        Err(e) => {
            warn!("Cleanup '{}' failed: {}", step, e);
            false
        }
    }
}
