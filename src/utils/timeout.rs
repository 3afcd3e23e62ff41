use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::error;

use crate::errors::{AlertError, Result};

/// Execute a future with a bounded timeout. The caller supplies the error
/// constructor so the timeout is reported in the failing operation's own
/// error class.
pub async fn with_timeout<F, T, E>(
    future: F,
    duration: Duration,
    operation_name: &str,
    on_timeout: E,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce(String) -> AlertError,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            error!("Operation '{}' timed out after {:?}", operation_name, duration);
            Err(on_timeout(format!(
                "Operation '{}' timed out after {} seconds",
                operation_name,
                duration.as_secs()
            )))
        }
    }
}
