use anyhow::Result;
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Retries a provider-side check (via the provider API, not public DNS)
/// until it returns `Ok(true)` or `timeout` elapses.
///
/// The closure should return:
/// - `Ok(true)` if verification succeeded
/// - `Ok(false)` if verification should be retried
/// - `Err(_)` if verification should fail immediately (no retry)
pub fn retry_provider_verification<F>(
    record_name: &str,
    operation: &str,
    timeout: Duration,
    interval: Duration,
    mut verify_fn: F,
) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!(
            "[provider-retry] {} verification attempt {} for {}",
            operation, attempt, record_name
        );

        match verify_fn() {
            Ok(true) => {
                debug!(
                    "[provider-retry] {} verified after {}ms (attempt {})",
                    operation,
                    started.elapsed().as_millis(),
                    attempt
                );
                return Ok(());
            }
            Ok(false) => {
                if started.elapsed() >= timeout {
                    warn!(
                        "[provider-retry] {} verification timeout after {}ms (attempt {})",
                        operation,
                        started.elapsed().as_millis(),
                        attempt
                    );
                    return Err(anyhow::anyhow!(
                        "{} verification failed for {}: timeout after {}ms",
                        operation,
                        record_name,
                        started.elapsed().as_millis()
                    ));
                }
                std::thread::sleep(interval);
            }
            Err(e) => {
                warn!(
                    "[provider-retry] {} verification failed immediately: {}",
                    operation, e
                );
                return Err(e);
            }
        }
    }
}
