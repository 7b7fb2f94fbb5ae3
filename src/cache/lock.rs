use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Acquire a cache mutex, recovering the guard if a previous holder panicked.
///
/// Cache contents are always safe to reuse: at worst an entry is stale, and
/// the TTL check handles staleness anyway.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        }
    }
}
