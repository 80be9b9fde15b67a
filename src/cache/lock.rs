use std::sync::{LockResult, Mutex, MutexGuard};

use tracing::warn;

/// Take the guard out of a lock result, recovering from poisoning.
fn recover<G>(result: LockResult<G>, target: &'static str, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            result = "poisoned_recovered",
            "Recovered from poisoned cache lock"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    recover(mutex.lock(), target, op)
}
