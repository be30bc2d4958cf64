//! Two-phase optimistic updates.
//!
//! Apply a change to local state immediately, attempt the remote write, and
//! restore the pre-update snapshot if the write fails or is refused.

use std::future::Future;

use tracing::warn;

use pharmsim_contracts::error::SimResult;

/// Apply `change` to `state`, then await `commit`.
///
/// Returns `Ok(true)` when the remote write succeeded. When it returns
/// `Ok(false)` the state is reverted and `Ok(false)` is returned; when it
/// errors the state is reverted and the error is propagated.
pub async fn optimistic_update<S, F, Fut>(state: &mut S, change: F, commit: Fut) -> SimResult<bool>
where
    S: Clone,
    F: FnOnce(&mut S),
    Fut: Future<Output = SimResult<bool>>,
{
    let snapshot = state.clone();
    change(state);

    match commit.await {
        Ok(true) => Ok(true),
        Ok(false) => {
            warn!("remote write refused, reverting local change");
            *state = snapshot;
            Ok(false)
        }
        Err(e) => {
            warn!(error = %e, "remote write failed, reverting local change");
            *state = snapshot;
            Err(e)
        }
    }
}
