//! Generation cutover.

use futures_util::future::join_all;
use offgrid_core::StoreHandle;
use serde::{Deserialize, Serialize};

/// Outcome of deleting superseded generations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    /// Tags whose deletion failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Delete every generation except the one `store` is bound to.
///
/// Deletions run concurrently. Failures, including failing to list the
/// generations at all, are logged and reported but never returned as errors.
/// Deleted generations cannot be recovered.
pub async fn retire_stale_generations(store: &StoreHandle) -> CleanupReport {
    let current = store.tag();
    let backend = store.backend();

    let tags = match backend.generations().await {
        Ok(tags) => tags,
        Err(e) => {
            tracing::warn!(error = %e, "could not list generations; skipping cleanup");
            return CleanupReport::default();
        }
    };

    let stale = tags.into_iter().filter(|tag| tag != current);
    let outcomes = join_all(stale.map(|tag| async move {
        let outcome = backend.delete_generation(&tag).await;
        (tag, outcome)
    }))
    .await;

    let mut report = CleanupReport::default();
    for (tag, outcome) in outcomes {
        match outcome {
            Ok(_) => {
                tracing::info!(generation = %tag, "deleted superseded generation");
                report.deleted.push(tag);
            }
            Err(e) => {
                tracing::warn!(generation = %tag, error = %e, "failed to delete superseded generation");
                report.failed.push((tag, e.to_string()));
            }
        }
    }

    report
}
