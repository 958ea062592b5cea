use tracing::warn;
use uuid::Uuid;

use crate::error::RaidResult;
use crate::model::{contribution_key, contribution_prefix, Contribution};
use crate::registry;
use crate::store::DocumentStore;
use crate::RaidDeps;

/// A user's ledger record for the live boss, zero-valued if they have not
/// attacked yet. Pure read; the record is persisted lazily on first attack.
pub async fn contribution(deps: &RaidDeps, user_id: Uuid) -> RaidResult<Contribution> {
    let boss = registry::current_boss(deps).await?;
    match deps.store.get(&contribution_key(boss.id, user_id)).await? {
        Some(doc) => Ok(serde_json::from_value(doc.data)?),
        None => Ok(Contribution::fresh(user_id, boss.id)),
    }
}

/// Every contribution record logged against `boss_id`.
///
/// Non-transactional: serves the ranking query and the defeat fan-out, both
/// tolerant of a slightly stale view. A record that fails to decode is
/// logged and skipped rather than poisoning the whole enumeration.
pub async fn contributions_for(
    store: &dyn DocumentStore,
    boss_id: Uuid,
) -> RaidResult<Vec<Contribution>> {
    let entries = store.scan(&contribution_prefix(boss_id)).await?;

    let mut contributions = Vec::with_capacity(entries.len());
    for (key, doc) in entries {
        match serde_json::from_value::<Contribution>(doc.data) {
            Ok(c) => contributions.push(c),
            Err(e) => warn!(%key, error = %e, "skipping undecodable contribution record"),
        }
    }
    Ok(contributions)
}
