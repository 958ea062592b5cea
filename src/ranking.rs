use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RaidResult;
use crate::ledger;
use crate::model::Contribution;
use crate::registry;
use crate::RaidDeps;

#[derive(Clone, Debug)]
pub struct UserProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Display-enrichment collaborator. Best-effort only: `None` (or a provider
/// that always answers `None`) must never fail the ranking query.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> Option<UserProfile>;
}

/// Provider used when no profile collaborator is wired.
pub struct NoProfiles;

#[async_trait]
impl ProfileProvider for NoProfiles {
    async fn profile(&self, _user_id: Uuid) -> Option<UserProfile> {
        None
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct RankingEntry {
    pub user_id: Uuid,
    pub total_damage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

fn ranking_order(a: &Contribution, b: &Contribution) -> std::cmp::Ordering {
    b.total_damage
        .cmp(&a.total_damage)
        // Ties go to whoever reached the total first.
        .then_with(|| a.last_attack_at.cmp(&b.last_attack_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Damage leaderboard for the live boss, descending by total damage.
///
/// Read-only and non-transactional: a ranking served mid-attack may lag the
/// ledger by a moment, which is acceptable here.
pub async fn ranking(deps: &RaidDeps, limit: usize) -> RaidResult<Vec<RankingEntry>> {
    let boss = registry::current_boss(deps).await?;
    let mut rows = ledger::contributions_for(deps.store.as_ref(), boss.id).await?;

    rows.sort_by(ranking_order);
    rows.truncate(limit);

    // buffered (not buffer_unordered) keeps the sorted order intact.
    let entries = stream::iter(rows.into_iter())
        .map(|row| {
            let profiles = deps.profiles.clone();
            async move {
                let profile = profiles.profile(row.user_id).await;
                RankingEntry {
                    user_id: row.user_id,
                    total_damage: row.total_damage,
                    display_name: profile.as_ref().map(|p| p.display_name.clone()),
                    avatar_url: profile.and_then(|p| p.avatar_url),
                }
            }
        })
        .buffered(deps.raid.notify_concurrency.max(1))
        .collect()
        .await;

    Ok(entries)
}
