use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{RaidError, RaidResult};
use crate::metrics;
use crate::model::{boss_key, contribution_key, day_key, BossStatus, Contribution};
use crate::registry;
use crate::store::{run_transaction, Transaction};
use crate::RaidDeps;

#[derive(Serialize, Clone, Copy, Debug)]
pub struct AttackOutcome {
    pub dealt: u64,
    pub boss_defeated: bool,
    pub boss_id: Uuid,
}

/// Apply `requested` damage on behalf of `user_id`.
///
/// The whole read-compute-write cycle runs as one atomic unit over the
/// current-boss pointer, the boss document and the caller's contribution
/// record: the dealt amount is bounded by the remaining daily budget and the
/// remaining HP, the ledger and the HP move together, and the Defeated flip
/// happens in the same commit that brings HP to exactly 0. Conflicting
/// concurrent attacks are retried transparently by the transaction runner.
///
/// The defeat cascade is deliberately not part of this transaction; callers
/// observing `boss_defeated == true` hand the boss id to the defeat
/// dispatcher. Serialization of HP writes guarantees at most one attack per
/// boss instance ever observes that transition.
pub async fn attack(deps: &RaidDeps, user_id: Uuid, requested: u64) -> RaidResult<AttackOutcome> {
    let settings = deps.raid.clone();

    let outcome = run_transaction(deps.store.clone(), &deps.retry, move |txn: &mut Transaction| {
        let settings = settings.clone();
        Box::pin(async move {
            let now = Utc::now();
            let mut boss = registry::current_boss_txn(txn, &settings).await?;

            if boss.status != BossStatus::Active {
                return Err(RaidError::BossAlreadyDefeated);
            }

            let ledger_key = contribution_key(boss.id, user_id);
            let mut contribution = txn
                .get::<Contribution>(&ledger_key)
                .await?
                .unwrap_or_else(|| Contribution::fresh(user_id, boss.id));

            let today = day_key(now);
            let remaining_budget = settings
                .daily_damage_cap
                .saturating_sub(contribution.damage_on(&today));
            if remaining_budget == 0 {
                return Err(RaidError::DailyCapReached);
            }

            // Third bound keeps HP from going negative when the request
            // arrives with the boss nearly down.
            let dealt = requested.min(remaining_budget).min(boss.hp);

            boss.hp -= dealt;
            let defeated = boss.hp == 0;
            if defeated {
                boss.status = BossStatus::Defeated;
                boss.defeated_at = Some(now);
            }
            contribution.record(&today, dealt, now);

            txn.set(&boss_key(boss.id), &boss)?;
            txn.set(&ledger_key, &contribution)?;

            Ok(AttackOutcome {
                dealt,
                boss_defeated: defeated,
                boss_id: boss.id,
            })
        })
    })
    .await;

    match &outcome {
        Ok(o) => {
            metrics::ATTACKS_TOTAL.inc();
            metrics::DAMAGE_DEALT_TOTAL.inc_by(o.dealt);
            if o.boss_defeated {
                metrics::BOSSES_DEFEATED_TOTAL.inc();
            }
            info!(
                user_id = %user_id,
                requested,
                dealt = o.dealt,
                boss_id = %o.boss_id,
                boss_defeated = o.boss_defeated,
                "attack applied"
            );
        }
        Err(RaidError::DailyCapReached) => metrics::DAILY_CAP_REJECTIONS_TOTAL.inc(),
        Err(RaidError::Contention) => metrics::ATTACK_CONTENTION_TOTAL.inc(),
        Err(_) => {}
    }

    outcome
}
