use tracing::{debug, info};
use uuid::Uuid;

use crate::env::RaidSettings;
use crate::error::{RaidError, RaidResult, StoreError};
use crate::model::{boss_key, Boss, BossPointer, BossStatus, CURRENT_BOSS_KEY};
use crate::store::{run_transaction, Transaction};
use crate::RaidDeps;

/// Resolve the live boss inside an open transaction, bootstrapping a level 1
/// boss when the pointer does not exist yet.
///
/// The bootstrap races safely: both racers observe the pointer absent, one
/// commit wins, the loser conflicts and re-reads the winner's boss.
pub(crate) async fn current_boss_txn(
    txn: &mut Transaction,
    settings: &RaidSettings,
) -> RaidResult<Boss> {
    if let Some(pointer) = txn.get::<BossPointer>(CURRENT_BOSS_KEY).await? {
        return match txn.get::<Boss>(&boss_key(pointer.boss_id)).await? {
            Some(boss) => Ok(boss),
            None => Err(RaidError::Store(StoreError::backend(format!(
                "current-boss pointer dangles at {}",
                pointer.boss_id
            )))),
        };
    }

    let boss = Boss::spawn(1, settings);
    debug!(boss_id = %boss.id, max_hp = boss.max_hp, "no live boss, bootstrapping level 1");
    txn.set(&boss_key(boss.id), &boss)?;
    txn.set(CURRENT_BOSS_KEY, &BossPointer { boss_id: boss.id })?;
    Ok(boss)
}

/// Snapshot of the live boss (created first if none exists yet).
pub async fn current_boss(deps: &RaidDeps) -> RaidResult<Boss> {
    let settings = deps.raid.clone();
    run_transaction(deps.store.clone(), &deps.retry, move |txn: &mut Transaction| {
        let settings = settings.clone();
        Box::pin(async move { current_boss_txn(txn, &settings).await })
    })
    .await
}

/// Fetch a boss document by id, current or historical.
pub async fn boss_by_id(deps: &RaidDeps, boss_id: Uuid) -> RaidResult<Boss> {
    match deps.store.get(&boss_key(boss_id)).await? {
        Some(doc) => Ok(serde_json::from_value(doc.data)?),
        None => Err(RaidError::BossNotFound(boss_id)),
    }
}

/// Spawn the successor of a defeated boss and repoint `boss:current` at it.
///
/// Idempotent: the defeated document's `successor_id` is the persisted guard,
/// written in the same commit as the successor and the pointer. A second run
/// (or a run racing this one) finds the flag set and returns the recorded
/// successor without spawning anything.
///
/// Returns the successor id and whether this call created it.
pub async fn spawn_successor(deps: &RaidDeps, boss_id: Uuid) -> RaidResult<(Uuid, bool)> {
    let settings = deps.raid.clone();
    let (successor_id, spawned) =
        run_transaction(deps.store.clone(), &deps.retry, move |txn: &mut Transaction| {
            let settings = settings.clone();
            Box::pin(async move {
                let mut defeated = txn
                    .get::<Boss>(&boss_key(boss_id))
                    .await?
                    .ok_or(RaidError::BossNotFound(boss_id))?;

                if defeated.status != BossStatus::Defeated {
                    return Err(RaidError::BossStillActive(boss_id));
                }
                if let Some(existing) = defeated.successor_id {
                    return Ok((existing, false));
                }

                let next = Boss::spawn(defeated.level + 1, &settings);
                defeated.successor_id = Some(next.id);
                txn.set(&boss_key(boss_id), &defeated)?;
                txn.set(&boss_key(next.id), &next)?;
                txn.set(CURRENT_BOSS_KEY, &BossPointer { boss_id: next.id })?;
                Ok((next.id, true))
            })
        })
        .await?;

    if spawned {
        info!(defeated = %boss_id, successor = %successor_id, "successor boss spawned");
    } else {
        debug!(defeated = %boss_id, successor = %successor_id, "successor already spawned, no-op");
    }
    Ok((successor_id, spawned))
}
