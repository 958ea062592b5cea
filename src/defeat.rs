use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::RaidResult;
use crate::ledger;
use crate::metrics;
use crate::registry;
use crate::RaidDeps;

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery collaborator for contributor notifications. Fire-and-forget per
/// recipient; the dispatcher never lets one recipient's failure touch the
/// others.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        category: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Default notifier: logs the delivery and succeeds. Stands in until a real
/// transport collaborator is wired.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        category: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(user_id = %user_id, category, %payload, "notification");
        Ok(())
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct DefeatReport {
    pub boss_id: Uuid,
    pub notified: usize,
    pub failed: Vec<Uuid>,
    pub successor_id: Uuid,
    pub spawned: bool,
}

/// Run the defeat cascade for a boss whose HP already reached 0.
///
/// Two phases, both safe to re-run:
/// 1. Notify every contributor, fanned out with bounded concurrency.
///    Individual failures are logged and collected, never aborting siblings;
///    the committed HP/ledger state is final regardless.
/// 2. Spawn the successor boss, guarded by the persisted `successor_id` flag
///    so that any retry (including a crash between the phases) spawns at
///    most one.
pub async fn on_defeat(deps: &RaidDeps, boss_id: Uuid) -> RaidResult<DefeatReport> {
    let boss = registry::boss_by_id(deps, boss_id).await?;
    let contributors = ledger::contributions_for(deps.store.as_ref(), boss_id).await?;

    let payload = json!({
        "boss_id": boss.id,
        "boss_name": boss.name,
        "level": boss.level,
    });

    let results: Vec<(Uuid, Result<(), NotifyError>)> = stream::iter(contributors.into_iter())
        .map(|contribution| {
            let notifier: Arc<dyn Notifier> = deps.notifier.clone();
            let payload = payload.clone();
            async move {
                let outcome = notifier
                    .notify(contribution.user_id, "boss_defeated", payload)
                    .await;
                (contribution.user_id, outcome)
            }
        })
        .buffer_unordered(deps.raid.notify_concurrency.max(1))
        .collect()
        .await;

    let mut notified = 0;
    let mut failed = Vec::new();
    for (user_id, result) in results {
        match result {
            Ok(()) => notified += 1,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "defeat notification failed, skipping recipient");
                metrics::NOTIFICATIONS_FAILED_TOTAL.inc();
                failed.push(user_id);
            }
        }
    }

    let (successor_id, spawned) = registry::spawn_successor(deps, boss_id).await?;
    if spawned {
        metrics::BOSSES_SPAWNED_TOTAL.inc();
    }

    info!(
        boss_id = %boss_id,
        notified,
        failed = failed.len(),
        successor = %successor_id,
        spawned,
        "defeat cascade complete"
    );

    Ok(DefeatReport {
        boss_id,
        notified,
        failed,
        successor_id,
        spawned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack;
    use crate::model::BossStatus;
    use crate::test_support::{test_deps, test_deps_with_notifier};
    use parking_lot::Mutex;

    /// Records deliveries; fails for the users listed in `fail_for`.
    struct RecordingNotifier {
        delivered: Mutex<Vec<Uuid>>,
        fail_for: Vec<Uuid>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(
            &self,
            user_id: Uuid,
            _category: &str,
            _payload: serde_json::Value,
        ) -> Result<(), NotifyError> {
            if self.fail_for.contains(&user_id) {
                return Err(NotifyError("unreachable recipient".into()));
            }
            self.delivered.lock().push(user_id);
            Ok(())
        }
    }

    async fn defeat_boss(deps: &RaidDeps, users: &[Uuid]) -> Uuid {
        let mut boss_id = None;
        for user in users.iter().cycle() {
            let outcome = attack::attack(deps, *user, 10).await.unwrap();
            boss_id = Some(outcome.boss_id);
            if outcome.boss_defeated {
                break;
            }
        }
        boss_id.unwrap()
    }

    #[tokio::test]
    async fn every_contributor_is_notified() {
        let notifier = Arc::new(RecordingNotifier {
            delivered: Mutex::new(Vec::new()),
            fail_for: Vec::new(),
        });
        let deps = test_deps_with_notifier(3000, 30, notifier.clone());

        let users = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let boss_id = defeat_boss(&deps, &users).await;

        let report = on_defeat(&deps, boss_id).await.unwrap();
        assert_eq!(report.notified, 3);
        assert!(report.failed.is_empty());

        let mut delivered = notifier.delivered.lock().clone();
        delivered.sort();
        let mut expected = users.to_vec();
        expected.sort();
        assert_eq!(delivered, expected);
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_block_the_rest() {
        let users = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let notifier = Arc::new(RecordingNotifier {
            delivered: Mutex::new(Vec::new()),
            fail_for: vec![users[1]],
        });
        let deps = test_deps_with_notifier(3000, 30, notifier.clone());

        let boss_id = defeat_boss(&deps, &users).await;
        let report = on_defeat(&deps, boss_id).await.unwrap();

        assert_eq!(report.notified, 2);
        assert_eq!(report.failed, vec![users[1]]);
        assert!(report.spawned);
        assert_eq!(notifier.delivered.lock().len(), 2);
    }

    #[tokio::test]
    async fn repeated_dispatch_spawns_exactly_one_successor() {
        let deps = test_deps(3000, 20);
        let user = Uuid::new_v4();
        let boss_id = defeat_boss(&deps, &[user]).await;

        let first = on_defeat(&deps, boss_id).await.unwrap();
        assert!(first.spawned);

        let second = on_defeat(&deps, boss_id).await.unwrap();
        assert!(!second.spawned);
        assert_eq!(second.successor_id, first.successor_id);

        let successor = registry::boss_by_id(&deps, first.successor_id).await.unwrap();
        assert_eq!(successor.level, 2);
        assert_eq!(successor.status, BossStatus::Active);

        let current = registry::current_boss(&deps).await.unwrap();
        assert_eq!(current.id, first.successor_id);
    }
}
