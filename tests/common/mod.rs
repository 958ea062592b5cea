use std::sync::Arc;

use raid_server::defeat::LoggingNotifier;
use raid_server::env::{RaidSettings, RetrySettings};
use raid_server::ranking::NoProfiles;
use raid_server::store::MemoryStore;
use raid_server::RaidDeps;

/// Deps over a fresh in-memory store. The retry ceiling is generous because
/// the concurrency tests hammer one boss document on purpose.
pub fn build_deps(daily_damage_cap: u64, base_boss_hp: u64) -> RaidDeps {
    RaidDeps {
        store: Arc::new(MemoryStore::new()),
        raid: RaidSettings {
            daily_damage_cap,
            base_boss_hp,
            hp_increment: 500,
            notify_concurrency: 8,
        },
        retry: RetrySettings {
            max_attempts: 50,
            initial_backoff_ms: 1,
            max_backoff_ms: 8,
        },
        notifier: Arc::new(LoggingNotifier),
        profiles: Arc::new(NoProfiles),
    }
}
