use lazy_static::lazy_static;
use prometheus::{opts, IntCounter, Registry};

lazy_static! {
    /// Total successful attack transactions.
    pub static ref ATTACKS_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("attacks_total", "Total successful attack transactions")).unwrap();

    /// Total damage applied across all attacks.
    pub static ref DAMAGE_DEALT_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("damage_dealt_total", "Total damage applied to bosses")).unwrap();

    /// Attacks rejected because the caller's daily budget was exhausted.
    pub static ref DAILY_CAP_REJECTIONS_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("daily_cap_rejections_total", "Attacks rejected by the daily cap")).unwrap();

    /// Attacks that exhausted their conflict retries.
    pub static ref ATTACK_CONTENTION_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("attack_contention_total", "Attacks failed after retry exhaustion")).unwrap();

    /// Bosses driven to 0 HP.
    pub static ref BOSSES_DEFEATED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("bosses_defeated_total", "Total bosses defeated")).unwrap();

    /// Successor bosses actually created (no-op re-dispatches excluded).
    pub static ref BOSSES_SPAWNED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("bosses_spawned_total", "Total successor bosses spawned")).unwrap();

    /// Defeat notifications that failed for a single recipient.
    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("notifications_failed_total", "Failed defeat notifications")).unwrap();
}

pub fn register_custom_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(ATTACKS_TOTAL.clone()))?;
    registry.register(Box::new(DAMAGE_DEALT_TOTAL.clone()))?;
    registry.register(Box::new(DAILY_CAP_REJECTIONS_TOTAL.clone()))?;
    registry.register(Box::new(ATTACK_CONTENTION_TOTAL.clone()))?;
    registry.register(Box::new(BOSSES_DEFEATED_TOTAL.clone()))?;
    registry.register(Box::new(BOSSES_SPAWNED_TOTAL.clone()))?;
    registry.register(Box::new(NOTIFICATIONS_FAILED_TOTAL.clone()))?;
    Ok(())
}
