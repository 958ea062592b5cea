use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::env::RaidSettings;

/// Well-known key of the versioned pointer to the live boss document.
///
/// The pointer is a separate lightweight record so historical boss documents
/// stay in place under their own `boss:{id}` keys and are never reused.
pub const CURRENT_BOSS_KEY: &str = "boss:current";

pub fn boss_key(id: Uuid) -> String {
    format!("boss:{}", id)
}

pub fn contribution_key(boss_id: Uuid, user_id: Uuid) -> String {
    format!("contribution:{}:{}", boss_id, user_id)
}

pub fn contribution_prefix(boss_id: Uuid) -> String {
    format!("contribution:{}:", boss_id)
}

/// Calendar-day bucket used for the daily damage cap. UTC, `YYYY-MM-DD`.
pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

const BOSS_NAMES: &[&str] = &[
    "Gorehorn",
    "Ashmaw",
    "Frostfang",
    "Stormcaller",
    "Ironhide",
    "Nightshade",
    "Emberlord",
    "Voidreaver",
];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BossStatus {
    Active,
    Defeated,
}

/// The single shared mutable target. Mutated only inside attack transactions
/// (hp decrement, status flip) and the spawn transaction (`successor_id`).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Boss {
    pub id: Uuid,
    pub name: String,
    pub hp: u64,
    pub max_hp: u64,
    pub status: BossStatus,
    pub level: u32,
    pub created_at: DateTime<Utc>,
    pub defeated_at: Option<DateTime<Utc>>,
    /// Persisted idempotency flag: set exactly once when the successor is
    /// spawned, making repeated defeat dispatch a no-op.
    pub successor_id: Option<Uuid>,
}

impl Boss {
    /// Build a fresh Active boss at `level`, sized by the configured formula.
    pub fn spawn(level: u32, settings: &RaidSettings) -> Self {
        let max_hp = settings.base_boss_hp + u64::from(level.saturating_sub(1)) * settings.hp_increment;
        let name = BOSS_NAMES[(level.saturating_sub(1) as usize) % BOSS_NAMES.len()].to_string();
        Self {
            id: Uuid::new_v4(),
            name,
            hp: max_hp,
            max_hp,
            status: BossStatus::Active,
            level,
            created_at: Utc::now(),
            defeated_at: None,
            successor_id: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct BossPointer {
    pub boss_id: Uuid,
}

/// Per-user damage ledger for one boss instance. Written only by its owner's
/// attacks, shared-read by the ranking query.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Contribution {
    pub user_id: Uuid,
    pub boss_id: Uuid,
    pub total_damage: u64,
    /// Damage per UTC day key; every entry stays within the daily cap.
    pub daily_damage: BTreeMap<String, u64>,
    pub last_attack_at: Option<DateTime<Utc>>,
}

impl Contribution {
    pub fn fresh(user_id: Uuid, boss_id: Uuid) -> Self {
        Self {
            user_id,
            boss_id,
            total_damage: 0,
            daily_damage: BTreeMap::new(),
            last_attack_at: None,
        }
    }

    /// Damage already logged on `day` (missing entry counts as 0).
    pub fn damage_on(&self, day: &str) -> u64 {
        self.daily_damage.get(day).copied().unwrap_or(0)
    }

    pub fn record(&mut self, day: &str, dealt: u64, at: DateTime<Utc>) {
        *self.daily_damage.entry(day.to_string()).or_insert(0) += dealt;
        self.total_damage += dealt;
        self.last_attack_at = Some(at);
    }
}
