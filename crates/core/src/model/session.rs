use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use crate::model::{Identity, LevelId, Stage};

/// Display data fetched once at sign-in. Never consulted by predicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub display_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub followers: u64,
    pub public_repos: u64,
    pub avatar_url: Option<String>,
}

/// Bookkeeping for a level that was advanced past before it was confirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheck {
    #[serde(default = "never_checked")]
    pub last_checked: DateTime<Utc>,
}

fn never_checked() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Pending entries keyed by level, kept in insertion order.
///
/// Serialized as a JSON object so the stored record reads as a mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingChecks(Vec<(LevelId, PendingCheck)>);

impl PendingChecks {
    #[must_use]
    pub fn contains(&self, level: LevelId) -> bool {
        self.get(level).is_some()
    }

    #[must_use]
    pub fn get(&self, level: LevelId) -> Option<&PendingCheck> {
        self.0.iter().find(|(id, _)| *id == level).map(|(_, c)| c)
    }

    /// Insert or refresh an entry. A refreshed entry keeps its position.
    pub fn upsert(&mut self, level: LevelId, check: PendingCheck) {
        match self.0.iter_mut().find(|(id, _)| *id == level) {
            Some((_, existing)) => *existing = check,
            None => self.0.push((level, check)),
        }
    }

    pub fn remove(&mut self, level: LevelId) -> Option<PendingCheck> {
        let idx = self.0.iter().position(|(id, _)| *id == level)?;
        Some(self.0.remove(idx).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(LevelId) -> bool) {
        self.0.retain(|(id, _)| keep(*id));
    }

    #[must_use]
    pub fn levels(&self) -> Vec<LevelId> {
        self.0.iter().map(|(id, _)| *id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LevelId, &PendingCheck)> {
        self.0.iter().map(|(id, check)| (*id, check))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for PendingChecks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, check)| (id, check)))
    }
}

impl<'de> Deserialize<'de> for PendingChecks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PendingVisitor;

        impl<'de> Visitor<'de> for PendingVisitor {
            type Value = PendingChecks;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of level id to pending check")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut checks = PendingChecks::default();
                while let Some((level, check)) = map.next_entry::<LevelId, PendingCheck>()? {
                    checks.upsert(level, check);
                }
                Ok(checks)
            }
        }

        deserializer.deserialize_map(PendingVisitor)
    }
}

/// Remote identifiers discovered by one predicate and reused by later ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturedReferences {
    pub pull_request: Option<u64>,
}

impl CapturedReferences {
    /// Fold newly discovered references in. Returns true if anything changed.
    pub fn absorb(&mut self, discovered: CapturedReferences) -> bool {
        match discovered.pull_request {
            Some(number) if self.pull_request != Some(number) => {
                self.pull_request = Some(number);
                true
            }
            _ => false,
        }
    }
}

/// Problems fixed while rehydrating a stored session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRepair {
    StageOutOfRange,
    UnknownLevelDropped(LevelId),
    ConfirmedPendingCleared(LevelId),
}

/// The player's progress through the tutorial.
///
/// Every field defaults, so records written by older builds rehydrate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    identity: Option<Identity>,
    profile: Option<Profile>,
    #[serde(rename = "current_level")]
    current: Stage,
    #[serde(rename = "completed_levels")]
    completed: BTreeSet<LevelId>,
    #[serde(rename = "pending_checks")]
    pending: PendingChecks,
    #[serde(rename = "skipped_stages")]
    skipped: BTreeSet<LevelId>,
    #[serde(rename = "captured_references")]
    references: CapturedReferences,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn current(&self) -> Stage {
        self.current
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<LevelId> {
        &self.completed
    }

    #[must_use]
    pub fn pending(&self) -> &PendingChecks {
        &self.pending
    }

    #[must_use]
    pub fn skipped(&self) -> &BTreeSet<LevelId> {
        &self.skipped
    }

    #[must_use]
    pub fn references(&self) -> CapturedReferences {
        self.references
    }

    #[must_use]
    pub fn is_completed(&self, level: LevelId) -> bool {
        self.completed.contains(&level)
    }

    #[must_use]
    pub fn is_pending(&self, level: LevelId) -> bool {
        self.pending.contains(level)
    }

    /// Record a verified sign-in: level 0 is done and level 1 is presented.
    ///
    /// References captured for another account are dropped.
    pub fn sign_in(&mut self, identity: Identity, profile: Option<Profile>) {
        if self.identity.as_ref() != Some(&identity) {
            self.references = CapturedReferences::default();
        }
        self.identity = Some(identity);
        self.profile = profile;
        self.mark_completed(LevelId::SIGN_IN);
        self.current = Stage::level(1);
    }

    /// Confirm a level. Clears its pending entry.
    pub fn mark_completed(&mut self, level: LevelId) {
        self.completed.insert(level);
        self.pending.remove(level);
    }

    /// Create or refresh the pending entry for `level`.
    pub fn mark_pending(&mut self, level: LevelId, at: DateTime<Utc>) {
        self.pending.upsert(level, PendingCheck { last_checked: at });
    }

    /// Move forward to `stage` unless already past it.
    pub fn advance_to(&mut self, stage: Stage) {
        self.current = self.current.max(stage);
    }

    /// Return to `level` if the player is beyond it. Returns true if moved.
    pub fn pull_back_to(&mut self, level: LevelId) -> bool {
        let stage = Stage::Level(level);
        if self.current > stage {
            self.current = stage;
            true
        } else {
            false
        }
    }

    /// Present `stage` directly (navigation and redirects).
    pub fn present(&mut self, stage: Stage) {
        self.current = stage;
    }

    /// Record a bypassed optional level. It is never marked completed.
    pub fn record_skip(&mut self, level: LevelId, next: Stage) {
        self.skipped.insert(level);
        self.pending.remove(level);
        self.current = next;
    }

    /// Merge references discovered by a predicate. Returns true if changed.
    pub fn capture(&mut self, discovered: CapturedReferences) -> bool {
        self.references.absorb(discovered)
    }

    /// Lowest level not completed, or the final victory if none remain.
    /// Skipped levels are not completed, so a redirect can land on one.
    #[must_use]
    pub fn first_incomplete(&self) -> Stage {
        LevelId::all()
            .find(|id| !self.completed.contains(id))
            .map_or(Stage::FinalVictory, Stage::Level)
    }

    /// Fix inconsistencies in a rehydrated record.
    pub fn repair(&mut self) -> Vec<SessionRepair> {
        let mut repairs = Vec::new();

        if !self.current.is_valid() {
            self.current = Stage::FIRST;
            repairs.push(SessionRepair::StageOutOfRange);
        }

        for id in self.completed.iter().chain(self.skipped.iter()) {
            if !id.is_known() {
                repairs.push(SessionRepair::UnknownLevelDropped(*id));
            }
        }
        self.completed.retain(LevelId::is_known);
        self.skipped.retain(LevelId::is_known);

        let completed = &self.completed;
        for id in self.pending.levels() {
            if !id.is_known() {
                repairs.push(SessionRepair::UnknownLevelDropped(id));
            } else if completed.contains(&id) {
                repairs.push(SessionRepair::ConfirmedPendingCleared(id));
            }
        }
        self.pending
            .retain(|id| id.is_known() && !completed.contains(&id));

        repairs
    }
}
