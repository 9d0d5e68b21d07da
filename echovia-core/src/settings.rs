use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Boss, Character, Roster};

pub const DEFAULT_CHARACTER_COUNT: usize = 4;
pub const DEFAULT_BOSS_COUNT: usize = 8;
pub const DEFAULT_MAX_FIVE_STARS: usize = 2;

/// User-controlled configuration, persisted as one JSON document.
///
/// Every level is `#[serde(default)]`, so a persisted document that lacks a
/// field (older saves, hand-edited files) picks up the default for that
/// field only and keeps everything else it does carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub characters: CharacterSettings,
    pub bosses: BossSettings,
    pub enable_exclusion: bool,
    pub rules: Rules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSettings {
    pub count: usize,
    pub enabled: BTreeMap<String, bool>,
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossSettings {
    pub count: usize,
    pub enabled: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rules {
    pub coop_mode: bool,
    pub limit_five_stars: bool,
    pub max_five_stars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            characters: CharacterSettings::default(),
            bosses: BossSettings::default(),
            enable_exclusion: true,
            rules: Rules::default(),
        }
    }
}

impl Default for CharacterSettings {
    fn default() -> Self {
        Self {
            count: DEFAULT_CHARACTER_COUNT,
            enabled: BTreeMap::new(),
            excluded: Vec::new(),
        }
    }
}

impl Default for BossSettings {
    fn default() -> Self {
        Self {
            count: DEFAULT_BOSS_COUNT,
            enabled: BTreeMap::new(),
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            coop_mode: false,
            limit_five_stars: false,
            max_five_stars: DEFAULT_MAX_FIVE_STARS,
        }
    }
}

impl Settings {
    pub fn is_character_enabled(&self, name: &str) -> bool {
        self.characters.enabled.get(name).copied().unwrap_or(false)
    }

    pub fn is_boss_enabled(&self, name: &str) -> bool {
        self.bosses.enabled.get(name).copied().unwrap_or(false)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.characters.excluded.iter().any(|n| n == name)
    }

    /// Whether `character` passes the enabled map and, when exclusion is
    /// active, the exclusion list.
    pub fn is_character_eligible(&self, character: &Character) -> bool {
        self.is_character_enabled(&character.name)
            && (!self.enable_exclusion || !self.is_excluded(&character.name))
    }

    /// Characters the count stepper may go up to.
    pub fn available_characters<'a>(&self, roster: &'a Roster) -> Vec<&'a Character> {
        roster
            .characters()
            .iter()
            .filter(|c| self.is_character_eligible(c))
            .collect()
    }

    /// Enabled bosses; co-op filtering is applied only at selection time.
    pub fn available_bosses<'a>(&self, roster: &'a Roster) -> Vec<&'a Boss> {
        roster
            .bosses()
            .iter()
            .filter(|b| self.is_boss_enabled(&b.name))
            .collect()
    }

    /// Catalog characters on the exclusion list, in catalog order.
    pub fn excluded_characters<'a>(&self, roster: &'a Roster) -> Vec<&'a Character> {
        roster
            .characters()
            .iter()
            .filter(|c| self.is_excluded(&c.name))
            .collect()
    }

    /// Fill in enabled-map entries for catalog names that have none yet and
    /// drop exclusion entries whose character left the catalog. Returns
    /// whether anything changed.
    pub fn sync_with_roster(&mut self, roster: &Roster) -> bool {
        let mut changed = false;

        for character in roster.characters() {
            if !self.characters.enabled.contains_key(&character.name) {
                self.characters.enabled.insert(character.name.clone(), true);
                changed = true;
            }
        }

        for boss in roster.bosses() {
            if !self.bosses.enabled.contains_key(&boss.name) {
                self.bosses.enabled.insert(boss.name.clone(), true);
                changed = true;
            }
        }

        let before = self.characters.excluded.len();
        self.characters
            .excluded
            .retain(|name| roster.character(name).is_some());
        changed |= self.characters.excluded.len() != before;

        changed
    }
}

/// Clamp a requested sample size to `[1, available]` (at least 1 even when
/// nothing is available).
pub fn clamp_count(requested: usize, available: usize) -> usize {
    requested.clamp(1, available.max(1))
}
