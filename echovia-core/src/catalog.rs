use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Every element variant of the player avatar is named `Traveler (<Element>)`.
const TRAVELER_PREFIX: &str = "Traveler (";

/// Legend-tier bosses are listed as `⭐ - <Name>`.
const LEGEND_MARKER: &str = "⭐ -";

pub const CHARACTERS_FILE: &str = "characters.json";
pub const BOSSES_FILE: &str = "bosses.json";

#[derive(Deserialize)]
struct CharacterRecord {
    name: String,
    rarity: u8,
    element: String,
    #[serde(default)]
    icon: String,
}

#[derive(Deserialize)]
struct BossRecord {
    name: String,
    #[serde(default)]
    icon: String,
    location: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    coop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CharacterRecord", rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    pub rarity: u8,
    pub element: String,
    pub icon: String,
    /// Set at load time from the name; selection never re-parses names.
    pub is_traveler_variant: bool,
}

impl From<CharacterRecord> for Character {
    fn from(record: CharacterRecord) -> Self {
        let is_traveler_variant = record.name.starts_with(TRAVELER_PREFIX);
        Self {
            name: record.name,
            rarity: record.rarity,
            element: record.element,
            icon: record.icon,
            is_traveler_variant,
        }
    }
}

impl Character {
    pub fn is_five_star(&self) -> bool {
        self.rarity >= 5
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BossTier {
    Normal,
    Legend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BossRecord")]
pub struct Boss {
    pub name: String,
    pub icon: String,
    pub location: String,
    pub link: String,
    pub coop: bool,
    pub tier: BossTier,
}

impl From<BossRecord> for Boss {
    fn from(record: BossRecord) -> Self {
        let tier = if record.name.starts_with(LEGEND_MARKER) {
            BossTier::Legend
        } else {
            BossTier::Normal
        };
        Self {
            name: record.name,
            icon: record.icon,
            location: record.location,
            link: record.link,
            coop: record.coop,
            tier,
        }
    }
}

impl Boss {
    pub fn is_legend(&self) -> bool {
        self.tier == BossTier::Legend
    }

    /// Name with the legend marker stripped, for display.
    pub fn display_name(&self) -> &str {
        match self.name.strip_prefix(LEGEND_MARKER) {
            Some(rest) => rest.trim_start(),
            None => &self.name,
        }
    }
}

/// Static character and boss reference data, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    characters: Vec<Character>,
    bosses: Vec<Boss>,
}

impl Roster {
    pub fn new(characters: Vec<Character>, bosses: Vec<Boss>) -> Result<Self> {
        if let Some(c) = characters.iter().find(|c| c.rarity != 4 && c.rarity != 5) {
            return Err(Error::Catalog(format!(
                "character '{}' has rarity {}, expected 4 or 5",
                c.name, c.rarity
            )));
        }
        check_unique("character", characters.iter().map(|c| c.name.as_str()))?;
        check_unique("boss", bosses.iter().map(|b| b.name.as_str()))?;

        Ok(Self { characters, bosses })
    }

    /// Parse the two catalog documents (arrays of character / boss objects).
    pub fn from_json(characters_json: &str, bosses_json: &str) -> Result<Self> {
        let characters: Vec<Character> = serde_json::from_str(characters_json)?;
        let bosses: Vec<Boss> = serde_json::from_str(bosses_json)?;
        Self::new(characters, bosses)
    }

    /// Load `characters.json` and `bosses.json` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let characters_json = fs::read_to_string(dir.join(CHARACTERS_FILE))?;
        let bosses_json = fs::read_to_string(dir.join(BOSSES_FILE))?;
        let roster = Self::from_json(&characters_json, &bosses_json)?;
        tracing::info!(
            characters = roster.characters.len(),
            bosses = roster.bosses.len(),
            "loaded roster from {}",
            dir.display()
        );
        Ok(roster)
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn bosses(&self) -> &[Boss] {
        &self.bosses
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn boss(&self, name: &str) -> Option<&Boss> {
        self.bosses.iter().find(|b| b.name == name)
    }

    /// Distinct character elements in first-appearance order.
    pub fn elements(&self) -> Vec<&str> {
        distinct(self.characters.iter().map(|c| c.element.as_str()))
    }

    /// Distinct boss locations in first-appearance order.
    pub fn boss_locations(&self) -> Vec<&str> {
        distinct(self.bosses.iter().map(|b| b.location.as_str()))
    }

    /// Bosses that co-op mode would make unselectable.
    pub fn non_coop_bosses(&self) -> impl Iterator<Item = &Boss> {
        self.bosses.iter().filter(|b| !b.coop)
    }

    pub fn legend_bosses(&self) -> impl Iterator<Item = &Boss> {
        self.bosses.iter().filter(|b| b.is_legend())
    }
}

fn check_unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::Catalog(format!("duplicate {what} name '{name}'")));
        }
    }
    Ok(())
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}
