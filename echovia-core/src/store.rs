use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::catalog::Roster;
use crate::settings::Settings;
use crate::Result;

/// Key under which the whole [`Settings`] document is persisted.
pub const SETTINGS_KEY: &str = "echovia-settings";

/// Opaque string key-value persistence.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store; nothing outlives the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write beside the target and rename over it so readers never see a
        // half-written document.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Owns the active [`Settings`] and keeps the persisted copy in step.
///
/// Each mutation builds the next complete value, persists it and only then
/// makes it the active one. A failed save leaves the previous value active.
#[derive(Debug)]
pub struct ConfigStore<S: KeyValueStore> {
    backend: S,
    settings: Settings,
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// Read the persisted settings (defaults when there are none) and sync
    /// the enabled maps against `roster`.
    pub fn open(backend: S, roster: &Roster) -> Result<Self> {
        let settings = match backend.load(SETTINGS_KEY)? {
            Some(raw) => serde_json::from_str::<Settings>(&raw)?,
            None => {
                tracing::info!("no persisted settings under '{SETTINGS_KEY}', using defaults");
                Settings::default()
            }
        };

        let mut store = Self { backend, settings };
        store.sync_with_roster(roster)?;
        Ok(store)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn update<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = self.settings.clone();
        mutate(&mut next);
        let raw = serde_json::to_string(&next)?;
        self.backend.save(SETTINGS_KEY, &raw)?;
        self.settings = next;
        Ok(())
    }

    pub fn sync_with_roster(&mut self, roster: &Roster) -> Result<()> {
        let mut next = self.settings.clone();
        if next.sync_with_roster(roster) {
            tracing::debug!("enabled maps synchronised with roster");
            self.update(|s| *s = next)?;
        }
        Ok(())
    }

    pub fn set_character_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.update(|s| {
            s.characters.enabled.insert(name.to_string(), enabled);
        })
    }

    pub fn set_boss_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.update(|s| {
            s.bosses.enabled.insert(name.to_string(), enabled);
        })
    }

    /// Toggle every character of one element.
    pub fn set_character_group_enabled(
        &mut self,
        roster: &Roster,
        element: &str,
        enabled: bool,
    ) -> Result<()> {
        self.update(|s| {
            for c in roster.characters().iter().filter(|c| c.element == element) {
                s.characters.enabled.insert(c.name.clone(), enabled);
            }
        })
    }

    /// Toggle every boss at one location.
    pub fn set_boss_group_enabled(
        &mut self,
        roster: &Roster,
        location: &str,
        enabled: bool,
    ) -> Result<()> {
        self.update(|s| {
            for b in roster.bosses().iter().filter(|b| b.location == location) {
                s.bosses.enabled.insert(b.name.clone(), enabled);
            }
        })
    }

    pub fn set_all_characters_enabled(&mut self, roster: &Roster, enabled: bool) -> Result<()> {
        self.update(|s| {
            for c in roster.characters() {
                s.characters.enabled.insert(c.name.clone(), enabled);
            }
        })
    }

    pub fn set_all_bosses_enabled(&mut self, roster: &Roster, enabled: bool) -> Result<()> {
        self.update(|s| {
            for b in roster.bosses() {
                s.bosses.enabled.insert(b.name.clone(), enabled);
            }
        })
    }

    /// Callers clamp `count` to `[1, available]` first.
    pub fn set_character_count(&mut self, count: usize) -> Result<()> {
        self.update(|s| s.characters.count = count)
    }

    pub fn set_boss_count(&mut self, count: usize) -> Result<()> {
        self.update(|s| s.bosses.count = count)
    }

    /// Append names to the exclusion list, skipping ones already on it and
    /// names `roster` does not know.
    pub fn exclude_characters<I, N>(&mut self, roster: &Roster, names: I) -> Result<()>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        self.update(|s| {
            for name in names {
                let name = name.as_ref();
                if roster.character(name).is_none() {
                    tracing::warn!("not excluding unknown character '{name}'");
                    continue;
                }
                if !s.is_excluded(name) {
                    s.characters.excluded.push(name.to_string());
                }
            }
        })
    }

    pub fn exclude_character(&mut self, roster: &Roster, name: &str) -> Result<()> {
        self.exclude_characters(roster, [name])
    }

    pub fn include_character(&mut self, name: &str) -> Result<()> {
        if !self.settings.is_excluded(name) {
            return Ok(());
        }
        self.update(|s| s.characters.excluded.retain(|n| n != name))
    }

    pub fn include_all_characters(&mut self) -> Result<()> {
        self.update(|s| s.characters.excluded.clear())
    }

    /// Retire the characters the user confirmed from a presented selection.
    pub fn accept_selection<I, N>(&mut self, roster: &Roster, names: I) -> Result<()>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let names: Vec<N> = names.into_iter().collect();
        tracing::info!(count = names.len(), "accepting selection into exclusion list");
        self.exclude_characters(roster, names)
    }

    pub fn set_exclusion_enabled(&mut self, enabled: bool) -> Result<()> {
        self.update(|s| s.enable_exclusion = enabled)
    }

    pub fn set_coop_mode(&mut self, enabled: bool) -> Result<()> {
        self.update(|s| s.rules.coop_mode = enabled)
    }

    pub fn set_limit_five_stars(&mut self, enabled: bool) -> Result<()> {
        self.update(|s| s.rules.limit_five_stars = enabled)
    }

    pub fn set_max_five_stars(&mut self, max: usize) -> Result<()> {
        self.update(|s| s.rules.max_five_stars = max)
    }

    /// Disable every legend-tier boss; other entries are left as they are.
    pub fn disable_legend_bosses(&mut self, roster: &Roster) -> Result<()> {
        self.update(|s| {
            for b in roster.legend_bosses() {
                s.bosses.enabled.insert(b.name.clone(), false);
            }
        })
    }

    /// Restore hard-coded defaults. The enabled maps come back empty; call
    /// [`ConfigStore::sync_with_roster`] afterwards.
    pub fn reset_to_defaults(&mut self) -> Result<()> {
        tracing::info!("resetting settings to defaults");
        self.update(|s| *s = Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{boss, character};
    use crate::Error;

    fn roster() -> Roster {
        Roster::new(
            vec![
                character("Amber", 4, "Pyro"),
                character("Diluc", 5, "Pyro"),
                character("Fischl", 4, "Electro"),
            ],
            vec![
                boss("Oceanid", "Liyue", true),
                boss("⭐ - Azhdaha", "Liyue", false),
                boss("⭐ - Stormterror", "Mondstadt", false),
                boss("Cryo Regisvine", "Mondstadt", true),
            ],
        )
        .unwrap()
    }

    fn persisted(store: &ConfigStore<MemoryStore>) -> Settings {
        let raw = store.backend().get(SETTINGS_KEY).unwrap();
        serde_json::from_str(raw).unwrap()
    }

    fn open() -> ConfigStore<MemoryStore> {
        ConfigStore::open(MemoryStore::new(), &roster()).unwrap()
    }

    #[test]
    fn open_enables_every_catalog_entry() {
        let store = open();
        assert!(store.settings().is_character_enabled("Amber"));
        assert!(store.settings().is_boss_enabled("⭐ - Azhdaha"));
        assert_eq!(&persisted(&store), store.settings());
    }

    #[test]
    fn open_keeps_saved_flags() {
        let mut backend = MemoryStore::new();
        backend
            .save(
                SETTINGS_KEY,
                r#"{"characters":{"count":3,"enabled":{"Diluc":false}}}"#,
            )
            .unwrap();
        let store = ConfigStore::open(backend, &roster()).unwrap();
        assert_eq!(store.settings().characters.count, 3);
        assert!(!store.settings().is_character_enabled("Diluc"));
        assert!(store.settings().is_character_enabled("Amber"));
    }

    #[test]
    fn open_rejects_corrupt_document() {
        let mut backend = MemoryStore::new();
        backend.save(SETTINGS_KEY, "{not json").unwrap();
        let err = ConfigStore::open(backend, &roster()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn every_mutation_is_persisted() {
        let mut store = open();
        store.set_character_enabled("Amber", false).unwrap();
        store.set_boss_enabled("Oceanid", false).unwrap();
        store.set_character_count(2).unwrap();
        store.set_boss_count(1).unwrap();
        store.set_exclusion_enabled(false).unwrap();
        store.set_coop_mode(true).unwrap();
        store.set_limit_five_stars(true).unwrap();
        store.set_max_five_stars(0).unwrap();

        let saved = persisted(&store);
        assert_eq!(&saved, store.settings());
        assert!(!saved.is_character_enabled("Amber"));
        assert!(!saved.is_boss_enabled("Oceanid"));
        assert_eq!(saved.characters.count, 2);
        assert_eq!(saved.bosses.count, 1);
        assert!(!saved.enable_exclusion);
        assert!(saved.rules.coop_mode);
        assert!(saved.rules.limit_five_stars);
        assert_eq!(saved.rules.max_five_stars, 0);
    }

    #[test]
    fn exclusion_is_idempotent_per_name() {
        let roster = roster();
        let mut store = open();
        store.exclude_characters(&roster, ["Amber", "Diluc"]).unwrap();
        store.exclude_characters(&roster, ["Diluc", "Fischl"]).unwrap();
        store.exclude_character(&roster, "Amber").unwrap();
        assert_eq!(
            store.settings().characters.excluded,
            vec!["Amber", "Diluc", "Fischl"]
        );
    }

    #[test]
    fn exclusion_skips_names_outside_catalog() {
        let roster = roster();
        let mut store = open();
        store.exclude_characters(&roster, ["Amber", "Nobody"]).unwrap();
        store.exclude_character(&roster, "Traveler (Geo)").unwrap();
        store.accept_selection(&roster, ["Ghost", "Fischl"]).unwrap();

        assert_eq!(store.settings().characters.excluded, vec!["Amber", "Fischl"]);
        assert_eq!(persisted(&store).characters.excluded, vec!["Amber", "Fischl"]);
    }

    #[test]
    fn include_removes_and_ignores_unknown() {
        let mut store = open();
        store.exclude_characters(&roster(), ["Amber", "Diluc"]).unwrap();
        store.include_character("Amber").unwrap();
        store.include_character("Nobody").unwrap();
        assert_eq!(store.settings().characters.excluded, vec!["Diluc"]);

        store.include_all_characters().unwrap();
        assert!(store.settings().characters.excluded.is_empty());
    }

    #[test]
    fn accept_then_include_round_trip() {
        let roster = roster();
        let mut store = open();
        store.exclude_character(&roster, "Fischl").unwrap();
        store
            .accept_selection(&roster, vec!["Amber".to_string(), "Fischl".to_string()])
            .unwrap();
        assert_eq!(store.settings().characters.excluded, vec!["Fischl", "Amber"]);

        for name in ["Amber", "Fischl"] {
            store.include_character(name).unwrap();
        }
        assert!(store.settings().characters.excluded.is_empty());
        assert!(persisted(&store).characters.excluded.is_empty());
    }

    #[test]
    fn disables_only_legend_bosses() {
        let mut store = open();
        store.set_boss_enabled("Oceanid", false).unwrap();
        store.disable_legend_bosses(&roster()).unwrap();

        let s = store.settings();
        assert!(!s.is_boss_enabled("⭐ - Azhdaha"));
        assert!(!s.is_boss_enabled("⭐ - Stormterror"));
        assert!(!s.is_boss_enabled("Oceanid"));
        assert!(s.is_boss_enabled("Cryo Regisvine"));
    }

    #[test]
    fn group_toggles_touch_one_group() {
        let roster = roster();
        let mut store = open();
        store.set_character_group_enabled(&roster, "Pyro", false).unwrap();
        store.set_boss_group_enabled(&roster, "Mondstadt", false).unwrap();

        let s = store.settings();
        assert!(!s.is_character_enabled("Amber"));
        assert!(!s.is_character_enabled("Diluc"));
        assert!(s.is_character_enabled("Fischl"));
        assert!(!s.is_boss_enabled("Cryo Regisvine"));
        assert!(s.is_boss_enabled("Oceanid"));

        store.set_all_characters_enabled(&roster, true).unwrap();
        store.set_all_bosses_enabled(&roster, false).unwrap();
        assert!(store.settings().is_character_enabled("Diluc"));
        assert!(store.settings().available_bosses(&roster).is_empty());
    }

    #[test]
    fn reset_then_sync_restores_defaults() {
        let roster = roster();
        let mut store = open();
        store.set_character_enabled("Amber", false).unwrap();
        store.exclude_character(&roster, "Diluc").unwrap();
        store.set_coop_mode(true).unwrap();

        store.reset_to_defaults().unwrap();
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(persisted(&store), Settings::default());

        store.sync_with_roster(&roster).unwrap();
        assert!(store.settings().is_character_enabled("Amber"));
        assert!(store.settings().characters.excluded.is_empty());
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn save(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn failed_save_keeps_previous_settings() {
        let mut store = ConfigStore {
            backend: FailingStore,
            settings: Settings::default(),
        };
        assert!(store.set_coop_mode(true).is_err());
        assert!(!store.settings().rules.coop_mode);
    }
}
