use thiserror::Error;

pub mod catalog;
pub mod selection;
pub mod settings;
pub mod store;

pub use catalog::{Boss, BossTier, Character, Roster};
pub use selection::{
    randomize, select_bosses, select_characters, select_combined, RandomizeKind, SelectionError,
    SelectionResult,
};
pub use settings::{clamp_count, BossSettings, CharacterSettings, Rules, Settings};
pub use store::{ConfigStore, FileStore, KeyValueStore, MemoryStore, SETTINGS_KEY};

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, Error>;
