use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{Boss, Character, Roster};
use crate::settings::Settings;

/// Raised when the eligible pool cannot cover the requested sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum SelectionError {
    #[error("not enough characters: requested {requested}, available {available}")]
    InsufficientCharacters { requested: usize, available: usize },
    #[error("not enough bosses: requested {requested}, available {available}")]
    InsufficientBosses { requested: usize, available: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    pub characters: Vec<Character>,
    pub bosses: Vec<Boss>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RandomizeKind {
    Characters,
    Bosses,
    Combined,
}

/// Shuffle `pool` in place (Fisher-Yates) and keep the first `n` items.
fn draw<T, R: Rng + ?Sized>(mut pool: Vec<T>, n: usize, rng: &mut R) -> Vec<T> {
    pool.shuffle(rng);
    pool.truncate(n);
    pool
}

pub fn select_characters<R: Rng + ?Sized>(
    roster: &Roster,
    settings: &Settings,
    rng: &mut R,
) -> Result<Vec<Character>, SelectionError> {
    let need = settings.characters.count;
    if need == 0 {
        return Ok(Vec::new());
    }
    let eligible = settings.available_characters(roster);

    if eligible.len() < need {
        tracing::warn!(need, eligible = eligible.len(), "character pool too small");
        return Err(SelectionError::InsufficientCharacters {
            requested: need,
            available: eligible.len(),
        });
    }

    let (travelers, mut candidates): (Vec<&Character>, Vec<&Character>) =
        eligible.into_iter().partition(|c| c.is_traveler_variant);

    // All enabled Traveler variants share one slot; co-op has none.
    if !settings.rules.coop_mode {
        if let Some(&traveler) = travelers.choose(rng) {
            candidates.push(traveler);
        }
    }

    tracing::debug!(
        candidates = candidates.len(),
        travelers = travelers.len(),
        coop = settings.rules.coop_mode,
        "character candidate pool built"
    );

    if candidates.len() < need {
        tracing::warn!(
            need,
            candidates = candidates.len(),
            "character pool too small after traveler collapse"
        );
        return Err(SelectionError::InsufficientCharacters {
            requested: need,
            available: candidates.len(),
        });
    }

    let chosen = if settings.rules.limit_five_stars {
        let max_five = settings.rules.max_five_stars;
        let five_quota = max_five.min(need);
        let rest_quota = need - five_quota;

        let (five_stars, others): (Vec<&Character>, Vec<&Character>) =
            candidates.into_iter().partition(|c| c.is_five_star());

        // The five-star pool must cover the configured maximum, not just the draw.
        if five_stars.len() < max_five || others.len() < rest_quota {
            tracing::warn!(
                max_five,
                five_quota,
                rest_quota,
                five_stars = five_stars.len(),
                others = others.len(),
                "rarity split cannot be filled"
            );
            return Err(SelectionError::InsufficientCharacters {
                requested: need,
                available: five_stars.len().min(five_quota) + others.len().min(rest_quota),
            });
        }

        let mut chosen = draw(five_stars, five_quota, rng);
        chosen.extend(draw(others, rest_quota, rng));
        chosen.shuffle(rng);
        chosen
    } else {
        draw(candidates, need, rng)
    };

    Ok(chosen.into_iter().cloned().collect())
}

pub fn select_bosses<R: Rng + ?Sized>(
    roster: &Roster,
    settings: &Settings,
    rng: &mut R,
) -> Result<Vec<Boss>, SelectionError> {
    let need = settings.bosses.count;
    let eligible: Vec<&Boss> = roster
        .bosses()
        .iter()
        .filter(|b| settings.is_boss_enabled(&b.name) && (!settings.rules.coop_mode || b.coop))
        .collect();

    if eligible.len() < need {
        tracing::warn!(
            need,
            eligible = eligible.len(),
            coop = settings.rules.coop_mode,
            "boss pool too small"
        );
        return Err(SelectionError::InsufficientBosses {
            requested: need,
            available: eligible.len(),
        });
    }

    Ok(draw(eligible, need, rng).into_iter().cloned().collect())
}

/// Run the requested part(s). Nothing is returned unless every requested
/// part succeeds.
pub fn randomize<R: Rng + ?Sized>(
    kind: RandomizeKind,
    roster: &Roster,
    settings: &Settings,
    rng: &mut R,
) -> Result<SelectionResult, SelectionError> {
    let mut result = SelectionResult::default();

    if matches!(kind, RandomizeKind::Characters | RandomizeKind::Combined) {
        result.characters = select_characters(roster, settings, rng)?;
    }
    if matches!(kind, RandomizeKind::Bosses | RandomizeKind::Combined) {
        result.bosses = select_bosses(roster, settings, rng)?;
    }

    tracing::debug!(
        ?kind,
        characters = result.characters.len(),
        bosses = result.bosses.len(),
        "selection drawn"
    );
    Ok(result)
}

pub fn select_combined<R: Rng + ?Sized>(
    roster: &Roster,
    settings: &Settings,
    rng: &mut R,
) -> Result<SelectionResult, SelectionError> {
    randomize(RandomizeKind::Combined, roster, settings, rng)
}
