use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use echovia_core::{
    clamp_count, randomize, ConfigStore, FileStore, RandomizeKind, Roster, SelectionResult,
    SETTINGS_KEY,
};

#[derive(Debug, Parser)]
#[command(name = "echovia", version, about = "Random team and boss picker for Genshin Impact")]
struct Args {
    /// Directory holding characters.json and bosses.json.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Where settings are persisted. Defaults to the user config directory.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw a random selection.
    Roll {
        #[arg(value_enum, default_value_t = RollKind::Combined)]
        kind: RollKind,

        #[arg(long)]
        seed: Option<u64>,

        /// Move every drawn character onto the exclusion list.
        #[arg(long, default_value_t = false)]
        accept: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Move characters onto the exclusion list.
    Accept {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Take characters off the exclusion list.
    Include {
        #[arg(required_unless_present = "all")]
        names: Vec<String>,

        #[arg(long, default_value_t = false)]
        all: bool,
    },
    Enable(Toggle),
    Disable(Toggle),
    /// Set how many items a roll draws (clamped to what is available).
    Count { target: Target, count: usize },
    Exclusion { state: Switch },
    Coop { state: Switch },
    LimitFiveStars { state: Switch },
    MaxFiveStars { max: usize },
    /// Disable every legend-tier boss.
    DisableLegends,
    /// Restore default settings.
    Reset,
    /// Print the current settings.
    Show,
}

#[derive(Debug, clap::Args)]
struct Toggle {
    target: Target,

    names: Vec<String>,

    /// An element (characters) or location (bosses).
    #[arg(long, conflicts_with = "all")]
    group: Option<String>,

    #[arg(long, default_value_t = false)]
    all: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum RollKind {
    Characters,
    Bosses,
    Combined,
}

impl From<RollKind> for RandomizeKind {
    fn from(kind: RollKind) -> Self {
        match kind {
            RollKind::Characters => RandomizeKind::Characters,
            RollKind::Bosses => RandomizeKind::Bosses,
            RollKind::Combined => RandomizeKind::Combined,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Target {
    Characters,
    Bosses,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        self == Switch::On
    }
}

fn config_dir() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("Echovia");
    Some(base)
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn check_names(roster: &Roster, target: Target, names: &[String]) -> anyhow::Result<()> {
    for name in names {
        let known = match target {
            Target::Characters => roster.character(name).is_some(),
            Target::Bosses => roster.boss(name).is_some(),
        };
        if !known {
            bail!("unknown {}: {name}", target_label(target));
        }
    }
    Ok(())
}

fn target_label(target: Target) -> &'static str {
    match target {
        Target::Characters => "character",
        Target::Bosses => "boss",
    }
}

fn apply_toggle(
    store: &mut ConfigStore<FileStore>,
    roster: &Roster,
    toggle: &Toggle,
    enabled: bool,
) -> anyhow::Result<()> {
    if toggle.all {
        match toggle.target {
            Target::Characters => store.set_all_characters_enabled(roster, enabled)?,
            Target::Bosses => store.set_all_bosses_enabled(roster, enabled)?,
        }
        return Ok(());
    }

    if let Some(group) = toggle.group.as_deref() {
        match toggle.target {
            Target::Characters => {
                if !roster.elements().contains(&group) {
                    bail!("unknown element: {group}");
                }
                store.set_character_group_enabled(roster, group, enabled)?;
            }
            Target::Bosses => {
                if !roster.boss_locations().contains(&group) {
                    bail!("unknown location: {group}");
                }
                store.set_boss_group_enabled(roster, group, enabled)?;
            }
        }
        return Ok(());
    }

    if toggle.names.is_empty() {
        bail!("give item names, --group or --all");
    }
    check_names(roster, toggle.target, &toggle.names)?;
    for name in &toggle.names {
        match toggle.target {
            Target::Characters => store.set_character_enabled(name, enabled)?,
            Target::Bosses => store.set_boss_enabled(name, enabled)?,
        }
    }
    Ok(())
}

fn print_selection(result: &SelectionResult) {
    if !result.characters.is_empty() {
        println!("Characters:");
        for c in &result.characters {
            println!("  {} ({}* {})", c.name, c.rarity, c.element);
        }
    }
    if !result.bosses.is_empty() {
        println!("Bosses:");
        for b in &result.bosses {
            let legend = if b.is_legend() { " [legend]" } else { "" };
            println!("  {}{} - {} {}", b.display_name(), legend, b.location, b.link);
        }
    }
}

fn show(store: &ConfigStore<FileStore>, roster: &Roster) {
    let s = store.settings();
    let on_off = |flag: bool| if flag { "on" } else { "off" };

    println!(
        "Settings file: {}",
        store.backend().path_for(SETTINGS_KEY).display()
    );
    println!(
        "Characters: draw {} of {} available ({} in catalog)",
        s.characters.count,
        s.available_characters(roster).len(),
        roster.characters().len()
    );
    println!(
        "Bosses: draw {} of {} available ({} in catalog)",
        s.bosses.count,
        s.available_bosses(roster).len(),
        roster.bosses().len()
    );
    println!("Exclusion: {}", on_off(s.enable_exclusion));
    let excluded: Vec<&str> = s
        .excluded_characters(roster)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    if !excluded.is_empty() {
        println!("  excluded: {}", excluded.join(", "));
    }
    println!("Co-op mode: {}", on_off(s.rules.coop_mode));
    if s.rules.limit_five_stars {
        println!("Five-star limit: {}", s.rules.max_five_stars);
    } else {
        println!("Five-star limit: off");
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let roster = Roster::load_dir(&args.data_dir)
        .with_context(|| format!("Failed to load catalog from {}", args.data_dir.display()))?;

    let dir = args
        .config_dir
        .or_else(config_dir)
        .context("Could not determine a settings directory; pass --config-dir")?;
    let mut store = ConfigStore::open(FileStore::new(&dir), &roster)
        .with_context(|| format!("Failed to open settings in {}", dir.display()))?;

    match args.command {
        Command::Roll {
            kind,
            seed,
            accept,
            json,
        } => {
            let seed = seed.unwrap_or_else(|| rand::thread_rng().gen::<u64>());
            tracing::info!(seed, "rolling {:?}", kind);
            let mut rng = StdRng::seed_from_u64(seed);
            let result = randomize(kind.into(), &roster, store.settings(), &mut rng)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Seed: {seed}");
                print_selection(&result);
            }

            if accept && !result.characters.is_empty() {
                let names = result.characters.iter().map(|c| c.name.as_str());
                store.accept_selection(&roster, names)?;
                if !json {
                    println!("{} character(s) excluded", result.characters.len());
                }
            }
        }
        Command::Accept { names } => {
            check_names(&roster, Target::Characters, &names)?;
            store.accept_selection(&roster, &names)?;
            println!("{} character(s) excluded", names.len());
        }
        Command::Include { names, all } => {
            if all {
                store.include_all_characters()?;
            } else {
                for name in &names {
                    store.include_character(name)?;
                }
            }
        }
        Command::Enable(toggle) => apply_toggle(&mut store, &roster, &toggle, true)?,
        Command::Disable(toggle) => apply_toggle(&mut store, &roster, &toggle, false)?,
        Command::Count { target, count } => match target {
            Target::Characters => {
                let available = store.settings().available_characters(&roster).len();
                store.set_character_count(clamp_count(count, available))?;
            }
            Target::Bosses => {
                let available = store.settings().available_bosses(&roster).len();
                store.set_boss_count(clamp_count(count, available))?;
            }
        },
        Command::Exclusion { state } => store.set_exclusion_enabled(state.is_on())?,
        Command::Coop { state } => {
            if state.is_on() {
                let skipped: Vec<&str> =
                    roster.non_coop_bosses().map(|b| b.display_name()).collect();
                if !skipped.is_empty() {
                    println!("These bosses will not be drawn in co-op mode:");
                    for name in skipped {
                        println!("  {name}");
                    }
                }
            }
            store.set_coop_mode(state.is_on())?;
        }
        Command::LimitFiveStars { state } => store.set_limit_five_stars(state.is_on())?,
        Command::MaxFiveStars { max } => store.set_max_five_stars(max)?,
        Command::DisableLegends => store.disable_legend_bosses(&roster)?,
        Command::Reset => {
            store.reset_to_defaults()?;
            store.sync_with_roster(&roster)?;
        }
        Command::Show => show(&store, &roster),
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_needs_names_or_all() {
        assert!(Args::try_parse_from(["echovia", "include"]).is_err());

        let args = Args::try_parse_from(["echovia", "include", "--all"]).unwrap();
        assert!(matches!(args.command, Command::Include { all: true, .. }));

        let args = Args::try_parse_from(["echovia", "include", "Amber"]).unwrap();
        match args.command {
            Command::Include { names, all } => {
                assert_eq!(names, vec!["Amber".to_string()]);
                assert!(!all);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
