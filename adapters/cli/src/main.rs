#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that loads Blockwarp levels and plays them in a terminal.

mod bindings;
mod level_transfer;
mod text_view;

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use blockwarp_core::{
    CellKind, Command, Event, Legend, LevelDocument, OccupantKind, OverlayKind, PlayerStance,
};
use blockwarp_world::{apply, export_level, load_level, parse_legend, parse_level, query, World};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bindings::{Action, KeyBindings};

#[derive(Parser)]
#[command(name = "blockwarp")]
#[command(about = "Multi-floor block pushing puzzles in the terminal")]
struct Cli {
    /// Emit debug diagnostics on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a level interactively, one line of keys at a time
    Play {
        #[command(flatten)]
        source: LevelSource,
        /// TOML file that rebinds the play keys
        #[arg(long)]
        bindings: Option<PathBuf>,
        /// Play these keys instead of reading stdin
        #[arg(long)]
        keys: Option<String>,
        /// Print every world event as it happens
        #[arg(long)]
        events: bool,
    },
    /// Load a level and report what it contains
    Check {
        #[command(flatten)]
        source: LevelSource,
    },
    /// Write the loaded level back out as JSON
    Export {
        #[command(flatten)]
        source: LevelSource,
        /// Destination file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a single-line transfer string for the level
    Share {
        #[command(flatten)]
        source: LevelSource,
    },
}

#[derive(Args)]
struct LevelSource {
    /// Level JSON file, or a transfer string produced by `share`
    level: String,
    /// Legend JSON file; the built-in legend is used when omitted
    #[arg(long)]
    legend: Option<PathBuf>,
}

/// Entry point for the Blockwarp command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Play {
            source,
            bindings,
            keys,
            events,
        } => {
            let bindings = KeyBindings::load(bindings.as_deref())?;
            let (mut world, _) = open(&source)?;
            let stdout = io::stdout();
            match keys {
                Some(keys) => play(&mut world, &bindings, keys.as_bytes(), stdout.lock(), events),
                None => play(&mut world, &bindings, io::stdin().lock(), stdout.lock(), events),
            }
        }
        Commands::Check { source } => check(&source),
        Commands::Export { source, output } => export(&source, output.as_deref()),
        Commands::Share { source } => share(&source),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Symbols understood when no legend file is supplied.
fn default_legend() -> Legend {
    Legend::new()
        .with_symbol('.', CellKind::Empty)
        .with_symbol('_', CellKind::Occupant(OccupantKind::Floor))
        .with_symbol('#', CellKind::Occupant(OccupantKind::Wall))
        .with_symbol('P', CellKind::Occupant(OccupantKind::Player))
        .with_symbol('B', CellKind::Occupant(OccupantKind::PushableBlock))
        .with_symbol('L', CellKind::Occupant(OccupantKind::PullableBlock))
        .with_symbol('T', CellKind::Overlay(OverlayKind::Target))
        .with_symbol('O', CellKind::Overlay(OverlayKind::Teleporter))
}

fn read_legend(path: Option<&Path>) -> Result<Legend> {
    let Some(path) = path else {
        return Ok(default_legend());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read legend from {}", path.display()))?;
    parse_legend(&raw).with_context(|| format!("failed to parse legend in {}", path.display()))
}

fn read_level(level: &str) -> Result<LevelDocument> {
    if level_transfer::is_transfer_string(level) {
        return level_transfer::decode(level).context("failed to decode level transfer string");
    }
    let raw = fs::read_to_string(level)
        .with_context(|| format!("failed to read level from {level}"))?;
    parse_level(&raw).with_context(|| format!("failed to parse level in {level}"))
}

/// Loads the level into a fresh world and logs what validation found.
fn open(source: &LevelSource) -> Result<(World, Legend)> {
    let legend = read_legend(source.legend.as_deref())?;
    let document = read_level(&source.level)?;
    let mut world = World::new();
    let mut events = Vec::new();
    let report = load_level(&mut world, &document, &legend, &mut events)
        .context("failed to load level")?;
    if !report.has_player {
        warn!(grids = report.grids, "level_has_no_player");
    }
    Ok((world, legend))
}

fn check(source: &LevelSource) -> Result<()> {
    let legend = read_legend(source.legend.as_deref())?;
    let document = read_level(&source.level)?;
    let mut world = World::new();
    let mut events = Vec::new();
    let report = load_level(&mut world, &document, &legend, &mut events)
        .context("failed to load level")?;

    for event in &events {
        println!("{}", text_view::describe(event));
    }
    println!(
        "{} grid(s), {} teleporter(s), {} disabled, player: {}, solved: {}",
        report.grids,
        report.teleporters,
        report.disabled_teleporters,
        if report.has_player { "yes" } else { "no" },
        if report.solved { "yes" } else { "no" },
    );
    Ok(())
}

fn export(source: &LevelSource, output: Option<&Path>) -> Result<()> {
    let (world, legend) = open(source)?;
    let document = export_level(&world, &legend).context("failed to export level")?;
    let json = serde_json::to_string_pretty(&document).context("failed to serialise level")?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write level to {}", path.display()))?;
            info!(path = %path.display(), "level_exported");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn share(source: &LevelSource) -> Result<()> {
    let (world, legend) = open(source)?;
    let document = export_level(&world, &legend).context("failed to export level")?;
    let encoded = level_transfer::encode(&document).context("failed to encode level")?;
    println!("{encoded}");
    Ok(())
}

/// Feeds keys to the world line by line, redrawing the active grid after each line.
///
/// Every character of a line is a key. A line reading `quit` or the end of
/// input stops play.
fn play(
    world: &mut World,
    bindings: &KeyBindings,
    input: impl BufRead,
    mut out: impl Write,
    show_events: bool,
) -> Result<()> {
    draw(world, &mut out)?;
    let mut events = Vec::new();
    for line in input.lines() {
        let line = line.context("failed to read keys")?;
        if line.trim() == "quit" {
            break;
        }
        for key in line.chars().filter(|key| !key.is_whitespace()) {
            let Some(action) = bindings.action(key) else {
                warn!(key = %key, "unbound_key");
                continue;
            };
            apply(world, command_for(world, action), &mut events);
        }
        if show_events {
            for event in &events {
                writeln!(out, "{}", text_view::describe(event))?;
            }
        }
        let solved = events
            .iter()
            .any(|event| *event == Event::WinStateChanged { solved: true });
        events.clear();
        draw(world, &mut out)?;
        if solved {
            writeln!(out, "level solved")?;
        }
    }
    Ok(())
}

fn command_for(world: &World, action: Action) -> Command {
    let current = query::player(world)
        .map(|player| player.stance)
        .unwrap_or_default();
    let toggle = |stance: PlayerStance| {
        if current == stance {
            PlayerStance::Free
        } else {
            stance
        }
    };
    match action {
        Action::Move(direction) => Command::MovePlayer { direction },
        Action::TogglePulling => Command::SetStance {
            stance: toggle(PlayerStance::Pulling),
        },
        Action::ToggleInteracting => Command::SetStance {
            stance: toggle(PlayerStance::Interacting),
        },
        Action::Release => Command::SetStance {
            stance: PlayerStance::Free,
        },
    }
}

fn draw(world: &World, out: &mut impl Write) -> Result<()> {
    let Some(grid) = query::active_grid(world) else {
        bail!("no level is loaded");
    };
    write!(out, "{}", text_view::render_grid(grid))?;
    out.flush()?;
    Ok(())
}
