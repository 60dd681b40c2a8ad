//! Key bindings that map typed characters onto simulation commands.
//!
//! Bindings come from an optional `bindings.toml`; any key left out keeps its
//! default.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use blockwarp_core::Direction;
use serde::Deserialize;

/// Action triggered by a bound key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Attempt a lateral move.
    Move(Direction),
    /// Switch between pulling and free.
    TogglePulling,
    /// Switch between interacting and free.
    ToggleInteracting,
    /// Drop back to the free stance.
    Release,
}

/// Resolved key table.
#[derive(Clone, Debug)]
pub(crate) struct KeyBindings {
    keys: BTreeMap<char, Action>,
}

impl KeyBindings {
    /// Reads bindings from `path`, or returns the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read key bindings from {}", path.display()))?;
        Self::from_toml(&raw)
            .with_context(|| format!("failed to parse key bindings in {}", path.display()))
    }

    /// Parses bindings from TOML text.
    pub(crate) fn from_toml(raw: &str) -> Result<Self> {
        let config: TomlBindings = toml::from_str(raw).context("invalid bindings toml")?;
        Self::from_config(config)
    }

    fn from_config(config: TomlBindings) -> Result<Self> {
        let entries = [
            (config.moves.up, Action::Move(Direction::Up)),
            (config.moves.down, Action::Move(Direction::Down)),
            (config.moves.left, Action::Move(Direction::Left)),
            (config.moves.right, Action::Move(Direction::Right)),
            (config.stance.pull, Action::TogglePulling),
            (config.stance.interact, Action::ToggleInteracting),
            (config.stance.release, Action::Release),
        ];

        let mut keys = BTreeMap::new();
        for (key, action) in entries {
            let mut chars = key.chars();
            let (Some(symbol), None) = (chars.next(), chars.next()) else {
                bail!("binding {key:?} for {action:?} must be a single character");
            };
            if let Some(previous) = keys.insert(symbol, action) {
                bail!("key {symbol:?} is bound to both {previous:?} and {action:?}");
            }
        }
        Ok(Self { keys })
    }

    /// Action bound to the key, if any.
    #[must_use]
    pub(crate) fn action(&self, key: char) -> Option<Action> {
        self.keys.get(&key).copied()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = [
            ('w', Action::Move(Direction::Up)),
            ('s', Action::Move(Direction::Down)),
            ('a', Action::Move(Direction::Left)),
            ('d', Action::Move(Direction::Right)),
            ('p', Action::TogglePulling),
            ('i', Action::ToggleInteracting),
            ('.', Action::Release),
        ]
        .into_iter()
        .collect();
        Self { keys }
    }
}

// TOML schema with serde defaults

#[derive(Deserialize, Debug, Default)]
struct TomlBindings {
    #[serde(default)]
    moves: TomlMoves,
    #[serde(default)]
    stance: TomlStance,
}

#[derive(Deserialize, Debug)]
struct TomlMoves {
    #[serde(default = "default_up")]
    up: String,
    #[serde(default = "default_down")]
    down: String,
    #[serde(default = "default_left")]
    left: String,
    #[serde(default = "default_right")]
    right: String,
}

impl Default for TomlMoves {
    fn default() -> Self {
        Self {
            up: default_up(),
            down: default_down(),
            left: default_left(),
            right: default_right(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct TomlStance {
    #[serde(default = "default_pull")]
    pull: String,
    #[serde(default = "default_interact")]
    interact: String,
    #[serde(default = "default_release")]
    release: String,
}

impl Default for TomlStance {
    fn default() -> Self {
        Self {
            pull: default_pull(),
            interact: default_interact(),
            release: default_release(),
        }
    }
}

fn default_up() -> String {
    "w".into()
}
fn default_down() -> String {
    "s".into()
}
fn default_left() -> String {
    "a".into()
}
fn default_right() -> String {
    "d".into()
}
fn default_pull() -> String {
    "p".into()
}
fn default_interact() -> String {
    "i".into()
}
fn default_release() -> String {
    ".".into()
}
