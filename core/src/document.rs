//! Serializable level document and legend schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{LevelError, OccupantKind, OverlayKind};

/// Top-level level document: a list of grids in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDocument {
    /// Grids that compose the level. The first grid starts active.
    pub grids: Vec<GridDocument>,
}

/// Declaration of a single grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDocument {
    /// Stable grid identifier referenced by teleporters.
    #[serde(rename = "gridID")]
    pub id: String,
    /// Human-readable title shown by collaborators.
    #[serde(rename = "gridTitle", default)]
    pub title: String,
    /// Declared extent of the grid.
    #[serde(rename = "gridSize")]
    pub size: GridSizeDocument,
    /// One layer per height level, lowest first.
    pub layers: Vec<LayerDocument>,
}

/// Grid extent as written in a level document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSizeDocument {
    /// Number of stacked height levels.
    pub height: u32,
    /// Number of columns per level.
    pub columns: u32,
    /// Number of rows per level.
    pub rows: u32,
}

/// A single height level of a grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDocument {
    /// Legend symbols, one string per row; the first string is the highest row.
    pub layout: Vec<String>,
    /// Metadata for target overlays on this level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetDocument>,
    /// Metadata for teleporter overlays on this level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teleporters: Vec<TeleporterDocument>,
    /// Identifiers for movable blocks on this level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<BlockDocument>,
}

/// Target metadata keyed by a one-based `[column, row]` position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDocument {
    /// One-based `[column, row]` position on the owning level.
    pub position: [u32; 2],
    /// Six-character entry-face flag string.
    pub directions: String,
    /// Identifier a block must carry to fill the target correctly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Teleporter metadata keyed by a one-based `[column, row]` position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleporterDocument {
    /// One-based `[column, row]` position on the owning level.
    pub position: [u32; 2],
    /// Six-character entry-face flag string.
    pub directions: String,
    /// Identifier of the destination grid.
    #[serde(rename = "targetGridID")]
    pub target_grid: String,
    /// One-based `[height, column, row]` destination inside the target grid.
    #[serde(rename = "targetGridPosition")]
    pub target_position: [u32; 3],
}

/// Movable block metadata keyed by a one-based `[column, row]` position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDocument {
    /// One-based `[column, row]` position on the owning level.
    pub position: [u32; 2],
    /// Identifier matched against target requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Meaning of a layout symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// The cell holds nothing.
    Empty,
    /// The cell holds an occupant of the given variant.
    Occupant(OccupantKind),
    /// The cell holds an overlay of the given variant.
    Overlay(OverlayKind),
}

impl CellKind {
    /// Every symbol meaning understood by the legend.
    pub const ALL: [CellKind; 8] = [
        CellKind::Empty,
        CellKind::Occupant(OccupantKind::Floor),
        CellKind::Occupant(OccupantKind::Wall),
        CellKind::Occupant(OccupantKind::Player),
        CellKind::Occupant(OccupantKind::PushableBlock),
        CellKind::Occupant(OccupantKind::PullableBlock),
        CellKind::Overlay(OverlayKind::Target),
        CellKind::Overlay(OverlayKind::Teleporter),
    ];

    /// Legend name of the symbol meaning.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "none",
            Self::Occupant(kind) => kind.name(),
            Self::Overlay(kind) => kind.name(),
        }
    }

    /// Decodes a legend name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Bidirectional mapping between layout symbols and cell meanings.
///
/// The legend is kept in its document shape and decoded on lookup; call
/// [`Legend::validate`] once before relying on lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    #[serde(rename = "codeToType")]
    code_to_type: BTreeMap<String, String>,
    #[serde(rename = "typeToCode", default)]
    type_to_code: BTreeMap<String, String>,
}

impl Legend {
    /// Creates an empty legend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol in both directions, replacing earlier mappings.
    #[must_use]
    pub fn with_symbol(mut self, symbol: char, kind: CellKind) -> Self {
        let _ = self
            .code_to_type
            .insert(symbol.to_string(), kind.name().to_owned());
        let _ = self
            .type_to_code
            .insert(kind.name().to_owned(), symbol.to_string());
        self
    }

    /// Checks that every symbol is a single character and every name is known.
    pub fn validate(&self) -> Result<(), LevelError> {
        for (symbol, name) in &self.code_to_type {
            if symbol.chars().count() != 1 {
                return Err(LevelError::InvalidLegend(format!(
                    "codeToType key {symbol:?} must be a single character"
                )));
            }
            if CellKind::from_name(name).is_none() {
                return Err(LevelError::UnknownKind(name.clone()));
            }
        }
        for (name, symbol) in &self.type_to_code {
            if CellKind::from_name(name).is_none() {
                return Err(LevelError::UnknownKind(name.clone()));
            }
            if symbol.chars().count() != 1 {
                return Err(LevelError::InvalidLegend(format!(
                    "typeToCode value {symbol:?} for '{name}' must be a single character"
                )));
            }
        }
        Ok(())
    }

    /// Meaning of a layout symbol, if the legend maps it.
    #[must_use]
    pub fn kind_for(&self, symbol: char) -> Option<CellKind> {
        let mut buffer = [0; 4];
        let key: &str = symbol.encode_utf8(&mut buffer);
        self.code_to_type
            .get(key)
            .and_then(|name| CellKind::from_name(name))
    }

    /// Symbol used to write the meaning back into a layout.
    ///
    /// Prefers `typeToCode` and falls back to the first matching `codeToType`
    /// entry.
    #[must_use]
    pub fn symbol_for(&self, kind: CellKind) -> Option<char> {
        self.type_to_code
            .get(kind.name())
            .and_then(|symbol| single_char(symbol))
            .or_else(|| {
                self.code_to_type
                    .iter()
                    .find(|(_, name)| name.as_str() == kind.name())
                    .and_then(|(symbol, _)| single_char(symbol))
            })
    }
}

fn single_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}
