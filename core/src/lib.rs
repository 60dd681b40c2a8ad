#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Blockwarp simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values that renderers
//! and other collaborators react to. Systems read grids exclusively through
//! the [`GridView`] trait and never mutate them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod document;

pub use document::{
    BlockDocument, CellKind, GridDocument, GridSizeDocument, LayerDocument, Legend, LevelDocument,
    TargetDocument, TeleporterDocument,
};

/// Commands that express all permissible gameplay mutations.
///
/// Level loading is not a command because it can fail as a whole; the world
/// exposes it through a dedicated fallible entry point instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that the player attempt a single lateral move.
    MovePlayer {
        /// Direction of travel for the attempted move.
        direction: Direction,
    },
    /// Latches a new stance on the player.
    SetStance {
        /// Stance the player should hold until changed again.
        stance: PlayerStance,
    },
    /// Releases every grid of the loaded level.
    UnloadLevel,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Announces that a level document was decoded into the world.
    LevelLoaded {
        /// Number of grids that compose the level.
        grid_count: usize,
        /// Grid that receives input after loading.
        active: GridId,
    },
    /// Announces that every grid of the previous level was released.
    LevelUnloaded,
    /// Reports that a teleporter failed validation and is permanently inert.
    TeleporterDisabled {
        /// Grid that owns the teleporter.
        grid: GridId,
        /// Location of the teleporter inside its grid.
        coord: Coord,
        /// Reason the destination was rejected.
        fault: TeleporterFault,
    },
    /// Confirms that the player latched a new stance.
    StanceChanged {
        /// Stance now held by the player.
        stance: PlayerStance,
    },
    /// Reports that a move request was rejected without mutating state.
    MoveRejected {
        /// Direction that was requested.
        direction: Direction,
        /// Specific reason the move failed.
        reason: MoveRejection,
    },
    /// Confirms that an occupant was relocated inside a grid.
    OccupantMoved {
        /// Grid that contains both cells.
        grid: GridId,
        /// Cell the occupant left.
        from: Coord,
        /// Cell the occupant now occupies.
        to: Coord,
        /// Variant of the relocated occupant.
        kind: OccupantKind,
    },
    /// Reports that a target space changed its fill classification.
    TargetFillChanged {
        /// Grid that owns the target.
        grid: GridId,
        /// Location of the target.
        coord: Coord,
        /// Classification before the scan.
        from: FillState,
        /// Classification after the scan.
        to: FillState,
    },
    /// Confirms that an occupant travelled through a teleporter.
    Transported {
        /// Grid the occupant left.
        from_grid: GridId,
        /// Teleporter cell the occupant left.
        from: Coord,
        /// Grid the occupant arrived in.
        to_grid: GridId,
        /// Cell the occupant arrived at.
        to: Coord,
        /// Variant of the transported occupant.
        kind: OccupantKind,
    },
    /// Reports that an occupied teleporter could not transport its occupant.
    TransportFailed {
        /// Grid that owns the teleporter.
        grid: GridId,
        /// Location of the teleporter.
        coord: Coord,
        /// Specific reason the transport failed.
        reason: TransportError,
    },
    /// Announces that input now resolves against a different grid.
    ActiveGridChanged {
        /// Grid that was active before the change.
        from: GridId,
        /// Grid that is active after the change.
        to: GridId,
    },
    /// Announces that the global win state flipped.
    WinStateChanged {
        /// Whether every target in every grid is correctly filled.
        solved: bool,
    },
}

/// Stable identifier of a grid inside a level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridId(String);

impl GridId {
    /// Creates a grid identifier from the provided string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GridId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier carried by movable blocks and required by target spaces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockLabel(String);

impl BlockLabel {
    /// Creates a label from the provided string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Location of a single lattice cell expressed as zero-based indices.
///
/// Level documents and the command line use one-based triples; convert at the
/// boundary with [`Coord::from_one_based`] and [`Coord::to_one_based`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    height: u32,
    column: u32,
    row: u32,
}

impl Coord {
    /// Creates a new zero-based coordinate.
    #[must_use]
    pub const fn new(height: u32, column: u32, row: u32) -> Self {
        Self {
            height,
            column,
            row,
        }
    }

    /// Converts a one-based triple, returning `None` when any component is zero.
    #[must_use]
    pub fn from_one_based(height: u32, column: u32, row: u32) -> Option<Self> {
        Some(Self::new(
            height.checked_sub(1)?,
            column.checked_sub(1)?,
            row.checked_sub(1)?,
        ))
    }

    /// Zero-based height level of the cell.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// One-based `[height, column, row]` triple used by level documents.
    #[must_use]
    pub const fn to_one_based(&self) -> [u32; 3] {
        [self.height + 1, self.column + 1, self.row + 1]
    }

    /// Offsets the coordinate laterally by `distance` cells.
    ///
    /// Returns `None` when the result would leave the non-negative lattice.
    #[must_use]
    pub fn step(self, direction: Direction, distance: u32) -> Option<Self> {
        let (column_delta, row_delta) = direction.unit();
        let column = offset(self.column, column_delta, distance)?;
        let row = offset(self.row, row_delta, distance)?;
        Some(Self::new(self.height, column, row))
    }

    /// Coordinate one height level below, if any.
    #[must_use]
    pub fn below(self) -> Option<Self> {
        Some(Self::new(self.height.checked_sub(1)?, self.column, self.row))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [height, column, row] = self.to_one_based();
        write!(f, "({height}, {column}, {row})")
    }
}

fn offset(value: u32, delta: i32, distance: u32) -> Option<u32> {
    let shifted = i64::from(value) + i64::from(delta) * i64::from(distance);
    u32::try_from(shifted).ok()
}

/// Declared extent of a grid: height levels, columns, and rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    height: u32,
    columns: u32,
    rows: u32,
}

impl GridSize {
    /// Creates a new grid extent.
    #[must_use]
    pub const fn new(height: u32, columns: u32, rows: u32) -> Self {
        Self {
            height,
            columns,
            rows,
        }
    }

    /// Number of stacked height levels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of columns per level.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows per level.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the coordinate lies inside the extent.
    #[must_use]
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.height < self.height && coord.column < self.columns && coord.row < self.rows
    }

    /// Total number of cells in the dense layer.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let cells = u64::from(self.height) * u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(cells).unwrap_or(0)
    }

    /// Dense index of the coordinate, or `None` when out of bounds.
    #[must_use]
    pub fn index(&self, coord: Coord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let height = usize::try_from(coord.height).ok()?;
        let column = usize::try_from(coord.column).ok()?;
        let row = usize::try_from(coord.row).ok()?;
        let columns = usize::try_from(self.columns).ok()?;
        let rows = usize::try_from(self.rows).ok()?;
        Some((height * columns + column) * rows + row)
    }

    /// Iterates every coordinate in dense-index order.
    pub fn coords(self) -> impl Iterator<Item = Coord> {
        (0..self.height).flat_map(move |height| {
            (0..self.columns).flat_map(move |column| {
                (0..self.rows).map(move |row| Coord::new(height, column, row))
            })
        })
    }
}

/// Lateral movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward increasing row indices.
    Up,
    /// Movement toward decreasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Every lateral direction in a stable order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit offset as `(column, row)` deltas.
    #[must_use]
    pub const fn unit(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Face of the destination cell crossed when moving in this direction.
    ///
    /// Travel enters a cell through the face on the side it comes from, so
    /// moving right crosses the destination's negative-column face.
    #[must_use]
    pub const fn entry_face(self) -> Face {
        match self {
            Self::Up => Face::RowNegative,
            Self::Down => Face::RowPositive,
            Self::Left => Face::ColumnPositive,
            Self::Right => Face::ColumnNegative,
        }
    }
}

/// The six faces of a lattice cell, in level-document flag order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// Face on the increasing-column side.
    ColumnPositive,
    /// Face on the decreasing-column side.
    ColumnNegative,
    /// Face on the increasing-height side.
    Top,
    /// Face on the decreasing-height side.
    Bottom,
    /// Face on the decreasing-row side.
    RowNegative,
    /// Face on the increasing-row side.
    RowPositive,
}

impl Face {
    /// Faces ordered as they appear in a six-character direction string.
    pub const ALL: [Face; 6] = [
        Face::ColumnPositive,
        Face::ColumnNegative,
        Face::Top,
        Face::Bottom,
        Face::RowNegative,
        Face::RowPositive,
    ];

    /// Position of the face inside a direction string.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::ColumnPositive => 0,
            Self::ColumnNegative => 1,
            Self::Top => 2,
            Self::Bottom => 3,
            Self::RowNegative => 4,
            Self::RowPositive => 5,
        }
    }
}

/// Way in which an occupant arrives at a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Approach {
    /// A lateral step in the given direction.
    Lateral(Direction),
    /// Arrival through a teleporter, which ignores entry faces.
    Teleport,
}

impl From<Direction> for Approach {
    fn from(direction: Direction) -> Self {
        Self::Lateral(direction)
    }
}

/// Per-face entry permissions of an overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryFaces([bool; 6]);

impl EntryFaces {
    /// Permissions that allow entry through every face.
    pub const OPEN: Self = Self([true; 6]);

    /// Creates permissions from flags in [`Face::ALL`] order.
    #[must_use]
    pub const fn from_flags(flags: [bool; 6]) -> Self {
        Self(flags)
    }

    /// Parses a six-character `0`/`1` direction string.
    #[must_use]
    pub fn parse(flags: &str) -> Option<Self> {
        let mut parsed = [false; 6];
        let mut chars = flags.chars();
        for slot in &mut parsed {
            *slot = match chars.next()? {
                '1' => true,
                '0' => false,
                _ => return None,
            };
        }
        if chars.next().is_some() {
            return None;
        }
        Some(Self(parsed))
    }

    /// Reports whether entry through the face is permitted.
    #[must_use]
    pub const fn allows(&self, face: Face) -> bool {
        self.0[face.index()]
    }

    /// Reports whether the approach may enter the cell.
    #[must_use]
    pub const fn allows_approach(&self, approach: Approach) -> bool {
        match approach {
            Approach::Lateral(direction) => self.allows(direction.entry_face()),
            Approach::Teleport => true,
        }
    }

    /// Renders the permissions back into a direction string.
    #[must_use]
    pub fn to_flag_string(&self) -> String {
        self.0
            .iter()
            .map(|open| if *open { '1' } else { '0' })
            .collect()
    }
}

impl Default for EntryFaces {
    fn default() -> Self {
        Self::OPEN
    }
}

/// Fixed capability flags of an occupant variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Something may stand on top of this occupant.
    pub walkable_surface: bool,
    /// The occupant blocks entry into its cell.
    pub solid: bool,
    /// The player may push the occupant ahead of itself.
    pub pushable: bool,
    /// The player may drag the occupant from behind.
    pub pullable: bool,
}

/// Dense-layer variants without their per-instance data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OccupantKind {
    /// Walkable ground tile.
    Floor,
    /// Solid barrier.
    Wall,
    /// The single controllable actor.
    Player,
    /// Block moved by walking into it.
    PushableBlock,
    /// Block dragged while the player holds the pulling stance.
    PullableBlock,
}

impl OccupantKind {
    /// Every occupant variant.
    pub const ALL: [OccupantKind; 5] = [
        OccupantKind::Floor,
        OccupantKind::Wall,
        OccupantKind::Player,
        OccupantKind::PushableBlock,
        OccupantKind::PullableBlock,
    ];

    /// Capability table for the variant.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        let (walkable_surface, solid, pushable, pullable) = match self {
            Self::Floor => (true, true, false, false),
            Self::Wall => (false, true, false, false),
            Self::Player => (false, true, false, false),
            Self::PushableBlock => (true, true, true, false),
            Self::PullableBlock => (true, true, false, true),
        };
        Capabilities {
            walkable_surface,
            solid,
            pushable,
            pullable,
        }
    }

    /// Reports whether the variant is pushable or pullable.
    #[must_use]
    pub const fn is_movable(self) -> bool {
        let capabilities = self.capabilities();
        capabilities.pushable || capabilities.pullable
    }

    /// Legend name of the variant.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Wall => "wall",
            Self::Player => "player",
            Self::PushableBlock => "pushable",
            Self::PullableBlock => "pullable",
        }
    }
}

/// Action latched on the player between moves.
///
/// Pulling and interacting are mutually exclusive by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStance {
    /// Moves push blocks ahead or simply walk.
    #[default]
    Free,
    /// Moves drag a pullable block from behind.
    Pulling,
    /// The player is engaged with an interaction; moves resolve like `Free`.
    Interacting,
}

impl PlayerStance {
    /// Reports whether the stance drags blocks from behind.
    #[must_use]
    pub const fn is_pulling(self) -> bool {
        matches!(self, Self::Pulling)
    }
}

/// Value held by a dense-layer cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Occupant {
    /// Walkable ground tile.
    Floor,
    /// Solid barrier.
    Wall,
    /// The controllable actor together with its latched stance.
    Player {
        /// Stance held until changed.
        stance: PlayerStance,
    },
    /// Block moved by walking into it.
    PushableBlock {
        /// Optional identifier matched against target requirements.
        label: Option<BlockLabel>,
    },
    /// Block dragged from behind.
    PullableBlock {
        /// Optional identifier matched against target requirements.
        label: Option<BlockLabel>,
    },
}

impl Occupant {
    /// Creates an unlabelled occupant of the requested variant.
    #[must_use]
    pub const fn from_kind(kind: OccupantKind) -> Self {
        match kind {
            OccupantKind::Floor => Self::Floor,
            OccupantKind::Wall => Self::Wall,
            OccupantKind::Player => Self::Player {
                stance: PlayerStance::Free,
            },
            OccupantKind::PushableBlock => Self::PushableBlock { label: None },
            OccupantKind::PullableBlock => Self::PullableBlock { label: None },
        }
    }

    /// Variant of the occupant.
    #[must_use]
    pub const fn kind(&self) -> OccupantKind {
        match self {
            Self::Floor => OccupantKind::Floor,
            Self::Wall => OccupantKind::Wall,
            Self::Player { .. } => OccupantKind::Player,
            Self::PushableBlock { .. } => OccupantKind::PushableBlock,
            Self::PullableBlock { .. } => OccupantKind::PullableBlock,
        }
    }

    /// Capability flags of the occupant's variant.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }

    /// Reports whether the occupant is the player.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self, Self::Player { .. })
    }

    /// Identifier of a movable block, if any.
    #[must_use]
    pub fn label(&self) -> Option<&BlockLabel> {
        match self {
            Self::PushableBlock { label } | Self::PullableBlock { label } => label.as_ref(),
            _ => None,
        }
    }

    /// Replaces the identifier of a movable block.
    ///
    /// Returns `false` without changes when the occupant cannot carry a label.
    pub fn set_label(&mut self, new_label: Option<BlockLabel>) -> bool {
        match self {
            Self::PushableBlock { label } | Self::PullableBlock { label } => {
                *label = new_label;
                true
            }
            _ => false,
        }
    }

    /// Stance of the player, or `None` for other occupants.
    #[must_use]
    pub const fn stance(&self) -> Option<PlayerStance> {
        match self {
            Self::Player { stance } => Some(*stance),
            _ => None,
        }
    }

    /// Latches a stance on the player.
    ///
    /// Returns `false` without changes when the occupant is not the player.
    pub fn set_stance(&mut self, new_stance: PlayerStance) -> bool {
        match self {
            Self::Player { stance } => {
                *stance = new_stance;
                true
            }
            _ => false,
        }
    }
}

/// Ternary satisfaction state of a target space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillState {
    /// No occupant sits on the target.
    #[default]
    Empty,
    /// A movable block with a matching identifier sits on the target.
    Correct,
    /// The occupant is immovable or carries a mismatching identifier.
    Incorrect,
}

/// Overlay that must be filled by a matching movable block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSpace {
    entry: EntryFaces,
    required: Option<BlockLabel>,
    fill: FillState,
}

impl TargetSpace {
    /// Creates an empty target with the given entry permissions and requirement.
    #[must_use]
    pub fn new(entry: EntryFaces, required: Option<BlockLabel>) -> Self {
        Self {
            entry,
            required,
            fill: FillState::Empty,
        }
    }

    /// Entry permissions of the target.
    #[must_use]
    pub const fn entry(&self) -> EntryFaces {
        self.entry
    }

    /// Replaces the entry permissions.
    pub fn set_entry(&mut self, entry: EntryFaces) {
        self.entry = entry;
    }

    /// Identifier a block must carry to fill the target correctly.
    #[must_use]
    pub fn required(&self) -> Option<&BlockLabel> {
        self.required.as_ref()
    }

    /// Replaces the identifier requirement.
    pub fn set_required(&mut self, required: Option<BlockLabel>) {
        self.required = required;
    }

    /// Classification recorded by the most recent scan.
    #[must_use]
    pub const fn fill(&self) -> FillState {
        self.fill
    }

    /// Classifies the provided occupant against this target without mutating it.
    ///
    /// Labels match when both are absent or both are present and equal.
    #[must_use]
    pub fn classify(&self, occupant: Option<&Occupant>) -> FillState {
        match occupant {
            None => FillState::Empty,
            Some(occupant) if !occupant.kind().is_movable() => FillState::Incorrect,
            Some(occupant) if occupant.label() == self.required.as_ref() => FillState::Correct,
            Some(_) => FillState::Incorrect,
        }
    }

    /// Records the classification of the occupant, returning the previous state
    /// when it changed.
    pub fn refresh(&mut self, occupant: Option<&Occupant>) -> Option<FillState> {
        let next = self.classify(occupant);
        if next == self.fill {
            return None;
        }
        let previous = self.fill;
        self.fill = next;
        Some(previous)
    }
}

/// Far end of a teleporter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeleporterLink {
    grid: GridId,
    coord: Coord,
}

impl TeleporterLink {
    /// Creates a link to the cell of the given grid.
    #[must_use]
    pub const fn new(grid: GridId, coord: Coord) -> Self {
        Self { grid, coord }
    }

    /// Destination grid identifier.
    #[must_use]
    pub const fn grid(&self) -> &GridId {
        &self.grid
    }

    /// Destination cell inside the destination grid.
    #[must_use]
    pub const fn coord(&self) -> Coord {
        self.coord
    }
}

/// Overlay that transports whatever occupant sits on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Teleporter {
    entry: EntryFaces,
    destination: TeleporterLink,
    usable: bool,
    occupied: bool,
    destination_occupied: bool,
}

impl Teleporter {
    /// Creates a usable, unoccupied teleporter.
    #[must_use]
    pub const fn new(entry: EntryFaces, destination: TeleporterLink) -> Self {
        Self {
            entry,
            destination,
            usable: true,
            occupied: false,
            destination_occupied: false,
        }
    }

    /// Entry permissions of the teleporter.
    #[must_use]
    pub const fn entry(&self) -> EntryFaces {
        self.entry
    }

    /// Replaces the entry permissions.
    pub fn set_entry(&mut self, entry: EntryFaces) {
        self.entry = entry;
    }

    /// Far end of the teleporter.
    #[must_use]
    pub const fn destination(&self) -> &TeleporterLink {
        &self.destination
    }

    /// Replaces the far end.
    pub fn set_destination(&mut self, destination: TeleporterLink) {
        self.destination = destination;
    }

    /// Reports whether the teleporter passed validation.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.usable
    }

    /// Permanently disables the teleporter. There is no way back.
    pub fn disable(&mut self) {
        self.usable = false;
    }

    /// Reports whether an occupant sat on the teleporter at the last scan.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Records whether an occupant sits on the teleporter.
    pub fn set_occupied(&mut self, occupied: bool) {
        self.occupied = occupied;
    }

    /// Reports whether the far end held an occupant at the last pass.
    #[must_use]
    pub const fn is_destination_occupied(&self) -> bool {
        self.destination_occupied
    }

    /// Records whether the far end holds an occupant.
    pub fn set_destination_occupied(&mut self, occupied: bool) {
        self.destination_occupied = occupied;
    }
}

/// Overlay variants without their per-instance data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayKind {
    /// A [`TargetSpace`].
    Target,
    /// A [`Teleporter`].
    Teleporter,
}

impl OverlayKind {
    /// Legend name of the variant.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Teleporter => "teleporter",
        }
    }
}

/// Sparse-layer value that may share a cell with an occupant.
///
/// Overlays are never solid and never walkable surfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overlay {
    /// A target space.
    Target(TargetSpace),
    /// A teleporter.
    Teleporter(Teleporter),
}

impl Overlay {
    /// Variant of the overlay.
    #[must_use]
    pub const fn kind(&self) -> OverlayKind {
        match self {
            Self::Target(_) => OverlayKind::Target,
            Self::Teleporter(_) => OverlayKind::Teleporter,
        }
    }

    /// Entry permissions shared by both variants.
    #[must_use]
    pub const fn entry(&self) -> EntryFaces {
        match self {
            Self::Target(target) => target.entry(),
            Self::Teleporter(teleporter) => teleporter.entry(),
        }
    }

    /// Reports whether the approach may enter the overlay's cell.
    #[must_use]
    pub const fn allows(&self, approach: Approach) -> bool {
        self.entry().allows_approach(approach)
    }

    /// Borrows the target space, if this overlay is one.
    #[must_use]
    pub const fn as_target(&self) -> Option<&TargetSpace> {
        match self {
            Self::Target(target) => Some(target),
            Self::Teleporter(_) => None,
        }
    }

    /// Mutably borrows the target space, if this overlay is one.
    pub fn as_target_mut(&mut self) -> Option<&mut TargetSpace> {
        match self {
            Self::Target(target) => Some(target),
            Self::Teleporter(_) => None,
        }
    }

    /// Borrows the teleporter, if this overlay is one.
    #[must_use]
    pub const fn as_teleporter(&self) -> Option<&Teleporter> {
        match self {
            Self::Teleporter(teleporter) => Some(teleporter),
            Self::Target(_) => None,
        }
    }

    /// Mutably borrows the teleporter, if this overlay is one.
    pub fn as_teleporter_mut(&mut self) -> Option<&mut Teleporter> {
        match self {
            Self::Teleporter(teleporter) => Some(teleporter),
            Self::Target(_) => None,
        }
    }
}

/// Read-only access to a single grid used by systems.
///
/// Implementors supply storage access; the provided methods encode the
/// support, passability and capability rules shared by every caller.
pub trait GridView {
    /// Declared extent of the grid.
    fn size(&self) -> GridSize;

    /// Occupant stored at the coordinate, if any.
    fn occupant(&self, coord: Coord) -> Option<&Occupant>;

    /// Overlay stored at the coordinate, if any.
    fn overlay(&self, coord: Coord) -> Option<&Overlay>;

    /// Reports whether the coordinate lies inside the grid.
    fn in_bounds(&self, coord: Coord) -> bool {
        self.size().contains(coord)
    }

    /// Reports whether the occupant one level below is a walkable surface.
    fn is_support_walkable(&self, coord: Coord) -> bool {
        if !self.in_bounds(coord) {
            return false;
        }
        coord
            .below()
            .and_then(|below| self.occupant(below))
            .map_or(false, |support| support.capabilities().walkable_surface)
    }

    /// Reports whether an occupant arriving by `approach` may enter the cell.
    ///
    /// The player never blocks its own destination because it departs its
    /// cell in the same step. `ignore_solid` skips the occupant check entirely;
    /// overlay entry faces still apply.
    fn is_passable(&self, coord: Coord, approach: Approach, ignore_solid: bool) -> bool {
        if !self.in_bounds(coord) {
            return false;
        }
        let occupant_clear = match self.occupant(coord) {
            None => true,
            Some(occupant) => {
                ignore_solid || !occupant.capabilities().solid || occupant.is_player()
            }
        };
        if !occupant_clear {
            return false;
        }
        self.overlay(coord)
            .map_or(true, |overlay| overlay.allows(approach))
    }

    /// Reports whether the occupant at the coordinate can be pushed.
    fn is_pushable(&self, coord: Coord) -> bool {
        self.occupant(coord)
            .map_or(false, |occupant| occupant.capabilities().pushable)
    }

    /// Reports whether the occupant at the coordinate can be pulled.
    fn is_pullable(&self, coord: Coord) -> bool {
        self.occupant(coord)
            .map_or(false, |occupant| occupant.capabilities().pullable)
    }

    /// Teleporter overlay at the coordinate, if any.
    fn teleporter(&self, coord: Coord) -> Option<&Teleporter> {
        self.overlay(coord).and_then(Overlay::as_teleporter)
    }
}

/// Reasons a grid mutation may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum GridError {
    /// The coordinate lies outside the grid.
    #[error("coordinate {0} lies outside the grid")]
    OutOfBounds(Coord),
    /// The dense layer already holds an occupant at the coordinate.
    #[error("cell {0} already holds an occupant")]
    CellOccupied(Coord),
    /// The sparse layer already holds an overlay at the coordinate.
    #[error("cell {0} already holds an overlay")]
    OverlayOccupied(Coord),
    /// The grid already contains a player.
    #[error("grid already contains a player")]
    DuplicatePlayer,
    /// The dense layer holds nothing at the coordinate.
    #[error("cell {0} holds no occupant")]
    EmptyCell(Coord),
}

/// Reasons a move request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum MoveRejection {
    /// No player exists in the active grid.
    #[error("no player is present in the active grid")]
    NoPlayer,
    /// The player or a moved block would leave the grid.
    #[error("the move would leave the grid")]
    OutOfBounds,
    /// The destination has no walkable support below it.
    #[error("no walkable support below the destination")]
    UnsupportedBelow,
    /// The destination is blocked or not enterable from this side.
    #[error("the destination is blocked or not enterable from this side")]
    Impassable,
    /// A movable block ahead cannot be pushed.
    #[error("the block ahead cannot be pushed")]
    NotPushable,
    /// The cell behind the pulling player holds nothing pullable.
    #[error("nothing pullable behind the player")]
    NotPullable,
    /// A teleporter on the path leads to an occupied cell.
    #[error("the teleporter destination is occupied")]
    TeleportDestinationOccupied,
}

/// Reasons a transport through a teleporter may fail.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum TransportError {
    /// The referenced grid does not exist.
    #[error("grid '{0}' does not exist")]
    UnknownGrid(GridId),
    /// A coordinate lies outside its grid.
    #[error("coordinate {0} lies outside its grid")]
    OutOfBounds(Coord),
    /// The teleporter was disabled during validation.
    #[error("the teleporter is unusable")]
    TeleportUnusable,
    /// The destination cell already holds an occupant.
    #[error("the teleporter destination is occupied")]
    TeleportDestinationOccupied,
    /// The source cell holds no occupant.
    #[error("nothing stands on the teleporter")]
    NothingToTransport,
    /// The destination grid already holds a player.
    #[error("the destination grid already holds a player")]
    DuplicatePlayer,
}

/// Reasons a teleporter destination fails load-time validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum TeleporterFault {
    /// The destination grid does not exist.
    #[error("destination grid '{0}' does not exist")]
    UnknownGrid(GridId),
    /// The destination coordinate lies outside the destination grid.
    #[error("destination {0} lies outside the destination grid")]
    OutOfBounds(Coord),
    /// The destination has no walkable support below it.
    #[error("destination {0} has no walkable support")]
    UnsupportedBelow(Coord),
    /// The destination holds an occupant that can never move away.
    #[error("destination {0} holds an immovable occupant")]
    Blocked(Coord),
}

/// Reasons a level document fails to load. Any of these aborts the load.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// The document is malformed or misses required fields.
    #[error("invalid level document: {0}")]
    InvalidLevelDocument(String),
    /// The legend is malformed.
    #[error("invalid legend: {0}")]
    InvalidLegend(String),
    /// A layout symbol has no mapping in the legend.
    #[error("legend has no mapping for symbol {symbol:?} in grid '{grid}' at {coord}")]
    LegendMissing {
        /// Symbol found in the layout.
        symbol: char,
        /// Grid whose layout contains the symbol.
        grid: GridId,
        /// Cell the symbol describes.
        coord: Coord,
    },
    /// The legend names a block type the core does not know.
    #[error("legend references unknown block type '{0}'")]
    UnknownKind(String),
    /// The level places more than one player.
    #[error("level places a second player in grid '{grid}' at {coord}")]
    DuplicatePlayer {
        /// Grid that holds the second player.
        grid: GridId,
        /// Cell of the second player.
        coord: Coord,
    },
}
