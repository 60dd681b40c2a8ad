#![allow(dead_code)]

use blockwarp_core::{
    BlockDocument, CellKind, Command, Coord, Direction, Event, GridDocument, GridSizeDocument,
    LayerDocument, Legend, LevelDocument, OccupantKind, OverlayKind, PlayerStance, TargetDocument,
    TeleporterDocument,
};
use blockwarp_world::{apply, load_level, LoadReport, World};

pub fn legend() -> Legend {
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

/// Grid with a full floor on height 1 and `upper` on height 2.
///
/// The last string of `upper` is row 1.
pub fn floored(id: &str, upper: &[&str]) -> GridDocument {
    let rows = u32::try_from(upper.len()).expect("row count fits");
    let columns = u32::try_from(upper[0].chars().count()).expect("column count fits");
    let floor = upper
        .iter()
        .map(|line| "_".repeat(line.chars().count()))
        .collect();
    GridDocument {
        id: id.to_owned(),
        title: format!("Grid {id}"),
        size: GridSizeDocument {
            height: 2,
            columns,
            rows,
        },
        layers: vec![
            LayerDocument {
                layout: floor,
                ..LayerDocument::default()
            },
            LayerDocument {
                layout: upper.iter().map(|line| (*line).to_owned()).collect(),
                ..LayerDocument::default()
            },
        ],
    }
}

pub fn with_target(mut grid: GridDocument, column: u32, row: u32, id: Option<&str>) -> GridDocument {
    grid.layers[1].targets.push(TargetDocument {
        position: [column, row],
        directions: "111111".to_owned(),
        id: id.map(str::to_owned),
    });
    grid
}

pub fn with_block_id(mut grid: GridDocument, column: u32, row: u32, id: &str) -> GridDocument {
    grid.layers[1].blocks.push(BlockDocument {
        position: [column, row],
        id: Some(id.to_owned()),
    });
    grid
}

/// Adds teleporter metadata; `destination` is one-based `[height, column, row]`.
pub fn with_teleporter(
    mut grid: GridDocument,
    column: u32,
    row: u32,
    target_grid: &str,
    destination: [u32; 3],
) -> GridDocument {
    grid.layers[1].teleporters.push(TeleporterDocument {
        position: [column, row],
        directions: "111111".to_owned(),
        target_grid: target_grid.to_owned(),
        target_position: destination,
    });
    grid
}

pub fn level(grids: Vec<GridDocument>) -> LevelDocument {
    LevelDocument { grids }
}

pub fn load(document: &LevelDocument) -> (World, LoadReport, Vec<Event>) {
    let mut world = World::new();
    let mut events = Vec::new();
    let report = load_level(&mut world, document, &legend(), &mut events).expect("level loads");
    (world, report, events)
}

pub fn step(world: &mut World, direction: Direction) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, Command::MovePlayer { direction }, &mut events);
    events
}

pub fn set_stance(world: &mut World, stance: PlayerStance) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, Command::SetStance { stance }, &mut events);
    events
}

/// Zero-based cell on the upper level of a [`floored`] grid.
pub fn upper(column: u32, row: u32) -> Coord {
    Coord::new(1, column, row)
}
