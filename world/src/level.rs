//! Loading level documents into the world and writing them back out.

use std::collections::BTreeSet;

use blockwarp_core::{
    BlockDocument, BlockLabel, CellKind, Coord, EntryFaces, Event, GridDocument, GridId, GridSize,
    GridSizeDocument, GridView, LayerDocument, Legend, LevelDocument, LevelError, Occupant,
    Overlay, OverlayKind, TargetDocument, TargetSpace, Teleporter, TeleporterDocument,
    TeleporterLink,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{grid::Grid, teleport, World};

/// Summary of a successful load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of grids that compose the level.
    pub grids: usize,
    /// Number of teleporters collected from every grid.
    pub teleporters: usize,
    /// Number of teleporters disabled by destination validation.
    pub disabled_teleporters: usize,
    /// Whether the level places a player.
    pub has_player: bool,
    /// Whether every target is correctly filled right after loading.
    pub solved: bool,
}

/// Decodes a level document from JSON.
pub fn parse_level(raw: &str) -> Result<LevelDocument, LevelError> {
    decode(raw).map_err(LevelError::InvalidLevelDocument)
}

/// Decodes and validates a legend from JSON.
pub fn parse_legend(raw: &str) -> Result<Legend, LevelError> {
    let legend: Legend = decode(raw).map_err(LevelError::InvalidLegend)?;
    legend.validate()?;
    Ok(legend)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            source.to_string()
        } else {
            format!("at {path}: {source}")
        }
    })
}

/// Replaces the world's level with the one described by `document`.
///
/// The new level is built and validated on the side; on error the world is
/// left exactly as it was. Teleporters whose destinations fail validation are
/// disabled and reported, but do not fail the load.
pub fn load_level(
    world: &mut World,
    document: &LevelDocument,
    legend: &Legend,
    out_events: &mut Vec<Event>,
) -> Result<LoadReport, LevelError> {
    legend.validate()?;
    let grids = build_grids(document, legend)?;

    let mut staged = World::from_grids(grids);
    let mut disabled_events = Vec::new();
    let disabled_teleporters = teleport::validate(&mut staged, &mut disabled_events);
    let mut initial_fills = Vec::new();
    staged.solved = staged.scan(&mut initial_fills);
    teleport::refresh_destinations(&mut staged);

    let active = crate::query::active_grid_id(&staged)
        .cloned()
        .ok_or_else(|| invalid("level declares no grids"))?;
    let report = LoadReport {
        grids: staged.grids.len(),
        teleporters: staged.teleporters.len(),
        disabled_teleporters,
        has_player: crate::query::player(&staged).is_some(),
        solved: staged.solved,
    };

    if crate::query::is_loaded(world) {
        out_events.push(Event::LevelUnloaded);
    }
    *world = staged;
    info!(
        grids = report.grids,
        teleporters = report.teleporters,
        disabled_teleporters = report.disabled_teleporters,
        active = %active,
        solved = report.solved,
        "level_loaded"
    );
    out_events.push(Event::LevelLoaded {
        grid_count: report.grids,
        active,
    });
    out_events.extend(disabled_events);
    Ok(report)
}

fn invalid(message: impl Into<String>) -> LevelError {
    LevelError::InvalidLevelDocument(message.into())
}

fn build_grids(document: &LevelDocument, legend: &Legend) -> Result<Vec<Grid>, LevelError> {
    if document.grids.is_empty() {
        return Err(invalid("level declares no grids"));
    }
    let mut seen = BTreeSet::new();
    let mut player_placed = false;
    let mut grids = Vec::with_capacity(document.grids.len());
    for declaration in &document.grids {
        if !seen.insert(declaration.id.as_str()) {
            return Err(invalid(format!("duplicate grid id '{}'", declaration.id)));
        }
        grids.push(build_grid(declaration, legend, &mut player_placed)?);
    }
    Ok(grids)
}

fn build_grid(
    declaration: &GridDocument,
    legend: &Legend,
    player_placed: &mut bool,
) -> Result<Grid, LevelError> {
    let id = GridId::new(declaration.id.clone());
    let GridSizeDocument {
        height,
        columns,
        rows,
    } = declaration.size;
    if height == 0 || columns == 0 || rows == 0 {
        return Err(invalid(format!("grid '{id}' has a zero dimension")));
    }
    if u32::try_from(declaration.layers.len()).ok() != Some(height) {
        return Err(invalid(format!(
            "grid '{id}' declares height {height} but has {} layers",
            declaration.layers.len()
        )));
    }

    // Shape is checked before allocating so the dense layer is bounded by the input.
    for (level, layer) in (0..height).zip(&declaration.layers) {
        check_layout_shape(&id, level, layer, columns, rows)?;
    }

    let mut grid = Grid::new(id, declaration.title.clone(), GridSize::new(height, columns, rows));
    for (level, layer) in (0..height).zip(&declaration.layers) {
        place_layout(&mut grid, level, layer, legend, player_placed)?;
        apply_targets(&mut grid, level, &layer.targets)?;
        apply_teleporters(&mut grid, level, &layer.teleporters)?;
        apply_blocks(&mut grid, level, &layer.blocks)?;
    }
    Ok(grid)
}

fn check_layout_shape(
    id: &GridId,
    level: u32,
    layer: &LayerDocument,
    columns: u32,
    rows: u32,
) -> Result<(), LevelError> {
    if u32::try_from(layer.layout.len()).ok() != Some(rows) {
        return Err(invalid(format!(
            "grid '{id}' height {} has {} layout rows, expected {rows}",
            level + 1,
            layer.layout.len()
        )));
    }
    for (row, line) in (0..rows).rev().zip(&layer.layout) {
        if u32::try_from(line.chars().count()).ok() != Some(columns) {
            return Err(invalid(format!(
                "grid '{id}' height {} row {} is {line:?}, expected {columns} columns",
                level + 1,
                row + 1
            )));
        }
    }
    Ok(())
}

fn place_layout(
    grid: &mut Grid,
    level: u32,
    layer: &LayerDocument,
    legend: &Legend,
    player_placed: &mut bool,
) -> Result<(), LevelError> {
    let size = grid.size();
    let id = grid.id().clone();

    // The first layout string is the highest row.
    for (row, line) in (0..size.rows()).rev().zip(&layer.layout) {
        for (column, symbol) in (0..size.columns()).zip(line.chars()) {
            let coord = Coord::new(level, column, row);
            let kind = legend
                .kind_for(symbol)
                .ok_or_else(|| LevelError::LegendMissing {
                    symbol,
                    grid: id.clone(),
                    coord,
                })?;
            let placed = match kind {
                CellKind::Empty => Ok(()),
                CellKind::Occupant(kind) => {
                    let occupant = Occupant::from_kind(kind);
                    if occupant.is_player() {
                        if *player_placed {
                            return Err(LevelError::DuplicatePlayer {
                                grid: id.clone(),
                                coord,
                            });
                        }
                        *player_placed = true;
                    }
                    grid.place(coord, occupant)
                }
                CellKind::Overlay(OverlayKind::Target) => grid.place(
                    coord,
                    Overlay::Target(TargetSpace::new(EntryFaces::OPEN, None)),
                ),
                // The destination is filled in from the teleporter metadata.
                CellKind::Overlay(OverlayKind::Teleporter) => grid.place(
                    coord,
                    Overlay::Teleporter(Teleporter::new(
                        EntryFaces::OPEN,
                        TeleporterLink::new(GridId::new(""), coord),
                    )),
                ),
            };
            placed.map_err(|error| invalid(format!("grid '{id}': {error}")))?;
        }
    }
    Ok(())
}

fn metadata_coord(
    grid: &Grid,
    level: u32,
    position: [u32; 2],
    what: &str,
) -> Result<Coord, LevelError> {
    let [column, row] = position;
    Coord::from_one_based(level + 1, column, row)
        .filter(|coord| grid.in_bounds(*coord))
        .ok_or_else(|| {
            invalid(format!(
                "{what} position {position:?} on height {} lies outside grid '{}'",
                level + 1,
                grid.id()
            ))
        })
}

fn entry_faces(grid: &Grid, flags: &str) -> Result<EntryFaces, LevelError> {
    EntryFaces::parse(flags).ok_or_else(|| {
        invalid(format!(
            "grid '{}': direction string {flags:?} must be six 0/1 characters",
            grid.id()
        ))
    })
}

fn apply_targets(
    grid: &mut Grid,
    level: u32,
    targets: &[TargetDocument],
) -> Result<(), LevelError> {
    let id = grid.id().clone();
    for target in targets {
        let coord = metadata_coord(grid, level, target.position, "target")?;
        let entry = entry_faces(grid, &target.directions)?;
        match grid.overlay_mut(coord).and_then(Overlay::as_target_mut) {
            Some(space) => {
                space.set_entry(entry);
                space.set_required(target.id.clone().map(BlockLabel::new));
            }
            None => warn!(grid = %id, coord = %coord, "target_metadata_skipped"),
        }
    }
    Ok(())
}

fn apply_teleporters(
    grid: &mut Grid,
    level: u32,
    teleporters: &[TeleporterDocument],
) -> Result<(), LevelError> {
    let id = grid.id().clone();
    for declaration in teleporters {
        let coord = metadata_coord(grid, level, declaration.position, "teleporter")?;
        let entry = entry_faces(grid, &declaration.directions)?;
        let [height, column, row] = declaration.target_position;
        let destination = Coord::from_one_based(height, column, row).ok_or_else(|| {
            invalid(format!(
                "grid '{id}': teleporter destination {:?} must be one-based",
                declaration.target_position
            ))
        })?;
        match grid.overlay_mut(coord).and_then(Overlay::as_teleporter_mut) {
            Some(teleporter) => {
                teleporter.set_entry(entry);
                teleporter.set_destination(TeleporterLink::new(
                    GridId::new(declaration.target_grid.clone()),
                    destination,
                ));
            }
            None => warn!(grid = %id, coord = %coord, "teleporter_metadata_skipped"),
        }
    }
    Ok(())
}

fn apply_blocks(grid: &mut Grid, level: u32, blocks: &[BlockDocument]) -> Result<(), LevelError> {
    let id = grid.id().clone();
    for block in blocks {
        let coord = metadata_coord(grid, level, block.position, "block")?;
        match grid.occupant_mut(coord) {
            Some(occupant) if occupant.kind().is_movable() => {
                let _ = occupant.set_label(block.id.clone().map(BlockLabel::new));
            }
            _ => warn!(grid = %id, coord = %coord, "block_metadata_skipped"),
        }
    }
    Ok(())
}

/// Writes the current world back into a level document.
///
/// A cell holding both an overlay and an occupant is written with the
/// overlay's symbol.
pub fn export_level(world: &World, legend: &Legend) -> Result<LevelDocument, LevelError> {
    let grids = world
        .grids
        .iter()
        .map(|grid| export_grid(grid, legend))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LevelDocument { grids })
}

fn export_grid(grid: &Grid, legend: &Legend) -> Result<GridDocument, LevelError> {
    let size = grid.size();
    let layers = (0..size.height())
        .map(|level| export_layer(grid, legend, level))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GridDocument {
        id: grid.id().as_str().to_owned(),
        title: grid.title().to_owned(),
        size: GridSizeDocument {
            height: size.height(),
            columns: size.columns(),
            rows: size.rows(),
        },
        layers,
    })
}

fn export_layer(grid: &Grid, legend: &Legend, level: u32) -> Result<LayerDocument, LevelError> {
    let size = grid.size();
    let mut layer = LayerDocument::default();
    for row in (0..size.rows()).rev() {
        let mut line = String::new();
        for column in 0..size.columns() {
            let coord = Coord::new(level, column, row);
            let overlay = grid.overlay(coord);
            let occupant = grid.occupant(coord);
            let kind = match (overlay, occupant) {
                (Some(overlay), _) => CellKind::Overlay(overlay.kind()),
                (None, Some(occupant)) => CellKind::Occupant(occupant.kind()),
                (None, None) => CellKind::Empty,
            };
            let symbol = legend.symbol_for(kind).ok_or_else(|| {
                LevelError::InvalidLegend(format!("no symbol for '{}'", kind.name()))
            })?;
            line.push(symbol);

            let position = [column + 1, row + 1];
            match overlay {
                Some(Overlay::Target(target)) => layer.targets.push(TargetDocument {
                    position,
                    directions: target.entry().to_flag_string(),
                    id: target.required().map(|label| label.as_str().to_owned()),
                }),
                Some(Overlay::Teleporter(teleporter)) => {
                    let link = teleporter.destination();
                    layer.teleporters.push(TeleporterDocument {
                        position,
                        directions: teleporter.entry().to_flag_string(),
                        target_grid: link.grid().as_str().to_owned(),
                        target_position: link.coord().to_one_based(),
                    });
                }
                None => {
                    if let Some(label) = occupant.and_then(Occupant::label) {
                        layer.blocks.push(BlockDocument {
                            position,
                            id: Some(label.as_str().to_owned()),
                        });
                    }
                }
            }
        }
        layer.layout.push(line);
    }
    Ok(layer)
}
