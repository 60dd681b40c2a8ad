//! Plain-text presentation of grids and world events.

use std::fmt::Write as _;

use blockwarp_core::{Coord, Event, FillState, GridView, Occupant, Overlay, PlayerStance};
use blockwarp_world::Grid;

/// Glyph for a cell that holds nothing.
const EMPTY_GLYPH: char = '.';
/// Glyph for an occupant that sits on a correctly filled target.
const SATISFIED_GLYPH: char = '*';

/// Renders every height level of the grid, highest level and highest row first.
#[must_use]
pub(crate) fn render_grid(grid: &Grid) -> String {
    let size = grid.size();
    let mut output = String::new();
    let _ = writeln!(output, "[{}] {}", grid.id(), grid.title());
    for height in (0..size.height()).rev() {
        let _ = writeln!(output, "  level {}", height + 1);
        for row in (0..size.rows()).rev() {
            output.push_str("  ");
            for column in 0..size.columns() {
                let coord = Coord::new(height, column, row);
                output.push(cell_glyph(grid.occupant(coord), grid.overlay(coord)));
            }
            output.push('\n');
        }
    }
    output
}

fn cell_glyph(occupant: Option<&Occupant>, overlay: Option<&Overlay>) -> char {
    let satisfied = overlay
        .and_then(Overlay::as_target)
        .map_or(false, |target| target.fill() == FillState::Correct);
    match (occupant, overlay) {
        (Some(_), _) if satisfied => SATISFIED_GLYPH,
        (Some(occupant), _) => occupant_glyph(occupant),
        (None, Some(overlay)) => overlay_glyph(overlay),
        (None, None) => EMPTY_GLYPH,
    }
}

fn occupant_glyph(occupant: &Occupant) -> char {
    match occupant {
        Occupant::Floor => '_',
        Occupant::Wall => '#',
        Occupant::Player { stance } => match stance {
            PlayerStance::Free => 'P',
            PlayerStance::Pulling => 'Q',
            PlayerStance::Interacting => 'I',
        },
        Occupant::PushableBlock { .. } => 'B',
        Occupant::PullableBlock { .. } => 'L',
    }
}

fn overlay_glyph(overlay: &Overlay) -> char {
    match overlay {
        Overlay::Target(_) => 'T',
        Overlay::Teleporter(teleporter) if teleporter.is_usable() => 'O',
        Overlay::Teleporter(_) => 'x',
    }
}

/// One human-readable line describing the event.
#[must_use]
pub(crate) fn describe(event: &Event) -> String {
    match event {
        Event::LevelLoaded { grid_count, active } => {
            format!("loaded {grid_count} grid(s), active grid '{active}'")
        }
        Event::LevelUnloaded => "level unloaded".to_owned(),
        Event::TeleporterDisabled { grid, coord, fault } => {
            format!("teleporter {coord} in '{grid}' disabled: {fault}")
        }
        Event::StanceChanged { stance } => format!("stance is now {stance:?}"),
        Event::MoveRejected { direction, reason } => {
            format!("cannot move {direction:?}: {reason}")
        }
        Event::OccupantMoved {
            grid,
            from,
            to,
            kind,
        } => format!("{} moved {from} -> {to} in '{grid}'", kind.name()),
        Event::TargetFillChanged {
            grid,
            coord,
            from,
            to,
        } => format!("target {coord} in '{grid}' went {from:?} -> {to:?}"),
        Event::Transported {
            from_grid,
            from,
            to_grid,
            to,
            kind,
        } => format!(
            "{} teleported from '{from_grid}' {from} to '{to_grid}' {to}",
            kind.name()
        ),
        Event::TransportFailed {
            grid,
            coord,
            reason,
        } => format!("teleporter {coord} in '{grid}' failed: {reason}"),
        Event::ActiveGridChanged { from, to } => format!("active grid '{from}' -> '{to}'"),
        Event::WinStateChanged { solved: true } => "every target is filled".to_owned(),
        Event::WinStateChanged { solved: false } => "a target is no longer filled".to_owned(),
    }
}
