//! Teleporter validation and cross-grid transport.

use blockwarp_core::{
    Coord, Event, GridId, GridView, OccupantKind, Overlay, TeleporterFault, TeleporterLink,
    TransportError,
};
use tracing::{debug, warn};

use crate::{grid::Grid, World};

/// Moves the occupant at `from` in `from_grid` to `to` in `to_grid`.
///
/// The occupant value travels unchanged, so a player keeps its stance, and a
/// transported player makes the destination grid active. Nothing is mutated
/// when the transport fails.
pub fn transport(
    world: &mut World,
    from_grid: &GridId,
    from: Coord,
    to_grid: &GridId,
    to: Coord,
    out_events: &mut Vec<Event>,
) -> Result<OccupantKind, TransportError> {
    let source = world
        .grid_index(from_grid)
        .ok_or_else(|| TransportError::UnknownGrid(from_grid.clone()))?;
    let target = world
        .grid_index(to_grid)
        .ok_or_else(|| TransportError::UnknownGrid(to_grid.clone()))?;
    relocate(world, source, from, target, to, out_events)
}

/// Sends whatever stands on the teleporter at `coord` of `grid` to its far end.
///
/// A transported player makes the destination grid active. Returns the
/// arrival cell.
pub fn teleport_from(
    world: &mut World,
    grid: &GridId,
    coord: Coord,
    out_events: &mut Vec<Event>,
) -> Result<Coord, TransportError> {
    let source = world
        .grid_index(grid)
        .ok_or_else(|| TransportError::UnknownGrid(grid.clone()))?;
    send(world, source, coord, out_events).map(|(_, arrival)| arrival)
}

fn send(
    world: &mut World,
    source: usize,
    coord: Coord,
    out_events: &mut Vec<Event>,
) -> Result<(usize, Coord), TransportError> {
    let grid = &world.grids[source];
    if !grid.in_bounds(coord) {
        return Err(TransportError::OutOfBounds(coord));
    }
    let link = grid
        .teleporter(coord)
        .filter(|teleporter| teleporter.is_usable())
        .map(|teleporter| teleporter.destination().clone())
        .ok_or(TransportError::TeleportUnusable)?;
    let target = world
        .grid_index(link.grid())
        .ok_or_else(|| TransportError::UnknownGrid(link.grid().clone()))?;

    let _ = relocate(world, source, coord, target, link.coord(), out_events)?;
    Ok((target, link.coord()))
}

fn relocate(
    world: &mut World,
    source: usize,
    from: Coord,
    target: usize,
    to: Coord,
    out_events: &mut Vec<Event>,
) -> Result<OccupantKind, TransportError> {
    let kind = move_occupant(&mut world.grids, source, from, target, to)?;
    let from_grid = world.grids[source].id().clone();
    let to_grid = world.grids[target].id().clone();
    debug!(
        from_grid = %from_grid,
        from = %from,
        to_grid = %to_grid,
        to = %to,
        kind = ?kind,
        "occupant_transported"
    );
    out_events.push(Event::Transported {
        from_grid,
        from,
        to_grid: to_grid.clone(),
        to,
        kind,
    });

    if kind == OccupantKind::Player {
        let previous = world.active.replace(target);
        if let Some(previous) = previous.filter(|previous| *previous != target) {
            out_events.push(Event::ActiveGridChanged {
                from: world.grids[previous].id().clone(),
                to: to_grid,
            });
        }
    }
    Ok(kind)
}

fn move_occupant(
    grids: &mut [Grid],
    source: usize,
    from: Coord,
    target: usize,
    to: Coord,
) -> Result<OccupantKind, TransportError> {
    if !grids[source].in_bounds(from) {
        return Err(TransportError::OutOfBounds(from));
    }
    if !grids[target].in_bounds(to) {
        return Err(TransportError::OutOfBounds(to));
    }
    if grids[target].occupant(to).is_some() {
        return Err(TransportError::TeleportDestinationOccupied);
    }
    let kind = grids[source]
        .occupant(from)
        .map(|occupant| occupant.kind())
        .ok_or(TransportError::NothingToTransport)?;
    if kind == OccupantKind::Player && source != target && grids[target].player().is_some() {
        return Err(TransportError::DuplicatePlayer);
    }

    let occupant = grids[source]
        .remove(from)
        .map_err(|_| TransportError::NothingToTransport)?;
    grids[target]
        .place(to, occupant)
        .map_err(|_| TransportError::TeleportDestinationOccupied)?;
    Ok(kind)
}

/// Transports every occupant standing on a usable teleporter.
///
/// Occupants that arrive during the pass are not sent on again until the next
/// pass. Returns whether anything moved.
pub(crate) fn run_pass(world: &mut World, out_events: &mut Vec<Event>) -> bool {
    let mut arrivals: Vec<(usize, Coord)> = Vec::new();
    let pads = world.teleporters.clone();
    for (grid_index, coord) in pads {
        if arrivals.contains(&(grid_index, coord)) {
            continue;
        }
        let grid = &mut world.grids[grid_index];
        let occupied = grid.occupant(coord).is_some();
        let Some(teleporter) = grid
            .overlay_mut(coord)
            .and_then(Overlay::as_teleporter_mut)
        else {
            continue;
        };
        teleporter.set_occupied(occupied);
        if !occupied || !teleporter.is_usable() {
            continue;
        }

        match send(world, grid_index, coord, out_events) {
            Ok(arrival) => arrivals.push(arrival),
            Err(reason) => {
                let grid = world.grids[grid_index].id().clone();
                warn!(grid = %grid, coord = %coord, reason = %reason, "transport_failed");
                out_events.push(Event::TransportFailed {
                    grid,
                    coord,
                    reason,
                });
            }
        }
    }
    refresh_destinations(world);
    !arrivals.is_empty()
}

/// Records on every teleporter whether its far end currently holds an occupant.
pub(crate) fn refresh_destinations(world: &mut World) {
    let states: Vec<(usize, Coord, bool)> = world
        .teleporters
        .iter()
        .filter_map(|&(grid_index, coord)| {
            let link = world.grids[grid_index].teleporter(coord)?.destination();
            Some((grid_index, coord, is_link_blocked(&world.grids, link)))
        })
        .collect();
    for (grid_index, coord, occupied) in states {
        if let Some(teleporter) = world.grids[grid_index]
            .overlay_mut(coord)
            .and_then(Overlay::as_teleporter_mut)
        {
            teleporter.set_destination_occupied(occupied);
        }
    }
}

/// Reports whether the far end of a link currently holds an occupant.
///
/// Links into missing grids are never blocked; validation disables them.
pub(crate) fn is_link_blocked(grids: &[Grid], link: &TeleporterLink) -> bool {
    grids
        .iter()
        .find(|grid| grid.id() == link.grid())
        .map_or(false, |grid| grid.occupant(link.coord()).is_some())
}

/// Disables every teleporter whose destination is unusable.
///
/// Returns the number of teleporters disabled.
pub(crate) fn validate(world: &mut World, out_events: &mut Vec<Event>) -> usize {
    let faults: Vec<(usize, Coord, TeleporterFault)> = world
        .teleporters
        .iter()
        .filter_map(|&(grid_index, coord)| {
            let teleporter = world.grids[grid_index].teleporter(coord)?;
            destination_fault(&world.grids, teleporter.destination())
                .map(|fault| (grid_index, coord, fault))
        })
        .collect();

    for (grid_index, coord, fault) in &faults {
        let grid = &mut world.grids[*grid_index];
        if let Some(teleporter) = grid
            .overlay_mut(*coord)
            .and_then(Overlay::as_teleporter_mut)
        {
            teleporter.disable();
        }
        warn!(grid = %grid.id(), coord = %coord, fault = %fault, "teleporter_disabled");
        out_events.push(Event::TeleporterDisabled {
            grid: grid.id().clone(),
            coord: *coord,
            fault: fault.clone(),
        });
    }
    faults.len()
}

fn destination_fault(grids: &[Grid], link: &TeleporterLink) -> Option<TeleporterFault> {
    let Some(grid) = grids.iter().find(|grid| grid.id() == link.grid()) else {
        return Some(TeleporterFault::UnknownGrid(link.grid().clone()));
    };
    let coord = link.coord();
    if !grid.in_bounds(coord) {
        return Some(TeleporterFault::OutOfBounds(coord));
    }
    if !grid.is_support_walkable(coord) {
        return Some(TeleporterFault::UnsupportedBelow(coord));
    }
    match grid.occupant(coord) {
        Some(occupant) if !occupant.kind().is_movable() => Some(TeleporterFault::Blocked(coord)),
        _ => None,
    }
}
