#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Blockwarp.
//!
//! The world owns every grid of the loaded level, tracks which grid receives
//! input, and is the only place where occupants are relocated. Mutation goes
//! through [`apply`] and [`load_level`]; everything else reads through
//! [`query`].

mod grid;
mod level;
mod teleport;

use blockwarp_core::{
    Command, Coord, Direction, Event, GridId, GridView, MoveRejection, Occupant, PlayerStance,
};
use blockwarp_system_movement::{plan_move, MovePlan};
use tracing::{debug, info, warn};

pub use grid::{FillTransition, Grid, Placement};
pub use level::{export_level, load_level, parse_legend, parse_level, LoadReport};
pub use teleport::{teleport_from, transport};

/// Every grid of the loaded level plus the state shared between them.
#[derive(Debug, Default)]
pub struct World {
    grids: Vec<Grid>,
    active: Option<usize>,
    teleporters: Vec<(usize, Coord)>,
    solved: bool,
}

impl World {
    /// Creates an empty world with no level loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn from_grids(grids: Vec<Grid>) -> Self {
        let active = grids
            .iter()
            .position(|grid| grid.player().is_some())
            .or_else(|| (!grids.is_empty()).then_some(0));
        let teleporters = grids
            .iter()
            .enumerate()
            .flat_map(|(index, grid)| {
                grid.teleporter_coords()
                    .into_iter()
                    .map(move |coord| (index, coord))
            })
            .collect();
        Self {
            grids,
            active,
            teleporters,
            solved: false,
        }
    }

    fn grid_index(&self, id: &GridId) -> Option<usize> {
        self.grids.iter().position(|grid| grid.id() == id)
    }

    fn player_mut(&mut self) -> Option<&mut Occupant> {
        let grid = self.grids.get_mut(self.active?)?;
        let coord = grid.player()?;
        grid.occupant_mut(coord)
    }

    fn plan(&self, direction: Direction) -> Result<(usize, MovePlan), MoveRejection> {
        let active = self.active.ok_or(MoveRejection::NoPlayer)?;
        let grid = self.grids.get(active).ok_or(MoveRejection::NoPlayer)?;
        let player = grid.player().ok_or(MoveRejection::NoPlayer)?;
        let stance = grid
            .occupant(player)
            .and_then(Occupant::stance)
            .unwrap_or_default();
        let grids = &self.grids;
        plan_move(grid, player, stance, direction, |link| {
            teleport::is_link_blocked(grids, link)
        })
        .map(|plan| (active, plan))
    }

    fn move_player(&mut self, direction: Direction, out_events: &mut Vec<Event>) {
        let (active, plan) = match self.plan(direction) {
            Ok(planned) => planned,
            Err(reason) => {
                debug!(direction = ?direction, reason = %reason, "move_rejected");
                out_events.push(Event::MoveRejected { direction, reason });
                return;
            }
        };

        let grid = &mut self.grids[active];
        if let Err(error) = grid.swap_all(plan.swaps()) {
            warn!(direction = ?direction, error = %error, "move_plan_rejected_by_grid");
            out_events.push(Event::MoveRejected {
                direction,
                reason: MoveRejection::OutOfBounds,
            });
            return;
        }
        for relocation in plan.relocations() {
            if let Some(occupant) = grid.occupant(relocation.to) {
                out_events.push(Event::OccupantMoved {
                    grid: grid.id().clone(),
                    from: relocation.from,
                    to: relocation.to,
                    kind: occupant.kind(),
                });
            }
        }
        self.settle(out_events);
    }

    fn set_stance(&mut self, stance: PlayerStance, out_events: &mut Vec<Event>) {
        let Some(player) = self.player_mut() else {
            debug!(stance = ?stance, "stance_ignored_without_player");
            return;
        };
        if player.stance() == Some(stance) {
            return;
        }
        let _ = player.set_stance(stance);
        out_events.push(Event::StanceChanged { stance });
    }

    fn unload(&mut self, out_events: &mut Vec<Event>) {
        if self.grids.is_empty() {
            return;
        }
        for grid in &mut self.grids {
            grid.clear();
        }
        info!(grids = self.grids.len(), "level_unloaded");
        *self = Self::default();
        out_events.push(Event::LevelUnloaded);
    }

    /// Rescans every grid, runs the teleport pass, and publishes win changes.
    fn settle(&mut self, out_events: &mut Vec<Event>) {
        let mut solved = self.scan(out_events);
        if teleport::run_pass(self, out_events) {
            solved = self.scan(out_events);
        }
        if solved != self.solved {
            self.solved = solved;
            info!(solved, "win_state_changed");
            out_events.push(Event::WinStateChanged { solved });
        }
    }

    fn scan(&mut self, out_events: &mut Vec<Event>) -> bool {
        let mut solved = true;
        let mut transitions = Vec::new();
        for grid in &mut self.grids {
            transitions.clear();
            solved &= grid.scan_win_state(&mut transitions);
            for transition in &transitions {
                out_events.push(Event::TargetFillChanged {
                    grid: grid.id().clone(),
                    coord: transition.coord,
                    from: transition.from,
                    to: transition.to,
                });
            }
        }
        solved
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { direction } => world.move_player(direction, out_events),
        Command::SetStance { stance } => world.set_stance(stance, out_events),
        Command::UnloadLevel => world.unload(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use blockwarp_core::{
        Coord, GridId, GridSize, GridView, Occupant, Overlay, PlayerStance, Teleporter,
    };

    use super::{Grid, World};

    /// Where the player stands and what stance it holds.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct PlayerLocation {
        /// Grid that holds the player.
        pub grid: GridId,
        /// Cell the player occupies.
        pub coord: Coord,
        /// Stance latched on the player.
        pub stance: PlayerStance,
    }

    /// Reports whether a level is loaded.
    #[must_use]
    pub fn is_loaded(world: &World) -> bool {
        !world.grids.is_empty()
    }

    /// Identifier of the grid that receives input.
    #[must_use]
    pub fn active_grid_id(world: &World) -> Option<&GridId> {
        active_grid(world).map(Grid::id)
    }

    /// Grid that receives input.
    #[must_use]
    pub fn active_grid(world: &World) -> Option<&Grid> {
        world.grids.get(world.active?)
    }

    /// Grid with the provided identifier.
    #[must_use]
    pub fn grid<'a>(world: &'a World, id: &GridId) -> Option<&'a Grid> {
        world.grids.iter().find(|grid| grid.id() == id)
    }

    /// Every grid in document order.
    pub fn grids(world: &World) -> impl Iterator<Item = &Grid> + '_ {
        world.grids.iter()
    }

    /// Occupant at a cell of the named grid.
    #[must_use]
    pub fn occupant<'a>(world: &'a World, id: &GridId, coord: Coord) -> Option<&'a Occupant> {
        grid(world, id)?.occupant(coord)
    }

    /// Overlay at a cell of the named grid.
    #[must_use]
    pub fn overlay<'a>(world: &'a World, id: &GridId, coord: Coord) -> Option<&'a Overlay> {
        grid(world, id)?.overlay(coord)
    }

    /// Declared extent of the named grid.
    #[must_use]
    pub fn grid_size(world: &World, id: &GridId) -> Option<GridSize> {
        grid(world, id).map(GridView::size)
    }

    /// Whether every target of the named grid was correctly filled at the last scan.
    #[must_use]
    pub fn is_grid_solved(world: &World, id: &GridId) -> Option<bool> {
        grid(world, id).map(Grid::is_solved)
    }

    /// Whether every target in every grid is correctly filled.
    #[must_use]
    pub fn is_solved(world: &World) -> bool {
        world.solved
    }

    /// Location and stance of the player, if a player exists.
    #[must_use]
    pub fn player(world: &World) -> Option<PlayerLocation> {
        world.grids.iter().find_map(|grid| {
            let coord = grid.player()?;
            let stance = grid.occupant(coord)?.stance()?;
            Some(PlayerLocation {
                grid: grid.id().clone(),
                coord,
                stance,
            })
        })
    }

    /// Every teleporter collected at load time, with its owning grid.
    pub fn teleporters(world: &World) -> impl Iterator<Item = (&GridId, Coord, &Teleporter)> + '_ {
        world.teleporters.iter().filter_map(|&(index, coord)| {
            let grid = world.grids.get(index)?;
            Some((grid.id(), coord, grid.teleporter(coord)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_without_a_level_are_rejected() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::Up,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::MoveRejected {
                direction: Direction::Up,
                reason: MoveRejection::NoPlayer,
            }]
        );
    }

    #[test]
    fn stance_without_player_is_ignored() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SetStance {
                stance: PlayerStance::Pulling,
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert!(query::player(&world).is_none());
    }

    #[test]
    fn unloading_an_empty_world_is_silent() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(&mut world, Command::UnloadLevel, &mut events);

        assert!(events.is_empty());
        assert!(!query::is_loaded(&world));
    }
}
