#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that resolves a player move into swaps.
//!
//! The resolver never mutates a grid. It inspects a [`GridView`] and either
//! returns a [`MovePlan`] listing the swaps the world must apply, in order, or
//! a [`MoveRejection`] explaining why nothing may change.

use blockwarp_core::{
    Approach, Coord, Direction, GridView, MoveRejection, PlayerStance, TeleporterLink,
};

/// Shape of a successfully resolved move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKind {
    /// The player stepped into a free cell.
    Walk,
    /// The player shoved a pushable block one cell ahead.
    Push,
    /// The player dragged a pullable block from behind.
    Pull,
}

/// A single occupant relocation produced by a plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Relocation {
    /// Cell the occupant leaves.
    pub from: Coord,
    /// Cell the occupant reaches.
    pub to: Coord,
}

/// Ordered swaps that realise an accepted move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovePlan {
    kind: MoveKind,
    swaps: Vec<(Coord, Coord)>,
    relocations: Vec<Relocation>,
}

impl MovePlan {
    fn walk(player: Coord, destination: Coord) -> Self {
        Self {
            kind: MoveKind::Walk,
            swaps: vec![(player, destination)],
            relocations: vec![Relocation {
                from: player,
                to: destination,
            }],
        }
    }

    fn push(player: Coord, destination: Coord, block_to: Coord) -> Self {
        Self {
            kind: MoveKind::Push,
            swaps: vec![(block_to, destination), (player, destination)],
            relocations: vec![
                Relocation {
                    from: destination,
                    to: block_to,
                },
                Relocation {
                    from: player,
                    to: destination,
                },
            ],
        }
    }

    fn pull(player: Coord, destination: Coord, behind: Coord) -> Self {
        Self {
            kind: MoveKind::Pull,
            swaps: vec![(player, destination), (behind, player)],
            relocations: vec![
                Relocation {
                    from: player,
                    to: destination,
                },
                Relocation {
                    from: behind,
                    to: player,
                },
            ],
        }
    }

    /// Shape of the move.
    #[must_use]
    pub const fn kind(&self) -> MoveKind {
        self.kind
    }

    /// Swaps to apply, in order.
    #[must_use]
    pub fn swaps(&self) -> &[(Coord, Coord)] {
        &self.swaps
    }

    /// Occupant relocations the swaps produce, in application order.
    #[must_use]
    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    /// Cell the player occupies once the plan is applied.
    #[must_use]
    pub fn player_destination(&self) -> Coord {
        match self.kind {
            MoveKind::Push => self.relocations[1].to,
            MoveKind::Walk | MoveKind::Pull => self.relocations[0].to,
        }
    }
}

/// Resolves a single lateral move of the player.
///
/// `is_link_blocked` answers whether the far end of a teleporter is currently
/// blocked; the resolver consults it for teleporters the move would land an
/// occupant on, since those cells lie in other grids it cannot see.
pub fn plan_move<V, F>(
    grid: &V,
    player: Coord,
    stance: PlayerStance,
    direction: Direction,
    is_link_blocked: F,
) -> Result<MovePlan, MoveRejection>
where
    V: GridView + ?Sized,
    F: Fn(&TeleporterLink) -> bool,
{
    let destination = lateral(grid, player, direction, 1)?;
    if !grid.is_support_walkable(destination) {
        return Err(MoveRejection::UnsupportedBelow);
    }

    if stance.is_pulling() {
        plan_pull(grid, player, destination, direction, &is_link_blocked)
    } else if grid.is_pushable(destination) {
        plan_push(grid, player, destination, direction, &is_link_blocked)
    } else {
        plan_walk(grid, player, destination, direction, &is_link_blocked)
    }
}

fn plan_walk<V, F>(
    grid: &V,
    player: Coord,
    destination: Coord,
    direction: Direction,
    is_link_blocked: &F,
) -> Result<MovePlan, MoveRejection>
where
    V: GridView + ?Sized,
    F: Fn(&TeleporterLink) -> bool,
{
    if !grid.is_passable(destination, Approach::Lateral(direction), false) {
        let movable_ahead = grid
            .occupant(destination)
            .map_or(false, |occupant| occupant.kind().is_movable());
        return Err(if movable_ahead {
            MoveRejection::NotPushable
        } else {
            MoveRejection::Impassable
        });
    }
    ensure_teleporter_clear(grid, destination, is_link_blocked)?;
    Ok(MovePlan::walk(player, destination))
}

fn plan_push<V, F>(
    grid: &V,
    player: Coord,
    destination: Coord,
    direction: Direction,
    is_link_blocked: &F,
) -> Result<MovePlan, MoveRejection>
where
    V: GridView + ?Sized,
    F: Fn(&TeleporterLink) -> bool,
{
    let approach = Approach::Lateral(direction);
    let block_to = lateral(grid, player, direction, 2)?;
    if !grid.is_support_walkable(block_to) {
        return Err(MoveRejection::UnsupportedBelow);
    }
    if !grid.is_passable(block_to, approach, false) {
        return Err(MoveRejection::Impassable);
    }
    ensure_teleporter_clear(grid, block_to, is_link_blocked)?;
    Ok(MovePlan::push(player, destination, block_to))
}

fn plan_pull<V, F>(
    grid: &V,
    player: Coord,
    destination: Coord,
    direction: Direction,
    is_link_blocked: &F,
) -> Result<MovePlan, MoveRejection>
where
    V: GridView + ?Sized,
    F: Fn(&TeleporterLink) -> bool,
{
    let behind = lateral(grid, player, direction.opposite(), 1)?;
    if !grid.is_pullable(behind) {
        return Err(MoveRejection::NotPullable);
    }
    let approach = Approach::Lateral(direction);
    if !grid.is_passable(player, approach, false) || !grid.is_passable(destination, approach, false)
    {
        return Err(MoveRejection::Impassable);
    }
    ensure_teleporter_clear(grid, destination, is_link_blocked)?;
    Ok(MovePlan::pull(player, destination, behind))
}

fn lateral<V>(
    grid: &V,
    from: Coord,
    direction: Direction,
    distance: u32,
) -> Result<Coord, MoveRejection>
where
    V: GridView + ?Sized,
{
    from.step(direction, distance)
        .filter(|coord| grid.in_bounds(*coord))
        .ok_or(MoveRejection::OutOfBounds)
}

fn ensure_teleporter_clear<V, F>(
    grid: &V,
    coord: Coord,
    is_link_blocked: &F,
) -> Result<(), MoveRejection>
where
    V: GridView + ?Sized,
    F: Fn(&TeleporterLink) -> bool,
{
    match grid.teleporter(coord) {
        Some(teleporter) if teleporter.is_usable() && is_link_blocked(teleporter.destination()) => {
            Err(MoveRejection::TeleportDestinationOccupied)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use blockwarp_core::{
        BlockLabel, EntryFaces, GridId, GridSize, Occupant, Overlay, TargetSpace, Teleporter,
    };

    /// Two-level grid with floor on the ground level and free space above.
    struct FakeGrid {
        size: GridSize,
        occupants: HashMap<Coord, Occupant>,
        overlays: HashMap<Coord, Overlay>,
    }

    impl FakeGrid {
        fn floored(columns: u32, rows: u32) -> Self {
            let size = GridSize::new(2, columns, rows);
            let occupants = size
                .coords()
                .filter(|coord| coord.height() == 0)
                .map(|coord| (coord, Occupant::Floor))
                .collect();
            Self {
                size,
                occupants,
                overlays: HashMap::new(),
            }
        }

        fn with(mut self, column: u32, row: u32, occupant: Occupant) -> Self {
            let _ = self.occupants.insert(Coord::new(1, column, row), occupant);
            self
        }

        fn with_overlay(mut self, column: u32, row: u32, overlay: Overlay) -> Self {
            let _ = self.overlays.insert(Coord::new(1, column, row), overlay);
            self
        }

        fn without_floor(mut self, column: u32, row: u32) -> Self {
            let _ = self.occupants.remove(&Coord::new(0, column, row));
            self
        }
    }

    impl GridView for FakeGrid {
        fn size(&self) -> GridSize {
            self.size
        }

        fn occupant(&self, coord: Coord) -> Option<&Occupant> {
            self.occupants.get(&coord)
        }

        fn overlay(&self, coord: Coord) -> Option<&Overlay> {
            self.overlays.get(&coord)
        }
    }

    fn at(column: u32, row: u32) -> Coord {
        Coord::new(1, column, row)
    }

    fn pushable() -> Occupant {
        Occupant::PushableBlock { label: None }
    }

    fn pullable() -> Occupant {
        Occupant::PullableBlock {
            label: Some(BlockLabel::from("crate")),
        }
    }

    fn teleporter_to(grid: &str) -> Overlay {
        Overlay::Teleporter(Teleporter::new(
            EntryFaces::OPEN,
            TeleporterLink::new(GridId::from(grid), Coord::new(1, 0, 0)),
        ))
    }

    fn never_blocked(_: &TeleporterLink) -> bool {
        false
    }

    fn always_blocked(_: &TeleporterLink) -> bool {
        true
    }

    #[test]
    fn walks_into_supported_free_cell() {
        let grid = FakeGrid::floored(3, 3);
        let plan = plan_move(
            &grid,
            at(1, 1),
            PlayerStance::Free,
            Direction::Right,
            never_blocked,
        )
        .expect("walk accepted");

        assert_eq!(plan.kind(), MoveKind::Walk);
        assert_eq!(plan.swaps(), &[(at(1, 1), at(2, 1))]);
        assert_eq!(plan.player_destination(), at(2, 1));
    }

    #[test]
    fn up_increases_row_index() {
        let grid = FakeGrid::floored(3, 3);
        let plan = plan_move(
            &grid,
            at(1, 1),
            PlayerStance::Free,
            Direction::Up,
            never_blocked,
        )
        .expect("walk accepted");
        assert_eq!(plan.player_destination(), at(1, 2));
    }

    #[test]
    fn rejects_leaving_the_grid() {
        let grid = FakeGrid::floored(3, 3);
        for (player, direction) in [
            (at(0, 1), Direction::Left),
            (at(2, 1), Direction::Right),
            (at(1, 0), Direction::Down),
            (at(1, 2), Direction::Up),
        ] {
            assert_eq!(
                plan_move(&grid, player, PlayerStance::Free, direction, never_blocked),
                Err(MoveRejection::OutOfBounds),
                "{direction:?} from {player} should leave the grid"
            );
        }
    }

    #[test]
    fn rejects_destination_without_support() {
        let grid = FakeGrid::floored(3, 3).without_floor(2, 1);
        assert_eq!(
            plan_move(
                &grid,
                at(1, 1),
                PlayerStance::Free,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::UnsupportedBelow)
        );
    }

    #[test]
    fn rejects_walking_into_walls() {
        let grid = FakeGrid::floored(3, 3).with(2, 1, Occupant::Wall);
        assert_eq!(
            plan_move(
                &grid,
                at(1, 1),
                PlayerStance::Free,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::Impassable)
        );
    }

    #[test]
    fn pullable_block_cannot_be_pushed() {
        let grid = FakeGrid::floored(3, 3).with(2, 1, pullable());
        assert_eq!(
            plan_move(
                &grid,
                at(1, 1),
                PlayerStance::Free,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::NotPushable)
        );
    }

    #[test]
    fn push_moves_block_before_player() {
        let grid = FakeGrid::floored(4, 1).with(1, 0, pushable());
        let plan = plan_move(
            &grid,
            at(0, 0),
            PlayerStance::Free,
            Direction::Right,
            never_blocked,
        )
        .expect("push accepted");

        assert_eq!(plan.kind(), MoveKind::Push);
        assert_eq!(plan.swaps(), &[(at(2, 0), at(1, 0)), (at(0, 0), at(1, 0))]);
        assert_eq!(
            plan.relocations(),
            &[
                Relocation {
                    from: at(1, 0),
                    to: at(2, 0)
                },
                Relocation {
                    from: at(0, 0),
                    to: at(1, 0)
                },
            ]
        );
        assert_eq!(plan.player_destination(), at(1, 0));
    }

    #[test]
    fn push_into_wall_is_rejected() {
        let grid = FakeGrid::floored(3, 1)
            .with(1, 0, pushable())
            .with(2, 0, Occupant::Wall);
        assert_eq!(
            plan_move(
                &grid,
                at(0, 0),
                PlayerStance::Free,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::Impassable)
        );
    }

    #[test]
    fn push_against_grid_edge_is_rejected() {
        let grid = FakeGrid::floored(2, 1).with(1, 0, pushable());
        assert_eq!(
            plan_move(
                &grid,
                at(0, 0),
                PlayerStance::Free,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::OutOfBounds)
        );
    }

    #[test]
    fn push_respects_target_entry_faces() {
        let sealed_from_left = EntryFaces::parse("101111").expect("six flags");
        let grid = FakeGrid::floored(3, 1)
            .with(1, 0, pushable())
            .with_overlay(2, 0, Overlay::Target(TargetSpace::new(sealed_from_left, None)));
        assert_eq!(
            plan_move(
                &grid,
                at(0, 0),
                PlayerStance::Free,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::Impassable)
        );

        let grid = FakeGrid::floored(3, 1)
            .with(1, 0, pushable())
            .with_overlay(2, 0, Overlay::Target(TargetSpace::new(EntryFaces::OPEN, None)));
        assert!(plan_move(
            &grid,
            at(0, 0),
            PlayerStance::Free,
            Direction::Right,
            never_blocked
        )
        .is_ok());
    }

    #[test]
    fn push_ignores_entry_faces_of_the_vacated_cell() {
        let open_from_left_only = EntryFaces::parse("010000").expect("six flags");
        let grid = FakeGrid::floored(4, 1)
            .with(2, 0, pushable())
            .with_overlay(
                2,
                0,
                Overlay::Target(TargetSpace::new(open_from_left_only, None)),
            );

        let plan = plan_move(
            &grid,
            at(3, 0),
            PlayerStance::Free,
            Direction::Left,
            never_blocked,
        )
        .expect("block leaves the one-way target");

        assert_eq!(plan.kind(), MoveKind::Push);
        assert_eq!(plan.player_destination(), at(2, 0));
        assert_eq!(plan.relocations()[0].to, at(1, 0));
    }

    #[test]
    fn pull_drags_block_into_vacated_cell() {
        let grid = FakeGrid::floored(3, 1).with(0, 0, pullable());
        let plan = plan_move(
            &grid,
            at(1, 0),
            PlayerStance::Pulling,
            Direction::Right,
            never_blocked,
        )
        .expect("pull accepted");

        assert_eq!(plan.kind(), MoveKind::Pull);
        assert_eq!(plan.swaps(), &[(at(1, 0), at(2, 0)), (at(0, 0), at(1, 0))]);
        assert_eq!(plan.player_destination(), at(2, 0));
    }

    #[test]
    fn pull_without_pullable_block_is_rejected() {
        let grid = FakeGrid::floored(3, 1).with(0, 0, pushable());
        assert_eq!(
            plan_move(
                &grid,
                at(1, 0),
                PlayerStance::Pulling,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::NotPullable)
        );

        assert_eq!(
            plan_move(
                &grid,
                at(0, 0),
                PlayerStance::Pulling,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::OutOfBounds),
            "nothing lies behind a player at the grid edge"
        );
    }

    #[test]
    fn pull_requires_free_destination() {
        let grid = FakeGrid::floored(3, 1)
            .with(0, 0, pullable())
            .with(2, 0, Occupant::Wall);
        assert_eq!(
            plan_move(
                &grid,
                at(1, 0),
                PlayerStance::Pulling,
                Direction::Right,
                never_blocked
            ),
            Err(MoveRejection::Impassable)
        );
    }

    #[test]
    fn interacting_resolves_like_free() {
        let grid = FakeGrid::floored(4, 1).with(1, 0, pushable());
        let free = plan_move(
            &grid,
            at(0, 0),
            PlayerStance::Free,
            Direction::Right,
            never_blocked,
        );
        let interacting = plan_move(
            &grid,
            at(0, 0),
            PlayerStance::Interacting,
            Direction::Right,
            never_blocked,
        );
        assert_eq!(free, interacting);
    }

    #[test]
    fn blocked_teleporter_rejects_walk_and_push() {
        let grid = FakeGrid::floored(4, 1).with_overlay(1, 0, teleporter_to("B"));
        assert_eq!(
            plan_move(
                &grid,
                at(0, 0),
                PlayerStance::Free,
                Direction::Right,
                always_blocked
            ),
            Err(MoveRejection::TeleportDestinationOccupied)
        );
        assert!(plan_move(
            &grid,
            at(0, 0),
            PlayerStance::Free,
            Direction::Right,
            never_blocked
        )
        .is_ok());

        let grid = FakeGrid::floored(4, 1)
            .with(1, 0, pushable())
            .with_overlay(2, 0, teleporter_to("B"));
        assert_eq!(
            plan_move(
                &grid,
                at(0, 0),
                PlayerStance::Free,
                Direction::Right,
                always_blocked
            ),
            Err(MoveRejection::TeleportDestinationOccupied)
        );
    }

    #[test]
    fn disabled_teleporter_is_plain_floor_for_planning() {
        let mut overlay = teleporter_to("missing");
        if let Some(teleporter) = overlay.as_teleporter_mut() {
            teleporter.disable();
        }
        let grid = FakeGrid::floored(2, 1).with_overlay(1, 0, overlay);
        assert!(plan_move(
            &grid,
            at(0, 0),
            PlayerStance::Free,
            Direction::Right,
            always_blocked
        )
        .is_ok());
    }
}
