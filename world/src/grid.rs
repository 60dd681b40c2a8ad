//! Dense occupancy store plus sparse overlay map for a single grid.

use std::collections::BTreeMap;

use blockwarp_core::{
    Coord, FillState, GridError, GridId, GridSize, GridView, Occupant, Overlay, OverlayKind,
};

/// Value accepted by [`Grid::place`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Stored in the dense layer.
    Occupant(Occupant),
    /// Stored in the sparse layer.
    Overlay(Overlay),
}

impl From<Occupant> for Placement {
    fn from(occupant: Occupant) -> Self {
        Self::Occupant(occupant)
    }
}

impl From<Overlay> for Placement {
    fn from(overlay: Overlay) -> Self {
        Self::Overlay(overlay)
    }
}

/// Fill classification change observed by [`Grid::scan_win_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillTransition {
    /// Location of the target.
    pub coord: Coord,
    /// Classification before the scan.
    pub from: FillState,
    /// Classification after the scan.
    pub to: FillState,
}

/// One floor stack: a dense occupant layer plus a sparse overlay layer.
///
/// An occupant and an overlay may share a coordinate; two of the same layer
/// never may. Dropping or clearing the grid releases everything placed in it.
#[derive(Clone, Debug)]
pub struct Grid {
    id: GridId,
    title: String,
    size: GridSize,
    cells: Vec<Option<Occupant>>,
    overlays: BTreeMap<Coord, Overlay>,
    player: Option<Coord>,
}

impl Grid {
    /// Creates an empty grid with the provided extent.
    #[must_use]
    pub fn new(id: GridId, title: impl Into<String>, size: GridSize) -> Self {
        Self {
            id,
            title: title.into(),
            size,
            cells: vec![None; size.cell_count()],
            overlays: BTreeMap::new(),
            player: None,
        }
    }

    /// Stable identifier of the grid.
    #[must_use]
    pub fn id(&self) -> &GridId {
        &self.id
    }

    /// Display title of the grid.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Location of the player, if this grid holds it.
    #[must_use]
    pub const fn player(&self) -> Option<Coord> {
        self.player
    }

    /// Stores an occupant or overlay at the coordinate.
    pub fn place(&mut self, coord: Coord, placement: impl Into<Placement>) -> Result<(), GridError> {
        let index = self.index(coord)?;
        match placement.into() {
            Placement::Occupant(occupant) => {
                if self.cells[index].is_some() {
                    return Err(GridError::CellOccupied(coord));
                }
                if occupant.is_player() {
                    if self.player.is_some() {
                        return Err(GridError::DuplicatePlayer);
                    }
                    self.player = Some(coord);
                }
                self.cells[index] = Some(occupant);
            }
            Placement::Overlay(overlay) => {
                if self.overlays.contains_key(&coord) {
                    return Err(GridError::OverlayOccupied(coord));
                }
                let _ = self.overlays.insert(coord, overlay);
            }
        }
        Ok(())
    }

    /// Takes the occupant out of the coordinate and hands it to the caller.
    pub fn remove(&mut self, coord: Coord) -> Result<Occupant, GridError> {
        let index = self.index(coord)?;
        let occupant = self.cells[index]
            .take()
            .ok_or(GridError::EmptyCell(coord))?;
        if self.player == Some(coord) {
            self.player = None;
        }
        Ok(occupant)
    }

    /// Exchanges the dense-layer contents of two cells.
    ///
    /// Either cell may be empty; swapping two empty cells changes nothing.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<(), GridError> {
        let first = self.index(a)?;
        let second = self.index(b)?;
        self.cells.swap(first, second);
        self.player = match self.player {
            Some(player) if player == a => Some(b),
            Some(player) if player == b => Some(a),
            other => other,
        };
        Ok(())
    }

    /// Applies swaps in order after validating every coordinate.
    pub fn swap_all(&mut self, swaps: &[(Coord, Coord)]) -> Result<(), GridError> {
        for (a, b) in swaps {
            let _ = self.index(*a)?;
            let _ = self.index(*b)?;
        }
        for (a, b) in swaps {
            self.swap(*a, *b)?;
        }
        Ok(())
    }

    /// Iterates every stored occupant in dense-index order.
    pub fn occupants(&self) -> impl Iterator<Item = (Coord, &Occupant)> + '_ {
        self.size
            .coords()
            .zip(self.cells.iter())
            .filter_map(|(coord, cell)| cell.as_ref().map(|occupant| (coord, occupant)))
    }

    /// Iterates every overlay in coordinate order.
    pub fn overlays(&self) -> impl Iterator<Item = (Coord, &Overlay)> + '_ {
        self.overlays.iter().map(|(coord, overlay)| (*coord, overlay))
    }

    /// Coordinates of every teleporter overlay.
    #[must_use]
    pub fn teleporter_coords(&self) -> Vec<Coord> {
        self.overlays
            .iter()
            .filter(|(_, overlay)| overlay.kind() == OverlayKind::Teleporter)
            .map(|(coord, _)| *coord)
            .collect()
    }

    /// Reports whether every target was correctly filled at the last scan.
    ///
    /// A grid without targets is vacuously solved.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.overlays
            .values()
            .filter_map(Overlay::as_target)
            .all(|target| target.fill() == FillState::Correct)
    }

    /// Classifies every target and records teleporter occupancy.
    ///
    /// Pushes each fill change into `transitions` and returns whether every
    /// target is correctly filled. Scanning twice without mutation in between
    /// reports nothing the second time.
    pub fn scan_win_state(&mut self, transitions: &mut Vec<FillTransition>) -> bool {
        let size = self.size;
        let cells = &self.cells;
        let mut solved = true;
        for (coord, overlay) in &mut self.overlays {
            let occupant = size.index(*coord).and_then(|index| cells[index].as_ref());
            match overlay {
                Overlay::Target(target) => {
                    if let Some(from) = target.refresh(occupant) {
                        transitions.push(FillTransition {
                            coord: *coord,
                            from,
                            to: target.fill(),
                        });
                    }
                    solved &= target.fill() == FillState::Correct;
                }
                Overlay::Teleporter(teleporter) => teleporter.set_occupied(occupant.is_some()),
            }
        }
        solved
    }

    /// Releases every occupant and overlay.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
        self.overlays.clear();
        self.player = None;
    }

    pub(crate) fn occupant_mut(&mut self, coord: Coord) -> Option<&mut Occupant> {
        let index = self.size.index(coord)?;
        self.cells[index].as_mut()
    }

    pub(crate) fn overlay_mut(&mut self, coord: Coord) -> Option<&mut Overlay> {
        self.overlays.get_mut(&coord)
    }

    fn index(&self, coord: Coord) -> Result<usize, GridError> {
        self.size.index(coord).ok_or(GridError::OutOfBounds(coord))
    }
}

impl GridView for Grid {
    fn size(&self) -> GridSize {
        self.size
    }

    fn occupant(&self, coord: Coord) -> Option<&Occupant> {
        let index = self.size.index(coord)?;
        self.cells[index].as_ref()
    }

    fn overlay(&self, coord: Coord) -> Option<&Overlay> {
        self.overlays.get(&coord)
    }
}
