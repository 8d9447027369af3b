use predator_prey_common::OccupiedError;
use serde::{Deserialize, Serialize};

/// A cell coordinate on the torus. Always within `[0, size)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

/// What a grid cell holds. Predator energy lives in the cell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Empty,
    Prey,
    Predator { energy: i32 },
}

impl CellState {
    #[inline(always)]
    pub fn is_empty(self) -> bool {
        matches!(self, CellState::Empty)
    }
}

/// Square occupancy grid with toroidal wrap-around.
///
/// The grid only tracks cell contents; which agents exist is the business of
/// [`crate::agent_pool::AgentPool`]. Buffers can be reserved for a larger
/// grid than the one in use so a workspace can be reused across trials.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    size: usize,
    cells: Vec<CellState>,
}

impl OccupancyGrid {
    pub fn new(size: usize) -> Self {
        Self::with_capacity(size, size)
    }

    /// Allocates room for a `capacity x capacity` grid but starts at `size x size`.
    pub fn with_capacity(size: usize, capacity: usize) -> Self {
        let mut cells = Vec::with_capacity(capacity.max(size).pow(2));
        cells.resize(size * size, CellState::Empty);
        Self { size, cells }
    }

    /// Empties every cell and switches to a `size x size` layout, reusing the allocation when possible.
    pub fn reset(&mut self, size: usize) {
        self.size = size;
        self.cells.clear();
        self.cells.resize(size * size, CellState::Empty);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    // Row-major index of a cell
    #[inline(always)]
    fn idx(&self, pos: Position) -> usize {
        pos.y * self.size + pos.x
    }

    /// Wraps arbitrary signed coordinates onto the torus.
    #[inline(always)]
    pub fn wrap(&self, x: isize, y: isize) -> Position {
        let n = self.size as isize;
        Position::new(x.rem_euclid(n) as usize, y.rem_euclid(n) as usize)
    }

    #[inline(always)]
    pub fn get(&self, pos: Position) -> CellState {
        self.cells[self.idx(pos)]
    }

    #[inline(always)]
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos).is_empty()
    }

    /// Energy of the predator at `pos`, if there is one.
    pub fn energy(&self, pos: Position) -> Option<i32> {
        match self.get(pos) {
            CellState::Predator { energy } => Some(energy),
            _ => None,
        }
    }

    /// Overwrites the energy of the predator at `pos`. No-op for other cells.
    pub fn set_energy(&mut self, pos: Position, new_energy: i32) {
        let idx = self.idx(pos);
        if let CellState::Predator { energy } = &mut self.cells[idx] {
            *energy = new_energy;
        }
    }

    /// Puts an agent into an empty cell.
    pub fn place(&mut self, state: CellState, pos: Position) -> Result<(), OccupiedError> {
        let idx = self.idx(pos);
        if !self.cells[idx].is_empty() {
            return Err(OccupiedError { x: pos.x, y: pos.y });
        }
        self.cells[idx] = state;
        Ok(())
    }

    /// Moves whatever is at `from` into `to`, leaving `from` empty.
    /// The caller guarantees `to` is free (or holds prey being eaten).
    pub fn relocate(&mut self, from: Position, to: Position) {
        let from_idx = self.idx(from);
        let to_idx = self.idx(to);
        self.cells[to_idx] = std::mem::take(&mut self.cells[from_idx]);
    }

    /// Empties a cell, returning what was there.
    pub fn clear(&mut self, pos: Position) -> CellState {
        let idx = self.idx(pos);
        std::mem::take(&mut self.cells[idx])
    }

    /// The 8 Moore neighbours of `pos`, wrapped, in a fixed column-major order.
    #[inline(always)]
    pub fn neighbors(&self, pos: Position) -> [Position; 8] {
        let (x, y) = (pos.x as isize, pos.y as isize);
        let mut out = [pos; 8];
        let mut i = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                out[i] = self.wrap(x + dx, y + dy);
                i += 1;
            }
        }
        out
    }

    /// Iterates all cells with their coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, CellState)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, state)| (Position::new(i % size, i / size), *state))
    }

    /// Every empty cell, row-major.
    pub fn empty_cells(&self) -> Vec<Position> {
        self.iter()
            .filter(|(_, state)| state.is_empty())
            .map(|(pos, _)| pos)
            .collect()
    }
}
