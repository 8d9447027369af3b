use crate::grid::{CellState, OccupancyGrid, Position};
use predator_prey_common::{AgentKind, OccupiedError};
use thiserror::Error;

/// Live agents of one trial, as two ordered position lists.
///
/// Every entry must match a grid cell of its kind and vice versa; the pool and
/// the grid are only mutated together through the methods below.
#[derive(Debug, Clone, Default)]
pub struct AgentPool {
    pub prey: Vec<Position>,
    pub predators: Vec<Position>,
}

/// A mismatch between the grid contents and the agent lists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OccupancyError {
    #[error("{kind:?} at ({x}, {y}) has no matching grid cell")]
    MissingCell { kind: AgentKind, x: usize, y: usize },
    #[error("grid holds {kind:?} at ({x}, {y}) that is not in the pool")]
    UntrackedCell { kind: AgentKind, x: usize, y: usize },
    #[error("{count} {kind:?} entries share position ({x}, {y})")]
    Duplicate { kind: AgentKind, x: usize, y: usize, count: usize },
    #[error("predator at ({x}, {y}) survived with energy {energy}")]
    DeadPredator { x: usize, y: usize, energy: i32 },
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes both lists for a grid of `num_cells` cells.
    pub fn with_capacity(num_cells: usize) -> Self {
        Self {
            prey: Vec::with_capacity(num_cells),
            predators: Vec::with_capacity(num_cells),
        }
    }

    pub fn clear(&mut self) {
        self.prey.clear();
        self.predators.clear();
    }

    pub fn prey_count(&self) -> usize {
        self.prey.len()
    }

    pub fn predator_count(&self) -> usize {
        self.predators.len()
    }

    pub fn add_prey(&mut self, grid: &mut OccupancyGrid, pos: Position) -> Result<(), OccupiedError> {
        grid.place(CellState::Prey, pos)?;
        self.prey.push(pos);
        Ok(())
    }

    pub fn add_predator(
        &mut self,
        grid: &mut OccupancyGrid,
        pos: Position,
        energy: i32,
    ) -> Result<(), OccupiedError> {
        grid.place(CellState::Predator { energy }, pos)?;
        self.predators.push(pos);
        Ok(())
    }

    /// Moves the `idx`-th prey to an empty cell.
    pub fn move_prey(&mut self, grid: &mut OccupancyGrid, idx: usize, to: Position) {
        let from = self.prey[idx];
        grid.relocate(from, to);
        self.prey[idx] = to;
    }

    /// Removes the prey at `pos` from the list. The grid cell is left to the caller,
    /// which is about to overwrite it with the predator that ate it.
    pub fn forget_prey(&mut self, pos: Position) -> bool {
        match self.prey.iter().position(|&p| p == pos) {
            Some(i) => {
                self.prey.remove(i);
                true
            }
            None => false,
        }
    }

    /// Moves the predator at `from` to `to`. Any prey at `to` must already be forgotten.
    pub fn move_predator(&mut self, grid: &mut OccupancyGrid, from: Position, to: Position) {
        grid.relocate(from, to);
        if let Some(slot) = self.predators.iter_mut().find(|p| **p == from) {
            *slot = to;
        }
    }

    /// Removes the predator at `pos` from both the grid and the list.
    pub fn remove_predator(&mut self, grid: &mut OccupancyGrid, pos: Position) {
        grid.clear(pos);
        if let Some(i) = self.predators.iter().position(|&p| p == pos) {
            self.predators.remove(i);
        }
    }

    /// Checks the one-to-one mapping between list entries and occupied cells,
    /// and that no surviving predator is out of energy.
    pub fn verify(&self, grid: &OccupancyGrid) -> Result<(), OccupancyError> {
        let mut claimed = vec![0u8; grid.num_cells()];

        for (kind, list) in [(AgentKind::Prey, &self.prey), (AgentKind::Predator, &self.predators)] {
            for &pos in list {
                let cell = grid.get(pos);
                let matches = match (kind, cell) {
                    (AgentKind::Prey, CellState::Prey) => true,
                    (AgentKind::Predator, CellState::Predator { energy }) => {
                        if energy <= 0 {
                            return Err(OccupancyError::DeadPredator { x: pos.x, y: pos.y, energy });
                        }
                        true
                    }
                    _ => false,
                };
                if !matches {
                    return Err(OccupancyError::MissingCell { kind, x: pos.x, y: pos.y });
                }
                let slot = &mut claimed[pos.y * grid.size() + pos.x];
                *slot += 1;
                if *slot > 1 {
                    return Err(OccupancyError::Duplicate { kind, x: pos.x, y: pos.y, count: *slot as usize });
                }
            }
        }

        for (pos, state) in grid.iter() {
            let kind = match state {
                CellState::Empty => continue,
                CellState::Prey => AgentKind::Prey,
                CellState::Predator { .. } => AgentKind::Predator,
            };
            if claimed[pos.y * grid.size() + pos.x] == 0 {
                return Err(OccupancyError::UntrackedCell { kind, x: pos.x, y: pos.y });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_move_and_remove_keep_grid_in_sync() {
        let mut grid = OccupancyGrid::new(5);
        let mut pool = AgentPool::new();

        pool.add_prey(&mut grid, Position::new(1, 1)).unwrap();
        pool.add_predator(&mut grid, Position::new(3, 3), 5).unwrap();
        assert_eq!(pool.verify(&grid), Ok(()));

        pool.move_prey(&mut grid, 0, Position::new(1, 2));
        pool.move_predator(&mut grid, Position::new(3, 3), Position::new(2, 2));
        assert_eq!(pool.prey, vec![Position::new(1, 2)]);
        assert_eq!(pool.predators, vec![Position::new(2, 2)]);
        assert_eq!(grid.energy(Position::new(2, 2)), Some(5));
        assert_eq!(pool.verify(&grid), Ok(()));

        pool.remove_predator(&mut grid, Position::new(2, 2));
        assert_eq!(pool.predator_count(), 0);
        assert!(grid.is_empty(Position::new(2, 2)));
        assert_eq!(pool.verify(&grid), Ok(()));
    }

    #[test]
    fn occupied_placement_leaves_pool_untouched() {
        let mut grid = OccupancyGrid::new(4);
        let mut pool = AgentPool::new();
        pool.add_prey(&mut grid, Position::new(0, 0)).unwrap();
        assert!(pool.add_predator(&mut grid, Position::new(0, 0), 5).is_err());
        assert_eq!(pool.predator_count(), 0);
        assert_eq!(pool.verify(&grid), Ok(()));
    }

    #[test]
    fn verify_catches_untracked_and_dead_agents() {
        let mut grid = OccupancyGrid::new(4);
        let pool = AgentPool::new();
        grid.place(CellState::Prey, Position::new(2, 1)).unwrap();
        assert_eq!(
            pool.verify(&grid),
            Err(OccupancyError::UntrackedCell { kind: AgentKind::Prey, x: 2, y: 1 })
        );

        let mut grid = OccupancyGrid::new(4);
        let mut pool = AgentPool::new();
        pool.add_predator(&mut grid, Position::new(0, 3), 1).unwrap();
        grid.set_energy(Position::new(0, 3), 0);
        assert_eq!(
            pool.verify(&grid),
            Err(OccupancyError::DeadPredator { x: 0, y: 3, energy: 0 })
        );
    }

    #[test]
    fn forget_prey_only_touches_the_list() {
        let mut grid = OccupancyGrid::new(4);
        let mut pool = AgentPool::new();
        pool.add_prey(&mut grid, Position::new(1, 0)).unwrap();
        assert!(pool.forget_prey(Position::new(1, 0)));
        assert!(!pool.forget_prey(Position::new(1, 0)));
        assert_eq!(grid.get(Position::new(1, 0)), CellState::Prey);
    }
}
