//! Dense tile grid with a parallel fatal-countdown layer.

use std::time::Duration;

use errand_core::{CellCoord, GridView, TileState};

/// Row-major tile storage owned by the world.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    columns: u32,
    rows: u32,
    tiles: Vec<TileState>,
    fatal: Vec<Duration>,
}

impl Grid {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![TileState::Neutral; capacity],
            fatal: vec![Duration::ZERO; capacity],
        }
    }

    pub(crate) fn view(&self) -> GridView<'_> {
        GridView::new(&self.tiles, self.columns, self.rows)
    }

    pub(crate) fn get(&self, cell: CellCoord) -> Option<TileState> {
        self.view().get(cell)
    }

    /// Overwrites the tile and returns the previous state; no-op outside the grid.
    pub(crate) fn set(&mut self, cell: CellCoord, state: TileState) -> Option<TileState> {
        let index = self.view().index(cell)?;
        let slot = self.tiles.get_mut(index)?;
        Some(std::mem::replace(slot, state))
    }

    pub(crate) fn convert_all(&mut self, from: TileState, to: TileState) -> u32 {
        let mut converted = 0;
        for tile in self.tiles.iter_mut().filter(|tile| **tile == from) {
            *tile = to;
            converted += 1;
        }
        converted
    }

    pub(crate) fn set_fatal(&mut self, cell: CellCoord, duration: Duration) -> bool {
        let Some(index) = self.view().index(cell) else {
            return false;
        };
        match self.fatal.get_mut(index) {
            Some(slot) => {
                *slot = duration;
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_fatal(&self, cell: CellCoord) -> bool {
        self.view()
            .index(cell)
            .and_then(|index| self.fatal.get(index))
            .is_some_and(|remaining| !remaining.is_zero())
    }

    /// Decrements every countdown by `dt`, flooring at zero. Tile states are untouched.
    pub(crate) fn tick_fatal(&mut self, dt: Duration) {
        for remaining in &mut self.fatal {
            *remaining = remaining.saturating_sub(dt);
        }
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errand_core::ClaimColor;

    #[test]
    fn set_outside_grid_is_noop() {
        let mut grid = Grid::new(3, 3);
        assert_eq!(grid.set(CellCoord::new(3, 0), TileState::Owned), None);
        assert_eq!(grid.view().count(TileState::Owned), 0);
    }

    #[test]
    fn set_returns_previous_state() {
        let mut grid = Grid::new(3, 3);
        let cell = CellCoord::new(1, 1);
        assert_eq!(grid.set(cell, TileState::Owned), Some(TileState::Neutral));
        assert_eq!(grid.set(cell, TileState::Water), Some(TileState::Owned));
        assert_eq!(grid.get(cell), Some(TileState::Water));
    }

    #[test]
    fn convert_all_rewrites_matching_tiles_only() {
        let mut grid = Grid::new(4, 1);
        let red = TileState::Claimed(ClaimColor::Red);
        let _ = grid.set(CellCoord::new(0, 0), red);
        let _ = grid.set(CellCoord::new(2, 0), red);
        let _ = grid.set(CellCoord::new(3, 0), TileState::Spike);

        assert_eq!(grid.convert_all(red, TileState::Owned), 2);
        assert_eq!(grid.view().count(TileState::Owned), 2);
        assert_eq!(grid.get(CellCoord::new(3, 0)), Some(TileState::Spike));
    }

    #[test]
    fn fatal_countdown_expires_without_touching_state() {
        let mut grid = Grid::new(2, 2);
        let cell = CellCoord::new(1, 0);
        let _ = grid.set(cell, TileState::Owned);
        assert!(grid.set_fatal(cell, Duration::from_millis(300)));
        assert!(grid.is_fatal(cell));

        grid.tick_fatal(Duration::from_millis(200));
        assert!(grid.is_fatal(cell));

        grid.tick_fatal(Duration::from_millis(500));
        assert!(!grid.is_fatal(cell));
        assert_eq!(grid.get(cell), Some(TileState::Owned));
    }

    #[test]
    fn fatal_queries_outside_grid_are_safe() {
        let mut grid = Grid::new(2, 2);
        assert!(!grid.set_fatal(CellCoord::new(5, 5), Duration::from_secs(1)));
        assert!(!grid.is_fatal(CellCoord::new(5, 5)));
    }
}
