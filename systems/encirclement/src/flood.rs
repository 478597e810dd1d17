//! Iterative 4-connected flood fills used for seal detection.

use errand_core::{CellCoord, Direction, GridView, TileState};

/// Finds the first region, in row-major scan order, that cannot reach the grid boundary
/// without crossing a wall tile.
///
/// Tiles for which `is_wall` holds terminate the fill. A region touches the edge when a
/// member sits on the outer ring or an expansion step leaves the grid. Regions that touch
/// the edge are skipped without revisiting any of their tiles.
#[must_use]
pub fn find_sealed_region<F>(grid: GridView<'_>, is_wall: F) -> Option<Vec<CellCoord>>
where
    F: Fn(TileState) -> bool,
{
    let mut visited = Visited::new(grid);
    let mut stack = Vec::new();

    for start in grid.cells() {
        if visited.contains(grid, start) {
            continue;
        }
        if grid.get(start).is_some_and(&is_wall) {
            visited.insert(grid, start);
            continue;
        }

        let mut region = Vec::new();
        let mut touches_edge = false;
        stack.push(start);

        while let Some(cell) = stack.pop() {
            let Some(state) = grid.get(cell) else {
                continue;
            };
            if visited.contains(grid, cell) || is_wall(state) {
                continue;
            }
            visited.insert(grid, cell);
            region.push(cell);
            if grid.is_boundary(cell) {
                touches_edge = true;
            }
            for direction in Direction::ALL {
                match grid.neighbor(cell, direction) {
                    Some(next) => stack.push(next),
                    None => touches_edge = true,
                }
            }
        }

        if !touches_edge && !region.is_empty() {
            return Some(region);
        }
    }

    None
}

/// Reports whether `cell` is cut off from the grid boundary by wall tiles.
///
/// The cell itself may be a wall: only the fills started from its non-wall neighbours
/// are considered, and the cell is treated as already visited so they never pass through it.
#[must_use]
pub fn is_enclosed_by<F>(grid: GridView<'_>, cell: CellCoord, is_wall: F) -> bool
where
    F: Fn(TileState) -> bool,
{
    if !grid.contains(cell) || grid.is_boundary(cell) {
        return false;
    }

    let mut visited = Visited::new(grid);
    visited.insert(grid, cell);
    let mut stack = Vec::new();

    for direction in Direction::ALL {
        let Some(neighbor) = grid.neighbor(cell, direction) else {
            return false;
        };
        if visited.contains(grid, neighbor) || grid.get(neighbor).is_some_and(&is_wall) {
            continue;
        }

        stack.push(neighbor);
        while let Some(current) = stack.pop() {
            let Some(state) = grid.get(current) else {
                continue;
            };
            if visited.contains(grid, current) || is_wall(state) {
                continue;
            }
            visited.insert(grid, current);
            for step in Direction::ALL {
                match grid.neighbor(current, step) {
                    Some(next) => stack.push(next),
                    None => return false,
                }
            }
        }
    }

    true
}

#[derive(Debug)]
struct Visited {
    cells: Vec<bool>,
}

impl Visited {
    fn new(grid: GridView<'_>) -> Self {
        let (columns, rows) = grid.dimensions();
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            cells: vec![false; capacity],
        }
    }

    fn contains(&self, grid: GridView<'_>, cell: CellCoord) -> bool {
        grid.index(cell)
            .and_then(|index| self.cells.get(index))
            .copied()
            .unwrap_or(true)
    }

    fn insert(&mut self, grid: GridView<'_>, cell: CellCoord) {
        if let Some(slot) = grid.index(cell).and_then(|index| self.cells.get_mut(index)) {
            *slot = true;
        }
    }
}
