//! Regions sealed off by a hostile claim colour.

use errand_core::{CellCoord, EntityKind, GridView, TileState};

use crate::flood::find_sealed_region;

/// Region enclosed by tiles of a single hostile colour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HostileSeal {
    pub(crate) color: TileState,
    pub(crate) region: Vec<CellCoord>,
}

/// Finds the first region sealed by any encircling colour holding at least `min_tiles` tiles.
pub(crate) fn find_hostile_seal(grid: GridView<'_>, min_tiles: u32) -> Option<HostileSeal> {
    EntityKind::ALL
        .into_iter()
        .filter(|kind| kind.capabilities().encircles)
        .map(EntityKind::claim_tile)
        .filter(|color| grid.count(*color) >= min_tiles)
        .find_map(|color| {
            find_sealed_region(grid, |state| state == color)
                .map(|region| HostileSeal { color, region })
        })
}
