#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Errand engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as [`GridView`] and [`EntityView`], and respond exclusively with
//! new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Maripoga's Errand.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the tile grid with the provided dimensions, clearing all state.
    ConfigureGrid {
        /// Number of tile columns laid out in the grid.
        columns: TileCoord,
        /// Number of tile rows laid out in the grid.
        rows: TileCoord,
    },
    /// Sets the coverage ratio the wave requires before it counts as cleared.
    ConfigureCoverageTarget {
        /// Fraction of claimable tiles that must be owned, in `0.0..=1.0`.
        target: f32,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the player hop one tile in the specified direction.
    HopPlayer {
        /// Direction of travel for the hop.
        direction: Direction,
    },
    /// Returns the player to the grid centre, alive and idle.
    ResetPlayer,
    /// Makes the player immune to collisions and hostile encirclement for a while.
    GrantInvincibility {
        /// Length of the immunity window.
        duration: Duration,
    },
    /// Requests that a hostile entity appear on the provided tile.
    SpawnEntity {
        /// Kind of entity to create.
        kind: EntityKind,
        /// Tile the entity occupies after spawning.
        cell: CellCoord,
    },
    /// Requests that an idle entity hop (or teleport) to the provided tile.
    HopEntity {
        /// Identifier of the entity attempting to move.
        entity: EntityId,
        /// Destination tile of the hop.
        to: CellCoord,
    },
    /// Pins every entity in place while set: hops in flight stop advancing and
    /// new hop requests are ignored.
    HoldEntities {
        /// Whether entities are held.
        held: bool,
    },
    /// Overwrites the state of a single tile.
    ClaimTile {
        /// Tile to overwrite.
        cell: CellCoord,
        /// State written into the tile.
        state: TileState,
    },
    /// Rewrites every tile holding `from` into `to`.
    ConvertTiles {
        /// State that should be replaced.
        from: TileState,
        /// Replacement state.
        to: TileState,
    },
    /// Makes a tile lethal to the player for the provided duration.
    MarkFatal {
        /// Tile receiving the countdown.
        cell: CellCoord,
        /// Length of the countdown.
        duration: Duration,
    },
    /// Marks an entity as captured and schedules its respawn.
    CaptureEntity {
        /// Identifier of the captured entity.
        entity: EntityId,
    },
    /// Purges captured entities from the registry.
    RemoveCapturedEntities,
    /// Adds a (possibly negative) delta to the player's score.
    AwardScore {
        /// Points added to the score.
        points: i64,
    },
    /// Kills the player immediately.
    KillPlayer {
        /// Reason reported alongside the death.
        cause: DeathCause,
    },
    /// Forwards a fire-and-forget presentation cue to any listening sink.
    EmitCue {
        /// Cue to broadcast.
        cue: Cue,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the grid was rebuilt with new dimensions.
    GridConfigured {
        /// Number of tile columns in the new grid.
        columns: TileCoord,
        /// Number of tile rows in the new grid.
        rows: TileCoord,
    },
    /// Confirms that the player started a hop.
    PlayerHopped {
        /// Tile the player departed from.
        from: CellCoord,
        /// Tile the player is travelling to.
        to: CellCoord,
    },
    /// Reports that a player hop request was refused.
    PlayerHopRejected {
        /// Direction that was requested.
        direction: Direction,
        /// Specific reason the hop failed.
        reason: HopError,
    },
    /// Announces that the player finished a hop and claimed the tile.
    PlayerLanded {
        /// Tile the player landed on.
        cell: CellCoord,
    },
    /// Announces that the player lost a life.
    PlayerDied {
        /// Tile the player occupied when dying.
        cell: CellCoord,
        /// Reason the player died.
        cause: DeathCause,
        /// Lives remaining after the death.
        lives: u32,
    },
    /// Confirms that the player was returned to the starting tile.
    PlayerReset {
        /// Tile the player occupies after the reset.
        cell: CellCoord,
    },
    /// Confirms that an entity was created.
    EntitySpawned {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Kind of the entity.
        kind: EntityKind,
        /// Tile the entity occupies.
        cell: CellCoord,
    },
    /// Confirms that an entity started a hop.
    EntityHopped {
        /// Identifier of the entity.
        entity: EntityId,
        /// Tile the entity departed from.
        from: CellCoord,
        /// Tile the entity is travelling to.
        to: CellCoord,
    },
    /// Announces that an entity finished its hop and claimed the tile.
    EntityLanded {
        /// Identifier of the entity.
        entity: EntityId,
        /// Tile the entity landed on.
        cell: CellCoord,
    },
    /// Confirms that a tile changed state.
    TileClaimed {
        /// Tile that changed.
        cell: CellCoord,
        /// State held before the change.
        previous: TileState,
        /// State held after the change.
        state: TileState,
    },
    /// Confirms a bulk tile conversion.
    TilesConverted {
        /// State that was replaced.
        from: TileState,
        /// Replacement state.
        to: TileState,
        /// Number of tiles rewritten.
        count: u32,
    },
    /// Confirms that a tile received a fatal countdown.
    TileMarkedFatal {
        /// Tile receiving the countdown.
        cell: CellCoord,
        /// Length of the countdown.
        duration: Duration,
    },
    /// Announces that an entity was captured.
    EntityCaptured {
        /// Identifier of the captured entity.
        entity: EntityId,
        /// Kind of the captured entity.
        kind: EntityKind,
        /// Tile the entity occupied when captured.
        cell: CellCoord,
    },
    /// Announces that a respawn was queued for the external scheduler.
    RespawnScheduled {
        /// Kind of entity awaiting respawn.
        kind: EntityKind,
    },
    /// Confirms that captured entities were purged.
    CapturedEntitiesRemoved {
        /// Number of entities removed.
        count: u32,
    },
    /// Confirms a score change.
    ScoreAwarded {
        /// Delta applied to the score.
        points: i64,
        /// Score after applying the delta.
        total: i64,
    },
    /// Announces that the score crossed an extra-life threshold.
    ExtraLifeAwarded {
        /// Lives held after the award.
        lives: u32,
    },
    /// Presentation cue forwarded to audio and visual sinks.
    CuePlayed {
        /// Cue that was emitted.
        cue: Cue,
    },
}

/// Reasons a player hop request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HopError {
    /// The destination lies outside the grid.
    OutOfBounds,
    /// The destination tile cannot be entered.
    Impassable,
    /// The player is still travelling.
    InTransit,
    /// The player is dead.
    Dead,
}

/// Reasons the player may die.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    /// Landed on a hazard tile or a tile with a running fatal countdown.
    FatalTile,
    /// Shared a tile with a harmful entity.
    Collision,
    /// Was sealed inside a region claimed by a hostile colour.
    Encircled,
}

/// Fire-and-forget notifications for audio and visual sinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// A fill of at most five tiles started.
    FillSmall,
    /// A fill of six to fifteen tiles started.
    FillMedium,
    /// A fill of sixteen to thirty tiles started.
    FillLarge,
    /// A fill of more than thirty tiles started.
    FillHuge,
    /// A trapped entity was captured.
    Capture,
    /// The whole board was covered.
    Perfect,
    /// A hostile colour sealed off a region.
    HostileEncircle,
}

/// Colours hostile entities paint onto the tiles they land on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimColor {
    /// Red frog territory.
    Red,
    /// Purple frog territory.
    Purple,
    /// Blue frog territory.
    Blue,
    /// Zombie territory.
    Zombie,
}

/// State of a single tile. Exactly one state is held at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileState {
    /// Unclaimed ground.
    #[default]
    Neutral,
    /// Player territory.
    Owned,
    /// Ground painted by a hostile colour.
    Claimed(ClaimColor),
    /// Hazard that is fatal on landing.
    Spike,
    /// Impassable water.
    Water,
}

impl TileState {
    /// Reports whether the tile belongs to the player.
    #[must_use]
    pub const fn is_owned(self) -> bool {
        matches!(self, Self::Owned)
    }

    /// Reports whether hops onto the tile are refused.
    #[must_use]
    pub const fn blocks_hop(self) -> bool {
        matches!(self, Self::Spike | Self::Water)
    }

    /// Reports whether landing on the tile kills the player.
    #[must_use]
    pub const fn is_lethal(self) -> bool {
        matches!(self, Self::Spike)
    }

    /// Reports whether the tile is left out of the coverage denominator.
    ///
    /// The same policy backs the wave win condition and the perfect-board
    /// check, so the two always agree.
    #[must_use]
    pub const fn excluded_from_coverage(self) -> bool {
        matches!(self, Self::Spike | Self::Water)
    }
}

/// Capability flags attached to every entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Whether the entity dies when sealed inside player territory.
    pub capturable: bool,
    /// Whether touching the entity kills the player.
    pub harmful: bool,
    /// Whether the entity's colour can seal regions against the player.
    pub encircles: bool,
}

/// Kinds of hostile entities roaming the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Slow random hopper.
    Red,
    /// Player chaser.
    Purple,
    /// Teleporter.
    Blue,
    /// Grey shambler.
    Zombie,
    /// Spike-laying snail that cannot be captured.
    Snail,
}

impl EntityKind {
    /// Every entity kind in a fixed order.
    pub const ALL: [EntityKind; 5] = [
        Self::Red,
        Self::Purple,
        Self::Blue,
        Self::Zombie,
        Self::Snail,
    ];

    /// Returns the capability flags for the kind.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Red | Self::Purple | Self::Blue => Capabilities {
                capturable: true,
                harmful: true,
                encircles: true,
            },
            Self::Zombie => Capabilities {
                capturable: true,
                harmful: true,
                encircles: false,
            },
            Self::Snail => Capabilities {
                capturable: false,
                harmful: true,
                encircles: false,
            },
        }
    }

    /// Tile state written wherever the entity lands.
    #[must_use]
    pub const fn claim_tile(self) -> TileState {
        match self {
            Self::Red => TileState::Claimed(ClaimColor::Red),
            Self::Purple => TileState::Claimed(ClaimColor::Purple),
            Self::Blue => TileState::Claimed(ClaimColor::Blue),
            Self::Zombie => TileState::Claimed(ClaimColor::Zombie),
            Self::Snail => TileState::Spike,
        }
    }

    /// Base score awarded for capturing the entity, before kill-order scaling.
    #[must_use]
    pub const fn kill_score(self) -> u32 {
        match self {
            Self::Red => 200,
            Self::Zombie => 300,
            Self::Purple => 400,
            Self::Blue => 600,
            Self::Snail => 0,
        }
    }
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction, in the order flood fills expand them.
    pub const ALL: [Direction; 4] = [Self::East, Self::West, Self::South, Self::North];
}

/// Unique identifier assigned to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Index within the tile grid measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord(u32);

impl TileCoord {
    /// Creates a new tile coordinate wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the underlying tile index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Read-only view into the dense tile grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    tiles: &'a [TileState],
    columns: u32,
    rows: u32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major tile slice.
    #[must_use]
    pub fn new(tiles: &'a [TileState], columns: u32, rows: u32) -> Self {
        Self {
            tiles,
            columns,
            rows,
        }
    }

    /// Returns the state of the tile, or `None` when the cell lies outside the grid.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<TileState> {
        self.index(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether the cell sits on the first or last row or column.
    #[must_use]
    pub const fn is_boundary(&self, cell: CellCoord) -> bool {
        self.contains(cell)
            && (cell.column() == 0
                || cell.row() == 0
                || cell.column() + 1 == self.columns
                || cell.row() + 1 == self.rows)
    }

    /// Returns the orthogonal neighbour of `cell`, or `None` when stepping off the grid.
    #[must_use]
    pub fn neighbor(&self, cell: CellCoord, direction: Direction) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(cell.column()), cell.row().checked_sub(1)),
            Direction::East => (cell.column().checked_add(1), Some(cell.row())),
            Direction::South => (Some(cell.column()), cell.row().checked_add(1)),
            Direction::West => (cell.column().checked_sub(1), Some(cell.row())),
        };
        let candidate = CellCoord::new(column?, row?);
        self.contains(candidate).then_some(candidate)
    }

    /// Converts a cell into its row-major index.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    /// Iterates over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }

    /// Counts tiles holding exactly `state`.
    #[must_use]
    pub fn count(&self, state: TileState) -> u32 {
        let count = self.tiles.iter().filter(|tile| **tile == state).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Number of tiles that count toward coverage.
    #[must_use]
    pub fn claimable_tiles(&self) -> u32 {
        let count = self
            .tiles
            .iter()
            .filter(|tile| !tile.excluded_from_coverage())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Fraction of claimable tiles holding `state`.
    #[must_use]
    pub fn fill_ratio(&self, state: TileState) -> f32 {
        let total = self.claimable_tiles();
        if total == 0 {
            return 0.0;
        }
        self.count(state) as f32 / total as f32
    }

    /// Reports whether every claimable tile holds `state`.
    #[must_use]
    pub fn is_fully_covered(&self, state: TileState) -> bool {
        let total = self.claimable_tiles();
        total > 0 && self.count(state) >= total
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Kind of the entity.
    pub kind: EntityKind,
    /// Tile the entity occupies, or is travelling to while hopping.
    pub cell: CellCoord,
    /// Departure tile while a hop is in progress.
    pub hop_from: Option<CellCoord>,
    /// Whether the entity is still alive.
    pub alive: bool,
}

impl EntitySnapshot {
    /// Reports whether the entity is mid-hop.
    #[must_use]
    pub const fn in_transit(&self) -> bool {
        self.hop_from.is_some()
    }
}

/// Read-only snapshot describing all entities in the registry.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over the snapshots of entities that are still alive.
    pub fn alive(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter().filter(|snapshot| snapshot.alive)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// Tile the player occupies, or is travelling to while hopping.
    pub cell: CellCoord,
    /// Departure tile while a hop is in progress.
    pub hop_from: Option<CellCoord>,
    /// Whether the player is alive.
    pub alive: bool,
    /// Lives remaining.
    pub lives: u32,
    /// Current score.
    pub score: i64,
    /// Whether the player is currently immune to collisions.
    pub invincible: bool,
}
