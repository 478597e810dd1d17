//! TOML scenario files describing a board, its occupants and a scripted run.

use std::{fs, io, path::Path, time::Duration};

use errand_core::{CellCoord, ClaimColor, Command, Direction, EntityKind, TileCoord, TileState};
use errand_system_encirclement::Config;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read.
    #[error("could not read scenario file: {0}")]
    Read(#[from] io::Error),
    /// The file was not valid scenario TOML.
    #[error("could not parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    /// The grid has no tiles.
    #[error("grid must have at least one column and one row")]
    EmptyGrid,
    /// The layout row count does not match the grid.
    #[error("layout has {found} rows but the grid has {expected}")]
    LayoutHeight {
        /// Rows declared in the grid table.
        expected: u32,
        /// Rows present in the layout.
        found: usize,
    },
    /// A layout row does not match the grid width.
    #[error("layout row {row} has {found} tiles but the grid has {expected} columns")]
    LayoutWidth {
        /// Offending row index.
        row: u32,
        /// Columns declared in the grid table.
        expected: u32,
        /// Tiles present in the row.
        found: usize,
    },
    /// A layout glyph has no tile meaning.
    #[error("unknown layout glyph '{glyph}' at ({column}, {row})")]
    UnknownGlyph {
        /// Unrecognised character.
        glyph: char,
        /// Column of the glyph.
        column: u32,
        /// Row of the glyph.
        row: u32,
    },
    /// A coordinate lies outside the grid.
    #[error("{what} at ({column}, {row}) lies outside the grid")]
    OutOfBounds {
        /// What the coordinate describes.
        what: &'static str,
        /// Column of the coordinate.
        column: u32,
        /// Row of the coordinate.
        row: u32,
    },
    /// The move script contains an unknown step.
    #[error("unknown move '{0}', expected one of U, D, L, R or '.'")]
    InvalidMove(char),
    /// The coverage target is not a ratio.
    #[error("coverage target {0} must lie within 0.0..=1.0")]
    CoverageTarget(f32),
}

/// One entry of the player's move script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Hop one tile in the direction.
    Hop(Direction),
    /// Stand still for one hop's worth of time.
    Wait,
}

/// Entity placed on the board before the run starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Placement {
    pub(crate) kind: EntityKind,
    pub(crate) cell: CellCoord,
    pub(crate) wander: bool,
}

/// Validated scenario ready to seed a session.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scenario {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) tiles: Vec<(CellCoord, TileState)>,
    pub(crate) coverage_target: f32,
    pub(crate) seed: u64,
    pub(crate) script: Vec<Step>,
    pub(crate) entities: Vec<Placement>,
    pub(crate) fatal: Vec<(CellCoord, Duration)>,
    pub(crate) config: Config,
}

impl Scenario {
    /// Reads and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses and validates scenario TOML.
    pub(crate) fn from_toml(contents: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(contents)?;
        file.validate()
    }

    /// Commands that build the board described by the scenario on a fresh world.
    pub(crate) fn setup_commands(&self) -> Vec<Command> {
        let mut commands = vec![
            Command::ConfigureGrid {
                columns: TileCoord::new(self.columns),
                rows: TileCoord::new(self.rows),
            },
            Command::ConfigureCoverageTarget {
                target: self.coverage_target,
            },
        ];
        commands.extend(
            self.tiles
                .iter()
                .map(|&(cell, state)| Command::ClaimTile { cell, state }),
        );
        commands.extend(
            self.fatal
                .iter()
                .map(|&(cell, duration)| Command::MarkFatal { cell, duration }),
        );
        commands.extend(self.entities.iter().map(|entity| Command::SpawnEntity {
            kind: entity.kind,
            cell: entity.cell,
        }));
        commands
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    grid: GridSection,
    #[serde(default = "default_coverage_target")]
    coverage_target: f32,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    moves: String,
    #[serde(default)]
    entities: Vec<EntityEntry>,
    #[serde(default)]
    fatal: Vec<FatalEntry>,
    #[serde(default)]
    tuning: Tuning,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridSection {
    columns: u32,
    rows: u32,
    #[serde(default)]
    layout: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityEntry {
    kind: EntityKind,
    column: u32,
    row: u32,
    #[serde(default)]
    wander: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FatalEntry {
    column: u32,
    row: u32,
    millis: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Tuning {
    fill_batch: Option<usize>,
    flash_ms: Option<u64>,
    kill_dwell_ms: Option<u64>,
    kill_wait_timeout_ms: Option<u64>,
    kill_popup_ms: Option<u64>,
    bonus_wait_ms: Option<u64>,
    bonus_display_ms: Option<u64>,
    perfect_display_ms: Option<u64>,
    combo_window_ms: Option<u64>,
    perfect_bonus: Option<u32>,
    hostile_min_tiles: Option<u32>,
}

impl Tuning {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(tiles) = self.fill_batch {
            config = config.with_fill_batch(tiles);
        }
        if let Some(millis) = self.flash_ms {
            config = config.with_flash_duration(Duration::from_millis(millis));
        }
        if let Some(millis) = self.kill_dwell_ms {
            config = config.with_kill_dwell(Duration::from_millis(millis));
        }
        if let Some(millis) = self.kill_wait_timeout_ms {
            config = config.with_kill_wait_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = self.kill_popup_ms {
            config = config.with_kill_popup(Duration::from_millis(millis));
        }
        if let Some(millis) = self.bonus_wait_ms {
            config = config.with_bonus_wait(Duration::from_millis(millis));
        }
        if let Some(millis) = self.bonus_display_ms {
            config = config.with_bonus_display(Duration::from_millis(millis));
        }
        if let Some(millis) = self.perfect_display_ms {
            config = config.with_perfect_display(Duration::from_millis(millis));
        }
        if let Some(millis) = self.combo_window_ms {
            config = config.with_combo_window(Duration::from_millis(millis));
        }
        if let Some(points) = self.perfect_bonus {
            config = config.with_perfect_bonus(points);
        }
        if let Some(tiles) = self.hostile_min_tiles {
            config = config.with_hostile_min_tiles(tiles);
        }
        config
    }
}

const fn default_coverage_target() -> f32 {
    0.70
}

impl ScenarioFile {
    fn validate(self) -> Result<Scenario, ScenarioError> {
        let GridSection {
            columns,
            rows,
            layout,
        } = self.grid;
        if columns == 0 || rows == 0 {
            return Err(ScenarioError::EmptyGrid);
        }
        if !(0.0..=1.0).contains(&self.coverage_target) {
            return Err(ScenarioError::CoverageTarget(self.coverage_target));
        }

        let tiles = parse_layout(&layout, columns, rows)?;
        let in_bounds = |what: &'static str, column: u32, row: u32| {
            if column < columns && row < rows {
                Ok(CellCoord::new(column, row))
            } else {
                Err(ScenarioError::OutOfBounds { what, column, row })
            }
        };

        let entities = self
            .entities
            .iter()
            .map(|entry| -> Result<Placement, ScenarioError> {
                Ok(Placement {
                    kind: entry.kind,
                    cell: in_bounds("entity", entry.column, entry.row)?,
                    wander: entry.wander,
                })
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;
        let fatal = self
            .fatal
            .iter()
            .map(|entry| -> Result<(CellCoord, Duration), ScenarioError> {
                Ok((
                    in_bounds("fatal tile", entry.column, entry.row)?,
                    Duration::from_millis(entry.millis),
                ))
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        Ok(Scenario {
            columns,
            rows,
            tiles,
            coverage_target: self.coverage_target,
            seed: self.seed,
            script: parse_moves(&self.moves)?,
            entities,
            fatal,
            config: self.tuning.apply(Config::default()),
        })
    }
}

fn parse_layout(
    layout: &[String],
    columns: u32,
    rows: u32,
) -> Result<Vec<(CellCoord, TileState)>, ScenarioError> {
    if layout.is_empty() {
        return Ok(Vec::new());
    }
    if layout.len() != usize::try_from(rows).unwrap_or(usize::MAX) {
        return Err(ScenarioError::LayoutHeight {
            expected: rows,
            found: layout.len(),
        });
    }

    let mut tiles = Vec::new();
    for (row, line) in (0..rows).zip(layout) {
        let found = line.chars().count();
        if found != usize::try_from(columns).unwrap_or(usize::MAX) {
            return Err(ScenarioError::LayoutWidth {
                row,
                expected: columns,
                found,
            });
        }
        for (column, glyph) in (0..columns).zip(line.chars()) {
            let state = match glyph {
                '.' => continue,
                '#' => TileState::Owned,
                'r' => TileState::Claimed(ClaimColor::Red),
                'p' => TileState::Claimed(ClaimColor::Purple),
                'b' => TileState::Claimed(ClaimColor::Blue),
                'z' => TileState::Claimed(ClaimColor::Zombie),
                '^' => TileState::Spike,
                '~' => TileState::Water,
                _ => return Err(ScenarioError::UnknownGlyph { glyph, column, row }),
            };
            tiles.push((CellCoord::new(column, row), state));
        }
    }
    Ok(tiles)
}

fn parse_moves(moves: &str) -> Result<Vec<Step>, ScenarioError> {
    moves
        .chars()
        .filter(|glyph| !glyph.is_whitespace())
        .map(|glyph| match glyph.to_ascii_uppercase() {
            'U' => Ok(Step::Hop(Direction::North)),
            'D' => Ok(Step::Hop(Direction::South)),
            'L' => Ok(Step::Hop(Direction::West)),
            'R' => Ok(Step::Hop(Direction::East)),
            '.' => Ok(Step::Wait),
            _ => Err(ScenarioError::InvalidMove(glyph)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING: &str = r##"
seed = 11
coverage_target = 0.5
moves = "U . r"

[grid]
columns = 5
rows = 3
layout = [
    "#.~..",
    ".r^..",
    "....z",
]

[[entities]]
kind = "blue"
column = 4
row = 2
wander = true

[[fatal]]
column = 1
row = 1
millis = 1500

[tuning]
fill_batch = 5
combo_window_ms = 500
"##;

    #[test]
    fn parses_full_scenario() {
        let scenario = Scenario::from_toml(RING).expect("scenario parses");
        assert_eq!((scenario.columns, scenario.rows), (5, 3));
        assert_eq!(scenario.seed, 11);
        assert_eq!(
            scenario.script,
            vec![
                Step::Hop(Direction::North),
                Step::Wait,
                Step::Hop(Direction::East),
            ]
        );
        assert_eq!(
            scenario.tiles,
            vec![
                (CellCoord::new(0, 0), TileState::Owned),
                (CellCoord::new(2, 0), TileState::Water),
                (CellCoord::new(1, 1), TileState::Claimed(ClaimColor::Red)),
                (CellCoord::new(2, 1), TileState::Spike),
                (CellCoord::new(4, 2), TileState::Claimed(ClaimColor::Zombie)),
            ]
        );
        assert_eq!(
            scenario.entities,
            vec![Placement {
                kind: EntityKind::Blue,
                cell: CellCoord::new(4, 2),
                wander: true,
            }]
        );
        assert_eq!(
            scenario.fatal,
            vec![(CellCoord::new(1, 1), Duration::from_millis(1_500))]
        );
        assert_eq!(
            scenario.config,
            Config::new()
                .with_fill_batch(5)
                .with_combo_window(Duration::from_millis(500))
        );
    }

    #[test]
    fn setup_commands_configure_then_populate() {
        let scenario = Scenario::from_toml(RING).expect("scenario parses");
        let commands = scenario.setup_commands();
        assert_eq!(
            commands.first(),
            Some(&Command::ConfigureGrid {
                columns: TileCoord::new(5),
                rows: TileCoord::new(3),
            })
        );
        assert_eq!(
            commands.last(),
            Some(&Command::SpawnEntity {
                kind: EntityKind::Blue,
                cell: CellCoord::new(4, 2),
            })
        );
        assert_eq!(commands.len(), 2 + 5 + 1 + 1);
    }

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_toml("[grid]\ncolumns = 16\nrows = 14\n").expect("parses");
        assert!(scenario.tiles.is_empty());
        assert!(scenario.script.is_empty());
        assert!((scenario.coverage_target - 0.70).abs() < f32::EPSILON);
        assert_eq!(scenario.config, Config::default());
    }

    #[test]
    fn rejects_malformed_layouts() {
        let short = "[grid]\ncolumns = 2\nrows = 2\nlayout = [\"..\"]\n";
        assert!(matches!(
            Scenario::from_toml(short),
            Err(ScenarioError::LayoutHeight {
                expected: 2,
                found: 1
            })
        ));

        let narrow = "[grid]\ncolumns = 2\nrows = 1\nlayout = [\".\"]\n";
        assert!(matches!(
            Scenario::from_toml(narrow),
            Err(ScenarioError::LayoutWidth { row: 0, .. })
        ));

        let glyph = "[grid]\ncolumns = 2\nrows = 1\nlayout = [\".x\"]\n";
        assert!(matches!(
            Scenario::from_toml(glyph),
            Err(ScenarioError::UnknownGlyph {
                glyph: 'x',
                column: 1,
                row: 0
            })
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let entity = "[grid]\ncolumns = 2\nrows = 2\n[[entities]]\nkind = \"red\"\ncolumn = 2\nrow = 0\n";
        assert!(matches!(
            Scenario::from_toml(entity),
            Err(ScenarioError::OutOfBounds {
                what: "entity",
                ..
            })
        ));

        let target = "coverage_target = 1.5\n[grid]\ncolumns = 2\nrows = 2\n";
        assert!(matches!(
            Scenario::from_toml(target),
            Err(ScenarioError::CoverageTarget(_))
        ));

        let moves = "moves = \"UX\"\n[grid]\ncolumns = 2\nrows = 2\n";
        assert!(matches!(
            Scenario::from_toml(moves),
            Err(ScenarioError::InvalidMove('X'))
        ));

        let empty = "[grid]\ncolumns = 0\nrows = 2\n";
        assert!(matches!(
            Scenario::from_toml(empty),
            Err(ScenarioError::EmptyGrid)
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let typo = "[grid]\ncolumns = 2\nrows = 2\n[tuning]\nfill_bach = 2\n";
        assert!(matches!(
            Scenario::from_toml(typo),
            Err(ScenarioError::Parse(_))
        ));
    }
}
