//! Capture pipeline: fill, sequential kills and bonus awards spread across frames.

use std::time::Duration;

use errand_core::{CellCoord, Command, Cue, EntityId, EntityKind, GridView, TileState};

use crate::{
    feedback::{Feedback, PopupKind},
    scoring::{fill_score, kill_score},
    Config,
};

/// Publicly observable stage of the active capture pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Queued tiles are being claimed in small batches.
    Filling,
    /// A trapped entity was just captured and its award is pending.
    Killing,
    /// Waiting for the previous kill popup to fade before the next capture.
    KillWait,
    /// Short pause before the fill bonus.
    BonusWait,
    /// The fill bonus is on display.
    Bonus,
    /// The perfect-board banner is on display.
    PerfectWait,
    /// Finished; cleanup runs and the engine returns to idle.
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Filling { drained: bool },
    Killing { remaining: Duration },
    KillWait { waited: Duration },
    BonusWait { remaining: Duration },
    Bonus { remaining: Duration },
    PerfectWait { remaining: Duration },
    Done,
}

impl Stage {
    const fn public(self) -> PipelineStage {
        match self {
            Self::Filling { .. } => PipelineStage::Filling,
            Self::Killing { .. } => PipelineStage::Killing,
            Self::KillWait { .. } => PipelineStage::KillWait,
            Self::BonusWait { .. } => PipelineStage::BonusWait,
            Self::Bonus { .. } => PipelineStage::Bonus,
            Self::PerfectWait { .. } => PipelineStage::PerfectWait,
            Self::Done => PipelineStage::Done,
        }
    }
}

/// Entity found inside the sealed region when the pipeline started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Trapped {
    pub(crate) entity: EntityId,
    pub(crate) kind: EntityKind,
    pub(crate) cell: CellCoord,
}

/// Read-only inputs for a single pipeline step.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame<'a> {
    pub(crate) dt: Duration,
    pub(crate) grid: GridView<'a>,
    pub(crate) win_condition_met: bool,
}

/// Mutable engine state a pipeline step may touch.
#[derive(Debug)]
pub(crate) struct Sinks<'a> {
    pub(crate) config: &'a Config,
    pub(crate) feedback: &'a mut Feedback,
    pub(crate) movement_frozen: &'a mut bool,
    pub(crate) out: &'a mut Vec<Command>,
}

#[derive(Debug)]
pub(crate) struct Pipeline {
    stage: Stage,
    queue: Vec<CellCoord>,
    cursor: usize,
    claimed: u32,
    trapped: Vec<Trapped>,
    kill_index: usize,
    combo: u32,
}

impl Pipeline {
    pub(crate) fn new(queue: Vec<CellCoord>, trapped: Vec<Trapped>, combo: u32) -> Self {
        Self {
            stage: Stage::Filling { drained: false },
            queue,
            cursor: 0,
            claimed: 0,
            trapped,
            kill_index: 0,
            combo,
        }
    }

    pub(crate) fn stage(&self) -> PipelineStage {
        self.stage.public()
    }

    /// Advances the machine by one frame, emitting world commands into `sinks.out`.
    pub(crate) fn advance(&mut self, frame: Frame<'_>, sinks: &mut Sinks<'_>) {
        let next = match self.stage {
            Stage::Filling { drained: false } => self.fill_batch(frame.grid, sinks),
            Stage::Filling { drained: true } => {
                if !frame.win_condition_met {
                    *sinks.movement_frozen = false;
                }
                if self.trapped.is_empty() {
                    self.award_fill_bonus(sinks);
                    Stage::Bonus {
                        remaining: sinks.config.bonus_display,
                    }
                } else {
                    self.capture_next(sinks);
                    Stage::Killing {
                        remaining: sinks.config.kill_dwell,
                    }
                }
            }
            Stage::Killing { remaining } => {
                let remaining = remaining.saturating_sub(frame.dt);
                if remaining.is_zero() {
                    self.award_kill(sinks);
                    if self.kill_index < self.trapped.len() {
                        Stage::KillWait {
                            waited: Duration::ZERO,
                        }
                    } else {
                        Stage::BonusWait {
                            remaining: sinks.config.bonus_wait,
                        }
                    }
                } else {
                    Stage::Killing { remaining }
                }
            }
            Stage::KillWait { waited } => {
                let waited = waited.saturating_add(frame.dt);
                if !sinks.feedback.has_popups() || waited >= sinks.config.kill_wait_timeout {
                    self.capture_next(sinks);
                    Stage::Killing {
                        remaining: sinks.config.kill_dwell,
                    }
                } else {
                    Stage::KillWait { waited }
                }
            }
            Stage::BonusWait { remaining } => {
                let remaining = remaining.saturating_sub(frame.dt);
                if remaining.is_zero() && !sinks.feedback.has_popups() {
                    self.award_fill_bonus(sinks);
                    Stage::Bonus {
                        remaining: sinks.config.bonus_display,
                    }
                } else {
                    Stage::BonusWait { remaining }
                }
            }
            Stage::Bonus { remaining } => {
                let remaining = remaining.saturating_sub(frame.dt);
                if !remaining.is_zero() || sinks.feedback.has_popups() {
                    Stage::Bonus { remaining }
                } else if frame.grid.is_fully_covered(TileState::Owned) {
                    self.award_perfect(sinks);
                    Stage::PerfectWait {
                        remaining: sinks.config.perfect_display,
                    }
                } else {
                    Stage::Done
                }
            }
            Stage::PerfectWait { remaining } => {
                let remaining = remaining.saturating_sub(frame.dt);
                if remaining.is_zero() && !sinks.feedback.has_popups() {
                    Stage::Done
                } else {
                    Stage::PerfectWait { remaining }
                }
            }
            Stage::Done => Stage::Done,
        };

        if next.public() != self.stage.public() {
            tracing::debug!(from = ?self.stage.public(), to = ?next.public(), "capture pipeline stage");
        }
        self.stage = next;
    }

    fn fill_batch(&mut self, grid: GridView<'_>, sinks: &mut Sinks<'_>) -> Stage {
        for _ in 0..sinks.config.fill_batch {
            let Some(&cell) = self.queue.get(self.cursor) else {
                break;
            };
            self.cursor += 1;
            if grid.get(cell).is_some_and(|state| state != TileState::Owned) {
                sinks.out.push(Command::ClaimTile {
                    cell,
                    state: TileState::Owned,
                });
                sinks.feedback.flash(cell, sinks.config.flash_duration);
                self.claimed += 1;
            }
        }

        Stage::Filling {
            drained: self.cursor >= self.queue.len(),
        }
    }

    fn capture_next(&self, sinks: &mut Sinks<'_>) {
        if let Some(trapped) = self.trapped.get(self.kill_index) {
            sinks.out.push(Command::CaptureEntity {
                entity: trapped.entity,
            });
            sinks.out.push(Command::EmitCue { cue: Cue::Capture });
        }
    }

    fn award_kill(&mut self, sinks: &mut Sinks<'_>) {
        let Some(trapped) = self.trapped.get(self.kill_index).copied() else {
            return;
        };
        let order = u32::try_from(self.kill_index + 1).unwrap_or(u32::MAX);
        let points = kill_score(trapped.kind, order);
        sinks.out.push(Command::AwardScore {
            points: i64::from(points),
        });

        let text = if order > 1 {
            format!("+{points} x{order}")
        } else {
            format!("+{points}")
        };
        sinks.feedback.popup(
            text,
            trapped.cell,
            PopupKind::Score,
            sinks.config.kill_popup,
        );
        self.kill_index += 1;
    }

    fn award_fill_bonus(&self, sinks: &mut Sinks<'_>) {
        let points = fill_score(self.claimed).saturating_mul(self.combo);
        if points == 0 {
            return;
        }
        sinks.out.push(Command::AwardScore {
            points: i64::from(points),
        });

        let text = if self.combo > 1 {
            format!("+{points} x{}", self.combo)
        } else {
            format!("+{points}")
        };
        sinks.feedback.popup(
            text,
            self.centroid(),
            PopupKind::Score,
            sinks.config.bonus_display,
        );
    }

    fn award_perfect(&self, sinks: &mut Sinks<'_>) {
        tracing::info!(bonus = sinks.config.perfect_bonus, "perfect board");
        sinks.out.push(Command::AwardScore {
            points: i64::from(sinks.config.perfect_bonus),
        });
        sinks.out.push(Command::EmitCue { cue: Cue::Perfect });
        sinks.feedback.popup(
            "PERFECT!".to_owned(),
            self.centroid(),
            PopupKind::Perfect,
            sinks.config.perfect_display,
        );
    }

    fn centroid(&self) -> CellCoord {
        let count = u64::try_from(self.queue.len()).unwrap_or(u64::MAX).max(1);
        let (columns, rows) = self.queue.iter().fold((0_u64, 0_u64), |(columns, rows), cell| {
            (
                columns + u64::from(cell.column()),
                rows + u64::from(cell.row()),
            )
        });
        CellCoord::new(
            u32::try_from(columns / count).unwrap_or(0),
            u32::try_from(rows / count).unwrap_or(0),
        )
    }
}
