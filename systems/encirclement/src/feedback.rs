//! Time-boxed flash markers and floating score popups consumed by renderers.

use std::time::Duration;

use errand_core::CellCoord;

const POPUP_FADE: Duration = Duration::from_millis(800);
const POPUP_RISE_PER_MILLI: f32 = 0.02;

/// Tile that was just claimed by a fill and should blink briefly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashTile {
    /// Tile that was claimed.
    pub cell: CellCoord,
    /// Time left before the marker disappears.
    pub remaining: Duration,
}

/// Visual category of a popup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupKind {
    /// Kill or fill score.
    Score,
    /// Whole-board bonus banner.
    Perfect,
}

/// Floating text announcing an award.
#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    /// Text to draw, e.g. `+400 x2`.
    pub text: String,
    /// Tile the popup is anchored to.
    pub anchor: CellCoord,
    /// Visual category.
    pub kind: PopupKind,
    /// Time left before the popup disappears.
    pub remaining: Duration,
    /// Distance in pixels the popup has floated upward so far.
    pub rise: f32,
}

impl Popup {
    /// Opacity in `0.0..=1.0`; fades out over the final 800 ms.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        (self.remaining.as_secs_f32() / POPUP_FADE.as_secs_f32()).min(1.0)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Feedback {
    flashes: Vec<FlashTile>,
    popups: Vec<Popup>,
}

impl Feedback {
    pub(crate) fn flash(&mut self, cell: CellCoord, duration: Duration) {
        self.flashes.push(FlashTile {
            cell,
            remaining: duration,
        });
    }

    pub(crate) fn popup(
        &mut self,
        text: String,
        anchor: CellCoord,
        kind: PopupKind,
        duration: Duration,
    ) {
        self.popups.push(Popup {
            text,
            anchor,
            kind,
            remaining: duration,
            rise: 0.0,
        });
    }

    pub(crate) fn has_popups(&self) -> bool {
        !self.popups.is_empty()
    }

    pub(crate) fn flashes(&self) -> &[FlashTile] {
        &self.flashes
    }

    pub(crate) fn popups(&self) -> &[Popup] {
        &self.popups
    }

    /// Advances every timer and drops the entries that expired.
    pub(crate) fn tick(&mut self, dt: Duration) {
        for flash in &mut self.flashes {
            flash.remaining = flash.remaining.saturating_sub(dt);
        }
        self.flashes.retain(|flash| !flash.remaining.is_zero());

        let rise = dt.as_secs_f32() * 1_000.0 * POPUP_RISE_PER_MILLI;
        for popup in &mut self.popups {
            popup.remaining = popup.remaining.saturating_sub(dt);
            popup.rise += rise;
        }
        self.popups.retain(|popup| !popup.remaining.is_zero());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashes_expire_after_their_duration() {
        let mut feedback = Feedback::default();
        feedback.flash(CellCoord::new(1, 1), Duration::from_millis(200));
        feedback.tick(Duration::from_millis(150));
        assert_eq!(feedback.flashes().len(), 1);
        feedback.tick(Duration::from_millis(50));
        assert!(feedback.flashes().is_empty());
    }

    #[test]
    fn popups_fade_and_rise() {
        let mut feedback = Feedback::default();
        feedback.popup(
            "+10".to_owned(),
            CellCoord::new(2, 2),
            PopupKind::Score,
            Duration::from_millis(1_000),
        );
        assert!((feedback.popups()[0].alpha() - 1.0).abs() < f32::EPSILON);

        feedback.tick(Duration::from_millis(600));
        let popup = &feedback.popups()[0];
        assert!((popup.alpha() - 0.5).abs() < 1e-3);
        assert!((popup.rise - 12.0).abs() < 1e-3);
        assert!(feedback.has_popups());

        feedback.tick(Duration::from_millis(400));
        assert!(!feedback.has_popups());
    }
}
