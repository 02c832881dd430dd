//! Frame phase state machine.
//!
//! One `draw` walks `BeginDraw → SceneDrawn → Lit → Composed → Resolved`;
//! `present` moves to `Presented`; `update` closes the frame back to `Idle`.

use crate::error::DeferredError;

/// Where the frame driver is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    /// Between frames; submissions are accepted.
    #[default]
    Idle,
    /// Render targets validated, GBuffer bound and cleared.
    BeginDraw,
    /// Scene geometry and billboards rasterized into the GBuffer.
    SceneDrawn,
    /// Light accumulation resolved.
    Lit,
    /// Post-process chain written to the final target.
    Composed,
    /// GBuffer unbound and the frame's commands submitted.
    Resolved,
    /// Final target blitted to the output.
    Presented,
}

impl FramePhase {
    /// The phase that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::BeginDraw,
            Self::BeginDraw => Self::SceneDrawn,
            Self::SceneDrawn => Self::Lit,
            Self::Lit => Self::Composed,
            Self::Composed => Self::Resolved,
            Self::Resolved => Self::Presented,
            Self::Presented => Self::Idle,
        }
    }

    /// `draw` may start here. Re-drawing from `Resolved` discards the
    /// unpresented frame; drawing from `Presented` passes through `Idle`.
    #[must_use]
    pub const fn can_begin_draw(self) -> bool {
        matches!(self, Self::Idle | Self::Resolved | Self::Presented)
    }
}

/// Tracks the current phase and rejects out-of-order transitions.
#[derive(Debug, Default)]
pub(crate) struct FrameCycle {
    phase: FramePhase,
}

impl FrameCycle {
    pub(crate) fn phase(&self) -> FramePhase {
        self.phase
    }

    pub(crate) fn begin_draw(&mut self) -> Result<(), DeferredError> {
        if !self.phase.can_begin_draw() {
            return Err(DeferredError::FrameOrder {
                expected: FramePhase::Idle,
                found: self.phase,
            });
        }
        if self.phase == FramePhase::Resolved {
            log::debug!("discarding unpresented frame");
        }
        self.phase = FramePhase::BeginDraw;
        Ok(())
    }

    /// Step to `to`, which must directly follow the current phase.
    pub(crate) fn advance(&mut self, to: FramePhase) -> Result<(), DeferredError> {
        if self.phase.next() != to {
            return Err(DeferredError::FrameOrder {
                expected: self.phase.next(),
                found: to,
            });
        }
        self.phase = to;
        Ok(())
    }

    pub(crate) fn begin_present(&self) -> Result<(), DeferredError> {
        if self.phase == FramePhase::Resolved {
            Ok(())
        } else {
            Err(DeferredError::FrameOrder {
                expected: FramePhase::Resolved,
                found: self.phase,
            })
        }
    }

    /// Back to `Idle` from any phase. Used by `update` and to abandon a
    /// draw that failed midway.
    pub(crate) fn reset(&mut self) {
        self.phase = FramePhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn() -> FrameCycle {
        let mut cycle = FrameCycle::default();
        cycle.begin_draw().unwrap();
        for phase in [
            FramePhase::SceneDrawn,
            FramePhase::Lit,
            FramePhase::Composed,
            FramePhase::Resolved,
        ] {
            cycle.advance(phase).unwrap();
        }
        cycle
    }

    #[test]
    fn full_cycle_returns_to_idle() {
        let mut phase = FramePhase::Idle;
        for _ in 0..7 {
            phase = phase.next();
        }
        assert_eq!(phase, FramePhase::Idle);
    }

    #[test]
    fn draw_walks_to_resolved() {
        assert_eq!(drawn().phase(), FramePhase::Resolved);
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let mut cycle = FrameCycle::default();
        cycle.begin_draw().unwrap();
        let err = cycle.advance(FramePhase::Lit).unwrap_err();
        assert!(matches!(
            err,
            DeferredError::FrameOrder {
                expected: FramePhase::SceneDrawn,
                found: FramePhase::Lit,
            }
        ));
    }

    #[test]
    fn present_requires_resolved() {
        let cycle = FrameCycle::default();
        assert!(cycle.begin_present().is_err());
        assert!(drawn().begin_present().is_ok());
    }

    #[test]
    fn redraw_from_resolved_is_allowed() {
        let mut cycle = drawn();
        assert!(cycle.begin_draw().is_ok());
        assert_eq!(cycle.phase(), FramePhase::BeginDraw);
    }

    #[test]
    fn draw_after_present_starts_the_next_frame() {
        let mut cycle = drawn();
        cycle.advance(FramePhase::Presented).unwrap();
        assert!(cycle.begin_draw().is_ok());
        assert_eq!(cycle.phase(), FramePhase::BeginDraw);
    }

    #[test]
    fn present_twice_is_rejected() {
        let mut cycle = drawn();
        cycle.begin_present().unwrap();
        cycle.advance(FramePhase::Presented).unwrap();
        assert!(matches!(
            cycle.begin_present(),
            Err(DeferredError::FrameOrder {
                expected: FramePhase::Resolved,
                found: FramePhase::Presented,
            })
        ));
    }

    #[test]
    fn draw_cannot_reenter() {
        let mut cycle = FrameCycle::default();
        cycle.begin_draw().unwrap();
        assert!(cycle.begin_draw().is_err());
    }
}
