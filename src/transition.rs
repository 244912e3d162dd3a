//! Fixed-duration transition between a confirmed click and navigation.
//!
//! The state is a plain value advanced by an explicit timestamp, so the whole
//! animation is a function of elapsed time and can be driven by a simulated
//! clock.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::navigation::Destination;

/// Timing of a transition, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    #[serde(default = "default_duration")]
    pub duration_ms: f64,
    /// Pause between the animation finishing and the navigation firing.
    #[serde(default = "default_settle")]
    pub settle_ms: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration(),
            settle_ms: default_settle(),
        }
    }
}

fn default_duration() -> f64 {
    300.0
}

fn default_settle() -> f64 {
    40.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    started_at: f64,
    config: TransitionConfig,
    target: Destination,
    focus: Vec3,
    completed_at: Option<f64>,
}

impl Transition {
    pub fn new(started_at: f64, config: TransitionConfig, target: Destination, focus: Vec3) -> Self {
        Self {
            started_at,
            config,
            target,
            focus,
            completed_at: None,
        }
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn target(&self) -> &Destination {
        &self.target
    }

    /// World position of the object that was clicked.
    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    /// Elapsed fraction of the animation, clamped to `[0, 1]`. A transition
    /// without a usable duration is complete immediately.
    pub fn progress(&self, now: f64) -> f32 {
        let duration = self.config.duration_ms;
        if !duration.is_finite() || duration <= 0.0 {
            return 1.0;
        }
        let ratio = (now - self.started_at) / duration;
        if !ratio.is_finite() {
            return 1.0;
        }
        ratio.clamp(0.0, 1.0) as f32
    }
}

/// What a single frame of the transition produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionTick {
    /// No transition is running.
    Idle,
    /// Dependent visuals should be animated with this progress.
    Animating { progress: f32, focus: Vec3 },
    /// Animation finished; waiting for the settle delay.
    Settling,
    /// The navigation sink was invoked with this destination.
    Navigated(Destination),
}

/// `Idle → Transitioning → Idle`. At most one transition exists at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Transitioning(Transition),
}

impl TransitionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Transitioning(_))
    }

    pub fn current(&self) -> Option<&Transition> {
        match self {
            Self::Idle => None,
            Self::Transitioning(transition) => Some(transition),
        }
    }

    /// Starts a transition unless one is already running. Returns whether the
    /// new transition was accepted.
    pub fn begin(&mut self, transition: Transition) -> bool {
        if self.is_active() {
            return false;
        }
        *self = Self::Transitioning(transition);
        true
    }

    /// Advances the transition to `now`. Returns [`TransitionTick::Navigated`]
    /// exactly once per transition, after which the state is `Idle` again.
    pub fn advance(&mut self, now: f64) -> TransitionTick {
        let Self::Transitioning(transition) = &mut *self else {
            return TransitionTick::Idle;
        };
        let settle = match transition.config.settle_ms {
            settle if settle.is_finite() => settle,
            _ => 0.0,
        };
        match transition.completed_at {
            None => {
                let progress = transition.progress(now);
                let focus = transition.focus;
                if progress >= 1.0 {
                    transition.completed_at = Some(now);
                    if settle <= 0.0 {
                        return self.finish();
                    }
                }
                TransitionTick::Animating { progress, focus }
            }
            Some(completed_at) if now - completed_at >= settle => self.finish(),
            Some(_) => TransitionTick::Settling,
        }
    }

    fn finish(&mut self) -> TransitionTick {
        match std::mem::take(self) {
            Self::Transitioning(transition) => TransitionTick::Navigated(transition.target),
            Self::Idle => TransitionTick::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(started_at: f64, duration_ms: f64, settle_ms: f64) -> Transition {
        Transition::new(
            started_at,
            TransitionConfig {
                duration_ms,
                settle_ms,
            },
            Destination::new("activity.html").unwrap(),
            Vec3::new(-5.0, 1.0, -10.0),
        )
    }

    #[test]
    fn progress_is_clamped() {
        let transition = transition(100.0, 300.0, 40.0);
        assert_eq!(transition.progress(50.0), 0.0);
        assert_eq!(transition.progress(250.0), 0.5);
        assert_eq!(transition.progress(10_000.0), 1.0);
    }

    #[test]
    fn progress_never_decreases() {
        let mut state = TransitionState::Idle;
        assert!(state.begin(transition(0.0, 300.0, 40.0)));
        let mut last = 0.0;
        for now in (0..=30).map(|step| step as f64 * 11.0) {
            if let TransitionTick::Animating { progress, .. } = state.advance(now) {
                assert!((0.0..=1.0).contains(&progress));
                assert!(progress >= last);
                last = progress;
            }
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn navigates_once_after_settle_delay() {
        let mut state = TransitionState::Idle;
        state.begin(transition(0.0, 300.0, 40.0));
        assert!(matches!(state.advance(150.0), TransitionTick::Animating { .. }));
        assert_eq!(
            state.advance(300.0),
            TransitionTick::Animating {
                progress: 1.0,
                focus: Vec3::new(-5.0, 1.0, -10.0)
            }
        );
        assert_eq!(state.advance(320.0), TransitionTick::Settling);
        let tick = state.advance(340.0);
        assert_eq!(
            tick,
            TransitionTick::Navigated(Destination::new("activity.html").unwrap())
        );
        assert!(!state.is_active());
        assert_eq!(state.advance(400.0), TransitionTick::Idle);
    }

    #[test]
    fn zero_length_transition_navigates_on_first_frame() {
        let mut state = TransitionState::Idle;
        state.begin(transition(10.0, 0.0, 0.0));
        assert!(matches!(state.advance(10.0), TransitionTick::Navigated(_)));
        assert!(!state.is_active());
    }

    #[test]
    fn non_finite_timing_still_navigates() {
        for (duration_ms, settle_ms) in [(f64::NAN, 40.0), (f64::INFINITY, 40.0), (300.0, f64::NAN)] {
            let mut state = TransitionState::Idle;
            state.begin(transition(0.0, duration_ms, settle_ms));
            let mut navigated = 0;
            for step in 0..100 {
                match state.advance(step as f64 * 16.0) {
                    TransitionTick::Animating { progress, .. } => {
                        assert!((0.0..=1.0).contains(&progress))
                    }
                    TransitionTick::Navigated(_) => navigated += 1,
                    _ => {}
                }
            }
            assert_eq!(navigated, 1, "duration {duration_ms} settle {settle_ms}");
            assert!(!state.is_active());
        }
    }

    #[test]
    fn second_begin_is_rejected() {
        let mut state = TransitionState::Idle;
        assert!(state.begin(transition(0.0, 300.0, 40.0)));
        assert!(!state.begin(transition(50.0, 300.0, 40.0)));
        assert_eq!(state.current().unwrap().started_at(), 0.0);
    }
}
