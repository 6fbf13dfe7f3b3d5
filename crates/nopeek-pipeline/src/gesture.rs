// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Touch gesture classifier.
//
// Consumes raw touch-sequence events and classifies them as pinch or slide
// gestures. Only one- and two-finger sequences are recognised:
//
//   idle ──2 touches──▶ pinching ──end──▶ idle
//   idle ──1 touch, moved past threshold──▶ sliding ──end──▶ idle

use tracing::trace;

/// Default travel, in px, a finger must exceed before a move is a slide.
pub const DEFAULT_SLIDE_THRESHOLD: f32 = 10.0;

/// A single touch point in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &TouchPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &TouchPoint) -> TouchPoint {
        TouchPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Phase of a raw touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// A raw touch event: every finger currently on screen plus a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: Vec<TouchPoint>,
    pub timestamp_ms: u64,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Pinching,
    Sliding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SlideDirection {
    fn along(axis: Axis, dx: f32, dy: f32) -> Self {
        match axis {
            Axis::Vertical if dy > 0.0 => Self::Down,
            Axis::Vertical => Self::Up,
            Axis::Horizontal if dx > 0.0 => Self::Right,
            Axis::Horizontal => Self::Left,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Self::Up | Self::Down => Axis::Vertical,
            Self::Left | Self::Right => Axis::Horizontal,
        }
    }
}

/// A classified gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PinchBegin {
        center: TouchPoint,
        distance: f32,
    },
    Pinch {
        scale: f32,
        center: TouchPoint,
        current_distance: f32,
        initial_distance: f32,
    },
    PinchEnd,
    SlideStart {
        direction: SlideDirection,
        origin: TouchPoint,
    },
    SlideUpdate {
        direction: SlideDirection,
        dx: f32,
        dy: f32,
        /// Travel along the slide axis per millisecond.
        velocity: f32,
        current: TouchPoint,
    },
    SlideEnd {
        direction: SlideDirection,
        dx: f32,
        dy: f32,
        velocity: f32,
    },
}

/// Transient per-sequence state, reset on touch end.
#[derive(Debug, Clone)]
struct GestureState {
    phase: GesturePhase,
    initial_touches: Vec<TouchPoint>,
    last_touches: Vec<TouchPoint>,
    initial_distance: Option<f32>,
    start_time_ms: u64,
    axis: Option<Axis>,
    /// Last slide update, replayed as the slide-end summary.
    last_slide: Option<(SlideDirection, f32, f32, f32)>,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            phase: GesturePhase::Idle,
            initial_touches: Vec::new(),
            last_touches: Vec::new(),
            initial_distance: None,
            start_time_ms: 0,
            axis: None,
            last_slide: None,
        }
    }
}

/// State machine turning touch sequences into gesture events.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    threshold: f32,
    state: GestureState,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDE_THRESHOLD)
    }
}

impl GestureClassifier {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: GestureState::default(),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.state.phase
    }

    /// Fingers seen on the most recent start or move.
    pub fn last_touches(&self) -> &[TouchPoint] {
        &self.state.last_touches
    }

    /// Feed one raw event and collect whatever gestures it completes.
    pub fn handle(&mut self, event: &TouchEvent) -> Vec<GestureEvent> {
        match event.phase {
            TouchPhase::Start => self.touch_start(&event.touches, event.timestamp_ms),
            TouchPhase::Move => self.touch_move(&event.touches, event.timestamp_ms),
            TouchPhase::End | TouchPhase::Cancel => self.touch_end(),
        }
    }

    pub fn touch_start(&mut self, touches: &[TouchPoint], now_ms: u64) -> Vec<GestureEvent> {
        let mut out = Vec::new();

        if touches.len() > 2 {
            trace!(touches = touches.len(), "unsupported touch count, resetting");
            self.state = GestureState::default();
            return out;
        }

        if self.state.phase == GesturePhase::Sliding && touches.len() == 2 {
            out.extend(self.slide_end());
        }

        self.state.initial_touches = touches.to_vec();
        self.state.last_touches = touches.to_vec();
        self.state.start_time_ms = now_ms;
        self.state.axis = None;
        self.state.last_slide = None;

        if let [a, b] = touches {
            let distance = a.distance_to(b);
            self.state.phase = GesturePhase::Pinching;
            self.state.initial_distance = Some(distance);
            out.push(GestureEvent::PinchBegin {
                center: a.midpoint(b),
                distance,
            });
        } else {
            self.state.phase = GesturePhase::Idle;
            self.state.initial_distance = None;
        }
        out
    }

    pub fn touch_move(&mut self, touches: &[TouchPoint], now_ms: u64) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        match touches {
            [a, b] if self.state.phase == GesturePhase::Pinching => {
                let current_distance = a.distance_to(b);
                let initial_distance = self.state.initial_distance.unwrap_or(current_distance);
                let scale = if initial_distance > 0.0 {
                    current_distance / initial_distance
                } else {
                    current_distance
                };
                self.state.last_touches = touches.to_vec();
                out.push(GestureEvent::Pinch {
                    scale,
                    center: a.midpoint(b),
                    current_distance,
                    initial_distance,
                });
            }
            [point] if self.state.phase != GesturePhase::Pinching => {
                let [origin] = self.state.initial_touches[..] else {
                    return out;
                };
                let dx = point.x - origin.x;
                let dy = point.y - origin.y;
                let elapsed = now_ms.saturating_sub(self.state.start_time_ms).max(1) as f32;

                if self.state.phase == GesturePhase::Idle {
                    if let Some(axis) = self.classify(dx, dy) {
                        self.state.phase = GesturePhase::Sliding;
                        self.state.axis = Some(axis);
                        out.push(GestureEvent::SlideStart {
                            direction: SlideDirection::along(axis, dx, dy),
                            origin,
                        });
                    }
                }

                if let (GesturePhase::Sliding, Some(axis)) = (self.state.phase, self.state.axis) {
                    let direction = SlideDirection::along(axis, dx, dy);
                    let travel = match axis {
                        Axis::Vertical => dy,
                        Axis::Horizontal => dx,
                    };
                    let velocity = travel / elapsed;
                    self.state.last_slide = Some((direction, dx, dy, velocity));
                    out.push(GestureEvent::SlideUpdate {
                        direction,
                        dx,
                        dy,
                        velocity,
                        current: *point,
                    });
                }
                self.state.last_touches = touches.to_vec();
            }
            _ => {}
        }
        out
    }

    pub fn touch_end(&mut self) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        match self.state.phase {
            GesturePhase::Pinching => out.push(GestureEvent::PinchEnd),
            GesturePhase::Sliding => out.extend(self.slide_end()),
            GesturePhase::Idle => {}
        }
        self.state = GestureState::default();
        out
    }

    /// Strict comparisons: ties and sub-threshold travel stay unclassified.
    fn classify(&self, dx: f32, dy: f32) -> Option<Axis> {
        let (ax, ay) = (dx.abs(), dy.abs());
        if ay > ax && ay > self.threshold {
            Some(Axis::Vertical)
        } else if ax > ay && ax > self.threshold {
            Some(Axis::Horizontal)
        } else {
            None
        }
    }

    fn slide_end(&mut self) -> Option<GestureEvent> {
        let (direction, dx, dy, velocity) = self.state.last_slide.take()?;
        self.state.phase = GesturePhase::Idle;
        Some(GestureEvent::SlideEnd {
            direction,
            dx,
            dy,
            velocity,
        })
    }
}

/// What a finished gesture asks the sanitization flow to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Advance to the next stage.
    Next,
}

impl NavigationIntent {
    /// A completed leftward swipe advances. Stages never go back, so nothing
    /// else maps to an intent.
    pub fn from_gesture(event: &GestureEvent) -> Option<Self> {
        match event {
            GestureEvent::SlideEnd {
                direction: SlideDirection::Left,
                ..
            } => Some(Self::Next),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> TouchPoint {
        TouchPoint::new(x, y)
    }

    #[test]
    fn small_move_is_not_a_slide() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(100.0, 100.0)], 0);
        let events = g.touch_move(&[p(105.0, 103.0)], 16);
        assert!(events.is_empty());
        assert_eq!(g.phase(), GesturePhase::Idle);
    }

    #[test]
    fn vertical_slide_down_past_threshold() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(100.0, 100.0)], 0);
        let events = g.touch_move(&[p(102.0, 111.0)], 20);
        assert_eq!(g.phase(), GesturePhase::Sliding);
        assert_eq!(
            events[0],
            GestureEvent::SlideStart {
                direction: SlideDirection::Down,
                origin: p(100.0, 100.0)
            }
        );
        match events[1] {
            GestureEvent::SlideUpdate { direction, dy, velocity, .. } => {
                assert_eq!(direction, SlideDirection::Down);
                assert_eq!(dy, 11.0);
                assert!((velocity - 0.55).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exactly_threshold_does_not_trigger() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(0.0, 0.0)], 0);
        assert!(g.touch_move(&[p(0.0, -10.0)], 5).is_empty());
        assert!(!g.touch_move(&[p(0.0, -10.5)], 6).is_empty());
    }

    #[test]
    fn diagonal_tie_is_not_a_slide() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(0.0, 0.0)], 0);
        assert!(g.touch_move(&[p(20.0, 20.0)], 5).is_empty());
        assert_eq!(g.phase(), GesturePhase::Idle);
    }

    #[test]
    fn horizontal_slide_locks_axis() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(200.0, 100.0)], 0);
        let events = g.touch_move(&[p(150.0, 104.0)], 50);
        assert!(matches!(
            events[0],
            GestureEvent::SlideStart { direction: SlideDirection::Left, .. }
        ));
        // Drifting mostly vertically afterwards keeps the horizontal axis.
        let events = g.touch_move(&[p(140.0, 180.0)], 100);
        assert!(matches!(
            events[0],
            GestureEvent::SlideUpdate { direction: SlideDirection::Left, .. }
        ));
    }

    #[test]
    fn zero_elapsed_time_is_guarded() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(0.0, 0.0)], 1000);
        let events = g.touch_move(&[p(0.0, 30.0)], 1000);
        match events[1] {
            GestureEvent::SlideUpdate { velocity, .. } => assert_eq!(velocity, 30.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pinch_reports_scale() {
        let mut g = GestureClassifier::default();
        let events = g.touch_start(&[p(0.0, 0.0), p(100.0, 0.0)], 0);
        assert_eq!(
            events,
            vec![GestureEvent::PinchBegin {
                center: p(50.0, 0.0),
                distance: 100.0
            }]
        );
        let events = g.touch_move(&[p(-25.0, 0.0), p(125.0, 0.0)], 10);
        match events[0] {
            GestureEvent::Pinch { scale, center, .. } => {
                assert_eq!(scale, 1.5);
                assert_eq!(center, p(50.0, 0.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(g.touch_end(), vec![GestureEvent::PinchEnd]);
        assert_eq!(g.phase(), GesturePhase::Idle);
    }

    #[test]
    fn single_finger_move_during_pinch_is_ignored() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(0.0, 0.0), p(100.0, 0.0)], 0);
        assert!(g.touch_move(&[p(0.0, 80.0)], 10).is_empty());
        assert_eq!(g.phase(), GesturePhase::Pinching);
    }

    #[test]
    fn end_emits_slide_end_and_resets() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(0.0, 0.0)], 0);
        g.touch_move(&[p(-40.0, 0.0)], 20);
        let events = g.handle(&TouchEvent::new(TouchPhase::Cancel, vec![], 30));
        assert!(matches!(
            events[..],
            [GestureEvent::SlideEnd { direction: SlideDirection::Left, dx, .. }] if dx == -40.0
        ));
        assert_eq!(g.phase(), GesturePhase::Idle);
        assert!(g.last_touches().is_empty());
        // A stray move after the reset does nothing.
        assert!(g.touch_move(&[p(0.0, 50.0)], 40).is_empty());
    }

    #[test]
    fn second_finger_ends_slide_and_starts_pinch() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(0.0, 0.0)], 0);
        g.touch_move(&[p(0.0, 40.0)], 20);
        let events = g.touch_start(&[p(0.0, 40.0), p(0.0, 140.0)], 30);
        assert!(matches!(events[0], GestureEvent::SlideEnd { .. }));
        assert!(matches!(events[1], GestureEvent::PinchBegin { distance, .. } if distance == 100.0));
        assert_eq!(g.phase(), GesturePhase::Pinching);
    }

    #[test]
    fn three_fingers_are_not_classified() {
        let mut g = GestureClassifier::default();
        let three = [p(0.0, 0.0), p(50.0, 0.0), p(100.0, 0.0)];
        assert!(g.touch_start(&three, 0).is_empty());
        assert!(g.touch_move(&three, 10).is_empty());
        assert!(g.touch_end().is_empty());
    }

    #[test]
    fn left_swipe_means_next() {
        let mut g = GestureClassifier::default();
        g.touch_start(&[p(300.0, 0.0)], 0);
        g.touch_move(&[p(200.0, 0.0)], 50);
        let end = g.touch_end();
        assert_eq!(NavigationIntent::from_gesture(&end[0]), Some(NavigationIntent::Next));

        g.touch_start(&[p(0.0, 0.0)], 100);
        g.touch_move(&[p(0.0, 100.0)], 150);
        let end = g.touch_end();
        assert_eq!(NavigationIntent::from_gesture(&end[0]), None);
    }
}
