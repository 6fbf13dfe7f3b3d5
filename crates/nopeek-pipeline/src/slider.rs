// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slide transition controller.
//
// Owns an ordered, fixed-length list of slides and the index of the live one.
// A transition pre-renders the target slide, waits a short delay, animates,
// commits the new index, and finally clears the pre-render flag once the new
// slide is fully visible. State is published on a watch channel so views (and
// the progress indicator) can follow along.

use nopeek_core::config::SlideTimings;
use nopeek_core::error::{NoPeekError, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

/// A slide that can be laid out ahead of time without side effects.
pub trait Slide {
    /// Called while the slide is mounted off-screen as the transition target.
    fn pre_render(&mut self);
}

/// Observable transition state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlideState {
    pub current_index: usize,
    pub pending_index: usize,
    pub is_animating: bool,
    pub should_pre_render_next: bool,
}

/// Outcome of a `slide_by` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideTransition {
    pub from: usize,
    pub to: usize,
}

impl SlideTransition {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

pub struct SlideController<T> {
    items: Vec<T>,
    state: watch::Sender<SlideState>,
    timings: SlideTimings,
    in_flight: bool,
}

impl<T: Slide> SlideController<T> {
    pub fn new(items: Vec<T>, timings: SlideTimings) -> Self {
        let (state, _) = watch::channel(SlideState::default());
        Self {
            items,
            state,
            timings,
            in_flight: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn state(&self) -> SlideState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SlideState> {
        self.state.subscribe()
    }

    pub fn current_index(&self) -> usize {
        self.state.borrow().current_index
    }

    pub fn current(&self) -> Option<&T> {
        self.items.get(self.current_index())
    }

    pub fn current_mut(&mut self) -> Option<&mut T> {
        let index = self.current_index();
        self.items.get_mut(index)
    }

    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Whether a transition has started and not yet settled.
    pub fn is_transitioning(&self) -> bool {
        self.in_flight
    }

    /// Move `offset` slides forward (or back, when negative), clamped to the
    /// ends of the list.
    ///
    /// Rejects the call with `TransitionInProgress` while an earlier
    /// transition is still in flight, including one whose future was dropped
    /// before it finished; call [`settle`](Self::settle) to recover.
    pub async fn slide_by(&mut self, offset: isize) -> Result<SlideTransition> {
        if self.in_flight {
            warn!(offset, "slide requested while a transition is in flight");
            return Err(NoPeekError::TransitionInProgress);
        }

        let from = self.current_index();
        let last = self.items.len().saturating_sub(1) as isize;
        let to = (from as isize).saturating_add(offset).clamp(0, last) as usize;
        if to == from {
            debug!(from, offset, "slide clamped to current index");
            return Ok(SlideTransition { from, to });
        }

        self.in_flight = true;
        self.state.send_modify(|s| {
            s.pending_index = to;
            s.should_pre_render_next = true;
        });
        self.items[to].pre_render();
        debug!(from, to, "pre-rendering next slide");

        tokio::time::sleep(self.timings.pre_render_delay()).await;
        self.state.send_modify(|s| s.is_animating = true);

        tokio::time::sleep(self.timings.transition()).await;
        self.state.send_modify(|s| {
            s.current_index = to;
            s.is_animating = false;
        });
        debug!(from, to, "slide committed");

        tokio::time::sleep(self.timings.settle()).await;
        self.state.send_modify(|s| s.should_pre_render_next = false);
        self.in_flight = false;

        Ok(SlideTransition { from, to })
    }

    /// Complete an abandoned transition immediately.
    ///
    /// Returns the transition that was finished, if any.
    pub fn settle(&mut self) -> Option<SlideTransition> {
        if !self.in_flight {
            return None;
        }
        let from = self.current_index();
        let mut to = from;
        self.state.send_modify(|s| {
            to = s.pending_index;
            s.current_index = s.pending_index;
            s.is_animating = false;
            s.should_pre_render_next = false;
        });
        self.in_flight = false;
        debug!(from, to, "abandoned slide settled");
        Some(SlideTransition { from, to })
    }
}

/// One glyph per slide: filled up to and including the target index.
pub fn progress_row(state: &SlideState, total: usize) -> String {
    (0..total)
        .map(|i| if i <= state.pending_index { "■" } else { "□" })
        .collect::<Vec<_>>()
        .join(" ")
}
