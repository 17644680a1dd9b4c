//! Selection capture
//!
//! Watches pointer, touch and keyboard gestures on a container and reports
//! the selection the user settled on. Gestures arrive in bursts, so
//! processing is debounced: every qualifying event pushes a deadline out and
//! the selection is read once, when the deadline passes.
//!
//! The capture itself is a plain state machine driven with explicit
//! timestamps. [`driver::run`] feeds it from a tokio channel.

pub mod driver;
mod validate;

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::tree::{LiveRange, SelectionSource};

pub use validate::{normalize_selected_text, validate_text_selection, SelectionRejection};

/// Tuning for a [`SelectionCapture`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub debounce: Duration,
    pub min_selection_length: usize,
    pub max_selection_length: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            min_selection_length: 1,
            max_selection_length: 5000,
        }
    }
}

/// A gesture observed on the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    PointerUp,
    TouchEnd,
    KeyUp {
        key: String,
        shift: bool,
        ctrl_or_meta: bool,
    },
}

impl CaptureEvent {
    /// Whether the gesture can have changed the selection
    pub fn qualifies(&self) -> bool {
        match self {
            CaptureEvent::PointerUp | CaptureEvent::TouchEnd => true,
            CaptureEvent::KeyUp {
                key,
                shift,
                ctrl_or_meta,
            } => *shift || (*ctrl_or_meta && key.eq_ignore_ascii_case("a")),
        }
    }
}

/// A validated selection, ready to be anchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection<N> {
    pub text: String,
    pub range: LiveRange<N>,
    pub start_node: N,
    pub start_offset: usize,
    pub end_node: N,
    pub end_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Active,
    Disabled,
    Destroyed,
}

/// Debounced selection observer for one container
pub struct SelectionCapture<N, F> {
    container: N,
    callback: F,
    options: CaptureOptions,
    deadline: Option<Instant>,
    state: CaptureState,
}

impl<N, F> SelectionCapture<N, F>
where
    N: Copy + Eq + std::fmt::Debug,
    F: FnMut(TextSelection<N>),
{
    pub fn start(container: N, callback: F, options: CaptureOptions) -> Self {
        debug!(?container, ?options, "Selection capture started");
        Self {
            container,
            callback,
            options,
            deadline: None,
            state: CaptureState::Active,
        }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Records a gesture. Qualifying gestures restart the debounce window.
    pub fn handle_event(&mut self, event: CaptureEvent, now: Instant) {
        if self.state != CaptureState::Active || !event.qualifies() {
            return;
        }
        self.deadline = Some(now + self.options.debounce);
    }

    /// When the pending selection read is due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reads and reports the selection once the debounce window has passed.
    ///
    /// Returns whether the callback ran.
    pub fn poll<T>(&mut self, tree: &T, now: Instant) -> bool
    where
        T: SelectionSource<Node = N> + ?Sized,
    {
        match self.deadline {
            Some(deadline) if deadline <= now => self.deadline = None,
            _ => return false,
        }
        if self.state != CaptureState::Active {
            return false;
        }

        let Some(range) = tree.current_selection() else {
            return false;
        };
        match validate_text_selection(tree, self.container, range, &self.options) {
            Ok(selection) => {
                debug!(
                    start_offset = selection.start_offset,
                    end_offset = selection.end_offset,
                    len = selection.text.chars().count(),
                    "Selection captured"
                );
                (self.callback)(selection);
                true
            }
            Err(rejection) => {
                debug!(%rejection, "Selection ignored");
                false
            }
        }
    }

    /// Suspends processing. A read that falls due while disabled is dropped.
    pub fn disable(&mut self) {
        if self.state == CaptureState::Active {
            self.state = CaptureState::Disabled;
        }
    }

    pub fn enable(&mut self) {
        if self.state == CaptureState::Disabled {
            self.state = CaptureState::Active;
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == CaptureState::Active
    }

    /// Cancels any pending read and ignores everything afterwards
    pub fn destroy(&mut self) {
        if self.state != CaptureState::Destroyed {
            debug!(container = ?self.container, "Selection capture destroyed");
        }
        self.state = CaptureState::Destroyed;
        self.deadline = None;
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == CaptureState::Destroyed
    }

    pub fn clear_selection<T>(&self, tree: &mut T)
    where
        T: SelectionSource<Node = N> + ?Sized,
    {
        tree.clear_selection();
    }
}
