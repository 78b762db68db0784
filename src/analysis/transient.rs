// TransientStateMachine - crossing events to bounded transient windows
//
// A Rise opens a transient, a Fall closes it. Transients shorter than
// `min_length` are held open until either a late Fall closes them at the
// minimum length or a Rise past the minimum restarts detection. Transients
// are never reported longer than `max_length`.

use serde::{Deserialize, Serialize};

use super::stages::{FALL_MARK, RISE_MARK};
use crate::clips::Clip;

/// Direction of a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossingKind {
    /// Power ratio rose above the threshold
    Rise,
    /// Power ratio fell below the inverse threshold
    Fall,
}

impl CrossingKind {
    /// Interpret a threshold-marker output value
    ///
    /// # Returns
    /// `None` for every value other than the rise and fall marks.
    pub fn from_mark(mark: f64) -> Option<Self> {
        if mark == RISE_MARK {
            Some(CrossingKind::Rise)
        } else if mark == FALL_MARK {
            Some(CrossingKind::Fall)
        } else {
            None
        }
    }
}

/// Crossing at an absolute input sample index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub index: u64,
    pub kind: CrossingKind,
}

impl CrossingEvent {
    pub fn rise(index: u64) -> Self {
        Self {
            index,
            kind: CrossingKind::Rise,
        }
    }

    pub fn fall(index: u64) -> Self {
        Self {
            index,
            kind: CrossingKind::Fall,
        }
    }
}

/// State of the transient detector between events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    /// Transient open since the given index
    Active(u64),
    /// Transient closed early; waiting to see whether it restarts
    Holding(u64),
}

/// Unpadded transient emitted by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transient {
    pub start: u64,
    pub length: u64,
}

impl Transient {
    /// Clip covering the transient plus padding on either side
    ///
    /// The start may become negative.
    pub fn padded(&self, initial_padding: usize, final_padding: usize) -> Clip {
        Clip::new(
            self.start as i64 - initial_padding as i64,
            self.length + initial_padding as u64 + final_padding as u64,
        )
    }
}

#[derive(Debug, Clone)]
pub struct TransientStateMachine {
    min_length: u64,
    max_length: u64,
    state: DetectorState,
}

impl TransientStateMachine {
    /// Create an idle state machine
    ///
    /// # Arguments
    /// * `min_length` - Minimum transient length in samples (at least 1)
    /// * `max_length` - Maximum transient length in samples (at least `min_length`)
    pub fn new(min_length: u64, max_length: u64) -> Self {
        debug_assert!(1 <= min_length && min_length <= max_length);
        Self {
            min_length,
            max_length,
            state: DetectorState::Idle,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Return to Idle, dropping any open transient
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
    }

    /// Apply one crossing event
    ///
    /// # Returns
    /// The transient completed by this event, if any.
    pub fn process(&mut self, event: CrossingEvent) -> Option<Transient> {
        let i = event.index;
        let (next, emitted) = match (self.state, event.kind) {
            (DetectorState::Idle, CrossingKind::Rise) => (DetectorState::Active(i), None),
            (DetectorState::Idle, CrossingKind::Fall) => (DetectorState::Idle, None),

            (DetectorState::Active(s), CrossingKind::Rise) => {
                let limit = s.saturating_add(self.max_length);
                if i == limit {
                    (DetectorState::Idle, Some(self.transient(s, self.max_length)))
                } else if i > limit {
                    (DetectorState::Active(i), Some(self.transient(s, self.max_length)))
                } else {
                    (DetectorState::Active(s), None)
                }
            }
            (DetectorState::Active(s), CrossingKind::Fall) => {
                if i < s.saturating_add(self.min_length) {
                    (DetectorState::Holding(s), None)
                } else {
                    let length = (i - s).min(self.max_length);
                    (DetectorState::Idle, Some(self.transient(s, length)))
                }
            }

            (DetectorState::Holding(s), CrossingKind::Rise) => {
                if i > s.saturating_add(self.min_length) {
                    (DetectorState::Active(i), Some(self.transient(s, self.min_length)))
                } else {
                    (DetectorState::Active(s), None)
                }
            }
            (DetectorState::Holding(s), CrossingKind::Fall) => {
                if i >= s.saturating_add(self.min_length) {
                    (DetectorState::Idle, Some(self.transient(s, self.min_length)))
                } else {
                    (DetectorState::Holding(s), None)
                }
            }
        };

        if next != self.state {
            log::trace!(
                "[TransientStateMachine] {:?} at {}: {:?} -> {:?}",
                event.kind,
                i,
                self.state,
                next
            );
        }
        self.state = next;
        emitted
    }

    /// Apply a batch of events in order
    pub fn process_all<I>(&mut self, events: I) -> Vec<Transient>
    where
        I: IntoIterator<Item = CrossingEvent>,
    {
        events
            .into_iter()
            .filter_map(|event| self.process(event))
            .collect()
    }

    fn transient(&self, start: u64, length: u64) -> Transient {
        Transient { start, length }
    }
}
