// src/persistence.rs
//
// Temporal confirmation over a sliding window of per-frame candidate sets.
// A candidate is emitted only after its center recurs in enough of the
// recent frames, which suppresses single-frame false positives (brake
// lights, red clothing, reflections).

use crate::detection::{ConfirmedSign, RingCandidate, SIGN_LABEL};
use std::collections::VecDeque;

pub struct PersistenceFilter {
    history: VecDeque<Vec<RingCandidate>>,
    window: usize,
    confirm_hits: usize,
    match_radius: f32,
}

impl PersistenceFilter {
    pub fn new(window: usize, confirm_hits: usize, match_radius: f32) -> Self {
        Self {
            history: VecDeque::with_capacity(window),
            window,
            confirm_hits,
            match_radius,
        }
    }

    /// Push this frame's candidates and return the ones confirmed by the
    /// window. Pure re-evaluation each frame: there is no identity tracking,
    /// candidates re-link across frames solely by center distance.
    ///
    /// The occurrence test is an existence check per buffered frame — a
    /// frame counts once if it contains any candidate within the tolerance,
    /// with no 1:1 assignment between candidates.
    pub fn observe(&mut self, candidates: Vec<RingCandidate>) -> Vec<ConfirmedSign> {
        self.history.push_back(candidates);
        if self.history.len() > self.window {
            self.history.pop_front();
        }

        let Some(current) = self.history.back() else {
            return Vec::new();
        };

        let mut confirmed = Vec::new();
        for candidate in current {
            let hits = self
                .history
                .iter()
                .filter(|frame| frame.iter().any(|c| self.near(c, candidate)))
                .count();
            if hits >= self.confirm_hits {
                confirmed.push(ConfirmedSign {
                    rect: candidate.rect,
                    label: SIGN_LABEL,
                });
            }
        }
        confirmed
    }

    fn near(&self, a: &RingCandidate, b: &RingCandidate) -> bool {
        let dx = a.center_x - b.center_x;
        let dy = a.center_y - b.center_y;
        (dx * dx + dy * dy).sqrt() <= self.match_radius
    }

    /// Drop all buffered frames (detector restart or camera switch).
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn frame_count(&self) -> usize {
        self.history.len()
    }
}
