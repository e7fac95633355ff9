use crate::error::Error;
use rand::Rng;
use std::collections::VecDeque;

/// One stored experience step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}

/// A fixed-capacity experience store with first-in-first-out eviction.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    /// The maximum number of stored transitions.
    capacity: usize,
    /// The stored transitions, oldest first.
    entries: VecDeque<Transition>,
}

impl ReplayBuffer {
    /// Creates an empty buffer that holds at most `capacity` transitions.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be nonzero");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// The number of stored transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a transition, evicting the oldest if the buffer is full.
    pub fn add(&mut self, transition: Transition) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    /// Draws `count` transitions uniformly at random, with replacement.
    pub fn sample(&self, count: usize, rng: &mut impl Rng) -> Result<Vec<&Transition>, Error> {
        if self.entries.is_empty() {
            return Err(Error::EmptyReplayBuffer);
        }
        Ok((0..count)
            .map(|_| &self.entries[rng.gen_range(0..self.entries.len())])
            .collect())
    }
}
