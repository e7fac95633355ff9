/// The state of one approach's signal head.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

/// A single approach's traffic light.
///
/// Holds state only. All timing and sequencing lives in the
/// [SignalController](crate::SignalController), which is also what keeps
/// two approaches from ever showing green at once.
#[derive(Clone, Copy, Debug)]
pub struct TrafficLight {
    /// The current state of the light.
    state: LightState,
}

impl TrafficLight {
    /// Creates a new light showing red.
    pub fn new() -> Self {
        TrafficLight {
            state: LightState::Red,
        }
    }

    /// The current state of the light.
    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn set_green(&mut self) {
        self.state = LightState::Green;
    }

    pub fn set_yellow(&mut self) {
        self.state = LightState::Yellow;
    }

    pub fn set_red(&mut self) {
        self.state = LightState::Red;
    }
}

impl Default for TrafficLight {
    fn default() -> Self {
        Self::new()
    }
}
