pub use agent::{DqlAgent, NetworkWeights, NeuralNetwork, ReplayBuffer, Transition};
pub use approach::{Approach, ApproachMap, Lane};
pub use cgmath;
pub use config::Config;
pub use controller::{ControlMode, Decision, Phase, SignalAction, SignalController, Stage};
pub use error::Error;
pub use light::{LightState, TrafficLight};
pub use session::{EpisodeSummary, SimulationSession};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{TurnIntent, Vehicle};

mod agent;
mod approach;
mod config;
mod controller;
mod error;
mod light;
pub mod math;
mod session;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
