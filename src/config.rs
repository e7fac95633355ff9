//! Simulation and learning configuration.

use crate::controller::ControlMode;

/// Tunable parameters for a [SimulationSession](crate::SimulationSession).
///
/// All durations and rates are per tick; there is no wall-clock anywhere in
/// the model.
#[derive(Clone, Debug)]
pub struct Config {
    // --- Traffic ---
    /// Probability of spawning one vehicle per tick.
    pub spawn_rate: f64,
    /// Relative weights for left, straight and right turn intents.
    pub turn_weights: [f64; 3],
    /// Per-tick probability that a slow right turner proceeds on red.
    /// Zero disables right turns on red entirely.
    pub right_on_red: f64,

    // --- Signal timing ---
    /// Shortest green the controller will serve.
    pub min_green_ticks: u32,
    /// Longest green before a forced advance.
    pub max_green_ticks: u32,
    /// Fixed yellow duration.
    pub yellow_ticks: u32,
    /// All-red clearance between phases.
    pub clearance_ticks: u32,
    /// How the controller decides to end green phases.
    pub mode: ControlMode,

    // --- Learning ---
    /// Replay memory capacity.
    pub replay_capacity: usize,
    /// Transitions sampled per replay pass.
    pub batch_size: usize,
    /// Discount factor for bootstrapped targets.
    pub gamma: f64,
    /// Initial exploration rate.
    pub epsilon_start: f64,
    /// Exploration rate floor.
    pub epsilon_min: f64,
    /// Multiplicative exploration decay per training replay.
    pub epsilon_decay: f64,
    /// Gradient step size.
    pub learning_rate: f64,
    /// Hidden layer width of the Q-network.
    pub hidden_size: usize,

    // --- Episodes and reward ---
    /// Ticks per episode before the world resets.
    pub episode_ticks: u32,
    /// Reward paid per vehicle that exits the world.
    pub throughput_weight: f64,
    /// Penalty per waiting vehicle per tick.
    pub waiting_weight: f64,
    /// Penalty weight on the sum of squared queue lengths.
    pub pressure_weight: f64,
    /// Divisor scaling the shaped reward to roughly `[-1, 1]`.
    pub reward_scale: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spawn_rate: 0.02,
            turn_weights: [0.15, 0.70, 0.15],
            right_on_red: 0.05,
            min_green_ticks: 180,
            max_green_ticks: 600,
            yellow_ticks: 120,
            clearance_ticks: 30,
            mode: ControlMode::Agent,
            replay_capacity: 2000,
            batch_size: 32,
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_min: 0.05,
            epsilon_decay: 0.995,
            learning_rate: 0.01,
            hidden_size: 14,
            episode_ticks: 2000,
            throughput_weight: 20.0,
            waiting_weight: 0.5,
            pressure_weight: 0.1,
            reward_scale: 100.0,
        }
    }
}
