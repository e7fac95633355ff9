pub use self::net::{NetworkWeights, NeuralNetwork};
pub use self::replay::{ReplayBuffer, Transition};

use crate::config::Config;
use crate::error::Error;
use crate::math;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod net;
mod replay;

/// A deep Q-learning agent: an epsilon-greedy policy over a small Q-network,
/// trained online from uniformly sampled replay batches.
pub struct DqlAgent {
    /// The Q-value approximator.
    network: NeuralNetwork,
    /// The experience store.
    memory: ReplayBuffer,
    /// Transitions sampled per replay pass.
    batch_size: usize,
    /// Discount factor for bootstrapped targets.
    gamma: f64,
    /// The exploration rate.
    epsilon: f64,
    /// The exploration rate floor.
    epsilon_min: f64,
    /// Multiplicative exploration decay per training replay.
    epsilon_decay: f64,
    /// Source of exploration and sampling draws.
    rng: StdRng,
}

impl DqlAgent {
    /// Creates an agent for the given observation and action sizes.
    pub fn new(input_size: usize, output_size: usize, config: &Config, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let network = NeuralNetwork::new(
            input_size,
            config.hidden_size,
            output_size,
            config.learning_rate,
            &mut rng,
        );
        Self {
            network,
            memory: ReplayBuffer::new(config.replay_capacity),
            batch_size: config.batch_size,
            gamma: config.gamma,
            epsilon: config.epsilon_start,
            epsilon_min: config.epsilon_min,
            epsilon_decay: config.epsilon_decay,
            rng,
        }
    }

    /// The current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Overrides the exploration rate. Zero makes [act](Self::act) fully
    /// greedy, which evaluation runs rely on.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Read access to the Q-network.
    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    /// The number of transitions held in replay memory.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Picks an action for an observation: a uniformly random one with
    /// probability epsilon, otherwise the argmax of the predicted Q-values
    /// with ties going to the earliest action.
    pub fn act(&mut self, state: &[f64]) -> usize {
        if self.rng.gen::<f64>() < self.epsilon {
            self.rng.gen_range(0..self.network.output_size())
        } else {
            math::argmax(&self.network.predict(state))
        }
    }

    /// Stores a transition without training.
    pub fn remember(
        &mut self,
        state: &[f64],
        action: usize,
        reward: f64,
        next_state: &[f64],
        done: bool,
    ) {
        self.memory.add(Transition {
            state: state.to_vec(),
            action,
            reward,
            next_state: next_state.to_vec(),
            done,
        });
    }

    /// Runs one replay training pass. A no-op until the memory holds a full
    /// batch; otherwise `batch_size` independent one-step TD updates followed
    /// by a single epsilon decay.
    pub fn replay(&mut self) {
        if self.memory.len() < self.batch_size {
            return;
        }
        let batch = match self.memory.sample(self.batch_size, &mut self.rng) {
            Ok(batch) => batch,
            Err(_) => return,
        };
        for transition in batch {
            let mut target = transition.reward;
            if !transition.done {
                let next_q = self.network.predict(&transition.next_state);
                let best = next_q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                target += self.gamma * best;
            }
            let mut q_values = self.network.predict(&transition.state);
            q_values[transition.action] = target;
            self.network.train(&transition.state, &q_values);
        }
        self.epsilon = (self.epsilon * self.epsilon_decay).max(self.epsilon_min);
    }

    /// Stores a transition and immediately runs one replay pass.
    pub fn learn(
        &mut self,
        state: &[f64],
        action: usize,
        reward: f64,
        next_state: &[f64],
        done: bool,
    ) {
        self.remember(state, action, reward, next_state, done);
        self.replay();
    }

    /// Serializes the network weights to a JSON string.
    pub fn save(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.network.weights())?)
    }

    /// Restores network weights from a serialized string. Malformed data and
    /// mismatched dimensions are rejected without touching the live weights.
    pub fn load(&mut self, data: &str) -> Result<(), Error> {
        let weights: NetworkWeights = serde_json::from_str(data)?;
        self.network.restore(weights)?;
        debug!("restored network weights");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn zero_weights(input: usize, hidden: usize, output: usize) -> NetworkWeights {
        NetworkWeights {
            w1: vec![vec![0.0; hidden]; input],
            b1: vec![0.0; hidden],
            w2: vec![vec![0.0; output]; hidden],
            b2: vec![0.0; output],
        }
    }

    #[test]
    fn greedy_act_is_deterministic() {
        let mut agent = DqlAgent::new(4, 3, &Config::default(), 8);
        agent.set_epsilon(0.0);
        let state = [2.0, 0.0, 1.0, 5.0];
        let first = agent.act(&state);
        for _ in 0..10_000 {
            assert_eq!(agent.act(&state), first);
        }
    }

    #[test]
    fn greedy_tie_takes_the_first_action() {
        let config = Config::default();
        let mut agent = DqlAgent::new(4, 3, &config, 9);
        agent.set_epsilon(0.0);
        // Zero weights make every Q-value exactly zero.
        agent
            .network
            .restore(zero_weights(4, config.hidden_size, 3))
            .unwrap();
        assert_eq!(agent.act(&[1.0, 2.0, 3.0, 4.0]), 0);
    }

    #[test]
    fn replay_below_batch_size_is_a_silent_noop() {
        let config = Config::default();
        let mut agent = DqlAgent::new(4, 3, &config, 10);
        for i in 0..config.batch_size - 1 {
            agent.remember(&[i as f64; 4], 0, 0.0, &[0.0; 4], false);
        }
        agent.replay();
        assert_eq!(agent.epsilon(), config.epsilon_start);
        assert_eq!(agent.memory_len(), config.batch_size - 1);
    }

    #[test]
    fn full_batch_replay_decays_epsilon_once() {
        let config = Config::default();
        let mut agent = DqlAgent::new(4, 3, &config, 11);
        for i in 0..config.batch_size {
            agent.remember(&[i as f64; 4], 1, 0.5, &[0.0; 4], i % 7 == 0);
        }
        agent.replay();
        assert_eq!(agent.epsilon(), config.epsilon_start * config.epsilon_decay);

        agent.set_epsilon(config.epsilon_min);
        agent.replay();
        assert_eq!(agent.epsilon(), config.epsilon_min);
    }

    #[test]
    fn save_load_round_trip_preserves_predictions() {
        let config = Config::default();
        let mut trained = DqlAgent::new(4, 3, &config, 12);
        for i in 0..64 {
            trained.remember(&[i as f64, 1.0, 0.0, 2.0], i % 3, -0.25, &[0.0; 4], false);
        }
        trained.replay();

        let mut fresh = DqlAgent::new(4, 3, &config, 99);
        fresh.load(&trained.save().unwrap()).unwrap();

        let state = [3.0, 0.0, 2.0, 7.0];
        assert_eq!(
            trained.network().predict(&state),
            fresh.network().predict(&state)
        );
    }

    #[test]
    fn load_rejects_malformed_and_mismatched_data() {
        let config = Config::default();
        let mut agent = DqlAgent::new(4, 3, &config, 13);
        let before = agent.network().predict(&[1.0; 4]);

        assert!(matches!(
            agent.load("not even json"),
            Err(Error::Malformed(_))
        ));

        let wrong = serde_json::to_string(&zero_weights(4, config.hidden_size + 1, 3)).unwrap();
        assert!(matches!(agent.load(&wrong), Err(Error::WeightShape { .. })));

        assert_eq!(agent.network().predict(&[1.0; 4]), before);
    }
}
