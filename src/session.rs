use crate::agent::DqlAgent;
use crate::approach::Approach;
use crate::config::Config;
use crate::controller::{Decision, SignalAction, SignalController};
use crate::error::Error;
use crate::simulation::Simulation;
use log::{debug, info};

/// Cumulative statistics for the episode in progress.
#[derive(Clone, Copy, Debug, Default)]
struct RunningStats {
    reward: f64,
    waiting: u64,
    throughput: usize,
}

/// A closed episode's summary statistics.
#[derive(Clone, Copy, Debug)]
pub struct EpisodeSummary {
    /// The 1-based episode number.
    pub episode: u32,
    /// Mean waiting vehicles per tick.
    pub avg_wait: f64,
    /// Total shaped reward over the episode.
    pub total_reward: f64,
    /// Vehicles that crossed and left the world.
    pub throughput: usize,
    /// The exploration rate when the episode closed.
    pub epsilon: f64,
}

/// One self-contained simulation-and-learning run.
///
/// Owns the simulation, the phase controller, the agent and the episode
/// bookkeeping. A single [tick](Self::tick) runs the full control, physics
/// and learning sequence.
pub struct SimulationSession {
    config: Config,
    sim: Simulation,
    controller: SignalController,
    agent: DqlAgent,
    /// The 1-based episode counter.
    episode: u32,
    /// Ticks elapsed in the current episode.
    episode_ticks: u32,
    /// Statistics for the episode in progress.
    stats: RunningStats,
    /// Summaries of every closed episode.
    history: Vec<EpisodeSummary>,
}

impl SimulationSession {
    /// Creates a session. The seed fixes every stochastic draw in the run,
    /// so two sessions built from equal configs and seeds evolve
    /// identically.
    pub fn new(config: Config, seed: u64) -> Self {
        let sim = Simulation::new(&config, seed);
        let agent = DqlAgent::new(
            Simulation::STATE_LEN,
            SignalAction::COUNT,
            &config,
            seed.wrapping_add(1),
        );
        let controller = SignalController::new(config.mode);
        let mut session = Self {
            config,
            sim,
            controller,
            agent,
            episode: 1,
            episode_ticks: 0,
            stats: RunningStats::default(),
            history: Vec::new(),
        };
        session.controller.apply_lights(&mut session.sim);
        session
    }

    /// Runs one full tick: phase decision, light application, physics,
    /// reward, learning and episode bookkeeping, in that order.
    pub fn tick(&mut self) {
        let state = self.sim.state_vector();
        let decision = self.controller.update(&self.sim, &mut self.agent, &self.config);
        self.controller.apply_lights(&mut self.sim);
        self.sim.step();

        let next_state = self.sim.state_vector();
        let reward = self.reward();
        self.episode_ticks += 1;
        let done = self.episode_ticks >= self.config.episode_ticks;

        match decision {
            Decision::Chosen(action) => {
                self.agent
                    .learn(&state, action.index(), reward, &next_state, done)
            }
            Decision::Observed => {
                self.agent
                    .learn(&state, SignalAction::Hold.index(), reward, &next_state, done)
            }
            Decision::Fixed => {}
        }

        self.stats.reward += reward;
        self.stats.waiting += self.sim.total_waiting() as u64;
        self.stats.throughput += self.sim.throughput();

        if done {
            self.finish_episode();
        }
    }

    /// Runs `ticks` sequential ticks. Purely a batching convenience; the
    /// outcome is identical to calling [tick](Self::tick) in a loop.
    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// The shaped reward for the tick just simulated. Throughput pays,
    /// waiting vehicles and squared queue lengths cost, scaled to roughly
    /// `[-1, 1]`.
    fn reward(&self) -> f64 {
        let throughput = self.sim.throughput() as f64;
        let waiting = self.sim.total_waiting() as f64;
        let pressure: f64 = Approach::ALL
            .iter()
            .map(|&a| (self.sim.queue(a) as f64).powi(2))
            .sum();
        (throughput * self.config.throughput_weight
            - waiting * self.config.waiting_weight
            - pressure * self.config.pressure_weight)
            / self.config.reward_scale
    }

    /// Closes the episode: records its summary, clears the world and the
    /// phase, and keeps the learned weights.
    fn finish_episode(&mut self) {
        let ticks = self.episode_ticks.max(1) as f64;
        let summary = EpisodeSummary {
            episode: self.episode,
            avg_wait: self.stats.waiting as f64 / ticks,
            total_reward: self.stats.reward,
            throughput: self.stats.throughput,
            epsilon: self.agent.epsilon(),
        };
        info!(
            "episode {}: avg wait {:.2}, reward {:.2}, throughput {}, epsilon {:.3}",
            summary.episode,
            summary.avg_wait,
            summary.total_reward,
            summary.throughput,
            summary.epsilon
        );
        self.history.push(summary);
        self.episode += 1;
        self.episode_ticks = 0;
        self.stats = RunningStats::default();
        self.sim.reset();
        self.controller.reset();
        self.controller.apply_lights(&mut self.sim);
    }

    /// Clears the world, the phase and all episode bookkeeping. Learned
    /// weights survive; build a new session for a fresh network.
    pub fn reset(&mut self) {
        debug!("session reset");
        self.episode = 1;
        self.episode_ticks = 0;
        self.stats = RunningStats::default();
        self.history.clear();
        self.sim.reset();
        self.controller.reset();
        self.controller.apply_lights(&mut self.sim);
    }

    /// Serializes the agent's network weights.
    pub fn save(&self) -> Result<String, Error> {
        self.agent.save()
    }

    /// Restores the agent's network weights. Safe at any tick boundary.
    pub fn load(&mut self, data: &str) -> Result<(), Error> {
        self.agent.load(data)
    }

    /// The simulated world.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Mutable access to the world, for callers that inject vehicles or
    /// adjust the spawn rate mid-run.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// The phase controller.
    pub fn controller(&self) -> &SignalController {
        &self.controller
    }

    /// The learning agent.
    pub fn agent(&self) -> &DqlAgent {
        &self.agent
    }

    /// Mutable access to the agent, for epsilon overrides.
    pub fn agent_mut(&mut self) -> &mut DqlAgent {
        &mut self.agent
    }

    /// The session's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The 1-based episode counter.
    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Ticks elapsed in the current episode.
    pub fn episode_ticks(&self) -> u32 {
        self.episode_ticks
    }

    /// Summaries of every closed episode, oldest first.
    pub fn history(&self) -> &[EpisodeSummary] {
        &self.history
    }
}
