use crate::agent::DqlAgent;
use crate::approach::Approach;
use crate::config::Config;
use crate::math;
use crate::simulation::Simulation;
use log::trace;

/// An action in the control policy's action space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalAction {
    /// Keep the current green phase running.
    Hold,
    /// Begin the change to the next phase.
    Advance,
    /// Reserved for jumping the rotation to the busiest approach.
    Rush,
}

impl SignalAction {
    /// The size of the action space.
    pub const COUNT: usize = 3;

    /// Maps an action index from the agent. Callers guarantee the index is
    /// below [COUNT](Self::COUNT).
    pub fn from_index(index: usize) -> SignalAction {
        match index {
            0 => SignalAction::Hold,
            1 => SignalAction::Advance,
            2 => SignalAction::Rush,
            _ => unreachable!("action index out of range"),
        }
    }

    /// The index fed back into the learning update.
    pub fn index(self) -> usize {
        match self {
            SignalAction::Hold => 0,
            SignalAction::Advance => 1,
            SignalAction::Rush => 2,
        }
    }

    /// Whether this action ends the current green phase.
    // TODO: give Rush a real jump to the busiest approach instead of
    // following the plain rotation.
    fn advances(self) -> bool {
        matches!(self, SignalAction::Advance | SignalAction::Rush)
    }
}

/// The stage of the active phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Green,
    Yellow,
    /// The all-red interval that lets the intersection empty before the
    /// next approach is served.
    Clearance,
}

/// The approach and stage currently being served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase {
    pub approach: Approach,
    pub stage: Stage,
}

/// How the controller decides to end green phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMode {
    /// The DQL agent chooses. The default.
    Agent,
    /// Queue pressure chooses: greens end once their approach drains, and
    /// clearance hands green to the most pressured approach. The agent
    /// rides along as an observer.
    QueuePriority,
}

/// What a controller update decided, which determines whether the agent
/// learns from the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The agent made a real choice to learn from.
    Chosen(SignalAction),
    /// A heuristic drove the phase; the agent observes with a fixed action.
    Observed,
    /// The phase advanced on fixed timing alone; nothing to learn.
    Fixed,
}

/// The signal phase state machine.
///
/// Serves one approach at a time, advancing through green, yellow and
/// clearance before handing over, which keeps at most one approach out of
/// red at any tick.
pub struct SignalController {
    /// The phase being served.
    phase: Phase,
    /// Ticks spent in the current stage.
    timer: u32,
    /// The green-ending strategy.
    mode: ControlMode,
}

impl SignalController {
    /// Creates a controller serving North first.
    pub fn new(mode: ControlMode) -> Self {
        Self {
            phase: Phase {
                approach: Approach::North,
                stage: Stage::Green,
            },
            timer: 0,
            mode,
        }
    }

    /// The phase currently being served.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The green-ending strategy in use.
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Returns the controller to its initial phase.
    pub fn reset(&mut self) {
        self.phase = Phase {
            approach: Approach::North,
            stage: Stage::Green,
        };
        self.timer = 0;
    }

    /// Advances the phase machine by one tick and reports whether the agent
    /// drove the outcome.
    pub fn update(&mut self, sim: &Simulation, agent: &mut DqlAgent, config: &Config) -> Decision {
        match self.phase.stage {
            Stage::Green => self.update_green(sim, agent, config),
            Stage::Yellow => {
                self.timer += 1;
                if self.timer > config.yellow_ticks {
                    self.enter(Stage::Clearance);
                }
                self.observer_decision()
            }
            Stage::Clearance => {
                self.timer += 1;
                if self.timer > config.clearance_ticks {
                    let next = match self.mode {
                        ControlMode::Agent => self.phase.approach.next(),
                        ControlMode::QueuePriority => busiest_approach(sim),
                    };
                    self.enter_green(next);
                }
                self.observer_decision()
            }
        }
    }

    /// One green tick. The minimum and maximum checks read the timer before
    /// it advances, so a green lasts at least `min_green_ticks + 1` ticks
    /// and is cut off once the pre-advance timer passes the maximum.
    fn update_green(&mut self, sim: &Simulation, agent: &mut DqlAgent, config: &Config) -> Decision {
        let can_end = self.timer > config.min_green_ticks;
        let must_end = self.timer > config.max_green_ticks;
        self.timer += 1;

        match self.mode {
            ControlMode::Agent => {
                if must_end {
                    self.enter(Stage::Yellow);
                    Decision::Fixed
                } else if can_end {
                    let action = SignalAction::from_index(agent.act(&sim.state_vector()));
                    if action.advances() {
                        self.enter(Stage::Yellow);
                    }
                    Decision::Chosen(action)
                } else {
                    Decision::Fixed
                }
            }
            ControlMode::QueuePriority => {
                let drained = sim.pressure(&[self.phase.approach]) == 0;
                if must_end || (can_end && drained) {
                    self.enter(Stage::Yellow);
                }
                Decision::Observed
            }
        }
    }

    /// In queue-priority mode the agent still sees every tick; in agent mode
    /// fixed stages carry no decision.
    fn observer_decision(&self) -> Decision {
        match self.mode {
            ControlMode::Agent => Decision::Fixed,
            ControlMode::QueuePriority => Decision::Observed,
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.phase.stage = stage;
        self.timer = 0;
    }

    fn enter_green(&mut self, approach: Approach) {
        trace!("green to {:?}", approach);
        self.phase = Phase {
            approach,
            stage: Stage::Green,
        };
        self.timer = 0;
    }

    /// Writes the phase onto the simulation's lights: the served approach
    /// shows its stage color and every other approach shows red.
    pub fn apply_lights(&self, sim: &mut Simulation) {
        for approach in Approach::ALL {
            sim.light_mut(approach).set_red();
        }
        match self.phase.stage {
            Stage::Green => sim.light_mut(self.phase.approach).set_green(),
            Stage::Yellow => sim.light_mut(self.phase.approach).set_yellow(),
            Stage::Clearance => {}
        }
    }
}

/// The approach with the highest pressure. Earlier approaches win ties, so
/// the pick follows the N, S, E, W priority order.
fn busiest_approach(sim: &Simulation) -> Approach {
    let pressures = Approach::ALL.map(|a| sim.pressure(&[a]) as f64);
    Approach::ALL[math::argmax(&pressures)]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::NetworkWeights;
    use crate::light::LightState;
    use crate::vehicle::TurnIntent;

    fn short_config() -> Config {
        Config {
            spawn_rate: 0.0,
            right_on_red: 0.0,
            min_green_ticks: 2,
            max_green_ticks: 6,
            yellow_ticks: 2,
            clearance_ticks: 1,
            ..Config::default()
        }
    }

    /// An agent whose Q-values are all zero, so greedy play always holds.
    fn holding_agent(config: &Config) -> DqlAgent {
        let mut agent = DqlAgent::new(4, SignalAction::COUNT, config, 1);
        let weights = NetworkWeights {
            w1: vec![vec![0.0; config.hidden_size]; 4],
            b1: vec![0.0; config.hidden_size],
            w2: vec![vec![0.0; SignalAction::COUNT]; config.hidden_size],
            b2: vec![0.0; SignalAction::COUNT],
        };
        agent
            .load(&serde_json::to_string(&weights).unwrap())
            .unwrap();
        agent.set_epsilon(0.0);
        agent
    }

    #[test]
    fn runs_a_full_cycle_with_forced_advances() {
        let config = short_config();
        let sim = Simulation::new(&config, 2);
        let mut agent = holding_agent(&config);
        let mut controller = SignalController::new(ControlMode::Agent);

        assert_eq!(controller.phase().approach, Approach::North);

        // A hold-only agent runs the green to its forced maximum.
        let mut green_ticks = 0;
        while controller.phase().stage == Stage::Green {
            controller.update(&sim, &mut agent, &config);
            green_ticks += 1;
            assert!(green_ticks < 100);
        }
        assert_eq!(green_ticks, config.max_green_ticks + 2);

        let mut yellow_ticks = 0;
        while controller.phase().stage == Stage::Yellow {
            controller.update(&sim, &mut agent, &config);
            yellow_ticks += 1;
        }
        assert_eq!(yellow_ticks, config.yellow_ticks + 1);

        let mut clearance_ticks = 0;
        while controller.phase().stage == Stage::Clearance {
            controller.update(&sim, &mut agent, &config);
            clearance_ticks += 1;
        }
        assert_eq!(clearance_ticks, config.clearance_ticks + 1);
        assert_eq!(controller.phase().approach, Approach::South);
        assert_eq!(controller.phase().stage, Stage::Green);
    }

    #[test]
    fn learning_is_gated_to_real_decisions() {
        let config = short_config();
        let sim = Simulation::new(&config, 3);
        let mut agent = holding_agent(&config);
        let mut controller = SignalController::new(ControlMode::Agent);

        let decisions: Vec<Decision> = (0..8)
            .map(|_| controller.update(&sim, &mut agent, &config))
            .collect();
        assert_eq!(controller.phase().stage, Stage::Yellow);
        assert!(decisions[..3].iter().all(|d| *d == Decision::Fixed));
        assert!(decisions[3..7]
            .iter()
            .all(|d| *d == Decision::Chosen(SignalAction::Hold)));
        assert_eq!(decisions[7], Decision::Fixed);
    }

    #[test]
    fn queue_priority_serves_the_busiest_approach() {
        let config = short_config();
        let mut sim = Simulation::new(&config, 4);
        for _ in 0..3 {
            sim.add_vehicle(Approach::East, TurnIntent::Straight);
        }
        let mut agent = holding_agent(&config);
        let mut controller = SignalController::new(ControlMode::QueuePriority);

        for _ in 0..200 {
            controller.update(&sim, &mut agent, &config);
            let phase = controller.phase();
            if phase.approach == Approach::East && phase.stage == Stage::Green {
                return;
            }
        }
        panic!("East was never served");
    }

    #[test]
    fn queue_priority_reports_observed_every_tick() {
        let config = short_config();
        let sim = Simulation::new(&config, 5);
        let mut agent = holding_agent(&config);
        let mut controller = SignalController::new(ControlMode::QueuePriority);

        for _ in 0..10 {
            let decision = controller.update(&sim, &mut agent, &config);
            assert_eq!(decision, Decision::Observed);
        }
    }

    #[test]
    fn apply_lights_matches_the_phase() {
        let config = short_config();
        let mut sim = Simulation::new(&config, 6);
        let mut controller = SignalController::new(ControlMode::Agent);

        controller.apply_lights(&mut sim);
        assert_eq!(sim.light(Approach::North).state(), LightState::Green);
        for approach in [Approach::South, Approach::East, Approach::West] {
            assert_eq!(sim.light(approach).state(), LightState::Red);
        }

        controller.phase.stage = Stage::Clearance;
        controller.apply_lights(&mut sim);
        assert!(Approach::ALL
            .iter()
            .all(|&a| sim.light(a).state() == LightState::Red));
    }
}
