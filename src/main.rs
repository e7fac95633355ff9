use itertools::Itertools;
use signal_sim::{Config, ControlMode, SimulationSession};

/// Headless training driver. Usage: signal-sim [episodes] [seed] [mode],
/// where mode is "agent" or "pressure".
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let episodes: u32 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(10);
    let seed: u64 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(17);
    let mode = match args.next().as_deref() {
        Some("pressure") => ControlMode::QueuePriority,
        _ => ControlMode::Agent,
    };

    let config = Config {
        mode,
        ..Config::default()
    };
    let ticks = config.episode_ticks;
    let mut session = SimulationSession::new(config, seed);

    println!("episode  avg-wait    reward  throughput  epsilon");
    for _ in 0..episodes {
        session.run(ticks);
        if let Some(summary) = session.history().last() {
            println!(
                "{:>7}  {:>8.2}  {:>8.2}  {:>10}  {:>7.3}",
                summary.episode,
                summary.avg_wait,
                summary.total_reward,
                summary.throughput,
                summary.epsilon
            );
        }
    }

    let queues = session.simulation().state_vector();
    println!("final queues [{}]", queues.iter().format(", "));
}
