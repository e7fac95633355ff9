use thiserror::Error;

/// Errors surfaced by the learning components.
///
/// The simulation itself is a closed numeric system and cannot fail; every
/// variant here is a precondition violation around replay sampling or
/// weight persistence.
#[derive(Debug, Error)]
pub enum Error {
    /// Sampled from a replay buffer that holds no transitions.
    #[error("cannot sample from an empty replay buffer")]
    EmptyReplayBuffer,
    /// Restored weights whose shape does not match the network.
    #[error("weight shape does not match a {input}x{hidden}x{output} network")]
    WeightShape {
        input: usize,
        hidden: usize,
        output: usize,
    },
    /// Serialized weight data that could not be parsed.
    #[error("malformed weight data: {0}")]
    Malformed(#[from] serde_json::Error),
}
