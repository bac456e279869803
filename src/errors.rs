use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("Unable to save program graph as dot file")]
    SaveAsDot(#[source] io::Error),
}

/// Failures of the insecure simulation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unable to establish connection to peer party")]
    Connect(#[from] io::Error),
    #[error("Channel to peer party closed during protocol execution")]
    Disconnected,
    #[error(
        "Peer circuit out of sync: expected peer inputs at wires {expected:?}, peer sent {got:?}"
    )]
    InputMismatch { expected: Vec<u32>, got: Vec<u32> },
    #[error("Engine still holds an executed circuit, call reset() before building a new one")]
    CircuitNotReset,
}
