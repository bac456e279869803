use recirc::engine::insecure::{InsecureEngine, SimMsg};
use recirc::transport::InMemory;
use recirc::{Party, Role};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub type LocalParty = Party<InsecureEngine<InMemory<SimMsg>>>;

/// Initializes a tracing subscriber for usage in tests. Assign the returned
/// guard to a variable to keep it alive for the test. Output is configured
/// via the RUST_LOG env variable.
pub fn init_tracing() -> tracing::dispatcher::DefaultGuard {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .set_default()
}

/// Server and client party joined by an in-memory channel.
pub fn local_parties(bitlen: u16) -> (LocalParty, LocalParty) {
    let (server_engine, client_engine) = InsecureEngine::in_memory_pair();
    (
        Party::new(server_engine, Role::Server, bitlen),
        Party::new(client_engine, Role::Client, bitlen),
    )
}
