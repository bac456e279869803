//! Two parties compare their wealth without disclosing it to each other.
//! Both sides run inside this process and talk over TCP on localhost; in a
//! real deployment each party would run on its own host.
//!
//! Run the demo via `cargo run --example millionaires`. To view the logging
//! output, set the environment variable `RUST_LOG` as understood by
//! tracing-subscriber's EnvFilter.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use recirc::engine::insecure::InsecureEngine;
use recirc::{Party, Role, SessionConfig, Visibility};

#[tracing::instrument(err)]
async fn party(role: Role, addr: SocketAddr, wealth: u64) -> Result<u64> {
    let config = SessionConfig::new(role, addr);
    let engine = InsecureEngine::establish(&config).await?;
    let mut party = Party::new(engine, role, config.bitlen);

    // both parties construct the same graph, each feeding in its own wealth
    // and a placeholder for the peer's
    let (server_wealth, client_wealth) = match role {
        Role::Server => (party.input(wealth), party.dummy_input()),
        Role::Client => (party.dummy_input(), party.input(wealth)),
    };
    let server_is_richer = party.gt(server_wealth, client_wealth);
    let result = party.execute(server_is_richer, Visibility::All).await?;

    // the graph is still around, so a second circuit can reveal the maximum
    party.reset();
    let richest = party.mux(server_is_richer, server_wealth, client_wealth);
    let maximum = party.execute(richest, Visibility::All).await?;
    println!("{role:?}: server is richer: {result}, larger wealth: {maximum}");
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = "127.0.0.1:7744".parse()?;
    let server = tokio::spawn(party(Role::Server, addr, 57_000));
    // give the server a moment to listen; a real client would retry
    sleep(Duration::from_millis(100)).await;
    let client = tokio::spawn(party(Role::Client, addr, 63_000));

    let (server_out, client_out) = tokio::try_join!(server, client)?;
    assert_eq!(server_out?, client_out?);
    Ok(())
}
