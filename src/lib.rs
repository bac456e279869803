//! # recirc
//!
//! A reusable program-graph frontend for one-shot secure-computation engines.
//!
//! Engines in the style of garbled-circuit/secret-sharing frameworks build
//! exactly one circuit per construction-then-execute cycle and cannot be
//! extended once execution starts. Programs, however, often need to run many
//! different computations over the same set of expressions, deciding only at
//! runtime which output is required next. recirc bridges the two models: a
//! [`Party`] caches every gate ever constructed in an append-only program
//! graph, and each [`Party::execute`] call compiles just the subgraph the
//! requested output depends on into a fresh engine circuit. After a
//! [`Party::reset`] the same graph can serve the next, unrelated circuit.
//!
//! Gates are constructed either through the `Party` methods or through the
//! operator-overloading [`Secret`] API. The engine itself stays behind the
//! [`Engine`]/[`GateBuilder`] traits; an [`engine::insecure::InsecureEngine`]
//! implementation without any cryptography is included for tests and demos.
//!
//! ```ignore,rust
//! let (server_engine, client_engine) = InsecureEngine::in_memory_pair();
//! let mut party = Party::new(server_engine, Role::Server, 32);
//! // this party's salary stays private, the peer supplies the other one
//! let mine = party.input(57_000);
//! let theirs = party.dummy_input();
//! let i_earn_more = party.gt(mine, theirs);
//! // ... peer constructs the mirrored graph and executes concurrently
//! let result = party.execute(i_earn_more, Visibility::All).await?;
//! party.reset();
//! ```

pub use engine::{Engine, GateBuilder, Role, SecurityLevel, SessionConfig, Sharing, Visibility};
pub use graph::{Gate, GateId, ProgramGraph, SharedGraph};
pub use party::Party;
pub use secret::Secret;

mod compiler;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod party;
pub mod secret;
pub mod transport;
