//! Boundary to the secure-computation engine that builds and runs circuits.
//!
//! The engine is an external collaborator: it can hold exactly one circuit
//! under construction, runs it in a single joint protocol round with the peer
//! party, and must be [`reset`](Engine::reset) before another circuit can be
//! built. The compiler only talks to the engine through the traits defined
//! here, so back ends can be swapped without touching the graph or compiler.
//!
//! [`insecure::InsecureEngine`] is a cleartext implementation of this
//! boundary for tests and demos.

use std::fmt::Debug;
use std::net::SocketAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod insecure;

/// Sharing domains the engine partitions its circuit builders into.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Sharing {
    Arithmetic,
    Boolean,
    Garbled,
}

/// Identity of a party in the two-party protocol. The server side listens
/// for the connection, the client side initiates it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub fn peer(self) -> Role {
        match self {
            Role::Server => Role::Client,
            Role::Client => Role::Server,
        }
    }
}

/// Which party or parties learn a revealed output in cleartext.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Visibility {
    All,
    Server,
    Client,
}

impl Visibility {
    /// Whether a party with `role` may see the cleartext.
    pub fn entitles(self, role: Role) -> bool {
        match (self, role) {
            (Visibility::All, _) => true,
            (Visibility::Server, Role::Server) => true,
            (Visibility::Client, Role::Client) => true,
            _ => false,
        }
    }
}

/// Parameters of a per-party engine session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub role: Role,
    /// Address the server role listens on and the client role connects to.
    pub peer: SocketAddr,
    /// Bit width of numeric values in the circuit.
    pub bitlen: u16,
    /// Requested symmetric security strength in bits, see [`SecurityLevel`].
    pub security_bits: u32,
    /// Worker threads the engine may use for protocol rounds.
    pub threads: usize,
}

impl SessionConfig {
    pub fn new(role: Role, peer: SocketAddr) -> Self {
        Self {
            role,
            peer,
            bitlen: 32,
            security_bits: 128,
            threads: 2,
        }
    }
}

/// Discrete security levels supported by engine back ends.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum SecurityLevel {
    Short,
    Medium,
    Long,
    ExtraLong,
    UltraLong,
}

impl SecurityLevel {
    /// Maps a requested symmetric bit-strength to the next supported level.
    pub fn from_symmetric_bits(bits: u32) -> Self {
        match bits {
            0..=80 => SecurityLevel::Short,
            81..=112 => SecurityLevel::Medium,
            113..=128 => SecurityLevel::Long,
            129..=192 => SecurityLevel::ExtraLong,
            _ => SecurityLevel::UltraLong,
        }
    }

    pub fn symmetric_bits(self) -> u32 {
        match self {
            SecurityLevel::Short => 80,
            SecurityLevel::Medium => 112,
            SecurityLevel::Long => 128,
            SecurityLevel::ExtraLong => 192,
            SecurityLevel::UltraLong => 256,
        }
    }
}

/// Per-domain circuit construction surface of the engine.
///
/// Every constructor appends one gate to the circuit under construction and
/// returns an opaque share handle for its output wire. `bitlen` parameters
/// only apply to leaf gates, operator gates derive their width from their
/// operands.
pub trait GateBuilder {
    type Share: Clone + Debug;

    fn dummy_input(&mut self, bitlen: u16) -> Self::Share;
    fn input(&mut self, value: u64, bitlen: u16, owner: Role) -> Self::Share;
    fn constant(&mut self, value: u64, bitlen: u16) -> Self::Share;
    fn inv(&mut self, a: &Self::Share) -> Self::Share;
    fn add(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    fn sub(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    fn mul(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    fn gt(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    fn and(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    fn xor(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    fn or(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;
    /// Three-way select: the output carries `a` where `sel` is true and `b`
    /// otherwise.
    fn mux(&mut self, sel: &Self::Share, a: &Self::Share, b: &Self::Share) -> Self::Share;
    /// Marks `a` as a revealed output for the given visibility.
    fn output(&mut self, a: &Self::Share, visibility: Visibility) -> Self::Share;
}

/// One party's handle to the secure-computation engine.
///
/// The engine holds at most one circuit at a time: gates are laid through
/// [`Engine::builder`], the circuit is run once with [`Engine::run`], and
/// [`Engine::reset`] discards it so the next circuit can be built over the
/// same connection. Cleartext results of revealed outputs are available
/// through [`Engine::clear_value`] after `run` returns.
#[async_trait]
pub trait Engine: Send {
    type Share: Clone + Debug + Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;
    type Builder: GateBuilder<Share = Self::Share>;

    /// The circuit builder for one of the engine's sharing domains.
    fn builder(&mut self, sharing: Sharing) -> &mut Self::Builder;

    /// Executes the built circuit jointly with the peer party. Resolves when
    /// the protocol round, including all message exchange, has completed.
    async fn run(&mut self) -> Result<(), Self::Error>;

    /// Discards the engine's one-shot circuit state. The connection to the
    /// peer party stays up.
    fn reset(&mut self);

    /// Cleartext value of a revealed output wire. Only valid after
    /// [`Engine::run`] has returned successfully.
    fn clear_value(&self, share: &Self::Share) -> u64;
}
