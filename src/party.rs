//! Long-lived party session owning the cached program graph.

use tracing::{debug, instrument};

use crate::compiler::Compiler;
use crate::engine::{Engine, GateBuilder, Role, Sharing, Visibility};
use crate::graph::{Gate, GateId, ProgramGraph, SharedGraph};

/// One party of the joint computation.
///
/// The party accumulates a program graph over its whole lifetime and can
/// repeatedly materialize any gate of that graph into a one-shot engine
/// circuit. The engine can only hold a single circuit, so the cycle is:
/// grow the graph, [`execute`](Party::execute) an output,
/// [`reset`](Party::reset), repeat. The graph survives every cycle; later
/// circuits may reuse any gate that was ever constructed.
///
/// Both parties must construct structurally identical graphs. Each party
/// registers its own private values as [`Party::input`] gates and the peer's
/// as [`Party::dummy_input`] placeholders.
pub struct Party<E> {
    graph: SharedGraph,
    role: Role,
    bitlen: u16,
    engine: E,
}

impl<E: Engine> Party<E> {
    pub fn new(engine: E, role: Role, bitlen: u16) -> Self {
        Self {
            graph: ProgramGraph::new().into_shared(),
            role,
            bitlen,
            engine,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn bitlen(&self) -> u16 {
        self.bitlen
    }

    /// The shared program graph, for use with the
    /// [`Secret`](crate::secret::Secret) API.
    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    /// Placeholder for a private input supplied by the peer party.
    pub fn dummy_input(&mut self) -> GateId {
        self.graph.lock().add_gate(Gate::DummyInput)
    }

    /// This party's private input.
    pub fn input(&mut self, value: u64) -> GateId {
        self.graph.lock().add_gate(Gate::Input(value))
    }

    /// A publicly known constant.
    pub fn constant(&mut self, value: u64) -> GateId {
        self.graph.lock().add_gate(Gate::Constant(value))
    }

    pub fn inv(&mut self, a: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Inv, &[a])
    }

    pub fn add(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Add, &[lhs, rhs])
    }

    pub fn sub(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Sub, &[lhs, rhs])
    }

    pub fn mul(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Mul, &[lhs, rhs])
    }

    pub fn gt(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Gt, &[lhs, rhs])
    }

    pub fn and(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::And, &[lhs, rhs])
    }

    pub fn xor(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Xor, &[lhs, rhs])
    }

    pub fn or(&mut self, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Or, &[lhs, rhs])
    }

    /// Three-way select: yields `lhs` where `sel` is true, `rhs` otherwise.
    pub fn mux(&mut self, sel: GateId, lhs: GateId, rhs: GateId) -> GateId {
        self.graph.lock().add_wired_gate(Gate::Mux, &[sel, lhs, rhs])
    }

    /// Compiles the subgraph reachable from `out` into an engine circuit,
    /// runs it jointly with the peer party and returns the revealed result.
    ///
    /// Blocks until the protocol round with the peer completes. A party the
    /// `visibility` does not entitle receives `0` instead of the cleartext.
    /// Call [`Party::reset`] before executing another output.
    #[instrument(skip(self), fields(role = ?self.role), err)]
    pub async fn execute(&mut self, out: GateId, visibility: Visibility) -> Result<u64, E::Error> {
        let out_share = {
            let graph = self.graph.lock();
            let share = Compiler::new(&graph, &mut self.engine, self.bitlen, self.role).compile(out);
            self.engine.builder(Sharing::Garbled).output(&share, visibility)
        };
        self.engine.run().await?;
        let value = if visibility.entitles(self.role) {
            self.engine.clear_value(&out_share)
        } else {
            0
        };
        debug!(value, "Revealed output");
        Ok(value)
    }

    /// Discards the engine's one-shot circuit state. The program graph is
    /// untouched and stays available for later [`Party::execute`] calls.
    pub fn reset(&mut self) {
        self.engine.reset();
    }
}
