//! The cached program graph and its gate variants.
//!
//! A [`ProgramGraph`] is an append-only arena of [`Gate`]s. Gates reference
//! their operands through directed wires from producer to consumer, so shared
//! sub-expressions are plain DAG sharing without ownership cycles. The graph
//! is never consumed by circuit execution: any gate can serve as the output
//! of a freshly compiled circuit, arbitrarily often.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Direction, Graph};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::CircuitError;

type GateGraph = Graph<Gate, Wire, Directed, u32>;

/// One node of the program graph.
///
/// `Input` carries this party's private value, `Constant` a publicly known
/// one. `DummyInput` stands in for a value supplied by the peer party, so
/// that both parties construct structurally identical graphs.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Gate {
    DummyInput,
    Input(u64),
    Constant(u64),
    Inv,
    Add,
    Sub,
    Mul,
    Gt,
    And,
    Xor,
    Or,
    Mux,
}

#[derive(Copy, Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Debug)]
pub struct GateId(NodeIndex<u32>);

#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize, Deserialize)]
pub struct Wire;

/// Append-only arena owning every gate constructed in a session.
pub struct ProgramGraph {
    graph: GateGraph,
    input_count: usize,
}

/// A program graph shared between a party and any number of
/// [`Secret`](crate::secret::Secret) handles.
pub type SharedGraph = Arc<Mutex<ProgramGraph>>;

impl Gate {
    /// Fixed number of operand wires of this variant.
    pub fn input_size(&self) -> usize {
        match self {
            Gate::DummyInput | Gate::Input(_) | Gate::Constant(_) => 0,
            Gate::Inv => 1,
            Gate::Add | Gate::Sub | Gate::Mul | Gate::Gt | Gate::And | Gate::Xor | Gate::Or => 2,
            Gate::Mux => 3,
        }
    }
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self {
            graph: Default::default(),
            input_count: 0,
        }
    }

    pub fn with_capacity(gates: usize, wires: usize) -> Self {
        Self {
            graph: Graph::with_capacity(gates, wires),
            input_count: 0,
        }
    }

    /// Appends a leaf or an unwired operator gate. Operand wires are added
    /// via [`ProgramGraph::add_wire`] or, more conveniently, the whole gate
    /// via [`ProgramGraph::add_wired_gate`].
    pub fn add_gate(&mut self, gate: Gate) -> GateId {
        if let Gate::Input(_) | Gate::DummyInput = gate {
            self.input_count += 1;
        }
        let gate_id = GateId(self.graph.add_node(gate));
        trace!(%gate_id, ?gate, "Added gate");
        gate_id
    }

    /// Wires the output of `from` into `to`. Wires may only point forward in
    /// construction order, which keeps the graph acyclic.
    pub fn add_wire(&mut self, from: GateId, to: GateId) {
        assert!(
            from.0.index() < to.0.index(),
            "Wires must connect an earlier gate to a later one"
        );
        self.graph.add_edge(from.0, to.0, Wire);
    }

    /// Appends `gate` and wires every id in `from` as its operands, in
    /// declared order.
    pub fn add_wired_gate(&mut self, gate: Gate, from: &[GateId]) -> GateId {
        assert_eq!(
            gate.input_size(),
            from.len(),
            "{gate:?} takes {} operands",
            gate.input_size()
        );
        let added = self.add_gate(gate);
        // reverse so that inputs() yields the producers in the same order as
        // passed here in from
        for from_id in from.iter().rev() {
            self.add_wire(*from_id, added);
        }
        added
    }

    pub fn get_gate(&self, id: impl Into<GateId>) -> Gate {
        self.graph[id.into().0]
    }

    /// Producers feeding `id`, in the order they were declared.
    pub fn inputs(&self, id: impl Into<GateId>) -> impl Iterator<Item = GateId> + '_ {
        self.graph
            .neighbors_directed(id.into().0, Direction::Incoming)
            .map(GateId)
    }

    pub fn gate_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn wire_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of `Input` and `DummyInput` gates constructed so far.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn save_dot(&self, path: impl AsRef<Path>) -> Result<(), CircuitError> {
        let path = {
            let mut p = path.as_ref().to_path_buf();
            p.set_extension("dot");
            p
        };
        let dot_content = Dot::with_config(&self.graph, &[Config::EdgeNoLabel]);
        fs::write(path, format!("{dot_content:?}")).map_err(CircuitError::SaveAsDot)?;
        Ok(())
    }

    pub(crate) fn as_graph(&self) -> &GateGraph {
        &self.graph
    }

    pub fn into_shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }
}

impl Default for ProgramGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GateId {
    pub fn as_usize(&self) -> usize {
        self.0.index()
    }
}

impl From<NodeIndex<u32>> for GateId {
    fn from(idx: NodeIndex<u32>) -> Self {
        Self(idx)
    }
}

impl From<GateId> for NodeIndex<u32> {
    fn from(id: GateId) -> Self {
        id.0
    }
}

impl Display for GateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.index())
    }
}
