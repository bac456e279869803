//! Translation of a program subgraph into one engine circuit.
//!
//! Compilation walks the subgraph reachable from a chosen output gate and
//! replays it as engine builder calls in dependency order. The traversal is
//! iterative, so graph depth is bounded by heap memory rather than the call
//! stack.

use petgraph::graph::NodeIndex;
use petgraph::visit::{VisitMap, Visitable};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::engine::{Engine, GateBuilder, Role, Sharing};
use crate::graph::{Gate, GateId, ProgramGraph};

/// Ephemeral state for compiling one circuit. Created per
/// [`execute`](crate::party::Party::execute) call and discarded afterwards.
pub(crate) struct Compiler<'a, E: Engine> {
    graph: &'a ProgramGraph,
    engine: &'a mut E,
    bitlen: u16,
    role: Role,
}

enum Step {
    Enter(GateId),
    Emit(GateId),
}

impl<'a, E: Engine> Compiler<'a, E> {
    pub(crate) fn new(graph: &'a ProgramGraph, engine: &'a mut E, bitlen: u16, role: Role) -> Self {
        Self {
            graph,
            engine,
            bitlen,
            role,
        }
    }

    /// Drives the engine builders over the subgraph reachable from `out` and
    /// returns the share produced for `out` itself. Every reachable gate is
    /// built exactly once, operands strictly before their consumers.
    pub(crate) fn compile(mut self, out: GateId) -> E::Share {
        let order = self.build_order(out);
        debug!(%out, gates = order.len(), "Compiling circuit");
        let mut shares: Vec<Option<E::Share>> = vec![None; self.graph.gate_count()];
        for id in order {
            let share = self.build_gate(id, &shares);
            shares[id.as_usize()] = Some(share);
        }
        shares[out.as_usize()]
            .take()
            .expect("output gate is built by the final build step")
    }

    /// Discovery phase. The discovery stack holds enter and emit steps: a
    /// gate's emit step is pushed below the enter steps of its operands, so
    /// it reaches the order only after its whole operand subgraph. The visit
    /// map keeps gates shared by several consumers from being scheduled
    /// twice.
    fn build_order(&self, out: GateId) -> Vec<GateId> {
        let mut discovery = vec![Step::Enter(out)];
        let mut order = Vec::new();
        let mut discovered = self.graph.as_graph().visit_map();
        while let Some(step) = discovery.pop() {
            match step {
                Step::Enter(id) => {
                    if discovered.visit(NodeIndex::<u32>::from(id)) {
                        discovery.push(Step::Emit(id));
                        for input in self.graph.inputs(id) {
                            discovery.push(Step::Enter(input));
                        }
                    }
                }
                Step::Emit(id) => order.push(id),
            }
        }
        order
    }

    /// Build step for a single gate. Operand shares are taken from the slot
    /// table in declared order: the i-th declared operand becomes the i-th
    /// builder argument.
    fn build_gate(&mut self, id: GateId, shares: &[Option<E::Share>]) -> E::Share {
        let gate = self.graph.get_gate(id);
        let inputs: SmallVec<[E::Share; 3]> = self
            .graph
            .inputs(id)
            .map(|input| {
                shares[input.as_usize()]
                    .clone()
                    .expect("operand is built before its consumer")
            })
            .collect();
        assert_eq!(
            gate.input_size(),
            inputs.len(),
            "gate {id} is wired with a wrong operand count"
        );
        trace!(%id, ?gate, "Building gate");
        let bitlen = self.bitlen;
        match gate {
            Gate::DummyInput => self.engine.builder(Sharing::Garbled).dummy_input(bitlen),
            Gate::Input(value) => self
                .engine
                .builder(Sharing::Garbled)
                .input(value, bitlen, self.role),
            Gate::Constant(value) => self.engine.builder(Sharing::Garbled).constant(value, bitlen),
            Gate::Inv => self.engine.builder(Sharing::Boolean).inv(&inputs[0]),
            Gate::Add => self
                .engine
                .builder(Sharing::Garbled)
                .add(&inputs[0], &inputs[1]),
            Gate::Sub => self
                .engine
                .builder(Sharing::Garbled)
                .sub(&inputs[0], &inputs[1]),
            Gate::Mul => self
                .engine
                .builder(Sharing::Garbled)
                .mul(&inputs[0], &inputs[1]),
            Gate::Gt => self
                .engine
                .builder(Sharing::Garbled)
                .gt(&inputs[0], &inputs[1]),
            Gate::And => self
                .engine
                .builder(Sharing::Garbled)
                .and(&inputs[0], &inputs[1]),
            Gate::Xor => self
                .engine
                .builder(Sharing::Garbled)
                .xor(&inputs[0], &inputs[1]),
            Gate::Or => self
                .engine
                .builder(Sharing::Garbled)
                .or(&inputs[0], &inputs[1]),
            Gate::Mux => self
                .engine
                .builder(Sharing::Garbled)
                .mux(&inputs[0], &inputs[1], &inputs[2]),
        }
    }
}
