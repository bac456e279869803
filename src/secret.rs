//! High-level [`Secret`] API to construct the program graph.
//!
//! A [`Secret`] represents the output wire of a gate in a [`SharedGraph`]
//! and supports the std::ops operators, which implicitly append gates:
//!
//! ```
//! use recirc::graph::ProgramGraph;
//! use recirc::secret::Secret;
//!
//! let graph = ProgramGraph::new().into_shared();
//! let a = Secret::input(&graph, 3);
//! let b = Secret::input(&graph, 4);
//! let sum = a + &b;
//! let _out = sum.gate_id();
//! ```

use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use std::ops::{Add, BitAnd, BitOr, BitXor, Mul, Not, Sub};
use std::sync::Arc;

use crate::graph::{Gate, GateId, SharedGraph};

#[derive(Clone)]
pub struct Secret {
    graph: SharedGraph,
    output_of: GateId,
}

impl Secret {
    /// Wraps an existing gate. The caller needs to ensure the id belongs to
    /// the given graph.
    pub fn from_parts(graph: SharedGraph, output_of: GateId) -> Self {
        Self { graph, output_of }
    }

    pub fn input(graph: &SharedGraph, value: u64) -> Self {
        let output_of = graph.lock().add_gate(Gate::Input(value));
        Self::from_parts(graph.clone(), output_of)
    }

    pub fn dummy_input(graph: &SharedGraph) -> Self {
        let output_of = graph.lock().add_gate(Gate::DummyInput);
        Self::from_parts(graph.clone(), output_of)
    }

    pub fn constant(graph: &SharedGraph, value: u64) -> Self {
        let output_of = graph.lock().add_gate(Gate::Constant(value));
        Self::from_parts(graph.clone(), output_of)
    }

    /// The gate this secret is the output of, e.g. to pass to
    /// [`Party::execute`](crate::party::Party::execute).
    pub fn gate_id(&self) -> GateId {
        self.output_of
    }

    pub fn gt(self, rhs: impl Borrow<Secret>) -> Secret {
        self.wire_binary(Gate::Gt, rhs.borrow())
    }

    /// Three-way select: yields `if_true` where `self` is true, `if_false`
    /// otherwise.
    pub fn mux(self, if_true: impl Borrow<Secret>, if_false: impl Borrow<Secret>) -> Secret {
        let if_true = if_true.borrow();
        let if_false = if_false.borrow();
        assert_same_graph(&self, if_true);
        assert_same_graph(&self, if_false);
        let output_of = self.graph.lock().add_wired_gate(
            Gate::Mux,
            &[self.output_of, if_true.output_of, if_false.output_of],
        );
        Secret::from_parts(self.graph, output_of)
    }

    fn wire_binary(self, gate: Gate, rhs: &Secret) -> Secret {
        assert_same_graph(&self, rhs);
        let output_of = self
            .graph
            .lock()
            .add_wired_gate(gate, &[self.output_of, rhs.output_of]);
        Secret::from_parts(self.graph, output_of)
    }
}

fn assert_same_graph(a: &Secret, b: &Secret) {
    assert!(
        Arc::ptr_eq(&a.graph, &b.graph),
        "Secret operations are only defined on secrets of the same session"
    );
}

macro_rules! impl_binary_op {
    ($($trait:ident::$method:ident => $gate:expr),+ $(,)?) => {
        $(
        impl<Rhs: Borrow<Secret>> $trait<Rhs> for Secret {
            type Output = Secret;

            fn $method(self, rhs: Rhs) -> Secret {
                self.wire_binary($gate, rhs.borrow())
            }
        }
        )*
    };
}

impl_binary_op!(
    Add::add => Gate::Add,
    Sub::sub => Gate::Sub,
    Mul::mul => Gate::Mul,
    BitAnd::bitand => Gate::And,
    BitXor::bitxor => Gate::Xor,
    BitOr::bitor => Gate::Or,
);

impl Not for Secret {
    type Output = Secret;

    fn not(self) -> Secret {
        let output_of = self.graph.lock().add_wired_gate(Gate::Inv, &[self.output_of]);
        Secret::from_parts(self.graph, output_of)
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret for output of gate {}", self.output_of)
    }
}

/// Creates `count` inputs with the given values in declared order.
pub fn inputs(graph: &SharedGraph, values: impl IntoIterator<Item = u64>) -> Vec<Secret> {
    values
        .into_iter()
        .map(|value| Secret::input(graph, value))
        .collect()
}

/// Reduces the secrets with the provided operation, building a balanced tree
/// so the resulting circuit has minimal depth.
pub fn low_depth_reduce<F>(secrets: impl IntoIterator<Item = Secret>, mut f: F) -> Option<Secret>
where
    F: FnMut(Secret, Secret) -> Secret,
{
    use itertools::Itertools;

    let mut buf: Vec<_> = secrets.into_iter().collect();
    let mut old_buf = Vec::with_capacity(buf.len() / 2);
    while buf.len() > 1 {
        std::mem::swap(&mut buf, &mut old_buf);
        let mut iter = old_buf.drain(..).tuples();
        for (s1, s2) in iter.by_ref() {
            buf.push(f(s1, s2));
        }
        for odd in iter.into_buffer() {
            buf.push(odd)
        }
    }
    debug_assert!(buf.len() <= 1);
    buf.pop()
}
