//! Cleartext simulation of the engine boundary, intended for testing.
//!
//! [`InsecureEngine`] implements [`Engine`] without any cryptography: the two
//! parties exchange their private input values in the clear and then evaluate
//! the recorded circuit locally. It provides **no security whatsoever** and
//! exists so circuits can be compiled and executed end to end in tests and
//! demos without a cryptographic back end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::engine::{Engine, GateBuilder, Role, SecurityLevel, SessionConfig, Sharing, Visibility};
use crate::errors::EngineError;
use crate::transport::{tcp, InMemory, Transport};

/// Share handle of the insecure engine: an index into its wire tape.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct WireId(u32);

#[derive(Copy, Clone, Debug)]
enum Op {
    DummyInput,
    Input { value: u64, owner: Role },
    Constant { value: u64 },
    Inv { a: u32 },
    Add { a: u32, b: u32 },
    Sub { a: u32, b: u32 },
    Mul { a: u32, b: u32 },
    Gt { a: u32, b: u32 },
    And { a: u32, b: u32 },
    Xor { a: u32, b: u32 },
    Or { a: u32, b: u32 },
    Mux { sel: u32, a: u32, b: u32 },
    Output { a: u32 },
}

#[derive(Copy, Clone, Debug)]
struct Wire {
    op: Op,
    width: u16,
}

/// Private-input exchange message. Wire positions refer to the sender's own
/// tape; the tapes of both parties must be structurally identical.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimMsg {
    inputs: Vec<(u32, u64)>,
}

pub struct InsecureEngine<C = InMemory<SimMsg>> {
    role: Role,
    channel: C,
    wires: Vec<Wire>,
    values: Vec<u64>,
    executed: bool,
}

impl InsecureEngine<InMemory<SimMsg>> {
    /// Server and client engine joined by an in-memory channel.
    pub fn in_memory_pair() -> (Self, Self) {
        let (c0, c1) = InMemory::new_pair();
        (
            InsecureEngine::from_channel(Role::Server, c0),
            InsecureEngine::from_channel(Role::Client, c1),
        )
    }
}

impl InsecureEngine<tcp::Tcp<SimMsg>> {
    /// Establishes the peer connection described by `config`. The server
    /// role listens, the client role connects.
    #[instrument(skip(config), fields(role = ?config.role), err)]
    pub async fn establish(config: &SessionConfig) -> Result<Self, EngineError> {
        let level = SecurityLevel::from_symmetric_bits(config.security_bits);
        info!(
            ?level,
            threads = config.threads,
            "Establishing insecure engine session"
        );
        let channel = match config.role {
            Role::Server => tcp::listen(config.peer).await?,
            Role::Client => tcp::connect(config.peer).await?,
        };
        Ok(Self::from_channel(config.role, channel))
    }
}

impl<C> InsecureEngine<C> {
    pub fn from_channel(role: Role, channel: C) -> Self {
        Self {
            role,
            channel,
            wires: Vec::new(),
            values: Vec::new(),
            executed: false,
        }
    }

    fn push(&mut self, op: Op, width: u16) -> WireId {
        let id = u32::try_from(self.wires.len()).expect("wire tape exceeds u32 indices");
        self.wires.push(Wire { op, width });
        WireId(id)
    }

    fn width(&self, wire: u32) -> u16 {
        self.wires[wire as usize].width
    }

    /// Tape positions the peer has to supply values for.
    fn expected_peer_inputs(&self) -> Vec<u32> {
        self.wires
            .iter()
            .enumerate()
            .filter_map(|(idx, wire)| match wire.op {
                Op::DummyInput => Some(idx as u32),
                Op::Input { owner, .. } if owner != self.role => Some(idx as u32),
                _ => None,
            })
            .collect()
    }

    fn own_inputs(&self) -> Vec<(u32, u64)> {
        self.wires
            .iter()
            .enumerate()
            .filter_map(|(idx, wire)| match wire.op {
                Op::Input { value, owner } if owner == self.role => Some((idx as u32, value)),
                _ => None,
            })
            .collect()
    }

    fn evaluate(&self, peer_inputs: &[(u32, u64)]) -> Vec<u64> {
        let mut values = vec![0u64; self.wires.len()];
        for &(idx, value) in peer_inputs {
            values[idx as usize] = mask(value, self.wires[idx as usize].width);
        }
        for (idx, wire) in self.wires.iter().enumerate() {
            let v = match wire.op {
                // peer-supplied wires already hold their value
                Op::DummyInput => values[idx],
                Op::Input { value, owner } => {
                    if owner == self.role {
                        value
                    } else {
                        values[idx]
                    }
                }
                Op::Constant { value } => value,
                Op::Inv { a } => !values[a as usize],
                Op::Add { a, b } => values[a as usize].wrapping_add(values[b as usize]),
                Op::Sub { a, b } => values[a as usize].wrapping_sub(values[b as usize]),
                Op::Mul { a, b } => values[a as usize].wrapping_mul(values[b as usize]),
                Op::Gt { a, b } => (values[a as usize] > values[b as usize]) as u64,
                Op::And { a, b } => values[a as usize] & values[b as usize],
                Op::Xor { a, b } => values[a as usize] ^ values[b as usize],
                Op::Or { a, b } => values[a as usize] | values[b as usize],
                Op::Mux { sel, a, b } => {
                    if values[sel as usize] != 0 {
                        values[a as usize]
                    } else {
                        values[b as usize]
                    }
                }
                Op::Output { a } => values[a as usize],
            };
            values[idx] = mask(v, wire.width);
            trace!(wire = idx, value = values[idx], "Evaluated wire");
        }
        values
    }
}

impl<C> GateBuilder for InsecureEngine<C> {
    type Share = WireId;

    fn dummy_input(&mut self, bitlen: u16) -> WireId {
        self.push(Op::DummyInput, bitlen)
    }

    fn input(&mut self, value: u64, bitlen: u16, owner: Role) -> WireId {
        self.push(
            Op::Input {
                value: mask(value, bitlen),
                owner,
            },
            bitlen,
        )
    }

    fn constant(&mut self, value: u64, bitlen: u16) -> WireId {
        self.push(
            Op::Constant {
                value: mask(value, bitlen),
            },
            bitlen,
        )
    }

    fn inv(&mut self, a: &WireId) -> WireId {
        let width = self.width(a.0);
        self.push(Op::Inv { a: a.0 }, width)
    }

    fn add(&mut self, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(Op::Add { a: a.0, b: b.0 }, width)
    }

    fn sub(&mut self, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(Op::Sub { a: a.0, b: b.0 }, width)
    }

    fn mul(&mut self, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(Op::Mul { a: a.0, b: b.0 }, width)
    }

    fn gt(&mut self, a: &WireId, b: &WireId) -> WireId {
        self.push(Op::Gt { a: a.0, b: b.0 }, 1)
    }

    fn and(&mut self, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(Op::And { a: a.0, b: b.0 }, width)
    }

    fn xor(&mut self, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(Op::Xor { a: a.0, b: b.0 }, width)
    }

    fn or(&mut self, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(Op::Or { a: a.0, b: b.0 }, width)
    }

    fn mux(&mut self, sel: &WireId, a: &WireId, b: &WireId) -> WireId {
        let width = self.width(a.0).max(self.width(b.0));
        self.push(
            Op::Mux {
                sel: sel.0,
                a: a.0,
                b: b.0,
            },
            width,
        )
    }

    fn output(&mut self, a: &WireId, _visibility: Visibility) -> WireId {
        let width = self.width(a.0);
        self.push(Op::Output { a: a.0 }, width)
    }
}

#[async_trait]
impl<C> Engine for InsecureEngine<C>
where
    C: Transport<SimMsg>,
{
    type Share = WireId;
    type Error = EngineError;
    type Builder = Self;

    // cleartext evaluation does not distinguish the sharing domains
    fn builder(&mut self, _sharing: Sharing) -> &mut Self {
        self
    }

    #[instrument(skip(self), fields(role = ?self.role), err)]
    async fn run(&mut self) -> Result<(), EngineError> {
        if self.executed {
            return Err(EngineError::CircuitNotReset);
        }
        let own = self.own_inputs();
        let expected = self.expected_peer_inputs();
        debug!(
            own = own.len(),
            expected = expected.len(),
            wires = self.wires.len(),
            "Exchanging private inputs"
        );
        self.channel
            .send(SimMsg { inputs: own })
            .await
            .map_err(|_| EngineError::Disconnected)?;
        let msg = match self.channel.recv().await {
            Some(Ok(msg)) => msg,
            _ => return Err(EngineError::Disconnected),
        };
        let got: Vec<u32> = msg.inputs.iter().map(|(idx, _)| *idx).collect();
        if got != expected {
            return Err(EngineError::InputMismatch { expected, got });
        }
        self.values = self.evaluate(&msg.inputs);
        self.executed = true;
        info!(wires = self.wires.len(), "Executed circuit");
        Ok(())
    }

    fn reset(&mut self) {
        self.wires.clear();
        self.values.clear();
        self.executed = false;
    }

    fn clear_value(&self, share: &WireId) -> u64 {
        assert!(self.executed, "clear_value requires an executed circuit");
        self.values[share.0 as usize]
    }
}

fn mask(value: u64, width: u16) -> u64 {
    if width >= 64 {
        value
    } else {
        value & ((1u64 << width) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::{mask, InsecureEngine};
    use crate::engine::{Engine, GateBuilder, Role, Visibility};
    use crate::errors::EngineError;

    #[test]
    fn mask_truncates_to_width() {
        assert_eq!(0b0101, mask(0b1111_0101, 4));
        assert_eq!(u64::MAX, mask(u64::MAX, 64));
        assert_eq!(1, mask(u32::MAX as u64 + 2, 32));
    }

    #[tokio::test]
    async fn desynced_tapes_are_detected() {
        let (mut server, mut client) = InsecureEngine::in_memory_pair();
        // both parties put their own input on wire 0, so each expects the
        // peer value on wire 1 but is offered wire 0
        let s = server.input(1, 32, Role::Server);
        let d = server.dummy_input(32);
        server.add(&s, &d);
        let c = client.input(2, 32, Role::Client);
        let d = client.dummy_input(32);
        client.add(&c, &d);

        let (res_s, res_c) = tokio::join!(server.run(), client.run());
        for res in [res_s, res_c] {
            assert!(matches!(
                res,
                Err(EngineError::InputMismatch { expected, got })
                    if expected == vec![1] && got == vec![0]
            ));
        }
    }

    #[tokio::test]
    async fn second_run_requires_reset() {
        let (mut server, mut client) = InsecureEngine::in_memory_pair();
        let s = server.constant(1, 32);
        server.output(&s, Visibility::All);
        let c = client.constant(1, 32);
        client.output(&c, Visibility::All);
        let (r0, r1) = tokio::join!(server.run(), client.run());
        r0.unwrap();
        r1.unwrap();
        assert!(matches!(server.run().await, Err(EngineError::CircuitNotReset)));
        server.reset();
        client.reset();
        let s = server.constant(2, 32);
        server.output(&s, Visibility::All);
        let c = client.constant(2, 32);
        client.output(&c, Visibility::All);
        let (r0, r1) = tokio::join!(server.run(), client.run());
        r0.unwrap();
        r1.unwrap();
    }

    #[tokio::test]
    async fn vanished_peer_is_an_engine_error() {
        let (mut server, client) = InsecureEngine::in_memory_pair();
        drop(client);
        let s = server.constant(1, 32);
        server.output(&s, Visibility::All);
        assert!(matches!(server.run().await, Err(EngineError::Disconnected)));
    }

    #[test]
    #[should_panic(expected = "executed circuit")]
    fn clear_value_requires_run() {
        let (mut server, _client) = InsecureEngine::in_memory_pair();
        let share = server.constant(3, 32);
        server.clear_value(&share);
    }
}
