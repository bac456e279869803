mod common;

use anyhow::Result;
use common::{init_tracing, local_parties, LocalParty};
use rand::Rng;
use recirc::engine::insecure::InsecureEngine;
use recirc::transport::tcp;
use recirc::{GateId, Party, Role, Visibility};

/// Runs one circuit on both parties concurrently, as the engine's protocol
/// round blocks until the peer joins in.
async fn execute_both(
    server: &mut LocalParty,
    client: &mut LocalParty,
    server_out: GateId,
    client_out: GateId,
    visibility: Visibility,
) -> Result<(u64, u64)> {
    let out = tokio::try_join!(
        server.execute(server_out, visibility),
        client.execute(client_out, visibility)
    )?;
    Ok(out)
}

/// Builds the same gates on both parties, returning the (identical) output
/// ids. Usable whenever the construction does not involve private inputs.
fn build_on_both<T>(
    server: &mut LocalParty,
    client: &mut LocalParty,
    build: impl Fn(&mut LocalParty) -> T,
) -> (T, T) {
    (build(server), build(client))
}

#[tokio::test]
async fn sub_preserves_operand_order() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);
    let (out_s, out_c) = build_on_both(&mut server, &mut client, |party| {
        let five = party.constant(5);
        let three = party.constant(3);
        party.sub(five, three)
    });
    let out = execute_both(&mut server, &mut client, out_s, out_c, Visibility::All).await?;
    assert_eq!((2, 2), out);
    Ok(())
}

#[tokio::test]
async fn gt_preserves_operand_order() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);
    let (gt_s, gt_c) = build_on_both(&mut server, &mut client, |party| {
        let seven = party.constant(7);
        let two = party.constant(2);
        party.gt(seven, two)
    });
    let (lt_s, lt_c) = build_on_both(&mut server, &mut client, |party| {
        let two = party.constant(2);
        let seven = party.constant(7);
        party.gt(two, seven)
    });

    let out = execute_both(&mut server, &mut client, gt_s, gt_c, Visibility::All).await?;
    assert_eq!((1, 1), out, "7 > 2 must hold");

    server.reset();
    client.reset();
    let out = execute_both(&mut server, &mut client, lt_s, lt_c, Visibility::All).await?;
    assert_eq!((0, 0), out, "2 > 7 must not hold");
    Ok(())
}

#[tokio::test]
async fn mux_selects_by_guard() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);
    let (true_s, true_c) = build_on_both(&mut server, &mut client, |party| {
        let guard = party.constant(1);
        let a = party.constant(10);
        let b = party.constant(20);
        party.mux(guard, a, b)
    });
    let (false_s, false_c) = build_on_both(&mut server, &mut client, |party| {
        let guard = party.constant(0);
        let a = party.constant(10);
        let b = party.constant(20);
        party.mux(guard, a, b)
    });

    let out = execute_both(&mut server, &mut client, true_s, true_c, Visibility::All).await?;
    assert_eq!((10, 10), out);

    server.reset();
    client.reset();
    let out = execute_both(&mut server, &mut client, false_s, false_c, Visibility::All).await?;
    assert_eq!((20, 20), out);
    Ok(())
}

#[tokio::test]
async fn add_of_two_private_inputs() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);

    let server_sum = {
        let mine = server.input(3);
        let theirs = server.dummy_input();
        server.add(mine, theirs)
    };
    let client_sum = {
        let theirs = client.dummy_input();
        let mine = client.input(4);
        client.add(theirs, mine)
    };

    let out = execute_both(
        &mut server,
        &mut client,
        server_sum,
        client_sum,
        Visibility::All,
    )
    .await?;
    assert_eq!((7, 7), out);
    Ok(())
}

#[tokio::test]
async fn visibility_restricts_revealed_output() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);

    let server_sum = {
        let mine = server.input(10);
        let theirs = server.dummy_input();
        server.add(mine, theirs)
    };
    let client_sum = {
        let theirs = client.dummy_input();
        let mine = client.input(32);
        client.add(theirs, mine)
    };

    let out = execute_both(
        &mut server,
        &mut client,
        server_sum,
        client_sum,
        Visibility::Client,
    )
    .await?;
    assert_eq!((0, 42), out, "only the client is entitled to the sum");

    server.reset();
    client.reset();
    let out = execute_both(
        &mut server,
        &mut client,
        server_sum,
        client_sum,
        Visibility::Server,
    )
    .await?;
    assert_eq!((42, 0), out, "only the server is entitled to the sum");

    server.reset();
    client.reset();
    let out = execute_both(
        &mut server,
        &mut client,
        server_sum,
        client_sum,
        Visibility::All,
    )
    .await?;
    assert_eq!((42, 42), out);
    Ok(())
}

#[tokio::test]
async fn graph_outlives_engine_circuits() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);
    let ((sum_s, prod_s), (sum_c, prod_c)) = build_on_both(&mut server, &mut client, |party| {
        let x = party.constant(6);
        let y = party.constant(7);
        (party.add(x, y), party.mul(x, y))
    });

    let out = execute_both(&mut server, &mut client, sum_s, sum_c, Visibility::All).await?;
    assert_eq!((13, 13), out);

    // an unrelated circuit over the same cached graph
    server.reset();
    client.reset();
    let out = execute_both(&mut server, &mut client, prod_s, prod_c, Visibility::All).await?;
    assert_eq!((42, 42), out);

    // compiling the same output again yields the same result
    server.reset();
    client.reset();
    let out = execute_both(&mut server, &mut client, sum_s, sum_c, Visibility::All).await?;
    assert_eq!((13, 13), out);

    // the graph also keeps growing across engine cycles
    server.reset();
    client.reset();
    let (grown_s, grown_c) = build_on_both(&mut server, &mut client, |party| {
        let hundred = party.constant(100);
        party.add(hundred, hundred)
    });
    let out = execute_both(&mut server, &mut client, grown_s, grown_c, Visibility::All).await?;
    assert_eq!((200, 200), out);
    Ok(())
}

#[tokio::test]
async fn shared_subexpressions_compile_once_and_correctly() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);
    // (x + y) * (x - y) with x and y each shared by two consumers
    let (out_s, out_c) = build_on_both(&mut server, &mut client, |party| {
        let x = party.constant(9);
        let y = party.constant(4);
        let sum = party.add(x, y);
        let diff = party.sub(x, y);
        party.mul(sum, diff)
    });
    let out = execute_both(&mut server, &mut client, out_s, out_c, Visibility::All).await?;
    assert_eq!((65, 65), out);
    Ok(())
}

#[tokio::test]
async fn inv_complements_within_bitlen() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(8);
    let (out_s, out_c) = build_on_both(&mut server, &mut client, |party| {
        let bits = party.constant(0b1010);
        party.inv(bits)
    });
    let out = execute_both(&mut server, &mut client, out_s, out_c, Visibility::All).await?;
    assert_eq!((0b1111_0101, 0b1111_0101), out);
    Ok(())
}

#[tokio::test]
async fn deep_graphs_compile_without_recursion() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);
    let (out_s, out_c) = build_on_both(&mut server, &mut client, |party| {
        let one = party.constant(1);
        let mut acc = one;
        for _ in 0..50_000 {
            acc = party.add(acc, one);
        }
        acc
    });
    let out = execute_both(&mut server, &mut client, out_s, out_c, Visibility::All).await?;
    assert_eq!((50_001, 50_001), out);
    Ok(())
}

#[tokio::test]
async fn millionaires_with_selected_maximum() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);

    let build = |party: &mut LocalParty, wealth: u64| {
        let (server_wealth, client_wealth) = match party.role() {
            Role::Server => (party.input(wealth), party.dummy_input()),
            Role::Client => (party.dummy_input(), party.input(wealth)),
        };
        let server_is_richer = party.gt(server_wealth, client_wealth);
        party.mux(server_is_richer, server_wealth, client_wealth)
    };
    let out_s = build(&mut server, 57_000);
    let out_c = build(&mut client, 63_000);

    let out = execute_both(&mut server, &mut client, out_s, out_c, Visibility::All).await?;
    assert_eq!((63_000, 63_000), out);
    Ok(())
}

#[tokio::test]
async fn random_operands_match_reference_semantics() -> Result<()> {
    let _guard = init_tracing();
    let mut rng = rand::thread_rng();
    let (mut server, mut client) = local_parties(32);
    for round in 0..25 {
        if round > 0 {
            server.reset();
            client.reset();
        }
        let a: u32 = rng.gen();
        let b: u32 = rng.gen();
        let op = round % 7;
        let expected = match op {
            0 => a.wrapping_add(b),
            1 => a.wrapping_sub(b),
            2 => a.wrapping_mul(b),
            3 => (a > b) as u32,
            4 => a & b,
            5 => a ^ b,
            _ => a | b,
        } as u64;
        let (out_s, out_c) = build_on_both(&mut server, &mut client, |party| {
            let lhs = party.constant(a as u64);
            let rhs = party.constant(b as u64);
            match op {
                0 => party.add(lhs, rhs),
                1 => party.sub(lhs, rhs),
                2 => party.mul(lhs, rhs),
                3 => party.gt(lhs, rhs),
                4 => party.and(lhs, rhs),
                5 => party.xor(lhs, rhs),
                _ => party.or(lhs, rhs),
            }
        });
        let out = execute_both(&mut server, &mut client, out_s, out_c, Visibility::All).await?;
        assert_eq!((expected, expected), out, "round {round}: op {op} on {a}, {b}");
    }
    Ok(())
}

#[tokio::test]
async fn tcp_parties_execute_end_to_end() -> Result<()> {
    let _guard = init_tracing();
    let (server_channel, client_channel) = tcp::new_local_pair(None).await?;
    let mut server = Party::new(
        InsecureEngine::from_channel(Role::Server, server_channel),
        Role::Server,
        32,
    );
    let mut client = Party::new(
        InsecureEngine::from_channel(Role::Client, client_channel),
        Role::Client,
        32,
    );

    let build = |party: &mut Party<_>, wealth: u64| {
        let (server_wealth, client_wealth) = match party.role() {
            Role::Server => (party.input(wealth), party.dummy_input()),
            Role::Client => (party.dummy_input(), party.input(wealth)),
        };
        (party.gt(server_wealth, client_wealth), server_wealth)
    };
    let (cmp_s, wealth_s) = build(&mut server, 100);
    let (cmp_c, wealth_c) = build(&mut client, 42);

    let out = tokio::try_join!(
        server.execute(cmp_s, Visibility::All),
        client.execute(cmp_c, Visibility::All)
    )?;
    assert_eq!((1, 1), out);

    // the connection survives reset and serves the next circuit
    server.reset();
    client.reset();
    let out = tokio::try_join!(
        server.execute(wealth_s, Visibility::Server),
        client.execute(wealth_c, Visibility::Server)
    )?;
    assert_eq!((100, 0), out);
    Ok(())
}
