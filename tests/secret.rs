mod common;

use anyhow::Result;
use common::{init_tracing, local_parties};
use recirc::secret::{low_depth_reduce, Secret};
use recirc::{Role, Visibility};

#[tokio::test]
async fn secret_expression_end_to_end() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);

    // (x + y) * (x - y) where x is the server's private 9 and y the
    // client's private 4
    let build = |graph: &recirc::SharedGraph, role: Role, value: u64| {
        let (x, y) = match role {
            Role::Server => (Secret::input(graph, value), Secret::dummy_input(graph)),
            Role::Client => (Secret::dummy_input(graph), Secret::input(graph, value)),
        };
        let sum = x.clone() + &y;
        let diff = x - y;
        (sum * diff).gate_id()
    };
    let out_s = build(server.graph(), Role::Server, 9);
    let out_c = build(client.graph(), Role::Client, 4);

    let out = tokio::try_join!(
        server.execute(out_s, Visibility::All),
        client.execute(out_c, Visibility::All)
    )?;
    assert_eq!((65, 65), out);
    Ok(())
}

#[tokio::test]
async fn reduced_sum_end_to_end() -> Result<()> {
    let _guard = init_tracing();
    let (mut server, mut client) = local_parties(32);

    let build = |graph: &recirc::SharedGraph| {
        let values: Vec<_> = [1, 2, 3, 4]
            .into_iter()
            .map(|v| Secret::constant(graph, v))
            .collect();
        low_depth_reduce(values, std::ops::Add::add)
            .unwrap()
            .gate_id()
    };
    let out_s = build(server.graph());
    let out_c = build(client.graph());

    let out = tokio::try_join!(
        server.execute(out_s, Visibility::All),
        client.execute(out_c, Visibility::All)
    )?;
    assert_eq!((10, 10), out);
    Ok(())
}
