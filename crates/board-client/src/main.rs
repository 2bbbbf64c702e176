// SPDX-License-Identifier: Apache-2.0
//! Manual smoke-test binary: creates a board, draws one element, reads it
//! back as a full page.

use anyhow::Result;
use board_client::BoardClient;
use board_proto::{Action, ActionKind, ClientMessage, ServerMessage, Value};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    /// Server address, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();
    let args = Args::parse();

    let mut client = BoardClient::connect(&args.addr).await?;
    client
        .send(&ClientMessage::CreateBoard {
            passwd: "drill".into(),
            client_id: "drill-client".into(),
            request_id: "r1".into(),
        })
        .await?;
    let ServerMessage::BoardCreated {
        board_id,
        passwd,
        first_page_id,
        ..
    } = client.recv().await?
    else {
        anyhow::bail!("expected board-created");
    };
    println!("created board {board_id} page {first_page_id}");

    client
        .send(&ClientMessage::ModActionProposal {
            passwd,
            page_uuid: first_page_id.clone(),
            payload: Action {
                uuid: "a1".into(),
                kind: ActionKind::Draw {
                    element: Value::Text("hello".into()),
                },
            },
            before_hash: board_proto::hash::hash_bytes(first_page_id.as_bytes()).to_hex(),
        })
        .await?;
    println!("{:?}", client.recv().await?);
    Ok(())
}
