// SPDX-License-Identifier: Apache-2.0
//! End-to-end protocol tests: a real axum server bound to a loopback port,
//! driven by `board-client` over an actual WebSocket connection.

use board_client::BoardClient;
use board_proto::{Action, ActionKind, ClientMessage, ServerMessage, Value};
use board_server::config::Args;
use board_server::state::AppState;
use board_store::PersistenceService;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

async fn spawn_server(data_dir: PathBuf) -> SocketAddr {
    let args = Args {
        listen: "127.0.0.1:0".parse().unwrap(),
        data_dir,
        page_cache_size: 8,
        board_cache_size: 8,
        ping_interval_secs: 3600,
        flush_interval_secs: 3600,
        require_create_credential: false,
        allow_origin: Vec::new(),
        tls_cert: None,
        tls_key: None,
    };
    let persistence = PersistenceService::open(args.data_dir.clone(), 8, 8).unwrap();
    let state = AppState::new(persistence, &args);
    let router = board_server::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });
    // give the accept loop a moment to start polling.
    tokio::time::sleep(Duration::from_millis(20)).await;
    addr
}

fn draw(uuid: &str, text: &str) -> Action {
    Action {
        uuid: uuid.into(),
        kind: ActionKind::Draw {
            element: Value::Text(text.into()),
        },
    }
}

#[tokio::test]
async fn create_board_draw_and_full_page_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path().to_path_buf()).await;

    let mut client = BoardClient::connect(&addr.to_string()).await.unwrap();
    client
        .send(&ClientMessage::CreateBoard {
            passwd: "anyone".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardCreated {
        passwd,
        first_page_id,
        ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected board-created");
    };

    let seed_hash = board_proto::hash::hash_bytes(first_page_id.as_bytes()).to_hex();
    client
        .send(&ClientMessage::ModActionProposal {
            passwd: passwd.clone(),
            page_uuid: first_page_id.clone(),
            payload: draw("a1", "hello"),
            before_hash: seed_hash,
        })
        .await
        .unwrap();
    let ServerMessage::Accept { after_hash, .. } = client.recv().await.unwrap() else {
        panic!("expected accept");
    };

    client
        .send(&ClientMessage::FullPageRequest {
            page_number: Some(1),
            page_id: None,
            delta: None,
            request_id: "r2".into(),
        })
        .await
        .unwrap();
    let ServerMessage::FullPage { history, hash, .. } = client.recv().await.unwrap() else {
        panic!("expected full page");
    };
    assert_eq!(history.len(), 1);
    assert_eq!(hash, after_hash);
}

#[tokio::test]
async fn stale_before_hash_is_declined() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path().to_path_buf()).await;

    let mut client = BoardClient::connect(&addr.to_string()).await.unwrap();
    client
        .send(&ClientMessage::CreateBoard {
            passwd: "anyone".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardCreated {
        passwd,
        first_page_id,
        ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected board-created");
    };

    client
        .send(&ClientMessage::ModActionProposal {
            passwd,
            page_uuid: first_page_id,
            payload: draw("a1", "hello"),
            before_hash: "not-the-real-hash".into(),
        })
        .await
        .unwrap();
    let ServerMessage::Decline { reason, .. } = client.recv().await.unwrap() else {
        panic!("expected decline");
    };
    assert_eq!(reason, "cannot apply action to current visual state");
}

#[tokio::test]
async fn new_page_then_delete_redirects_to_survivor() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path().to_path_buf()).await;

    let mut client = BoardClient::connect(&addr.to_string()).await.unwrap();
    client
        .send(&ClientMessage::CreateBoard {
            passwd: "anyone".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardCreated {
        passwd,
        first_page_id,
        ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected board-created");
    };

    client
        .send(&ClientMessage::ModActionProposal {
            passwd: passwd.clone(),
            page_uuid: first_page_id.clone(),
            payload: Action {
                uuid: "newpage-1".into(),
                kind: ActionKind::NewPage,
            },
            before_hash: String::new(),
        })
        .await
        .unwrap();
    let ServerMessage::Accept { total_pages, .. } = client.recv().await.unwrap() else {
        panic!("expected accept for new page");
    };
    assert_eq!(total_pages, 2);

    client
        .send(&ClientMessage::FullPageRequest {
            page_number: Some(2),
            page_id: None,
            delta: None,
            request_id: "r2".into(),
        })
        .await
        .unwrap();
    let ServerMessage::FullPage {
        uuid: second_page_id,
        ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected full page");
    };

    client
        .send(&ClientMessage::ModActionProposal {
            passwd,
            page_uuid: first_page_id.clone(),
            payload: Action {
                uuid: "delpage-1".into(),
                kind: ActionKind::DeletePage {
                    page_id: first_page_id.clone(),
                },
            },
            before_hash: String::new(),
        })
        .await
        .unwrap();
    let ServerMessage::Accept {
        uuid: survivor, total_pages, ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected accept for delete page");
    };
    assert_eq!(survivor, second_page_id);
    assert_eq!(total_pages, 1);
}

#[tokio::test]
async fn register_board_reports_existing_page_order() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path().to_path_buf()).await;

    let mut creator = BoardClient::connect(&addr.to_string()).await.unwrap();
    creator
        .send(&ClientMessage::CreateBoard {
            passwd: "anyone".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardCreated {
        board_id,
        first_page_id,
        ..
    } = creator.recv().await.unwrap()
    else {
        panic!("expected board-created");
    };

    let mut viewer = BoardClient::connect(&addr.to_string()).await.unwrap();
    viewer
        .send(&ClientMessage::RegisterBoard {
            board_id: board_id.clone(),
            client_id: "c2".into(),
            request_id: "r2".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardRegistered {
        board_id: registered_board_id,
        first_page_id: registered_first_page_id,
        total_pages,
        ..
    } = viewer.recv().await.unwrap()
    else {
        panic!("expected board-registered");
    };
    assert_eq!(registered_board_id, board_id);
    assert_eq!(registered_first_page_id, first_page_id);
    assert_eq!(total_pages, 1);
}

#[tokio::test]
async fn replay_request_with_matching_hash_returns_catch_up_edits() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path().to_path_buf()).await;

    let mut client = BoardClient::connect(&addr.to_string()).await.unwrap();
    client
        .send(&ClientMessage::CreateBoard {
            passwd: "anyone".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardCreated {
        passwd,
        first_page_id,
        ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected board-created");
    };

    let seed_hash = board_proto::hash::hash_bytes(first_page_id.as_bytes()).to_hex();
    client
        .send(&ClientMessage::ModActionProposal {
            passwd,
            page_uuid: first_page_id.clone(),
            payload: draw("a1", "hello"),
            before_hash: seed_hash.clone(),
        })
        .await
        .unwrap();
    let ServerMessage::Accept { .. } = client.recv().await.unwrap() else {
        panic!("expected accept");
    };

    client
        .send(&ClientMessage::ReplayRequest {
            page_uuid: first_page_id,
            present: 0,
            present_hash: seed_hash,
            request_id: "r2".into(),
        })
        .await
        .unwrap();
    let ServerMessage::Replay { edits, present, .. } = client.recv().await.unwrap() else {
        panic!("expected replay");
    };
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].uuid, "a1");
    assert_eq!(present, 1);
}

#[tokio::test]
async fn replay_request_with_stale_hash_falls_back_to_full_page() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path().to_path_buf()).await;

    let mut client = BoardClient::connect(&addr.to_string()).await.unwrap();
    client
        .send(&ClientMessage::CreateBoard {
            passwd: "anyone".into(),
            client_id: "c1".into(),
            request_id: "r1".into(),
        })
        .await
        .unwrap();
    let ServerMessage::BoardCreated {
        passwd,
        first_page_id,
        ..
    } = client.recv().await.unwrap()
    else {
        panic!("expected board-created");
    };

    let seed_hash = board_proto::hash::hash_bytes(first_page_id.as_bytes()).to_hex();
    client
        .send(&ClientMessage::ModActionProposal {
            passwd,
            page_uuid: first_page_id.clone(),
            payload: draw("a1", "hello"),
            before_hash: seed_hash,
        })
        .await
        .unwrap();
    let ServerMessage::Accept { .. } = client.recv().await.unwrap() else {
        panic!("expected accept");
    };

    client
        .send(&ClientMessage::ReplayRequest {
            page_uuid: first_page_id,
            present: 0,
            present_hash: "not-a-real-hash".into(),
            request_id: "r2".into(),
        })
        .await
        .unwrap();
    let ServerMessage::FullPage { history, .. } = client.recv().await.unwrap() else {
        panic!("expected full page fallback");
    };
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].uuid, "a1");
}
