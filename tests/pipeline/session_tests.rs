//! Two live sessions talking through the full pipeline.
//!
//! Sockets are replaced by in-memory channels; everything between them is
//! the production path: inbound pump, ingest, broker, cascade, fan-out and
//! the outbound pump.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::ws::Message;
use chat_relay::presentation::middleware::AuthUser;
use chat_relay::presentation::websocket::{run_session, SessionContext};
use futures::channel::mpsc;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::common::{eventually, TestApp};

struct Client {
    input: mpsc::UnboundedSender<Result<Message, Infallible>>,
    output: mpsc::UnboundedReceiver<Message>,
    task: JoinHandle<()>,
}

fn connect(app: &TestApp, user_id: u64, username: &str) -> Client {
    let (input, stream) = mpsc::unbounded();
    let (sink, output) = mpsc::unbounded();
    let user = AuthUser {
        user_id,
        username: username.to_string(),
    };
    let task = tokio::spawn(run_session(
        stream,
        sink,
        user,
        SessionContext::from(&app.state),
    ));
    Client {
        input,
        output,
        task,
    }
}

impl Client {
    fn send(&self, frame: &str) {
        self.input
            .unbounded_send(Ok(Message::Text(frame.to_string().into())))
            .unwrap();
    }

    async fn receive(&mut self) -> Message {
        tokio::time::timeout(Duration::from_secs(2), self.output.next())
            .await
            .expect("nothing written in time")
            .expect("socket sink dropped")
    }
}

#[tokio::test]
async fn test_message_travels_between_sessions() {
    let mut app = TestApp::new().await;
    app.start_delivery();

    let alice = connect(&app, 1, "alice");
    let mut bob = connect(&app, 2, "bob");
    assert!(
        eventually(|| async {
            app.state.registry.is_online(1) && app.state.registry.is_online(2)
        })
        .await
    );

    alice.send(r#"{"type":0}"#);
    alice.send(r#"{"type":2,"target_id":2,"content":"hi bob"}"#);

    let Message::Text(text) = bob.receive().await else {
        panic!("expected a text frame");
    };
    let frame: Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(frame["from_id"], 1);
    assert_eq!(frame["content"], "hi bob");
    assert!(frame["send_time"].as_i64().unwrap() > 0);

    drop(alice.input);
    alice.task.await.unwrap();
    assert!(!app.state.registry.is_online(1));
    assert!(app.state.registry.is_online(2));

    app.stop_delivery().await;
    app.state.registry.shutdown();
    assert_eq!(bob.receive().await, Message::Close(None));
    drop(bob.input);
    bob.task.await.unwrap();
}

#[tokio::test]
async fn test_reconnect_replaces_previous_session() {
    let app = TestApp::new().await;

    let mut first = connect(&app, 5, "carol");
    assert!(eventually(|| async { app.state.registry.is_online(5) }).await);
    let first_session = app.state.registry.lookup(5).unwrap().session_id();

    let second = connect(&app, 5, "carol");
    assert!(
        eventually(|| async {
            app.state
                .registry
                .lookup(5)
                .is_some_and(|s| s.session_id() != first_session)
        })
        .await
    );

    assert_eq!(first.receive().await, Message::Close(None));
    drop(first.input);
    first.task.await.unwrap();

    assert!(app.state.registry.is_online(5));
    assert_eq!(app.state.registry.session_count(), 1);

    drop(second.input);
    second.task.await.unwrap();
    assert!(!app.state.registry.is_online(5));
}
