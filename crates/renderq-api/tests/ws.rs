//! Tests for the WebSocket event pump.
//!
//! The pump is driven over in-memory channels standing in for the two
//! halves of an upgraded socket, so no HTTP upgrade takes place.

use std::time::Duration;

use axum::extract::ws::Message;
use futures::StreamExt;
use futures::channel::mpsc;
use renderq_api::ws::forward_events;
use renderq_core::{JobEvent, JobId, JobStatus};
use renderq_tracker::ChangeNotifier;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;

type Inbound = mpsc::UnboundedSender<Result<Message, std::io::Error>>;
type Outbound = mpsc::UnboundedReceiver<Message>;

/// Start a pump over `notifier` and return the client's ends of the socket.
fn connect(notifier: &ChangeNotifier) -> (Inbound, Outbound, JoinHandle<()>) {
    let events = notifier.subscribe();
    let (out_tx, out_rx) = mpsc::unbounded();
    let (in_tx, in_rx) = mpsc::unbounded();
    let handle = tokio::spawn(forward_events(out_tx, in_rx, events));
    (in_tx, out_rx, handle)
}

async fn next_frame(out: &mut Outbound) -> Value {
    let message = timeout(Duration::from_secs(2), out.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("socket closed");
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

fn update(id: i64, status: JobStatus) -> JobEvent {
    JobEvent::JobUpdated {
        job_id: JobId::new(id),
        status,
    }
}

#[tokio::test]
async fn events_are_forwarded_as_json_frames() {
    let notifier = ChangeNotifier::new(16);
    let (_inbound, mut out, _handle) = connect(&notifier);

    notifier.publish(update(3, JobStatus::Working));
    notifier.publish(JobEvent::StarToggled {
        job_id: JobId::new(3),
        starred: true,
    });

    assert_eq!(
        next_frame(&mut out).await,
        json!({"type": "job_update", "job_id": 3, "status": "working"})
    );
    assert_eq!(
        next_frame(&mut out).await,
        json!({"type": "star_toggled", "job_id": 3, "starred": true})
    );
}

#[tokio::test]
async fn lagged_client_gets_resync_and_stays_connected() {
    let notifier = ChangeNotifier::new(2);
    let events = notifier.subscribe();
    for id in 1..=4 {
        notifier.publish(update(id, JobStatus::Complete));
    }

    let (out_tx, mut out) = mpsc::unbounded();
    let (_inbound, in_rx) = mpsc::unbounded::<Result<Message, std::io::Error>>();
    let handle = tokio::spawn(forward_events(out_tx, in_rx, events));

    assert_eq!(next_frame(&mut out).await, json!({"type": "resync"}));
    assert_eq!(next_frame(&mut out).await["job_id"], 3);
    assert_eq!(next_frame(&mut out).await["job_id"], 4);

    notifier.publish(update(5, JobStatus::Done));
    assert_eq!(next_frame(&mut out).await["job_id"], 5);
    assert!(!handle.is_finished());
}

#[tokio::test]
async fn close_frame_ends_the_connection() {
    let notifier = ChangeNotifier::new(16);
    let (inbound, mut out, handle) = connect(&notifier);

    inbound.unbounded_send(Ok(Message::Close(None))).unwrap();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("pump did not stop")
        .unwrap();

    // The pump dropped its end of the socket.
    assert!(out.next().await.is_none());
}

#[tokio::test]
async fn non_close_frames_are_ignored() {
    let notifier = ChangeNotifier::new(16);
    let (inbound, mut out, handle) = connect(&notifier);

    inbound
        .unbounded_send(Ok(Message::Text("hello".into())))
        .unwrap();
    notifier.publish(update(1, JobStatus::Error));

    assert_eq!(next_frame(&mut out).await["status"], "error");
    assert!(!handle.is_finished());
}

#[tokio::test]
async fn dropped_notifier_ends_the_connection() {
    let notifier = ChangeNotifier::new(16);
    let (_inbound, _out, handle) = connect(&notifier);

    drop(notifier);
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("pump did not stop")
        .unwrap();
}
