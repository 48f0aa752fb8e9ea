use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use super::*;
use crate::core::link::{LinkEvent, MediaLink, OutboundConnector};
use crate::core::notifier::{NotificationEvent, TranscriptNotifier};
use crate::errors::{RelayError, RelayResult};

const START_FRAME: &str = r#"{"event":"start","start":{"callSid":"CA123"},"streamSid":"MZ1"}"#;

fn media_frame(payload: &str) -> String {
    json!({"event": "media", "media": {"payload": payload}, "streamSid": "MZ1"}).to_string()
}

fn agent_frame(payload: &str) -> String {
    json!({"audio": payload}).to_string()
}

fn text_in(frame: impl Into<String>) -> SessionEvent {
    SessionEvent::Inbound(LinkEvent::Text(frame.into()))
}

fn text_out(frame: impl Into<String>) -> SessionEvent {
    SessionEvent::Outbound(LinkEvent::Text(frame.into()))
}

fn active_session() -> Session {
    let mut session = Session::new("test-session");
    assert!(session.handle(SessionEvent::OutboundOpened).is_empty());
    assert_eq!(session.state(), SessionState::Active);
    session
}

fn parse(frame: &str) -> Value {
    serde_json::from_str(frame).unwrap()
}

// =============================================================================
// State machine
// =============================================================================

#[test]
fn test_new_session_is_initializing() {
    let session = Session::new("s1");
    assert_eq!(session.state(), SessionState::Initializing);
    assert_eq!(session.inbound_state(), LinkState::Open);
    assert_eq!(session.outbound_state(), LinkState::Connecting);
    assert_eq!(session.call_identifier(), None);
    assert!(session.is_coupled());
}

#[test]
fn test_outbound_open_activates() {
    let session = active_session();
    assert_eq!(session.outbound_state(), LinkState::Open);
}

#[test]
fn test_start_records_identifier_without_reply() {
    let mut session = active_session();
    assert!(session.handle(text_in(START_FRAME)).is_empty());
    assert_eq!(session.call_identifier(), Some("CA123"));
}

#[test]
fn test_start_during_initializing_is_recorded() {
    let mut session = Session::new("s1");
    assert!(session.handle(text_in(START_FRAME)).is_empty());
    assert_eq!(session.call_identifier(), Some("CA123"));
    assert_eq!(session.state(), SessionState::Initializing);
}

#[test]
fn test_identifier_set_only_once() {
    let mut session = active_session();
    session.handle(text_in(START_FRAME));
    session.handle(text_in(
        r#"{"event":"start","start":{"callSid":"CA999"}}"#,
    ));
    assert_eq!(session.call_identifier(), Some("CA123"));
}

#[test]
fn test_start_without_identifier_leaves_slot_open() {
    let mut session = active_session();
    session.handle(text_in(r#"{"event":"start"}"#));
    assert_eq!(session.call_identifier(), None);
    session.handle(text_in(START_FRAME));
    assert_eq!(session.call_identifier(), Some("CA123"));
}

#[test]
fn test_media_forwarded_with_notification() {
    let mut session = active_session();
    session.handle(text_in(START_FRAME));

    let actions = session.handle(text_in(media_frame("AAAA")));
    assert_eq!(actions.len(), 2);
    match &actions[0] {
        SessionAction::ForwardToAgent(frame) => assert_eq!(parse(frame), json!({"audio": "AAAA"})),
        other => panic!("unexpected action: {other:?}"),
    }
    assert_eq!(
        actions[1],
        SessionAction::Notify(NotificationEvent::caller_chunk("CA123"))
    );
}

#[test]
fn test_media_preserves_arrival_order() {
    let mut session = active_session();
    let forwarded: Vec<Value> = ["A1", "A2", "A3"]
        .iter()
        .flat_map(|p| session.handle(text_in(media_frame(p))))
        .filter_map(|action| match action {
            SessionAction::ForwardToAgent(frame) => Some(parse(&frame)["audio"].clone()),
            _ => None,
        })
        .collect();
    assert_eq!(forwarded, vec![json!("A1"), json!("A2"), json!("A3")]);
}

#[test]
fn test_media_dropped_while_initializing() {
    let mut session = Session::new("s1");
    assert!(session.handle(text_in(media_frame("AAAA"))).is_empty());
    assert_eq!(session.state(), SessionState::Initializing);

    // Not buffered: nothing is replayed once the agent is up
    assert!(session.handle(SessionEvent::OutboundOpened).is_empty());
}

#[test]
fn test_notification_identifier_fallbacks() {
    let mut session = active_session();

    let actions = session.handle(text_in(media_frame("AAAA")));
    assert_eq!(
        actions[1],
        SessionAction::Notify(NotificationEvent::caller_chunk("MZ1"))
    );

    let actions = session.handle(text_in(r#"{"event":"media","media":{"payload":"AAAA"}}"#));
    assert_eq!(
        actions[1],
        SessionAction::Notify(NotificationEvent::caller_chunk("unknown"))
    );
}

#[test]
fn test_agent_audio_forwarded_to_caller() {
    let mut session = active_session();
    let actions = session.handle(text_out(agent_frame("BBBB")));
    match actions.as_slice() {
        [SessionAction::ForwardToCaller(frame)] => assert_eq!(
            parse(frame),
            json!({"event": "media", "media": {"payload": "BBBB"}})
        ),
        other => panic!("unexpected actions: {other:?}"),
    }
}

#[test]
fn test_agent_frames_without_audio_ignored() {
    let mut session = active_session();
    assert!(session.handle(text_out(r#"{"type":"ping"}"#)).is_empty());
}

#[test]
fn test_malformed_frames_do_not_change_state() {
    let mut session = active_session();
    assert!(session.handle(text_in("not json")).is_empty());
    assert!(session.handle(text_out("not json")).is_empty());
    assert!(session.handle(text_in(r#"{"event":"media","media":{}}"#)).is_empty());
    assert_eq!(session.state(), SessionState::Active);

    let actions = session.handle(text_in(media_frame("AAAA")));
    assert!(matches!(actions[0], SessionAction::ForwardToAgent(_)));
}

#[test]
fn test_outbound_close_closes_inbound() {
    for event in [LinkEvent::Closed, LinkEvent::Error("reset".to_string())] {
        let mut session = active_session();
        let actions = session.handle(SessionEvent::Outbound(event));
        assert_eq!(actions, vec![SessionAction::CloseInbound]);
        assert_eq!(session.state(), SessionState::Closing);
        assert!(session.is_coupled());

        session.close_completed();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.inbound_state(), LinkState::Closed);
        assert_eq!(session.outbound_state(), LinkState::Closed);
    }
}

#[test]
fn test_inbound_close_closes_outbound() {
    for event in [LinkEvent::Closed, LinkEvent::Error("reset".to_string())] {
        let mut session = active_session();
        let actions = session.handle(SessionEvent::Inbound(event));
        assert_eq!(actions, vec![SessionAction::CloseOutbound]);
        session.close_completed();
        assert!(session.is_terminated());
        assert_eq!(session.outbound_state(), LinkState::Closed);
    }
}

#[test]
fn test_inbound_close_while_connecting_abandons_connect() {
    let mut session = Session::new("s1");
    let actions = session.handle(SessionEvent::Inbound(LinkEvent::Closed));
    assert_eq!(actions, vec![SessionAction::CloseOutbound]);
    session.close_completed();
    assert!(session.is_terminated());
    assert_eq!(session.outbound_state(), LinkState::Closed);
}

#[test]
fn test_connect_failure_closes_inbound() {
    let mut session = Session::new("s1");
    let actions = session.handle(SessionEvent::OutboundFailed("refused".to_string()));
    assert_eq!(actions, vec![SessionAction::CloseInbound]);
    assert_eq!(session.outbound_state(), LinkState::Closed);
    assert!(session.is_coupled());
    session.close_completed();
    assert!(session.is_terminated());
}

#[test]
fn test_agent_audio_not_forwarded_once_caller_closing() {
    let mut session = Session::new("s1");
    session.handle(SessionEvent::OutboundFailed("refused".to_string()));
    assert_eq!(session.state(), SessionState::Closing);
    // Caller link is already being closed, so nothing goes out
    assert!(session.handle(text_out(agent_frame("BBBB"))).is_empty());
}

#[test]
fn test_terminated_ignores_everything() {
    let mut session = active_session();
    session.handle(SessionEvent::Outbound(LinkEvent::Closed));
    session.close_completed();

    assert!(session.handle(text_in(media_frame("AAAA"))).is_empty());
    assert!(session.handle(text_out(agent_frame("BBBB"))).is_empty());
    assert!(session.handle(SessionEvent::Inbound(LinkEvent::Closed)).is_empty());
    assert!(session.handle(SessionEvent::OutboundOpened).is_empty());
    assert!(session.handle(text_in(START_FRAME)).is_empty());
    assert_eq!(session.call_identifier(), None);
}

#[test]
fn test_close_completed_is_noop_outside_closing() {
    let mut session = active_session();
    session.close_completed();
    assert_eq!(session.state(), SessionState::Active);
}

// =============================================================================
// Driver
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Observed {
    Text(String),
    Close,
}

/// In-memory link: the test pushes events in and watches what the session sends.
struct FakeLink {
    events: mpsc::UnboundedReceiver<LinkEvent>,
    sent: mpsc::UnboundedSender<Observed>,
    fail_sends: bool,
}

struct FakeHandle {
    events: mpsc::UnboundedSender<LinkEvent>,
    sent: mpsc::UnboundedReceiver<Observed>,
}

impl FakeHandle {
    fn push(&self, event: LinkEvent) {
        self.events.send(event).unwrap();
    }

    fn push_text(&self, text: impl Into<String>) {
        self.push(LinkEvent::Text(text.into()));
    }

    async fn next(&mut self) -> Observed {
        timeout(Duration::from_secs(5), self.sent.recv())
            .await
            .expect("timed out waiting for relay output")
            .expect("link dropped")
    }

    async fn next_text(&mut self) -> Value {
        match self.next().await {
            Observed::Text(text) => parse(&text),
            Observed::Close => panic!("expected a frame, link was closed"),
        }
    }
}

fn fake_link(fail_sends: bool) -> (FakeLink, FakeHandle) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    (
        FakeLink {
            events: event_rx,
            sent: sent_tx,
            fail_sends,
        },
        FakeHandle {
            events: event_tx,
            sent: sent_rx,
        },
    )
}

#[async_trait]
impl MediaLink for FakeLink {
    async fn recv(&mut self) -> LinkEvent {
        self.events.recv().await.unwrap_or(LinkEvent::Closed)
    }

    async fn send_text(&mut self, text: String) -> RelayResult<()> {
        if self.fail_sends {
            return Err(RelayError::transport(
                crate::core::link::LinkSide::Outbound,
                "broken pipe",
            ));
        }
        let _ = self.sent.send(Observed::Text(text));
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.sent.send(Observed::Close);
    }
}

/// Hands out a single prepared link, optionally after a gate opens.
struct FakeConnector {
    link: Mutex<Option<FakeLink>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeConnector {
    fn ready(link: FakeLink) -> Arc<Self> {
        Arc::new(Self {
            link: Mutex::new(Some(link)),
            gate: Mutex::new(None),
        })
    }

    fn gated(link: FakeLink, gate: oneshot::Receiver<()>) -> Arc<Self> {
        Arc::new(Self {
            link: Mutex::new(Some(link)),
            gate: Mutex::new(Some(gate)),
        })
    }

    fn refusing() -> Arc<Self> {
        Arc::new(Self {
            link: Mutex::new(None),
            gate: Mutex::new(None),
        })
    }
}

#[async_trait]
impl OutboundConnector for FakeConnector {
    async fn connect(&self) -> RelayResult<Box<dyn MediaLink>> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let link = self.link.lock().unwrap().take();
        match link {
            Some(link) => Ok(Box::new(link)),
            None => Err(RelayError::Connect("connection refused".to_string())),
        }
    }
}

fn spawn_session(
    caller: FakeLink,
    connector: Arc<FakeConnector>,
    notifier: TranscriptNotifier,
) -> tokio::task::JoinHandle<Session> {
    tokio::spawn(async move {
        run_session(
            "driver-test".to_string(),
            caller,
            connector.as_ref(),
            &notifier,
        )
        .await
    })
}

fn silent_notifier() -> TranscriptNotifier {
    TranscriptNotifier::new(None, Duration::from_secs(1)).unwrap()
}

/// Wait until the session is Active by bouncing one agent frame to the caller.
async fn wait_until_active(caller: &mut FakeHandle, agent: &FakeHandle) {
    agent.push_text(agent_frame("READY"));
    assert_eq!(
        caller.next_text().await,
        json!({"event": "media", "media": {"payload": "READY"}})
    );
}

async fn finish(task: tokio::task::JoinHandle<Session>) -> Session {
    timeout(Duration::from_secs(5), task)
        .await
        .expect("session did not terminate")
        .unwrap()
}

#[tokio::test]
async fn test_driver_relays_both_directions() {
    let (caller_link, mut caller) = fake_link(false);
    let (agent_link, mut agent) = fake_link(false);
    let task = spawn_session(caller_link, FakeConnector::ready(agent_link), silent_notifier());

    wait_until_active(&mut caller, &agent).await;

    caller.push_text(START_FRAME);
    for payload in ["A1", "A2", "A3"] {
        caller.push_text(media_frame(payload));
    }
    for payload in ["A1", "A2", "A3"] {
        assert_eq!(agent.next_text().await, json!({"audio": payload}));
    }

    agent.push_text(agent_frame("BBBB"));
    assert_eq!(
        caller.next_text().await,
        json!({"event": "media", "media": {"payload": "BBBB"}})
    );

    caller.push(LinkEvent::Closed);
    assert_eq!(agent.next().await, Observed::Close);

    let session = finish(task).await;
    assert!(session.is_terminated());
    assert_eq!(session.call_identifier(), Some("CA123"));
}

#[tokio::test]
async fn test_driver_agent_close_closes_caller() {
    let (caller_link, mut caller) = fake_link(false);
    let (agent_link, agent) = fake_link(false);
    let task = spawn_session(caller_link, FakeConnector::ready(agent_link), silent_notifier());

    wait_until_active(&mut caller, &agent).await;
    agent.push(LinkEvent::Closed);

    assert_eq!(caller.next().await, Observed::Close);
    let session = finish(task).await;
    assert_eq!(session.inbound_state(), LinkState::Closed);
    assert_eq!(session.outbound_state(), LinkState::Closed);
}

#[tokio::test]
async fn test_driver_agent_error_closes_caller() {
    let (caller_link, mut caller) = fake_link(false);
    let (agent_link, agent) = fake_link(false);
    let task = spawn_session(caller_link, FakeConnector::ready(agent_link), silent_notifier());

    wait_until_active(&mut caller, &agent).await;
    agent.push(LinkEvent::Error("connection reset by peer".to_string()));

    assert_eq!(caller.next().await, Observed::Close);
    assert!(finish(task).await.is_terminated());
}

#[tokio::test]
async fn test_driver_connect_failure_closes_caller() {
    let (caller_link, mut caller) = fake_link(false);
    let task = spawn_session(caller_link, FakeConnector::refusing(), silent_notifier());

    assert_eq!(caller.next().await, Observed::Close);
    let session = finish(task).await;
    assert!(session.is_terminated());
    assert_eq!(session.outbound_state(), LinkState::Closed);
}

#[tokio::test]
async fn test_driver_caller_close_while_connecting() {
    let (caller_link, caller) = fake_link(false);
    let (agent_link, mut agent) = fake_link(false);
    let (_gate_tx, gate_rx) = oneshot::channel();
    let task = spawn_session(
        caller_link,
        FakeConnector::gated(agent_link, gate_rx),
        silent_notifier(),
    );

    caller.push(LinkEvent::Closed);
    let session = finish(task).await;
    assert!(session.is_terminated());
    assert_eq!(session.outbound_state(), LinkState::Closed);

    // The connect was abandoned, so the agent link was never used
    assert!(agent.sent.try_recv().is_err());
}

#[tokio::test]
async fn test_driver_skips_malformed_frames() {
    let (caller_link, mut caller) = fake_link(false);
    let (agent_link, mut agent) = fake_link(false);
    let task = spawn_session(caller_link, FakeConnector::ready(agent_link), silent_notifier());

    wait_until_active(&mut caller, &agent).await;

    caller.push_text("not json");
    caller.push_text(media_frame("AAAA"));
    assert_eq!(agent.next_text().await, json!({"audio": "AAAA"}));

    agent.push_text("not json");
    agent.push_text(agent_frame("BBBB"));
    assert_eq!(
        caller.next_text().await,
        json!({"event": "media", "media": {"payload": "BBBB"}})
    );

    caller.push(LinkEvent::Closed);
    assert!(finish(task).await.is_terminated());
}

#[tokio::test]
async fn test_driver_failed_agent_send_tears_down() {
    let (caller_link, mut caller) = fake_link(false);
    let (agent_link, agent) = fake_link(true);
    let task = spawn_session(caller_link, FakeConnector::ready(agent_link), silent_notifier());

    wait_until_active(&mut caller, &agent).await;
    caller.push_text(media_frame("AAAA"));

    assert_eq!(caller.next().await, Observed::Close);
    assert!(finish(task).await.is_terminated());
}

#[tokio::test]
async fn test_driver_unreachable_notifier_does_not_block_forwarding() {
    let (caller_link, mut caller) = fake_link(false);
    let (agent_link, mut agent) = fake_link(false);
    let notifier = TranscriptNotifier::new(
        Some("http://127.0.0.1:9/ingest".to_string()),
        Duration::from_secs(30),
    )
    .unwrap();
    let task = spawn_session(caller_link, FakeConnector::ready(agent_link), notifier);

    wait_until_active(&mut caller, &agent).await;

    caller.push_text(media_frame("A1"));
    caller.push_text(media_frame("A2"));
    assert_eq!(agent.next_text().await, json!({"audio": "A1"}));
    assert_eq!(agent.next_text().await, json!({"audio": "A2"}));

    caller.push(LinkEvent::Closed);
    assert!(finish(task).await.is_terminated());
}
