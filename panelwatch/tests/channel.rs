//! Channel lifecycle and dispatch against a scripted in-memory transport.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use panelwatch::{
    channel::Frame,
    types::{Credential, Envelope, PowerState},
    Channel, ChannelError, ChannelOptions, ChannelState, Connector, CredentialSource, PanelError,
    Transport, Update,
};
use serde_json::json;
use tokio::sync::mpsc;

struct MockTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockConnector {
    opens: Arc<AtomicUsize>,
    transport: Mutex<Option<MockTransport>>,
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn open(&self, _credential: &Credential) -> Result<MockTransport, ChannelError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.transport
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ChannelError::Transport("already used".into()))
    }
}

struct StaticCreds {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl StaticCreds {
    fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCreds {
    async fn websocket_credentials(
        &self,
        server_id: &str,
        _api_key: &str,
    ) -> Result<Credential, PanelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            return Err(PanelError::MissingApiKey);
        }
        Ok(Credential {
            socket: format!("ws://wings.test/api/servers/{server_id}/ws"),
            token: "tok-1".into(),
        })
    }
}

struct Harness {
    tx: mpsc::UnboundedSender<String>,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
    connector: MockConnector,
}

fn harness() -> Harness {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let closes = Arc::new(AtomicUsize::new(0));
    let opens = Arc::new(AtomicUsize::new(0));
    let connector = MockConnector {
        opens: opens.clone(),
        transport: Mutex::new(Some(MockTransport {
            inbound: rx,
            sent: sent.clone(),
            closes: closes.clone(),
        })),
    };
    Harness {
        tx,
        sent,
        closes,
        opens,
        connector,
    }
}

impl Harness {
    fn sent(&self) -> Vec<Envelope> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    fn push(&self, event: &str, args: Vec<String>) {
        self.tx
            .send(json!({ "event": event, "args": args }).to_string())
            .unwrap();
    }
}

fn stats_json() -> String {
    json!({
        "cpu_absolute": 12.34,
        "disk_bytes": 1073741824u64,
        "memory_bytes": 536870912u64,
        "memory_limit_bytes": 1073741824u64,
        "network": { "rx_bytes": 10, "tx_bytes": 20 },
        "state": "running",
        "uptime": 90061000u64
    })
    .to_string()
}

async fn ready_channel(h: &Harness) -> Channel<MockTransport> {
    let creds = StaticCreds::ok();
    Channel::connect("abc", "client-key", &creds, &h.connector)
        .await
        .expect("connect")
}

#[tokio::test]
async fn connect_authenticates_then_becomes_ready() {
    let h = harness();
    let ch = ready_channel(&h).await;
    assert_eq!(ch.state(), ChannelState::Ready);
    assert_eq!(ch.server_id(), "abc");
    assert_eq!(h.opens.load(Ordering::SeqCst), 1);
    assert_eq!(h.sent(), vec![Envelope::new("auth", vec!["tok-1".into()])]);
}

#[tokio::test]
async fn empty_api_key_never_opens_a_transport() {
    let h = harness();
    let creds = StaticCreds::ok();
    let mut ch: Channel<MockTransport> = Channel::new("abc");
    let err = ch.open("", &creds, &h.connector).await.unwrap_err();
    assert!(matches!(err, ChannelError::MissingApiKey(ref s) if s == "abc"));
    assert_eq!(ch.state(), ChannelState::Unopened);
    assert_eq!(creds.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.opens.load(Ordering::SeqCst), 0);
    assert!(!ch.start().await.unwrap());
    assert!(!ch.stop().await.unwrap());
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn credential_failure_is_returned_without_opening() {
    let h = harness();
    let creds = StaticCreds {
        fail: true,
        ..StaticCreds::ok()
    };
    let mut ch: Channel<MockTransport> = Channel::new("abc");
    let err = ch.open("client-key", &creds, &h.connector).await.unwrap_err();
    assert!(matches!(err, ChannelError::Credentials(_)));
    assert_eq!(ch.state(), ChannelState::Closed);
    assert_eq!(h.opens.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_credentials_hit_the_connect_timeout() {
    let h = harness();
    let creds = StaticCreds {
        delay: Some(Duration::from_secs(5)),
        ..StaticCreds::ok()
    };
    let mut ch: Channel<MockTransport> = Channel::with_options(
        "abc",
        ChannelOptions {
            connect_timeout: Duration::from_millis(50),
            ..ChannelOptions::default()
        },
    );
    let err = ch.open("client-key", &creds, &h.connector).await.unwrap_err();
    assert!(matches!(err, ChannelError::Timeout(_)));
    assert_eq!(ch.state(), ChannelState::Closed);
    assert_eq!(h.opens.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn opening_twice_is_rejected() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    let creds = StaticCreds::ok();
    let err = ch.open("client-key", &creds, &h.connector).await.unwrap_err();
    assert!(matches!(err, ChannelError::AlreadyOpened));
    assert_eq!(ch.state(), ChannelState::Ready);
}

#[tokio::test]
async fn stats_frame_replaces_snapshot_with_normalized_values() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    h.push("stats", vec![stats_json()]);

    assert_eq!(ch.next_update().await, Update::Snapshot);
    let s = ch.snapshot().expect("snapshot");
    assert_eq!(s.cpu, 12.3);
    assert_eq!(s.disk_gib, 1.0);
    assert_eq!(s.memory_gib, 0.5);
    assert_eq!(s.memory_limit_gib, 1.0);
    assert_eq!(s.rx_bytes, 10);
    assert_eq!(s.tx_bytes, 20);
    assert_eq!(s.state, PowerState::Running);
    assert_eq!(s.uptime_secs, 90061.0);
}

#[tokio::test]
async fn console_lines_read_newest_first() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    for l in ["L1", "L2", "L3"] {
        h.push("console output", vec![l.into()]);
    }
    for _ in 0..3 {
        assert_eq!(ch.next_update().await, Update::Console);
    }
    assert_eq!(ch.console().text(), "L3\nL2\nL1\n");
}

#[tokio::test]
async fn console_drops_oldest_line_when_full() {
    let h = harness();
    let creds = StaticCreds::ok();
    let mut ch: Channel<MockTransport> = Channel::with_options(
        "abc",
        ChannelOptions {
            console_lines: 2,
            ..ChannelOptions::default()
        },
    );
    ch.open("client-key", &creds, &h.connector).await.unwrap();
    for l in ["L1", "L2", "L3"] {
        h.push("console output", vec![l.into()]);
        ch.next_update().await;
    }
    assert_eq!(ch.console().lines().collect::<Vec<_>>(), vec!["L3", "L2"]);
}

#[tokio::test]
async fn token_expiring_resends_auth_and_stays_ready() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    h.push("token expiring", vec![]);

    assert_eq!(ch.next_update().await, Update::Reauthenticated);
    assert_eq!(ch.state(), ChannelState::Ready);
    let auths: Vec<_> = h.sent().into_iter().filter(|e| e.event == "auth").collect();
    assert_eq!(auths.len(), 2);
    assert_eq!(auths[1].args, vec!["tok-1".to_string()]);
}

#[tokio::test]
async fn commands_send_one_set_state_each_once_ready() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    assert!(ch.start().await.unwrap());
    assert!(ch.stop().await.unwrap());
    let sent = h.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1], Envelope::new("set state", vec!["start".into()]));
    assert_eq!(sent[2], Envelope::new("set state", vec!["stop".into()]));
}

#[tokio::test]
async fn unknown_and_malformed_frames_are_skipped() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    h.push("stats", vec![stats_json()]);
    ch.next_update().await;

    h.push("install output", vec!["x".into()]);
    h.tx.send("{not json".into()).unwrap();
    h.push("stats", vec!["{\"cpu_absolute\": \"high\"}".into()]);
    h.push("console output", vec![]);
    for _ in 0..4 {
        assert_eq!(ch.next_update().await, Update::Ignored);
    }

    assert_eq!(ch.state(), ChannelState::Ready);
    assert_eq!(ch.snapshot().map(|s| s.cpu), Some(12.3));
    assert!(ch.console().is_empty());
}

#[tokio::test]
async fn close_is_idempotent_and_closes_transport_once() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    ch.close().await;
    ch.close().await;
    assert_eq!(ch.state(), ChannelState::Closed);
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
    assert!(!ch.start().await.unwrap());
    assert_eq!(h.sent().len(), 1);
}

#[tokio::test]
async fn closing_a_never_opened_channel_is_fine() {
    let mut ch: Channel<MockTransport> = Channel::new("abc");
    ch.close().await;
    assert_eq!(ch.state(), ChannelState::Closed);
}

#[tokio::test]
async fn remote_close_moves_to_closed() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    drop(h.tx);
    assert_eq!(ch.next_update().await, Update::Closed);
    assert_eq!(ch.state(), ChannelState::Closed);
    ch.close().await;
    assert_eq!(h.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn transport_error_closes_the_channel() {
    let h = harness();
    let mut ch = ready_channel(&h).await;
    let frame: Frame = Some(Err(ChannelError::Transport("reset".into())));
    assert_eq!(ch.handle_frame(frame).await, Update::Closed);
    assert_eq!(ch.state(), ChannelState::Closed);
    assert_eq!(h.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn next_frame_waits_forever_without_a_transport() {
    let mut ch: Channel<MockTransport> = Channel::new("abc");
    let waited = tokio::time::timeout(Duration::from_millis(20), ch.next_frame()).await;
    assert!(waited.is_err());
}
