//! Telemetry channel: one authenticated socket per displayed server.
//!
//! Lifecycle is `Unopened -> Connecting -> Ready -> Closed`. Token expiry is
//! handled in place by re-sending `auth` on the same connection, so a ready
//! channel never goes back to connecting. Inbound frames are handled one at a
//! time in arrival order; malformed frames are logged and skipped.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::console::{ConsoleLog, DEFAULT_CONSOLE_LINES};
use crate::error::ChannelError;
use crate::panel::CredentialSource;
use crate::types::{Command, Envelope, Inbound, Snapshot};
use crate::ws::{Connector, Transport, WsTransport};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unopened,
    Connecting,
    Ready,
    Closed,
}

/// What a handled frame changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Snapshot,
    Console,
    Reauthenticated,
    Ignored,
    Closed,
}

/// Raw result of waiting on the transport, fed back into [`Channel::handle_frame`].
pub type Frame = Option<Result<String, ChannelError>>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub console_lines: usize,
    pub connect_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            console_lines: DEFAULT_CONSOLE_LINES,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

pub struct Channel<T: Transport = WsTransport> {
    server_id: String,
    state: ChannelState,
    transport: Option<T>,
    token: Option<String>,
    snapshot: Option<Snapshot>,
    console: ConsoleLog,
    connect_timeout: Duration,
}

impl<T: Transport> Channel<T> {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self::with_options(server_id, ChannelOptions::default())
    }

    pub fn with_options(server_id: impl Into<String>, opts: ChannelOptions) -> Self {
        Self {
            server_id: server_id.into(),
            state: ChannelState::Unopened,
            transport: None,
            token: None,
            snapshot: None,
            console: ConsoleLog::new(opts.console_lines),
            connect_timeout: opts.connect_timeout,
        }
    }

    /// `new` + `open` in one step.
    pub async fn connect<S, C>(
        server_id: impl Into<String>,
        api_key: &str,
        source: &S,
        connector: &C,
    ) -> Result<Self, ChannelError>
    where
        S: CredentialSource + ?Sized,
        C: Connector<Transport = T>,
    {
        let mut ch = Self::new(server_id);
        ch.open(api_key, source, connector).await?;
        Ok(ch)
    }

    /// Fetch credentials, open the transport and authenticate.
    ///
    /// An empty key fails before anything is attempted and leaves the channel
    /// `Unopened`. Any later failure leaves it `Closed`.
    pub async fn open<S, C>(
        &mut self,
        api_key: &str,
        source: &S,
        connector: &C,
    ) -> Result<(), ChannelError>
    where
        S: CredentialSource + ?Sized,
        C: Connector<Transport = T>,
    {
        if self.state != ChannelState::Unopened {
            return Err(ChannelError::AlreadyOpened);
        }
        if api_key.trim().is_empty() {
            return Err(ChannelError::MissingApiKey(self.server_id.clone()));
        }

        self.state = ChannelState::Connecting;
        info!(server = %self.server_id, "connecting");

        let limit = self.connect_timeout;
        let established = tokio::time::timeout(limit, async {
            let cred = source.websocket_credentials(&self.server_id, api_key).await?;
            let transport = connector.open(&cred).await?;
            Ok::<_, ChannelError>((cred, transport))
        })
        .await;

        let (cred, mut transport) = match established {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                self.state = ChannelState::Closed;
                return Err(e);
            }
            Err(_) => {
                self.state = ChannelState::Closed;
                return Err(ChannelError::Timeout(limit));
            }
        };

        if let Err(e) = transport.send_text(Envelope::auth(&cred.token).to_json()).await {
            let _ = transport.close().await;
            self.state = ChannelState::Closed;
            return Err(e);
        }

        self.token = Some(cred.token);
        self.transport = Some(transport);
        self.state = ChannelState::Ready;
        info!(server = %self.server_id, "channel ready");
        Ok(())
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ChannelState::Ready
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    /// Wait for the next raw frame. Cancel-safe; pending forever when no
    /// transport is open so it can sit in a `select!` next to other work.
    pub async fn next_frame(&mut self) -> Frame {
        match self.transport.as_mut() {
            Some(t) if self.state == ChannelState::Ready => t.recv_text().await,
            _ => std::future::pending().await,
        }
    }

    /// Dispatch a frame obtained from [`Channel::next_frame`].
    pub async fn handle_frame(&mut self, frame: Frame) -> Update {
        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(ChannelError::Malformed(e))) => {
                warn!(server = %self.server_id, error = %e, "skipping undecodable frame");
                return Update::Ignored;
            }
            Some(Err(e)) => {
                warn!(server = %self.server_id, error = %e, "transport failed");
                self.shutdown().await;
                return Update::Closed;
            }
            None => {
                info!(server = %self.server_id, "remote closed the connection");
                self.state = ChannelState::Closed;
                self.transport = None;
                return Update::Closed;
            }
        };

        match Inbound::parse(&text) {
            Ok(Inbound::Stats(s)) => {
                self.snapshot = Some(s);
                Update::Snapshot
            }
            Ok(Inbound::ConsoleOutput(line)) => {
                self.console.push(line);
                Update::Console
            }
            Ok(Inbound::TokenExpiring) => self.reauthenticate().await,
            Ok(Inbound::Other(event)) => {
                debug!(server = %self.server_id, %event, "ignoring event");
                Update::Ignored
            }
            Err(e) => {
                warn!(server = %self.server_id, error = %e, "skipping malformed frame");
                Update::Ignored
            }
        }
    }

    /// `next_frame` + `handle_frame`. Not cancel-safe.
    pub async fn next_update(&mut self) -> Update {
        let frame = self.next_frame().await;
        self.handle_frame(frame).await
    }

    async fn reauthenticate(&mut self) -> Update {
        let Some(token) = self.token.clone() else {
            return Update::Ignored;
        };
        debug!(server = %self.server_id, "token expiring, re-sending auth");
        match self.send(Envelope::auth(&token)).await {
            Ok(()) => Update::Reauthenticated,
            Err(_) => Update::Closed,
        }
    }

    /// Ask wings to start the server. Ignored (`Ok(false)`) until ready.
    pub async fn start(&mut self) -> Result<bool, ChannelError> {
        self.command(Command::Start).await
    }

    /// Ask wings to stop the server. Ignored (`Ok(false)`) until ready.
    pub async fn stop(&mut self) -> Result<bool, ChannelError> {
        self.command(Command::Stop).await
    }

    pub async fn command(&mut self, cmd: Command) -> Result<bool, ChannelError> {
        if !self.is_ready() {
            debug!(server = %self.server_id, cmd = cmd.as_str(), "not ready, command dropped");
            return Ok(false);
        }
        self.send(Envelope::set_state(cmd)).await?;
        Ok(true)
    }

    // A failed send closes the channel.
    async fn send(&mut self, env: Envelope) -> Result<(), ChannelError> {
        let Some(t) = self.transport.as_mut() else {
            return Err(ChannelError::Transport("no open transport".into()));
        };
        if let Err(e) = t.send_text(env.to_json()).await {
            warn!(server = %self.server_id, event = %env.event, error = %e, "send failed");
            self.shutdown().await;
            return Err(e);
        }
        Ok(())
    }

    /// Close the transport. Idempotent; never fails.
    pub async fn close(&mut self) {
        if self.state != ChannelState::Closed {
            info!(server = %self.server_id, "closing channel");
        }
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        self.state = ChannelState::Closed;
        if let Some(mut t) = self.transport.take() {
            if let Err(e) = t.close().await {
                debug!(server = %self.server_id, error = %e, "close after failure");
            }
        }
    }
}
