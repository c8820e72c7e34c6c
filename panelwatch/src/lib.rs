//! Library surface for panelwatch: the telemetry channel and its collaborators.

pub mod channel;
pub mod console;
pub mod error;
pub mod panel;
pub mod profiles;
pub mod tls;
pub mod types;
pub mod ws;

pub use channel::{Channel, ChannelOptions, ChannelState, Update};
pub use error::{ChannelError, PanelError, TlsError};
pub use panel::{CredentialSource, PanelClient};
pub use ws::{Connector, Transport, WsConnector, WsTransport};
