use panelwatch::{Channel, PanelClient, Update, WsConnector, WsTransport};
use std::time::Duration;

// Integration probe: only runs against a real panel when all of these are set.
// Example: PANELWATCH_PROBE_PANEL=https://panel.example.com PANELWATCH_PROBE_SERVER=1a2b3c4d \
//   PTERODACTYL_CLIENT_KEY=ptlc_... cargo test -p panelwatch --test ws_probe -- --nocapture
#[tokio::test]
async fn probe_live_panel() {
    let vars = (
        std::env::var("PANELWATCH_PROBE_PANEL"),
        std::env::var("PANELWATCH_PROBE_SERVER"),
        std::env::var("PTERODACTYL_CLIENT_KEY"),
    );
    let (panel_url, server, key) = match vars {
        (Ok(p), Ok(s), Ok(k)) if !p.is_empty() && !s.is_empty() && !k.is_empty() => (p, s, k),
        _ => {
            eprintln!(
                "skipping ws_probe: set PANELWATCH_PROBE_PANEL, PANELWATCH_PROBE_SERVER and PTERODACTYL_CLIENT_KEY"
            );
            return;
        }
    };

    let panel = PanelClient::new(&panel_url, None).expect("panel client");
    let connector = WsConnector::new().with_origin(panel.origin());
    let mut ch: Channel<WsTransport> = Channel::connect(server, &key, &panel, &connector)
        .await
        .expect("connect");

    // wings pushes stats roughly every second while the server runs
    let got = tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            match ch.next_update().await {
                Update::Snapshot | Update::Console => return true,
                Update::Closed => return false,
                _ => {}
            }
        }
    })
    .await;
    ch.close().await;
    assert_eq!(got.ok(), Some(true), "expected stats or console output");
}
