//! Top header with server id, power state, uptime and key hints.

use chrono::{DateTime, Local};
use panelwatch::{types::Snapshot, ChannelState};
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    server_id: &str,
    state: ChannelState,
    snap: Option<&Snapshot>,
    last_update: Option<DateTime<Local>>,
    notice: Option<&str>,
) {
    let body = match (state, snap) {
        (ChannelState::Closed, _) => "disconnected (press 'r' to retry)".to_string(),
        (ChannelState::Unopened | ChannelState::Connecting, _) => "connecting...".to_string(),
        (ChannelState::Ready, None) => "waiting for stats...".to_string(),
        (ChannelState::Ready, Some(s)) => {
            let (d, h, m) = s.uptime_dhm();
            let at = last_update
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into());
            format!("{} | up {d}d {h}h {m}min | updated {at}", s.state)
        }
    };
    let mut title = format!("panelwatch | server: {server_id} | {body}");
    if let Some(n) = notice {
        title.push_str(&format!(" | {n}"));
    }
    title.push_str("  (s start, x stop, q quit)");
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}
