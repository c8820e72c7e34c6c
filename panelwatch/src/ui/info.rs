//! Disk, network counters and power state.

use panelwatch::types::{PowerState, Snapshot};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::util::human;

fn state_color(s: &PowerState) -> Color {
    match s {
        PowerState::Running => Color::Green,
        PowerState::Starting | PowerState::Restarting => Color::Yellow,
        PowerState::Stopping => Color::LightRed,
        PowerState::Stopped | PowerState::Offline => Color::Red,
        PowerState::Other(_) => Color::Gray,
    }
}

pub fn draw_info(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let block = Block::default().borders(Borders::ALL).title("Info");
    let Some(s) = s else {
        f.render_widget(Paragraph::new("no stats yet").block(block), area);
        return;
    };
    let line = Line::from(vec![
        Span::raw(format!("Disk: {:.2} GiB   ", s.disk_gib)),
        Span::raw(format!("Network RX: {} bytes ({})   ", s.rx_bytes, human(s.rx_bytes))),
        Span::raw(format!("Network TX: {} bytes ({})   ", s.tx_bytes, human(s.tx_bytes))),
        Span::raw("State: "),
        Span::styled(s.state.as_str().to_string(), Style::default().fg(state_color(&s.state))),
    ]);
    f.render_widget(Paragraph::new(line).block(block), area);
}
