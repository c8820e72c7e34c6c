//! CPU and RAM gauges.

use panelwatch::types::Snapshot;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
};

use crate::ui::theme::load_color;

pub fn draw_cpu(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let cpu = s.map(|s| s.cpu).unwrap_or(0.0);
    let ratio = (cpu / 100.0).clamp(0.0, 1.0);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("CPU"))
        .gauge_style(Style::default().fg(load_color(ratio)))
        .ratio(ratio)
        .label(format!("{cpu:.1} / 100 %"));
    f.render_widget(g, area);
}

pub fn draw_mem(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let (used, limit, ratio) = match s {
        Some(s) => (s.memory_gib, s.memory_limit_gib, s.memory_ratio()),
        None => (0.0, 0.0, 0.0),
    };
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("RAM"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio)
        .label(format!("{used:.2} / {limit:.2} GiB"));
    f.render_widget(g, area);
}
