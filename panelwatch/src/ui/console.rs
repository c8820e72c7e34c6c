//! Console pane: newest line on top, scrollable with Up/Down/PageUp/PageDown/Home.

use crossterm::event::{KeyCode, KeyEvent};
use panelwatch::console::ConsoleLog;
use ratatui::{
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::ui::util::strip_ansi;

pub fn draw_console(f: &mut ratatui::Frame<'_>, area: Rect, log: &ConsoleLog, scroll: usize) {
    let title = format!("Console ({} lines)", log.len());
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = log
        .lines()
        .skip(scroll)
        .take(visible)
        .map(|l| Line::raw(strip_ansi(l)))
        .collect();
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

pub fn console_handle_key(scroll: &mut usize, key: KeyEvent, page: usize, total: usize) {
    let max = total.saturating_sub(1);
    match key.code {
        KeyCode::Down => *scroll = (*scroll + 1).min(max),
        KeyCode::Up => *scroll = scroll.saturating_sub(1),
        KeyCode::PageDown => *scroll = (*scroll + page.max(1)).min(max),
        KeyCode::PageUp => *scroll = scroll.saturating_sub(page.max(1)),
        KeyCode::Home => *scroll = 0,
        KeyCode::End => *scroll = max,
        _ => {}
    }
}
