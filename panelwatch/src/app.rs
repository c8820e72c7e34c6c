//! App state and main loop: input handling, channel frames, and drawing.

use std::{
    io::{self, Stdout},
    time::Duration,
};

use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::time::sleep;
use tracing::warn;

use panelwatch::{
    types::Command, Channel, ChannelOptions, ChannelState, PanelClient, Update, WsConnector,
    WsTransport,
};

use crate::ui::{
    console::{console_handle_key, draw_console},
    gauges::{draw_cpu, draw_mem},
    header::draw_header,
    info::draw_info,
};

// Upper bound on input latency while no frames arrive
const TICK: Duration = Duration::from_millis(100);

type Tui = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> anyhow::Result<Tui> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

/// Run `setup`; on failure call `restore` before handing the error back.
fn or_restore<T>(
    setup: impl FnOnce() -> anyhow::Result<T>,
    restore: impl FnOnce(),
) -> anyhow::Result<T> {
    let res = setup();
    if res.is_err() {
        restore();
    }
    res
}

enum Action {
    None,
    Quit,
    Power(Command),
    Retry,
}

pub struct App {
    server_id: String,
    opts: ChannelOptions,
    channel: Channel<WsTransport>,
    last_update: Option<DateTime<Local>>,
    notice: Option<String>,
    console_scroll: usize,
    console_page: usize,
}

impl App {
    pub fn new(server_id: impl Into<String>, opts: ChannelOptions) -> Self {
        let server_id = server_id.into();
        Self {
            channel: Channel::with_options(server_id.clone(), opts.clone()),
            server_id,
            opts,
            last_update: None,
            notice: None,
            console_scroll: 0,
            console_page: 10,
        }
    }

    pub async fn run(
        &mut self,
        api_key: &str,
        panel: &PanelClient,
        connector: &WsConnector,
    ) -> anyhow::Result<()> {
        // Connect before taking over the terminal so errors print normally
        self.channel.open(api_key, panel, connector).await?;

        let res = self.run_tui(api_key, panel, connector).await;

        // Release the socket on every exit path
        self.channel.close().await;
        res
    }

    async fn run_tui(
        &mut self,
        api_key: &str,
        panel: &PanelClient,
        connector: &WsConnector,
    ) -> anyhow::Result<()> {
        // Terminal setup; a failure past raw mode puts the terminal back
        enable_raw_mode()?;
        let mut terminal = or_restore(setup_terminal, || {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = disable_raw_mode();
        })?;

        // Main loop
        let res = self.event_loop(&mut terminal, api_key, panel, connector).await;

        // Teardown
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        api_key: &str,
        panel: &PanelClient,
        connector: &WsConnector,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::ZERO)? {
                let action = match event::read()? {
                    Event::Key(k) if k.kind == KeyEventKind::Press => self.handle_key(k),
                    _ => Action::None,
                };
                match action {
                    Action::Quit => return Ok(()),
                    Action::Power(cmd) => self.power(cmd).await,
                    Action::Retry => self.reconnect(api_key, panel, connector).await,
                    Action::None => {}
                }
            }

            terminal.draw(|f| self.draw(f))?;

            // Only the wait is raced; dispatch runs to completion outside the select
            let frame = tokio::select! {
                frame = self.channel.next_frame() => Some(frame),
                _ = sleep(TICK) => None,
            };
            if let Some(frame) = frame {
                match self.channel.handle_frame(frame).await {
                    Update::Snapshot => self.last_update = Some(Local::now()),
                    Update::Closed => self.notice = None,
                    Update::Console | Update::Reauthenticated | Update::Ignored => {}
                }
            }
        }
    }

    fn handle_key(&mut self, k: crossterm::event::KeyEvent) -> Action {
        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('s') => Action::Power(Command::Start),
            KeyCode::Char('x') => Action::Power(Command::Stop),
            KeyCode::Char('r') if self.channel.state() == ChannelState::Closed => Action::Retry,
            _ => {
                console_handle_key(
                    &mut self.console_scroll,
                    k,
                    self.console_page,
                    self.channel.console().len(),
                );
                Action::None
            }
        }
    }

    async fn power(&mut self, cmd: Command) {
        match self.channel.command(cmd).await {
            Ok(true) => self.notice = Some(format!("sent {}", cmd.as_str())),
            // Not ready yet: the buttons are inert, same as while loading
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "power command failed");
                self.notice = Some(format!("{} failed: {e}", cmd.as_str()));
            }
        }
    }

    // Manual retry only: a fresh channel replaces the closed one.
    async fn reconnect(&mut self, api_key: &str, panel: &PanelClient, connector: &WsConnector) {
        self.channel = Channel::with_options(self.server_id.clone(), self.opts.clone());
        self.last_update = None;
        self.console_scroll = 0;
        self.notice = match self.channel.open(api_key, panel, connector).await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "reconnect failed");
                Some(format!("retry failed: {e}"))
            }
        };
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, gauges, info, console
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(3), // cpu + ram
                Constraint::Length(3), // disk / net / state
                Constraint::Min(5),    // console
            ])
            .split(area);

        let snap = self.channel.snapshot();
        draw_header(
            f,
            rows[0],
            &self.server_id,
            self.channel.state(),
            snap,
            self.last_update,
            self.notice.as_deref(),
        );

        let gauges = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        draw_cpu(f, gauges[0], snap);
        draw_mem(f, gauges[1], snap);

        draw_info(f, rows[2], snap);

        // Cache page size for PageUp/PageDown
        self.console_page = rows[3].height.saturating_sub(2).max(1) as usize;
        draw_console(f, rows[3], self.channel.console(), self.console_scroll);
    }
}
