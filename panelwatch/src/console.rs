//! Bounded console log: newest line first, oldest line dropped when full.

use std::collections::VecDeque;

pub const DEFAULT_CONSOLE_LINES: usize = 1000;

pub fn push_front_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if cap == 0 {
        return;
    }
    if dq.len() == cap {
        dq.pop_back();
    }
    dq.push_front(v);
}

#[derive(Debug, Clone)]
pub struct ConsoleLog {
    lines: VecDeque<String>,
    cap: usize,
}

impl ConsoleLog {
    pub fn new(cap: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(cap.min(DEFAULT_CONSOLE_LINES)),
            cap,
        }
    }

    pub fn push(&mut self, line: String) {
        push_front_capped(&mut self.lines, line, self.cap);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    // Newest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The log as one string, each line followed by a line break.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for l in &self.lines {
            out.push_str(l);
            out.push('\n');
        }
        out
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_LINES)
    }
}
