//! Plain-text tables for the admin server and user listings.

use panelwatch::types::{ServerInfo, UserInfo};

use crate::ui::util::truncate_middle;

const MAX_CELL: usize = 40;

fn render(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect();
        let mut s = padded.join("  ").trim_end().to_string();
        s.push('\n');
        s
    };

    let mut out = line(header.iter().map(|h| h.to_string()).collect());
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

pub fn servers_table(servers: &[ServerInfo]) -> String {
    let rows = servers
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.identifier.clone(),
                truncate_middle(&s.name, MAX_CELL),
                s.node.to_string(),
                if s.suspended { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    render(&["ID", "IDENTIFIER", "NAME", "NODE", "SUSPENDED"], rows)
}

pub fn users_table(users: &[UserInfo]) -> String {
    let rows = users
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                truncate_middle(&u.username, MAX_CELL),
                truncate_middle(&u.email, MAX_CELL),
                if u.root_admin { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    render(&["ID", "USERNAME", "EMAIL", "ADMIN"], rows)
}
