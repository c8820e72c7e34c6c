//! Entry point for panelwatch. Parses args, resolves the panel profile, and
//! runs either the live dashboard or one of the admin listings.

mod app;
mod listing;
mod ui;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use app::App;
use panelwatch::{
    channel::DEFAULT_CONNECT_TIMEOUT,
    console::DEFAULT_CONSOLE_LINES,
    profiles::{
        apply_direct, config_dir, load_profiles, save_profiles, ProfileEntry, ProfileRequest,
        ResolveProfile, SaveAction,
    },
    tls::CaBundle,
    ChannelOptions, PanelClient, WsConnector,
};

#[derive(Parser, Debug)]
#[command(name = "panelwatch", version)]
#[command(about = "Live console and resource monitor for game-panel servers")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Open the live dashboard for one server
    Watch(WatchArgs),
    /// List all servers (admin API key)
    Servers(AdminArgs),
    /// List all users (admin API key)
    Users(AdminArgs),
}

#[derive(Args, Debug, Clone)]
struct PanelArgs {
    /// Panel base URL, e.g. https://panel.example.com
    #[arg(long = "panel", env = "PTERODACTYL_URL")]
    panel_url: Option<String>,

    /// PEM bundle trusted for the panel and its nodes
    #[arg(short = 't', long = "tls-ca", env = "PANELWATCH_TLS_CA")]
    tls_ca: Option<String>,

    /// Named profile holding the panel URL and CA path
    #[arg(short = 'P', long)]
    profile: Option<String>,

    /// Overwrite an existing profile without asking
    #[arg(long)]
    save: bool,

    /// Resolve and persist settings, print them, and exit
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Server identifier (short id or uuid)
    server_id: String,

    #[command(flatten)]
    panel: PanelArgs,

    /// Client API key of the user watching the server
    #[arg(long, env = "PTERODACTYL_CLIENT_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Console lines kept in memory (oldest dropped first)
    #[arg(long, default_value_t = DEFAULT_CONSOLE_LINES)]
    console_lines: usize,

    /// Seconds allowed for fetching credentials and opening the socket
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    connect_timeout: u64,
}

#[derive(Args, Debug)]
struct AdminArgs {
    #[command(flatten)]
    panel: PanelArgs,

    /// Application (admin) API key
    #[arg(long, env = "PTERODACTYL_API_KEY", hide_env_values = true, default_value = "")]
    admin_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Cmd::Watch(args) => watch(args).await,
        Cmd::Servers(args) => {
            init_logging(false);
            let Some((panel, _)) = panel_client(&args.panel)? else {
                return Ok(());
            };
            let servers = panel.list_servers(&args.admin_key).await?;
            print!("{}", listing::servers_table(&servers));
            Ok(())
        }
        Cmd::Users(args) => {
            init_logging(false);
            let Some((panel, _)) = panel_client(&args.panel)? else {
                return Ok(());
            };
            let users = panel.list_users(&args.admin_key).await?;
            print!("{}", listing::users_table(&users));
            Ok(())
        }
    }
}

async fn watch(args: WatchArgs) -> anyhow::Result<()> {
    if args.panel.dry_run {
        println!("server: {}", args.server_id);
    }
    let Some((panel, ca)) = panel_client(&args.panel)? else {
        return Ok(());
    };
    init_logging(true);

    let mut connector = WsConnector::new().with_origin(panel.origin());
    if let Some(ca) = ca.as_ref() {
        connector = connector.with_tls(ca.client_config()?);
    }
    let opts = ChannelOptions {
        console_lines: args.console_lines,
        connect_timeout: Duration::from_secs(args.connect_timeout),
    };
    let mut app = App::new(args.server_id, opts);
    app.run(&args.api_key, &panel, &connector).await
}

/// Resolve profile + flags into a panel client. `None` means the user aborted
/// or this is a dry run, which prints the resolved settings instead.
fn panel_client(args: &PanelArgs) -> anyhow::Result<Option<(PanelClient, Option<CaBundle>)>> {
    let Some((url, tls_ca)) = resolve_panel(args)? else {
        return Ok(None);
    };
    if args.dry_run {
        println!("panel: {url}");
        println!("tls_ca: {}", tls_ca.as_deref().unwrap_or("-"));
        return Ok(None);
    }
    let ca = tls_ca
        .as_deref()
        .map(CaBundle::load)
        .transpose()
        .context("loading CA bundle")?;
    let panel = PanelClient::new(&url, ca.as_ref())?;
    Ok(Some((panel, ca)))
}

fn resolve_panel(args: &PanelArgs) -> anyhow::Result<Option<(String, Option<String>)>> {
    let mut profiles = load_profiles();
    let req = ProfileRequest {
        profile_name: args.profile.clone(),
        panel_url: args.panel_url.clone(),
        tls_ca: args.tls_ca.clone(),
    };

    match req.resolve(&profiles) {
        ResolveProfile::Direct(url, tls_ca) => {
            if let Some(name) = args.profile.as_ref() {
                let entry = ProfileEntry {
                    panel_url: url.clone(),
                    tls_ca: tls_ca.clone(),
                };
                match apply_direct(&mut profiles, name, entry.clone(), args.save) {
                    SaveAction::Created | SaveAction::Overwrite => save_profiles(&profiles)?,
                    SaveAction::Unchanged => {}
                    SaveAction::NeedsConfirm => {
                        if prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: ")) {
                            apply_direct(&mut profiles, name, entry, true);
                            save_profiles(&profiles)?;
                        }
                    }
                }
            }
            Ok(Some((url, tls_ca)))
        }
        ResolveProfile::Loaded(url, tls_ca) => Ok(Some((url, tls_ca))),
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let Some(name) = line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| idx.checked_sub(1))
                .and_then(|idx| names.get(idx))
            else {
                return Ok(None);
            };
            Ok(profiles
                .profiles
                .get(name)
                .map(|e| (e.panel_url.clone(), e.tls_ca.clone())))
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter panel URL (https://...): ")?;
            if url.trim().is_empty() {
                return Ok(None);
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let ca_opt = Some(ca.trim().to_string()).filter(|c| !c.is_empty());
            profiles.profiles.insert(
                name,
                ProfileEntry {
                    panel_url: url.trim().to_string(),
                    tls_ca: ca_opt.clone(),
                },
            );
            save_profiles(&profiles)?;
            Ok(Some((url.trim().to_string(), ca_opt)))
        }
        ResolveProfile::None => {
            bail!("No panel URL provided (use --panel or PTERODACTYL_URL) and no profiles to select.")
        }
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    match prompt_string(prompt) {
        Ok(line) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// The dashboard owns the terminal, so it logs to a file instead of stderr.
fn init_logging(to_file: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("panelwatch=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if to_file {
        let dir = config_dir();
        let file = std::fs::create_dir_all(&dir).and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("panelwatch.log"))
        });
        // No log file: stay silent rather than scribble over the TUI
        if let Ok(f) = file {
            let _ = builder.with_ansi(false).with_writer(Mutex::new(f)).try_init();
        }
    } else {
        let _ = builder.with_writer(io::stderr).try_init();
    }
}
