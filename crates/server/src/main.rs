mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use baize::{CushionModel, PacketLossSimulation, RoomSettings, TableKind, rules};
use config::ServerConfig;
use events::ServerEvent;
use server::GameServer;
use tui::TuiState;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CushionArg {
    Han,
    HanBlend,
    Simple,
}

impl From<CushionArg> for CushionModel {
    fn from(arg: CushionArg) -> Self {
        match arg {
            CushionArg::Han => CushionModel::Han,
            CushionArg::HanBlend => CushionModel::HanBlend,
            CushionArg::Simple => CushionModel::Simple,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableArg {
    Pool,
    Carom,
}

#[derive(Parser)]
#[command(name = "baize-server")]
#[command(about = "Authoritative billiards server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = baize::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 64)]
    max_clients: usize,

    #[arg(long, default_value_t = 32)]
    max_rooms: usize,

    #[arg(long, default_value = "practice", help = "Rule set: practice, eightball or nineball")]
    rules: String,

    #[arg(long, value_enum, default_value_t = TableArg::Pool)]
    table: TableArg,

    #[arg(long, value_enum, default_value_t = CushionArg::Han)]
    cushion: CushionArg,

    #[arg(long, default_value_t = 2, help = "Players per room (1 for solo practice)")]
    seats: u8,

    #[arg(long, default_value_t = 60, help = "Seconds a dropped player has to return")]
    reconnect_secs: u64,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Enable global packet loss simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    if rules::rules_by_name(&args.rules).is_none() {
        bail!("unknown rule set {:?}", args.rules);
    }
    if !(1..=2).contains(&args.seats) {
        bail!("seats must be 1 or 2");
    }

    let global_packet_loss = args
        .simulate_packet_loss
        .then(|| PacketLossSimulation::with_loss(args.loss_percent));

    let room = RoomSettings {
        rules: args.rules,
        table: match args.table {
            TableArg::Pool => TableKind::Pool,
            TableArg::Carom => TableKind::Carom,
        },
        cushion_model: args.cushion.into(),
        seats: args.seats,
        reconnect_window: Duration::from_secs(args.reconnect_secs),
        ..Default::default()
    };

    let config = ServerConfig {
        max_clients: args.max_clients,
        max_rooms: args.max_rooms,
        room,
        global_packet_loss,
        ..Default::default()
    };

    let mut server = GameServer::new(&bind_addr, config)?;

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!("Server started on {}", server.local_addr());
        run_headless(&mut server);
        log::info!("Server shutting down");
    } else {
        run_with_tui(&mut server)?;
    }

    Ok(())
}

fn run_headless(server: &mut GameServer) {
    let running = server.running();
    while running.load(Ordering::SeqCst) {
        server.tick_once();
        for event in server.drain_events() {
            log_event(&event);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    server.shutdown_connections();
}

fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::ClientConnecting { addr } => format!("Connection request from {}", addr),
        ServerEvent::ClientConnected { client_id, addr } => {
            format!("Client {} connected from {}", client_id, addr)
        }
        ServerEvent::ClientDisconnected { client_id, reason } => {
            format!("Client {} {}", client_id, reason.as_str())
        }
        ServerEvent::ConnectionDenied { addr, reason } => {
            format!("Connection denied to {}: {}", addr, reason)
        }
        ServerEvent::PlayerJoined {
            client_id,
            room_id,
            slot,
            name,
        } => format!(
            "Client {} ({}) seated in room {} slot {}",
            client_id, name, room_id, slot
        ),
        ServerEvent::Rejected { client_id, reason } => {
            format!("Rejected request from client {}: {}", client_id, reason)
        }
        ServerEvent::RoomClosed { room_id } => format!("Room {} closed", room_id),
        ServerEvent::Error { message } => message.clone(),
    }
}

fn log_event(event: &ServerEvent) {
    let text = describe(event);
    match event {
        ServerEvent::Error { .. } => log::error!("{text}"),
        ServerEvent::ConnectionDenied { .. } | ServerEvent::Rejected { .. } => log::warn!("{text}"),
        ServerEvent::ClientConnecting { .. } => log::debug!("{text}"),
        _ => log::info!("{text}"),
    }
}

fn run_with_tui(server: &mut GameServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();

    tui_state.log_info(format!("Server started on {}", server.local_addr()));

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            let text = describe(&event);
            match event {
                ServerEvent::Error { .. } => tui_state.log_error(text),
                ServerEvent::ConnectionDenied { .. } | ServerEvent::Rejected { .. } => {
                    tui_state.log_warn(text)
                }
                _ => tui_state.log_info(text),
            }
        }

        if let Some(client_id) = tui_state.take_pending_kick() {
            server.kick_client(client_id);
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let clients = server.client_infos();
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Tab => tui_state.next_tab(),
                        KeyCode::BackTab => tui_state.prev_tab(),
                        KeyCode::PageUp => tui_state.scroll_up(),
                        KeyCode::PageDown => tui_state.scroll_down(),
                        KeyCode::End => tui_state.scroll_to_bottom(),
                        KeyCode::Up => {
                            if tui_state.active_tab() == tui::Tab::Connections {
                                tui_state.select_prev_connection(clients.len());
                            }
                        }
                        KeyCode::Down => {
                            if tui_state.active_tab() == tui::Tab::Connections {
                                tui_state.select_next_connection(clients.len());
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if tui_state.active_tab() == tui::Tab::Connections {
                                tui_state.request_kick(&clients);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let stats = server.stats();
        let rooms = server.room_infos();
        let clients = server.client_infos();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats, &rooms, &clients);
        })?;
    }

    tui_state.log_info("Shutting down...");
    server.shutdown_connections();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
