mod app;
mod debug;
mod game;
pub mod net;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};

use baize::{PacketLossSimulation, TableKind};
use game::Bot;
use net::ClientConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableArg {
    Pool,
    Carom,
}

#[derive(Parser)]
#[command(name = "baize-client")]
#[command(about = "Headless billiards client")]
struct Args {
    #[arg(
        short,
        long,
        default_value_t = format!("127.0.0.1:{}", baize::DEFAULT_PORT),
        help = "Server address to connect to"
    )]
    server: String,

    #[arg(short, long, default_value = "player")]
    name: String,

    #[arg(long, help = "Room to join; any open room when omitted")]
    room: Option<u64>,

    #[arg(long, value_enum, default_value_t = TableArg::Pool, help = "Must match the server's table")]
    table: TableArg,

    #[arg(long, help = "Take shots automatically")]
    bot: bool,

    #[arg(long, default_value_t = 600, help = "Bot pause before each move in milliseconds")]
    think_ms: u64,

    #[arg(long, default_value_t = 60)]
    fps: u32,

    #[arg(long, default_value_t = 0.0, help = "Simulated packet loss percentage (0-100)")]
    loss_percent: f32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server_addr: SocketAddr = args
        .server
        .parse()
        .with_context(|| format!("invalid server address {:?}", args.server))?;

    let config = ClientConfig {
        player_name: args.name,
        room_id: args.room,
        table: match args.table {
            TableArg::Pool => TableKind::Pool,
            TableArg::Carom => TableKind::Carom,
        },
        ..Default::default()
    };
    let bot = args.bot.then(|| Bot::new(args.think_ms as f64));

    let mut app = app::App::new(config, server_addr, bot)?;
    if args.loss_percent > 0.0 {
        app.network_mut()
            .set_packet_loss(PacketLossSimulation::with_loss(args.loss_percent));
    }
    app.start()?;

    let frame_time = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));

    while !app.is_finished() {
        let started = Instant::now();
        app.frame()?;
        if let Some(rest) = frame_time.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::info!("Leaving in {:?}", app.mode());
    app.shutdown();
    Ok(())
}
