#[macro_use]
extern crate log;

use clap::Parser;
use std::{process, thread};
use wl_common::util::GameMode;
use wl_server::{
  net::ConnectionManager,
  world::{Config, World},
};

#[derive(Parser, Debug)]
#[clap(about, version, author)]
struct Args {
  /// The address to listen on. A bare `:port` listens on every interface.
  #[clap(long, default_value = ":25565")]
  addr:          String,
  /// The message shown in the server list.
  #[clap(long, default_value = "A willow server")]
  motd:          String,
  /// How many players may be online at once.
  #[clap(long, default_value_t = 20)]
  max_players:   u32,
  /// The terrain seed. The world regenerates from it on every start.
  #[clap(long, default_value_t = 0)]
  seed:          i64,
  /// The game mode new players join in: s, c, a or sp.
  #[clap(long, default_value = "s")]
  gamemode:      String,
  /// The view distance, in chunks.
  #[clap(long, default_value_t = 8)]
  view_distance: u32,
}

fn main() {
  let args = Args::parse();
  wl_common::init();

  let game_mode = match args.gamemode.parse::<GameMode>() {
    Ok(m) => m,
    Err(e) => {
      error!("{e}");
      process::exit(1);
    }
  };

  let addr_str =
    if args.addr.starts_with(':') { format!("0.0.0.0{}", args.addr) } else { args.addr.clone() };
  let addr = match addr_str.parse() {
    Ok(v) => v,
    Err(e) => {
      error!("invalid address `{}`: {e}", args.addr);
      process::exit(1);
    }
  };

  let world = World::new(Config {
    motd: args.motd,
    max_players: args.max_players,
    view_distance: args.view_distance,
    game_mode,
    seed: args.seed,
  });
  world.stop_on_ctrlc();

  let w = world.clone();
  thread::spawn(|| w.run());

  let mut conn = ConnectionManager::new(world);
  info!("listening on {}", addr);
  match conn.run(addr) {
    Ok(()) => info!("server stopped"),
    Err(e) => {
      error!("error in connection: {e}");
      process::exit(1);
    }
  }
}
