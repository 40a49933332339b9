//! The command table. The set is fixed: `/gamemode`, `/tp`, `/gamerule`,
//! `/say`, `/help` and `/stop`, plus tab completion over their arguments.
//! User mistakes come back as a red chat line and change nothing.

use crate::{player::Player, world::World};
use std::sync::Arc;
use wl_common::{
  math::FPos,
  util::{chat::Color, Chat, GameMode},
};

struct Command {
  name:    &'static str,
  aliases: &'static [&'static str],
  usage:   &'static str,
}

const COMMANDS: &[Command] = &[
  Command { name: "gamemode", aliases: &["gm"], usage: "/gamemode <s|c|a|sp|0..3> [player]" },
  Command { name: "tp", aliases: &[], usage: "/tp <x y z> or /tp <player>" },
  Command { name: "gamerule", aliases: &[], usage: "/gamerule <rule> [value]" },
  Command { name: "say", aliases: &[], usage: "/say <message>" },
  Command { name: "help", aliases: &[], usage: "/help" },
  Command { name: "stop", aliases: &[], usage: "/stop" },
];

/// Resolves a typed name (or alias) to the canonical command name.
fn resolve(name: &str) -> Option<&'static str> {
  COMMANDS
    .iter()
    .find(|c| c.name == name || c.aliases.contains(&name))
    .map(|c| c.name)
}

fn fail(player: &Arc<Player>, msg: impl Into<String>) {
  let mut out = Chat::empty();
  out.add(msg.into()).color(Color::Red);
  player.send(crate::net::cb::Packet::Chat { msg: out });
}

fn reply(player: &Arc<Player>, msg: impl Into<String>) {
  player.send(crate::net::cb::Packet::Chat { msg: Chat::new(msg.into()) });
}

/// Runs a command. `text` has the leading slash already stripped.
pub fn execute(world: &Arc<World>, player: &Arc<Player>, text: &str) {
  let mut words = text.split_whitespace();
  let name = match words.next() {
    Some(n) => n,
    None => return,
  };
  let args: Vec<&str> = words.collect();
  match resolve(name) {
    Some("gamemode") => gamemode(world, player, &args),
    Some("tp") => tp(world, player, &args),
    Some("gamerule") => gamerule(world, player, &args),
    Some("say") => say(world, player, text),
    Some("help") => help(player),
    Some("stop") => world.stop(),
    _ => fail(player, format!("Unknown command: /{text}")),
  }
}

fn gamemode(world: &Arc<World>, player: &Arc<Player>, args: &[&str]) {
  let mode = match args.first().map(|s| s.parse::<GameMode>()) {
    Some(Ok(m)) => m,
    _ => return fail(player, "Usage: /gamemode <s|c|a|sp|0..3> [player]"),
  };
  let target = match args.get(1) {
    Some(name) => match world.player_by_name(name) {
      Some(p) => p,
      None => return fail(player, format!("No player named {name}")),
    },
    None => player.clone(),
  };
  target.set_game_mode(mode);
  reply(player, format!("Set {}'s game mode to {}", target.username(), mode.as_str()));
}

fn tp(world: &Arc<World>, player: &Arc<Player>, args: &[&str]) {
  match args {
    [x, y, z] => {
      let parsed = (x.parse::<f64>(), y.parse::<f64>(), z.parse::<f64>());
      if let (Ok(x), Ok(y), Ok(z)) = parsed {
        player.teleport(FPos::new(x, y, z));
        reply(player, format!("Teleported to {x} {y} {z}"));
      } else {
        fail(player, "Usage: /tp <x y z> or /tp <player>");
      }
    }
    [name] => match world.player_by_name(name) {
      Some(target) => {
        player.teleport(target.pos());
        reply(player, format!("Teleported to {}", target.username()));
      }
      None => fail(player, format!("No player named {name}")),
    },
    _ => fail(player, "Usage: /tp <x y z> or /tp <player>"),
  }
}

fn gamerule(world: &Arc<World>, player: &Arc<Player>, args: &[&str]) {
  match args {
    [] => reply(player, format!("Gamerules: {}", world.gamerule_keys().join(", "))),
    [key] => match world.gamerule(key) {
      Some(value) => reply(player, format!("{key} = {value}")),
      None => fail(player, format!("No gamerule named {key}")),
    },
    [key, value] => {
      world.set_gamerule(key, value);
      reply(player, format!("Gamerule {key} is now {value}"));
    }
    _ => fail(player, "Usage: /gamerule <rule> [value]"),
  }
}

fn say(world: &Arc<World>, player: &Arc<Player>, text: &str) {
  let msg = text.strip_prefix("say").unwrap_or("").trim();
  if msg.is_empty() {
    return fail(player, "Usage: /say <message>");
  }
  info!("[Server] {msg} (from {})", player.username());
  let mut out = Chat::empty();
  out.add(format!("[Server] {msg}")).color(Color::Pink);
  world.broadcast_chat(out);
}

fn help(player: &Arc<Player>) {
  reply(player, "Commands:");
  for c in COMMANDS {
    reply(player, format!("  {}", c.usage));
  }
}

/// Tab completion. Completes the command name on the first token, and
/// command-specific values afterwards. `text` may still carry its leading
/// slash.
pub fn tab_complete(world: &Arc<World>, text: &str) -> Vec<String> {
  let text = text.strip_prefix('/').unwrap_or(text);
  let parts: Vec<&str> = text.split(' ').collect();

  if parts.len() <= 1 {
    let prefix = parts.first().copied().unwrap_or("");
    let mut out = vec![];
    for c in COMMANDS {
      for name in std::iter::once(&c.name).chain(c.aliases) {
        if name.starts_with(prefix) {
          out.push(format!("/{name}"));
        }
      }
    }
    return out;
  }

  let last = parts.last().copied().unwrap_or("");
  let candidates: Vec<String> = match (resolve(parts[0]), parts.len()) {
    (Some("gamemode"), 2) => {
      ["survival", "creative", "adventure", "spectator"].iter().map(|s| s.to_string()).collect()
    }
    (Some("gamemode"), 3) | (Some("tp"), 2) => {
      world.player_list().iter().map(|p| p.username().to_string()).collect()
    }
    (Some("gamerule"), 2) => world.gamerule_keys(),
    (Some("gamerule"), 3) => match world.gamerule(parts[1]).as_deref() {
      Some("true") | Some("false") => vec!["true".into(), "false".into()],
      _ => vec![],
    },
    _ => vec![],
  };
  candidates.into_iter().filter(|c| c.starts_with(last)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::world::{Config, World};
  use pretty_assertions::assert_eq;

  #[test]
  fn complete_command_names() {
    let world = World::new(Config::default());
    assert_eq!(tab_complete(&world, "/ga"), vec!["/gamemode".to_string(), "/gamerule".to_string()]);
    assert_eq!(tab_complete(&world, "gm"), vec!["/gm".to_string()]);
    assert!(tab_complete(&world, "/zzz").is_empty());
  }

  #[test]
  fn complete_gamemodes() {
    let world = World::new(Config::default());
    assert_eq!(tab_complete(&world, "/gamemode s"), vec![
      "survival".to_string(),
      "spectator".to_string()
    ]);
    assert_eq!(tab_complete(&world, "/gamemode "), vec![
      "survival".to_string(),
      "creative".to_string(),
      "adventure".to_string(),
      "spectator".to_string()
    ]);
  }

  #[test]
  fn complete_gamerules() {
    let world = World::new(Config::default());
    assert_eq!(tab_complete(&world, "/gamerule doM"), vec!["doMobSpawning".to_string()]);
    // Boolean-valued rules complete true/false.
    assert_eq!(tab_complete(&world, "/gamerule keepInventory t"), vec!["true".to_string()]);
    // Unknown rules complete nothing.
    assert!(tab_complete(&world, "/gamerule nope t").is_empty());
  }
}
