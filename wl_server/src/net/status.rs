//! The status (server list) response document.

use crate::world::World;
use serde::Serialize;

pub const PROTOCOL_VERSION: i32 = 47;

#[derive(Serialize)]
pub struct JsonStatus {
  pub version:     JsonVersion,
  pub players:     JsonPlayers,
  pub description: JsonDescription,
}

#[derive(Serialize)]
pub struct JsonVersion {
  pub name:     String,
  pub protocol: i32,
}

#[derive(Serialize)]
pub struct JsonPlayers {
  pub max:    i32,
  pub online: i32,
  pub sample: Vec<JsonPlayer>,
}

#[derive(Serialize)]
pub struct JsonPlayer {
  pub name: String,
  pub id:   String,
}

#[derive(Serialize)]
pub struct JsonDescription {
  pub text: String,
}

pub fn build(world: &World) -> String {
  let status = JsonStatus {
    version:     JsonVersion { name: "1.8.9".into(), protocol: PROTOCOL_VERSION },
    players:     JsonPlayers {
      max:    world.config().max_players as i32,
      online: world.online_count() as i32,
      sample: vec![],
    },
    description: JsonDescription { text: world.config().motd.clone() },
  };
  serde_json::to_string(&status).unwrap()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::world::{Config, World};
  use pretty_assertions::assert_eq;

  #[test]
  fn document_shape() {
    let world = World::new(Config { motd: "hello".into(), max_players: 7, ..Config::default() });
    let json: serde_json::Value = serde_json::from_str(&build(&world)).unwrap();
    assert_eq!(json["version"]["protocol"], 47);
    assert_eq!(json["players"]["max"], 7);
    assert_eq!(json["players"]["online"], 0);
    assert_eq!(json["description"]["text"], "hello");
    assert!(json["players"]["sample"].as_array().unwrap().is_empty());
  }
}
