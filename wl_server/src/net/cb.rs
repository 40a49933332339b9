//! Clientbound packets. Every variant maps to one protocol 47 packet id, and
//! [`Packet::serialize`] produces the id plus payload (the length prefix is
//! added by the connection when the frame is written out).

use wl_common::{
  math::{FPos, Pos, Vec3},
  util::{Buffer, Chat, GameMode, Item, UUID},
};

#[derive(Debug, Clone)]
pub struct PlayerInfo {
  pub uuid:      UUID,
  pub name:      String,
  pub game_mode: GameMode,
  pub ping:      i32,
}

#[derive(Debug, Clone)]
pub enum PlayerListAction {
  Add(Vec<PlayerInfo>),
  UpdateGameMode(Vec<(UUID, GameMode)>),
  Remove(Vec<UUID>),
}

#[derive(Debug, Clone)]
pub enum Packet {
  KeepAlive { id: i32 },
  JoinGame { eid: i32, game_mode: GameMode, max_players: u8 },
  Chat { msg: Chat },
  EntityEquipment { eid: i32, slot: i16, item: Item },
  SpawnPosition { pos: Pos },
  Animation { eid: i32, kind: u8 },
  SpawnPlayer { eid: i32, uuid: UUID, pos: FPos, yaw: f32, pitch: f32, held: i16, flags: u8 },
  SpawnObject { eid: i32, ty: u8, pos: FPos, data: i32, vel: Vec3 },
  SpawnMob { eid: i32, ty: u8, pos: FPos, yaw: f32, pitch: f32, vel: Vec3 },
  EntityVelocity { eid: i32, vel: Vec3 },
  DestroyEntities { eids: Vec<i32> },
  EntityLook { eid: i32, yaw: f32, pitch: f32, on_ground: bool },
  EntityTeleport { eid: i32, pos: FPos, yaw: f32, pitch: f32, on_ground: bool },
  EntityHeadLook { eid: i32, yaw: f32 },
  EntityStatus { eid: i32, status: i8 },
  EntityFlags { eid: i32, flags: u8 },
  EntityItemMetadata { eid: i32, item: Item },
  ChunkData { x: i32, z: i32, bit_mask: u16, data: Vec<u8> },
  BlockChange { pos: Pos, state: u16 },
  Effect { effect: i32, pos: Pos, data: i32 },
  ChangeGameState { reason: u8, value: f32 },
  OpenWindow { wid: u8, kind: String, title: Chat, slots: u8 },
  SetSlot { wid: i8, slot: i16, item: Item },
  WindowItems { wid: u8, items: Vec<Item> },
  SetPosLook { pos: FPos, yaw: f32, pitch: f32 },
  PlayerList { action: PlayerListAction },
  PlayerAbilities { invulnerable: bool, flying: bool, allow_flying: bool, instant_break: bool },
  TabComplete { matches: Vec<String> },
  Disconnect { reason: Chat },
}

/// Converts an angle in degrees to the single byte the wire uses (1/256ths of
/// a full turn).
fn angle(v: f32) -> u8 { (v * 256.0 / 360.0) as i32 as u8 }

impl Packet {
  pub fn id(&self) -> i32 {
    match self {
      Packet::KeepAlive { .. } => 0x00,
      Packet::JoinGame { .. } => 0x01,
      Packet::Chat { .. } => 0x02,
      Packet::EntityEquipment { .. } => 0x04,
      Packet::SpawnPosition { .. } => 0x05,
      Packet::SetPosLook { .. } => 0x08,
      Packet::Animation { .. } => 0x0b,
      Packet::SpawnPlayer { .. } => 0x0c,
      Packet::SpawnObject { .. } => 0x0e,
      Packet::SpawnMob { .. } => 0x0f,
      Packet::EntityVelocity { .. } => 0x12,
      Packet::DestroyEntities { .. } => 0x13,
      Packet::EntityLook { .. } => 0x16,
      Packet::EntityTeleport { .. } => 0x18,
      Packet::EntityHeadLook { .. } => 0x19,
      Packet::EntityStatus { .. } => 0x1a,
      Packet::EntityFlags { .. } | Packet::EntityItemMetadata { .. } => 0x1c,
      Packet::ChunkData { .. } => 0x21,
      Packet::BlockChange { .. } => 0x23,
      Packet::Effect { .. } => 0x28,
      Packet::ChangeGameState { .. } => 0x2b,
      Packet::OpenWindow { .. } => 0x2d,
      Packet::SetSlot { .. } => 0x2f,
      Packet::WindowItems { .. } => 0x30,
      Packet::PlayerList { .. } => 0x38,
      Packet::PlayerAbilities { .. } => 0x39,
      Packet::TabComplete { .. } => 0x3a,
      Packet::Disconnect { .. } => 0x40,
    }
  }

  /// Serializes the packet id and payload into a fresh buffer.
  pub fn serialize(&self) -> Vec<u8> {
    let mut data = vec![];
    let mut buf = Buffer::new(&mut data);
    buf.write_varint(self.id());
    match self {
      Packet::KeepAlive { id } => buf.write_varint(*id),
      Packet::JoinGame { eid, game_mode, max_players } => {
        buf.write_i32(*eid);
        buf.write_u8(game_mode.id());
        buf.write_i8(0); // dimension (overworld)
        buf.write_u8(1); // difficulty
        buf.write_u8(*max_players);
        buf.write_str("default");
        buf.write_bool(false); // reduced debug info
      }
      Packet::Chat { msg } => {
        buf.write_str(&msg.to_json());
        buf.write_i8(0); // chat box
      }
      Packet::EntityEquipment { eid, slot, item } => {
        buf.write_varint(*eid);
        buf.write_i16(*slot);
        buf.write_item(*item);
      }
      Packet::SpawnPosition { pos } => buf.write_pos(*pos),
      Packet::SetPosLook { pos, yaw, pitch } => {
        buf.write_f64(pos.x);
        buf.write_f64(pos.y);
        buf.write_f64(pos.z);
        buf.write_f32(*yaw);
        buf.write_f32(*pitch);
        buf.write_i8(0); // all fields absolute
      }
      Packet::Animation { eid, kind } => {
        buf.write_varint(*eid);
        buf.write_u8(*kind);
      }
      Packet::SpawnPlayer { eid, uuid, pos, yaw, pitch, held, flags } => {
        buf.write_varint(*eid);
        buf.write_uuid(*uuid);
        buf.write_i32(pos.fixed_x());
        buf.write_i32(pos.fixed_y());
        buf.write_i32(pos.fixed_z());
        buf.write_u8(angle(*yaw));
        buf.write_u8(angle(*pitch));
        buf.write_i16(*held);
        // Metadata: status flags, then the terminator.
        buf.write_u8(0);
        buf.write_u8(*flags);
        buf.write_u8(0x7f);
      }
      Packet::SpawnObject { eid, ty, pos, data, vel } => {
        buf.write_varint(*eid);
        buf.write_u8(*ty);
        buf.write_i32(pos.fixed_x());
        buf.write_i32(pos.fixed_y());
        buf.write_i32(pos.fixed_z());
        buf.write_u8(0); // pitch
        buf.write_u8(0); // yaw
        buf.write_i32(*data);
        if *data != 0 {
          buf.write_i16(vel.fixed_x());
          buf.write_i16(vel.fixed_y());
          buf.write_i16(vel.fixed_z());
        }
      }
      Packet::SpawnMob { eid, ty, pos, yaw, pitch, vel } => {
        buf.write_varint(*eid);
        buf.write_u8(*ty);
        buf.write_i32(pos.fixed_x());
        buf.write_i32(pos.fixed_y());
        buf.write_i32(pos.fixed_z());
        buf.write_u8(angle(*yaw));
        buf.write_u8(angle(*pitch));
        buf.write_u8(angle(*yaw)); // head pitch
        buf.write_i16(vel.fixed_x());
        buf.write_i16(vel.fixed_y());
        buf.write_i16(vel.fixed_z());
        // Metadata: no flags set, then the terminator.
        buf.write_u8(0);
        buf.write_u8(0);
        buf.write_u8(0x7f);
      }
      Packet::EntityVelocity { eid, vel } => {
        buf.write_varint(*eid);
        buf.write_i16(vel.fixed_x());
        buf.write_i16(vel.fixed_y());
        buf.write_i16(vel.fixed_z());
      }
      Packet::DestroyEntities { eids } => {
        buf.write_varint(eids.len() as i32);
        for eid in eids {
          buf.write_varint(*eid);
        }
      }
      Packet::EntityLook { eid, yaw, pitch, on_ground } => {
        buf.write_varint(*eid);
        buf.write_u8(angle(*yaw));
        buf.write_u8(angle(*pitch));
        buf.write_bool(*on_ground);
      }
      Packet::EntityTeleport { eid, pos, yaw, pitch, on_ground } => {
        buf.write_varint(*eid);
        buf.write_i32(pos.fixed_x());
        buf.write_i32(pos.fixed_y());
        buf.write_i32(pos.fixed_z());
        buf.write_u8(angle(*yaw));
        buf.write_u8(angle(*pitch));
        buf.write_bool(*on_ground);
      }
      Packet::EntityHeadLook { eid, yaw } => {
        buf.write_varint(*eid);
        buf.write_u8(angle(*yaw));
      }
      Packet::EntityStatus { eid, status } => {
        buf.write_i32(*eid);
        buf.write_i8(*status);
      }
      Packet::EntityFlags { eid, flags } => {
        buf.write_varint(*eid);
        buf.write_u8(0);
        buf.write_u8(*flags);
        buf.write_u8(0x7f);
      }
      Packet::EntityItemMetadata { eid, item } => {
        buf.write_varint(*eid);
        // The item stack lives at metadata index 10, as a slot (type 5).
        buf.write_u8((5 << 5) | 10);
        buf.write_item(*item);
        buf.write_u8(0x7f);
      }
      Packet::ChunkData { x, z, bit_mask, data } => {
        buf.write_i32(*x);
        buf.write_i32(*z);
        buf.write_bool(true); // ground-up continuous
        buf.write_u16(*bit_mask);
        buf.write_varint(data.len() as i32);
        buf.write_buf(data);
      }
      Packet::BlockChange { pos, state } => {
        buf.write_pos(*pos);
        buf.write_varint(*state as i32);
      }
      Packet::Effect { effect, pos, data } => {
        buf.write_i32(*effect);
        buf.write_pos(*pos);
        buf.write_i32(*data);
        buf.write_bool(false);
      }
      Packet::ChangeGameState { reason, value } => {
        buf.write_u8(*reason);
        buf.write_f32(*value);
      }
      Packet::OpenWindow { wid, kind, title, slots } => {
        buf.write_u8(*wid);
        buf.write_str(kind);
        buf.write_str(&title.to_json());
        buf.write_u8(*slots);
      }
      Packet::SetSlot { wid, slot, item } => {
        buf.write_i8(*wid);
        buf.write_i16(*slot);
        buf.write_item(*item);
      }
      Packet::WindowItems { wid, items } => {
        buf.write_u8(*wid);
        buf.write_i16(items.len() as i16);
        for it in items {
          buf.write_item(*it);
        }
      }
      Packet::PlayerList { action } => match action {
        PlayerListAction::Add(infos) => {
          buf.write_varint(0);
          buf.write_varint(infos.len() as i32);
          for info in infos {
            buf.write_uuid(info.uuid);
            buf.write_str(&info.name);
            buf.write_varint(0); // no properties
            buf.write_varint(info.game_mode.id() as i32);
            buf.write_varint(info.ping);
            buf.write_bool(false); // no display name
          }
        }
        PlayerListAction::UpdateGameMode(entries) => {
          buf.write_varint(1);
          buf.write_varint(entries.len() as i32);
          for (uuid, mode) in entries {
            buf.write_uuid(*uuid);
            buf.write_varint(mode.id() as i32);
          }
        }
        PlayerListAction::Remove(uuids) => {
          buf.write_varint(4);
          buf.write_varint(uuids.len() as i32);
          for uuid in uuids {
            buf.write_uuid(*uuid);
          }
        }
      },
      Packet::PlayerAbilities { invulnerable, flying, allow_flying, instant_break } => {
        let mut flags = 0;
        if *invulnerable {
          flags |= 0x01;
        }
        if *flying {
          flags |= 0x02;
        }
        if *allow_flying {
          flags |= 0x04;
        }
        if *instant_break {
          flags |= 0x08;
        }
        buf.write_i8(flags);
        buf.write_f32(0.05); // flying speed
        buf.write_f32(0.1); // walking speed
      }
      Packet::TabComplete { matches } => {
        buf.write_varint(matches.len() as i32);
        for m in matches {
          buf.write_str(m);
        }
      }
      Packet::Disconnect { reason } => buf.write_str(&reason.to_json()),
    }
    data
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn keep_alive_layout() {
    assert_eq!(Packet::KeepAlive { id: 0 }.serialize(), vec![0x00, 0x00]);
    assert_eq!(Packet::KeepAlive { id: 300 }.serialize(), vec![0x00, 0xac, 0x02]);
  }

  #[test]
  fn block_change_layout() {
    let p = Packet::BlockChange { pos: Pos::new(0, 0, 1), state: (53 << 4) | 2 };
    let data = p.serialize();
    assert_eq!(data[0], 0x23);
    // Packed position, then the state varint.
    assert_eq!(&data[1..9], &1i64.to_be_bytes());
    let mut buf = Buffer::new(&data[9..]);
    assert_eq!(buf.read_varint().unwrap(), (53 << 4) | 2);
  }

  #[test]
  fn angles_wrap() {
    assert_eq!(angle(0.0), 0);
    assert_eq!(angle(90.0), 64);
    assert_eq!(angle(-90.0), 192);
    assert_eq!(angle(360.0), 0);
  }
}
