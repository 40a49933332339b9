//! Serverbound play packets. Parsing takes a decoded frame (id + payload)
//! and produces a typed packet. Ids the dispatch table doesn't cover parse to
//! `None` and are skipped; a stock client sends a handful of those (client
//! settings, transaction confirms) during normal play.

use wl_common::{
  math::Pos,
  util::{Buffer, BufferError, Item},
};

#[derive(Debug, Clone, PartialEq)]
pub enum UseAction {
  Interact,
  Attack,
  InteractAt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DigStatus {
  Start,
  Cancel,
  Finish,
  DropItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
  KeepAlive { id: i32 },
  Chat { msg: String },
  UseEntity { target: i32, action: UseAction },
  PlayerOnGround { on_ground: bool },
  PlayerPos { x: f64, y: f64, z: f64, on_ground: bool },
  PlayerLook { yaw: f32, pitch: f32, on_ground: bool },
  PlayerPosLook { x: f64, y: f64, z: f64, yaw: f32, pitch: f32, on_ground: bool },
  BlockDig { status: DigStatus, pos: Pos, face: u8 },
  BlockPlace { pos: Pos, face: u8, held: Item, cursor: (u8, u8, u8) },
  ChangeHeldItem { slot: i16 },
  Animation,
  EntityAction { action: i32 },
  CloseWindow { wid: u8 },
  ClickWindow { wid: u8, slot: i16, button: i8, mode: i8, clicked: Item },
  TabComplete { text: String },
  PluginMessage { channel: String },
}

impl Packet {
  /// Parses one play-phase frame. Returns `Ok(None)` for ids that are valid
  /// protocol 47 but not part of this server's dispatch table.
  pub fn from_buf(id: i32, buf: &mut Buffer<&[u8]>) -> Result<Option<Self>, BufferError> {
    Ok(Some(match id {
      0x00 => Packet::KeepAlive { id: buf.read_varint()? },
      0x01 => Packet::Chat { msg: buf.read_str(100)? },
      0x02 => {
        let target = buf.read_varint()?;
        let action = match buf.read_varint()? {
          0 => UseAction::Interact,
          1 => UseAction::Attack,
          _ => {
            // Interact-at carries the click offset, which we don't use.
            let _ = buf.read_f32()?;
            let _ = buf.read_f32()?;
            let _ = buf.read_f32()?;
            UseAction::InteractAt
          }
        };
        Packet::UseEntity { target, action }
      }
      0x03 => Packet::PlayerOnGround { on_ground: buf.read_bool()? },
      0x04 => Packet::PlayerPos {
        x:         buf.read_f64()?,
        y:         buf.read_f64()?,
        z:         buf.read_f64()?,
        on_ground: buf.read_bool()?,
      },
      0x05 => Packet::PlayerLook {
        yaw:       buf.read_f32()?,
        pitch:     buf.read_f32()?,
        on_ground: buf.read_bool()?,
      },
      0x06 => Packet::PlayerPosLook {
        x:         buf.read_f64()?,
        y:         buf.read_f64()?,
        z:         buf.read_f64()?,
        yaw:       buf.read_f32()?,
        pitch:     buf.read_f32()?,
        on_ground: buf.read_bool()?,
      },
      0x07 => {
        let status = buf.read_i8()?;
        let pos = buf.read_pos()?;
        let face = buf.read_u8()?;
        let status = match status {
          0 => DigStatus::Start,
          1 => DigStatus::Cancel,
          2 => DigStatus::Finish,
          3 | 4 => DigStatus::DropItem,
          _ => return Ok(None),
        };
        Packet::BlockDig { status, pos, face }
      }
      0x08 => {
        let pos = buf.read_pos()?;
        let face = buf.read_u8()?;
        let held = buf.read_item()?;
        let cursor = (buf.read_u8()?, buf.read_u8()?, buf.read_u8()?);
        Packet::BlockPlace { pos, face, held, cursor }
      }
      0x09 => Packet::ChangeHeldItem { slot: buf.read_i16()? },
      0x0a => Packet::Animation,
      0x0b => {
        let _eid = buf.read_varint()?;
        let action = buf.read_varint()?;
        let _param = buf.read_varint()?;
        Packet::EntityAction { action }
      }
      0x0d => Packet::CloseWindow { wid: buf.read_u8()? },
      0x0e => {
        let wid = buf.read_u8()?;
        let slot = buf.read_i16()?;
        let button = buf.read_i8()?;
        let _action_id = buf.read_i16()?;
        let mode = buf.read_i8()?;
        let clicked = buf.read_item()?;
        Packet::ClickWindow { wid, slot, button, mode, clicked }
      }
      0x14 => {
        let text = buf.read_str(32767)?;
        if buf.read_bool()? {
          let _looking_at = buf.read_i64()?;
        }
        Packet::TabComplete { text }
      }
      0x17 => Packet::PluginMessage { channel: buf.read_str(64)? },
      _ => return Ok(None),
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn parse_pos_look() {
    let mut data = vec![];
    let mut buf = Buffer::new(&mut data);
    buf.write_f64(1.5);
    buf.write_f64(64.0);
    buf.write_f64(-0.5);
    buf.write_f32(90.0);
    buf.write_f32(10.0);
    buf.write_bool(true);

    let mut buf = Buffer::new(&data[..]);
    let p = Packet::from_buf(0x06, &mut buf).unwrap().unwrap();
    assert_eq!(
      p,
      Packet::PlayerPosLook { x: 1.5, y: 64.0, z: -0.5, yaw: 90.0, pitch: 10.0, on_ground: true }
    );
  }

  #[test]
  fn parse_dig() {
    let mut data = vec![];
    let mut buf = Buffer::new(&mut data);
    buf.write_i8(2);
    buf.write_pos(Pos::new(1, 64, 0));
    buf.write_u8(1);

    let mut buf = Buffer::new(&data[..]);
    let p = Packet::from_buf(0x07, &mut buf).unwrap().unwrap();
    assert_eq!(p, Packet::BlockDig { status: DigStatus::Finish, pos: Pos::new(1, 64, 0), face: 1 });
  }

  #[test]
  fn unknown_id_skipped() {
    let mut buf = Buffer::new(&[][..]);
    assert!(Packet::from_buf(0x15, &mut buf).unwrap().is_none());
  }
}
