pub mod chat;

pub use chat::Chat;

mod buffer;
mod item;

use crate::math::Pos;
use std::{error::Error, fmt, num::ParseIntError, str::FromStr};

pub use buffer::{Buffer, BufferError, BufferErrorKind, Mode};
pub use item::Item;

/// Writes a varint into a new buffer. This is used when the length of a
/// packet needs to be prepended to its body.
pub fn serialize_varint(v: i32) -> Vec<u8> {
  // Need to work with u32, as >> acts differently on i32 vs u32.
  let mut val = v as u32;
  let mut out = vec![];
  for _ in 0..5 {
    let mut b: u8 = val as u8 & 0b01111111;
    val >>= 7;
    if val != 0 {
      b |= 0b10000000;
    }
    out.push(b);
    if val == 0 {
      break;
    }
  }
  out
}

/// Reads a varint from the buffer. Returns the value and the number of bytes
/// read. If the number of bytes read is 0, the varint was incomplete. If it
/// is -1, the varint was more than 5 bytes.
pub fn read_varint(buf: &[u8]) -> (i32, isize) {
  let mut res: i32 = 0;
  let mut total_read: isize = 0;
  for i in 0..5 {
    if i >= buf.len() {
      // Incomplete varint
      return (0, 0);
    }
    let read = buf[i];
    if i == 4 && read & 0b10000000 != 0 {
      // Invalid varint (read < 0 means invalid varint)
      return (0, -1);
    }

    let v = read & 0b01111111;
    res |= (v as i32) << (7 * i);

    if read & 0b10000000 == 0 {
      // Done reading bytes, so we set total read
      total_read = i as isize + 1;
      break;
    }
  }
  (res, total_read)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GameMode {
  Survival,
  Creative,
  Adventure,
  Spectator,
}

impl Default for GameMode {
  fn default() -> Self { GameMode::Survival }
}

impl GameMode {
  pub fn id(&self) -> u8 {
    match self {
      Self::Survival => 0,
      Self::Creative => 1,
      Self::Adventure => 2,
      Self::Spectator => 3,
    }
  }

  pub fn from_id(id: u8) -> Self {
    match id {
      0 => Self::Survival,
      1 => Self::Creative,
      2 => Self::Adventure,
      3 => Self::Spectator,
      _ => panic!("invalid gamemode: {}", id),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Survival => "survival",
      Self::Creative => "creative",
      Self::Adventure => "adventure",
      Self::Spectator => "spectator",
    }
  }
}

#[derive(Debug)]
pub struct InvalidGameMode(String);

impl fmt::Display for InvalidGameMode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "invalid game mode: {}", self.0)
  }
}

impl Error for InvalidGameMode {}

impl FromStr for GameMode {
  type Err = InvalidGameMode;

  /// Accepts the full names, the one or two letter abbreviations used by
  /// commands, and the numeric ids.
  fn from_str(s: &str) -> Result<Self, InvalidGameMode> {
    Ok(match s {
      "survival" | "s" | "0" => GameMode::Survival,
      "creative" | "c" | "1" => GameMode::Creative,
      "adventure" | "a" | "2" => GameMode::Adventure,
      "spectator" | "sp" | "3" => GameMode::Spectator,
      _ => return Err(InvalidGameMode(s.into())),
    })
  }
}

/// A block face. The wire encoding is the byte in block placement and digging
/// packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
  Bottom,
  Top,
  North,
  South,
  West,
  East,
}

impl Default for Face {
  fn default() -> Self { Face::Bottom }
}

impl Face {
  pub fn id(&self) -> u8 {
    match self {
      Self::Bottom => 0,
      Self::Top => 1,
      Self::North => 2,
      Self::South => 3,
      Self::West => 4,
      Self::East => 5,
    }
  }

  /// Parses a block face from a placement packet. Clients send 255 for "no
  /// face" on use-item packets, which (along with anything else out of range)
  /// maps to `None`.
  pub fn from_id(id: u8) -> Option<Face> {
    Some(match id {
      0 => Self::Bottom,
      1 => Self::Top,
      2 => Self::North,
      3 => Self::South,
      4 => Self::West,
      5 => Self::East,
      _ => return None,
    })
  }

  /// Returns a unit position pointing out of this face. The result is
  /// intended to be added to a block position, to offset it by one block.
  pub const fn as_dir(&self) -> Pos {
    match self {
      Self::Bottom => Pos::new(0, -1, 0),
      Self::Top => Pos::new(0, 1, 0),
      Self::North => Pos::new(0, 0, -1),
      Self::South => Pos::new(0, 0, 1),
      Self::West => Pos::new(-1, 0, 0),
      Self::East => Pos::new(1, 0, 0),
    }
  }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct UUID(u128);

impl Default for UUID {
  fn default() -> UUID { UUID::from_u128(0) }
}

#[derive(Debug)]
pub enum UUIDParseError {
  Int(ParseIntError),
  Length(usize),
}

impl fmt::Display for UUIDParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "error while parsing uuid: {}",
      match self {
        Self::Int(e) => format!("int parsing error: {}", e),
        Self::Length(len) => format!("invalid length: {}", len),
      }
    )
  }
}

impl Error for UUIDParseError {}

impl UUID {
  /// Derives the uuid for an offline-mode player. This is the md5 of
  /// `OfflinePlayer:<name>`, with the version nibble forced to 3 and the
  /// variant bits forced to the RFC 4122 value. The same name always maps to
  /// the same uuid, so a returning player keeps their identity.
  pub fn offline(name: &str) -> Self {
    let mut bytes = *md5::compute(format!("OfflinePlayer:{name}"));
    bytes[6] = (bytes[6] & 0x0f) | 0x30;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    UUID::from_be_bytes(bytes)
  }
  pub fn from_be_bytes(v: [u8; 16]) -> Self { UUID(u128::from_be_bytes(v)) }
  pub fn from_u128(v: u128) -> Self { UUID(v) }
  /// Returns the uuid represented as a hex string, with no dashes or other
  /// characters.
  pub fn as_str(&self) -> String { format!("{:032x}", self.0) }
  /// Returns the uuid represented as a string with dashes. This is the form
  /// login success and the status sample use.
  pub fn as_dashed_str(&self) -> String {
    format!(
      "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
      //          11111111222233334444555555555555
      (self.0 & 0xffffffff000000000000000000000000) >> (24 * 4), // 4 bits per digit
      (self.0 & 0x00000000ffff00000000000000000000) >> (20 * 4),
      (self.0 & 0x000000000000ffff0000000000000000) >> (16 * 4),
      (self.0 & 0x0000000000000000ffff000000000000) >> (12 * 4),
      (self.0 & 0x00000000000000000000ffffffffffff),
    )
  }
  pub fn as_u128(&self) -> u128 { self.0 }
  /// Returns the big-endian representation of the underlying `u128`. This is
  /// the byte order used in packets.
  pub fn as_be_bytes(&self) -> [u8; 16] { self.0.to_be_bytes() }
}

impl FromStr for UUID {
  type Err = UUIDParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.len() != 32 {
      return Err(UUIDParseError::Length(s.len()));
    }
    match u128::from_str_radix(s, 16) {
      Ok(v) => Ok(Self::from_u128(v)),
      Err(e) => Err(UUIDParseError::Int(e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn uuid_dashed_str() {
    let uuid = UUID::from_u128(0x11111111222233334444555555555555);
    assert_eq!(uuid.as_dashed_str(), "11111111-2222-3333-4444-555555555555");
    // Leading zeros must not be dropped, or the client will reject the login.
    let uuid = UUID::from_u128(0x01111111022233330444055555555555);
    assert_eq!(uuid.as_dashed_str(), "01111111-0222-3333-0444-055555555555");
  }

  #[test]
  fn offline_uuid() {
    let uuid = UUID::offline("TestPlayer");
    // Deterministic.
    assert_eq!(uuid, UUID::offline("TestPlayer"));
    assert_ne!(uuid, UUID::offline("OtherPlayer"));
    let bytes = uuid.as_be_bytes();
    // Version 3 (md5 name-based).
    assert_eq!(bytes[6] >> 4, 3);
    // RFC 4122 variant.
    assert_eq!(bytes[8] & 0xc0, 0x80);
  }

  #[test]
  fn varints() {
    assert_eq!(serialize_varint(0), vec![0]);
    assert_eq!(serialize_varint(127), vec![0x7f]);
    assert_eq!(serialize_varint(128), vec![0x80, 0x01]);
    assert_eq!(serialize_varint(300), vec![0xac, 0x02]);
    assert_eq!(serialize_varint(-1), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);

    assert_eq!(read_varint(&[0]), (0, 1));
    assert_eq!(read_varint(&[0xac, 0x02]), (300, 2));
    assert_eq!(read_varint(&[0xff, 0xff, 0xff, 0xff, 0x0f]), (-1, 5));
    // Incomplete
    assert_eq!(read_varint(&[0x80]), (0, 0));
    // Too long
    assert_eq!(read_varint(&[0xff, 0xff, 0xff, 0xff, 0xff]), (0, -1));
  }

  #[test]
  fn game_mode_parse() {
    assert_eq!("s".parse::<GameMode>().unwrap(), GameMode::Survival);
    assert_eq!("sp".parse::<GameMode>().unwrap(), GameMode::Spectator);
    assert_eq!("1".parse::<GameMode>().unwrap(), GameMode::Creative);
    assert_eq!("adventure".parse::<GameMode>().unwrap(), GameMode::Adventure);
    assert!("x".parse::<GameMode>().is_err());
  }
}
