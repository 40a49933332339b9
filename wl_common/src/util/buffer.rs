use crate::{
  math::Pos,
  util::{Item, UUID},
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use std::{
  convert::TryFrom,
  error::Error,
  fmt, io,
  io::{Cursor, Read},
  string::FromUtf8Error,
};

pub type Result<T> = std::result::Result<T, BufferError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Reading,
  Writing,
}

use Mode::Reading;

#[derive(Debug)]
pub struct BufferError {
  err:  BufferErrorKind,
  pos:  u64,
  mode: Mode,
}

impl fmt::Display for BufferError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if self.mode == Mode::Reading {
      write!(f, "error while reading from buffer at index {}: {}", self.pos, self.err)
    } else {
      write!(f, "error while writing to buffer at index {}: {}", self.pos, self.err)
    }
  }
}

#[derive(Debug)]
pub enum BufferErrorKind {
  VarInt,
  IO(io::Error),
  FromUtf8Error(FromUtf8Error),
  StringTooLong { len: u64, max: u64 },
  NegativeLen(i32),
}

impl fmt::Display for BufferErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::VarInt => write!(f, "varint is too long"),
      Self::IO(e) => write!(f, "{}", e),
      Self::FromUtf8Error(e) => write!(f, "{}", e),
      Self::StringTooLong { len, max } => {
        write!(f, "string is `{}` characters, longer than max `{}`", len, max)
      }
      Self::NegativeLen(len) => write!(f, "len `{}` is negative", len),
    }
  }
}

impl Error for BufferError {}

impl From<io::Error> for BufferErrorKind {
  fn from(e: io::Error) -> Self { BufferErrorKind::IO(e) }
}
impl From<FromUtf8Error> for BufferErrorKind {
  fn from(e: FromUtf8Error) -> Self { BufferErrorKind::FromUtf8Error(e) }
}

/// A wrapper around a byte buffer, with typed readers and writers for every
/// field type that appears in a packet. Reads return a `Result`; writes go
/// into an in-memory buffer and cannot fail.
#[derive(Debug)]
pub struct Buffer<T> {
  data: Cursor<T>,
}

macro_rules! add_read {
  ($fn: ident, $ty: ty) => {
    pub fn $fn(&mut self) -> Result<$ty> {
      self.data.$fn::<BigEndian>().map_err(|e| self.err(e, Reading))
    }
  };
}
// The same as add_read(), but with no type parameter
macro_rules! add_read_byte {
  ($fn: ident, $ty: ty) => {
    pub fn $fn(&mut self) -> Result<$ty> { self.data.$fn().map_err(|e| self.err(e, Reading)) }
  };
}

macro_rules! add_write {
  ($fn: ident, $ty: ty) => {
    pub fn $fn(&mut self, v: $ty) {
      self.data.$fn::<BigEndian>(v).expect("could not write to buffer")
    }
  };
}
// The same as add_write(), but with no type parameter
macro_rules! add_write_byte {
  ($fn: ident, $ty: ty) => {
    pub fn $fn(&mut self, v: $ty) { self.data.$fn(v).expect("could not write to buffer") }
  };
}

impl<T> Buffer<T> {
  pub fn new(data: T) -> Self { Buffer { data: Cursor::new(data) } }

  pub fn err(&self, e: impl Into<BufferErrorKind>, mode: Mode) -> BufferError {
    BufferError { err: e.into(), pos: self.data.position(), mode }
  }

  pub fn into_inner(self) -> T { self.data.into_inner() }
}

impl<T> Buffer<T>
where
  T: AsRef<[u8]>,
{
  pub fn len(&self) -> usize { self.data.get_ref().as_ref().len() }
  pub fn is_empty(&self) -> bool { self.len() == 0 }
  pub fn index(&self) -> usize { usize::try_from(self.data.position()).unwrap() }
  /// The number of bytes left to read.
  pub fn remaining(&self) -> usize { self.len().saturating_sub(self.index()) }

  pub fn read_bool(&mut self) -> Result<bool> { Ok(self.read_u8()? != 0) }
  add_read_byte!(read_u8, u8);
  add_read!(read_u16, u16);
  add_read!(read_u32, u32);
  add_read!(read_u64, u64);
  add_read_byte!(read_i8, i8);
  add_read!(read_i16, i16);
  add_read!(read_i32, i32);
  add_read!(read_i64, i64);

  add_read!(read_f32, f32);
  add_read!(read_f64, f64);

  /// Reads exactly `len` bytes. A short read is an error, never a truncated
  /// result.
  pub fn read_buf(&mut self, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0; len];
    self.data.read_exact(&mut buf).map_err(|e| self.err(e, Reading))?;
    Ok(buf)
  }

  /// Reads a string. If the length is longer than the given maximum, this will
  /// fail, and return an error.
  pub fn read_str(&mut self, max_len: u64) -> Result<String> {
    let len = self.read_varint()?;
    let len = len.try_into().map_err(|_| self.err(BufferErrorKind::NegativeLen(len), Reading))?;
    if len > max_len * 4 {
      return Err(self.err(BufferErrorKind::StringTooLong { len, max: max_len }, Reading));
    }
    let vec = self.read_buf(len as usize)?;
    match String::from_utf8(vec) {
      Ok(v) => {
        if v.chars().count() > max_len as usize {
          Err(self.err(BufferErrorKind::StringTooLong { len, max: max_len }, Reading))
        } else {
          Ok(v)
        }
      }
      Err(e) => Err(self.err(e, Reading)),
    }
  }

  pub fn read_varint(&mut self) -> Result<i32> {
    let mut res: i32 = 0;
    for i in 0..5 {
      let read = self.read_u8()?;
      if i == 4 && read & 0b10000000 != 0 {
        return Err(self.err(BufferErrorKind::VarInt, Reading));
      }

      let v = read & 0b01111111;
      res |= (v as i32) << (7 * i);

      if read & 0b10000000 == 0 {
        break;
      }
    }
    Ok(res)
  }

  /// Reads a packed block position from an i64.
  pub fn read_pos(&mut self) -> Result<Pos> { Ok(Pos::from_wire(self.read_i64()?)) }

  /// Reads 16 bytes from the buffer, and returns that as a big endian UUID.
  pub fn read_uuid(&mut self) -> Result<UUID> {
    Ok(UUID::from_be_bytes(self.read_buf(16)?.try_into().unwrap()))
  }

  /// Reads an item stack. An id of -1 is the empty slot, and carries no other
  /// fields.
  pub fn read_item(&mut self) -> Result<Item> {
    let id = self.read_i16()?;
    if id < 0 {
      return Ok(Item::empty());
    }
    let count = self.read_u8()?;
    let damage = self.read_i16()?;
    // Trailing nbt length. Items this server hands out never carry nbt.
    let _ = self.read_i16()?;
    Ok(Item::new(id, damage, count))
  }
}

impl<T> Buffer<T>
where
  Cursor<T>: io::Write,
{
  pub fn write_bool(&mut self, v: bool) {
    if v {
      self.write_u8(1);
    } else {
      self.write_u8(0);
    }
  }
  add_write_byte!(write_u8, u8);
  add_write!(write_u16, u16);
  add_write!(write_u32, u32);
  add_write!(write_u64, u64);
  add_write_byte!(write_i8, i8);
  add_write!(write_i16, i16);
  add_write!(write_i32, i32);
  add_write!(write_i64, i64);

  add_write!(write_f32, f32);
  add_write!(write_f64, f64);

  pub fn write_buf(&mut self, v: &[u8]) {
    use io::Write;
    self.data.write_all(v).expect("could not write to buffer");
  }

  pub fn write_varint(&mut self, v: i32) {
    // Need to work with u32, as >> acts differently on i32 vs u32.
    let mut val = v as u32;
    for _ in 0..5 {
      let mut b: u8 = val as u8 & 0b01111111;
      val >>= 7;
      if val != 0 {
        b |= 0b10000000;
      }
      self.write_u8(b);
      if val == 0 {
        break;
      }
    }
  }

  pub fn write_str(&mut self, v: &str) {
    self.write_varint(v.len() as i32);
    self.write_buf(v.as_bytes());
  }

  pub fn write_pos(&mut self, p: Pos) { self.write_i64(p.to_wire()); }

  pub fn write_uuid(&mut self, v: UUID) { self.write_buf(&v.as_be_bytes()); }

  pub fn write_item(&mut self, item: Item) {
    if item.is_empty() {
      self.write_i16(-1);
      return;
    }
    self.write_i16(item.id);
    self.write_u8(item.count);
    self.write_i16(item.damage);
    self.write_i16(-1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn round_trip_fields() {
    let mut buf = Buffer::new(vec![]);
    buf.write_varint(300);
    buf.write_str("hello");
    buf.write_pos(Pos::new(-1, 64, -1));
    buf.write_item(Item::new(3, 0, 2));
    buf.write_item(Item::empty());
    buf.write_bool(true);

    let data = buf.into_inner();
    let mut buf = Buffer::new(&data);
    assert_eq!(buf.read_varint().unwrap(), 300);
    assert_eq!(buf.read_str(64).unwrap(), "hello");
    assert_eq!(buf.read_pos().unwrap(), Pos::new(-1, 64, -1));
    assert_eq!(buf.read_item().unwrap(), Item::new(3, 0, 2));
    assert_eq!(buf.read_item().unwrap(), Item::empty());
    assert!(buf.read_bool().unwrap());
    assert_eq!(buf.remaining(), 0);
  }

  #[test]
  fn short_read_errors() {
    let mut buf = Buffer::new(&[0x00, 0x01][..]);
    assert!(buf.read_i64().is_err());

    // String length runs past the end of the buffer.
    let mut buf = Buffer::new(&[0x05, b'h', b'i'][..]);
    assert!(buf.read_str(64).is_err());
  }

  #[test]
  fn negative_string_len_errors() {
    let mut data = vec![];
    let mut buf = Buffer::new(&mut data);
    buf.write_varint(-1);
    let mut buf = Buffer::new(&data);
    assert!(buf.read_str(64).is_err());
  }

  #[test]
  fn overlong_varint_errors() {
    let mut buf = Buffer::new(&[0xff, 0xff, 0xff, 0xff, 0xff][..]);
    assert!(buf.read_varint().is_err());
  }
}
