use super::ChunkPos;
use std::{
  error::Error,
  fmt,
  ops::{Add, AddAssign, Sub, SubAssign},
};

#[derive(Debug, PartialEq)]
pub struct PosError {
  pub pos: Pos,
  pub msg: String,
}

impl fmt::Display for PosError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "invalid position: {} {}", self.pos, self.msg)
  }
}

impl Error for PosError {}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Pos {
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl Default for Pos {
  fn default() -> Self { Pos::new(0, 0, 0) }
}

impl fmt::Display for Pos {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "Pos({} {} {})", self.x, self.y, self.z)
  }
}

impl Pos {
  /// Creates a new block position. This can be used to find chunk coordinates,
  /// place blocks, or send a position in a packet.
  pub const fn new(x: i32, y: i32, z: i32) -> Self { Pos { x, y, z } }
  /// Converts a packed position from an i64 into a Pos. This is the layout
  /// used on the wire for 1.8: 26 bits of x, 12 bits of y, 26 bits of z, all
  /// sign extended on read.
  pub const fn from_wire(v: i64) -> Self {
    let x = (v >> 38) as i32;
    let y = ((v << 26) >> 52) as i32;
    let z = ((v << 38) >> 38) as i32;
    Pos::new(x, y, z)
  }
  /// Converts the block position into a packed i64, for writing to a packet.
  pub const fn to_wire(self) -> i64 {
    let x = self.x as u64;
    let y = self.y as u64;
    let z = self.z as u64;
    (((x & 0x3ffffff) << 38) | ((y & 0xfff) << 26) | (z & 0x3ffffff)) as i64
  }
  #[inline(always)]
  pub const fn x(&self) -> i32 { self.x }
  #[inline(always)]
  pub const fn y(&self) -> i32 { self.y }
  #[inline(always)]
  pub const fn z(&self) -> i32 { self.z }
  /// Returns self, with y set to self.y plus the given value.
  #[inline(always)]
  #[must_use = "add_y returns a modified version of self"]
  pub fn add_y(mut self, y: i32) -> Self {
    self.y += y;
    self
  }
  /// Returns the chunk this position is in.
  pub const fn chunk(&self) -> ChunkPos { ChunkPos::new(self.chunk_x(), self.chunk_z()) }
  /// Returns this position, relative to the chunk it is in. X and Z will be
  /// in `0..16`.
  #[inline(always)]
  pub const fn chunk_rel_x(&self) -> i32 { (self.x % 16 + 16) % 16 }
  #[inline(always)]
  pub const fn chunk_rel_z(&self) -> i32 { (self.z % 16 + 16) % 16 }
  /// Returns the chunk X of this position. This is `x >> 4`, which correctly
  /// rounds towards negative infinity.
  #[inline(always)]
  pub const fn chunk_x(&self) -> i32 { self.x >> 4 }
  #[inline(always)]
  pub const fn chunk_z(&self) -> i32 { self.z >> 4 }
  /// Returns the center of this block, as a floating point position.
  pub fn center(&self) -> super::FPos {
    super::FPos::new(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z as f64 + 0.5)
  }
  /// Creates a position error with the given message.
  pub fn err(&self, msg: impl Into<String>) -> PosError { PosError { pos: *self, msg: msg.into() } }
}

impl Add for Pos {
  type Output = Self;
  fn add(self, other: Self) -> Self {
    Self { x: self.x + other.x, y: self.y + other.y, z: self.z + other.z }
  }
}

impl AddAssign for Pos {
  fn add_assign(&mut self, other: Self) {
    self.x += other.x;
    self.y += other.y;
    self.z += other.z;
  }
}

impl Sub for Pos {
  type Output = Self;
  fn sub(self, other: Self) -> Self {
    Self { x: self.x - other.x, y: self.y - other.y, z: self.z - other.z }
  }
}

impl SubAssign for Pos {
  fn sub_assign(&mut self, other: Self) {
    self.x -= other.x;
    self.y -= other.y;
    self.z -= other.z;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn wire_round_trip() {
    for pos in [
      Pos::new(0, 0, 0),
      Pos::new(1, 64, 1),
      Pos::new(-1, 255, -1),
      Pos::new(-30000000, 0, 29999999),
      Pos::new(12345678, 200, -12345678),
    ] {
      assert_eq!(Pos::from_wire(pos.to_wire()), pos);
    }
  }

  #[test]
  fn wire_layout() {
    // 26/12/26 bit packing, x in the high bits.
    assert_eq!(Pos::new(1, 0, 0).to_wire(), 1 << 38);
    assert_eq!(Pos::new(0, 1, 0).to_wire(), 1 << 26);
    assert_eq!(Pos::new(0, 0, 1).to_wire(), 1);
  }

  #[test]
  fn chunk_coords() {
    assert_eq!(Pos::new(15, 0, 16).chunk(), ChunkPos::new(0, 1));
    assert_eq!(Pos::new(-1, 0, -16).chunk(), ChunkPos::new(-1, -1));
    assert_eq!(Pos::new(-17, 0, 33).chunk(), ChunkPos::new(-2, 2));
    assert_eq!(Pos::new(-1, 0, -1).chunk_rel_x(), 15);
    assert_eq!(Pos::new(-1, 0, -1).chunk_rel_z(), 15);
  }
}
