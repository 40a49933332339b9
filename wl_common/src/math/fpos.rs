use super::{ChunkPos, Pos, Vec3};
use std::{
  fmt,
  ops::{Add, AddAssign, Sub, SubAssign},
};

/// An entity position. This has doubles for X, Y and Z, unlike [`Pos`], which
/// is aligned to the block grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FPos {
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

impl fmt::Display for FPos {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "FPos({} {} {})", self.x, self.y, self.z)
  }
}

impl Default for FPos {
  fn default() -> Self { FPos::new(0.0, 0.0, 0.0) }
}

impl From<Pos> for FPos {
  fn from(p: Pos) -> Self { FPos { x: p.x.into(), y: p.y.into(), z: p.z.into() } }
}

impl FPos {
  pub const fn new(x: f64, y: f64, z: f64) -> Self { FPos { x, y, z } }
  #[inline(always)]
  pub fn x(&self) -> f64 { self.x }
  #[inline(always)]
  pub fn y(&self) -> f64 { self.y }
  #[inline(always)]
  pub fn z(&self) -> f64 { self.z }
  /// Returns the X value of the position, as a fixed point number. Each block
  /// is 32 units, so this is `x * 32`. This is how entity positions are
  /// encoded on the wire.
  #[inline(always)]
  pub fn fixed_x(&self) -> i32 { (self.x * 32.0) as i32 }
  #[inline(always)]
  pub fn fixed_y(&self) -> i32 { (self.y * 32.0) as i32 }
  #[inline(always)]
  pub fn fixed_z(&self) -> i32 { (self.z * 32.0) as i32 }
  /// Returns the block this position is in.
  pub fn block(&self) -> Pos {
    Pos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
  }
  /// Returns the chunk this position is in.
  pub fn chunk(&self) -> ChunkPos { self.block().chunk() }
  /// Returns the distance to the other position.
  pub fn dist(&self, other: FPos) -> f64 { self.dist_squared(other).sqrt() }
  /// Returns the squared distance to the other position. Avoids a sqrt when
  /// comparing against a fixed radius.
  pub fn dist_squared(&self, other: FPos) -> f64 {
    (self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)
  }
}

impl Add for FPos {
  type Output = Self;
  fn add(self, other: Self) -> Self {
    Self { x: self.x + other.x, y: self.y + other.y, z: self.z + other.z }
  }
}

impl Add<Vec3> for FPos {
  type Output = Self;
  fn add(self, other: Vec3) -> Self {
    Self { x: self.x + other.x, y: self.y + other.y, z: self.z + other.z }
  }
}

impl AddAssign for FPos {
  fn add_assign(&mut self, other: Self) {
    self.x += other.x;
    self.y += other.y;
    self.z += other.z;
  }
}

impl Sub for FPos {
  type Output = Self;
  fn sub(self, other: Self) -> Self {
    Self { x: self.x - other.x, y: self.y - other.y, z: self.z - other.z }
  }
}

impl SubAssign for FPos {
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
  fn fixed_point() {
    assert_eq!(FPos::new(1.5, 64.0, -0.5).fixed_x(), 48);
    assert_eq!(FPos::new(1.5, 64.0, -0.5).fixed_y(), 2048);
    assert_eq!(FPos::new(1.5, 64.0, -0.5).fixed_z(), -16);
  }

  #[test]
  fn blocks() {
    assert_eq!(FPos::new(1.5, 64.9, -0.5).block(), Pos::new(1, 64, -1));
    assert_eq!(FPos::new(-0.1, 0.0, 16.0).chunk(), ChunkPos::new(-1, 1));
  }
}
