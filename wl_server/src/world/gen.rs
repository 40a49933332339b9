//! Terrain generation. The rest of the server only sees this through
//! [`WorldGen::chunk`] and [`WorldGen::height_at`]; the layout in here can
//! change freely without touching the protocol.

use super::chunk::Chunk;
use crate::block;
use noise::{BasicMulti, MultiFractal, NoiseFn, Seedable};
use wl_common::math::{ChunkPos, Pos};

const SEA_LEVEL: i32 = 62;

pub struct WorldGen {
  height: BasicMulti,
}

impl WorldGen {
  pub fn new(seed: i64) -> Self {
    WorldGen { height: BasicMulti::new().set_octaves(4).set_seed(seed as u32) }
  }

  /// The Y of the highest solid block in the given column.
  pub fn height_at(&self, x: i32, z: i32) -> i32 {
    let noise = self.height.get([x as f64 / 128.0, z as f64 / 128.0]);
    SEA_LEVEL + (noise * 20.0) as i32
  }

  /// Generates a fresh chunk column: bedrock floor, stone, a few layers of
  /// dirt, and grass on top.
  pub fn chunk(&self, pos: ChunkPos) -> Chunk {
    let mut c = Chunk::new();
    for x in 0..16 {
      for z in 0..16 {
        let height = self.height_at(pos.block_x() + x, pos.block_z() + z).clamp(1, 255);
        c.set(Pos::new(x, 0, z), block::state(block::BEDROCK, 0));
        for y in 1..=height {
          let id = if y == height {
            2 // grass
          } else if y >= height - 3 {
            3 // dirt
          } else {
            1 // stone
          };
          c.set(Pos::new(x, y, z), block::state(id, 0));
        }
      }
    }
    c
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deterministic() {
    let a = WorldGen::new(1234);
    let b = WorldGen::new(1234);
    for (x, z) in [(0, 0), (100, -100), (-5000, 7)] {
      assert_eq!(a.height_at(x, z), b.height_at(x, z));
    }
  }

  #[test]
  fn chunk_shape() {
    let gen = WorldGen::new(42);
    let c = gen.chunk(ChunkPos::new(0, 0));
    for x in 0..16 {
      for z in 0..16 {
        // Bedrock floor, and a surface somewhere reasonable.
        assert_eq!(c.get(Pos::new(x, 0, z)), block::state(block::BEDROCK, 0));
        let h = c.surface_height(x, z);
        assert!(h > 1 && h < 128, "surface at {h}");
        assert_eq!(c.get(Pos::new(x, h, z)), block::state(2, 0));
        assert_eq!(c.get(Pos::new(x, h + 1, z)), 0);
      }
    }
  }
}
