mod chunk_pos;
mod fpos;
mod pos;
mod vec;

pub use chunk_pos::ChunkPos;
pub use fpos::FPos;
pub use pos::{Pos, PosError};
pub use vec::Vec3;
