//! Block states and the per-block rules that are visible on the wire. A
//! block state is a 16 bit word: the high 12 bits are the block id, the low
//! 4 bits are the metadata.

mod place;

pub use place::{face_offset, placement_meta, yaw_to_direction};

pub const AIR: u8 = 0;
pub const BEDROCK: u8 = 7;
pub const CRAFTING_TABLE: u8 = 58;
pub const CROPS: u8 = 59;
pub const DOUBLE_PLANT: u8 = 175;

/// Packs a block id and metadata into a state word.
pub const fn state(id: u8, meta: u8) -> u16 { ((id as u16) << 4) | (meta as u16 & 0x0f) }

/// The block id of a state word.
pub const fn state_id(state: u16) -> u8 { (state >> 4) as u8 }

/// The metadata of a state word.
pub const fn state_meta(state: u16) -> u8 { (state & 0x0f) as u8 }

/// Liquids can be built into; everything else but air cannot.
pub fn is_liquid(id: u8) -> bool { matches!(id, 8 | 9 | 10 | 11) }

/// Whether a placement may overwrite this block.
pub fn is_replaceable(id: u8) -> bool { id == AIR || is_liquid(id) }

/// Whether entities rest on this block. Liquids and air are the only things
/// an item can fall through.
pub fn is_solid(id: u8) -> bool { id != AIR && !is_liquid(id) }

/// Doors occupy two blocks. The upper half has the 0x8 metadata bit set.
pub fn is_door(id: u8) -> bool { matches!(id, 64 | 71 | 193..=197) }

/// Blocks that pair with the block above/below them: doors and double
/// plants.
pub fn is_multi_part(id: u8) -> bool { is_door(id) || id == DOUBLE_PLANT }

/// The item dropped when a block is broken in survival, or -1 for blocks
/// that drop nothing. The returned damage value keeps the variant for blocks
/// like wool.
pub fn block_to_item(state: u16) -> (i16, i16) {
  let id = state_id(state);
  let meta = state_meta(state);
  match id {
    AIR | BEDROCK => (-1, 0),
    // Stone drops cobblestone, grass drops dirt.
    1 => (4, 0),
    2 => (3, 0),
    // Leaves, glass and tall grass break into nothing without the right
    // tool, which the dig packet doesn't tell us about.
    18 | 20 | 31 | 161 => (-1, 0),
    // Crops drop wheat.
    CROPS => (296, 0),
    // The upper half of a door or double plant drops nothing; the lower
    // half is the one that yields the item.
    _ if is_multi_part(id) && meta & 0x08 != 0 => (-1, 0),
    // Doors drop their item form.
    64 => (324, 0),
    71 => (330, 0),
    193 => (427, 0),
    194 => (428, 0),
    195 => (429, 0),
    196 => (430, 0),
    197 => (431, 0),
    // Variant blocks keep their damage value.
    5 | 35 | 159 | 171 | DOUBLE_PLANT => (id as i16, meta as i16),
    17 | 162 => (id as i16, (meta & 3) as i16),
    44 | 126 => (id as i16, (meta & 7) as i16),
    _ => (id as i16, 0),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn state_packing() {
    assert_eq!(state(53, 2), (53 << 4) | 2);
    assert_eq!(state_id((53 << 4) | 2), 53);
    assert_eq!(state_meta((53 << 4) | 2), 2);
  }

  #[test]
  fn replaceable() {
    assert!(is_replaceable(AIR));
    assert!(is_replaceable(8));
    assert!(is_replaceable(11));
    assert!(!is_replaceable(1));
    assert!(!is_replaceable(BEDROCK));
  }

  #[test]
  fn drops() {
    assert_eq!(block_to_item(state(1, 0)), (4, 0));
    assert_eq!(block_to_item(state(2, 0)), (3, 0));
    assert_eq!(block_to_item(state(35, 14)), (35, 14));
    assert_eq!(block_to_item(state(17, 1 | 4)), (17, 1));
    assert_eq!(block_to_item(state(64, 0)), (324, 0));
    // The upper door half drops nothing.
    assert_eq!(block_to_item(state(64, 8)), (-1, 0));
    assert_eq!(block_to_item(state(BEDROCK, 0)), (-1, 0));
  }
}
