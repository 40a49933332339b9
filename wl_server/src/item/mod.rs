//! Item ids and their relationship to blocks. Items below 256 share their id
//! with the block they place; a handful of items above that place a block
//! with a different id (doors).

pub use wl_common::util::Item;

/// Spawn eggs carry the mob type in their damage value.
pub const SPAWN_EGG: i16 = 383;

/// Mob types a spawn egg can produce. Anything outside this range is not a
/// living entity in this protocol version.
pub const MOB_TYPE_RANGE: std::ops::RangeInclusive<i16> = 50..=120;

/// Maps a held item to the block it places. For door items this is the lower
/// door block; for ordinary block items it is the id itself. Items that don't
/// place anything (tools, food) map to `None`.
pub fn item_to_block(id: i16) -> Option<u8> {
  if let Some(door) = door_block(id) {
    return Some(door);
  }
  if id > 0 && id <= 255 {
    Some(id as u8)
  } else {
    None
  }
}

/// The block a door item places, or `None` if the item is not a door.
pub fn door_block(id: i16) -> Option<u8> {
  Some(match id {
    324 => 64,  // oak
    330 => 71,  // iron
    427 => 193, // spruce
    428 => 194, // birch
    429 => 195, // jungle
    430 => 196, // acacia
    431 => 197, // dark oak
    _ => return None,
  })
}

pub fn is_door_item(id: i16) -> bool { door_block(id).is_some() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn door_items() {
    assert_eq!(item_to_block(324), Some(64));
    assert_eq!(item_to_block(431), Some(197));
    assert!(is_door_item(330));
    assert!(!is_door_item(58));
  }

  #[test]
  fn block_items_map_to_themselves() {
    assert_eq!(item_to_block(1), Some(1));
    assert_eq!(item_to_block(58), Some(58));
    // Tools place nothing.
    assert_eq!(item_to_block(278), None);
    assert_eq!(item_to_block(0), None);
    assert_eq!(item_to_block(-1), None);
  }
}
