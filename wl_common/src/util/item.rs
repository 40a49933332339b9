use std::fmt;

/// An item stack, as stored in an inventory slot and sent over the wire. An
/// id of -1 is the empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
  pub id:     i16,
  pub count:  u8,
  pub damage: i16,
}

impl Default for Item {
  fn default() -> Self { Item::empty() }
}

impl fmt::Display for Item {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if self.is_empty() {
      write!(f, "Item(empty)")
    } else {
      write!(f, "Item({}:{} x{})", self.id, self.damage, self.count)
    }
  }
}

impl Item {
  pub const fn new(id: i16, damage: i16, count: u8) -> Self { Item { id, count, damage } }
  pub const fn empty() -> Self { Item { id: -1, count: 0, damage: 0 } }
  pub fn is_empty(&self) -> bool { self.id < 0 || self.count == 0 }
  /// Whether the other stack can merge into this one. Empty slots accept
  /// anything.
  pub fn stacks_with(&self, other: Item) -> bool {
    self.is_empty() || (self.id == other.id && self.damage == other.damage)
  }
  /// Returns self with the given count. A count of 0 collapses to the empty
  /// slot, so inventories never hold a zero-count stack.
  #[must_use = "with_count returns a modified version of self"]
  pub fn with_count(self, count: u8) -> Self {
    if count == 0 {
      Item::empty()
    } else {
      Item { id: self.id, count, damage: self.damage }
    }
  }
}
