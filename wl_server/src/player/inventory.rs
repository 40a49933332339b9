//! The player inventory. 45 slots: 0 is the crafting result, 1-4 the 2x2
//! grid, 5-8 armor, 9-35 main storage, 36-44 the hotbar. A crafting table
//! adds a second window with its own 3x3 grid and output slot.

use wl_common::util::Item;

pub const INV_SIZE: usize = 45;
pub const HOTBAR_START: usize = 36;
pub const MAIN_START: usize = 9;
/// Stacks never grow beyond this, whatever the item.
pub const MAX_STACK: u8 = 64;

/// The id of the crafting table window. Window 0 is the player's own
/// inventory.
pub const CRAFTING_WID: u8 = 1;

pub struct PlayerInventory {
  slots:  [Item; INV_SIZE],
  active: u8,

  /// What the client thinks is on its cursor. Kept in sync by mirroring the
  /// vanilla click rules; a mismatch triggers a full window rebuild.
  carried: Item,

  /// Crafting table state: slot 0 is the output, 1-9 the grid.
  grid:        [Item; 10],
  open_window: Option<u8>,

  /// Slots collected during a paint-drag (mode 5).
  drag_slots: Vec<usize>,
}

impl Default for PlayerInventory {
  fn default() -> Self { PlayerInventory::new() }
}

impl PlayerInventory {
  pub fn new() -> Self {
    PlayerInventory {
      slots:       [Item::empty(); INV_SIZE],
      active:      0,
      carried:     Item::empty(),
      grid:        [Item::empty(); 10],
      open_window: None,
      drag_slots:  vec![],
    }
  }

  pub fn slot(&self, idx: usize) -> Item { self.slots[idx] }
  pub fn set_slot(&mut self, idx: usize, item: Item) { self.slots[idx] = item; }

  /// A copy of every slot, for all-or-nothing operations.
  pub(crate) fn snapshot(&self) -> [Item; INV_SIZE] { self.slots }
  pub(crate) fn restore(&mut self, slots: [Item; INV_SIZE]) { self.slots = slots; }

  pub fn active_index(&self) -> u8 { self.active }
  pub fn set_active_index(&mut self, idx: u8) { self.active = idx.min(8); }

  /// The hotbar slot the player is holding.
  pub fn held_slot(&self) -> usize { HOTBAR_START + self.active as usize }
  pub fn held_item(&self) -> Item { self.slots[self.held_slot()] }
  pub fn set_held_item(&mut self, item: Item) {
    let slot = self.held_slot();
    self.slots[slot] = item;
  }

  pub fn open_window(&self) -> Option<u8> { self.open_window }

  /// Opens the crafting table window, with a cleared grid.
  pub fn open_crafting(&mut self) {
    self.grid = [Item::empty(); 10];
    self.open_window = Some(CRAFTING_WID);
  }

  /// Closes whatever window is open. Returns the stacks that were sitting in
  /// the crafting grid and on the cursor; they go back to the inventory.
  pub fn close_window(&mut self) -> Vec<Item> {
    let mut ret = vec![];
    for it in self.grid.iter_mut().skip(1) {
      if !it.is_empty() {
        ret.push(std::mem::replace(it, Item::empty()));
      }
    }
    // The 2x2 grid in the player inventory behaves the same way.
    for idx in 1..=4 {
      if !self.slots[idx].is_empty() {
        ret.push(std::mem::replace(&mut self.slots[idx], Item::empty()));
      }
    }
    if !self.carried.is_empty() {
      ret.push(std::mem::replace(&mut self.carried, Item::empty()));
    }
    self.open_window = None;
    self.drag_slots.clear();
    ret
  }

  /// Routes a picked up or crafted stack into the inventory: stack onto
  /// matching slots (hotbar first, then main storage), then fill the first
  /// empty slot in the same order. Returns the slots that changed, the
  /// destination first, and the count that found no home.
  pub fn add_item(&mut self, item: Item) -> (Vec<usize>, u8) {
    let mut changed = vec![];
    let mut remaining = item.count;
    let order: Vec<usize> = (HOTBAR_START..INV_SIZE).chain(MAIN_START..HOTBAR_START).collect();

    for &i in &order {
      if remaining == 0 {
        break;
      }
      let s = self.slots[i];
      if !s.is_empty() && s.id == item.id && s.damage == item.damage && s.count < MAX_STACK {
        let take = remaining.min(MAX_STACK - s.count);
        self.slots[i].count += take;
        remaining -= take;
        changed.push(i);
      }
    }
    for &i in &order {
      if remaining == 0 {
        break;
      }
      if self.slots[i].is_empty() {
        self.slots[i] = Item::new(item.id, item.damage, remaining);
        remaining = 0;
        changed.push(i);
      }
    }
    (changed, remaining)
  }

  /// The slot vector for a window items packet. Window 1 prepends the
  /// crafting table slots to the main storage and hotbar.
  pub fn window_items(&self, wid: u8) -> Vec<Item> {
    match wid {
      CRAFTING_WID => {
        let mut out: Vec<Item> = self.grid.to_vec();
        out.extend_from_slice(&self.slots[MAIN_START..INV_SIZE]);
        out
      }
      _ => self.slots.to_vec(),
    }
  }

  /// Maps a window-view slot index to the backing storage.
  fn win_get(&self, wid: u8, idx: usize) -> Item {
    match self.win_map(wid, idx) {
      WinSlot::Inv(i) => self.slots[i],
      WinSlot::Grid(i) => self.grid[i],
      WinSlot::Invalid => Item::empty(),
    }
  }

  fn win_set(&mut self, wid: u8, idx: usize, item: Item) {
    match self.win_map(wid, idx) {
      WinSlot::Inv(i) => self.slots[i] = item,
      WinSlot::Grid(i) => self.grid[i] = item,
      WinSlot::Invalid => {}
    }
  }

  fn win_map(&self, wid: u8, idx: usize) -> WinSlot {
    match wid {
      CRAFTING_WID => match idx {
        0..=9 => WinSlot::Grid(idx),
        10..=36 => WinSlot::Inv(idx - 10 + MAIN_START),
        37..=45 => WinSlot::Inv(idx - 37 + HOTBAR_START),
        _ => WinSlot::Invalid,
      },
      0 => {
        if idx < INV_SIZE {
          WinSlot::Inv(idx)
        } else {
          WinSlot::Invalid
        }
      }
      _ => WinSlot::Invalid,
    }
  }

  /// Applies a click window packet. `clicked` is what the client believes
  /// the slot held; if that doesn't match our state, nothing is applied and
  /// the caller must rebuild the window. Returns `true` when a rebuild is
  /// needed.
  pub fn click_window(&mut self, wid: u8, slot: i16, button: i8, mode: i8, clicked: Item) -> bool {
    if slot < 0 {
      if mode == 5 {
        return self.handle_drag(wid, slot, button);
      }
      // Clicking outside the window (slot -999) would drop the carried
      // stack. We keep it server side, so resync if one was carried.
      return !self.carried.is_empty();
    }
    let idx = slot as usize;
    if matches!(self.win_map(wid, idx), WinSlot::Invalid) {
      return true;
    }
    if mode == 5 {
      return self.handle_drag(wid, slot, button);
    }
    // Validate the client's view of the slot before mutating anything.
    if self.win_get(wid, idx) != clicked && mode != 2 {
      return true;
    }
    match mode {
      0 => self.handle_click(wid, idx, button),
      1 => self.handle_shift_click(wid, idx),
      2 => self.handle_hotbar_swap(wid, idx, button),
      _ => true,
    }
  }

  /// Mode 0: pick up / put down / split / merge with the cursor.
  fn handle_click(&mut self, wid: u8, idx: usize, button: i8) -> bool {
    let slot = self.win_get(wid, idx);
    let carried = self.carried;
    let (new_slot, new_carried) = if button == 0 {
      if carried.is_empty() {
        (Item::empty(), slot)
      } else if slot.stacks_with(carried) {
        let total = slot.count.saturating_add(carried.count);
        let kept = total.min(MAX_STACK);
        (carried.with_count(kept), carried.with_count(total - kept))
      } else {
        (carried, slot)
      }
    } else if carried.is_empty() {
      // Right click picks up the larger half.
      let take = slot.count - slot.count / 2;
      (slot.with_count(slot.count - take), slot.with_count(take))
    } else if slot.stacks_with(carried) && slot.count < MAX_STACK {
      // Right click places one.
      (Item::new(carried.id, carried.damage, slot.count + 1), carried.with_count(carried.count - 1))
    } else {
      (slot, carried)
    };
    self.win_set(wid, idx, new_slot);
    self.carried = new_carried;
    false
  }

  /// Mode 1: quick-move between the hotbar and main storage.
  fn handle_shift_click(&mut self, wid: u8, idx: usize) -> bool {
    let item = self.win_get(wid, idx);
    if item.is_empty() {
      return false;
    }
    let target = match self.win_map(wid, idx) {
      WinSlot::Inv(i) if (HOTBAR_START..INV_SIZE).contains(&i) => {
        MAIN_START..HOTBAR_START
      }
      _ => HOTBAR_START..INV_SIZE,
    };
    let mut remaining = item.count;
    // Stack first, then first empty slot.
    for i in target.clone() {
      if remaining == 0 {
        break;
      }
      let s = self.slots[i];
      if !s.is_empty() && s.stacks_with(item) && s.count < MAX_STACK {
        let take = remaining.min(MAX_STACK - s.count);
        self.slots[i].count += take;
        remaining -= take;
      }
    }
    for i in target {
      if remaining == 0 {
        break;
      }
      if self.slots[i].is_empty() {
        self.slots[i] = item.with_count(remaining);
        remaining = 0;
      }
    }
    self.win_set(wid, idx, item.with_count(remaining));
    false
  }

  /// Mode 2: swap the clicked slot with a hotbar slot.
  fn handle_hotbar_swap(&mut self, wid: u8, idx: usize, button: i8) -> bool {
    if !(0..9).contains(&button) {
      return true;
    }
    let hotbar = HOTBAR_START + button as usize;
    let a = self.win_get(wid, idx);
    let b = self.slots[hotbar];
    self.win_set(wid, idx, b);
    // The clicked slot might itself be the hotbar slot.
    if self.win_map(wid, idx) != WinSlot::Inv(hotbar) {
      self.slots[hotbar] = a;
    }
    false
  }

  /// Mode 5: paint-drag a carried stack across slots.
  fn handle_drag(&mut self, wid: u8, slot: i16, button: i8) -> bool {
    match button {
      // Start (left or right).
      0 | 4 => {
        self.drag_slots.clear();
        false
      }
      // Add a slot.
      1 | 5 => {
        if slot >= 0 && !matches!(self.win_map(wid, slot as usize), WinSlot::Invalid) {
          self.drag_slots.push(slot as usize);
        }
        false
      }
      // End: distribute the carried stack.
      2 | 6 => {
        let targets = std::mem::take(&mut self.drag_slots);
        let carried = self.carried;
        if carried.is_empty() || targets.is_empty() {
          return false;
        }
        let per_slot = if button == 2 {
          (carried.count as usize / targets.len()).max(1) as u8
        } else {
          1
        };
        let mut remaining = carried.count;
        for idx in targets {
          if remaining == 0 {
            break;
          }
          let s = self.win_get(wid, idx);
          if !s.stacks_with(carried) || s.count >= MAX_STACK {
            continue;
          }
          let take = per_slot.min(remaining).min(MAX_STACK - s.count);
          self.win_set(wid, idx, Item::new(carried.id, carried.damage, s.count + take));
          remaining -= take;
        }
        self.carried = carried.with_count(remaining);
        false
      }
      _ => true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WinSlot {
  Inv(usize),
  Grid(usize),
  Invalid,
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn add_item_routing() {
    let mut inv = PlayerInventory::new();
    // Three inserts of the same item stack in the first hotbar slot.
    assert_eq!(inv.add_item(Item::new(3, 0, 1)), (vec![36], 0));
    assert_eq!(inv.add_item(Item::new(3, 0, 1)), (vec![36], 0));
    assert_eq!(inv.slot(36), Item::new(3, 0, 2));
    assert_eq!(inv.add_item(Item::new(3, 0, 1)), (vec![36], 0));
    assert_eq!(inv.slot(36), Item::new(3, 0, 3));
    // A different id takes the next hotbar slot.
    assert_eq!(inv.add_item(Item::new(4, 0, 1)), (vec![37], 0));
  }

  #[test]
  fn add_item_caps_at_64() {
    let mut inv = PlayerInventory::new();
    inv.set_slot(36, Item::new(3, 0, 63));
    assert_eq!(inv.add_item(Item::new(3, 0, 1)), (vec![36], 0));
    assert_eq!(inv.slot(36).count, 64);
    // The stack is full now, so the next insert opens a new slot.
    assert_eq!(inv.add_item(Item::new(3, 0, 1)), (vec![37], 0));
  }

  #[test]
  fn add_item_full_inventory_fails() {
    let mut inv = PlayerInventory::new();
    for i in MAIN_START..INV_SIZE {
      inv.set_slot(i, Item::new(1, 0, 64));
    }
    let (changed, leftover) = inv.add_item(Item::new(3, 0, 1));
    assert!(changed.is_empty());
    assert_eq!(leftover, 1);
  }

  #[test]
  fn add_item_splits_across_stacks() {
    let mut inv = PlayerInventory::new();
    inv.set_slot(36, Item::new(3, 0, 60));
    let (changed, leftover) = inv.add_item(Item::new(3, 0, 10));
    assert_eq!(changed, vec![36, 37]);
    assert_eq!(leftover, 0);
    assert_eq!(inv.slot(36).count, 64);
    assert_eq!(inv.slot(37).count, 6);
  }

  #[test]
  fn left_click_pick_up_and_place() {
    let mut inv = PlayerInventory::new();
    inv.set_slot(10, Item::new(3, 0, 5));
    // Pick up.
    assert!(!inv.click_window(0, 10, 0, 0, Item::new(3, 0, 5)));
    assert_eq!(inv.slot(10), Item::empty());
    // Put down somewhere else.
    assert!(!inv.click_window(0, 11, 0, 0, Item::empty()));
    assert_eq!(inv.slot(11), Item::new(3, 0, 5));
  }

  #[test]
  fn right_click_splits() {
    let mut inv = PlayerInventory::new();
    inv.set_slot(10, Item::new(3, 0, 5));
    assert!(!inv.click_window(0, 10, 1, 0, Item::new(3, 0, 5)));
    // Cursor has 3, slot keeps 2.
    assert_eq!(inv.slot(10).count, 2);
    // Place them back one at a time.
    assert!(!inv.click_window(0, 11, 1, 0, Item::empty()));
    assert_eq!(inv.slot(11).count, 1);
  }

  #[test]
  fn stale_click_requests_rebuild() {
    let mut inv = PlayerInventory::new();
    inv.set_slot(10, Item::new(3, 0, 5));
    // The client thinks the slot holds something else.
    assert!(inv.click_window(0, 10, 0, 0, Item::new(4, 0, 1)));
    // Nothing was applied.
    assert_eq!(inv.slot(10), Item::new(3, 0, 5));
  }

  #[test]
  fn shift_click_moves_between_hotbar_and_main() {
    let mut inv = PlayerInventory::new();
    inv.set_slot(36, Item::new(3, 0, 5));
    assert!(!inv.click_window(0, 36, 0, 1, Item::new(3, 0, 5)));
    assert_eq!(inv.slot(36), Item::empty());
    assert_eq!(inv.slot(9), Item::new(3, 0, 5));
    // And back up to the hotbar.
    assert!(!inv.click_window(0, 9, 0, 1, Item::new(3, 0, 5)));
    assert_eq!(inv.slot(9), Item::empty());
    assert_eq!(inv.slot(36), Item::new(3, 0, 5));
  }

  #[test]
  fn crafting_window_maps_storage() {
    let mut inv = PlayerInventory::new();
    inv.open_crafting();
    inv.set_slot(9, Item::new(3, 0, 5));
    // View index 10 in the crafting window is storage slot 9.
    assert_eq!(inv.window_items(CRAFTING_WID)[10], Item::new(3, 0, 5));
    // Put a stack in the grid and close; it comes back.
    assert!(!inv.click_window(CRAFTING_WID, 10, 0, 0, Item::new(3, 0, 5)));
    assert!(!inv.click_window(CRAFTING_WID, 1, 0, 0, Item::empty()));
    let returned = inv.close_window();
    assert_eq!(returned, vec![Item::new(3, 0, 5)]);
    assert_eq!(inv.open_window(), None);
  }
}
