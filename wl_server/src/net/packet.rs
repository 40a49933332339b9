//! Play-phase packet handling. One function per interaction keeps the match
//! arms short; everything here runs on the poll loop, so handlers only queue
//! packets and never block.

use crate::{
  block, command, item,
  net::{cb, sb},
  player::Player,
  world::World,
};
use rand::Rng;
use std::sync::Arc;
use wl_common::{
  math::{Pos, Vec3},
  util::{Chat, GameMode, Item},
};

/// The block place packet sends an all-ones position to mean "I'm using the
/// held item in the air". Sign extension turns the 12 bit Y into -1; decoders
/// that mask it out see 255. Accept both.
fn is_use_item_sentinel(pos: Pos) -> bool {
  pos.x == -1 && pos.z == -1 && (pos.y == -1 || pos.y == 255)
}

/// Handles a single packet.
pub(crate) fn handle(world: &Arc<World>, player: &Arc<Player>, p: sb::Packet) {
  match p {
    sb::Packet::KeepAlive { id } => player.handle_keep_alive(id),
    sb::Packet::Chat { msg } => {
      if let Some(cmd) = msg.strip_prefix('/') {
        command::execute(world, player, cmd);
      } else {
        info!("<{}> {}", player.username(), msg);
        let mut out = Chat::empty();
        out.add(format!("<{}> ", player.username()));
        out.add(msg);
        world.broadcast_chat(out);
      }
    }
    sb::Packet::UseEntity { target, action } => {
      if action == sb::UseAction::Attack {
        handle_attack(world, player, target);
      }
    }
    sb::Packet::PlayerOnGround { on_ground } => player.handle_move(None, None, on_ground),
    sb::Packet::PlayerPos { x, y, z, on_ground } => {
      player.handle_move(Some((x, y, z)), None, on_ground)
    }
    sb::Packet::PlayerLook { yaw, pitch, on_ground } => {
      player.handle_move(None, Some((yaw, pitch)), on_ground)
    }
    sb::Packet::PlayerPosLook { x, y, z, yaw, pitch, on_ground } => {
      player.handle_move(Some((x, y, z)), Some((yaw, pitch)), on_ground)
    }
    sb::Packet::BlockDig { status, pos, face: _ } => handle_dig(world, player, status, pos),
    sb::Packet::BlockPlace { pos, face, held, cursor } => {
      handle_place(world, player, pos, face, held, cursor)
    }
    sb::Packet::ChangeHeldItem { slot } => {
      if !(0..9).contains(&slot) {
        return;
      }
      let held = {
        let mut inv = player.lock_inventory();
        inv.set_active_index(slot as u8);
        inv.held_item()
      };
      world.broadcast_trackers(player.id(), cb::Packet::EntityEquipment {
        eid: player.id(),
        slot: 0,
        item: held,
      });
    }
    sb::Packet::Animation => {
      world
        .broadcast_trackers(player.id(), cb::Packet::Animation { eid: player.id(), kind: 0 });
    }
    sb::Packet::EntityAction { action } => match action {
      0 => player.set_action_flags(Some(true), None),
      1 => player.set_action_flags(Some(false), None),
      3 => player.set_action_flags(None, Some(true)),
      4 => player.set_action_flags(None, Some(false)),
      _ => {}
    },
    sb::Packet::CloseWindow { wid: _ } => {
      let returned = player.lock_inventory().close_window();
      for it in returned {
        let (_, leftover) = player.lock_inventory().add_item(it);
        if leftover > 0 {
          warn!("{}: discarding {} overflow items on window close", player.username(), leftover);
        }
      }
      player
        .send(cb::Packet::WindowItems { wid: 0, items: player.lock_inventory().window_items(0) });
    }
    sb::Packet::ClickWindow { wid, slot, button, mode, clicked } => {
      let resync = player.lock_inventory().click_window(wid, slot, button, mode, clicked);
      if resync {
        player
          .send(cb::Packet::WindowItems { wid, items: player.lock_inventory().window_items(wid) });
      }
    }
    sb::Packet::TabComplete { text } => {
      player.send(cb::Packet::TabComplete { matches: command::tab_complete(world, &text) });
    }
    sb::Packet::PluginMessage { channel } => debug!("plugin message on channel {channel}"),
  }
}

fn handle_attack(world: &Arc<World>, player: &Arc<Player>, target: i32) {
  if world.item_entity(target).is_some() {
    world.remove_entity(target);
    return;
  }
  // There is no damage model; the hurt flash is the visible behavior.
  if world.mob_entity(target).is_some() || world.player(target).is_some() {
    world.broadcast_trackers(target, cb::Packet::EntityStatus { eid: target, status: 2 });
    if let Some(p) = world.player(target) {
      p.send(cb::Packet::EntityStatus { eid: target, status: 2 });
    }
    world.broadcast_trackers(player.id(), cb::Packet::Animation { eid: player.id(), kind: 0 });
  }
}

fn handle_dig(world: &Arc<World>, player: &Arc<Player>, status: sb::DigStatus, pos: Pos) {
  match player.game_mode() {
    GameMode::Survival => match status {
      sb::DigStatus::Finish => break_block(world, player, pos),
      sb::DigStatus::DropItem => drop_held_item(world, player),
      _ => {}
    },
    // Creative breaks instantly, on the start packet.
    GameMode::Creative => match status {
      sb::DigStatus::Start => break_block(world, player, pos),
      sb::DigStatus::DropItem => drop_held_item(world, player),
      _ => {}
    },
    GameMode::Adventure => sync_block(world, player, pos),
    GameMode::Spectator => {}
  }
}

/// Breaks a block: effect to onlookers, both halves of multi-part blocks
/// cleared, and a dropped item in survival.
fn break_block(world: &Arc<World>, player: &Arc<Player>, pos: Pos) {
  let state = world.get_block(pos);
  let id = block::state_id(state);
  let meta = block::state_meta(state);
  if id == block::AIR || id == block::BEDROCK {
    return;
  }

  // The breaker already played its own effect locally.
  // Crops are sent without metadata, or the particles come out miscolored.
  let effect_data =
    if id == block::CROPS { id as i32 } else { id as i32 | ((meta as i32) << 12) };
  world.broadcast_chunk(pos.chunk(), Some(player.id()), cb::Packet::Effect {
    effect: 2001,
    pos,
    data: effect_data,
  });

  let creative = player.game_mode() == GameMode::Creative;
  let mut drop = if creative { (-1, 0) } else { block::block_to_item(state) };

  if block::is_multi_part(id) {
    let upper = meta & 0x08 != 0;
    let other = if upper { pos.add_y(-1) } else { pos.add_y(1) };
    // Striking the upper half of a door yields nothing; the lower half is
    // the drop authority.
    if upper && drop.0 < 0 && !creative {
      drop = block::block_to_item(world.get_block(other));
    }
    if block::is_multi_part(block::state_id(world.get_block(other))) {
      world.set_block_sync(other, 0);
    }
  }

  world.set_block_sync(pos, 0);

  if drop.0 >= 0 {
    let vel = crate::RNG.with(|rng| {
      let mut rng = rng.borrow_mut();
      Vec3::new(rng.gen_range(-0.1..=0.1), 0.2, rng.gen_range(-0.1..=0.1))
    });
    world.summon_item(pos.center(), vel, Item::new(drop.0, drop.1, 1));
  }
}

/// Drops one item from the held stack in front of the player.
fn drop_held_item(world: &Arc<World>, player: &Arc<Player>) {
  let dropped = {
    let mut inv = player.lock_inventory();
    let held = inv.held_item();
    if held.is_empty() {
      return;
    }
    inv.set_held_item(held.with_count(held.count - 1));
    Item::new(held.id, held.damage, 1)
  };
  sync_held_slot(player);

  let (pos, yaw, _) = player.pos_look();
  let rad = (yaw as f64).to_radians();
  let vel = Vec3::new(-rad.sin() * 0.3, 0.2, rad.cos() * 0.3);
  world.summon_item(wl_common::math::FPos::new(pos.x, pos.y + 1.3, pos.z), vel, dropped);
}

fn handle_place(
  world: &Arc<World>,
  player: &Arc<Player>,
  pos: Pos,
  face: u8,
  client_held: Item,
  cursor: (u8, u8, u8),
) {
  let mode = player.game_mode();
  if mode == GameMode::Spectator || mode == GameMode::Adventure {
    sync_held_slot(player);
    return;
  }

  let held = player.held_item();

  if is_use_item_sentinel(pos) {
    // Using the held item in the air. Spawn eggs are the only item with a
    // use; everything else just needs its slot confirmed.
    if held.id == item::SPAWN_EGG {
      let p = player.pos();
      try_spawn_egg(world, player, held, wl_common::math::FPos::new(p.x, p.y + 1.0, p.z));
    } else {
      sync_held_slot(player);
    }
    return;
  }

  let target_state = world.get_block(pos);
  let target_id = block::state_id(target_state);

  if target_id == block::CRAFTING_TABLE {
    player.lock_inventory().open_crafting();
    player.send(cb::Packet::OpenWindow {
      wid:   crate::player::CRAFTING_WID,
      kind:  "minecraft:crafting_table".into(),
      title: Chat::new("Crafting"),
      slots: 0,
    });
    return;
  }

  if block::is_door(target_id) {
    toggle_door(world, player, pos, target_state);
    return;
  }

  // From here on the client predicted a placement, so every early return
  // has to put its copy of the slot right.
  if held != client_held {
    sync_held_slot(player);
    sync_block(world, player, pos);
    return;
  }

  if held.id == item::SPAWN_EGG {
    let spot = block::face_offset(pos, face);
    try_spawn_egg(world, player, held, spot.center());
    return;
  }

  let block_id = match item::item_to_block(held.id) {
    Some(id) if id != 0 && !held.is_empty() => id,
    _ => {
      sync_held_slot(player);
      return;
    }
  };

  // Clicking into grass or water replaces it; otherwise the block goes on
  // the clicked face.
  let dest = if block::is_replaceable(target_id) { pos } else { block::face_offset(pos, face) };
  let dest_id = block::state_id(world.get_block(dest));

  let door = item::is_door_item(held.id);
  let rejected = !(0..256).contains(&dest.y)
    || !block::is_replaceable(dest_id)
    || (door
      && (dest.y > 253 || !block::is_replaceable(block::state_id(world.get_block(dest.add_y(1))))));
  if rejected {
    sync_held_slot(player);
    sync_block(world, player, dest);
    return;
  }

  let meta = block::placement_meta(block_id, held.damage, face, cursor.1, player.yaw());
  world.set_block_sync(dest, block::state(block_id, meta));
  if door {
    world.set_block_sync(dest.add_y(1), block::state(block_id, 8));
  }

  if mode != GameMode::Creative {
    consume_held(player);
  }
}

/// Toggles the open bit on a door's lower half and rewrites both halves.
fn toggle_door(world: &Arc<World>, player: &Arc<Player>, pos: Pos, state: u16) {
  let lower_pos = if block::state_meta(state) & 0x08 != 0 { pos.add_y(-1) } else { pos };
  let lower = world.get_block(lower_pos);
  let id = block::state_id(lower);
  if !block::is_door(id) {
    return;
  }
  let upper_pos = lower_pos.add_y(1);
  let upper = world.get_block(upper_pos);

  world.set_block_sync(lower_pos, block::state(id, block::state_meta(lower) ^ 0x04));
  world.set_block_sync(upper_pos, upper);
  world.broadcast_chunk(lower_pos.chunk(), Some(player.id()), cb::Packet::Effect {
    effect: 1003,
    pos:    lower_pos,
    data:   0,
  });
}

/// Spawns the mob a spawn egg encodes, and consumes the egg in survival.
fn try_spawn_egg(
  world: &Arc<World>,
  player: &Arc<Player>,
  held: Item,
  at: wl_common::math::FPos,
) {
  if !item::MOB_TYPE_RANGE.contains(&held.damage) {
    sync_held_slot(player);
    return;
  }
  world.summon_mob(held.damage as u8, at);
  if player.game_mode() != GameMode::Creative {
    consume_held(player);
  }
}

/// Takes one item off the held stack and confirms the slot to the client.
fn consume_held(player: &Arc<Player>) {
  {
    let mut inv = player.lock_inventory();
    let held = inv.held_item();
    if !held.is_empty() {
      inv.set_held_item(held.with_count(held.count - 1));
    }
  }
  sync_held_slot(player);
}

/// Re-sends the held slot as the server knows it.
fn sync_held_slot(player: &Arc<Player>) {
  let (slot, item) = {
    let inv = player.lock_inventory();
    (inv.held_slot(), inv.held_item())
  };
  player.send(cb::Packet::SetSlot { wid: 0, slot: slot as i16, item });
}

/// Re-sends a block the client may have mispredicted.
fn sync_block(world: &Arc<World>, player: &Arc<Player>, pos: Pos) {
  if (0..256).contains(&pos.y) {
    player.send(cb::Packet::BlockChange { pos, state: world.get_block(pos) });
  }
}
