//! Item and mob entities. Players are not entities in this sense; they have
//! their own struct, and the client moves them itself.

use crate::world::World;
use parking_lot::Mutex;
use wl_common::{
  math::{FPos, Vec3},
  util::Item,
};

/// Ticks an item lives before it despawns (5 minutes).
pub const ITEM_DESPAWN_AGE: u32 = 6000;
/// Ticks before a freshly dropped item can be picked up.
pub const ITEM_PICKUP_DELAY: u32 = 20;
/// How close a player must be for the pickup probe to collect an item.
pub const ITEM_PICKUP_DIST: f64 = 1.5;

const GRAVITY: f64 = 0.04;
const TERMINAL_VELOCITY: f64 = 3.92;
const GROUND_DRAG: f64 = 0.9;
/// Movements smaller than 4/32 of a block are not worth a teleport packet.
const MIN_BROADCAST_DIST: f64 = 4.0 / 32.0;

#[derive(Debug, Clone)]
pub struct EntityState {
  pub pos:       FPos,
  pub vel:       Vec3,
  pub yaw:       f32,
  pub pitch:     f32,
  pub on_ground: bool,
  pub age:       u32,
}

impl EntityState {
  pub fn new(pos: FPos) -> Self {
    EntityState { pos, vel: Vec3::default(), yaw: 0.0, pitch: 0.0, on_ground: false, age: 0 }
  }
}

/// A dropped item stack.
pub struct ItemEntity {
  pub eid:   i32,
  pub item:  Item,
  pub state: Mutex<EntityState>,
}

impl ItemEntity {
  pub fn new(eid: i32, item: Item, pos: FPos, vel: Vec3) -> Self {
    let mut state = EntityState::new(pos);
    state.vel = vel;
    ItemEntity { eid, item, state: Mutex::new(state) }
  }
}

/// A living entity, spawned from a spawn egg. There is no AI; mobs stand
/// around and fall.
pub struct MobEntity {
  pub eid:   i32,
  pub ty:    u8,
  pub state: Mutex<EntityState>,
}

impl MobEntity {
  pub fn new(eid: i32, ty: u8, pos: FPos) -> Self {
    MobEntity { eid, ty, state: Mutex::new(EntityState::new(pos)) }
  }
}

/// Advances an entity by one tick: gravity, the move, and the landing check.
/// Returns `true` if the entity moved far enough that trackers need a
/// teleport packet.
pub(crate) fn step(state: &mut EntityState, world: &World) -> bool {
  let old = state.pos;

  state.vel.y = (state.vel.y - GRAVITY).max(-TERMINAL_VELOCITY);
  let next = state.pos + state.vel;

  if world.is_solid_at(next.block()) {
    // Landed. Snap to the top of the block we hit and slow down.
    state.pos = FPos::new(next.x, next.y.floor() + 1.0, next.z);
    state.vel.y = 0.0;
    state.vel.x *= GROUND_DRAG;
    state.vel.z *= GROUND_DRAG;
    state.on_ground = true;
  } else {
    state.pos = next;
    state.on_ground = false;
  }

  state.pos.dist(old) >= MIN_BROADCAST_DIST
}
