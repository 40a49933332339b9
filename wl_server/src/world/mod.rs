//! The world: block storage, the entity registries, the broadcast fabric,
//! and the 20 Hz tick loop.

use crate::{
  block,
  entity::{self, ItemEntity, MobEntity},
  net::{cb, ConnSender, NetHandle},
  player::Player,
};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, AtomicI32, Ordering},
    Arc,
  },
  thread,
  time::{Duration, Instant},
};
use wl_common::{
  math::{ChunkPos, FPos, Pos, Vec3},
  util::{chat::Color, Chat, GameMode, Item, UUID},
};

pub mod chunk;
mod gen;

pub use chunk::Chunk;
pub use gen::WorldGen;

pub const TICK_TIME: Duration = Duration::from_millis(50);
/// Entities within this many blocks of a player are visible to them.
pub const ENTITY_TRACKING_RANGE: f64 = 64.0;
/// Keep alives go out every 200 ticks, and a client that hasn't echoed one
/// for 30 seconds is disconnected.
pub const KEEP_ALIVE_INTERVAL: u64 = 200;

pub struct Config {
  pub motd:          String,
  pub max_players:   u32,
  pub view_distance: u32,
  pub game_mode:     GameMode,
  pub seed:          i64,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      motd:          "A willow server".into(),
      max_players:   20,
      view_distance: 8,
      game_mode:     GameMode::Survival,
      seed:          0,
    }
  }
}

pub struct World {
  config: Config,
  gen:    WorldGen,
  chunks: RwLock<HashMap<ChunkPos, Chunk>>,

  // The entity registries. Any eid is present in at most one of these three
  // maps.
  players: RwLock<HashMap<i32, Arc<Player>>>,
  items:   RwLock<HashMap<i32, Arc<ItemEntity>>>,
  mobs:    RwLock<HashMap<i32, Arc<MobEntity>>>,

  gamerules: Mutex<HashMap<String, String>>,
  eids:      AtomicI32,
  running:   AtomicBool,
  net:       Mutex<Option<NetHandle>>,
}

impl World {
  pub fn new(config: Config) -> Arc<Self> {
    let mut gamerules = HashMap::new();
    gamerules.insert("doDaylightCycle".to_string(), "true".to_string());
    gamerules.insert("doMobSpawning".to_string(), "true".to_string());
    gamerules.insert("keepInventory".to_string(), "false".to_string());
    Arc::new(World {
      gen: WorldGen::new(config.seed),
      config,
      chunks: RwLock::new(HashMap::new()),
      players: RwLock::new(HashMap::new()),
      items: RwLock::new(HashMap::new()),
      mobs: RwLock::new(HashMap::new()),
      gamerules: Mutex::new(gamerules),
      eids: AtomicI32::new(1),
      running: AtomicBool::new(true),
      net: Mutex::new(None),
    })
  }

  pub fn config(&self) -> &Config { &self.config }
  pub fn view_distance(&self) -> i32 { self.config.view_distance as i32 }
  pub fn is_running(&self) -> bool { self.running.load(Ordering::SeqCst) }
  pub(crate) fn set_net_handle(&self, net: NetHandle) { *self.net.lock() = Some(net); }

  fn next_eid(&self) -> i32 { self.eids.fetch_add(1, Ordering::SeqCst) }

  // ===== Blocks =====

  fn ensure_chunk(&self, pos: ChunkPos) {
    if self.chunks.read().contains_key(&pos) {
      return;
    }
    // Generate outside the write lock, so other readers aren't stalled on
    // terrain noise.
    let c = self.gen.chunk(pos);
    self.chunks.write().entry(pos).or_insert(c);
  }

  /// Reads a block state. Out of range Y reads as air.
  pub fn get_block(&self, pos: Pos) -> u16 {
    let chunk_pos = pos.chunk();
    self.ensure_chunk(chunk_pos);
    let rel = Pos::new(pos.chunk_rel_x(), pos.y, pos.chunk_rel_z());
    self.chunks.read()[&chunk_pos].get(rel)
  }

  /// Writes a block state, without telling anyone. Returns `false` if the
  /// position is out of the world.
  pub fn set_block(&self, pos: Pos, state: u16) -> bool {
    if !(0..256).contains(&pos.y) {
      return false;
    }
    let chunk_pos = pos.chunk();
    self.ensure_chunk(chunk_pos);
    let rel = Pos::new(pos.chunk_rel_x(), pos.y, pos.chunk_rel_z());
    self.chunks.write().get_mut(&chunk_pos).unwrap().set(rel, state);
    true
  }

  /// Writes a block state and broadcasts the change to everyone who has the
  /// chunk loaded.
  pub fn set_block_sync(&self, pos: Pos, state: u16) -> bool {
    if !self.set_block(pos, state) {
      return false;
    }
    self.broadcast_chunk(pos.chunk(), None, cb::Packet::BlockChange { pos, state });
    true
  }

  pub fn is_solid_at(&self, pos: Pos) -> bool {
    if pos.y < 0 {
      return false;
    }
    block::is_solid(block::state_id(self.get_block(pos)))
  }

  /// The Y of the highest non-air block in the given column.
  pub fn surface_height(&self, x: i32, z: i32) -> i32 {
    let chunk_pos = Pos::new(x, 0, z).chunk();
    self.ensure_chunk(chunk_pos);
    let p = Pos::new(x, 0, z);
    self.chunks.read()[&chunk_pos].surface_height(p.chunk_rel_x(), p.chunk_rel_z())
  }

  /// Serializes a chunk column for the chunk data packet.
  pub fn serialize_chunk(&self, pos: ChunkPos) -> (u16, Vec<u8>) {
    self.ensure_chunk(pos);
    self.chunks.read()[&pos].serialize()
  }

  /// The position new players spawn at.
  pub fn spawn_point(&self) -> FPos {
    FPos::new(8.5, self.surface_height(8, 8) as f64 + 1.0, 8.5)
  }

  // ===== Gamerules =====

  pub fn gamerule(&self, key: &str) -> Option<String> { self.gamerules.lock().get(key).cloned() }
  pub fn set_gamerule(&self, key: &str, value: &str) {
    self.gamerules.lock().insert(key.into(), value.into());
  }
  pub fn gamerule_keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.gamerules.lock().keys().cloned().collect();
    keys.sort();
    keys
  }

  // ===== Players =====

  /// Creates a player for a connection that just finished logging in.
  /// Returns `None` (and tells the client why) if they can't join.
  pub fn new_player(self: &Arc<Self>, conn: ConnSender, username: String) -> Option<Arc<Player>> {
    let uuid = UUID::offline(&username);
    {
      let players = self.players.read();
      if players.len() >= self.config.max_players as usize {
        conn.send(cb::Packet::Disconnect { reason: Chat::new("The server is full") });
        conn.close();
        return None;
      }
      if players.values().any(|p| p.uuid() == uuid) {
        conn.send(cb::Packet::Disconnect {
          reason: Chat::new("A player with that name is already online"),
        });
        conn.close();
        return None;
      }
    }

    let eid = self.next_eid();
    let spawn = self.spawn_point();
    let player = Player::new(eid, username, uuid, conn, self.clone(), spawn, self.config.game_mode);
    self.players.write().insert(eid, player.clone());

    player.join();

    let mut msg = Chat::empty();
    msg.add(format!("{} joined the game", player.username())).color(Color::Yellow);
    self.broadcast_chat(msg);
    info!("{} joined the game (eid {})", player.username(), eid);
    Some(player)
  }

  /// Removes the player. This does not terminate their connection; it is
  /// called after the connection is already gone. Does nothing if the player
  /// was already removed.
  pub fn remove_player(&self, eid: i32) {
    let player = match self.players.write().remove(&eid) {
      Some(p) => p,
      None => return,
    };
    player.leave();

    // Anyone who could see them needs a destroy, and everyone needs the tab
    // list update.
    for p in self.player_list() {
      p.stop_tracking(eid);
    }
    self.broadcast_all(cb::Packet::PlayerList {
      action: cb::PlayerListAction::Remove(vec![player.uuid()]),
    });
    let mut msg = Chat::empty();
    msg.add(format!("{} left the game", player.username())).color(Color::Yellow);
    self.broadcast_chat(msg);
    info!("{} left the game", player.username());
  }

  pub fn player(&self, eid: i32) -> Option<Arc<Player>> { self.players.read().get(&eid).cloned() }

  pub fn player_by_name(&self, name: &str) -> Option<Arc<Player>> {
    self.players.read().values().find(|p| p.username() == name).cloned()
  }

  pub fn players(&self) -> RwLockReadGuard<'_, HashMap<i32, Arc<Player>>> { self.players.read() }

  pub fn online_count(&self) -> usize { self.players.read().len() }

  /// A snapshot of the player list. Broadcast fan-out works from this, so no
  /// lock is held while packets are queued.
  pub fn player_list(&self) -> Vec<Arc<Player>> {
    self.players.read().values().cloned().collect()
  }

  // ===== Broadcast fabric =====

  pub fn broadcast_all(&self, p: cb::Packet) {
    for player in self.player_list() {
      player.send(p.clone());
    }
  }

  pub fn broadcast_chat(&self, msg: Chat) { self.broadcast_all(cb::Packet::Chat { msg }); }

  /// Sends to every player who has the given chunk loaded, except the given
  /// eid. Used for block changes and break effects.
  pub fn broadcast_chunk(&self, pos: ChunkPos, except: Option<i32>, p: cb::Packet) {
    for player in self.player_list() {
      if Some(player.id()) == except {
        continue;
      }
      if player.has_chunk_loaded(pos) {
        player.send(p.clone());
      }
    }
  }

  /// Sends to every player currently tracking the given entity.
  pub fn broadcast_trackers(&self, eid: i32, p: cb::Packet) {
    for player in self.player_list() {
      if player.is_tracking(eid) {
        player.send(p.clone());
      }
    }
  }

  // ===== Entities =====

  /// Spawns a dropped item stack. Anyone in range starts tracking it.
  pub fn summon_item(&self, pos: FPos, vel: Vec3, item: Item) -> i32 {
    let eid = self.next_eid();
    let ent = Arc::new(ItemEntity::new(eid, item, pos, vel));
    self.items.write().insert(eid, ent);
    self.update_entity_viewers(eid, pos);
    eid
  }

  /// Spawns a mob of the given type. There is no AI; it stands there.
  pub fn summon_mob(&self, ty: u8, pos: FPos) -> i32 {
    let eid = self.next_eid();
    let ent = Arc::new(MobEntity::new(eid, ty, pos));
    self.mobs.write().insert(eid, ent);
    self.update_entity_viewers(eid, pos);
    info!("summoned mob of type {} at {}", ty, pos);
    eid
  }

  pub fn item_entity(&self, eid: i32) -> Option<Arc<ItemEntity>> {
    self.items.read().get(&eid).cloned()
  }

  pub fn mob_entity(&self, eid: i32) -> Option<Arc<MobEntity>> {
    self.mobs.read().get(&eid).cloned()
  }

  /// Removes an item or mob, and destroys it on every client that tracked
  /// it.
  pub fn remove_entity(&self, eid: i32) {
    let removed =
      self.items.write().remove(&eid).is_some() || self.mobs.write().remove(&eid).is_some();
    if !removed {
      return;
    }
    for p in self.player_list() {
      p.stop_tracking(eid);
    }
  }

  /// The eid and position of every item and mob. Tracker rebuilds scan
  /// this.
  pub fn entity_positions(&self) -> Vec<(i32, FPos)> {
    let mut out = vec![];
    for (eid, it) in self.items.read().iter() {
      out.push((*eid, it.state.lock().pos));
    }
    for (eid, m) in self.mobs.read().iter() {
      out.push((*eid, m.state.lock().pos));
    }
    out
  }

  /// The current position of any entity: player, item or mob.
  pub fn entity_pos(&self, eid: i32) -> Option<FPos> {
    if let Some(p) = self.players.read().get(&eid) {
      return Some(p.pos());
    }
    if let Some(it) = self.items.read().get(&eid) {
      return Some(it.state.lock().pos);
    }
    if let Some(m) = self.mobs.read().get(&eid) {
      return Some(m.state.lock().pos);
    }
    None
  }

  /// The packets that make the given entity appear on a client.
  pub(crate) fn spawn_packets(&self, eid: i32) -> Vec<cb::Packet> {
    if let Some(p) = self.players.read().get(&eid) {
      let (pos, yaw, pitch) = p.pos_look();
      return vec![
        cb::Packet::PlayerList {
          action: cb::PlayerListAction::Add(vec![cb::PlayerInfo {
            uuid:      p.uuid(),
            name:      p.username().to_string(),
            game_mode: p.game_mode(),
            ping:      0,
          }]),
        },
        cb::Packet::SpawnPlayer {
          eid,
          uuid: p.uuid(),
          pos,
          yaw,
          pitch,
          held: p.held_item().id.max(0),
          flags: p.entity_flags(),
        },
      ];
    }
    if let Some(it) = self.items.read().get(&eid) {
      let state = it.state.lock();
      return vec![
        cb::Packet::SpawnObject { eid, ty: 2, pos: state.pos, data: 1, vel: state.vel },
        cb::Packet::EntityItemMetadata { eid, item: it.item },
        cb::Packet::EntityVelocity { eid, vel: state.vel },
      ];
    }
    if let Some(m) = self.mobs.read().get(&eid) {
      let state = m.state.lock();
      return vec![cb::Packet::SpawnMob {
        eid,
        ty: m.ty,
        pos: state.pos,
        yaw: state.yaw,
        pitch: state.pitch,
        vel: state.vel,
      }];
    }
    vec![]
  }

  /// Checks the subject entity against every player's tracking range, after
  /// the subject moved. Players entering range get a spawn, players leaving
  /// get a destroy.
  pub fn update_entity_viewers(&self, eid: i32, pos: FPos) {
    for viewer in self.player_list() {
      if viewer.id() == eid {
        continue;
      }
      let in_range = viewer.pos().dist(pos) <= ENTITY_TRACKING_RANGE;
      if in_range && !viewer.is_tracking(eid) {
        viewer.start_tracking(eid, self.spawn_packets(eid));
      } else if !in_range && viewer.is_tracking(eid) {
        viewer.stop_tracking(eid);
      }
    }
  }

  // ===== Tick loop =====

  pub fn run(self: Arc<Self>) {
    let mut tick: u64 = 0;
    let mut start = Instant::now();
    while self.is_running() {
      self.tick(tick);
      tick += 1;
      let passed = Instant::now().duration_since(start);
      start += TICK_TIME;
      match TICK_TIME.checked_sub(passed) {
        Some(t) => spin_sleep::sleep(t),
        None => warn!("tick took {passed:?} (more than 50 ms)"),
      }
    }
  }

  /// One simulation step. Ticks never overlap; a long tick just delays the
  /// next one.
  pub(crate) fn tick(&self, tick: u64) {
    // Item and mob physics.
    let items: Vec<Arc<ItemEntity>> = self.items.read().values().cloned().collect();
    for it in items {
      let (moved, pos, age) = {
        let mut state = it.state.lock();
        let moved = entity::step(&mut state, self);
        state.age += 1;
        (moved, state.pos, state.age)
      };
      if age > entity::ITEM_DESPAWN_AGE {
        self.remove_entity(it.eid);
        continue;
      }
      if moved {
        self.broadcast_trackers(it.eid, cb::Packet::EntityTeleport {
          eid:       it.eid,
          pos,
          yaw:       0.0,
          pitch:     0.0,
          on_ground: false,
        });
        self.update_entity_viewers(it.eid, pos);
      }
    }
    let mobs: Vec<Arc<MobEntity>> = self.mobs.read().values().cloned().collect();
    for m in mobs {
      let (moved, pos, yaw, pitch) = {
        let mut state = m.state.lock();
        let moved = entity::step(&mut state, self);
        state.age += 1;
        (moved, state.pos, state.yaw, state.pitch)
      };
      if moved {
        self.broadcast_trackers(m.eid, cb::Packet::EntityTeleport {
          eid: m.eid,
          pos,
          yaw,
          pitch,
          on_ground: true,
        });
        self.update_entity_viewers(m.eid, pos);
      }
    }

    // Keep alives.
    let players = self.player_list();
    for p in &players {
      if tick % KEEP_ALIVE_INTERVAL == 0 {
        p.send_keep_alive();
      }
      if p.keep_alive_timed_out() {
        warn!("{} timed out", p.username());
        p.disconnect(Chat::new("Timed out"));
      }
    }

    // Pickup probe.
    let items: Vec<Arc<ItemEntity>> = self.items.read().values().cloned().collect();
    for it in items {
      let (pos, age) = {
        let state = it.state.lock();
        (state.pos, state.age)
      };
      if age < entity::ITEM_PICKUP_DELAY {
        continue;
      }
      for p in &players {
        if p.game_mode() == GameMode::Spectator {
          continue;
        }
        if p.pos().dist(pos) <= entity::ITEM_PICKUP_DIST && p.try_pickup(it.item) {
          self.remove_entity(it.eid);
          break;
        }
      }
    }
  }

  // ===== Shutdown =====

  #[cfg(not(target_family = "unix"))]
  pub fn stop_on_ctrlc(self: &Arc<Self>) {}
  /// Exits cleanly on ctrl-c. Nothing persists, so there is nothing to save
  /// first.
  #[cfg(target_family = "unix")]
  pub fn stop_on_ctrlc(self: &Arc<Self>) {
    use nix::sys::signal::{signal, SigHandler, Signal};

    extern "C" fn handle_sigint(_sig: nix::libc::c_int) {
      println!();
      std::process::exit(0);
    }

    let handler = SigHandler::Handler(handle_sigint);
    if unsafe { signal(Signal::SIGINT, handler) }.is_err() {
      warn!("could not install a SIGINT handler");
    }
  }

  /// Stops the server: tells everyone, then half a second later closes every
  /// connection and the listener.
  pub fn stop(self: &Arc<Self>) {
    if !self.running.swap(false, Ordering::SeqCst) {
      return;
    }
    let mut msg = Chat::empty();
    msg.add("Stopping the server").color(Color::Red);
    self.broadcast_chat(msg);
    info!("stopping the server");
    let world = self.clone();
    thread::spawn(move || {
      thread::sleep(Duration::from_millis(500));
      for p in world.player_list() {
        p.disconnect(Chat::new("Server closed"));
      }
      if let Some(net) = world.net.lock().take() {
        net.shutdown();
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::{packet, sb, ConnSender};
  use crossbeam_channel::Receiver;
  use mio::Poll;
  use pretty_assertions::assert_eq;

  fn test_world(view_distance: u32) -> Arc<World> {
    World::new(Config { view_distance, seed: 7, ..Config::default() })
  }

  fn join(world: &Arc<World>, poll: &Poll, name: &str) -> (Receiver<cb::Packet>, Arc<Player>) {
    let (rx, sender) = ConnSender::mock(poll);
    let player = world.new_player(sender, name.into()).expect("player should join");
    (rx, player)
  }

  /// Waits for packets until `f` returns a value, or panics after 5
  /// seconds. Chunk data comes from a worker thread, so tests can't just
  /// drain synchronously.
  fn expect_packet<T>(rx: &Receiver<cb::Packet>, mut f: impl FnMut(&cb::Packet) -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    while let Ok(p) = rx.recv_deadline(deadline) {
      if let Some(v) = f(&p) {
        return v;
      }
    }
    panic!("expected packet never arrived");
  }

  fn give(player: &Player, item: Item) {
    player.lock_inventory().set_held_item(item);
  }

  #[test]
  fn gravity_pulls_items_down() {
    let world = test_world(2);
    let ground = world.surface_height(8, 8) as f64;
    let eid = world.summon_item(FPos::new(8.5, 100.0, 8.5), Vec3::default(), Item::new(3, 0, 1));

    for i in 0..5 {
      world.tick(i + 1);
    }
    let it = world.item_entity(eid).expect("item should still exist");
    assert!(it.state.lock().pos.y < 100.0);

    for i in 0..100 {
      world.tick(i + 6);
    }
    let state = it.state.lock();
    // Resting on the ground: velocity is exactly zero after the tick.
    assert_eq!(state.vel.y, 0.0);
    assert!(state.pos.y > 0.0);
    assert_eq!(state.pos.y, ground + 1.0);
  }

  #[test]
  fn chunk_window_streams_nearest_first() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (rx, steve) = join(&world, &poll, "Steve");

    let center = steve.pos().chunk();
    // The loaded set is exactly the view window.
    assert_eq!(steve.tracking.lock().loaded_chunks.len(), 25);
    for dx in -2..=2 {
      for dz in -2..=2 {
        assert!(steve.has_chunk_loaded(ChunkPos::new(center.x() + dx, center.z() + dz)));
      }
    }
    assert!(!steve.has_chunk_loaded(ChunkPos::new(center.x() + 3, center.z())));

    // All 25 chunks arrive, nearest first.
    let mut dists = vec![];
    while dists.len() < 25 {
      let d = expect_packet(&rx, |p| match p {
        cb::Packet::ChunkData { x, z, bit_mask, .. } if *bit_mask != 0 => {
          Some(ChunkPos::new(*x, *z).dist_squared(center))
        }
        _ => None,
      });
      dists.push(d);
    }
    for pair in dists.windows(2) {
      assert!(pair[0] <= pair[1], "chunks arrived out of order: {dists:?}");
    }
  }

  #[test]
  fn teleport_recenters_the_window() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (rx, steve) = join(&world, &poll, "Steve");

    steve.teleport(FPos::new(100.0, 70.0, 100.0));
    let center = steve.pos().chunk();
    assert_eq!(center, ChunkPos::new(6, 6));
    assert_eq!(steve.tracking.lock().loaded_chunks.len(), 25);
    for dx in -2..=2 {
      for dz in -2..=2 {
        assert!(steve.has_chunk_loaded(ChunkPos::new(6 + dx, 6 + dz)));
      }
    }

    // The client got the position packet, and the old chunks unloaded.
    expect_packet(&rx, |p| match p {
      cb::Packet::SetPosLook { pos, .. } if pos.x == 100.0 => Some(()),
      _ => None,
    });
    expect_packet(&rx, |p| match p {
      cb::Packet::ChunkData { bit_mask: 0, data, .. } if data.is_empty() => Some(()),
      _ => None,
    });
  }

  #[test]
  fn players_track_each_other_within_range() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (rx_steve, steve) = join(&world, &poll, "Steve");
    let (rx_alex, alex) = join(&world, &poll, "Alex");

    // Both spawned at the same point, so both track each other.
    assert!(steve.is_tracking(alex.id()));
    assert!(alex.is_tracking(steve.id()));
    expect_packet(&rx_steve, |p| match p {
      cb::Packet::SpawnPlayer { eid, .. } if *eid == alex.id() => Some(()),
      _ => None,
    });
    expect_packet(&rx_alex, |p| match p {
      cb::Packet::SpawnPlayer { eid, .. } if *eid == steve.id() => Some(()),
      _ => None,
    });

    // Alex walks 200 blocks away; Steve's client destroys him.
    alex.handle_move(Some((208.5, 70.0, 8.5)), None, false);
    assert!(!steve.is_tracking(alex.id()));
    assert!(!alex.is_tracking(steve.id()));
    expect_packet(&rx_steve, |p| match p {
      cb::Packet::DestroyEntities { eids } if eids.contains(&alex.id()) => Some(()),
      _ => None,
    });
  }

  #[test]
  fn stairs_place_with_direction_and_break_with_a_drop() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (rx, steve) = join(&world, &poll, "Steve");

    let h = world.surface_height(1, 0);
    let clicked = Pos::new(1, h, 0);
    let dest = Pos::new(1, h + 1, 0);
    give(&steve, Item::new(53, 0, 1));

    packet::handle(&world, &steve, sb::Packet::BlockPlace {
      pos:    clicked,
      face:   1,
      held:   Item::new(53, 0, 1),
      cursor: (8, 16, 8),
    });
    assert_eq!(world.get_block(dest), block::state(53, 2));
    expect_packet(&rx, |p| match p {
      cb::Packet::BlockChange { pos, state } if *pos == dest => Some(*state),
      _ => None,
    });
    // Survival placement consumed the stack.
    assert!(steve.held_item().is_empty());

    packet::handle(&world, &steve, sb::Packet::BlockDig {
      status: sb::DigStatus::Finish,
      pos:    dest,
      face:   1,
    });
    assert_eq!(world.get_block(dest), 0);

    // Exactly one item entity, at the block center, drifting gently.
    let ents = world.entity_positions();
    assert_eq!(ents.len(), 1);
    let it = world.item_entity(ents[0].0).unwrap();
    let state = it.state.lock();
    assert_eq!(state.pos, dest.center());
    assert_eq!(state.vel.y, 0.2);
    assert!(state.vel.x.abs() <= 0.1 && state.vel.z.abs() <= 0.1);
    assert_eq!(it.item, Item::new(53, 0, 1));
  }

  #[test]
  fn bedrock_and_air_breaks_are_noops() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (_rx, steve) = join(&world, &poll, "Steve");

    let bedrock = Pos::new(0, 0, 0);
    assert_eq!(block::state_id(world.get_block(bedrock)), block::BEDROCK);
    packet::handle(&world, &steve, sb::Packet::BlockDig {
      status: sb::DigStatus::Finish,
      pos:    bedrock,
      face:   1,
    });
    assert_eq!(block::state_id(world.get_block(bedrock)), block::BEDROCK);
    assert!(world.entity_positions().is_empty());

    let air = Pos::new(0, 200, 0);
    packet::handle(&world, &steve, sb::Packet::BlockDig {
      status: sb::DigStatus::Finish,
      pos:    air,
      face:   1,
    });
    assert!(world.entity_positions().is_empty());
  }

  #[test]
  fn creative_breaks_drop_nothing() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (_rx, steve) = join(&world, &poll, "Steve");
    steve.set_game_mode(GameMode::Creative);

    let h = world.surface_height(3, 3);
    packet::handle(&world, &steve, sb::Packet::BlockDig {
      status: sb::DigStatus::Start,
      pos:    Pos::new(3, h, 3),
      face:   1,
    });
    assert_eq!(world.get_block(Pos::new(3, h, 3)), 0);
    assert!(world.entity_positions().is_empty());

    // The same break in survival drops exactly one item.
    steve.set_game_mode(GameMode::Survival);
    packet::handle(&world, &steve, sb::Packet::BlockDig {
      status: sb::DigStatus::Finish,
      pos:    Pos::new(3, h - 1, 3),
      face:   1,
    });
    assert_eq!(world.entity_positions().len(), 1);
  }

  #[test]
  fn doors_occupy_two_blocks_and_toggle() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (_rx, steve) = join(&world, &poll, "Steve");

    let h = world.surface_height(4, 4);
    let clicked = Pos::new(4, h, 4);
    let lower = Pos::new(4, h + 1, 4);
    give(&steve, Item::new(324, 0, 1));

    packet::handle(&world, &steve, sb::Packet::BlockPlace {
      pos:    clicked,
      face:   1,
      held:   Item::new(324, 0, 1),
      cursor: (8, 16, 8),
    });
    assert_eq!(world.get_block(lower), block::state(64, 1));
    assert_eq!(world.get_block(lower.add_y(1)), block::state(64, 8));

    // Right-clicking either half toggles the open bit on the lower half.
    packet::handle(&world, &steve, sb::Packet::BlockPlace {
      pos:    lower.add_y(1),
      face:   3,
      held:   Item::empty(),
      cursor: (8, 8, 8),
    });
    assert_eq!(world.get_block(lower), block::state(64, 1 | 4));
    assert_eq!(world.get_block(lower.add_y(1)), block::state(64, 8));

    // Breaking the upper half clears both and drops one door item.
    packet::handle(&world, &steve, sb::Packet::BlockDig {
      status: sb::DigStatus::Finish,
      pos:    lower.add_y(1),
      face:   1,
    });
    assert_eq!(world.get_block(lower), 0);
    assert_eq!(world.get_block(lower.add_y(1)), 0);
    let ents = world.entity_positions();
    assert_eq!(ents.len(), 1);
    assert_eq!(world.item_entity(ents[0].0).unwrap().item, Item::new(324, 0, 1));
  }

  #[test]
  fn nearby_items_are_picked_up() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (rx, steve) = join(&world, &poll, "Steve");

    let pos = steve.pos();
    let eid = world.summon_item(pos, Vec3::default(), Item::new(3, 0, 1));
    // Too fresh to pick up.
    world.tick(1);
    assert!(world.item_entity(eid).is_some());

    world.item_entity(eid).unwrap().state.lock().age = entity::ITEM_PICKUP_DELAY;
    world.tick(2);
    assert!(world.item_entity(eid).is_none());
    assert_eq!(steve.lock_inventory().slot(36), Item::new(3, 0, 1));
    expect_packet(&rx, |p| match p {
      cb::Packet::SetSlot { wid: 0, slot: 36, item } if *item == Item::new(3, 0, 1) => Some(()),
      _ => None,
    });
  }

  #[test]
  fn spectators_cannot_place() {
    let world = test_world(2);
    let poll = Poll::new().unwrap();
    let (_rx, steve) = join(&world, &poll, "Steve");
    steve.set_game_mode(GameMode::Spectator);

    let h = world.surface_height(2, 2);
    give(&steve, Item::new(1, 0, 1));
    packet::handle(&world, &steve, sb::Packet::BlockPlace {
      pos:    Pos::new(2, h, 2),
      face:   1,
      held:   Item::new(1, 0, 1),
      cursor: (8, 16, 8),
    });
    assert_eq!(world.get_block(Pos::new(2, h + 1, 2)), 0);
    assert_eq!(steve.held_item(), Item::new(1, 0, 1));
  }
}
