//! Per-connection player state. The accept loop owns the `Arc<Player>` for
//! the life of the connection; broadcasters share it through the world's
//! player registry. Every mutable field sits behind its own lock, and no two
//! player locks are ever held at once.

use crate::{
  net::{cb, ConnSender},
  world::{World, ENTITY_TRACKING_RANGE},
};
use parking_lot::Mutex;
use std::{collections::HashSet, fmt, sync::Arc, time::Instant};
use wl_common::{
  math::{ChunkPos, FPos},
  util::{Chat, GameMode, Item, UUID},
};

mod chunks;
mod inventory;
mod tick;

pub use inventory::{PlayerInventory, CRAFTING_WID};

#[derive(Debug, Clone)]
pub(crate) struct PlayerPosition {
  pub curr:      FPos,
  pub yaw:       f32,
  pub pitch:     f32,
  pub on_ground: bool,
  pub crouching: bool,
  pub sprinting: bool,
}

pub(crate) struct Tracking {
  /// Exactly the chunks within the view distance window, except those whose
  /// enqueue was dropped on overflow (the next window recompute re-adds
  /// them).
  pub loaded_chunks: HashSet<ChunkPos>,
  /// Entities (never self) within tracking range as of the last update.
  pub tracked:       HashSet<i32>,
  pub last_chunk:    Option<ChunkPos>,
}

pub(crate) struct KeepAlive {
  /// The token we sent and the time we sent it. Cleared when the client
  /// echoes it back.
  pub pending: Option<(i32, Instant)>,
}

pub struct Player {
  eid:      i32,
  username: String,
  uuid:     UUID,
  conn:     ConnSender,
  world:    Arc<World>,

  game_mode: Mutex<GameMode>,
  pos:       Mutex<PlayerPosition>,
  inv:       Mutex<PlayerInventory>,

  pub(crate) tracking: Mutex<Tracking>,
  chunk_queue:         Mutex<Option<crossbeam_channel::Sender<ChunkPos>>>,
  keep_alive:          Mutex<KeepAlive>,
}

impl fmt::Debug for Player {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Player")
      .field("eid", &self.eid)
      .field("username", &self.username)
      .field("uuid", &self.uuid)
      .finish()
  }
}

impl Drop for Player {
  fn drop(&mut self) { info!("dropping player {}", self.username); }
}

impl Player {
  pub fn new(
    eid: i32,
    username: String,
    uuid: UUID,
    conn: ConnSender,
    world: Arc<World>,
    pos: FPos,
    game_mode: GameMode,
  ) -> Arc<Self> {
    Arc::new(Player {
      eid,
      username,
      uuid,
      conn,
      world,
      game_mode: Mutex::new(game_mode),
      pos: Mutex::new(PlayerPosition {
        curr:      pos,
        yaw:       0.0,
        pitch:     0.0,
        on_ground: false,
        crouching: false,
        sprinting: false,
      }),
      inv: Mutex::new(PlayerInventory::new()),
      tracking: Mutex::new(Tracking {
        loaded_chunks: HashSet::new(),
        tracked:       HashSet::new(),
        last_chunk:    None,
      }),
      chunk_queue: Mutex::new(None),
      keep_alive: Mutex::new(KeepAlive { pending: None }),
    })
  }

  pub fn id(&self) -> i32 { self.eid }
  pub fn username(&self) -> &str { &self.username }
  pub fn uuid(&self) -> UUID { self.uuid }
  pub fn world(&self) -> &Arc<World> { &self.world }

  pub fn game_mode(&self) -> GameMode { *self.game_mode.lock() }

  pub fn pos(&self) -> FPos { self.pos.lock().curr }

  pub fn pos_look(&self) -> (FPos, f32, f32) {
    let pos = self.pos.lock();
    (pos.curr, pos.yaw, pos.pitch)
  }

  pub fn yaw(&self) -> f32 { self.pos.lock().yaw }

  /// The metadata flag byte other clients see: crouching, sprinting, and
  /// invisibility for spectators.
  pub fn entity_flags(&self) -> u8 {
    let pos = self.pos.lock();
    let mut flags = 0;
    if pos.crouching {
      flags |= 0x02;
    }
    if pos.sprinting {
      flags |= 0x08;
    }
    drop(pos);
    if self.game_mode() == GameMode::Spectator {
      flags |= 0x20;
    }
    flags
  }

  pub fn held_item(&self) -> Item { self.inv.lock().held_item() }

  pub fn lock_inventory(&self) -> parking_lot::MutexGuard<'_, PlayerInventory> { self.inv.lock() }

  /// Queues a packet for this player. Packets from one thread arrive in
  /// order; a dead connection just swallows them.
  pub fn send(&self, p: cb::Packet) { self.conn.send(p); }

  /// Kicks the player: the reason goes out first, then the connection is
  /// flushed and closed.
  pub fn disconnect(&self, reason: Chat) {
    self.send(cb::Packet::Disconnect { reason });
    self.conn.close();
  }

  // ===== Join / leave =====

  /// Runs the play-phase init sequence. Called once, right after login
  /// success, with the player already in the world's registry.
  pub(crate) fn join(self: &Arc<Self>) {
    let world = &self.world;
    let (pos, yaw, pitch) = self.pos_look();

    self.send(cb::Packet::JoinGame {
      eid:         self.eid,
      game_mode:   self.game_mode(),
      max_players: world.config().max_players.min(255) as u8,
    });
    self.send(cb::Packet::SpawnPosition { pos: pos.block() });
    self.send_abilities();
    self.send(cb::Packet::WindowItems { wid: 0, items: self.inv.lock().window_items(0) });

    // The tab list: us to everyone (including us), and everyone else to us.
    world.broadcast_all(cb::Packet::PlayerList {
      action: cb::PlayerListAction::Add(vec![cb::PlayerInfo {
        uuid:      self.uuid,
        name:      self.username.clone(),
        game_mode: self.game_mode(),
        ping:      0,
      }]),
    });
    let others: Vec<cb::PlayerInfo> = world
      .player_list()
      .iter()
      .filter(|p| p.id() != self.eid)
      .map(|p| cb::PlayerInfo {
        uuid:      p.uuid(),
        name:      p.username().to_string(),
        game_mode: p.game_mode(),
        ping:      0,
      })
      .collect();
    if !others.is_empty() {
      self.send(cb::Packet::PlayerList { action: cb::PlayerListAction::Add(others) });
    }

    // Stream the spawn window, then put the player at the spawn point.
    self.start_chunk_worker();
    self.update_chunks();
    self.send(cb::Packet::SetPosLook { pos, yaw, pitch });

    // Everyone in range sees us; we see everyone in range.
    self.update_tracking();
    world.update_entity_viewers(self.eid, pos);
  }

  /// Tears down per-player tasks. The world removes us from its registry
  /// before calling this.
  pub(crate) fn leave(&self) {
    // Dropping the sender ends the chunk worker.
    self.chunk_queue.lock().take();
  }

  pub fn send_abilities(&self) {
    let mode = self.game_mode();
    self.send(cb::Packet::PlayerAbilities {
      invulnerable:  mode == GameMode::Creative || mode == GameMode::Spectator,
      flying:        mode == GameMode::Spectator,
      allow_flying:  mode == GameMode::Creative || mode == GameMode::Spectator,
      instant_break: mode == GameMode::Creative,
    })
  }

  /// Switches game mode: tells the client, refreshes abilities, and updates
  /// what everyone else sees of us.
  pub fn set_game_mode(&self, mode: GameMode) {
    *self.game_mode.lock() = mode;
    self.send(cb::Packet::ChangeGameState { reason: 3, value: mode.id() as f32 });
    self.send_abilities();
    self.world.broadcast_all(cb::Packet::PlayerList {
      action: cb::PlayerListAction::UpdateGameMode(vec![(self.uuid, mode)]),
    });
    self.world.broadcast_trackers(self.eid, cb::Packet::EntityFlags {
      eid:   self.eid,
      flags: self.entity_flags(),
    });
  }

  /// Tries to merge a dropped stack into the inventory. All or nothing: a
  /// stack that doesn't fully fit stays on the ground. Slot updates go to
  /// the client on success.
  pub fn try_pickup(&self, item: Item) -> bool {
    let changed = {
      let mut inv = self.inv.lock();
      let before = inv.snapshot();
      let (changed, leftover) = inv.add_item(item);
      if leftover > 0 {
        inv.restore(before);
        return false;
      }
      changed.into_iter().map(|i| (i, inv.slot(i))).collect::<Vec<_>>()
    };
    if changed.is_empty() {
      return false;
    }
    for (slot, item) in changed {
      self.send(cb::Packet::SetSlot { wid: 0, slot: slot as i16, item });
    }
    true
  }

  // ===== Tracking =====

  pub fn has_chunk_loaded(&self, pos: ChunkPos) -> bool {
    self.tracking.lock().loaded_chunks.contains(&pos)
  }

  pub fn is_tracking(&self, eid: i32) -> bool { self.tracking.lock().tracked.contains(&eid) }

  /// Starts tracking the entity: marks it and sends its spawn packets. Does
  /// nothing if it is already tracked.
  pub fn start_tracking(&self, eid: i32, spawn: Vec<cb::Packet>) {
    if eid == self.eid || !self.tracking.lock().tracked.insert(eid) {
      return;
    }
    for p in spawn {
      self.send(p);
    }
  }

  /// Stops tracking the entity and destroys it client side. Does nothing if
  /// it was not tracked.
  pub fn stop_tracking(&self, eid: i32) {
    if !self.tracking.lock().tracked.remove(&eid) {
      return;
    }
    self.send(cb::Packet::DestroyEntities { eids: vec![eid] });
  }

  /// Rebuilds this player's tracked set from scratch: after this, it holds
  /// exactly the live entities within tracking range.
  pub fn update_tracking(&self) {
    let my_pos = self.pos();
    let world = &self.world;

    let mut in_range: HashSet<i32> = HashSet::new();
    for p in world.player_list() {
      if p.id() != self.eid && my_pos.dist(p.pos()) <= ENTITY_TRACKING_RANGE {
        in_range.insert(p.id());
      }
    }
    for (eid, pos) in world.entity_positions() {
      if my_pos.dist(pos) <= ENTITY_TRACKING_RANGE {
        in_range.insert(eid);
      }
    }

    let to_drop: Vec<i32> =
      self.tracking.lock().tracked.difference(&in_range).copied().collect();
    for eid in to_drop {
      self.stop_tracking(eid);
    }
    for eid in in_range {
      if !self.is_tracking(eid) {
        self.start_tracking(eid, world.spawn_packets(eid));
      }
    }
  }
}
