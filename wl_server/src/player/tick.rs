//! Movement and liveness. Movement packets mutate the position under its
//! guard, then fan the change out to trackers; keep alives are issued from
//! the world tick and checked off when the client echoes them.

use super::Player;
use crate::net::cb;
use rand::Rng;
use std::time::{Duration, Instant};
use wl_common::math::FPos;

const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(30);

impl Player {
  /// Applies a serverbound movement packet: position and/or look, plus the
  /// on-ground flag. Broadcasts the move to trackers and refreshes the chunk
  /// window and tracking sets if a chunk boundary was crossed.
  pub fn handle_move(
    &self,
    new_pos: Option<(f64, f64, f64)>,
    new_look: Option<(f32, f32)>,
    on_ground: bool,
  ) {
    let (pos, yaw, pitch, crossed_chunk) = {
      let mut p = self.pos.lock();
      let old_chunk = p.curr.chunk();
      if let Some((x, y, z)) = new_pos {
        p.curr = FPos::new(x, y, z);
      }
      if let Some((yaw, pitch)) = new_look {
        p.yaw = yaw % 360.0;
        p.pitch = pitch.clamp(-90.0, 90.0);
      }
      p.on_ground = on_ground;
      (p.curr, p.yaw, p.pitch, p.curr.chunk() != old_chunk)
    };

    if new_pos.is_some() {
      self.world.broadcast_trackers(self.id(), cb::Packet::EntityTeleport {
        eid: self.id(),
        pos,
        yaw,
        pitch,
        on_ground,
      });
    }
    if new_look.is_some() {
      self.world.broadcast_trackers(self.id(), cb::Packet::EntityLook {
        eid: self.id(),
        yaw,
        pitch,
        on_ground,
      });
      self
        .world
        .broadcast_trackers(self.id(), cb::Packet::EntityHeadLook { eid: self.id(), yaw });
    }

    if crossed_chunk {
      self.update_chunks();
    }
    if new_pos.is_some() {
      self.update_tracking();
      self.world.update_entity_viewers(self.id(), pos);
    }
  }

  /// Moves the player from the server side (`/tp`). The client gets a
  /// position packet, trackers get a teleport, and the view window follows.
  pub fn teleport(&self, pos: FPos) {
    let (yaw, pitch) = {
      let mut p = self.pos.lock();
      p.curr = pos;
      (p.yaw, p.pitch)
    };
    self.send(cb::Packet::SetPosLook { pos, yaw, pitch });
    self.world.broadcast_trackers(self.id(), cb::Packet::EntityTeleport {
      eid: self.id(),
      pos,
      yaw,
      pitch,
      on_ground: false,
    });
    self.update_chunks();
    self.update_tracking();
    self.world.update_entity_viewers(self.id(), pos);
  }

  /// Updates the crouch/sprint flags and shows the change to trackers.
  pub fn set_action_flags(&self, crouching: Option<bool>, sprinting: Option<bool>) {
    {
      let mut p = self.pos.lock();
      if let Some(c) = crouching {
        p.crouching = c;
      }
      if let Some(s) = sprinting {
        p.sprinting = s;
      }
    }
    self.world.broadcast_trackers(self.id(), cb::Packet::EntityFlags {
      eid:   self.id(),
      flags: self.entity_flags(),
    });
  }

  // ===== Keep alives =====

  /// Issues a keep alive token, unless one is already outstanding (the
  /// timeout check will catch a client that never answers).
  pub fn send_keep_alive(&self) {
    let mut ka = self.keep_alive.lock();
    if ka.pending.is_some() {
      return;
    }
    let token = crate::RNG.with(|rng| rng.borrow_mut().gen_range(0..i32::MAX));
    ka.pending = Some((token, Instant::now()));
    drop(ka);
    self.send(cb::Packet::KeepAlive { id: token });
  }

  /// Called when the client echoes a keep alive.
  pub fn handle_keep_alive(&self, id: i32) {
    let mut ka = self.keep_alive.lock();
    if let Some((token, _)) = ka.pending {
      if token == id {
        ka.pending = None;
      }
    }
  }

  pub fn keep_alive_timed_out(&self) -> bool {
    match self.keep_alive.lock().pending {
      Some((_, sent)) => sent.elapsed() > KEEP_ALIVE_TIMEOUT,
      None => false,
    }
  }
}
