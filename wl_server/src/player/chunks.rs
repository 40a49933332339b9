//! The per-player chunk stream. When the player crosses a chunk boundary the
//! view window is recomputed; new chunks are queued nearest-first for a
//! worker thread to serialize and send, and chunks that fell out of the
//! window are unloaded client side.

use super::Player;
use crate::net::cb;
use std::{sync::Arc, thread};
use wl_common::math::ChunkPos;

/// The queue bound. A full window is (2V+1)^2 chunks, so this holds a few
/// boundary crossings' worth; overflow drops the chunk, and a later window
/// recompute picks it up again.
const QUEUE_LIMIT: usize = 1024;

/// The chunks within the Chebyshev view window around `center`, sorted by
/// squared euclidean distance to it (nearest first).
pub(crate) fn desired_window(center: ChunkPos, view_distance: i32) -> Vec<ChunkPos> {
  let mut out = Vec::with_capacity(((2 * view_distance + 1) * (2 * view_distance + 1)) as usize);
  for x in center.x() - view_distance..=center.x() + view_distance {
    for z in center.z() - view_distance..=center.z() + view_distance {
      out.push(ChunkPos::new(x, z));
    }
  }
  out.sort_by_key(|c| c.dist_squared(center));
  out
}

impl Player {
  /// Spawns the worker that drains this player's chunk queue. One worker per
  /// player; it exits when the queue's sender is dropped on leave.
  pub(crate) fn start_chunk_worker(self: &Arc<Self>) {
    let (tx, rx) = crossbeam_channel::bounded::<ChunkPos>(QUEUE_LIMIT);
    *self.chunk_queue.lock() = Some(tx);

    let player = self.clone();
    let world = self.world.clone();
    let name = format!("chunks-{}", self.username());
    let res = thread::Builder::new().name(name).spawn(move || {
      while let Ok(pos) = rx.recv() {
        // The player may have moved on before we got here.
        if !player.has_chunk_loaded(pos) {
          continue;
        }
        let (bit_mask, data) = world.serialize_chunk(pos);
        player.send(cb::Packet::ChunkData { x: pos.x(), z: pos.z(), bit_mask, data });
      }
    });
    if let Err(e) = res {
      error!("{}: could not spawn chunk worker: {}", self.username(), e);
    }
  }

  /// Recomputes the view window around the player's current chunk, queueing
  /// loads nearest-first and unloading what fell out of range. Cheap when
  /// the player hasn't crossed a chunk boundary.
  pub fn update_chunks(&self) {
    let center = self.pos().chunk();
    let view_distance = self.world.view_distance();

    let mut unload = vec![];
    {
      let mut t = self.tracking.lock();
      if t.last_chunk == Some(center) {
        return;
      }
      t.last_chunk = Some(center);

      let desired = desired_window(center, view_distance);
      let queue = self.chunk_queue.lock();

      for pos in &desired {
        if t.loaded_chunks.insert(*pos) {
          let dropped = match queue.as_ref() {
            Some(q) => q.try_send(*pos).is_err(),
            None => true,
          };
          if dropped {
            // Forget it again, so the next window recompute re-queues it.
            t.loaded_chunks.remove(pos);
          }
        }
      }

      t.loaded_chunks.retain(|pos| {
        if pos.chebyshev_dist(center) <= view_distance {
          true
        } else {
          unload.push(*pos);
          false
        }
      });
    }

    for pos in unload {
      // Empty continuous chunk data is the unload sentinel.
      self.send(cb::Packet::ChunkData { x: pos.x(), z: pos.z(), bit_mask: 0, data: vec![] });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn window_shape_and_order() {
    let center = ChunkPos::new(6, 6);
    let window = desired_window(center, 8);
    assert_eq!(window.len(), 17 * 17);
    assert_eq!(window[0], center);
    // Every chunk in the Chebyshev square is present exactly once.
    let set: std::collections::HashSet<_> = window.iter().copied().collect();
    assert_eq!(set.len(), window.len());
    for x in -2..=14 {
      for z in -2..=14 {
        assert!(set.contains(&ChunkPos::new(x, z)));
      }
    }
    // Nearest first.
    for pair in window.windows(2) {
      assert!(pair[0].dist_squared(center) <= pair[1].dist_squared(center));
    }
  }
}
