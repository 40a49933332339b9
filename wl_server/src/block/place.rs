//! Placement metadata. When a block is placed, the client only tells us the
//! target, the face, and the cursor position; the metadata that makes the
//! block point the right way is computed server side and is visible to every
//! client, so these tables have to match what the stock client expects.

use wl_common::{math::Pos, util::Face};

/// Snaps a yaw angle to one of the four cardinal directions:
/// 0 = south, 1 = west, 2 = north, 3 = east.
pub fn yaw_to_direction(yaw: f32) -> u8 {
  ((yaw * 4.0 / 360.0 + 0.5).floor() as i32).rem_euclid(4) as u8
}

/// The block adjacent to `pos` out of the given face.
pub fn face_offset(pos: Pos, face: u8) -> Pos {
  match Face::from_id(face) {
    Some(f) => pos + f.as_dir(),
    None => pos,
  }
}

/// Stairs come in many materials but share one metadata layout.
fn is_stairs(id: u8) -> bool {
  matches!(id, 53 | 67 | 108 | 109 | 114 | 128 | 134 | 135 | 136 | 156 | 163 | 164 | 180)
}

/// Computes the metadata for a freshly placed block. `damage` is the damage
/// value of the held item, `cursor_y` is in 1/16ths of a block.
pub fn placement_meta(id: u8, damage: i16, face: u8, cursor_y: u8, yaw: f32) -> u8 {
  let dir = yaw_to_direction(yaw);
  match id {
    // Doors. The hinge side is left to the client's default.
    64 | 71 | 193..=197 => match dir {
      0 => 1,
      1 => 2,
      2 => 3,
      _ => 0,
    },
    _ if is_stairs(id) => {
      let base = match dir {
        0 => 2,
        1 => 1,
        2 => 3,
        _ => 0,
      };
      // Upside down when placed on a ceiling or the top half of a side face.
      if face == 0 || (face != 1 && cursor_y >= 8) {
        base | 4
      } else {
        base
      }
    }
    // Torches point away from the block they hang on.
    50 | 75 | 76 => match face {
      1 => 5,
      2 => 4,
      3 => 3,
      4 => 2,
      5 => 1,
      _ => 0,
    },
    // Levers encode both the mount face and, on floors and ceilings, the
    // axis the handle flips along.
    69 => {
      let north_south = dir == 0 || dir == 2;
      match face {
        1 => {
          if north_south {
            5
          } else {
            6
          }
        }
        0 => {
          if north_south {
            7
          } else {
            0
          }
        }
        2 => 4,
        3 => 3,
        4 => 2,
        _ => 1,
      }
    }
    // Ladders and wall signs mount flat on a wall face.
    65 | 68 => match face {
      2..=5 => face,
      _ => 2,
    },
    77 | 143 => match face {
      0 => 0,
      1 => 5,
      2 => 4,
      3 => 3,
      4 => 2,
      _ => 1,
    },
    // Furnaces, dispensers, droppers and chests. Note that this table swaps
    // west and east relative to the door/stair table; the client's models
    // depend on it, so it stays swapped.
    23 | 61 | 158 | 54 | 130 | 146 => match dir {
      0 => 2,
      1 => 5,
      2 => 3,
      _ => 4,
    },
    86 | 91 => (dir + 2) % 4,
    // Logs keep their wood variant in the low bits and the axis above.
    17 | 162 => {
      let wood = (damage & 3) as u8;
      match face {
        2 | 3 => wood | 8,
        4 | 5 => wood | 4,
        _ => wood,
      }
    }
    44 | 126 => {
      let kind = (damage & 7) as u8;
      if face == 0 || (face != 1 && cursor_y >= 8) {
        kind | 8
      } else {
        kind
      }
    }
    // Standing signs get a full 16 directions.
    63 => (((yaw + 180.0) * 16.0 / 360.0 + 0.5).floor() as i32).rem_euclid(16) as u8,
    154 => match face {
      2..=5 => face,
      _ => 0,
    },
    145 => dir & 3,
    93 | 149 => dir,
    // Everything else passes the colour/variant straight through.
    _ => (damage & 0x0f) as u8,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn yaw_directions() {
    assert_eq!(yaw_to_direction(0.0), 0);
    assert_eq!(yaw_to_direction(90.0), 1);
    assert_eq!(yaw_to_direction(180.0), 2);
    assert_eq!(yaw_to_direction(270.0), 3);
    assert_eq!(yaw_to_direction(-90.0), 3);
    assert_eq!(yaw_to_direction(360.0), 0);
  }

  #[test]
  fn face_offsets() {
    let p = Pos::new(10, 20, 30);
    assert_eq!(face_offset(p, 0), Pos::new(10, 19, 30));
    assert_eq!(face_offset(p, 1), Pos::new(10, 21, 30));
    assert_eq!(face_offset(p, 2), Pos::new(10, 20, 29));
    assert_eq!(face_offset(p, 3), Pos::new(10, 20, 31));
    assert_eq!(face_offset(p, 4), Pos::new(9, 20, 30));
    assert_eq!(face_offset(p, 5), Pos::new(11, 20, 30));
  }

  #[test]
  fn stairs() {
    assert_eq!(placement_meta(53, 0, 1, 0, 0.0), 2);
    assert_eq!(placement_meta(53, 0, 0, 0, 0.0), 6);
    assert_eq!(placement_meta(53, 0, 1, 0, 90.0), 1);
    // Top half of a side face flips them upside down.
    assert_eq!(placement_meta(53, 0, 3, 12, 0.0), 6);
  }

  #[test]
  fn torches() {
    assert_eq!(placement_meta(50, 0, 2, 0, 0.0), 4);
    assert_eq!(placement_meta(50, 0, 5, 0, 0.0), 1);
    assert_eq!(placement_meta(50, 0, 1, 0, 0.0), 5);
  }

  #[test]
  fn levers() {
    assert_eq!(placement_meta(69, 0, 1, 0, 0.0), 5);
    assert_eq!(placement_meta(69, 0, 1, 0, 270.0), 6);
    assert_eq!(placement_meta(69, 0, 0, 0, 0.0), 7);
  }

  #[test]
  fn logs() {
    assert_eq!(placement_meta(17, 1, 2, 0, 0.0), 9);
    assert_eq!(placement_meta(17, 1, 4, 0, 0.0), 5);
    assert_eq!(placement_meta(17, 1, 1, 0, 0.0), 1);
  }

  #[test]
  fn slabs() {
    assert_eq!(placement_meta(44, 3, 1, 4, 0.0), 3);
    assert_eq!(placement_meta(44, 3, 0, 0, 0.0), 11);
    assert_eq!(placement_meta(44, 3, 3, 12, 0.0), 11);
  }

  #[test]
  fn furnaces_and_chests() {
    assert_eq!(placement_meta(61, 0, 1, 0, 0.0), 2);
    assert_eq!(placement_meta(61, 0, 1, 0, 180.0), 3);
    // The west/east swap relative to doors is intentional.
    assert_eq!(placement_meta(61, 0, 1, 0, 90.0), 5);
    assert_eq!(placement_meta(54, 0, 1, 0, 270.0), 4);
  }

  #[test]
  fn pumpkins() {
    assert_eq!(placement_meta(86, 0, 1, 0, 0.0), 2);
    assert_eq!(placement_meta(86, 0, 1, 0, 270.0), 1);
  }

  #[test]
  fn doors() {
    assert_eq!(placement_meta(64, 0, 1, 0, 0.0), 1);
    assert_eq!(placement_meta(64, 0, 1, 0, 90.0), 2);
    assert_eq!(placement_meta(64, 0, 1, 0, 180.0), 3);
    assert_eq!(placement_meta(64, 0, 1, 0, 270.0), 0);
  }

  #[test]
  fn variant_pass_through() {
    assert_eq!(placement_meta(35, 14, 1, 0, 0.0), 14);
    assert_eq!(placement_meta(159, 6, 1, 0, 0.0), 6);
  }
}
