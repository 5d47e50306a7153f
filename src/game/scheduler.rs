use super::constants::{
  POINT_SPAWN_MAX_MS, POINT_SPAWN_MIN_MS, POINT_VALUE_WEIGHTS, POWERUP_SPAWN_MAX_MS,
  POWERUP_SPAWN_MIN_MS,
};
use super::types::{PowerupKind, POWERUP_KINDS};
use rand::Rng;

/// Weighted discrete draw: one uniform sample walked through the cumulative
/// weight table, heavily favoring the lowest value.
pub fn pick_point_value<R: Rng>(rng: &mut R) -> i64 {
  let total: f64 = POINT_VALUE_WEIGHTS.iter().map(|(_, w)| w).sum();
  let mut roll = rng.gen::<f64>() * total;
  for (value, weight) in POINT_VALUE_WEIGHTS {
    roll -= weight;
    if roll <= 0.0 {
      return value;
    }
  }
  POINT_VALUE_WEIGHTS[0].0
}

pub fn pick_powerup_kind<R: Rng>(rng: &mut R) -> PowerupKind {
  POWERUP_KINDS[rng.gen_range(0..POWERUP_KINDS.len())]
}

/// Powerup frequency drops as the room fills: full rate for duos, half for
/// mid-size rooms, a third beyond.
pub fn powerup_rate_divisor(player_count: usize) -> i64 {
  if player_count <= 2 {
    1
  } else if player_count <= 6 {
    2
  } else {
    3
  }
}

pub fn roll_powerup_delay<R: Rng>(rng: &mut R, player_count: usize) -> i64 {
  let base = rng.gen_range(POWERUP_SPAWN_MIN_MS..=POWERUP_SPAWN_MAX_MS);
  base * powerup_rate_divisor(player_count)
}

pub fn roll_point_delay<R: Rng>(rng: &mut R) -> i64 {
  rng.gen_range(POINT_SPAWN_MIN_MS..=POINT_SPAWN_MAX_MS)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn point_values_come_from_the_weight_table() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
      let value = pick_point_value(&mut rng);
      assert!(POINT_VALUE_WEIGHTS.iter().any(|(v, _)| *v == value));
    }
  }

  #[test]
  fn low_value_dominates_the_draw() {
    let mut rng = rand::thread_rng();
    let ones = (0..2000)
      .filter(|_| pick_point_value(&mut rng) == 1)
      .count();
    // 0.85 expected; a wide margin keeps this stable.
    assert!(ones > 1400, "expected ones to dominate, got {ones}");
  }

  #[test]
  fn rate_divisor_breakpoints() {
    assert_eq!(powerup_rate_divisor(1), 1);
    assert_eq!(powerup_rate_divisor(2), 1);
    assert_eq!(powerup_rate_divisor(3), 2);
    assert_eq!(powerup_rate_divisor(6), 2);
    assert_eq!(powerup_rate_divisor(7), 3);
    assert_eq!(powerup_rate_divisor(40), 3);
  }

  #[test]
  fn powerup_delay_respects_window_and_scaling() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
      let delay = roll_powerup_delay(&mut rng, 2);
      assert!((POWERUP_SPAWN_MIN_MS..=POWERUP_SPAWN_MAX_MS).contains(&delay));
      let scaled = roll_powerup_delay(&mut rng, 10);
      assert!(scaled >= POWERUP_SPAWN_MIN_MS * 3);
      assert!(scaled <= POWERUP_SPAWN_MAX_MS * 3);
    }
  }

  #[test]
  fn point_delay_respects_window() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
      let delay = roll_point_delay(&mut rng);
      assert!((POINT_SPAWN_MIN_MS..=POINT_SPAWN_MAX_MS).contains(&delay));
    }
  }
}
