use super::constants::{WORLD_HEIGHT, WORLD_WIDTH};
use super::types::Vec2;
use rand::Rng;

pub fn length(v: Vec2) -> f64 {
  (v.x * v.x + v.y * v.y).sqrt()
}

pub fn normalize(v: Vec2) -> Vec2 {
  let len = length(v);
  if !len.is_finite() || len == 0.0 {
    return Vec2 { x: 0.0, y: 0.0 };
  }
  Vec2 {
    x: v.x / len,
    y: v.y / len,
  }
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
  value.min(max).max(min)
}

/// Uniform position fully inside the world for a body of the given radius.
pub fn random_spawn(radius: f64) -> Vec2 {
  let mut rng = rand::thread_rng();
  Vec2 {
    x: radius + rng.gen::<f64>() * (WORLD_WIDTH - 2.0 * radius),
    y: radius + rng.gen::<f64>() * (WORLD_HEIGHT - 2.0 * radius),
  }
}
