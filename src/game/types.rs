use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
  pub x: f64,
  pub y: f64,
}

impl Vec2 {
  pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
}

#[derive(Debug, Clone)]
pub struct Player {
  pub id: String,
  pub name: String,
  pub color: String,
  pub glyph: String,
  pub x: f64,
  pub y: f64,
  pub vx: f64,
  pub vy: f64,
  pub r: f64,
  pub alive: bool,
  pub score: i64,
  /// Desired direction, unit length or zero. Overwritten by every accepted
  /// input message and read by the next tick.
  pub input: Vec2,
  pub last_input_at: i64,
  pub speed_boost_until: i64,
  pub shield: bool,
  pub invincible_until: i64,
  pub shrink_until: i64,
  pub dash_until: i64,
  pub dash_ready_at: i64,
}

#[derive(Debug, Clone)]
pub struct Enemy {
  pub id: String,
  pub x: f64,
  pub y: f64,
  pub vx: f64,
  pub vy: f64,
  pub r: f64,
  pub color: String,
  pub glyph: String,
  pub spawn_safe_until: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerupKind {
  Freeze,
  Speed,
  Immortal,
  Bomb,
  Shrink,
}

pub const POWERUP_KINDS: [PowerupKind; 5] = [
  PowerupKind::Freeze,
  PowerupKind::Speed,
  PowerupKind::Immortal,
  PowerupKind::Bomb,
  PowerupKind::Shrink,
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Powerup {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: PowerupKind,
  pub x: f64,
  pub y: f64,
  pub r: f64,
  pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointPickup {
  pub id: String,
  pub x: f64,
  pub y: f64,
  pub r: f64,
  pub value: i64,
  pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explosion {
  pub id: String,
  pub x: f64,
  pub y: f64,
  pub radius: f64,
  pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Standing {
  pub id: String,
  pub name: String,
  pub score: i64,
}
