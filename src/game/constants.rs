pub const WORLD_WIDTH: f64 = 900.0;
pub const WORLD_HEIGHT: f64 = 1100.0;

pub const DEFAULT_TICK_HZ: u32 = 60;
pub const DEFAULT_BROADCAST_HZ: u32 = 30;

pub const POWERUP_RADIUS: f64 = 18.0;
pub const POWERUP_LIFETIME_MS: i64 = 10_000;
pub const POWERUP_SPAWN_MIN_MS: i64 = 10_000;
pub const POWERUP_SPAWN_MAX_MS: i64 = 20_000;

pub const POINT_RADIUS: f64 = 14.0;
pub const POINT_LIFETIME_MS: i64 = 5_000;
pub const POINT_SPAWN_MIN_MS: i64 = 5_000;
pub const POINT_SPAWN_MAX_MS: i64 = 10_000;

pub const FREEZE_DURATION_MS: i64 = 3_000;
pub const SPEED_BOOST_MULTIPLIER: f64 = 1.5;
pub const SPEED_BOOST_DURATION_MS: i64 = 10_000;
pub const SHRINK_DURATION_MS: i64 = 10_000;
pub const SHRINK_FACTOR: f64 = 0.5;
pub const SHRINK_MIN_RADIUS: f64 = 8.0;

// Blast radius is enemy radius times this; the original drifted between
// values across revisions, so it stays a tunable rather than a contract.
pub const BOMB_BLAST_RADIUS_MULT: f64 = 5.0;

pub const ENEMY_SPAWN_SAFE_MS: i64 = 1_000;
pub const SHIELD_INVINCIBLE_MS: i64 = 450;
pub const SHIELD_BOUNCE_MULTIPLIER: f64 = 1.6;
pub const SHIELD_SEPARATION_EPSILON: f64 = 2.0;
pub const SEPARATION_EPSILON: f64 = 0.5;
pub const DISTANCE_EPSILON: f64 = 1e-4;

pub const PLAYER_BUMP_MULTIPLIER: f64 = 1.0;
pub const DASH_BUMP_MULTIPLIER: f64 = 2.0;

pub const DASH_SPEED_MULTIPLIER: f64 = 2.0;
pub const DASH_IMPULSE_MULT: f64 = 2.0;
pub const DASH_MIN_SPEED: f64 = 420.0;
pub const DASH_DURATION_MS: i64 = 250;
pub const DASH_COOLDOWN_MS: i64 = 1_500;

pub const ROUND_START_FREEZE_MS: i64 = 3_000;
pub const ROUND_SEED_ENEMIES: usize = 2;
pub const WINNER_ANNOUNCEMENT_MS: i64 = 3_000;
pub const WINNER_BONUS: i64 = 10;

pub const INPUT_MIN_INTERVAL_MS: i64 = 15;
pub const MAX_EXPLOSION_HISTORY: usize = 6;
pub const MAX_PLAYER_NAME_LENGTH: usize = 24;
pub const MAX_GLYPH_CODEPOINTS: usize = 2;

pub const ROOM_ID_LENGTH: usize = 5;
// No 0/O, 1/I/L: room codes get typed from a phone screen.
pub const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const ENEMY_COLOR: &str = "#e63946";
pub const DEFAULT_PLAYER_GLYPH: &str = "\u{1f642}";

pub const ENEMY_GLYPHS: [&str; 4] = [
  "\u{1f47e}",
  "\u{1f9df}",
  "\u{1f577}\u{fe0f}",
  "\u{1f47b}",
];

pub const POINT_VALUE_WEIGHTS: [(i64, f64); 3] = [(1, 0.85), (2, 0.13), (5, 0.02)];
