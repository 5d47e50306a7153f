use crate::game::settings::{Settings, SettingsPatch};
use crate::game::types::{Explosion, PointPickup, Powerup, PowerupKind, Standing};
use serde::{Deserialize, Serialize};

/// Inbound message union. Payloads are validated here at the boundary; the
/// simulation never sees a malformed message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
  CreateRoom {
    #[serde(default)]
    public: bool,
  },
  JoinRoom {
    #[serde(rename = "roomId")]
    room_id: String,
  },
  SetName {
    name: String,
  },
  SetGlyph {
    glyph: String,
  },
  Input {
    x: f64,
    y: f64,
  },
  Dash,
  HostStart,
  UpdateSettings {
    #[serde(flatten)]
    settings: SettingsPatch,
  },
  HostRestart,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
  Init {
    id: String,
  },
  RoomJoined {
    #[serde(rename = "roomId")]
    room_id: String,
    #[serde(rename = "hostId")]
    host_id: Option<String>,
  },
  RoomError {
    message: String,
  },
  State {
    #[serde(flatten)]
    state: StateSnapshot,
  },
  SettingsUpdated {
    settings: Settings,
  },
  PowerupAdded {
    powerup: Powerup,
  },
  PowerupRemoved {
    id: String,
    #[serde(rename = "pickedBy", skip_serializing_if = "Option::is_none")]
    picked_by: Option<String>,
    kind: PowerupKind,
  },
  PointAdded {
    point: PointPickup,
  },
  PointRemoved {
    id: String,
    #[serde(rename = "pickedBy", skip_serializing_if = "Option::is_none")]
    picked_by: Option<String>,
  },
  EntitiesCleared,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WorldBounds {
  pub width: f64,
  pub height: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
  pub id: String,
  pub name: String,
  pub x: f64,
  pub y: f64,
  pub r: f64,
  pub color: String,
  pub glyph: String,
  pub alive: bool,
  pub score: i64,
  pub speed_boost_until: i64,
  pub shield: bool,
  pub shrink_until: i64,
  pub dash_until: i64,
  pub dash_ready_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyView {
  pub id: String,
  pub x: f64,
  pub y: f64,
  pub r: f64,
  pub color: String,
  pub glyph: String,
  pub spawn_safe_until: i64,
}

/// Broadcast world state. The lean periodic form omits the powerup/point
/// arrays (lifecycle deltas carry those); the full form sent on join
/// includes them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
  pub now: i64,
  pub room_id: String,
  pub host_id: Option<String>,
  pub world: WorldBounds,
  pub round_running: bool,
  pub game_over: bool,
  pub freeze_until: i64,
  pub winner_announcement_until: i64,
  pub final_standings: Vec<Standing>,
  pub explosions: Vec<Explosion>,
  pub settings: Settings,
  pub players: Vec<PlayerView>,
  pub enemies: Vec<EnemyView>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub powerups: Option<Vec<Powerup>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub points: Option<Vec<PointPickup>>,
}

/// One row of the public room listing, polled over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
  pub room_id: String,
  pub round_running: bool,
  pub game_over: bool,
  pub player_count: usize,
  pub players: Vec<Standing>,
}
