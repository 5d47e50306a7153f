use axum::{
  extract::ws::{Message, WebSocket},
  extract::{State, WebSocketUpgrade},
  http::{Method, StatusCode},
  response::IntoResponse,
  routing::{get, post},
  Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod game;
mod protocol;
mod registry;

use game::constants::{DEFAULT_BROADCAST_HZ, DEFAULT_PLAYER_GLYPH, DEFAULT_TICK_HZ};
use game::input::{sanitize_glyph, sanitize_player_name};
use game::room::{now_millis, PlayerProfile, Room};
use protocol::{ClientMessage, ServerMessage};
use registry::{RoomRegistry, SimulationLoops};

#[derive(Clone)]
struct AppState {
  registry: Arc<RoomRegistry>,
  loops: Arc<SimulationLoops>,
  admin_commands: bool,
}

#[derive(Debug, Serialize)]
struct OkResponse {
  ok: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
  ok: bool,
  error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatesPayload {
  tick_hz: Option<u32>,
  broadcast_hz: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let admin_commands = env::var("ENABLE_ADMIN_COMMANDS")
    .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE"))
    .unwrap_or(false);

  let registry = Arc::new(RoomRegistry::new());
  let loops = Arc::new(SimulationLoops::new(Arc::clone(&registry)));
  loops.start(DEFAULT_TICK_HZ, DEFAULT_BROADCAST_HZ);

  let state = Arc::new(AppState {
    registry,
    loops,
    admin_commands,
  });

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST])
    .allow_headers(Any);

  let mut app: Router<Arc<AppState>> = Router::new()
    .route("/api/health", get(health))
    .route("/api/rooms", get(rooms_get))
    .route("/api/ws", get(ws_handler))
    .layer(cors);

  if admin_commands {
    app = app.route("/api/admin/rates", post(admin_rates));
  }

  let app: Router = app.with_state(state);

  let port: u16 = env::var("PORT")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(8787);

  let address = format!("0.0.0.0:{port}");
  tracing::info!("listening on {address}");

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

async fn health() -> impl IntoResponse {
  Json(OkResponse { ok: true })
}

async fn rooms_get(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.registry.list_public().await)
}

async fn admin_rates(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<RatesPayload>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
  if !state.admin_commands {
    return (
      StatusCode::FORBIDDEN,
      Json(ErrorResponse {
        ok: false,
        error: "Admin commands disabled".to_string(),
      }),
    )
      .into_response();
  }
  let Json(payload) = match payload {
    Ok(payload) => payload,
    Err(_) => {
      return (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
          ok: false,
          error: "Invalid JSON".to_string(),
        }),
      )
        .into_response();
    }
  };
  if let Some(hz) = payload.tick_hz {
    state.loops.set_tick_rate(hz);
  }
  if let Some(hz) = payload.broadcast_hz {
    state.loops.set_broadcast_rate(hz);
  }
  (StatusCode::OK, Json(OkResponse { ok: true })).into_response()
}

async fn ws_handler(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn default_player_name() -> String {
  let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
  format!("Player-{suffix:04}")
}

// Red hues stay reserved for enemies; shift any draw out of the red band.
fn random_player_color() -> String {
  let mut hue: u32 = rand::thread_rng().gen_range(0..360);
  if hue >= 330 || hue <= 30 {
    hue = (hue + 60) % 360;
  }
  format!("hsl({hue}, 70%, 50%)")
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
  let (mut sender, mut receiver) = socket.split();
  let (tx, mut rx) = mpsc::unbounded_channel::<String>();

  let send_task = tokio::spawn(async move {
    while let Some(payload) = rx.recv().await {
      if sender.send(Message::Text(payload)).await.is_err() {
        break;
      }
    }
  });

  let mut profile = PlayerProfile {
    id: uuid::Uuid::new_v4().to_string(),
    name: default_player_name(),
    color: random_player_color(),
    glyph: DEFAULT_PLAYER_GLYPH.to_string(),
  };
  send_message(&tx, &ServerMessage::Init {
    id: profile.id.clone(),
  });

  let mut current_room: Option<Arc<Room>> = None;

  while let Some(result) = receiver.next().await {
    let Ok(message) = result else { break };
    match message {
      Message::Text(text) => {
        let Ok(message) = serde_json::from_str::<ClientMessage>(&text) else { continue };
        handle_client_message(&state, &tx, &mut profile, &mut current_room, message).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }

  if let Some(room) = current_room {
    if room.remove_player(&profile.id, now_millis()).await {
      state.registry.remove_room(room.id());
    }
  }
  send_task.abort();
}

async fn handle_client_message(
  state: &Arc<AppState>,
  tx: &mpsc::UnboundedSender<String>,
  profile: &mut PlayerProfile,
  current_room: &mut Option<Arc<Room>>,
  message: ClientMessage,
) {
  match message {
    ClientMessage::CreateRoom { public } => {
      if current_room.is_some() {
        return;
      }
      let room = state.registry.create_room(public);
      room.join(profile.clone(), tx.clone(), now_millis()).await;
      *current_room = Some(room);
    }
    ClientMessage::JoinRoom { room_id } => {
      if current_room.is_some() {
        return;
      }
      match state.registry.find(&room_id) {
        Some(room) => {
          room.join(profile.clone(), tx.clone(), now_millis()).await;
          *current_room = Some(room);
        }
        None => {
          send_message(tx, &ServerMessage::RoomError {
            message: "Room not found".to_string(),
          });
        }
      }
    }
    ClientMessage::SetName { ref name } if current_room.is_none() => {
      profile.name = sanitize_player_name(name, &profile.name.clone());
    }
    ClientMessage::SetGlyph { ref glyph } if current_room.is_none() => {
      profile.glyph = sanitize_glyph(glyph, &profile.glyph.clone());
    }
    other => {
      if let Some(room) = current_room {
        room.handle_message(&profile.id, other, now_millis()).await;
      }
    }
  }
}

fn send_message(tx: &mpsc::UnboundedSender<String>, message: &ServerMessage) {
  if let Ok(payload) = serde_json::to_string(message) {
    let _ = tx.send(payload);
  }
}
