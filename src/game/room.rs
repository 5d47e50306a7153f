use super::constants::{
  BOMB_BLAST_RADIUS_MULT, DASH_BUMP_MULTIPLIER, DASH_COOLDOWN_MS, DASH_DURATION_MS,
  DASH_IMPULSE_MULT, DASH_MIN_SPEED, DASH_SPEED_MULTIPLIER, ENEMY_COLOR, ENEMY_GLYPHS,
  ENEMY_SPAWN_SAFE_MS, FREEZE_DURATION_MS, INPUT_MIN_INTERVAL_MS, MAX_EXPLOSION_HISTORY,
  PLAYER_BUMP_MULTIPLIER, POINT_LIFETIME_MS, POINT_RADIUS, POWERUP_LIFETIME_MS, POWERUP_RADIUS,
  ROUND_SEED_ENEMIES, ROUND_START_FREEZE_MS, SHIELD_BOUNCE_MULTIPLIER, SHIELD_INVINCIBLE_MS,
  SHIELD_SEPARATION_EPSILON, SHRINK_DURATION_MS, SHRINK_FACTOR, SHRINK_MIN_RADIUS,
  SPEED_BOOST_DURATION_MS,
  SPEED_BOOST_MULTIPLIER, WINNER_ANNOUNCEMENT_MS, WINNER_BONUS, WORLD_HEIGHT, WORLD_WIDTH,
};
use super::input::{parse_input_vector, sanitize_glyph, sanitize_player_name};
use super::math::{length, normalize, random_spawn};
use super::physics::{bounce_off_walls, resolve_circle_collision, Body};
use super::scheduler::{pick_point_value, pick_powerup_kind, roll_point_delay, roll_powerup_delay};
use super::settings::{Settings, SettingsPatch};
use super::types::{
  Enemy, Explosion, Player, PointPickup, Powerup, PowerupKind, Standing, Vec2,
};
use crate::protocol::{
  ClientMessage, EnemyView, PlayerView, RoomListing, ServerMessage, StateSnapshot, WorldBounds,
};
use rand::Rng;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use uuid::Uuid;

pub fn now_millis() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}

/// Identity carried by a connection before and across room membership.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
  pub id: String,
  pub name: String,
  pub color: String,
  pub glyph: String,
}

/// One isolated game session. All entity state lives behind the mutex; the
/// tick and broadcast passes, and every inbound message, serialize on it.
#[derive(Debug)]
pub struct Room {
  id: String,
  public: bool,
  state: Mutex<RoomState>,
}

#[derive(Debug)]
struct RoomState {
  room_id: String,
  sessions: HashMap<String, UnboundedSender<String>>,
  host_id: Option<String>,
  players: HashMap<String, Player>,
  enemies: Vec<Enemy>,
  powerups: Vec<Powerup>,
  points: Vec<PointPickup>,
  explosions: Vec<Explosion>,
  settings: Settings,
  round_running: bool,
  game_over: bool,
  freeze_until: i64,
  winner_announcement_until: i64,
  round_started_player_count: usize,
  final_standings: Vec<Standing>,
  next_powerup_at: i64,
  next_point_at: i64,
  next_enemy_at: i64,
  pending_events: Vec<ServerMessage>,
}

impl Room {
  pub fn new(id: String, public: bool) -> Self {
    Self {
      state: Mutex::new(RoomState::new(id.clone())),
      id,
      public,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn is_public(&self) -> bool {
    self.public
  }

  pub async fn join(&self, profile: PlayerProfile, sender: UnboundedSender<String>, now: i64) {
    let mut state = self.state.lock().await;
    state.add_player(profile, sender, now);
  }

  pub async fn handle_message(&self, player_id: &str, message: ClientMessage, now: i64) {
    let mut state = self.state.lock().await;
    match message {
      ClientMessage::SetName { name } => state.handle_set_name(player_id, &name),
      ClientMessage::SetGlyph { glyph } => state.handle_set_glyph(player_id, &glyph),
      ClientMessage::Input { x, y } => state.handle_input(player_id, x, y, now),
      ClientMessage::Dash => state.handle_dash(player_id, now),
      ClientMessage::HostStart => state.handle_host_start(player_id, now),
      ClientMessage::UpdateSettings { settings } => {
        state.handle_update_settings(player_id, &settings)
      }
      ClientMessage::HostRestart => state.handle_host_restart(player_id),
      // Membership changes are routed by the registry, not the room.
      ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. } => {}
    }
  }

  /// Returns true when the room is empty afterwards and should be torn down.
  pub async fn remove_player(&self, player_id: &str, now: i64) -> bool {
    let mut state = self.state.lock().await;
    state.remove_player(player_id, now);
    state.sessions.is_empty()
  }

  pub async fn tick(&self, now: i64, dt: f64) {
    let mut state = self.state.lock().await;
    state.tick(now, dt);
  }

  /// Flushes lifecycle deltas and the lean snapshot to every session.
  /// Returns true when eviction of stale senders emptied the room.
  pub async fn broadcast(&self, now: i64) -> bool {
    let mut state = self.state.lock().await;
    state.broadcast(now);
    state.sessions.is_empty()
  }

  pub async fn is_empty(&self) -> bool {
    self.state.lock().await.sessions.is_empty()
  }

  pub async fn listing(&self) -> RoomListing {
    let state = self.state.lock().await;
    RoomListing {
      room_id: self.id.clone(),
      round_running: state.round_running,
      game_over: state.game_over,
      player_count: state.players.len(),
      players: state.compute_standings(),
    }
  }
}

impl RoomState {
  fn new(room_id: String) -> Self {
    Self {
      room_id,
      sessions: HashMap::new(),
      host_id: None,
      players: HashMap::new(),
      enemies: Vec::new(),
      powerups: Vec::new(),
      points: Vec::new(),
      explosions: Vec::new(),
      settings: Settings::default(),
      round_running: false,
      game_over: false,
      freeze_until: 0,
      winner_announcement_until: 0,
      round_started_player_count: 0,
      final_standings: Vec::new(),
      next_powerup_at: 0,
      next_point_at: 0,
      next_enemy_at: 0,
      pending_events: Vec::new(),
    }
  }

  fn add_player(&mut self, profile: PlayerProfile, sender: UnboundedSender<String>, now: i64) {
    let player = Player {
      id: profile.id.clone(),
      name: profile.name,
      color: profile.color,
      glyph: profile.glyph,
      x: 0.0,
      y: 0.0,
      vx: 0.0,
      vy: 0.0,
      r: self.settings.player_radius,
      alive: false,
      score: 0,
      input: Vec2::ZERO,
      last_input_at: 0,
      speed_boost_until: 0,
      shield: false,
      invincible_until: 0,
      shrink_until: 0,
      dash_until: 0,
      dash_ready_at: 0,
    };
    if self.host_id.is_none() {
      self.host_id = Some(profile.id.clone());
    }
    self.players.insert(profile.id.clone(), player);
    self.sessions.insert(profile.id.clone(), sender.clone());

    let joined = ServerMessage::RoomJoined {
      room_id: self.room_id.clone(),
      host_id: self.host_id.clone(),
    };
    Self::send_to(&sender, &joined);
    let full = ServerMessage::State {
      state: self.build_snapshot(now, true),
    };
    Self::send_to(&sender, &full);
    tracing::debug!(room_id = %self.room_id, player_id = %profile.id, "player joined");
  }

  fn remove_player(&mut self, player_id: &str, now: i64) {
    self.sessions.remove(player_id);
    if self.players.remove(player_id).is_none() {
      return;
    }
    if self.host_id.as_deref() == Some(player_id) {
      self.host_id = self.players.keys().next().cloned();
    }
    if self.round_running {
      self.check_round_end(now);
    }
    tracing::debug!(room_id = %self.room_id, player_id, "player left");
  }

  fn is_host(&self, player_id: &str) -> bool {
    self.host_id.as_deref() == Some(player_id)
  }

  fn handle_set_name(&mut self, player_id: &str, name: &str) {
    let Some(player) = self.players.get_mut(player_id) else { return };
    player.name = sanitize_player_name(name, &player.name.clone());
  }

  fn handle_set_glyph(&mut self, player_id: &str, glyph: &str) {
    let Some(player) = self.players.get_mut(player_id) else { return };
    player.glyph = sanitize_glyph(glyph, &player.glyph.clone());
  }

  fn handle_input(&mut self, player_id: &str, x: f64, y: f64, now: i64) {
    let Some(player) = self.players.get_mut(player_id) else { return };
    if now - player.last_input_at < INPUT_MIN_INTERVAL_MS {
      return;
    }
    let Some(input) = parse_input_vector(x, y) else { return };
    player.input = input;
    player.last_input_at = now;
  }

  fn handle_dash(&mut self, player_id: &str, now: i64) {
    let Some(player) = self.players.get_mut(player_id) else { return };
    if !player.alive || now < player.dash_ready_at {
      return;
    }
    let dir = if length(player.input) > 0.0 {
      player.input
    } else {
      normalize(Vec2 {
        x: player.vx,
        y: player.vy,
      })
    };
    if length(dir) == 0.0 {
      return;
    }
    let speed = (player.vx * player.vx + player.vy * player.vy).sqrt();
    let has_boost = now < player.speed_boost_until;
    let boost_mult = if has_boost { SPEED_BOOST_MULTIPLIER } else { 1.0 };
    let cap = self.settings.player_max_speed * DASH_SPEED_MULTIPLIER * boost_mult;
    let dash_speed = (speed * DASH_IMPULSE_MULT).max(DASH_MIN_SPEED).min(cap);
    player.vx = dir.x * dash_speed;
    player.vy = dir.y * dash_speed;
    player.dash_until = now + DASH_DURATION_MS;
    player.dash_ready_at = now + DASH_DURATION_MS + DASH_COOLDOWN_MS;
  }

  fn handle_host_start(&mut self, player_id: &str, now: i64) {
    if !self.is_host(player_id) {
      return;
    }
    self.start_round(now);
  }

  fn handle_update_settings(&mut self, player_id: &str, patch: &SettingsPatch) {
    if !self.is_host(player_id) || self.round_running {
      return;
    }
    self.settings.apply(patch);
    let reply = ServerMessage::SettingsUpdated {
      settings: self.settings.clone(),
    };
    if let Some(sender) = self.sessions.get(player_id) {
      Self::send_to(sender, &reply);
    }
  }

  fn handle_host_restart(&mut self, player_id: &str) {
    if !self.is_host(player_id) {
      return;
    }
    self.restart_game();
  }

  fn start_round(&mut self, now: i64) {
    if self.round_running || self.game_over || self.players.is_empty() {
      return;
    }
    self.enemies.clear();
    self.clear_transients();
    for player in self.players.values_mut() {
      let pos = random_spawn(self.settings.player_radius);
      player.x = pos.x;
      player.y = pos.y;
      player.vx = 0.0;
      player.vy = 0.0;
      player.r = self.settings.player_radius;
      player.alive = true;
      player.speed_boost_until = 0;
      player.shield = false;
      player.invincible_until = 0;
      player.shrink_until = 0;
      player.dash_until = 0;
      player.dash_ready_at = 0;
    }
    for _ in 0..ROUND_SEED_ENEMIES {
      let enemy = self.create_enemy(now);
      self.enemies.push(enemy);
    }
    self.round_running = true;
    self.winner_announcement_until = 0;
    self.freeze_until = now + ROUND_START_FREEZE_MS;
    self.round_started_player_count = self.players.len();
    let mut rng = rand::thread_rng();
    self.next_powerup_at = now + roll_powerup_delay(&mut rng, self.players.len());
    self.next_point_at = now + roll_point_delay(&mut rng);
    self.next_enemy_at = now + self.settings.enemy_spawn_interval_ms;
    tracing::debug!(
      room_id = %self.room_id,
      players = self.round_started_player_count,
      "round started"
    );
  }

  fn create_enemy(&self, now: i64) -> Enemy {
    let mut rng = rand::thread_rng();
    let pos = random_spawn(self.settings.enemy_radius);
    let angle = rng.gen::<f64>() * std::f64::consts::PI * 2.0;
    let speed = rng.gen_range(self.settings.enemy_speed_min..=self.settings.enemy_speed_max);
    Enemy {
      id: Uuid::new_v4().to_string(),
      x: pos.x,
      y: pos.y,
      vx: angle.cos() * speed,
      vy: angle.sin() * speed,
      r: self.settings.enemy_radius,
      color: ENEMY_COLOR.to_string(),
      glyph: ENEMY_GLYPHS[rng.gen_range(0..ENEMY_GLYPHS.len())].to_string(),
      spawn_safe_until: now + ENEMY_SPAWN_SAFE_MS,
    }
  }

  fn spawn_powerup(&mut self, now: i64) {
    let mut rng = rand::thread_rng();
    let pos = random_spawn(POWERUP_RADIUS);
    let powerup = Powerup {
      id: Uuid::new_v4().to_string(),
      kind: pick_powerup_kind(&mut rng),
      x: pos.x,
      y: pos.y,
      r: POWERUP_RADIUS,
      expires_at: now + POWERUP_LIFETIME_MS,
    };
    self.pending_events.push(ServerMessage::PowerupAdded {
      powerup: powerup.clone(),
    });
    self.powerups.push(powerup);
    self.next_powerup_at = now + roll_powerup_delay(&mut rng, self.players.len());
  }

  fn spawn_point(&mut self, now: i64) {
    let mut rng = rand::thread_rng();
    let pos = random_spawn(POINT_RADIUS);
    let point = PointPickup {
      id: Uuid::new_v4().to_string(),
      x: pos.x,
      y: pos.y,
      r: POINT_RADIUS,
      value: pick_point_value(&mut rng),
      expires_at: now + POINT_LIFETIME_MS,
    };
    self.pending_events.push(ServerMessage::PointAdded {
      point: point.clone(),
    });
    self.points.push(point);
    self.next_point_at = now + roll_point_delay(&mut rng);
  }

  fn tick(&mut self, now: i64, dt: f64) {
    if !self.round_running {
      return;
    }
    let freeze = now < self.freeze_until;

    self.integrate_player_forces(now, dt);
    self.integrate_positions(freeze, dt);
    self.resolve_player_collisions(now);
    if !freeze {
      self.resolve_enemy_collisions();
    }
    self.detect_lethal_contacts(now);
    self.process_powerup_pickups(now);
    if self.process_point_pickups(now) {
      // Score-threshold victory ends the game mid-tick.
      return;
    }
    if now >= self.next_powerup_at {
      self.spawn_powerup(now);
    }
    if now >= self.next_point_at {
      self.spawn_point(now);
    }
    if now >= self.next_enemy_at {
      let enemy = self.create_enemy(now);
      self.enemies.push(enemy);
      self.next_enemy_at = now + self.settings.enemy_spawn_interval_ms;
    }
    self.check_round_end(now);
  }

  /// Accelerate along the desired direction, cap speed by uniform rescale,
  /// then damp. The order matters.
  fn integrate_player_forces(&mut self, now: i64, dt: f64) {
    let settings = self.settings.clone();
    for player in self.players.values_mut() {
      if !player.alive {
        continue;
      }
      let has_boost = now < player.speed_boost_until;
      let dashing = now < player.dash_until;
      let shrunk = now < player.shrink_until;
      let boost_mult = if has_boost { SPEED_BOOST_MULTIPLIER } else { 1.0 };
      let dash_mult = if dashing { DASH_SPEED_MULTIPLIER } else { 1.0 };
      let accel = settings.player_accel * boost_mult * dash_mult;
      let max_speed = settings.player_max_speed * boost_mult * dash_mult;

      player.vx += player.input.x * accel * dt;
      player.vy += player.input.y * accel * dt;
      let speed = (player.vx * player.vx + player.vy * player.vy).sqrt();
      if speed > max_speed {
        let scale = max_speed / speed;
        player.vx *= scale;
        player.vy *= scale;
      }
      player.vx *= settings.friction;
      player.vy *= settings.friction;

      player.r = if shrunk {
        (settings.player_radius * SHRINK_FACTOR).round().max(SHRINK_MIN_RADIUS)
      } else {
        settings.player_radius
      };
    }
  }

  fn integrate_positions(&mut self, freeze: bool, dt: f64) {
    for player in self.players.values_mut() {
      if !player.alive {
        continue;
      }
      player.x += player.vx * dt;
      player.y += player.vy * dt;
      let mut body = Body {
        x: player.x,
        y: player.y,
        vx: player.vx,
        vy: player.vy,
        r: player.r,
      };
      bounce_off_walls(&mut body);
      player.x = body.x;
      player.y = body.y;
      player.vx = body.vx;
      player.vy = body.vy;
    }
    // Freeze suspends enemy motion; players stay controllable.
    if freeze {
      return;
    }
    for enemy in &mut self.enemies {
      enemy.x += enemy.vx * dt;
      enemy.y += enemy.vy * dt;
      let mut body = Body {
        x: enemy.x,
        y: enemy.y,
        vx: enemy.vx,
        vy: enemy.vy,
        r: enemy.r,
      };
      bounce_off_walls(&mut body);
      enemy.x = body.x;
      enemy.y = body.y;
      enemy.vx = body.vx;
      enemy.vy = body.vy;
    }
  }

  fn resolve_player_collisions(&mut self, now: i64) {
    let mut bodies: Vec<(String, Body, bool)> = self
      .players
      .values()
      .filter(|player| player.alive)
      .map(|player| {
        (
          player.id.clone(),
          Body {
            x: player.x,
            y: player.y,
            vx: player.vx,
            vy: player.vy,
            r: player.r,
          },
          now < player.dash_until,
        )
      })
      .collect();

    for i in 0..bodies.len() {
      for j in (i + 1)..bodies.len() {
        let (left, right) = bodies.split_at_mut(j);
        let a = &mut left[i];
        let b = &mut right[0];
        let bump_a = if b.2 && !a.2 {
          DASH_BUMP_MULTIPLIER
        } else {
          PLAYER_BUMP_MULTIPLIER
        };
        let bump_b = if a.2 && !b.2 {
          DASH_BUMP_MULTIPLIER
        } else {
          PLAYER_BUMP_MULTIPLIER
        };
        resolve_circle_collision(&mut a.1, &mut b.1, bump_a, bump_b);
      }
    }

    for (id, body, _) in bodies {
      if let Some(player) = self.players.get_mut(&id) {
        player.x = body.x;
        player.y = body.y;
        player.vx = body.vx;
        player.vy = body.vy;
      }
    }
  }

  fn resolve_enemy_collisions(&mut self) {
    let mut bodies: Vec<Body> = self
      .enemies
      .iter()
      .map(|enemy| Body {
        x: enemy.x,
        y: enemy.y,
        vx: enemy.vx,
        vy: enemy.vy,
        r: enemy.r,
      })
      .collect();

    for i in 0..bodies.len() {
      for j in (i + 1)..bodies.len() {
        let (left, right) = bodies.split_at_mut(j);
        resolve_circle_collision(
          &mut left[i],
          &mut right[0],
          PLAYER_BUMP_MULTIPLIER,
          PLAYER_BUMP_MULTIPLIER,
        );
      }
    }

    for (enemy, body) in self.enemies.iter_mut().zip(bodies) {
      enemy.x = body.x;
      enemy.y = body.y;
      enemy.vx = body.vx;
      enemy.vy = body.vy;
    }
  }

  fn detect_lethal_contacts(&mut self, now: i64) {
    let settings = self.settings.clone();
    for enemy in &mut self.enemies {
      for player in self.players.values_mut() {
        if !player.alive {
          continue;
        }
        let dx = enemy.x - player.x;
        let dy = enemy.y - player.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > enemy.r + player.r {
          continue;
        }
        if now < enemy.spawn_safe_until || now < player.invincible_until {
          continue;
        }
        if player.shield {
          player.shield = false;
          player.invincible_until = now + SHIELD_INVINCIBLE_MS;
          let safe_dist = if dist > 0.0 { dist } else { 1.0 };
          let nx = if dx != 0.0 { dx / safe_dist } else { 1e-4 };
          let ny = if dy != 0.0 { dy / safe_dist } else { 1e-4 };
          // Reposition just outside contact so the shield does not burn
          // the invincibility window on the same enemy next tick.
          let separation = player.r + enemy.r + SHIELD_SEPARATION_EPSILON;
          enemy.x = player.x + nx * separation;
          enemy.y = player.y + ny * separation;
          let current_speed = enemy.vx.hypot(enemy.vy);
          let base_speed = current_speed
            .clamp(settings.enemy_speed_min, settings.enemy_speed_max);
          let bounce_speed = base_speed * SHIELD_BOUNCE_MULTIPLIER;
          enemy.vx = nx * bounce_speed;
          enemy.vy = ny * bounce_speed;
          continue;
        }
        player.alive = false;
        player.vx = 0.0;
        player.vy = 0.0;
        tracing::debug!(room_id = %self.room_id, player_id = %player.id, "player eliminated");
      }
    }
  }

  fn process_powerup_pickups(&mut self, now: i64) {
    let mut expired: Vec<(String, PowerupKind)> = Vec::new();
    self.powerups.retain(|powerup| {
      if powerup.expires_at > now {
        true
      } else {
        expired.push((powerup.id.clone(), powerup.kind));
        false
      }
    });
    for (id, kind) in expired {
      self.pending_events.push(ServerMessage::PowerupRemoved {
        id,
        picked_by: None,
        kind,
      });
    }

    let mut i = 0;
    while i < self.powerups.len() {
      let (px, py, pr) = {
        let powerup = &self.powerups[i];
        (powerup.x, powerup.y, powerup.r)
      };
      let picker = self
        .players
        .values()
        .find(|player| {
          player.alive && ((px - player.x).hypot(py - player.y)) <= pr + player.r
        })
        .map(|player| player.id.clone());
      match picker {
        Some(player_id) => {
          let powerup = self.powerups.remove(i);
          self.apply_powerup(&player_id, &powerup, now);
          self.pending_events.push(ServerMessage::PowerupRemoved {
            id: powerup.id,
            picked_by: Some(player_id),
            kind: powerup.kind,
          });
        }
        None => i += 1,
      }
    }
  }

  fn apply_powerup(&mut self, player_id: &str, powerup: &Powerup, now: i64) {
    match powerup.kind {
      PowerupKind::Freeze => {
        self.freeze_until = now + FREEZE_DURATION_MS;
      }
      PowerupKind::Speed => {
        if let Some(player) = self.players.get_mut(player_id) {
          player.speed_boost_until = now + SPEED_BOOST_DURATION_MS;
        }
      }
      PowerupKind::Immortal => {
        if let Some(player) = self.players.get_mut(player_id) {
          player.shield = true;
        }
      }
      PowerupKind::Bomb => {
        let blast_radius = self.settings.enemy_radius * BOMB_BLAST_RADIUS_MULT;
        self.enemies.retain(|enemy| {
          (enemy.x - powerup.x).hypot(enemy.y - powerup.y) > blast_radius + enemy.r * 0.5
        });
        self.explosions.push(Explosion {
          id: Uuid::new_v4().to_string(),
          x: powerup.x,
          y: powerup.y,
          radius: blast_radius,
          created_at: now,
        });
        if self.explosions.len() > MAX_EXPLOSION_HISTORY {
          let excess = self.explosions.len() - MAX_EXPLOSION_HISTORY;
          self.explosions.drain(0..excess);
        }
      }
      PowerupKind::Shrink => {
        if let Some(player) = self.players.get_mut(player_id) {
          player.shrink_until = now + SHRINK_DURATION_MS;
        }
      }
    }
  }

  /// Returns true when a pickup pushed a player over the win threshold; the
  /// rest of this tick's pickups are abandoned.
  fn process_point_pickups(&mut self, now: i64) -> bool {
    let mut expired: Vec<String> = Vec::new();
    self.points.retain(|point| {
      if point.expires_at > now {
        true
      } else {
        expired.push(point.id.clone());
        false
      }
    });
    for id in expired {
      self.pending_events.push(ServerMessage::PointRemoved {
        id,
        picked_by: None,
      });
    }

    let mut i = 0;
    while i < self.points.len() {
      let (px, py, pr, value) = {
        let point = &self.points[i];
        (point.x, point.y, point.r, point.value)
      };
      let picker = self
        .players
        .values()
        .find(|player| {
          player.alive && ((px - player.x).hypot(py - player.y)) <= pr + player.r
        })
        .map(|player| player.id.clone());
      match picker {
        Some(player_id) => {
          let winning = match self.players.get_mut(&player_id) {
            Some(player) => {
              player.score += value;
              player.score >= self.settings.score_to_win
            }
            None => false,
          };
          if winning {
            self.end_game(now);
            return true;
          }
          let point = self.points.remove(i);
          self.pending_events.push(ServerMessage::PointRemoved {
            id: point.id,
            picked_by: Some(player_id),
          });
        }
        None => i += 1,
      }
    }
    false
  }

  fn check_round_end(&mut self, now: i64) {
    if !self.round_running {
      return;
    }
    let alive_count = self.players.values().filter(|player| player.alive).count();
    let should_end = if self.round_started_player_count >= 2 {
      alive_count <= 1
    } else {
      alive_count == 0
    };
    if should_end {
      self.end_round(now);
    }
  }

  fn end_round(&mut self, now: i64) {
    self.round_running = false;
    self.clear_transients();
    let survivor_id = {
      let mut alive = self.players.values().filter(|player| player.alive);
      match (alive.next(), alive.next()) {
        (Some(player), None) => Some(player.id.clone()),
        _ => None,
      }
    };
    // Zero-survivor rounds award nothing.
    if self.round_started_player_count >= 2 {
      if let Some(id) = survivor_id {
        let winning = match self.players.get_mut(&id) {
          Some(survivor) => {
            survivor.score += WINNER_BONUS;
            survivor.score >= self.settings.score_to_win
          }
          None => false,
        };
        if winning {
          self.end_game(now);
          return;
        }
        self.winner_announcement_until = now + WINNER_ANNOUNCEMENT_MS;
      }
    }
    tracing::debug!(room_id = %self.room_id, "round ended");
  }

  fn end_game(&mut self, now: i64) {
    self.round_running = false;
    self.game_over = true;
    self.final_standings = self.compute_standings();
    self.winner_announcement_until = 0;
    self.freeze_until = 0;
    self.next_powerup_at = 0;
    self.next_point_at = 0;
    self.next_enemy_at = 0;
    tracing::debug!(room_id = %self.room_id, at = now, "game over");
  }

  fn restart_game(&mut self) {
    self.round_running = false;
    self.game_over = false;
    self.enemies.clear();
    self.clear_transients();
    self.winner_announcement_until = 0;
    self.freeze_until = 0;
    for player in self.players.values_mut() {
      player.score = 0;
      player.alive = false;
      player.vx = 0.0;
      player.vy = 0.0;
      player.speed_boost_until = 0;
      player.shield = false;
      player.invincible_until = 0;
      player.shrink_until = 0;
      player.dash_until = 0;
      player.dash_ready_at = 0;
    }
    self.final_standings.clear();
    tracing::debug!(room_id = %self.room_id, "game restarted");
  }

  fn clear_transients(&mut self) {
    if !self.powerups.is_empty() || !self.points.is_empty() {
      self.pending_events.push(ServerMessage::EntitiesCleared);
    }
    self.powerups.clear();
    self.points.clear();
    self.next_powerup_at = 0;
    self.next_point_at = 0;
    self.next_enemy_at = 0;
  }

  /// Stable sort by score descending.
  fn compute_standings(&self) -> Vec<Standing> {
    let mut standings: Vec<Standing> = self
      .players
      .values()
      .map(|player| Standing {
        id: player.id.clone(),
        name: player.name.clone(),
        score: player.score,
      })
      .collect();
    standings.sort_by(|a, b| b.score.cmp(&a.score));
    standings
  }

  fn build_snapshot(&self, now: i64, full: bool) -> StateSnapshot {
    StateSnapshot {
      now,
      room_id: self.room_id.clone(),
      host_id: self.host_id.clone(),
      world: WorldBounds {
        width: WORLD_WIDTH,
        height: WORLD_HEIGHT,
      },
      round_running: self.round_running,
      game_over: self.game_over,
      freeze_until: self.freeze_until,
      winner_announcement_until: self.winner_announcement_until,
      final_standings: self.final_standings.clone(),
      explosions: self.explosions.clone(),
      settings: self.settings.clone(),
      players: self
        .players
        .values()
        .map(|player| PlayerView {
          id: player.id.clone(),
          name: player.name.clone(),
          x: player.x,
          y: player.y,
          r: player.r,
          color: player.color.clone(),
          glyph: player.glyph.clone(),
          alive: player.alive,
          score: player.score,
          speed_boost_until: player.speed_boost_until,
          shield: player.shield,
          shrink_until: player.shrink_until,
          dash_until: player.dash_until,
          dash_ready_at: player.dash_ready_at,
        })
        .collect(),
      enemies: self
        .enemies
        .iter()
        .map(|enemy| EnemyView {
          id: enemy.id.clone(),
          x: enemy.x,
          y: enemy.y,
          r: enemy.r,
          color: enemy.color.clone(),
          glyph: enemy.glyph.clone(),
          spawn_safe_until: enemy.spawn_safe_until,
        })
        .collect(),
      powerups: full.then(|| self.powerups.clone()),
      points: full.then(|| self.points.clone()),
    }
  }

  fn send_to(sender: &UnboundedSender<String>, message: &ServerMessage) {
    if let Ok(payload) = serde_json::to_string(message) {
      let _ = sender.send(payload);
    }
  }

  fn broadcast(&mut self, now: i64) {
    let mut payloads: Vec<String> = Vec::new();
    for event in self.pending_events.drain(..) {
      if let Ok(payload) = serde_json::to_string(&event) {
        payloads.push(payload);
      }
    }
    let snapshot = ServerMessage::State {
      state: self.build_snapshot(now, false),
    };
    if let Ok(payload) = serde_json::to_string(&snapshot) {
      payloads.push(payload);
    }

    let mut stale: Vec<String> = Vec::new();
    for (player_id, sender) in &self.sessions {
      for payload in &payloads {
        if sender.send(payload.clone()).is_err() {
          stale.push(player_id.clone());
          break;
        }
      }
    }
    for player_id in stale {
      tracing::debug!(room_id = %self.room_id, player_id = %player_id, "dropping stale session");
      self.remove_player(&player_id, now);
    }
  }
}
