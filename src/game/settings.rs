use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  pub player_radius: f64,
  pub enemy_radius: f64,
  pub player_max_speed: f64,
  pub player_accel: f64,
  pub enemy_speed_min: f64,
  pub enemy_speed_max: f64,
  pub enemy_spawn_interval_ms: i64,
  pub friction: f64,
  pub score_to_win: i64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      player_radius: 20.0,
      enemy_radius: 20.0,
      player_max_speed: 340.0,
      player_accel: 1200.0,
      enemy_speed_min: 140.0,
      enemy_speed_max: 240.0,
      enemy_spawn_interval_ms: 10_000,
      friction: 0.9,
      score_to_win: 100,
    }
  }
}

/// Host-supplied partial update. Unknown fields are ignored at the serde
/// boundary; each present field is validated independently.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
  pub player_radius: Option<f64>,
  pub enemy_radius: Option<f64>,
  pub player_max_speed: Option<f64>,
  pub enemy_speed_min: Option<f64>,
  pub enemy_speed_max: Option<f64>,
  pub enemy_spawn_interval_ms: Option<f64>,
  pub friction: Option<f64>,
  pub score_to_win: Option<f64>,
}

fn apply_finite(target: &mut f64, value: Option<f64>, min: f64, max: f64, round: bool) {
  let Some(value) = value else { return };
  if !value.is_finite() {
    return;
  }
  let value = if round { value.round() } else { value };
  *target = value.clamp(min, max);
}

impl Settings {
  /// Per-field clamp and round, then cross-field correction, then the
  /// derived acceleration. Out-of-range or non-numeric fields are dropped,
  /// never errors.
  pub fn apply(&mut self, patch: &SettingsPatch) {
    apply_finite(&mut self.player_radius, patch.player_radius, 8.0, 80.0, true);
    apply_finite(&mut self.enemy_radius, patch.enemy_radius, 8.0, 80.0, true);
    apply_finite(
      &mut self.player_max_speed,
      patch.player_max_speed,
      80.0,
      1000.0,
      true,
    );
    apply_finite(
      &mut self.enemy_speed_min,
      patch.enemy_speed_min,
      40.0,
      1600.0,
      true,
    );
    apply_finite(
      &mut self.enemy_speed_max,
      patch.enemy_speed_max,
      40.0,
      1600.0,
      true,
    );
    apply_finite(&mut self.friction, patch.friction, 0.5, 0.99, false);

    let mut spawn_interval = self.enemy_spawn_interval_ms as f64;
    apply_finite(
      &mut spawn_interval,
      patch.enemy_spawn_interval_ms,
      500.0,
      60_000.0,
      true,
    );
    self.enemy_spawn_interval_ms = spawn_interval as i64;

    let mut score_to_win = self.score_to_win as f64;
    apply_finite(&mut score_to_win, patch.score_to_win, 10.0, 1000.0, true);
    self.score_to_win = score_to_win as i64;

    if self.enemy_speed_max < self.enemy_speed_min {
      self.enemy_speed_max = self.enemy_speed_min;
    }
    self.player_accel = (self.player_max_speed * 3.5).round().clamp(400.0, 4000.0);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_baseline() {
    let s = Settings::default();
    assert_eq!(s.player_radius, 20.0);
    assert_eq!(s.player_max_speed, 340.0);
    assert_eq!(s.score_to_win, 100);
  }

  #[test]
  fn fields_clamp_to_their_ranges() {
    let mut s = Settings::default();
    s.apply(&SettingsPatch {
      player_radius: Some(500.0),
      player_max_speed: Some(10.0),
      friction: Some(2.0),
      ..Default::default()
    });
    assert_eq!(s.player_radius, 80.0);
    assert_eq!(s.player_max_speed, 80.0);
    assert_eq!(s.friction, 0.99);
  }

  #[test]
  fn non_finite_fields_are_dropped() {
    let mut s = Settings::default();
    s.apply(&SettingsPatch {
      enemy_radius: Some(f64::NAN),
      enemy_spawn_interval_ms: Some(f64::INFINITY),
      ..Default::default()
    });
    assert_eq!(s.enemy_radius, 20.0);
    assert_eq!(s.enemy_spawn_interval_ms, 10_000);
  }

  #[test]
  fn enemy_speed_max_is_raised_to_min() {
    let mut s = Settings::default();
    s.apply(&SettingsPatch {
      enemy_speed_min: Some(600.0),
      enemy_speed_max: Some(200.0),
      ..Default::default()
    });
    assert_eq!(s.enemy_speed_min, 600.0);
    assert_eq!(s.enemy_speed_max, 600.0);
  }

  #[test]
  fn accel_derives_from_max_speed() {
    let mut s = Settings::default();
    s.apply(&SettingsPatch {
      player_max_speed: Some(1000.0),
      ..Default::default()
    });
    assert_eq!(s.player_accel, 3500.0);

    s.apply(&SettingsPatch {
      player_max_speed: Some(80.0),
      ..Default::default()
    });
    assert_eq!(s.player_accel, 400.0);
  }

  #[test]
  fn rounded_fields_are_rounded() {
    let mut s = Settings::default();
    s.apply(&SettingsPatch {
      player_radius: Some(23.7),
      friction: Some(0.85),
      ..Default::default()
    });
    assert_eq!(s.player_radius, 24.0);
    assert_eq!(s.friction, 0.85);
  }
}
