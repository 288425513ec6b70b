//! Game settings and tunables
//!
//! The JSON shape matches what the settings panel stores, so a saved
//! document loads as-is. Missing keys fall back to defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::PowerUpKind;

/// AI difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Insane,
    /// Oscillates around 0.5 over simulated time
    Adaptive,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Insane => "insane",
            Difficulty::Adaptive => "adaptive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            "insane" => Some(Difficulty::Insane),
            "adaptive" => Some(Difficulty::Adaptive),
            _ => None,
        }
    }

    /// Skill factor in [0, 1] at the given simulated time
    pub fn factor(&self, sim_time: f32) -> f32 {
        match self {
            Difficulty::Easy => 0.3,
            Difficulty::Normal => 0.6,
            Difficulty::Hard => 0.8,
            Difficulty::Insane => 0.95,
            Difficulty::Adaptive => 0.5 + (sim_time * 0.5).sin() * 0.25,
        }
    }
}

/// Core match tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    /// Global simulation speed multiplier
    pub game_speed: f32,
    /// Ball speed at serve and base for paddle returns
    pub base_ball_speed: f32,
    /// First side to reach this wins (0 = endless)
    pub max_points: u32,
    /// Simulated seconds between power-up spawns
    pub power_up_frequency: f32,
    /// Rally speed-up per consecutive hit
    pub extra_speed_factor: f32,
    /// Randomness added to bounces (0-100)
    pub randomness_level: f32,
    /// Base paddle speed (units per simulated second)
    pub paddle_speed: f32,
    /// Ticks a ball may stay stuck before it is re-angled
    pub stuck_tick_limit: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            game_speed: 2.2,
            base_ball_speed: 4.0,
            max_points: 10,
            power_up_frequency: 5.0,
            extra_speed_factor: 0.05,
            randomness_level: 15.0,
            paddle_speed: 12.0,
            stuck_tick_limit: 27,
        }
    }
}

/// Per-side AI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiSettings {
    pub left_difficulty: Difficulty,
    pub right_difficulty: Difficulty,
}

/// Power-up availability and scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PowerUpSettings {
    /// Multiplies every rolled duration
    pub duration_factor: f32,
    /// Multiplies every rolled strength
    pub strength_factor: f32,
    pub enabled: BTreeMap<PowerUpKind, bool>,
    /// Spawn chance per kind, in percent
    pub chances: BTreeMap<PowerUpKind, f32>,
}

impl Default for PowerUpSettings {
    fn default() -> Self {
        Self {
            duration_factor: 1.0,
            strength_factor: 1.0,
            enabled: PowerUpKind::ALL.iter().map(|&k| (k, true)).collect(),
            chances: PowerUpKind::ALL.iter().map(|&k| (k, 10.0)).collect(),
        }
    }
}

impl PowerUpSettings {
    /// Kinds absent from the table count as enabled
    pub fn is_enabled(&self, kind: PowerUpKind) -> bool {
        self.enabled.get(&kind).copied().unwrap_or(true)
    }

    pub fn chance(&self, kind: PowerUpKind) -> f32 {
        self.chances.get(&kind).copied().unwrap_or(0.0)
    }
}

/// All simulation tunables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub game: GameSettings,
    pub ai: AiSettings,
    pub power_ups: PowerUpSettings,
}

impl Settings {
    /// Parse a settings document and clamp it into safe ranges
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a file, falling back to defaults on any failure
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Invalid settings in {}: {err}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("Could not read {}: {err}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Clamp every numeric tunable into a range the simulation can integrate
    pub fn sanitize(&mut self) {
        let defaults = GameSettings::default();
        let game = &mut self.game;

        game.game_speed = finite_or(game.game_speed, defaults.game_speed).clamp(0.1, 10.0);
        game.base_ball_speed =
            finite_or(game.base_ball_speed, defaults.base_ball_speed).clamp(0.5, 40.0);
        // Saved documents store the spawn interval in milliseconds
        if game.power_up_frequency > 100.0 {
            game.power_up_frequency /= 1000.0;
        }
        game.power_up_frequency =
            finite_or(game.power_up_frequency, defaults.power_up_frequency).clamp(0.5, 120.0);
        game.extra_speed_factor =
            finite_or(game.extra_speed_factor, defaults.extra_speed_factor).clamp(0.0, 1.0);
        game.randomness_level =
            finite_or(game.randomness_level, defaults.randomness_level).clamp(0.0, 100.0);
        game.paddle_speed = finite_or(game.paddle_speed, defaults.paddle_speed).clamp(0.5, 100.0);
        game.stuck_tick_limit = game.stuck_tick_limit.max(1);

        let power_ups = &mut self.power_ups;
        power_ups.duration_factor = finite_or(power_ups.duration_factor, 1.0).clamp(0.1, 5.0);
        power_ups.strength_factor = finite_or(power_ups.strength_factor, 1.0).clamp(0.1, 2.0);
        for chance in power_ups.chances.values_mut() {
            *chance = finite_or(*chance, 0.0).clamp(0.0, 100.0);
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_every_kind() {
        let settings = Settings::default();
        for kind in PowerUpKind::ALL {
            assert!(settings.power_ups.is_enabled(kind));
            assert_eq!(settings.power_ups.chance(kind), 10.0);
        }
        assert_eq!(settings.game.game_speed, 2.2);
    }

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let json = r#"{
            "game": { "gameSpeed": 1.5, "powerUpFrequency": 8000 },
            "ai": { "rightDifficulty": "insane" },
            "powerUps": { "enabled": { "freeze": false } }
        }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.game.game_speed, 1.5);
        assert_eq!(settings.game.base_ball_speed, 4.0);
        assert!((settings.game.power_up_frequency - 8.0).abs() < 1e-6);
        assert_eq!(settings.ai.left_difficulty, Difficulty::Normal);
        assert_eq!(settings.ai.right_difficulty, Difficulty::Insane);
        assert!(!settings.power_ups.is_enabled(PowerUpKind::Freeze));
        assert!(settings.power_ups.is_enabled(PowerUpKind::TimeSlow));
    }

    #[test]
    fn test_sanitize_clamps_bad_values() {
        let mut settings = Settings::default();
        settings.game.game_speed = f32::NAN;
        settings.game.base_ball_speed = -3.0;
        settings.power_ups.strength_factor = 50.0;
        settings.sanitize();
        assert_eq!(settings.game.game_speed, 2.2);
        assert_eq!(settings.game.base_ball_speed, 0.5);
        assert_eq!(settings.power_ups.strength_factor, 2.0);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Settings::from_json("{ not json").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::load("/nonexistent/cosmic-pong-settings.json");
        assert_eq!(settings.game.max_points, 10);
    }

    #[test]
    fn test_difficulty_factor() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("bogus"), None);
        for t in [0.0, 1.0, 3.3, 100.0] {
            let f = Difficulty::Adaptive.factor(t);
            assert!((0.25..=0.75).contains(&f));
        }
        assert_eq!(Difficulty::Insane.factor(0.0), 0.95);
    }
}
