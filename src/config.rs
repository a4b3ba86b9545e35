/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete,
/// and writes the current settings back on exit so picked skill and
/// player name survive restarts. Values are typed key/value pairs only;
/// there is no validation beyond what the types themselves enforce.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub skill: String,
    pub player_name: String,
    pub sound: bool,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    /// Fixed simulation step, milliseconds of game time.
    pub step_ms: u64,
    /// Hard cap on catch-up ticks per frame.
    pub max_catch_up: u32,
    /// Hero speed, cells per tick, while a direction is held.
    pub hero_speed: f32,
    /// Prowler chase speed, cells per tick.
    pub prowler_speed: f32,
    /// Ticks between cell hops in auto-trace mode.
    pub trace_move_rate: u32,
    /// Initial pathfinder search radius, cells.
    pub search_radius: u32,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Serialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Serialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_step_ms")]
    step_ms: u64,
    #[serde(default = "default_max_catch_up")]
    max_catch_up: u32,
    #[serde(default = "default_hero_speed")]
    hero_speed: f32,
    #[serde(default = "default_prowler_speed")]
    prowler_speed: f32,
    #[serde(default = "default_trace_move_rate")]
    trace_move_rate: u32,
    #[serde(default = "default_search_radius")]
    search_radius: u32,
}

#[derive(Deserialize, Serialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_skill")]
    skill: String,
    #[serde(default)]
    player_name: String,
    #[serde(default = "default_sound")]
    sound: bool,
}

// ── Defaults ──

fn default_step_ms() -> u64 { 33 } // ~30 simulation steps per second
fn default_max_catch_up() -> u32 { 10 }
fn default_hero_speed() -> f32 { 0.20 }
fn default_prowler_speed() -> f32 { 0.12 }
fn default_trace_move_rate() -> u32 { 3 }
fn default_search_radius() -> u32 { 32 }
fn default_skill() -> String { "Normal".into() }
fn default_sound() -> bool { true }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            step_ms: default_step_ms(),
            max_catch_up: default_max_catch_up(),
            hero_speed: default_hero_speed(),
            prowler_speed: default_prowler_speed(),
            trace_move_rate: default_trace_move_rate(),
            search_radius: default_search_radius(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            skill: default_skill(),
            player_name: String::new(),
            sound: default_sound(),
        }
    }
}

// ── Loading / saving ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let toml_cfg = load_toml(&candidate_dirs());
        GameConfig {
            speed: SpeedConfig {
                step_ms: toml_cfg.speed.step_ms,
                max_catch_up: toml_cfg.speed.max_catch_up,
                hero_speed: toml_cfg.speed.hero_speed,
                prowler_speed: toml_cfg.speed.prowler_speed,
                trace_move_rate: toml_cfg.speed.trace_move_rate,
                search_radius: toml_cfg.speed.search_radius,
            },
            skill: toml_cfg.general.skill,
            player_name: toml_cfg.general.player_name,
            sound: toml_cfg.general.sound,
        }
    }

    /// Write the current settings to the first writable candidate dir.
    pub fn save(&self) -> Result<(), String> {
        let toml_cfg = TomlConfig {
            speed: TomlSpeed {
                step_ms: self.speed.step_ms,
                max_catch_up: self.speed.max_catch_up,
                hero_speed: self.speed.hero_speed,
                prowler_speed: self.speed.prowler_speed,
                trace_move_rate: self.speed.trace_move_rate,
                search_radius: self.speed.search_radius,
            },
            general: TomlGeneral {
                skill: self.skill.clone(),
                player_name: self.player_name.clone(),
                sound: self.sound,
            },
        };
        let text = toml::to_string(&toml_cfg).map_err(|e| format!("config serialize failed: {e}"))?;
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if std::fs::write(&path, &text).is_ok() {
                log::info!("config saved to {}", path.display());
                return Ok(());
            }
        }
        Err("no writable location for config.toml".into())
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home.
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so data is found relative to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mazechase");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        log::warn!("config.toml parse error: {e}; using defaults");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.speed.step_ms, 33);
        assert_eq!(cfg.speed.max_catch_up, 10);
        assert_eq!(cfg.general.skill, "Normal");
        assert!(cfg.general.sound);
    }

    #[test]
    fn partial_toml_fills_missing_keys() {
        let cfg: TomlConfig = toml::from_str(
            r#"
            [speed]
            step_ms = 16

            [general]
            skill = "Expert"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.speed.step_ms, 16);
        assert_eq!(cfg.speed.max_catch_up, 10); // defaulted
        assert_eq!(cfg.general.skill, "Expert");
        assert_eq!(cfg.general.player_name, "");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = TomlConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: TomlConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.speed.step_ms, cfg.speed.step_ms);
        assert_eq!(back.general.skill, cfg.general.skill);
    }
}
