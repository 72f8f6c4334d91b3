//! Configuration loading and validation
//!
//! The config file is TOML, read once at startup. Key names are resolved to
//! virtual-key codes here so nothing downstream ever sees a string, and any
//! problem is reported as a [`ConfigError`]: there is no safe default for
//! an engine with unbound keys.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::hook::{vk_from_name, Action, BindError, Hotkey, KeyBindings};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "KEYMOUSE_CONFIG";

/// Errors raised while loading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate the executable directory")]
    NoBaseDir,

    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[keybindings] {field}: unknown key name {name:?}")]
    UnknownKey { field: &'static str, name: String },

    #[error("[keybindings] toggle_mode_hotkey: {0:?} is not a <modifier>+<key> chord")]
    BadHotkey(String),

    #[error("[keybindings] {field}: key {name:?} is already bound to {existing:?}")]
    DuplicateBinding {
        field: &'static str,
        name: String,
        existing: Action,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Fully validated daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// File the config was read from
    pub path: PathBuf,
    pub bindings: KeyBindings,
    pub movement: MovementConfig,
    pub scrolling: ScrollConfig,
    pub region_select: RegionSelectConfig,
}

/// Pointer movement parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovementConfig {
    /// Pixels per tick per held direction
    pub speed: i32,
    pub shift_multiplier: f64,
    pub caps_multiplier: f64,
    /// Seconds between worker ticks
    pub delay_per_step: f64,
}

impl MovementConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.delay_per_step)
    }
}

/// Smooth-scroll physics parameters, in pixels and seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollConfig {
    pub initial_velocity: f64,
    pub max_velocity: f64,
    pub acceleration: f64,
}

/// Region selector helper and its grid layout
#[derive(Debug, Clone)]
pub struct RegionSelectConfig {
    /// Helper executable, already resolved against the config directory
    pub helper: PathBuf,
    /// Arguments placed before the two handshake file paths
    pub helper_args: Vec<String>,
    /// Grid rows of single-character labels
    pub layout: Vec<Vec<char>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    keybindings: RawKeybindings,
    movement: MovementConfig,
    smooth_scrolling: ScrollConfig,
    #[serde(default)]
    region_select: RawRegionSelect,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKeybindings {
    toggle_mode_hotkey: String,
    move_up: String,
    move_down: String,
    move_left: String,
    move_right: String,
    scroll_up: String,
    scroll_down: String,
    left_click: String,
    right_click: String,
    middle_click: String,
    sticky_left_click: String,
    toggle_mode_internal: String,
    enter_region_select: String,
    #[serde(default)]
    exit_program: Option<String>,
    #[serde(default = "default_speed_shift")]
    speed_shift: String,
    #[serde(default = "default_speed_caps")]
    speed_caps: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegionSelect {
    #[serde(default = "default_helper")]
    helper: PathBuf,
    #[serde(default)]
    helper_args: Vec<String>,
    #[serde(default = "default_layout")]
    layout: Vec<String>,
}

impl Default for RawRegionSelect {
    fn default() -> Self {
        Self {
            helper: default_helper(),
            helper_args: Vec::new(),
            layout: default_layout(),
        }
    }
}

fn default_speed_shift() -> String {
    "lshift".to_string()
}

fn default_speed_caps() -> String {
    "caps_lock".to_string()
}

fn default_helper() -> PathBuf {
    PathBuf::from("RegionSelector.exe")
}

fn default_layout() -> Vec<String> {
    ["12345", "qwert", "asdfg", "zxcvb"]
        .iter()
        .map(|row| row.to_string())
        .collect()
}

impl Config {
    /// Load configuration from `$KEYMOUSE_CONFIG` or `config.toml` beside the executable
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .ok_or(ConfigError::NoBaseDir)?
                .join("config.toml"),
        };
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config = Self::parse(&text, base_dir)?;
        config.path = path.to_owned();
        Ok(config)
    }

    /// Parse and validate config text; relative helper paths resolve against `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        let bindings = resolve_bindings(&raw.keybindings)?;
        validate_movement(&raw.movement)?;
        validate_scrolling(&raw.smooth_scrolling)?;
        let layout = resolve_layout(&raw.region_select.layout)?;

        let helper = if raw.region_select.helper.is_absolute() {
            raw.region_select.helper
        } else {
            base_dir.join(raw.region_select.helper)
        };

        Ok(Self {
            path: PathBuf::new(),
            bindings,
            movement: raw.movement,
            scrolling: raw.smooth_scrolling,
            region_select: RegionSelectConfig {
                helper,
                helper_args: raw.region_select.helper_args,
                layout,
            },
        })
    }
}

fn resolve_bindings(raw: &RawKeybindings) -> Result<KeyBindings, ConfigError> {
    let hotkey = Hotkey::parse(&raw.toggle_mode_hotkey)
        .ok_or_else(|| ConfigError::BadHotkey(raw.toggle_mode_hotkey.clone()))?;
    let mut bindings = KeyBindings::new(hotkey);

    let mut entries: Vec<(&'static str, &str, Action)> = vec![
        ("move_up", raw.move_up.as_str(), Action::MoveUp),
        ("move_down", raw.move_down.as_str(), Action::MoveDown),
        ("move_left", raw.move_left.as_str(), Action::MoveLeft),
        ("move_right", raw.move_right.as_str(), Action::MoveRight),
        ("scroll_up", raw.scroll_up.as_str(), Action::ScrollUp),
        ("scroll_down", raw.scroll_down.as_str(), Action::ScrollDown),
        ("left_click", raw.left_click.as_str(), Action::LeftClick),
        ("right_click", raw.right_click.as_str(), Action::RightClick),
        ("middle_click", raw.middle_click.as_str(), Action::MiddleClick),
        ("sticky_left_click", raw.sticky_left_click.as_str(), Action::StickyLeftClick),
        ("toggle_mode_internal", raw.toggle_mode_internal.as_str(), Action::ToggleModeInternal),
        ("enter_region_select", raw.enter_region_select.as_str(), Action::EnterRegionSelect),
        ("speed_shift", raw.speed_shift.as_str(), Action::SpeedShift),
        ("speed_caps", raw.speed_caps.as_str(), Action::SpeedCaps),
    ];
    if let Some(exit) = &raw.exit_program {
        entries.push(("exit_program", exit.as_str(), Action::ExitProgram));
    }

    for (field, name, action) in entries {
        let code = vk_from_name(name).ok_or_else(|| ConfigError::UnknownKey {
            field,
            name: name.to_string(),
        })?;
        match bindings.bind(code, action) {
            Ok(()) => {}
            Err(BindError::Taken(existing)) => {
                return Err(ConfigError::DuplicateBinding {
                    field,
                    name: name.to_string(),
                    existing,
                })
            }
            Err(BindError::OutOfRange(_)) => {
                return Err(ConfigError::UnknownKey {
                    field,
                    name: name.to_string(),
                })
            }
        }
    }

    Ok(bindings)
}

/// NaN fails every comparison, so each float is checked for this explicitly
fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate_movement(movement: &MovementConfig) -> Result<(), ConfigError> {
    if movement.speed <= 0 {
        return Err(ConfigError::Invalid("[movement] speed must be positive".into()));
    }
    if !positive(movement.shift_multiplier) || !positive(movement.caps_multiplier) {
        return Err(ConfigError::Invalid(
            "[movement] speed multipliers must be positive".into(),
        ));
    }
    if !positive(movement.delay_per_step)
        || Duration::try_from_secs_f64(movement.delay_per_step).is_err()
    {
        return Err(ConfigError::Invalid(
            "[movement] delay_per_step must be a positive number of seconds".into(),
        ));
    }
    Ok(())
}

fn validate_scrolling(scrolling: &ScrollConfig) -> Result<(), ConfigError> {
    if !positive(scrolling.initial_velocity)
        || !(scrolling.acceleration.is_finite() && scrolling.acceleration >= 0.0)
    {
        return Err(ConfigError::Invalid(
            "[smooth_scrolling] initial_velocity must be positive and acceleration non-negative"
                .into(),
        ));
    }
    if !positive(scrolling.max_velocity) || scrolling.max_velocity < scrolling.initial_velocity {
        return Err(ConfigError::Invalid(
            "[smooth_scrolling] max_velocity must not be below initial_velocity".into(),
        ));
    }
    Ok(())
}

fn resolve_layout(rows: &[String]) -> Result<Vec<Vec<char>>, ConfigError> {
    let layout: Vec<Vec<char>> = rows
        .iter()
        .map(|row| {
            row.chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_ascii_lowercase())
                .collect()
        })
        .collect();

    let width = layout.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return Err(ConfigError::Invalid("[region_select] layout is empty".into()));
    }
    if layout.iter().any(|row| row.len() != width) {
        return Err(ConfigError::Invalid(
            "[region_select] every layout row must have the same number of keys".into(),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = layout.iter().flatten().find(|c| !seen.insert(**c)) {
        return Err(ConfigError::Invalid(format!(
            "[region_select] layout label {dup:?} appears more than once"
        )));
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::vk;

    const EXAMPLE: &str = include_str!("../config.example.toml");

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::parse(text, Path::new("/opt/keymouse"))
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse(EXAMPLE).unwrap();

        assert_eq!(config.bindings.action_for(0x57), Some(Action::MoveUp));
        assert_eq!(config.bindings.action_for(vk::SPACE), Some(Action::LeftClick));
        assert_eq!(config.bindings.action_for(vk::LSHIFT), Some(Action::SpeedShift));
        assert_eq!(config.bindings.hotkey.trigger, 0x41);
        assert_eq!(config.movement.speed, 20);
        assert_eq!(config.movement.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.region_select.layout.len(), 4);
        assert_eq!(config.region_select.layout[1], vec!['q', 'w', 'e', 'r', 't']);
        assert_eq!(
            config.region_select.helper,
            Path::new("/opt/keymouse").join("RegionSelector.exe")
        );
    }

    #[test]
    fn test_region_select_section_is_optional() {
        let text: String = EXAMPLE
            .split("[region_select]")
            .next()
            .unwrap()
            .to_string();
        let config = parse(&text).unwrap();
        assert_eq!(config.region_select.layout[0], vec!['1', '2', '3', '4', '5']);
    }

    #[test]
    fn test_optional_bindings_default() {
        let text = EXAMPLE
            .replace("exit_program = \"f12\"\n", "")
            .replace("speed_shift = \"lshift\"\n", "");
        let config = parse(&text).unwrap();
        assert_eq!(config.bindings.key_for(Action::ExitProgram), None);
        assert_eq!(config.bindings.key_for(Action::SpeedShift), Some(vk::LSHIFT));
    }

    #[test]
    fn test_unknown_key_name() {
        let text = EXAMPLE.replace("move_up = \"w\"", "move_up = \"hyper\"");
        assert!(matches!(
            parse(&text),
            Err(ConfigError::UnknownKey { field: "move_up", .. })
        ));
    }

    #[test]
    fn test_duplicate_binding() {
        let text = EXAMPLE.replace("right_click = \"e\"", "right_click = \"space\"");
        assert!(matches!(
            parse(&text),
            Err(ConfigError::DuplicateBinding {
                field: "right_click",
                existing: Action::LeftClick,
                ..
            })
        ));
    }

    #[test]
    fn test_bad_hotkey() {
        let text = EXAMPLE.replace("\"<alt>+a\"", "\"<alt>+<ctrl>+a\"");
        assert!(matches!(parse(&text), Err(ConfigError::BadHotkey(_))));
    }

    #[test]
    fn test_missing_section_is_fatal() {
        let text = EXAMPLE.replace("[movement]", "[motion]");
        assert!(matches!(parse(&text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_numbers() {
        let text = EXAMPLE.replace("delay_per_step = 0.01", "delay_per_step = 0.0");
        assert!(matches!(parse(&text), Err(ConfigError::Invalid(_))));

        let text = EXAMPLE.replace("max_velocity = 3000.0", "max_velocity = 10.0");
        assert!(matches!(parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_nan_values_rejected() {
        for (from, to) in [
            ("initial_velocity = 300.0", "initial_velocity = nan"),
            ("max_velocity = 3000.0", "max_velocity = nan"),
            ("acceleration = 1500.0", "acceleration = nan"),
            ("shift_multiplier = 0.5", "shift_multiplier = nan"),
            ("delay_per_step = 0.01", "delay_per_step = nan"),
        ] {
            let text = EXAMPLE.replace(from, to);
            assert!(
                matches!(parse(&text), Err(ConfigError::Invalid(_))),
                "{to} accepted"
            );
        }
    }

    #[test]
    fn test_unrepresentable_delay_rejected() {
        let text = EXAMPLE.replace("delay_per_step = 0.01", "delay_per_step = 1e30");
        assert!(matches!(parse(&text), Err(ConfigError::Invalid(_))));

        let text = EXAMPLE.replace("delay_per_step = 0.01", "delay_per_step = inf");
        assert!(matches!(parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_layout_validation() {
        assert!(resolve_layout(&["abc".into(), "de".into()]).is_err());
        assert!(resolve_layout(&[]).is_err());
        assert!(resolve_layout(&["aba".into()]).is_err());
        assert_eq!(
            resolve_layout(&["1 2".into(), "Q W".into()]).unwrap(),
            vec![vec!['1', '2'], vec!['q', 'w']]
        );
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_from_path_resolves_helper_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, EXAMPLE).unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.path, path);
        assert_eq!(
            config.region_select.helper,
            dir.path().join("RegionSelector.exe")
        );
    }
}
