//! Configuration loader and validator
//!
//! Loads settings and mapping profiles from TOML files in the configs/
//! directory. Everything is validated on load so that bad thresholds or
//! unknown key names surface at startup, never inside the poll loop.

use crate::backend::{Key, MouseButton};
use crate::bigben::constants::{DEFAULT_RECONNECT_BACKOFF_MS, MAX_READ_TIMEOUT_MS};
use crate::bigben::{Button, Layout, StickType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use log::{info, debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Which output sink the bridge drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Synthetic keyboard and mouse events
    #[default]
    KeyMouse,
    /// Standard HID gamepad reports
    Hid,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Wire layout of the controller's input reports
    #[serde(default)]
    pub layout: Layout,

    #[serde(default)]
    pub output: OutputMode,

    /// Integer stick deadzone around center (0-127), HID path
    #[serde(default = "default_stick_deadzone")]
    pub stick_deadzone: u8,

    /// Integer trigger deadzone (0-255), both paths
    #[serde(default)]
    pub trigger_deadzone: u8,

    /// Normalized inner deadzone, key/mouse path
    #[serde(default = "default_inner_deadzone")]
    pub inner_deadzone: f64,

    /// Normalized outer deadzone, key/mouse path
    #[serde(default = "default_outer_deadzone")]
    pub outer_deadzone: f64,

    /// Apply the multi-stage response curve after the deadzone
    #[serde(default = "default_true")]
    pub response_curve: bool,

    /// Shaped deflection at which a stick direction counts as pressed
    #[serde(default = "default_digital_threshold")]
    pub digital_threshold: f64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    /// Give up after this many consecutive failed opens; absent retries forever
    #[serde(default)]
    pub max_open_attempts: Option<u32>,

    /// Mouse delta flush period in microseconds (default ~60 Hz)
    #[serde(default = "default_flush_interval_us")]
    pub flush_interval_us: u64,

    /// Default active profile name
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    /// Sensitivity multipliers to cycle through
    #[serde(default = "default_sensitivity_factors")]
    pub sensitivity_factor: Vec<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            output: OutputMode::default(),
            stick_deadzone: default_stick_deadzone(),
            trigger_deadzone: 0,
            inner_deadzone: default_inner_deadzone(),
            outer_deadzone: default_outer_deadzone(),
            response_curve: true,
            digital_threshold: default_digital_threshold(),
            poll_interval_ms: default_poll_interval_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            max_open_attempts: None,
            flush_interval_us: default_flush_interval_us(),
            default_profile: default_profile_name(),
            sensitivity_factor: default_sensitivity_factors(),
        }
    }
}

fn default_stick_deadzone() -> u8 { 12 }
fn default_inner_deadzone() -> f64 { 0.10 }
fn default_outer_deadzone() -> f64 { 0.95 }
fn default_true() -> bool { true }
fn default_digital_threshold() -> f64 { 0.5 }
fn default_poll_interval_ms() -> u64 { 3 }
fn default_read_timeout_ms() -> u64 { MAX_READ_TIMEOUT_MS }
fn default_reconnect_backoff_ms() -> u64 { DEFAULT_RECONNECT_BACKOFF_MS }
fn default_flush_interval_us() -> u64 { 16_667 }
fn default_profile_name() -> String { "base".to_string() }
fn default_sensitivity_factors() -> Vec<f64> { vec![1.0, 2.0, 3.0] }
fn default_sensitivity() -> f64 { 10.0 }

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_micros(self.flush_interval_us)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stick_deadzone > 127 {
            return Err(ConfigError::Invalid(
                "stick_deadzone must be between 0 and 127".into()
            ));
        }

        let (inner, outer) = (self.inner_deadzone, self.outer_deadzone);
        if !(0.0..=1.0).contains(&inner) || !(0.0..=1.0).contains(&outer) || inner >= outer {
            return Err(ConfigError::Invalid(format!(
                "deadzones must satisfy 0 <= inner < outer <= 1 (got inner={}, outer={})",
                inner, outer
            )));
        }

        if !(self.digital_threshold > 0.0 && self.digital_threshold < 1.0) {
            return Err(ConfigError::Invalid(
                "digital_threshold must be between 0.0 and 1.0 (exclusive)".into()
            ));
        }

        if !(1..=50).contains(&self.poll_interval_ms) {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be between 1 and 50".into()
            ));
        }

        if !(1..=MAX_READ_TIMEOUT_MS).contains(&self.read_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "read_timeout_ms must be between 1 and {}",
                MAX_READ_TIMEOUT_MS
            )));
        }

        if self.reconnect_backoff_ms == 0 {
            return Err(ConfigError::Invalid("reconnect_backoff_ms must be positive".into()));
        }

        if self.max_open_attempts == Some(0) {
            return Err(ConfigError::Invalid("max_open_attempts must be positive when set".into()));
        }

        if self.flush_interval_us == 0 {
            return Err(ConfigError::Invalid("flush_interval_us must be positive".into()));
        }

        for factor in &self.sensitivity_factor {
            if !(*factor > 0.0) {
                return Err(ConfigError::Invalid(
                    "sensitivity_factor values must be positive".into()
                ));
            }
        }

        Ok(())
    }
}

/// A complete set of mappings, switchable at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub buttons: HashMap<Button, Vec<Action>>,

    #[serde(default)]
    pub dpad: DirectionalActions,

    #[serde(default)]
    pub sticks: StickMappings,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            buttons: HashMap::new(),
            dpad: DirectionalActions::default(),
            sticks: StickMappings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StickMappings {
    pub left: Option<StickMapping>,
    pub right: Option<StickMapping>,
}

impl StickMappings {
    pub fn get(&self, stick: StickType) -> Option<&StickMapping> {
        match stick {
            StickType::Left => self.left.as_ref(),
            StickType::Right => self.right.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickMapping {
    pub mode: StickMode,

    /// Mouse mode: pixels per poll cycle at full deflection
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// Report stick-up as positive Y
    #[serde(default)]
    pub invert_y: bool,

    /// Directional mode: one action per direction
    #[serde(default)]
    pub directions: DirectionalActions,
}

/// Stick mapping modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickMode {
    /// Continuous pointer deltas
    Mouse,
    /// Four digital directions
    Directional,
    Disabled,
}

/// One action per cardinal direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionalActions {
    #[serde(default)]
    pub up: Action,
    #[serde(default)]
    pub down: Action,
    #[serde(default)]
    pub left: Action,
    #[serde(default)]
    pub right: Action,
}

/// Action to perform when an input is triggered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Explicit no-op
    #[default]
    #[serde(alias = "disabled")]
    None,

    /// Hold a key (or a `+`-separated combo like "shift+w") while the input is held
    Key { key: String },

    /// Hold a mouse button while the input is held
    Mouse { button: MouseButton },

    /// Switch to the next profile
    #[serde(rename = "cycleprofiles")]
    CycleProfiles,

    /// Switch to the next sensitivity factor
    #[serde(rename = "cyclesensitivity")]
    CycleSensitivity,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        Self::from_toml_str(&content)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        info!("✓ Config parsed successfully");
        debug!("  - Layout: {:?}, output: {:?}", config.settings.layout, config.settings.output);
        debug!("  - Profiles: {}", config.profiles.len());
        debug!("  - Default profile: '{}'", config.settings.default_profile);
        debug!("  - Sensitivity levels: {:?}", config.settings.sensitivity_factor);

        config.validate()?;
        info!("✓ Config validation passed");

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;

        if self.profiles.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one profile is required".into()
            ));
        }

        let mut names = HashSet::new();
        for profile in &self.profiles {
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if !names.contains(self.settings.default_profile.as_str()) {
            return Err(ConfigError::Invalid(
                format!("Default profile '{}' not found", self.settings.default_profile)
            ));
        }

        // Resolving is the validation for actions and key names
        for profile in &self.profiles {
            KeyMapping::from_profile(profile)?;
        }

        self.validate_profile_switching_buttons()?;

        Ok(())
    }

    /// Index of the default profile
    pub fn default_profile_index(&self) -> usize {
        self.profiles
            .iter()
            .position(|p| p.name == self.settings.default_profile)
            .unwrap_or(0)
    }

    /// Every profile that binds CycleProfiles must bind it on the same buttons,
    /// so the user can always cycle back out of any profile.
    fn validate_profile_switching_buttons(&self) -> Result<(), ConfigError> {
        if self.profiles.len() < 2 {
            return Ok(());
        }

        let cycle_buttons = |profile: &Profile| -> BTreeSet<Button> {
            profile
                .buttons
                .iter()
                .filter(|(_, actions)| actions.iter().any(|a| matches!(a, Action::CycleProfiles)))
                .map(|(button, _)| *button)
                .collect()
        };

        let all: BTreeSet<Button> = self.profiles.iter().flat_map(cycle_buttons).collect();

        for profile in &self.profiles {
            let mine = cycle_buttons(profile);
            if let Some(missing) = all.difference(&mine).next() {
                return Err(ConfigError::Invalid(format!(
                    "Profile '{}' is missing CycleProfiles action on button {:?}. \
                     All profiles must have the same profile-switching buttons.",
                    profile.name, missing
                )));
            }
        }

        Ok(())
    }
}

/// An action with key names resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Keys(Vec<Key>),
    Mouse(MouseButton),
    CycleProfiles,
    CycleSensitivity,
}

/// Resolved bindings per cardinal direction; `None` is disabled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionalBindings {
    pub up: Option<Binding>,
    pub down: Option<Binding>,
    pub left: Option<Binding>,
    pub right: Option<Binding>,
}

impl DirectionalBindings {
    /// Bindings in (up, down, left, right) order
    pub fn as_array(&self) -> [Option<&Binding>; 4] {
        [self.up.as_ref(), self.down.as_ref(), self.left.as_ref(), self.right.as_ref()]
    }
}

/// Resolved stick behaviour
#[derive(Debug, Clone, PartialEq)]
pub enum StickBinding {
    Disabled,
    Mouse { sensitivity: f64, invert_y: bool },
    Directional { invert_y: bool, directions: DirectionalBindings },
}

/// Immutable, resolved form of a [`Profile`]
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMapping {
    pub name: String,
    pub buttons: HashMap<Button, Vec<Binding>>,
    pub dpad: DirectionalBindings,
    pub left_stick: StickBinding,
    pub right_stick: StickBinding,
}

impl KeyMapping {
    /// Resolve every key name in a profile; fails on the first unknown name
    pub fn from_profile(profile: &Profile) -> Result<Self, ConfigError> {
        let mut buttons = HashMap::new();
        for (button, actions) in &profile.buttons {
            let context = format!("profile '{}' button {:?}", profile.name, button);
            let resolved: Vec<Binding> = actions
                .iter()
                .map(|a| resolve_action(a, &context))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect();
            if !resolved.is_empty() {
                buttons.insert(*button, resolved);
            }
        }

        let dpad = resolve_directions(&profile.dpad, &format!("profile '{}' dpad", profile.name))?;

        let left_stick = resolve_stick(profile.sticks.left.as_ref(), &profile.name, "left")?;
        let right_stick = resolve_stick(profile.sticks.right.as_ref(), &profile.name, "right")?;

        Ok(Self {
            name: profile.name.clone(),
            buttons,
            dpad,
            left_stick,
            right_stick,
        })
    }

    pub fn stick(&self, stick: StickType) -> &StickBinding {
        match stick {
            StickType::Left => &self.left_stick,
            StickType::Right => &self.right_stick,
        }
    }
}

fn resolve_action(action: &Action, context: &str) -> Result<Option<Binding>, ConfigError> {
    match action {
        Action::None => Ok(None),
        Action::Key { key } => {
            let keys = parse_key_combo(key, context)?;
            if keys.is_empty() {
                warn!("Empty key in {}. Consider using {{ type = \"none\" }} instead.", context);
                return Ok(None);
            }
            Ok(Some(Binding::Keys(keys)))
        }
        Action::Mouse { button } => Ok(Some(Binding::Mouse(*button))),
        Action::CycleProfiles => Ok(Some(Binding::CycleProfiles)),
        Action::CycleSensitivity => Ok(Some(Binding::CycleSensitivity)),
    }
}

/// Parse "shift+w" style combos
fn parse_key_combo(combo: &str, context: &str) -> Result<Vec<Key>, ConfigError> {
    combo
        .split('+')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            Key::parse(name).map_err(|_| {
                ConfigError::Invalid(format!(
                    "Invalid key '{}' in {}: not supported by keyboard backend",
                    name, context
                ))
            })
        })
        .collect()
}

fn resolve_directions(
    actions: &DirectionalActions,
    context: &str,
) -> Result<DirectionalBindings, ConfigError> {
    let one = |action: &Action, dir: &str| -> Result<Option<Binding>, ConfigError> {
        let context = format!("{} {}", context, dir);
        match resolve_action(action, &context)? {
            Some(Binding::CycleProfiles) | Some(Binding::CycleSensitivity) => Err(
                ConfigError::Invalid(format!("{}: cycle actions are only allowed on buttons", context)),
            ),
            other => Ok(other),
        }
    };

    Ok(DirectionalBindings {
        up: one(&actions.up, "up")?,
        down: one(&actions.down, "down")?,
        left: one(&actions.left, "left")?,
        right: one(&actions.right, "right")?,
    })
}

fn resolve_stick(
    mapping: Option<&StickMapping>,
    profile: &str,
    side: &str,
) -> Result<StickBinding, ConfigError> {
    let Some(mapping) = mapping else {
        return Ok(StickBinding::Disabled);
    };

    match mapping.mode {
        StickMode::Disabled => Ok(StickBinding::Disabled),
        StickMode::Mouse => {
            if !(mapping.sensitivity > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "profile '{}' {} stick: sensitivity must be positive",
                    profile, side
                )));
            }
            Ok(StickBinding::Mouse {
                sensitivity: mapping.sensitivity,
                invert_y: mapping.invert_y,
            })
        }
        StickMode::Directional => Ok(StickBinding::Directional {
            invert_y: mapping.invert_y,
            directions: resolve_directions(
                &mapping.directions,
                &format!("profile '{}' {} stick", profile, side),
            )?,
        }),
    }
}
