use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{Tunables, TunablesSource};

pub const CONFIG_DIR_NAME: &str = "tfdrag";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize tunables: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    gesture: GestureSection,
    cancellation: CancellationSection,
    inertia: InertiaSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct GestureSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    speed_percent: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    one_finger_transition_delay_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activation_threshold_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activation_threshold_ms: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CancellationSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    automatic_timeout_delay_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on_finger_count_change: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct InertiaSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_flick_velocity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_flick_distance_px: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_flick_timespan_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    friction_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    friction_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed_multiplier: Option<f64>,
}

impl ConfigDocument {
    fn into_tunables(self) -> Tunables {
        let d = Tunables::default();
        let Self {
            gesture,
            cancellation,
            inertia,
        } = self;

        Tunables {
            gesture_speed_percent: gesture.speed_percent.unwrap_or(d.gesture_speed_percent),
            cancellation_delay_ms: cancellation.delay_ms.unwrap_or(d.cancellation_delay_ms),
            automatic_timeout_delay_ms: cancellation
                .automatic_timeout_delay_ms
                .unwrap_or(d.automatic_timeout_delay_ms),
            one_finger_transition_delay_ms: gesture
                .one_finger_transition_delay_ms
                .unwrap_or(d.one_finger_transition_delay_ms),
            cancel_on_finger_count_change: cancellation
                .on_finger_count_change
                .unwrap_or(d.cancel_on_finger_count_change),
            activation_threshold_enabled: gesture
                .activation_threshold_enabled
                .unwrap_or(d.activation_threshold_enabled),
            activation_threshold_ms: gesture
                .activation_threshold_ms
                .unwrap_or(d.activation_threshold_ms),
            inertia_enabled: inertia.enabled.unwrap_or(d.inertia_enabled),
            min_flick_velocity: inertia.min_flick_velocity.unwrap_or(d.min_flick_velocity),
            min_flick_distance_px: inertia
                .min_flick_distance_px
                .unwrap_or(d.min_flick_distance_px),
            max_flick_timespan_s: inertia
                .max_flick_timespan_s
                .unwrap_or(d.max_flick_timespan_s),
            inertia_friction_start: inertia.friction_start.unwrap_or(d.inertia_friction_start),
            inertia_friction_end: inertia.friction_end.unwrap_or(d.inertia_friction_end),
            inertia_speed_multiplier: inertia
                .speed_multiplier
                .unwrap_or(d.inertia_speed_multiplier),
        }
        .sanitized()
    }

    fn from_tunables(t: &Tunables) -> Self {
        Self {
            gesture: GestureSection {
                speed_percent: Some(t.gesture_speed_percent),
                one_finger_transition_delay_ms: Some(t.one_finger_transition_delay_ms),
                activation_threshold_enabled: Some(t.activation_threshold_enabled),
                activation_threshold_ms: Some(t.activation_threshold_ms),
            },
            cancellation: CancellationSection {
                delay_ms: Some(t.cancellation_delay_ms),
                automatic_timeout_delay_ms: Some(t.automatic_timeout_delay_ms),
                on_finger_count_change: Some(t.cancel_on_finger_count_change),
            },
            inertia: InertiaSection {
                enabled: Some(t.inertia_enabled),
                min_flick_velocity: Some(t.min_flick_velocity),
                min_flick_distance_px: Some(t.min_flick_distance_px),
                max_flick_timespan_s: Some(t.max_flick_timespan_s),
                friction_start: Some(t.inertia_friction_start),
                friction_end: Some(t.inertia_friction_end),
                speed_multiplier: Some(t.inertia_speed_multiplier),
            },
        }
    }
}

/// `$XDG_CONFIG_HOME/tfdrag/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn parse_tunables(text: &str) -> Result<Tunables, toml::de::Error> {
    let document: ConfigDocument = toml::from_str(text)?;
    Ok(document.into_tunables())
}

pub fn render_tunables(tunables: &Tunables) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(&ConfigDocument::from_tunables(tunables))?)
}

pub fn load_tunables(path: &Path) -> Result<Tunables, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tunables(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_tunables(path: &Path, tunables: &Tunables) -> Result<(), ConfigError> {
    let text = render_tunables(tunables)?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)
}

#[derive(Debug)]
struct FileState {
    tunables: Tunables,
    modified: Option<SystemTime>,
}

/// Tunables backed by a TOML file, reloaded when its modification time
/// changes. A file that fails to parse leaves the last good value in place.
#[derive(Debug)]
pub struct TunablesFile {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl TunablesFile {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let source = Self {
            path: path.into(),
            state: Mutex::new(FileState {
                tunables: Tunables::default(),
                modified: None,
            }),
        };
        source.refresh();
        source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

impl TunablesSource for TunablesFile {
    fn current(&self) -> Tunables {
        self.state.lock().tunables
    }

    fn refresh(&self) -> bool {
        let modified = self.modified();
        let mut state = self.state.lock();
        if modified.is_some() && modified == state.modified {
            return false;
        }
        if modified.is_none() && state.modified.is_none() {
            return false;
        }
        state.modified = modified;

        match load_tunables(&self.path) {
            Ok(tunables) => {
                let changed = tunables != state.tunables;
                if changed {
                    log::info!(
                        "config: reloaded path={} speed={} cancel_delay_ms={}",
                        self.path.display(),
                        tunables.gesture_speed_percent,
                        tunables.cancellation_delay_ms
                    );
                }
                state.tunables = tunables;
                changed
            }
            Err(err) if err.is_not_found() => {
                log::debug!("config: missing path={} keep=last", self.path.display());
                false
            }
            Err(err) => {
                log::warn!("config: reload_failed keep=last err={}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
