//! Configuration Vault – reads/writes `~/.headsync/config.toml`.

use headsync_perception::{GazeSettings, RigCalibration};
use headsync_runtime::{DEFAULT_BODY_TAG, DEFAULT_HEAD_TAG};
use headsync_types::{LayerTable, Pose, RawReconcilerConfig, ReconcilerConfig, SyncError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persisted session configuration stored in `~/.headsync/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Apply the device orientation to the camera.
    #[serde(default = "default_true")]
    pub track_rotation: bool,

    /// Apply the device position offset to the camera.
    #[serde(default = "default_true")]
    pub track_position: bool,

    /// Reconcile in the early phase as well as the late one.
    #[serde(default)]
    pub update_early: bool,

    /// Gaze raycast range in metres.
    #[serde(default = "default_gaze_range")]
    pub gaze_range: f32,

    /// Layers the gaze ray can hit.  Empty means every layer.
    #[serde(default = "default_raycast_layers")]
    pub raycast_layers: Vec<String>,

    /// Project layer names, numbered from 8.
    #[serde(default = "default_user_layers")]
    pub user_layers: Vec<String>,

    /// Frames to simulate.
    #[serde(default = "default_frames")]
    pub frames: u64,

    /// Simulated frame rate; also paces the loop when `realtime` is set.
    #[serde(default = "default_frame_rate")]
    pub frame_rate_hz: f32,

    /// Sleep between frames to run at `frame_rate_hz`.
    #[serde(default = "default_true")]
    pub realtime: bool,

    /// Scene tag of the character's head bone.
    #[serde(default = "default_head_tag")]
    pub head_tag: String,

    /// Scene tag of the character's body root.
    #[serde(default = "default_body_tag")]
    pub body_tag: String,

    /// Reference frame for head motion.  Absent means the camera's parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Pose>,

    /// Axis remaps for the character rig.
    #[serde(default)]
    pub calibration: RigCalibration,
}

fn default_true() -> bool {
    true
}
fn default_gaze_range() -> f32 {
    headsync_perception::DEFAULT_GAZE_RANGE
}
fn default_raycast_layers() -> Vec<String> {
    vec!["Default".to_string(), "Props".to_string()]
}
fn default_user_layers() -> Vec<String> {
    vec!["Ground".to_string(), "Props".to_string()]
}
fn default_frames() -> u64 {
    600
}
fn default_frame_rate() -> f32 {
    60.0
}
fn default_head_tag() -> String {
    DEFAULT_HEAD_TAG.to_string()
}
fn default_body_tag() -> String {
    DEFAULT_BODY_TAG.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            track_rotation: true,
            track_position: true,
            update_early: false,
            gaze_range: default_gaze_range(),
            raycast_layers: default_raycast_layers(),
            user_layers: default_user_layers(),
            frames: default_frames(),
            frame_rate_hz: default_frame_rate(),
            realtime: true,
            head_tag: default_head_tag(),
            body_tag: default_body_tag(),
            target: None,
            calibration: RigCalibration::default(),
        }
    }
}

impl Config {
    /// Validated reconciler settings.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when the target orientation is
    /// not a unit quaternion.
    pub fn reconciler_config(&self) -> Result<ReconcilerConfig, SyncError> {
        ReconcilerConfig::try_from(RawReconcilerConfig {
            track_rotation: self.track_rotation,
            track_position: self.track_position,
            has_target: self.target.is_some(),
            target: self.target,
        })
    }

    pub fn layer_table(&self) -> LayerTable {
        LayerTable::default().with_user_layers(self.user_layers.iter().cloned())
    }

    /// Gaze range and layer mask.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] for a non-positive range or a
    /// layer name that is not in the table.
    pub fn gaze_settings(&self) -> Result<GazeSettings, SyncError> {
        let table = self.layer_table();
        if let Some(unknown) = self
            .raycast_layers
            .iter()
            .find(|name| table.index_of(name.as_str()).is_none())
        {
            return Err(SyncError::InvalidConfig(format!("unknown raycast layer '{unknown}'")));
        }
        let mask = if self.raycast_layers.is_empty() {
            headsync_types::LayerMask::ALL
        } else {
            table.mask(&self.raycast_layers)
        };
        GazeSettings::new(self.gaze_range, mask)
    }

    /// Duration of one simulated frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] for a non-positive frame rate or
    /// one so low that a frame does not fit in a [`Duration`].
    pub fn frame_time(&self) -> Result<Duration, SyncError> {
        if !self.frame_rate_hz.is_finite() || self.frame_rate_hz <= 0.0 {
            return Err(SyncError::InvalidConfig(format!(
                "frame_rate_hz must be positive, got {}",
                self.frame_rate_hz
            )));
        }
        Duration::try_from_secs_f32(1.0 / self.frame_rate_hz).map_err(|e| {
            SyncError::InvalidConfig(format!(
                "frame_rate_hz {} gives an unrepresentable frame time: {}",
                self.frame_rate_hz, e
            ))
        })
    }
}

/// Return the path to `~/.headsync/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".headsync").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SyncError> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SyncError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("Failed to read config at {}: {}", path.display(), e))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| SyncError::Config(format!("Failed to parse config: {}", e)))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `HEADSYNC_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HEADSYNC_FRAMES` | `frames` |
/// | `HEADSYNC_GAZE_RANGE` | `gaze_range` |
/// | `HEADSYNC_UPDATE_EARLY` | `update_early` |
/// | `HEADSYNC_TRACK_POSITION` | `track_position` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("HEADSYNC_FRAMES")
        && let Ok(frames) = v.trim().parse::<u64>()
    {
        cfg.frames = frames;
    }
    if let Ok(v) = std::env::var("HEADSYNC_GAZE_RANGE")
        && let Ok(range) = v.trim().parse::<f32>()
    {
        cfg.gaze_range = range;
    }
    if let Ok(v) = std::env::var("HEADSYNC_UPDATE_EARLY")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.update_early = flag;
    }
    if let Ok(v) = std::env::var("HEADSYNC_TRACK_POSITION")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.track_position = flag;
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.headsync/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SyncError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SyncError::Config(format!("Failed to create config directory: {}", e)))?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                SyncError::Config(format!("Failed to set config directory permissions: {}", e))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| SyncError::Config(format!("Failed to serialize config: {}", e)))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| {
                SyncError::Config(format!("Failed to write config at {}: {}", path.display(), e))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| {
        SyncError::Config(format!("Failed to write config at {}: {}", path.display(), e))
    })?;
    Ok(())
}
