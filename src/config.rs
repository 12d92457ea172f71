use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::robot::JointRange;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    /// Depth divisor for the z projection
    #[serde(default = "default_z_scale")]
    pub z_scale: f64,
    /// Landmarks at or below this visibility are ignored
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,
    /// Compute head angles
    #[serde(default = "default_true")]
    pub head: bool,
    /// Compute elbow angles
    #[serde(default = "default_true")]
    pub elbows: bool,
}

fn default_z_scale() -> f64 { 2.5 }
fn default_visibility_threshold() -> f64 { 0.5 }
fn default_target_fps() -> f64 { 30.0 }
fn default_true() -> bool { true }

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            z_scale: default_z_scale(),
            visibility_threshold: default_visibility_threshold(),
            target_fps: default_target_fps(),
            head: true,
            elbows: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// History length per side
    #[serde(default = "default_frame_window")]
    pub frame_window: usize,
    /// Degrees; smaller changes pass through
    #[serde(default = "default_deviation_floor")]
    pub deviation_floor: f64,
    /// Degrees; larger changes are treated as real motion
    #[serde(default = "default_difference_ceiling")]
    pub difference_ceiling: f64,
}

fn default_frame_window() -> usize { 5 }
fn default_deviation_floor() -> f64 { 5.0 }
fn default_difference_ceiling() -> f64 { 30.0 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_window: default_frame_window(),
            deviation_floor: default_deviation_floor(),
            difference_ceiling: default_difference_ceiling(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SenderConfig {
    #[serde(default = "default_robot_addr")]
    pub addr: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Minimum gap between reconnect attempts while disconnected
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

fn default_robot_addr() -> String { "127.0.0.1:65432".to_string() }
fn default_connect_timeout_ms() -> u64 { 2000 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            addr: default_robot_addr(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    #[serde(default = "default_robot_addr")]
    pub listen_addr: String,
    #[serde(default = "default_speed")]
    pub head_speed: f64,
    #[serde(default = "default_speed")]
    pub elbow_speed: f64,
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// Bytes per socket read
    #[serde(default = "default_read_buffer")]
    pub read_buffer: usize,
    /// An unterminated message larger than this ends the session
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Stiffness group acquired for the session and relaxed afterwards
    #[serde(default = "default_stiffness_group")]
    pub stiffness_group: String,
    #[serde(default = "default_left_elbow_range")]
    pub left_elbow_range: JointRange,
    #[serde(default = "default_right_elbow_range")]
    pub right_elbow_range: JointRange,
}

fn default_speed() -> f64 { 0.2 }
fn default_min_speed() -> f64 { 0.1 }
fn default_max_speed() -> f64 { 1.0 }
fn default_read_buffer() -> usize { 1024 }
fn default_max_message_bytes() -> usize { 1024 * 1024 }
fn default_stiffness_group() -> String { "Body".to_string() }
fn default_left_elbow_range() -> JointRange { JointRange::new(-1.54, -0.03) }
fn default_right_elbow_range() -> JointRange { JointRange::new(0.03, 1.54) }

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_robot_addr(),
            head_speed: default_speed(),
            elbow_speed: default_speed(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            read_buffer: default_read_buffer(),
            max_message_bytes: default_max_message_bytes(),
            stiffness_group: default_stiffness_group(),
            left_elbow_range: default_left_elbow_range(),
            right_elbow_range: default_right_elbow_range(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Missing or broken config files fall back to the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
