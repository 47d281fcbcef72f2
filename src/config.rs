//! JSON configuration: controller address, pose tables, safety caps.
//!
//! ```json
//! {
//!   "robot_ip": "10.10.73.237",
//!   "poses": {
//!     "home": [0.0, -1.57, 1.57, -1.57, -1.57, 0.0],
//!     "letter_sources": { "A": [0.36, -0.15, 0.20, 2.22, -2.32, 0.11] },
//!     "slots": { "1": [0.10, 0.30, 0.20, 2.22, -2.32, 0.11] }
//!   },
//!   "safety": { "safe_height": 0.25, "z_pick_offset": -0.05, "max_speed": 0.1, "max_acc": 0.2 }
//! }
//! ```
//!
//! A few keys can be overridden from the environment:
//! `WORDBUDDY_ROBOT_IP`, `WORDBUDDY_PORT`, `WORDBUDDY_SIMULATE`.

use crate::pick_place::Descent;
use crate::poses::PoseStore;
use crate::protocol::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
use crate::settle::SettlePolicy;
use crate::types::{PoseSpace, SafetyLimits};
use crate::{Result, RobotError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Controller address. `null` means run simulated.
    #[serde(default)]
    pub robot_ip: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_s")]
    pub connect_timeout_s: f64,
    #[serde(default)]
    pub poses: PosesConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub pose_space: PoseSpace,
    #[serde(default)]
    pub descent: Descent,
    #[serde(default)]
    pub gripper: GripperMode,
    #[serde(default)]
    pub settle: SettleConfig,
    #[serde(default = "default_home_pose")]
    pub home_pose: String,
}

/// Raw pose tables. Named poses sit next to `letter_sources` and `slots`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PosesConfig {
    #[serde(default)]
    pub letter_sources: HashMap<String, Vec<f64>>,
    #[serde(default)]
    pub slots: HashMap<String, Vec<f64>>,
    #[serde(flatten)]
    pub named: HashMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_safe_height")]
    pub safe_height: f64,
    #[serde(default = "default_z_pick_offset")]
    pub z_pick_offset: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_max_acc")]
    pub max_acc: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        let d = SafetyLimits::default();
        Self {
            safe_height: d.safe_height,
            z_pick_offset: d.z_pick_offset,
            max_speed: d.max_speed,
            max_acc: d.max_acceleration,
        }
    }
}

impl SafetyConfig {
    pub fn limits(&self) -> Result<SafetyLimits> {
        let limits = SafetyLimits {
            max_speed: self.max_speed,
            max_acceleration: self.max_acc,
            safe_height: self.safe_height,
            z_pick_offset: self.z_pick_offset,
        };
        limits.validate()?;
        Ok(limits)
    }
}

/// How the gripper is actuated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GripperMode {
    /// Local script files sent verbatim to the controller.
    Scripts {
        open_script: PathBuf,
        close_script: PathBuf,
    },
    /// Tool digital output; high closes the jaws.
    DigitalOutput {
        #[serde(default)]
        pin: u8,
    },
}

impl Default for GripperMode {
    fn default() -> Self {
        GripperMode::DigitalOutput { pin: 0 }
    }
}

/// Settle timing in seconds. Setting `ack_timeout_s` switches to
/// acknowledgment-based settling.
#[derive(Debug, Clone, Deserialize)]
pub struct SettleConfig {
    #[serde(default = "default_motion_s")]
    pub motion_s: f64,
    #[serde(default = "default_short_s")]
    pub relative_s: f64,
    #[serde(default = "default_short_s")]
    pub gripper_s: f64,
    #[serde(default)]
    pub ack_timeout_s: Option<f64>,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            motion_s: default_motion_s(),
            relative_s: default_short_s(),
            gripper_s: default_short_s(),
            ack_timeout_s: None,
        }
    }
}

impl SettleConfig {
    pub fn policy(&self) -> SettlePolicy {
        match self.ack_timeout_s {
            Some(t) => SettlePolicy::Acknowledged {
                timeout: secs(t),
            },
            None => SettlePolicy::Fixed {
                motion: secs(self.motion_s),
                relative: secs(self.relative_s),
                gripper: secs(self.gripper_s),
            },
        }
    }
}

fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s).unwrap_or(Duration::ZERO)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_timeout_s() -> f64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs_f64()
}
fn default_home_pose() -> String {
    "home".to_string()
}
fn default_safe_height() -> f64 {
    SafetyLimits::default().safe_height
}
fn default_z_pick_offset() -> f64 {
    SafetyLimits::default().z_pick_offset
}
fn default_max_speed() -> f64 {
    SafetyLimits::default().max_speed
}
fn default_max_acc() -> f64 {
    SafetyLimits::default().max_acceleration
}
fn default_motion_s() -> f64 {
    2.0
}
fn default_short_s() -> f64 {
    1.0
}

impl Config {
    /// Read and parse a JSON config file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RobotError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Config::from_json(&text)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse a JSON document and validate the safety caps.
    pub fn from_json(text: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(text)?;
        config.safety.limits()?;
        PoseStore::from_config(&config.poses, config.pose_space)?;
        Ok(config)
    }

    pub fn limits(&self) -> Result<SafetyLimits> {
        self.safety.limits()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.connect_timeout_s).unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Apply `WORDBUDDY_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ip) = lookup("WORDBUDDY_ROBOT_IP") {
            let ip = ip.trim();
            self.robot_ip = match ip.to_ascii_lowercase().as_str() {
                "" | "none" | "null" => None,
                _ => Some(ip.to_string()),
            };
        }
        if let Some(port) = lookup("WORDBUDDY_PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.port = p,
                Err(_) => log::warn!(
                    "Ignoring WORDBUDDY_PORT='{}', keeping port {}",
                    port,
                    self.port
                ),
            }
        }
        if let Some(v) = lookup("WORDBUDDY_SIMULATE") {
            if parse_bool(&v) == Some(true) {
                log::info!("WORDBUDDY_SIMULATE set, dropping robot_ip");
                self.robot_ip = None;
            }
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "robot_ip": null,
        "poses": {
            "home": [0.0, -1.57, 1.57, -1.57, -1.57, 0.0],
            "letter_sources": { "A": [0.36, -0.15, 0.20, 2.22, -2.32, 0.11] },
            "slots": { "1": [0.10, 0.30, 0.20, 2.22, -2.32, 0.11] }
        },
        "safety": { "safe_height": 0.25, "z_pick_offset": -0.05, "max_speed": 0.1, "max_acc": 0.2 }
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert!(config.robot_ip.is_none());
        assert_eq!(config.port, 30002);
        assert!(config.poses.named.contains_key("home"));
        assert!(!config.poses.named.contains_key("letter_sources"));
        assert_eq!(config.poses.letter_sources.len(), 1);
        assert_eq!(config.poses.slots["1"].len(), 6);
        let limits = config.limits().unwrap();
        assert_eq!(limits.z_pick_offset, -0.05);
        assert_eq!(limits.max_acceleration, 0.2);
        assert_eq!(config.gripper, GripperMode::DigitalOutput { pin: 0 });
        assert_eq!(config.pose_space, PoseSpace::Cartesian);
        assert_eq!(config.descent, Descent::Offset);
    }

    #[test]
    fn test_safety_defaults() {
        let config = Config::from_json("{}").unwrap();
        let limits = config.limits().unwrap();
        assert_eq!(limits, SafetyLimits::default());
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_rejects_zero_speed() {
        let err = Config::from_json(r#"{"safety": {"max_speed": 0.0}}"#).unwrap_err();
        assert!(matches!(err, RobotError::InvalidSafetyLimits(_)));
    }

    #[test]
    fn test_rejects_short_pose_vector() {
        let err = Config::from_json(r#"{"poses": {"slots": {"0": [0.1, 0.2, 0.3]}}}"#).unwrap_err();
        assert!(matches!(
            err,
            RobotError::InvalidVectorLength {
                expected: 6,
                actual: 3
            }
        ));

        let err = Config::from_json(r#"{"poses": {"home": [0.0, 0.0]}}"#).unwrap_err();
        assert!(matches!(err, RobotError::InvalidVectorLength { actual: 2, .. }));
    }

    #[test]
    fn test_gripper_scripts() {
        let config = Config::from_json(
            r#"{"gripper": {"open_script": "open.script", "close_script": "close.script"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.gripper,
            GripperMode::Scripts {
                open_script: "open.script".into(),
                close_script: "close.script".into(),
            }
        );
    }

    #[test]
    fn test_settle_policy() {
        let fixed = Config::from_json("{}").unwrap().settle.policy();
        assert_eq!(
            fixed,
            SettlePolicy::Fixed {
                motion: Duration::from_secs(2),
                relative: Duration::from_secs(1),
                gripper: Duration::from_secs(1),
            }
        );
        let ack = Config::from_json(r#"{"settle": {"ack_timeout_s": 5.0}}"#)
            .unwrap()
            .settle
            .policy();
        assert_eq!(
            ack,
            SettlePolicy::Acknowledged {
                timeout: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_json(r#"{"robot_ip": "10.0.0.2"}"#).unwrap();
        config.apply_overrides(|name| match name {
            "WORDBUDDY_PORT" => Some("30003".into()),
            "WORDBUDDY_ROBOT_IP" => Some(" 192.168.1.5 ".into()),
            _ => None,
        });
        assert_eq!(config.robot_ip.as_deref(), Some("192.168.1.5"));
        assert_eq!(config.port, 30003);

        config.apply_overrides(|name| match name {
            "WORDBUDDY_PORT" => Some("not-a-port".into()),
            "WORDBUDDY_SIMULATE" => Some("YES".into()),
            _ => None,
        });
        assert!(config.robot_ip.is_none());
        assert_eq!(config.port, 30003);
    }
}
