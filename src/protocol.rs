//! Controller script dialect.
//!
//! Every command the client emits goes through [`Command::encode`], so the
//! numeric formatting is identical at all call sites.

use crate::types::{CartesianPose, JointVector, SafetyLimits};
use std::fmt::Write as _;
use std::time::Duration;

// -- Transport defaults --
pub const DEFAULT_PORT: u16 = 30002;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Fractional digits for every number on the wire.
pub const PRECISION: usize = 5;

/// One controller command with typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Joint-space move: `movej([..], a=, v=)`.
    MoveJoints {
        joints: JointVector,
        acceleration: f64,
        velocity: f64,
    },
    /// Linear tool move to an absolute pose: `movel(p[..], a=, v=)`.
    MoveLinear {
        pose: CartesianPose,
        acceleration: f64,
        velocity: f64,
    },
    /// Linear move of `dz` meters along Z from wherever the tool is now.
    /// Resolved on the controller, so the target is not known client-side.
    MoveRelativeZ {
        dz: f64,
        acceleration: f64,
        velocity: f64,
    },
    SetToolDigitalOut { pin: u8, value: bool },
    Popup {
        message: String,
        title: String,
        warning: bool,
    },
    /// Pre-formatted script passed through untouched.
    Raw(String),
}

impl Command {
    pub fn move_joints(joints: &JointVector, limits: &SafetyLimits) -> Command {
        Command::MoveJoints {
            joints: *joints,
            acceleration: limits.max_acceleration,
            velocity: limits.max_speed,
        }
    }

    pub fn move_linear(pose: &CartesianPose, limits: &SafetyLimits) -> Command {
        Command::MoveLinear {
            pose: *pose,
            acceleration: limits.max_acceleration,
            velocity: limits.max_speed,
        }
    }

    pub fn move_relative_z(dz: f64, limits: &SafetyLimits) -> Command {
        Command::MoveRelativeZ {
            dz,
            acceleration: limits.max_acceleration,
            velocity: limits.max_speed,
        }
    }

    /// Render the command as script text, without a trailing newline.
    pub fn encode(&self) -> String {
        match self {
            Command::MoveJoints {
                joints,
                acceleration,
                velocity,
            } => format!(
                "movej({}, a={}, v={})",
                format_vector(joints.as_array()),
                num(*acceleration),
                num(*velocity)
            ),
            Command::MoveLinear {
                pose,
                acceleration,
                velocity,
            } => format!(
                "movel(p{}, a={}, v={})",
                format_vector(pose.as_array()),
                num(*acceleration),
                num(*velocity)
            ),
            Command::MoveRelativeZ {
                dz,
                acceleration,
                velocity,
            } => format!(
                "p = get_actual_tcp_pose()\np[2] = p[2] + {}\nmovel(p, a={}, v={})",
                num(*dz),
                num(*acceleration),
                num(*velocity)
            ),
            Command::SetToolDigitalOut { pin, value } => format!(
                "set_tool_digital_out({}, {})",
                pin,
                if *value { "True" } else { "False" }
            ),
            Command::Popup {
                message,
                title,
                warning,
            } => format!(
                "popup(\"{}\", title=\"{}\", warning={})",
                escape(message),
                escape(title),
                if *warning { "True" } else { "False" }
            ),
            Command::Raw(script) => script.clone(),
        }
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::MoveJoints { .. } => "movej",
            Command::MoveLinear { .. } => "movel",
            Command::MoveRelativeZ { .. } => "movel_rel_z",
            Command::SetToolDigitalOut { .. } => "tool_digital_out",
            Command::Popup { .. } => "popup",
            Command::Raw(_) => "raw",
        }
    }
}

/// Joint-space move using the acceleration and speed caps from `limits`.
pub fn encode_joint_move(joints: &JointVector, limits: &SafetyLimits) -> String {
    Command::move_joints(joints, limits).encode()
}

/// Cartesian linear move using the caps from `limits`.
pub fn encode_linear_move(pose: &CartesianPose, limits: &SafetyLimits) -> String {
    Command::move_linear(pose, limits).encode()
}

/// Three-line script: read the live tool pose, add `dz` to Z, move linearly.
pub fn encode_relative_z(dz: f64, limits: &SafetyLimits) -> String {
    Command::move_relative_z(dz, limits).encode()
}

fn num(v: f64) -> String {
    format!("{:.*}", PRECISION, v)
}

fn format_vector(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 10);
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{:.*}", PRECISION, v);
    }
    out.push(']');
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SafetyLimits {
        SafetyLimits {
            max_speed: 0.1,
            max_acceleration: 0.2,
            ..SafetyLimits::default()
        }
    }

    #[test]
    fn test_encode_joint_move() {
        let joints = JointVector([0.0, -1.5708, 1.5708, -1.5708, -1.5708, 0.0]);
        assert_eq!(
            encode_joint_move(&joints, &limits()),
            "movej([0.00000, -1.57080, 1.57080, -1.57080, -1.57080, 0.00000], a=0.20000, v=0.10000)"
        );
    }

    #[test]
    fn test_encode_linear_move() {
        let pose = CartesianPose([0.36, -0.148, 0.207, 2.22, -2.32, 0.114]);
        assert_eq!(
            encode_linear_move(&pose, &limits()),
            "movel(p[0.36000, -0.14800, 0.20700, 2.22000, -2.32000, 0.11400], a=0.20000, v=0.10000)"
        );
    }

    #[test]
    fn test_encode_relative_z() {
        let script = encode_relative_z(-0.04, &limits());
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "p = get_actual_tcp_pose()");
        assert_eq!(lines[1], "p[2] = p[2] + -0.04000");
        assert_eq!(lines[2], "movel(p, a=0.20000, v=0.10000)");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let pose = CartesianPose([0.1 + 0.2, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let a = encode_linear_move(&pose, &limits());
        let b = encode_linear_move(&CartesianPose([0.3, 0.0, 0.0, 0.0, 0.0, 0.0]), &limits());
        assert_eq!(a, b);
    }

    #[test]
    fn test_gripper_and_popup() {
        let close = Command::SetToolDigitalOut { pin: 0, value: true };
        assert_eq!(close.encode(), "set_tool_digital_out(0, True)");
        let popup = Command::Popup {
            message: "say \"hi\"".into(),
            title: "PC".into(),
            warning: false,
        };
        assert_eq!(
            popup.encode(),
            "popup(\"say \\\"hi\\\"\", title=\"PC\", warning=False)"
        );
    }
}
