use crate::{Result, RobotError};

/// Number of axes on the arm, and components in a tool pose.
pub const AXES: usize = 6;

fn to_array(values: &[f64]) -> Result<[f64; AXES]> {
    <[f64; AXES]>::try_from(values).map_err(|_| RobotError::InvalidVectorLength {
        expected: AXES,
        actual: values.len(),
    })
}

/// Six joint angles in radians, base to wrist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointVector(pub [f64; AXES]);

impl JointVector {
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        to_array(values).map(JointVector)
    }

    pub fn as_array(&self) -> &[f64; AXES] {
        &self.0
    }
}

/// Tool pose `[x, y, z, rx, ry, rz]`: translation in meters, rotation vector in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPose(pub [f64; AXES]);

impl CartesianPose {
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        to_array(values).map(CartesianPose)
    }

    pub fn as_array(&self) -> &[f64; AXES] {
        &self.0
    }

    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// Same pose shifted along Z by `dz` meters, orientation untouched.
    pub fn offset_z(&self, dz: f64) -> CartesianPose {
        let mut p = self.0;
        p[2] += dz;
        CartesianPose(p)
    }
}

/// A configured target: either a joint configuration or a tool pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pose {
    Joint(JointVector),
    Cartesian(CartesianPose),
}

/// How six-number vectors for letter sources and slots are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseSpace {
    Joint,
    #[default]
    Cartesian,
}

impl PoseSpace {
    pub fn pose_from_slice(self, values: &[f64]) -> Result<Pose> {
        match self {
            PoseSpace::Joint => JointVector::from_slice(values).map(Pose::Joint),
            PoseSpace::Cartesian => CartesianPose::from_slice(values).map(Pose::Cartesian),
        }
    }
}

/// Speed and acceleration caps plus the pick geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyLimits {
    pub max_speed: f64,
    pub max_acceleration: f64,
    pub safe_height: f64,
    /// Signed Z shift from an "up" pose to its "down" pose. Usually negative.
    pub z_pick_offset: f64,
}

impl SafetyLimits {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_speed > 0.0) {
            return Err(RobotError::InvalidSafetyLimits(format!(
                "max_speed must be > 0, got {}",
                self.max_speed
            )));
        }
        if !(self.max_acceleration > 0.0) {
            return Err(RobotError::InvalidSafetyLimits(format!(
                "max_acc must be > 0, got {}",
                self.max_acceleration
            )));
        }
        Ok(())
    }
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_speed: 0.1,
            max_acceleration: 0.1,
            safe_height: 0.25,
            z_pick_offset: -0.04,
        }
    }
}

/// Link state of a [`Robot`](crate::Robot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Commands are logged instead of transmitted.
    Simulated,
}

bitflags::bitflags! {
    /// Operations a motion backend supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const MOVE_JOINTS     = 1 << 0;
        const MOVE_LINEAR     = 1 << 1;
        const MOVE_RELATIVE_Z = 1 << 2;
        const GRIP            = 1 << 3;
        /// Completion is confirmed by the controller rather than assumed after a delay.
        const ACK_SETTLE      = 1 << 4;
    }
}
