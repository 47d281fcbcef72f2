use crate::config::{Config, GripperMode};
use crate::poses::PoseStore;
use crate::protocol::{Command, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
use crate::settle::{AckStream, SettlePolicy, StepKind};
use crate::transport::TcpTransport;
use crate::types::{Capabilities, CartesianPose, ConnectionState, JointVector, SafetyLimits};
use crate::{Result, RobotError};
use std::path::Path;
use std::time::Duration;

/// Log target for commands diverted in simulated mode.
pub const SIM_TARGET: &str = "wordbuddy::sim";

/// Motion operations a pick-and-place sequence needs from the arm.
///
/// Each call issues its command and returns without waiting; callers follow
/// up with [`Motion::await_settled`]. Delivery failures are logged by the
/// implementation and never returned.
pub trait Motion {
    fn capabilities(&self) -> Capabilities;
    fn move_joints(&mut self, joints: &JointVector);
    fn move_linear(&mut self, pose: &CartesianPose);
    /// Shift the tool along Z from its live pose on the controller.
    fn move_relative_z(&mut self, dz: f64);
    /// `true` closes the jaws, `false` opens them.
    fn grip(&mut self, closed: bool);
    fn await_settled(&mut self, kind: StepKind);
    fn close(&mut self);
}

impl<M: Motion + ?Sized> Motion for &mut M {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }
    fn move_joints(&mut self, joints: &JointVector) {
        (**self).move_joints(joints)
    }
    fn move_linear(&mut self, pose: &CartesianPose) {
        (**self).move_linear(pose)
    }
    fn move_relative_z(&mut self, dz: f64) {
        (**self).move_relative_z(dz)
    }
    fn grip(&mut self, closed: bool) {
        (**self).grip(closed)
    }
    fn await_settled(&mut self, kind: StepKind) {
        (**self).await_settled(kind)
    }
    fn close(&mut self) {
        (**self).close()
    }
}

enum Link {
    Tcp(TcpTransport),
    Simulated,
    Closed,
}

/// Client for the controller's script port.
///
/// Construction never fails on network problems: with no address, or when
/// the connection attempt errors out, the robot runs simulated and every
/// command is logged under [`SIM_TARGET`] instead of being transmitted.
pub struct Robot {
    link: Link,
    limits: SafetyLimits,
    gripper: GripperMode,
    settle: SettlePolicy,
    ack: Option<AckStream>,
    commands_sent: u64,
}

impl Robot {
    /// Connect to `address:port`, falling back to simulated mode.
    pub fn connect(
        address: Option<&str>,
        port: u16,
        timeout: Duration,
        limits: SafetyLimits,
    ) -> Robot {
        let link = match address {
            None => {
                log::warn!("No robot address configured, running SIMULATED");
                Link::Simulated
            }
            Some(host) => {
                log::info!("Connecting to controller {}:{} ...", host, port);
                match TcpTransport::connect(host, port, timeout) {
                    Ok(transport) => {
                        log::info!("Connected to {}:{}", host, port);
                        Link::Tcp(transport)
                    }
                    Err(e) => {
                        log::warn!(
                            "Cannot reach {}:{} ({}), switching to SIMULATED mode",
                            host,
                            port,
                            e
                        );
                        Link::Simulated
                    }
                }
            }
        };

        Robot {
            link,
            limits,
            gripper: GripperMode::default(),
            settle: SettlePolicy::default(),
            ack: None,
            commands_sent: 0,
        }
    }

    /// A robot that never touches the network.
    pub fn simulated(limits: SafetyLimits) -> Robot {
        Robot::connect(None, DEFAULT_PORT, DEFAULT_CONNECT_TIMEOUT, limits)
    }

    /// Build from a loaded config. Only invalid safety limits are an error.
    pub fn from_config(config: &Config) -> Result<Robot> {
        let limits = config.limits()?;
        let robot = Robot::connect(
            config.robot_ip.as_deref(),
            config.port,
            config.connect_timeout(),
            limits,
        )
        .with_gripper(config.gripper.clone())
        .with_settle(config.settle.policy());
        Ok(robot)
    }

    pub fn with_gripper(mut self, gripper: GripperMode) -> Robot {
        self.gripper = gripper;
        self
    }

    /// Set the settle policy. Acknowledged settling needs a live connection;
    /// in simulated mode it degrades to no waiting.
    ///
    /// The acknowledgment reader lives as long as the connection. Setting the
    /// policy again reuses it, since a second reader on the same socket would
    /// steal lines from the first.
    pub fn with_settle(mut self, policy: SettlePolicy) -> Robot {
        self.settle = policy;
        if self.ack.as_ref().is_some_and(AckStream::is_active) {
            return self;
        }
        if let (SettlePolicy::Acknowledged { .. }, Link::Tcp(transport)) = (&policy, &self.link) {
            if let Some(old) = self.ack.take() {
                old.stop();
            }
            match transport.try_clone_reader().and_then(AckStream::start) {
                Ok(stream) => self.ack = Some(stream),
                Err(e) => {
                    log::warn!(
                        "Cannot listen for acknowledgments ({}), using fixed delays",
                        e
                    );
                    self.settle = SettlePolicy::default();
                }
            }
        }
        self
    }

    pub fn state(&self) -> ConnectionState {
        match self.link {
            Link::Tcp(_) => ConnectionState::Connected,
            Link::Simulated => ConnectionState::Simulated,
            Link::Closed => ConnectionState::Disconnected,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.link, Link::Simulated)
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        self.settle
    }

    /// Commands issued so far, transmitted or diverted to the log.
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Send one script command, newline-terminated. Write failures are
    /// logged and swallowed.
    pub fn send(&mut self, script: &str) {
        self.drain_acks();
        self.commands_sent += 1;
        match &mut self.link {
            Link::Tcp(transport) => {
                let mut line = script.to_string();
                if !line.ends_with('\n') {
                    line.push('\n');
                }
                if let Err(e) = transport.write_all(line.as_bytes()) {
                    log::warn!("Failed to send script: {}", e);
                }
            }
            Link::Simulated => {
                log::info!(target: SIM_TARGET, "(SIM) {}", script);
            }
            Link::Closed => {
                log::warn!("Connection closed, dropping command: {}", script.trim());
            }
        }
    }

    pub fn send_command(&mut self, command: &Command) {
        let text = command.encode();
        log::debug!("{}: {}", command.kind(), text);
        self.send(&text);
    }

    /// Send a local file's bytes unmodified, e.g. a gripper actuation script.
    /// Read and write failures are logged and swallowed.
    pub fn send_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let data = match std::fs::read(path) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Cannot read script file {}: {}", path.display(), e);
                return;
            }
        };

        self.drain_acks();
        self.commands_sent += 1;
        match &mut self.link {
            Link::Tcp(transport) => {
                if let Err(e) = transport.write_all(&data) {
                    log::warn!("Failed to send {}: {}", path.display(), e);
                }
            }
            Link::Simulated => {
                log::info!(
                    target: SIM_TARGET,
                    "(SIM) script file {} ({} bytes)",
                    path.display(),
                    data.len()
                );
            }
            Link::Closed => {
                log::warn!("Connection closed, dropping script file {}", path.display());
            }
        }
    }

    /// Lines that arrived before a command was sent cannot acknowledge it.
    fn drain_acks(&mut self) {
        if let Some(ack) = &self.ack {
            let stale = ack.drain();
            if stale > 0 {
                log::debug!("Discarded {} stale acknowledgment(s)", stale);
            }
        }
    }

    /// The acknowledgment reader is gone: go back to fixed delays and
    /// still wait out the current step.
    fn fall_back_to_fixed(&mut self, kind: StepKind) {
        if let Some(ack) = self.ack.take() {
            ack.stop();
        }
        log::warn!("Acknowledgment stream stopped, falling back to fixed settle delays");
        self.settle = SettlePolicy::default();
        if let Some(delay) = self.settle.fixed_delay(kind) {
            std::thread::sleep(delay);
        }
    }

    /// Show a message on the teach pendant. Handy as a connection check.
    pub fn popup(&mut self, message: &str, title: &str) {
        self.send_command(&Command::Popup {
            message: message.to_string(),
            title: title.to_string(),
            warning: false,
        });
    }

    /// Joint move to a named pose, then settle. A missing name is logged
    /// and reported as `false`.
    pub fn move_to_pose(&mut self, poses: &PoseStore, name: &str) -> bool {
        match poses.resolve_pose(name) {
            Ok(joints) => {
                log::info!("Moving to pose '{}'", name);
                self.move_joints(&joints);
                self.await_settled(StepKind::Motion);
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }
}

impl Motion for Robot {
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::MOVE_JOINTS
            | Capabilities::MOVE_LINEAR
            | Capabilities::MOVE_RELATIVE_Z
            | Capabilities::GRIP;
        if self.ack.is_some() && matches!(self.settle, SettlePolicy::Acknowledged { .. }) {
            caps |= Capabilities::ACK_SETTLE;
        }
        caps
    }

    fn move_joints(&mut self, joints: &JointVector) {
        let command = Command::move_joints(joints, &self.limits);
        self.send_command(&command);
    }

    fn move_linear(&mut self, pose: &CartesianPose) {
        let command = Command::move_linear(pose, &self.limits);
        self.send_command(&command);
    }

    fn move_relative_z(&mut self, dz: f64) {
        let command = Command::move_relative_z(dz, &self.limits);
        self.send_command(&command);
    }

    fn grip(&mut self, closed: bool) {
        log::info!("Gripper {}", if closed { "CLOSE" } else { "OPEN" });
        match self.gripper.clone() {
            GripperMode::DigitalOutput { pin } => {
                self.send_command(&Command::SetToolDigitalOut { pin, value: closed });
            }
            GripperMode::Scripts {
                open_script,
                close_script,
            } => {
                let path = if closed { close_script } else { open_script };
                self.send_file(path);
            }
        }
    }

    fn await_settled(&mut self, kind: StepKind) {
        match self.settle {
            SettlePolicy::Fixed { .. } => {
                if let Some(delay) = self.settle.fixed_delay(kind) {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
            SettlePolicy::Acknowledged { timeout } => {
                let result = match &self.ack {
                    Some(ack) => ack.await_ack(timeout),
                    None => return,
                };
                match result {
                    Ok(msg) => log::trace!("ack: {}", msg),
                    Err(RobotError::AckStreamStopped) => self.fall_back_to_fixed(kind),
                    Err(e) => log::warn!("{:?} step not acknowledged: {}", kind, e),
                }
            }
        }
    }

    /// Release the connection. Safe to call repeatedly.
    fn close(&mut self) {
        // Simulated stays simulated; only a live link moves to Disconnected.
        if matches!(self.link, Link::Tcp(_)) {
            if let Link::Tcp(transport) = std::mem::replace(&mut self.link, Link::Closed) {
                transport.shutdown();
                log::info!("Controller connection closed");
            }
        }
        if let Some(ack) = self.ack.take() {
            ack.stop();
        }
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        self.close();
    }
}
