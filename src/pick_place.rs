//! Moving one letter block from its source to a word slot.
//!
//! A sequence is planned in full before anything moves: both poses are
//! resolved and every step is derived up front, so a missing letter or slot
//! aborts with no motion issued. Execution then sends one command per step
//! and waits for it to settle before the next.
//!
//! With the default settle policy "settled" only means a fixed delay has
//! passed. Nothing confirms the arm actually reached the pose.

use crate::config::Config;
use crate::error::PoseKind;
use crate::poses::PoseStore;
use crate::robot::Motion;
use crate::settle::StepKind;
use crate::types::{Capabilities, CartesianPose, JointVector, Pose};
use crate::words::{self, Difficulty, LetterSplit};
use crate::{Result, RobotError};
use rand::Rng;

/// Where the "down" pose for grasping and releasing comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Descent {
    /// Configured "up" pose shifted by `z_pick_offset`. Computed client-side,
    /// needs Cartesian poses.
    #[default]
    Offset,
    /// Shift the live tool pose on the controller by `z_pick_offset`. Works
    /// with joint-space poses, but the result depends on where the arm
    /// actually is.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ResolvingSource,
    ResolvingSlot,
    Gripping(Grip),
    MovingToSourceUp,
    Descending,
    Ascending,
    MovingToSlotUp,
    DescendingAtSlot,
    AscendingAtSlot,
    Done,
    Aborted,
}

/// One command of a planned sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Grip(Grip),
    MoveJoints(JointVector),
    MoveLinear(CartesianPose),
    MoveRelativeZ(f64),
}

impl Action {
    fn settle_kind(&self) -> StepKind {
        match self {
            Action::Grip(_) => StepKind::Gripper,
            Action::MoveRelativeZ(_) => StepKind::Relative,
            Action::MoveJoints(_) | Action::MoveLinear(_) => StepKind::Motion,
        }
    }

    fn required(&self) -> Capabilities {
        match self {
            Action::Grip(_) => Capabilities::GRIP,
            Action::MoveJoints(_) => Capabilities::MOVE_JOINTS,
            Action::MoveLinear(_) => Capabilities::MOVE_LINEAR,
            Action::MoveRelativeZ(_) => Capabilities::MOVE_RELATIVE_Z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub phase: Phase,
    pub action: Action,
}

/// Result of one letter placement.
#[derive(Debug)]
pub enum Outcome {
    Done,
    /// Nothing was sent; the reason is a recoverable configuration miss.
    Aborted(RobotError),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }
}

/// Result of laying out several letters.
#[derive(Debug)]
pub struct WordPlacement {
    pub placed: usize,
    /// The letter that stopped the sequence, with the reason.
    pub aborted: Option<(char, RobotError)>,
}

impl WordPlacement {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// One game round: the chosen word, its split, and what the robot placed.
#[derive(Debug)]
pub struct Round {
    pub word: String,
    pub split: LetterSplit,
    pub placement: WordPlacement,
}

/// "Down" pose for an "up" pose under offset descent.
pub fn down_pose(up: &CartesianPose, z_pick_offset: f64) -> CartesianPose {
    up.offset_z(z_pick_offset)
}

/// Approach and descend actions for one end of the transfer.
fn leg(
    pose: &Pose,
    descent: Descent,
    z_pick_offset: f64,
    kind: PoseKind,
    key: &str,
) -> Result<(Action, Action)> {
    match (descent, pose) {
        (Descent::Offset, Pose::Cartesian(up)) => Ok((
            Action::MoveLinear(*up),
            Action::MoveLinear(down_pose(up, z_pick_offset)),
        )),
        (Descent::Offset, Pose::Joint(_)) => Err(RobotError::PoseSpaceMismatch {
            kind,
            key: key.to_string(),
        }),
        (Descent::Live, Pose::Cartesian(up)) => Ok((
            Action::MoveLinear(*up),
            Action::MoveRelativeZ(z_pick_offset),
        )),
        (Descent::Live, Pose::Joint(up)) => Ok((
            Action::MoveJoints(*up),
            Action::MoveRelativeZ(z_pick_offset),
        )),
    }
}

/// Open, approach the source, descend, close and lift: the block is held.
pub fn plan_pick(
    letter: char,
    source: &Pose,
    descent: Descent,
    z_pick_offset: f64,
) -> Result<Vec<Step>> {
    let letter_key: String = letter.to_uppercase().collect();
    let (up, down) = leg(
        source,
        descent,
        z_pick_offset,
        PoseKind::LetterSource,
        &letter_key,
    )?;

    let step = |phase, action| Step { phase, action };
    Ok(vec![
        step(Phase::Gripping(Grip::Open), Action::Grip(Grip::Open)),
        step(Phase::MovingToSourceUp, up),
        step(Phase::Descending, down),
        step(Phase::Gripping(Grip::Close), Action::Grip(Grip::Close)),
        step(Phase::Ascending, up),
    ])
}

/// Approach the slot, descend, release and lift.
pub fn plan_place(
    slot_index: usize,
    slot: &Pose,
    descent: Descent,
    z_pick_offset: f64,
) -> Result<Vec<Step>> {
    let (up, down) = leg(
        slot,
        descent,
        z_pick_offset,
        PoseKind::Slot,
        &slot_index.to_string(),
    )?;

    let step = |phase, action| Step { phase, action };
    Ok(vec![
        step(Phase::MovingToSlotUp, up),
        step(Phase::DescendingAtSlot, down),
        step(Phase::Gripping(Grip::Open), Action::Grip(Grip::Open)),
        step(Phase::AscendingAtSlot, up),
    ])
}

/// Derive the nine steps that move a block from `source` to `slot`.
pub fn plan_transfer(
    letter: char,
    source: &Pose,
    slot_index: usize,
    slot: &Pose,
    descent: Descent,
    z_pick_offset: f64,
) -> Result<Vec<Step>> {
    let mut steps = plan_pick(letter, source, descent, z_pick_offset)?;
    steps.extend(plan_place(slot_index, slot, descent, z_pick_offset)?);
    Ok(steps)
}

/// Sequences gripper and motion commands on a [`Motion`] backend.
pub struct PickPlace<M: Motion> {
    motion: M,
    poses: PoseStore,
    descent: Descent,
    z_pick_offset: f64,
    home_pose: Option<String>,
    phase: Phase,
}

impl<M: Motion> PickPlace<M> {
    pub fn new(motion: M, poses: PoseStore, z_pick_offset: f64) -> PickPlace<M> {
        PickPlace {
            motion,
            poses,
            descent: Descent::default(),
            z_pick_offset,
            home_pose: None,
            phase: Phase::Idle,
        }
    }

    /// Pose tables, descent mode, pick offset and home pose from `config`.
    pub fn from_config(motion: M, config: &Config) -> Result<PickPlace<M>> {
        let poses = PoseStore::from_config(&config.poses, config.pose_space)?;
        let limits = config.limits()?;
        Ok(PickPlace::new(motion, poses, limits.z_pick_offset)
            .with_descent(config.descent)
            .with_home_pose(Some(config.home_pose.clone())))
    }

    pub fn with_descent(mut self, descent: Descent) -> PickPlace<M> {
        self.descent = descent;
        self
    }

    /// Named pose visited after a word is laid out. Skipped when the name is
    /// not in the pose table.
    pub fn with_home_pose(mut self, name: Option<String>) -> PickPlace<M> {
        self.home_pose = name;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn descent(&self) -> Descent {
        self.descent
    }

    pub fn poses(&self) -> &PoseStore {
        &self.poses
    }

    pub fn motion(&self) -> &M {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut M {
        &mut self.motion
    }

    pub fn into_inner(self) -> M {
        self.motion
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn abort(&mut self, reason: RobotError) -> Outcome {
        log::warn!("Sequence aborted: {}", reason);
        self.enter(Phase::Aborted);
        Outcome::Aborted(reason)
    }

    /// Resolve both poses and plan the transfer without moving.
    pub fn plan(&self, letter: char, slot_index: usize) -> Result<Vec<Step>> {
        let source = self.poses.resolve_letter_source(&letter.to_string())?;
        let slot = self.poses.resolve_slot(slot_index)?;
        plan_transfer(
            letter,
            &source,
            slot_index,
            &slot,
            self.descent,
            self.z_pick_offset,
        )
    }

    /// Pick the block for `letter` and place it in slot `slot_index`.
    ///
    /// Lookup failures abort before the first command. Once moving, the
    /// sequence runs to the end: there is no way to interrupt a command
    /// already sent.
    pub fn place_letter_in_slot(&mut self, letter: char, slot_index: usize) -> Outcome {
        log::info!("Placing '{}' in slot {}", letter, slot_index);

        self.enter(Phase::ResolvingSource);
        let source = match self.poses.resolve_letter_source(&letter.to_string()) {
            Ok(p) => p,
            Err(e) => return self.abort(e),
        };

        self.enter(Phase::ResolvingSlot);
        let slot = match self.poses.resolve_slot(slot_index) {
            Ok(p) => p,
            Err(e) => return self.abort(e),
        };

        let steps = match plan_transfer(
            letter,
            &source,
            slot_index,
            &slot,
            self.descent,
            self.z_pick_offset,
        ) {
            Ok(s) => s,
            Err(e) => return self.abort(e),
        };

        if let Err(e) = self.run_steps(&steps) {
            return self.abort(e);
        }

        self.enter(Phase::Done);
        log::info!("Letter '{}' placed in slot {}", letter, slot_index);
        Outcome::Done
    }

    /// First half of a transfer: pick up the block for `letter` and lift it
    /// clear of the source. The arm is left holding the block.
    pub fn pick_letter(&mut self, letter: char) -> Outcome {
        log::info!("Picking '{}'", letter);

        self.enter(Phase::ResolvingSource);
        let steps = self
            .poses
            .resolve_letter_source(&letter.to_string())
            .and_then(|source| plan_pick(letter, &source, self.descent, self.z_pick_offset))
            .and_then(|steps| self.run_steps(&steps));
        if let Err(e) = steps {
            return self.abort(e);
        }

        self.enter(Phase::Done);
        Outcome::Done
    }

    /// Second half of a transfer: lower the held block into slot
    /// `slot_index` and release it.
    pub fn place_held_letter(&mut self, slot_index: usize) -> Outcome {
        log::info!("Placing held block in slot {}", slot_index);

        self.enter(Phase::ResolvingSlot);
        let steps = self
            .poses
            .resolve_slot(slot_index)
            .and_then(|slot| plan_place(slot_index, &slot, self.descent, self.z_pick_offset))
            .and_then(|steps| self.run_steps(&steps));
        if let Err(e) = steps {
            return self.abort(e);
        }

        self.enter(Phase::Done);
        Outcome::Done
    }

    /// Check capabilities for the whole plan, then execute and settle each
    /// step. Nothing is sent when a capability is missing.
    fn run_steps(&mut self, steps: &[Step]) -> Result<()> {
        let available = self.motion.capabilities();
        if let Some(step) = steps.iter().find(|s| !available.contains(s.action.required())) {
            return Err(RobotError::MissingCapability(format!(
                "{:?}",
                step.action.required()
            )));
        }

        for step in steps {
            self.enter(step.phase);
            self.execute(&step.action);
            self.motion.await_settled(step.action.settle_kind());
        }
        Ok(())
    }

    fn execute(&mut self, action: &Action) {
        match action {
            Action::Grip(Grip::Open) => self.motion.grip(false),
            Action::Grip(Grip::Close) => self.motion.grip(true),
            Action::MoveJoints(joints) => self.motion.move_joints(joints),
            Action::MoveLinear(pose) => self.motion.move_linear(pose),
            Action::MoveRelativeZ(dz) => self.motion.move_relative_z(*dz),
        }
    }

    /// Joint move to the home pose, if one is configured and defined.
    pub fn go_home(&mut self) -> bool {
        let Some(name) = self.home_pose.as_deref() else {
            return false;
        };
        match self.poses.resolve_pose(name) {
            Ok(joints) => {
                log::info!("Returning to '{}'", name);
                self.motion.move_joints(&joints);
                self.motion.await_settled(StepKind::Motion);
                true
            }
            Err(e) => {
                log::warn!("Skipping home move: {}", e);
                false
            }
        }
    }

    /// Place each letter of `letters` into consecutive slots from
    /// `first_slot`, stopping at the first abort, then go home.
    pub fn place_word(&mut self, letters: &str, first_slot: usize) -> WordPlacement {
        let mut placement = WordPlacement {
            placed: 0,
            aborted: None,
        };

        for (i, letter) in letters.chars().enumerate() {
            match self.place_letter_in_slot(letter, first_slot + i) {
                Outcome::Done => placement.placed += 1,
                Outcome::Aborted(reason) => {
                    placement.aborted = Some((letter, reason));
                    break;
                }
            }
        }

        self.go_home();
        placement
    }

    /// Pick a word, split it by difficulty and lay out the robot's share
    /// starting at slot 0. An empty candidate pool is an error.
    pub fn run_round<S, R>(
        &mut self,
        words: &[S],
        min_len: usize,
        max_len: usize,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Result<Round>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let word = words::select_word(words, min_len, max_len, rng)?.to_string();
        let split = words::split_letters(&word, difficulty);
        let placement = self.place_word(&split.robot, 0);
        Ok(Round {
            word,
            split,
            placement,
        })
    }
}
