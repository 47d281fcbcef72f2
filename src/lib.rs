//! # wordbuddy - letter-block word game on a 6-axis arm
//!
//! Drives a UR-style controller over its script port. Provides:
//! - A client that falls back to a logging simulation when the controller
//!   is absent or unreachable
//! - Typed encoding of joint, linear and relative moves
//! - Pick-and-place sequencing from configured letter sources to word slots
//! - Word selection and the robot/player letter split
//!
//! ## Quick Start
//! ```no_run
//! use wordbuddy::{Config, PickPlace, Robot};
//!
//! let config = Config::load("data/config.json").unwrap();
//! let robot = Robot::from_config(&config).unwrap();
//! let mut game = PickPlace::from_config(robot, &config).unwrap();
//!
//! if !game.place_letter_in_slot('A', 1).is_done() {
//!     eprintln!("letter A not placed");
//! }
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod config;
pub mod poses;
pub mod transport;
pub mod settle;
pub mod robot;
pub mod pick_place;
pub mod words;

pub use error::{PoseKind, RobotError};
pub use types::*;
pub use config::{Config, GripperMode};
pub use poses::PoseStore;
pub use protocol::Command;
pub use settle::{SettlePolicy, StepKind};
pub use robot::{Motion, Robot};
pub use pick_place::{Descent, Outcome, PickPlace, Round, WordPlacement};
pub use words::{Difficulty, LetterSplit};

/// Result type alias for wordbuddy operations.
pub type Result<T> = std::result::Result<T, RobotError>;
