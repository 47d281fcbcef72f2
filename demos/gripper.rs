//! Open and close the gripper once.
//!
//! Usage: cargo run --example gripper [config.json]

use std::time::Duration;
use wordbuddy::{Config, Motion, Robot, StepKind};

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/config.json".to_string());
    let mut robot = match Config::load(&path).and_then(|c| Robot::from_config(&c)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    robot.popup("Gripper test", "wordbuddy");
    std::thread::sleep(Duration::from_secs(1));

    robot.grip(false);
    robot.await_settled(StepKind::Gripper);
    robot.grip(true);
    robot.await_settled(StepKind::Gripper);

    robot.close();
    println!("Gripper test finished ({:?})", robot.state());
}
