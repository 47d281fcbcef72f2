//! Move the block for letter A into slot 1, stopping at home in between.
//!
//! Usage: cargo run --example pick_place [config.json]
//! Without a reachable controller the commands are only logged.

use wordbuddy::{Config, Motion, PickPlace, Robot};

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/config.json".to_string());
    let config = match Config::load(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let robot = match Robot::from_config(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            std::process::exit(1);
        }
    };
    println!("Controller: {:?}", robot.state());

    let mut game = match PickPlace::from_config(robot, &config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Invalid pose table: {}", e);
            std::process::exit(1);
        }
    };

    game.go_home();
    let mut outcome = game.pick_letter('A');
    if outcome.is_done() {
        game.go_home();
        outcome = game.place_held_letter(1);
    }
    game.go_home();

    let mut robot = game.into_inner();
    println!(
        "{} ({} commands issued)",
        if outcome.is_done() { "Done" } else { "Aborted" },
        robot.commands_sent()
    );
    robot.close();
}
