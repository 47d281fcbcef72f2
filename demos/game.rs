//! Play one round: pick a word, place the robot's letters, print the rest.
//!
//! Usage: cargo run --example game [config.json] [words.json] [easy|normal|hard]

use wordbuddy::{words, Config, Difficulty, Motion, PickPlace, Robot};

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "data/config.json".to_string());
    let words_path = args.next().unwrap_or_else(|| "data/words.json".to_string());
    let difficulty: Difficulty = args
        .next()
        .unwrap_or_default()
        .parse()
        .unwrap_or_default();

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let word_list = match words::load_words(&words_path) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Failed to load words: {}", e);
            std::process::exit(1);
        }
    };

    let mut game = match Robot::from_config(&config)
        .and_then(|robot| PickPlace::from_config(robot, &config))
    {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut rng = rand::thread_rng();
    match game.run_round(&word_list, 3, 6, difficulty, &mut rng) {
        Ok(round) => {
            println!("Word:            {}", round.word);
            println!(
                "Robot placed:    {} of {}",
                round.placement.placed,
                round.split.robot.chars().count()
            );
            println!("Your letters:    {}", round.split.user);
            if let Some((letter, reason)) = &round.placement.aborted {
                println!("Stopped at '{}': {}", letter, reason);
            }
        }
        Err(e) => {
            eprintln!("Cannot start round: {}", e);
            game.motion_mut().close();
            std::process::exit(1);
        }
    }

    game.motion_mut().close();
}
