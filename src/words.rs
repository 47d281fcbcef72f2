use crate::{Result, RobotError};
use rand::Rng;
use std::path::Path;
use std::str::FromStr;

/// How much of the word the robot lays out before the player takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Fraction of the word the robot places.
    pub fn ratio(self) -> f64 {
        match self {
            Difficulty::Easy => 0.7,
            Difficulty::Normal => 0.5,
            Difficulty::Hard => 0.3,
        }
    }
}

impl FromStr for Difficulty {
    type Err = std::convert::Infallible;

    /// Case-insensitive. Anything unrecognized is `Normal`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "normal" => Difficulty::Normal,
            "hard" => Difficulty::Hard,
            other => {
                log::warn!("Unknown difficulty '{}', using normal", other);
                Difficulty::Normal
            }
        })
    }
}

/// A word split into the part the robot places and the part left to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterSplit {
    pub robot: String,
    pub user: String,
}

/// Pick a word uniformly at random among those with `min_len..=max_len`
/// characters.
pub fn select_word<'a, S, R>(
    words: &'a [S],
    min_len: usize,
    max_len: usize,
    rng: &mut R,
) -> Result<&'a str>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let candidates: Vec<&str> = words
        .iter()
        .map(|w| w.as_ref())
        .filter(|w| (min_len..=max_len).contains(&w.chars().count()))
        .collect();

    if candidates.is_empty() {
        return Err(RobotError::NoCandidate { min_len, max_len });
    }

    let word = candidates[rng.gen_range(0..candidates.len())];
    log::info!("Selected word '{}'", word);
    Ok(word)
}

/// Split `word` so the robot places the first `max(1, floor(n * ratio))`
/// letters.
pub fn split_letters(word: &str, difficulty: Difficulty) -> LetterSplit {
    let n = word.chars().count();
    let robot_count = ((n as f64 * difficulty.ratio()).floor() as usize)
        .max(1)
        .min(n);

    let split_at = word
        .char_indices()
        .nth(robot_count)
        .map(|(i, _)| i)
        .unwrap_or(word.len());
    let (robot, user) = word.split_at(split_at);

    log::info!("Robot places '{}', player completes '{}'", robot, user);
    LetterSplit {
        robot: robot.to_string(),
        user: user.to_string(),
    }
}

/// Load a word list stored as a JSON array of strings.
pub fn load_words(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| RobotError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let words: Vec<String> = serde_json::from_str(&text)?;
    log::info!("Loaded {} words from {}", words.len(), path.display());
    Ok(words)
}
