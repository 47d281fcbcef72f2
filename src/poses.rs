use crate::config::PosesConfig;
use crate::error::PoseKind;
use crate::types::{JointVector, Pose, PoseSpace};
use crate::{Result, RobotError};
use std::collections::HashMap;

/// Read-only pose tables, validated once at construction.
#[derive(Debug, Clone, Default)]
pub struct PoseStore {
    named: HashMap<String, JointVector>,
    letter_sources: HashMap<String, Pose>,
    slots: HashMap<String, Pose>,
}

impl PoseStore {
    /// Build the store from raw config tables. Every vector must have six
    /// components; letter keys are upper-cased.
    pub fn from_config(poses: &PosesConfig, space: PoseSpace) -> Result<PoseStore> {
        let mut store = PoseStore::default();

        for (name, values) in &poses.named {
            store
                .named
                .insert(name.clone(), JointVector::from_slice(values)?);
        }
        for (letter, values) in &poses.letter_sources {
            store
                .letter_sources
                .insert(letter.to_uppercase(), space.pose_from_slice(values)?);
        }
        for (key, values) in &poses.slots {
            store
                .slots
                .insert(key.trim().to_string(), space.pose_from_slice(values)?);
        }

        log::debug!(
            "Pose store: {} named, {} letter sources, {} slots",
            store.named.len(),
            store.letter_sources.len(),
            store.slots.len()
        );
        Ok(store)
    }

    pub fn insert_named(&mut self, name: impl Into<String>, joints: JointVector) {
        self.named.insert(name.into(), joints);
    }

    pub fn insert_letter_source(&mut self, letter: char, pose: Pose) {
        self.letter_sources.insert(letter.to_uppercase().collect(), pose);
    }

    pub fn insert_slot(&mut self, index: usize, pose: Pose) {
        self.slots.insert(index.to_string(), pose);
    }

    pub fn resolve_pose(&self, name: &str) -> Result<JointVector> {
        self.named
            .get(name)
            .copied()
            .ok_or_else(|| RobotError::PoseNotFound {
                kind: PoseKind::Named,
                key: name.to_string(),
            })
    }

    /// Letter lookups are case-insensitive.
    pub fn resolve_letter_source(&self, letter: &str) -> Result<Pose> {
        let key = letter.to_uppercase();
        self.letter_sources
            .get(&key)
            .copied()
            .ok_or(RobotError::PoseNotFound {
                kind: PoseKind::LetterSource,
                key,
            })
    }

    pub fn resolve_slot(&self, index: usize) -> Result<Pose> {
        let key = index.to_string();
        self.slots
            .get(&key)
            .copied()
            .ok_or(RobotError::PoseNotFound {
                kind: PoseKind::Slot,
                key,
            })
    }

    pub fn has_pose(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }
}
