//! Persona assignment.
//!
//! A persona is a playful display name shown in place of the real author of a
//! message or comment. Picks are uniform and collisions are fine.

use rand::Rng;
use rand::seq::IndexedRandom;

/// The closed set of persona names.
pub const PERSONAS: &[&str] = &[
    "Anonymous Koala",
    "Thinking Penguin",
    "Singing Dolphin",
    "Running Turtle",
    "Laughing Hippo",
    "Brave Squirrel",
    "Curious Fox",
    "Jumping Kangaroo",
    "Shy Panda",
    "Clever Owl",
    "Flying Hedgehog",
    "Quiet Cat",
    "Dancing Cat",
    "Hungry Otter",
    "Coding Horse",
    "Sleeping Lion",
    "Wise Owl",
    "Swift Cheetah",
    "Mysterious Unicorn",
    "Happy Rabbit",
    "Lively Hamster",
    "Dreaming Giraffe",
    "Slim Crocodile",
    "Passionate Monkey",
];

/// Hands out persona names.
#[derive(Debug, Clone)]
pub struct PersonaAssigner {
    names: Vec<String>,
}

impl PersonaAssigner {
    /// Create an assigner over the built-in persona list.
    pub fn new() -> Self {
        Self {
            names: PERSONAS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Uniform pick from the thread-local RNG.
    pub fn assign(&self) -> String {
        self.assign_with(&mut rand::rng())
    }

    /// Uniform pick from the given RNG.
    pub fn assign_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        // names is never empty: built from the non-empty PERSONAS constant
        self.names.choose(rng).cloned().unwrap_or_default()
    }

    /// Pick derived from `key`: the same key always gets the same persona.
    pub fn assign_for(&self, key: &str) -> String {
        let hash = key
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
        let index = (hash % self.names.len().max(1) as u64) as usize;
        self.names.get(index).cloned().unwrap_or_default()
    }

    /// Whether `name` belongs to the persona set.
    pub fn is_persona(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for PersonaAssigner {
    fn default() -> Self {
        Self::new()
    }
}
