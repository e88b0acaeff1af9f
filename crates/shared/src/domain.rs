use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(UnitId);
id_newtype!(LessonId);
id_newtype!(SignId);
id_newtype!(LevelId);
id_newtype!(GameId);
id_newtype!(ChallengeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Score multiplier applied when a practice outcome is reported.
    pub fn multiplier(self) -> u32 {
        match self {
            Difficulty::Beginner => 1,
            Difficulty::Intermediate => 2,
            Difficulty::Advanced => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Matching,
    Identification,
    Speed,
    Sequence,
    AdvancedMatching,
    SentenceBuilding,
}

impl GameKind {
    /// Stable identifier used in wire payloads and high-score keys.
    pub fn identifier(self) -> &'static str {
        match self {
            GameKind::Matching => "matching",
            GameKind::Identification => "identification",
            GameKind::Speed => "speed",
            GameKind::Sequence => "sequence",
            GameKind::AdvancedMatching => "advanced_matching",
            GameKind::SentenceBuilding => "sentence_building",
        }
    }
}

