use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "A")]
    Away,
}

impl Outcome {
    /// Class index used as the training label: H=0, D=1, A=2.
    pub fn target(self) -> u8 {
        match self {
            Outcome::Home => 0,
            Outcome::Draw => 1,
            Outcome::Away => 2,
        }
    }

    pub fn code(self) -> char {
        match self {
            Outcome::Home => 'H',
            Outcome::Draw => 'D',
            Outcome::Away => 'A',
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Outcome {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "H" => Ok(Outcome::Home),
            "D" => Ok(Outcome::Draw),
            "A" => Ok(Outcome::Away),
            other => Err(FeatureError::validation(
                "result",
                format!("expected H, D or A, got {other:?}"),
            )),
        }
    }
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    /// Rescales to sum to one; falls back to uniform when the mass is not positive.
    pub fn normalized(self) -> Self {
        let sum = self.home + self.draw + self.away;
        if !sum.is_finite() || sum <= 0.0 {
            return Self::uniform();
        }
        Self {
            home: self.home / sum,
            draw: self.draw / sum,
            away: self.away / sum,
        }
    }

    pub fn argmax(self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }
}
