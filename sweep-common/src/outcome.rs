use serde::{Deserialize, Serialize};
use std::fmt;

/// How a trial ended. The numeric codes are what plotting consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Outcome {
    PreyExtinct = 0,
    PredatorExtinct = 1,
    Coexistence = 2,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [
        Outcome::PreyExtinct,
        Outcome::PredatorExtinct,
        Outcome::Coexistence,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Legend label used by the phase diagram.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::PreyExtinct => "All Prey Died",
            Outcome::PredatorExtinct => "All Predators Died",
            Outcome::Coexistence => "Long-term Coexistence",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_legend_order() {
        for (i, outcome) in Outcome::ALL.iter().enumerate() {
            assert_eq!(outcome.code() as usize, i);
            assert_eq!(Outcome::from_code(i as u8), Some(*outcome));
        }
        assert_eq!(Outcome::from_code(3), None);
    }
}
