//! Letter grade to grade point table

use std::fmt;
use std::str::FromStr;

/// Closed set of recognised letter grades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    O,
    APlus,
    A,
    BPlus,
    B,
    C,
    P,
    F,
}

impl Grade {
    pub const ALL: [Grade; 8] = [
        Grade::O,
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::C,
        Grade::P,
        Grade::F,
    ];

    pub fn points(self) -> u32 {
        match self {
            Grade::O => 10,
            Grade::APlus => 9,
            Grade::A => 8,
            Grade::BPlus => 7,
            Grade::B => 6,
            Grade::C => 5,
            Grade::P => 4,
            Grade::F => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::O => "O",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::P => "P",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGrade(pub String);

impl FromStr for Grade {
    type Err = UnknownGrade;

    /// Exact, case-sensitive match on the literal grade string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGrade(s.to_string()))
    }
}

/// Grade points for a recorded grade string; unrecognised grades earn 0
pub fn grade_points(grade: &str) -> u32 {
    grade.parse::<Grade>().map(Grade::points).unwrap_or(0)
}
