use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Faction {
    Fire,
    Water,
    Nature,
    Light,
}

impl Faction {
    pub const ALL: [Faction; 4] = [
        Faction::Fire,
        Faction::Water,
        Faction::Nature,
        Faction::Light,
    ];
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Faction::Fire => "Fire",
            Faction::Water => "Water",
            Faction::Nature => "Nature",
            Faction::Light => "Light",
        };
        write!(f, "{name}")
    }
}

/// One of the four colors a player can stake coins on.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorCategory {
    Red,
    Green,
    Blue,
    Yellow,
}

impl ColorCategory {
    /// Board order, also the order the draw source indexes into.
    pub const ALL: [ColorCategory; 4] = [
        ColorCategory::Red,
        ColorCategory::Green,
        ColorCategory::Blue,
        ColorCategory::Yellow,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ColorCategory::Red => "red",
            ColorCategory::Green => "green",
            ColorCategory::Blue => "blue",
            ColorCategory::Yellow => "yellow",
        }
    }

    pub fn faction(self) -> Faction {
        match self {
            ColorCategory::Red => Faction::Fire,
            ColorCategory::Green => Faction::Nature,
            ColorCategory::Blue => Faction::Water,
            ColorCategory::Yellow => Faction::Light,
        }
    }

    /// Boss damage dealt per matching die.
    pub fn points(self) -> u64 {
        match self {
            ColorCategory::Red
            | ColorCategory::Green
            | ColorCategory::Blue
            | ColorCategory::Yellow => 10,
        }
    }

    pub fn index(self) -> usize {
        match self {
            ColorCategory::Red => 0,
            ColorCategory::Green => 1,
            ColorCategory::Blue => 2,
            ColorCategory::Yellow => 3,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

impl fmt::Display for ColorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id().to_uppercase())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownColor(pub String);

impl fmt::Display for UnknownColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown color: {:?}", self.0)
    }
}

impl std::error::Error for UnknownColor {}

impl FromStr for ColorCategory {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(ColorCategory::Red),
            "green" => Ok(ColorCategory::Green),
            "blue" => Ok(ColorCategory::Blue),
            "yellow" => Ok(ColorCategory::Yellow),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Champion {
    Ren,
    Rei,
}

impl Champion {
    pub const ALL: [Champion; 2] = [Champion::Ren, Champion::Rei];

    pub fn title(self) -> &'static str {
        match self {
            Champion::Ren => "The Disciplined Scholar",
            Champion::Rei => "The Visionary Artist",
        }
    }
}

impl fmt::Display for Champion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Champion::Ren => "Ren",
            Champion::Rei => "Rei",
        };
        write!(f, "{name}")
    }
}
