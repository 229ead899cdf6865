//! Body regions, sub-parts, directions and gesture phases

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{LinkError, Result};

// ----------------------------------------------------------------------------
// Regions and Sub-parts
// ----------------------------------------------------------------------------

/// Top-level controllable body group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
    HeadNeck,
    Arms,
    TailSpine,
    LegsPelvis,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::HeadNeck,
        Region::Arms,
        Region::TailSpine,
        Region::LegsPelvis,
    ];

    /// Sub-parts addressable within this region, `Full` always last
    pub fn parts(self) -> &'static [SubPart] {
        match self {
            Region::HeadNeck => &[SubPart::Head, SubPart::Neck, SubPart::Jaw, SubPart::Full],
            Region::Arms => &[SubPart::Arms, SubPart::Claws, SubPart::Full],
            Region::TailSpine => &[SubPart::Tail, SubPart::Spine, SubPart::Full],
            Region::LegsPelvis => &[SubPart::Legs, SubPart::Pelvis, SubPart::Full],
        }
    }

    /// The sub-part that `Full` borrows its directional commands from
    pub fn primary_part(self) -> SubPart {
        self.parts()[0]
    }

    pub fn has_part(self, part: SubPart) -> bool {
        self.parts().contains(&part)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::HeadNeck => "headNeck",
            Region::Arms => "arms",
            Region::TailSpine => "tailSpine",
            Region::LegsPelvis => "legsPelvis",
        }
    }
}

/// Finer-grained toggle within a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubPart {
    Head,
    Neck,
    Jaw,
    Arms,
    Claws,
    Tail,
    Spine,
    Legs,
    Pelvis,
    /// Generic whole-region value, also used by the legacy request form
    Full,
}

impl SubPart {
    pub fn as_str(self) -> &'static str {
        match self {
            SubPart::Head => "head",
            SubPart::Neck => "neck",
            SubPart::Jaw => "jaw",
            SubPart::Arms => "arms",
            SubPart::Claws => "claws",
            SubPart::Tail => "tail",
            SubPart::Spine => "spine",
            SubPart::Legs => "legs",
            SubPart::Pelvis => "pelvis",
            SubPart::Full => "full",
        }
    }
}

// ----------------------------------------------------------------------------
// Directions and Phases
// ----------------------------------------------------------------------------

/// Direction pressed by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Center,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Center,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Center => "center",
        }
    }
}

/// Lifecycle stage of a held gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Start,
    Hold,
    Stop,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Hold => "hold",
            Phase::Stop => "stop",
        }
    }
}

// ----------------------------------------------------------------------------
// Selection
// ----------------------------------------------------------------------------

/// A validated (region, sub-part) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    region: Region,
    part: SubPart,
}

impl Selection {
    /// Create a selection, rejecting parts that belong to another region
    pub fn new(region: Region, part: SubPart) -> Result<Self> {
        if !region.has_part(part) {
            return Err(LinkError::InvalidSelection { region, part });
        }
        Ok(Self { region, part })
    }

    /// Whole-region selection, always valid
    pub fn full(region: Region) -> Self {
        Self {
            region,
            part: SubPart::Full,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn part(&self) -> SubPart {
        self.part
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::full(Region::LegsPelvis)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.part)
    }
}

// ----------------------------------------------------------------------------
// Text Conversions
// ----------------------------------------------------------------------------

/// Lowercase and drop separators so `tailSpine`, `tail-spine` and
/// `TAIL_SPINE` all compare equal
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! text_enum {
    ($ty:ident, $what:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = LinkError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = normalize(s);
                $(
                    if normalize($ty::$variant.as_str()) == wanted {
                        return Ok($ty::$variant);
                    }
                )+
                Err(LinkError::Config(format!("unknown {}: {}", $what, s)))
            }
        }
    };
}

text_enum!(Region, "region", [HeadNeck, Arms, TailSpine, LegsPelvis]);
text_enum!(
    SubPart,
    "sub-part",
    [Head, Neck, Jaw, Arms, Claws, Tail, Spine, Legs, Pelvis, Full]
);
text_enum!(Direction, "direction", [Up, Down, Left, Right, Center]);
text_enum!(Phase, "phase", [Start, Hold, Stop]);
