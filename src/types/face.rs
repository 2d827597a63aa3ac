//! Faces: `Family:Archetype` identifiers and the prize mirror table

use std::collections::HashMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::LineId;

/// The fourteen archetypes, two per line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Sovereign,
    Rebel,
    Navigator,
    Visionary,
    Guardian,
    Wanderer,
    Sage,
    Advocate,
    Artisan,
    Star,
    Caretaker,
    Loyalist,
    Stoic,
    Firebrand,
}

impl Archetype {
    pub const ALL: [Archetype; 14] = [
        Archetype::Sovereign,
        Archetype::Rebel,
        Archetype::Navigator,
        Archetype::Visionary,
        Archetype::Guardian,
        Archetype::Wanderer,
        Archetype::Sage,
        Archetype::Advocate,
        Archetype::Artisan,
        Archetype::Star,
        Archetype::Caretaker,
        Archetype::Loyalist,
        Archetype::Stoic,
        Archetype::Firebrand,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Sovereign => "Sovereign",
            Archetype::Rebel => "Rebel",
            Archetype::Navigator => "Navigator",
            Archetype::Visionary => "Visionary",
            Archetype::Guardian => "Guardian",
            Archetype::Wanderer => "Wanderer",
            Archetype::Sage => "Sage",
            Archetype::Advocate => "Advocate",
            Archetype::Artisan => "Artisan",
            Archetype::Star => "Star",
            Archetype::Caretaker => "Caretaker",
            Archetype::Loyalist => "Loyalist",
            Archetype::Stoic => "Stoic",
            Archetype::Firebrand => "Firebrand",
        }
    }

    /// The line this archetype belongs to
    pub fn family(&self) -> LineId {
        match self {
            Archetype::Sovereign | Archetype::Rebel => LineId::Control,
            Archetype::Navigator | Archetype::Visionary => LineId::Pace,
            Archetype::Guardian | Archetype::Wanderer => LineId::Boundary,
            Archetype::Sage | Archetype::Advocate => LineId::Truth,
            Archetype::Artisan | Archetype::Star => LineId::Recognition,
            Archetype::Caretaker | Archetype::Loyalist => LineId::Bonding,
            Archetype::Stoic | Archetype::Firebrand => LineId::Stress,
        }
    }

    /// Prize mirror: every archetype maps to the clean archetype of its family
    pub fn mirror(&self) -> Archetype {
        self.family().clean_archetype()
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

lazy_static! {
    static ref RE_FACE: Regex = Regex::new(r"^\s*([A-Za-z]+)\s*:\s*([A-Za-z]+)\s*$").unwrap();

    static ref ARCHETYPE_BY_NAME: HashMap<String, Archetype> = Archetype::ALL
        .iter()
        .map(|a| (a.name().to_ascii_lowercase(), *a))
        .collect();
}

/// A face identifier, always in canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Face {
    family: LineId,
    archetype: Archetype,
}

impl Face {
    /// Build a face; the archetype must belong to the family
    pub fn new(family: LineId, archetype: Archetype) -> Option<Face> {
        if archetype.family() == family {
            Some(Face { family, archetype })
        } else {
            None
        }
    }

    /// Face for an archetype (family implied)
    pub fn of(archetype: Archetype) -> Face {
        Face { family: archetype.family(), archetype }
    }

    pub fn family(&self) -> LineId {
        self.family
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Prize mirror of this face
    pub fn mirror(&self) -> Face {
        Face::of(self.archetype.mirror())
    }

    /// True when the face is its own prize mirror
    pub fn is_self_mirror(&self) -> bool {
        self.mirror() == *self
    }

    /// Canonical `Family:Archetype` string
    pub fn id(&self) -> String {
        format!("{}:{}", self.family.name(), self.archetype.name())
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.family.name(), self.archetype.name())
    }
}

impl FromStr for Face {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RE_FACE
            .captures(s)
            .ok_or_else(|| format!("malformed face id '{}'", s))?;
        let family = LineId::from_name(&caps[1])
            .ok_or_else(|| format!("unknown family '{}'", &caps[1]))?;
        let archetype = ARCHETYPE_BY_NAME
            .get(&caps[2].to_ascii_lowercase())
            .copied()
            .ok_or_else(|| format!("unknown archetype '{}'", &caps[2]))?;
        Face::new(family, archetype)
            .ok_or_else(|| format!("archetype {} does not belong to {}", archetype, family))
    }
}

impl TryFrom<String> for Face {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Face> for String {
    fn from(face: Face) -> Self {
        face.id()
    }
}
