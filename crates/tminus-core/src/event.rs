use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_THEME_COLOR: &str = "#B8FF9F";
pub const THEME_PALETTE: [&str; 4] = ["#B8FF9F", "#FF9F9F", "#9FDDFF", "#FFF59F"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Trip,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Trip => "trip",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Ok(Category::Personal),
            "work" => Ok(Category::Work),
            "trip" => Ok(Category::Trip),
            "other" => Ok(Category::Other),
            other => Err(anyhow!(
                "unknown category: {other} (expected personal, work, trip or other)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
}

impl Note {
    pub fn new(content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,

    pub name: String,

    pub target: DateTime<Utc>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default = "default_theme_color")]
    pub theme_color: String,

    #[serde(default)]
    pub notes: Vec<Note>,

    pub created: DateTime<Utc>,

    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_theme_color() -> String {
    DEFAULT_THEME_COLOR.to_string()
}

impl Event {
    pub fn new(name: String, target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            target,
            description: String::new(),
            category: Category::default(),
            theme_color: default_theme_color(),
            notes: vec![],
            created: now,
            modified: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Remaining {
        Remaining::until(now, self.target)
    }

    pub fn completed_notes(&self) -> usize {
        self.notes.iter().filter(|note| note.completed).count()
    }
}

/// Accepts `#RGB` or `#RRGGBB`, returned upper-cased.
pub fn parse_theme_color(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("color must start with '#': {trimmed}"))?;
    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("invalid hex color: {trimmed}"));
    }
    Ok(format!("#{}", hex.to_ascii_uppercase()))
}

/// Whole days, hours, minutes and seconds left until a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub mins: i64,
    pub secs: i64,
}

impl Remaining {
    /// All zero once the target has passed.
    pub fn until(now: DateTime<Utc>, target: DateTime<Utc>) -> Self {
        let total = (target - now).num_seconds();
        if total <= 0 {
            return Self::default();
        }
        Self {
            days: total / 86_400,
            hours: (total / 3_600) % 24,
            mins: (total / 60) % 60,
            secs: total % 60,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_urgent(&self, threshold_days: i64) -> bool {
        self.days < threshold_days
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.mins, self.secs
        )
    }
}
