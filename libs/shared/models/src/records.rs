use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{self, slot_end};

/// A record tagged with the key it is stored under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Stored<T> {
    pub fn new(id: impl Into<String>, record: T) -> Self {
        Self { id: id.into(), record }
    }
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
}

impl Room {
    pub const ALL: [Room; 3] = [Room::One, Room::Two, Room::Three];

    pub fn as_str(&self) -> &'static str {
        match self {
            Room::One => "1",
            Room::Two => "2",
            Room::Three => "3",
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Room {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Room::ALL
            .into_iter()
            .find(|room| room.as_str() == s.trim())
            .ok_or_else(|| format!("unknown room: {}", s))
    }
}

/// File inlined into an appointment as a data URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub data: String,
    pub id: f64,
}

impl AttachedFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub phone: String,
    #[serde(with = "time::flexible")]
    pub date_time: DateTime<Utc>,
    pub room: Room,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub files: Vec<AttachedFile>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub doctor_color: String,
    #[serde(default, with = "time::flexible_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn start(&self) -> DateTime<Utc> {
        self.date_time
    }

    pub fn end(&self) -> DateTime<Utc> {
        slot_end(self.date_time)
    }

    /// "Last First", the label shown on calendar tiles.
    pub fn title(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(with = "time::flexible")]
    pub first_visit: DateTime<Utc>,
    #[serde(with = "time::flexible")]
    pub last_visit: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        [&self.last_name, &self.first_name, &self.middle_name]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
