use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{PlanError, Result};

/// Coarse room category used for naming and coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomCategory {
    LivingRoom,
    Bedroom,
    Kitchen,
    Dining,
    Bath,
    Storage,
    Entry,
    Garage,
    Outdoor,
    Other,
    Background,
}

impl RoomCategory {
    pub const ALL: [RoomCategory; 11] = [
        Self::LivingRoom,
        Self::Bedroom,
        Self::Kitchen,
        Self::Dining,
        Self::Bath,
        Self::Storage,
        Self::Entry,
        Self::Garage,
        Self::Outdoor,
        Self::Other,
        Self::Background,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LivingRoom => "LivingRoom",
            Self::Bedroom => "Bedroom",
            Self::Kitchen => "Kitchen",
            Self::Dining => "Dining",
            Self::Bath => "Bath",
            Self::Storage => "Storage",
            Self::Entry => "Entry",
            Self::Garage => "Garage",
            Self::Outdoor => "Outdoor",
            Self::Other => "Other",
            Self::Background => "Background",
        }
    }
}

impl fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Fine-grained drawing labels and the category each one folds into
const DEFAULT_LABELS: &[(&str, RoomCategory)] = &[
    ("Alcove", RoomCategory::LivingRoom),
    ("Attic", RoomCategory::Other),
    ("Ballroom", RoomCategory::LivingRoom),
    ("Bar", RoomCategory::Dining),
    ("Basement", RoomCategory::Storage),
    ("Bath", RoomCategory::Bath),
    ("Bedroom", RoomCategory::Bedroom),
    ("Below150cm", RoomCategory::LivingRoom),
    ("CarPort", RoomCategory::Garage),
    ("Church", RoomCategory::Bedroom),
    ("Closet", RoomCategory::Storage),
    ("ConferenceRoom", RoomCategory::LivingRoom),
    ("Conservatory", RoomCategory::Bedroom),
    ("Counter", RoomCategory::Dining),
    ("Den", RoomCategory::Bedroom),
    ("Dining", RoomCategory::Dining),
    ("DraughtLobby", RoomCategory::Entry),
    ("DressingRoom", RoomCategory::Storage),
    ("EatingArea", RoomCategory::Dining),
    ("Elevated", RoomCategory::LivingRoom),
    ("Elevator", RoomCategory::LivingRoom),
    ("Entry", RoomCategory::Entry),
    ("ExerciseRoom", RoomCategory::LivingRoom),
    ("Garage", RoomCategory::Garage),
    ("Garbage", RoomCategory::Storage),
    ("Hall", RoomCategory::LivingRoom),
    ("HallWay", RoomCategory::Entry),
    ("HotTub", RoomCategory::Bath),
    ("Kitchen", RoomCategory::Kitchen),
    ("Library", RoomCategory::Bedroom),
    ("LivingRoom", RoomCategory::LivingRoom),
    ("Loft", RoomCategory::LivingRoom),
    ("Lounge", RoomCategory::LivingRoom),
    ("MediaRoom", RoomCategory::LivingRoom),
    ("MeetingRoom", RoomCategory::LivingRoom),
    ("Museum", RoomCategory::LivingRoom),
    ("Nook", RoomCategory::Bedroom),
    ("Office", RoomCategory::LivingRoom),
    ("OpenToBelow", RoomCategory::LivingRoom),
    ("Outdoor", RoomCategory::Outdoor),
    ("Pantry", RoomCategory::Kitchen),
    ("Reception", RoomCategory::LivingRoom),
    ("RecreationRoom", RoomCategory::LivingRoom),
    ("RetailSpace", RoomCategory::LivingRoom),
    ("Room", RoomCategory::Other),
    ("Sanctuary", RoomCategory::Bedroom),
    ("Sauna", RoomCategory::Bath),
    ("ServiceRoom", RoomCategory::Storage),
    ("ServingArea", RoomCategory::Storage),
    ("Skylights", RoomCategory::Other),
    ("Stable", RoomCategory::Outdoor),
    ("Stage", RoomCategory::LivingRoom),
    ("StairWell", RoomCategory::LivingRoom),
    ("Storage", RoomCategory::Storage),
    ("SunRoom", RoomCategory::Bedroom),
    ("SwimmingPool", RoomCategory::LivingRoom),
    ("TechnicalRoom", RoomCategory::Storage),
    ("Theatre", RoomCategory::LivingRoom),
    ("Undefined", RoomCategory::Other),
    ("UserDefined", RoomCategory::Other),
    ("Utility", RoomCategory::Storage),
    ("Background", RoomCategory::Background),
];

const DEFAULT_COLORS: &[(RoomCategory, &str)] = &[
    (RoomCategory::Bedroom, "deepskyblue"),
    (RoomCategory::LivingRoom, "crimson"),
    (RoomCategory::Kitchen, "gold"),
    (RoomCategory::Dining, "gold"),
    (RoomCategory::Bath, "aquamarine"),
    (RoomCategory::Entry, "hotpink"),
    (RoomCategory::Storage, "olivedrab"),
    (RoomCategory::Outdoor, "lawngreen"),
    (RoomCategory::Other, "hotpink"),
];

/// Color for categories the table leaves uncolored
pub const FALLBACK_COLOR: &str = "grey";

/// Label taxonomy and render palette, injected wherever rooms are named or drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    labels: HashMap<String, RoomCategory>,
    #[serde(default)]
    colors: HashMap<RoomCategory, String>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS
                .iter()
                .map(|&(label, category)| (label.to_string(), category))
                .collect(),
            colors: DEFAULT_COLORS
                .iter()
                .map(|&(category, color)| (category, color.to_string()))
                .collect(),
        }
    }
}

impl CategoryTable {
    pub fn new(labels: HashMap<String, RoomCategory>, colors: HashMap<RoomCategory, String>) -> Self {
        Self { labels, colors }
    }

    /// Parse a table from its JSON form
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Read a JSON table from disk
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Map a raw drawing label to its category.
    ///
    /// Labels missing from the table are an error, never a default category.
    pub fn category_of(&self, raw_label: &str) -> Result<RoomCategory> {
        self.labels
            .get(raw_label)
            .copied()
            .ok_or_else(|| PlanError::UnknownCategory {
                label: raw_label.to_string(),
            })
    }

    pub fn color_of(&self, category: RoomCategory) -> &str {
        self.colors
            .get(&category)
            .map(String::as_str)
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_maps_fine_labels() {
        let table = CategoryTable::default();
        assert_eq!(table.category_of("HallWay").unwrap(), RoomCategory::Entry);
        assert_eq!(table.category_of("Pantry").unwrap(), RoomCategory::Kitchen);
        assert_eq!(table.category_of("CarPort").unwrap(), RoomCategory::Garage);
        assert_eq!(table.len(), DEFAULT_LABELS.len());
    }

    #[test]
    fn test_unknown_label_fails() {
        let table = CategoryTable::default();
        let err = table.category_of("Spaceship").unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownCategory {
                label: "Spaceship".to_string()
            }
        );
    }

    #[test]
    fn test_colors_fall_back_to_grey() {
        let table = CategoryTable::default();
        assert_eq!(table.color_of(RoomCategory::Bedroom), "deepskyblue");
        assert_eq!(table.color_of(RoomCategory::Garage), FALLBACK_COLOR);
        assert_eq!(table.color_of(RoomCategory::Background), FALLBACK_COLOR);
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "labels": { "Studio": "LivingRoom", "WC": "Bath" },
            "colors": { "Bath": "teal" }
        }"#;
        let table = CategoryTable::from_json(json).unwrap();
        assert_eq!(table.category_of("WC").unwrap(), RoomCategory::Bath);
        assert_eq!(table.color_of(RoomCategory::Bath), "teal");
        assert!(table.category_of("Bedroom").is_err());
    }

    #[test]
    fn test_category_names_round_trip_display() {
        for category in RoomCategory::ALL {
            assert_eq!(category.to_string(), category.name());
        }
    }
}
