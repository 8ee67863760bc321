use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::entities::{Door, Room};
use crate::geometry::shared_area;

/// Tolerances for the buffered-intersection adjacency rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyConfig {
    /// Outward expansion applied before intersecting outlines
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Minimum room/door overlap for the door to open into the room
    #[serde(default = "default_door_overlap")]
    pub door_overlap: f64,
    /// Minimum room/room overlap for a direct (wall) adjacency
    #[serde(default = "default_wall_overlap")]
    pub wall_overlap: f64,
}

fn default_margin() -> f64 {
    1.0
}

fn default_door_overlap() -> f64 {
    10.0 // Filters doors that only graze a room boundary
}

fn default_wall_overlap() -> f64 {
    5.0
}

impl Default for AdjacencyConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            door_overlap: default_door_overlap(),
            wall_overlap: default_wall_overlap(),
        }
    }
}

/// How two rooms relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RelationLabel {
    Unrelated = 0,
    /// Shared wall or opening
    Direct = 1,
    /// Connected only through a common door
    ViaDoor = 2,
}

impl RelationLabel {
    pub fn is_adjacent(&self) -> bool {
        !matches!(self, Self::Unrelated)
    }
}

impl From<RelationLabel> for u8 {
    fn from(label: RelationLabel) -> Self {
        label as u8
    }
}

impl TryFrom<u8> for RelationLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unrelated),
            1 => Ok(Self::Direct),
            2 => Ok(Self::ViaDoor),
            other => Err(format!("invalid relation label {}", other)),
        }
    }
}

impl fmt::Display for RelationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// One fact about an unordered room pair, `room_a` earlier in parse order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub room_a: String,
    pub label: RelationLabel,
    pub room_b: String,
}

impl Relation {
    pub fn new(room_a: impl Into<String>, label: RelationLabel, room_b: impl Into<String>) -> Self {
        Self {
            room_a: room_a.into(),
            label,
            room_b: room_b.into(),
        }
    }
}

/// Decide the label for a room pair.
///
/// Direct adjacency is checked first and wins over a shared door. The
/// comparison is strict: an overlap exactly at the threshold is not direct.
pub fn classify_pair(overlap_area: f64, shares_door: bool, config: &AdjacencyConfig) -> RelationLabel {
    if overlap_area > config.wall_overlap {
        RelationLabel::Direct
    } else if shares_door {
        RelationLabel::ViaDoor
    } else {
        RelationLabel::Unrelated
    }
}

/// For each room, the ids of the doors opening into it
pub fn detect_door_adjacency(
    rooms: &[Room],
    doors: &[Door],
    config: &AdjacencyConfig,
) -> Vec<BTreeSet<String>> {
    let buffered_doors: Vec<MultiPolygon<f64>> = doors
        .iter()
        .map(|d| d.footprint.buffered(config.margin))
        .collect();

    rooms
        .iter()
        .map(|room| {
            doors
                .iter()
                .zip(&buffered_doors)
                .filter_map(|(door, buffered)| {
                    let overlap = room.footprint.overlap_area(buffered);
                    if overlap > config.door_overlap {
                        debug!("{} opens into {} (overlap {:.2})", door.id, room.id, overlap);
                        Some(door.id.clone())
                    } else {
                        None
                    }
                })
                .collect()
        })
        .collect()
}

/// One relation for every unordered pair of distinct rooms.
///
/// Rooms must already carry their `adjacent_doors`.
pub fn build_relations(rooms: &[Room], config: &AdjacencyConfig) -> Vec<Relation> {
    let buffered: Vec<MultiPolygon<f64>> = rooms
        .iter()
        .map(|r| r.footprint.buffered(config.margin))
        .collect();

    let mut relations = Vec::with_capacity(rooms.len() * rooms.len().saturating_sub(1) / 2);

    for i in 0..rooms.len() {
        for j in (i + 1)..rooms.len() {
            let (a, b) = (&rooms[i], &rooms[j]);
            let overlap = shared_area(&buffered[i], &buffered[j]);
            let shares_door = !a.adjacent_doors.is_disjoint(&b.adjacent_doors);
            let label = classify_pair(overlap, shares_door, config);

            debug!(
                "{} - {}: overlap {:.2}, shared door {} => {}",
                a.id, b.id, overlap, shares_door, label
            );
            relations.push(Relation::new(a.id.clone(), label, b.id.clone()));
        }
    }

    relations
}
