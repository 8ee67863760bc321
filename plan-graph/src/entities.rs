use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::category::{CategoryTable, RoomCategory};
use crate::error::Result;
use crate::geometry::{vertex_mean, Footprint, Point};

/// Room outline as handed over by a floor-plan loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRoom {
    pub raw_label: String,
    pub vertices: Vec<Point>,
    #[serde(default)]
    pub parse_order_index: usize,
}

/// Door outline as handed over by a floor-plan loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDoor {
    pub vertices: Vec<Point>,
    #[serde(default)]
    pub parse_order_index: usize,
}

/// Everything a loader extracts from one drawing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSource {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub rooms: Vec<RawRoom>,
    #[serde(default)]
    pub doors: Vec<RawDoor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: String,
    pub category: RoomCategory,
    pub polygon: Vec<Point>,
    pub centroid: Point,
    /// Filled in by the adjacency builder
    pub adjacent_doors: BTreeSet<String>,
    #[serde(skip)]
    pub(crate) footprint: Footprint,
}

impl Room {
    pub fn area(&self) -> f64 {
        self.footprint.area()
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Door {
    pub id: String,
    pub polygon: Vec<Point>,
    #[serde(skip)]
    pub(crate) footprint: Footprint,
}

impl Door {
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

/// Stable sort by loader parse order; ties keep their input order
fn in_parse_order<T>(items: &[T], index: impl Fn(&T) -> usize) -> Vec<&T> {
    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by_key(|item| index(item));
    ordered
}

/// Assign `<Category>_<n>` ids with a per-category counter, in the given order
pub fn assign_room_ids<'a, I>(labels: I, table: &CategoryTable) -> Result<Vec<(String, RoomCategory)>>
where
    I: IntoIterator<Item = &'a str>,
{
    type Assignment = (HashMap<RoomCategory, usize>, Vec<(String, RoomCategory)>);

    let (_, assigned) = labels.into_iter().try_fold(
        Assignment::default(),
        |(mut counts, mut assigned), label| -> Result<Assignment> {
            let category = table.category_of(label)?;
            let sequence = counts.entry(category).or_insert(0);
            *sequence += 1;
            assigned.push((format!("{}_{}", category, sequence), category));
            Ok((counts, assigned))
        },
    )?;
    Ok(assigned)
}

/// Rooms and doors of one drawing, validated and named but not yet analyzed
#[derive(Debug, Clone)]
pub struct FloorPlan {
    pub(crate) rooms: Vec<Room>,
    pub(crate) doors: Vec<Door>,
    pub(crate) width: Option<f64>,
    pub(crate) height: Option<f64>,
}

impl FloorPlan {
    /// Name and validate every entity of a loaded drawing.
    ///
    /// The first unknown label or degenerate polygon rejects the whole plan.
    pub fn from_source(source: &PlanSource, table: &CategoryTable) -> Result<Self> {
        let raw_rooms = in_parse_order(&source.rooms, |r| r.parse_order_index);
        let ids = assign_room_ids(raw_rooms.iter().map(|r| r.raw_label.as_str()), table)?;

        let rooms = raw_rooms
            .iter()
            .zip(ids)
            .map(|(raw, (id, category))| -> Result<Room> {
                let footprint = Footprint::new(&id, &raw.vertices).inspect_err(|e| {
                    warn!("Rejecting room {} ({}): {}", id, raw.raw_label, e);
                })?;
                Ok(Room {
                    centroid: vertex_mean(&raw.vertices),
                    polygon: raw.vertices.clone(),
                    adjacent_doors: BTreeSet::new(),
                    id,
                    category,
                    footprint,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let doors = in_parse_order(&source.doors, |d| d.parse_order_index)
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| -> Result<Door> {
                let id = format!("Door_{}", idx + 1);
                let footprint = Footprint::new(&id, &raw.vertices).inspect_err(|e| {
                    warn!("Rejecting door {}: {}", id, e);
                })?;
                Ok(Door {
                    polygon: raw.vertices.clone(),
                    id,
                    footprint,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Floor plan has {} rooms and {} doors", rooms.len(), doors.len());

        Ok(Self {
            rooms,
            doors,
            width: source.width,
            height: source.height,
        })
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn doors(&self) -> &[Door] {
        &self.doors
    }
}
