use nalgebra::DMatrix;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::adjacency::{build_relations, detect_door_adjacency, AdjacencyConfig, Relation, RelationLabel};
use crate::entities::{Door, FloorPlan, Room};
use crate::error::{PlanError, Result};
use crate::solver::PathSolver;

// Undirected room graph; walls and doors connect rooms both ways
pub type RoomGraph<'a> = UnGraph<&'a str, RelationLabel>;

/// Room id -> neighbor id -> label, symmetric, every room present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdjacencyList {
    neighbors: BTreeMap<String, BTreeMap<String, RelationLabel>>,
}

impl AdjacencyList {
    /// Build from a relation table, dropping unrelated pairs.
    ///
    /// Every id in `room_ids` gets an entry, even with no neighbors.
    pub fn from_relations<'a>(
        room_ids: impl IntoIterator<Item = &'a str>,
        relations: &[Relation],
    ) -> Self {
        let mut neighbors: BTreeMap<String, BTreeMap<String, RelationLabel>> = room_ids
            .into_iter()
            .map(|id| (id.to_string(), BTreeMap::new()))
            .collect();

        for relation in relations.iter().filter(|r| r.label.is_adjacent()) {
            neighbors
                .entry(relation.room_a.clone())
                .or_default()
                .insert(relation.room_b.clone(), relation.label);
            neighbors
                .entry(relation.room_b.clone())
                .or_default()
                .insert(relation.room_a.clone(), relation.label);
        }

        Self { neighbors }
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.neighbors.contains_key(room_id)
    }

    /// Neighbors of a room in id order; empty for unknown ids
    pub fn neighbors<'a>(&'a self, room_id: &str) -> impl Iterator<Item = (&'a str, RelationLabel)> + 'a {
        self.neighbors
            .get(room_id)
            .into_iter()
            .flat_map(|m| m.iter().map(|(id, label)| (id.as_str(), *label)))
    }

    pub fn label(&self, a: &str, b: &str) -> Option<RelationLabel> {
        self.neighbors.get(a).and_then(|m| m.get(b)).copied()
    }

    pub fn room_ids(&self) -> impl Iterator<Item = &str> {
        self.neighbors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, BTreeMap<String, RelationLabel>> {
        &self.neighbors
    }
}

/// Dense adjacency indexed by parse order
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    ids: Vec<String>,
    cells: DMatrix<RelationLabel>,
}

impl AdjacencyMatrix {
    pub fn index_of(&self, room_id: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == room_id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn get(&self, i: usize, j: usize) -> RelationLabel {
        self.cells[(i, j)]
    }

    pub fn cells(&self) -> &DMatrix<RelationLabel> {
        &self.cells
    }
}

impl FloorPlan {
    /// Detect door openings and room relations, freezing the plan.
    pub fn analyze(mut self, config: &AdjacencyConfig) -> PlanGraph {
        let door_sets = detect_door_adjacency(&self.rooms, &self.doors, config);
        for (room, doors) in self.rooms.iter_mut().zip(door_sets) {
            room.adjacent_doors = doors;
        }

        let relations = build_relations(&self.rooms, config);
        let adjacency = AdjacencyList::from_relations(self.rooms.iter().map(|r| r.id.as_str()), &relations);

        let room_index = self
            .rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let door_index = self
            .doors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();

        let graph = PlanGraph {
            rooms: self.rooms,
            doors: self.doors,
            relations,
            adjacency,
            room_index,
            door_index,
            width: self.width,
            height: self.height,
        };

        info!(
            "Analyzed plan: {} rooms, {} doors, {} adjacent pairs",
            graph.rooms.len(),
            graph.doors.len(),
            graph.relations.iter().filter(|r| r.label.is_adjacent()).count()
        );

        graph
    }
}

/// Analyzed plan: entities, relations and derived views, all immutable
#[derive(Debug, Clone)]
pub struct PlanGraph {
    rooms: Vec<Room>,
    doors: Vec<Door>,
    relations: Vec<Relation>,
    adjacency: AdjacencyList,
    room_index: HashMap<String, usize>,
    door_index: HashMap<String, usize>,
    width: Option<f64>,
    height: Option<f64>,
}

impl PlanGraph {
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.room_index.get(id).map(|&i| &self.rooms[i])
    }

    pub fn door(&self, id: &str) -> Option<&Door> {
        self.door_index.get(id).map(|&i| &self.doors[i])
    }

    /// Drawing size reported by the loader, if any
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        self.width.zip(self.height)
    }

    pub fn adjacency_list(&self) -> &AdjacencyList {
        &self.adjacency
    }

    pub fn adjacency_matrix(&self) -> AdjacencyMatrix {
        let n = self.rooms.len();
        let mut cells = DMatrix::from_element(n, n, RelationLabel::Unrelated);
        for relation in self.relations.iter().filter(|r| r.label.is_adjacent()) {
            let i = self.room_index[&relation.room_a];
            let j = self.room_index[&relation.room_b];
            cells[(i, j)] = relation.label;
            cells[(j, i)] = relation.label;
        }
        AdjacencyMatrix {
            ids: self.rooms.iter().map(|r| r.id.clone()).collect(),
            cells,
        }
    }

    /// The adjacency as a petgraph graph, node indices in parse order
    pub fn room_graph(&self) -> RoomGraph<'_> {
        let mut graph = UnGraph::with_capacity(self.rooms.len(), self.relations.len());
        for room in &self.rooms {
            graph.add_node(room.id.as_str());
        }
        for relation in self.relations.iter().filter(|r| r.label.is_adjacent()) {
            let a = NodeIndex::new(self.room_index[&relation.room_a]);
            let b = NodeIndex::new(self.room_index[&relation.room_b]);
            graph.add_edge(a, b, relation.label);
        }
        graph
    }

    /// Number of connected groups of rooms; isolated rooms count alone
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.room_graph())
    }

    pub fn solver(&self) -> PathSolver<'_> {
        PathSolver::new(&self.adjacency)
    }

    /// Resolve a room id or fail with `UnknownRoom`
    pub fn require_room(&self, id: &str) -> Result<&Room> {
        self.room(id).ok_or_else(|| PlanError::UnknownRoom(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryTable;
    use crate::entities::{PlanSource, RawDoor, RawRoom};
    use crate::geometry::rect;

    // Living room and kitchen share a wall, bath hangs off the living room by a
    // door, garage sits apart.
    fn sample_source() -> PlanSource {
        let room = |label: &str, idx: usize, r: Vec<crate::geometry::Point>| RawRoom {
            raw_label: label.to_string(),
            vertices: r,
            parse_order_index: idx,
        };
        PlanSource {
            width: Some(200.0),
            height: Some(100.0),
            rooms: vec![
                room("LivingRoom", 0, rect(0.0, 0.0, 20.0, 20.0)),
                room("Kitchen", 1, rect(20.0, 0.0, 30.0, 20.0)),
                room("Bath", 2, rect(0.0, 30.0, 10.0, 40.0)),
                room("Garage", 3, rect(100.0, 0.0, 130.0, 30.0)),
            ],
            doors: vec![RawDoor {
                vertices: rect(3.0, 16.0, 7.0, 34.0),
                parse_order_index: 0,
            }],
        }
    }

    fn analyzed() -> PlanGraph {
        FloorPlan::from_source(&sample_source(), &CategoryTable::default())
            .unwrap()
            .analyze(&AdjacencyConfig::default())
    }

    #[test]
    fn test_analyze_labels() {
        let graph = analyzed();
        let adjacency = graph.adjacency_list();

        assert_eq!(adjacency.label("LivingRoom_1", "Kitchen_1"), Some(RelationLabel::Direct));
        assert_eq!(adjacency.label("LivingRoom_1", "Bath_1"), Some(RelationLabel::ViaDoor));
        assert_eq!(adjacency.label("Kitchen_1", "Bath_1"), None);
        assert_eq!(adjacency.neighbors("Garage_1").count(), 0);
        assert!(adjacency.contains("Garage_1"));

        assert!(graph.room("Bath_1").unwrap().adjacent_doors.contains("Door_1"));
        assert!(graph.room("Kitchen_1").unwrap().adjacent_doors.is_empty());
        assert_eq!(graph.door("Door_1").unwrap().polygon.len(), 4);
        assert_eq!(graph.dimensions(), Some((200.0, 100.0)));
    }

    #[test]
    fn test_relation_table_covers_every_pair() {
        let graph = analyzed();
        assert_eq!(graph.relations().len(), 6);
        let unrelated = graph
            .relations()
            .iter()
            .filter(|r| r.label == RelationLabel::Unrelated)
            .count();
        assert_eq!(unrelated, 4);
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let graph = analyzed();
        let adjacency = graph.adjacency_list();
        for relation in graph.relations().iter().filter(|r| r.label.is_adjacent()) {
            assert_eq!(adjacency.label(&relation.room_a, &relation.room_b), Some(relation.label));
            assert_eq!(adjacency.label(&relation.room_b, &relation.room_a), Some(relation.label));
        }
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let first = analyzed();
        let second = analyzed();

        let ids = |g: &PlanGraph| g.rooms().iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.relations(), second.relations());
        assert_eq!(first.adjacency_list(), second.adjacency_list());
        assert_eq!(first.adjacency_matrix(), second.adjacency_matrix());
    }

    #[test]
    fn test_matrix_matches_list() {
        let graph = analyzed();
        let matrix = graph.adjacency_matrix();
        let adjacency = graph.adjacency_list();

        assert_eq!(matrix.ids().len(), 4);
        for (i, a) in matrix.ids().iter().enumerate() {
            for (j, b) in matrix.ids().iter().enumerate() {
                let expected = adjacency.label(a, b).unwrap_or(RelationLabel::Unrelated);
                assert_eq!(matrix.get(i, j), expected, "{} / {}", a, b);
            }
        }
        assert_eq!(matrix.index_of("Bath_1"), Some(2));
    }

    #[test]
    fn test_room_graph_components() {
        let graph = analyzed();
        let petgraph = graph.room_graph();
        assert_eq!(petgraph.node_count(), 4);
        assert_eq!(petgraph.edge_count(), 2);
        // living room cluster plus the detached garage
        assert_eq!(graph.component_count(), 2);
    }

    #[test]
    fn test_from_relations_keeps_isolated_rooms() {
        let relations = vec![
            Relation::new("A", RelationLabel::Direct, "B"),
            Relation::new("A", RelationLabel::Unrelated, "C"),
        ];
        let list = AdjacencyList::from_relations(["A", "B", "C"], &relations);
        assert_eq!(list.len(), 3);
        assert_eq!(list.neighbors("C").count(), 0);
        assert_eq!(list.neighbors("B").collect::<Vec<_>>(), vec![("A", RelationLabel::Direct)]);
    }

    #[test]
    fn test_empty_plan() {
        let graph = FloorPlan::from_source(&PlanSource::default(), &CategoryTable::default())
            .unwrap()
            .analyze(&AdjacencyConfig::default());

        assert!(graph.relations().is_empty());
        assert!(graph.adjacency_list().is_empty());
        assert_eq!(graph.adjacency_matrix().cells().nrows(), 0);
        assert_eq!(graph.component_count(), 0);
        assert_eq!(graph.solver().graph_depth(), 0);
        assert_eq!(graph.dimensions(), None);
    }

    #[test]
    fn test_far_from_origin_plan_analyzes() {
        let x = 2_000_000.0;
        let source = PlanSource {
            rooms: vec![
                RawRoom {
                    raw_label: "Bedroom".to_string(),
                    vertices: rect(x, 0.0, x + 10.0, 10.0),
                    parse_order_index: 0,
                },
                RawRoom {
                    raw_label: "Bedroom".to_string(),
                    vertices: rect(x + 10.0, 0.0, x + 20.0, 10.0),
                    parse_order_index: 1,
                },
            ],
            ..Default::default()
        };
        let graph = FloorPlan::from_source(&source, &CategoryTable::default())
            .unwrap()
            .analyze(&AdjacencyConfig::default());

        assert_eq!(
            graph.adjacency_list().label("Bedroom_1", "Bedroom_2"),
            Some(RelationLabel::Direct)
        );
    }

    #[test]
    fn test_unknown_room_lookup() {
        let graph = analyzed();
        assert_eq!(
            graph.require_room("Attic_9").unwrap_err(),
            PlanError::UnknownRoom("Attic_9".to_string())
        );
    }
}
