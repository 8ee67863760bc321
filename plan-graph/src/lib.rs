//! Room adjacency graphs for floor plans.
//!
//! A [`FloorPlan`] is built from loader output ([`PlanSource`]), then
//! [`FloorPlan::analyze`] classifies every room pair and freezes the result
//! into a [`PlanGraph`]. Path and depth queries run through [`PathSolver`].

pub mod adjacency;
pub mod category;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod render;
pub mod solver;

pub use adjacency::{AdjacencyConfig, Relation, RelationLabel};
pub use category::{CategoryTable, RoomCategory};
pub use entities::{Door, FloorPlan, PlanSource, RawDoor, RawRoom, Room};
pub use error::{PlanError, Result};
pub use geometry::Point;
pub use graph::{AdjacencyList, AdjacencyMatrix, PlanGraph};
pub use render::{render_relation_svg, Canvas};
pub use solver::{PathSolver, RoomPath};
