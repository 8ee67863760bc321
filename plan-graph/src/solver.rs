//! Breadth-first queries over the room adjacency list.
//!
//! Every edge counts as one hop, whether the rooms share a wall or a door.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::{PlanError, Result};
use crate::graph::AdjacencyList;

/// Room ids from start to end, both included
pub type RoomPath = Vec<String>;

/// Read-only path queries; holds no traversal state between calls
#[derive(Debug, Clone, Copy)]
pub struct PathSolver<'g> {
    adjacency: &'g AdjacencyList,
}

impl<'g> PathSolver<'g> {
    pub fn new(adjacency: &'g AdjacencyList) -> Self {
        Self { adjacency }
    }

    fn require(&self, room_id: &str) -> Result<()> {
        if self.adjacency.contains(room_id) {
            Ok(())
        } else {
            Err(PlanError::UnknownRoom(room_id.to_string()))
        }
    }

    /// Every tied-shortest path from `start` to each reachable room.
    ///
    /// The queue holds whole partial paths. A path reaching a room for the
    /// first time records it; a later path of the same length is kept as a tie
    /// and extended too, since ties into an intermediate room can continue
    /// differently. Longer arrivals are dropped. `start` itself is not a key.
    pub fn shortest_paths_from(&self, start: &str) -> Result<BTreeMap<String, Vec<RoomPath>>> {
        self.explore(start, None, None)
    }

    /// As `shortest_paths_from`, failing with `PathLimit` once more than
    /// `limit` paths have been recorded.
    pub fn shortest_paths_from_limited(
        &self,
        start: &str,
        limit: usize,
    ) -> Result<BTreeMap<String, Vec<RoomPath>>> {
        self.explore(start, None, Some(limit))
    }

    /// All tied-shortest paths between two rooms.
    ///
    /// A room is trivially connected to itself by the one-room path.
    pub fn shortest_paths_between(&self, start: &str, end: &str) -> Result<Vec<RoomPath>> {
        self.between(start, end, None)
    }

    /// As `shortest_paths_between`, failing with `PathLimit` once more than
    /// `limit` paths have been recorded on the way to `end`.
    pub fn shortest_paths_between_limited(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<RoomPath>> {
        self.between(start, end, Some(limit))
    }

    fn between(&self, start: &str, end: &str, limit: Option<usize>) -> Result<Vec<RoomPath>> {
        self.require(start)?;
        self.require(end)?;

        if start == end {
            return Ok(vec![vec![start.to_string()]]);
        }

        self.explore(start, Some(end), limit)?
            .remove(end)
            .ok_or_else(|| PlanError::NotFound {
                from: start.to_string(),
                to: end.to_string(),
            })
    }

    fn explore(
        &self,
        start: &str,
        target: Option<&str>,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Vec<RoomPath>>> {
        self.require(start)?;

        let mut best: BTreeMap<String, Vec<RoomPath>> = BTreeMap::new();
        let mut queue: VecDeque<RoomPath> = VecDeque::new();
        let mut recorded = 0usize;
        queue.push_back(vec![start.to_string()]);

        while let Some(path) = queue.pop_front() {
            // Paths leave the queue in length order, so nothing from here on
            // can tie an already reached target
            let target_len = target
                .and_then(|t| best.get(t))
                .and_then(|paths| paths.first())
                .map(|p| p.len());
            if target_len.is_some_and(|len| path.len() >= len) {
                break;
            }

            let Some(last) = path.last() else { continue };

            for (neighbor, _) in self.adjacency.neighbors(last) {
                if path.iter().any(|room| room == neighbor) {
                    continue;
                }

                let mut extended = path.clone();
                extended.push(neighbor.to_string());

                match best.entry(neighbor.to_string()) {
                    Entry::Vacant(slot) => {
                        slot.insert(vec![extended.clone()]);
                    }
                    Entry::Occupied(mut slot) => {
                        if slot.get()[0].len() != extended.len() {
                            continue;
                        }
                        slot.get_mut().push(extended.clone());
                    }
                }

                recorded += 1;
                if let Some(limit) = limit.filter(|&limit| recorded > limit) {
                    return Err(PlanError::PathLimit {
                        from: start.to_string(),
                        limit,
                    });
                }
                queue.push_back(extended);
            }
        }

        Ok(best)
    }

    /// Hop distance to every room reachable from `start`, `start` included at 0
    pub fn distances_from(&self, start: &str) -> Result<HashMap<&'g str, usize>> {
        let origin = self
            .adjacency
            .room_ids()
            .find(|id| *id == start)
            .ok_or_else(|| PlanError::UnknownRoom(start.to_string()))?;

        let mut levels: HashMap<&'g str, usize> = HashMap::from([(origin, 0)]);
        let mut queue = VecDeque::from([origin]);

        while let Some(room) = queue.pop_front() {
            let level = levels[room];
            for (neighbor, _) in self.adjacency.neighbors(room) {
                if !levels.contains_key(neighbor) {
                    levels.insert(neighbor, level + 1);
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(levels)
    }

    /// Largest hop count from `start` to any reachable room
    pub fn depth_from(&self, start: &str) -> Result<usize> {
        Ok(self
            .distances_from(start)?
            .into_values()
            .max()
            .unwrap_or(0))
    }

    /// Largest `depth_from` over every room; 0 for an empty plan
    pub fn graph_depth(&self) -> usize {
        self.adjacency
            .room_ids()
            .filter_map(|id| self.depth_from(id).ok())
            .max()
            .unwrap_or(0)
    }
}
