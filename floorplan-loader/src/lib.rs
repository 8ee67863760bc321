use plan_graph::{PlanSource, Point, RawDoor, RawRoom};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use svg::node::element::tag::Type;
use svg::node::Attributes;
use svg::parser::Event;
use thiserror::Error;
use tracing::{debug, info};

/// Drawing file inside each numbered plan directory
pub const MODEL_FILE: &str = "model.svg";

/// Environment variable naming the dataset root
pub const DATASET_ENV: &str = "FLOORPLAN_DATASET";

const ROOM_CLASS: &str = "Space";
const DOOR_CLASS: &str = "Threshold";

/// Error types for the plan loader
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("SVG parsing error: {0}")]
    SvgError(#[from] svg::parser::Error),

    /// Room or door group without any polygon inside it
    #[error("{entity} has no polygon")]
    MissingPolygon { entity: String },

    /// `Space` group whose class list carries no room label
    #[error("{entity} has no room label in its class list")]
    MissingLabel { entity: String },

    #[error("{entity} has an unparsable point {token:?}")]
    BadPoint { entity: String, token: String },

    #[error("Malformed SVG: {0}")]
    Malformed(String),

    #[error("Unsupported plan format: {0}")]
    UnsupportedFormat(String),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Environment error: {0}")]
    EnvironmentError(String),
}

#[derive(Debug, Clone, PartialEq)]
enum GroupKind {
    Room { label: String, index: usize },
    Door { index: usize },
    Plain,
}

impl GroupKind {
    fn is_entity(&self) -> bool {
        !matches!(self, GroupKind::Plain)
    }

    fn entity(&self) -> String {
        match self {
            GroupKind::Room { label, index } => format!("room #{} ({})", index + 1, label),
            GroupKind::Door { index } => format!("door #{}", index + 1),
            GroupKind::Plain => "group".to_string(),
        }
    }
}

/// A `<g>` whose end tag has not been seen yet
struct OpenGroup {
    kind: GroupKind,
    vertices: Option<Vec<Point>>,
}

fn classify_group(attrs: &Attributes, rooms_seen: usize, doors_seen: usize) -> Result<GroupKind, LoaderError> {
    let classes: Vec<&str> = attrs
        .get("class")
        .map(|value| value.split_whitespace().collect())
        .unwrap_or_default();

    if classes.contains(&ROOM_CLASS) {
        // Label is the token right after the leading class name
        return match classes.get(1) {
            Some(label) => Ok(GroupKind::Room {
                label: label.to_string(),
                index: rooms_seen,
            }),
            None => Err(LoaderError::MissingLabel {
                entity: format!("room #{}", rooms_seen + 1),
            }),
        };
    }

    if classes.contains(&DOOR_CLASS) {
        return Ok(GroupKind::Door { index: doors_seen });
    }

    Ok(GroupKind::Plain)
}

/// Parse a `points` attribute of the form `"x,y x,y ..."`
fn parse_points(entity: &str, raw: &str) -> Result<Vec<Point>, LoaderError> {
    raw.split_whitespace()
        .map(|token| -> Result<Point, LoaderError> {
            let bad = || LoaderError::BadPoint {
                entity: entity.to_string(),
                token: token.to_string(),
            };
            let (x, y) = token.split_once(',').ok_or_else(bad)?;
            let x = x.trim().parse::<f64>().map_err(|_| bad())?;
            let y = y.trim().parse::<f64>().map_err(|_| bad())?;
            Ok(Point::new(x, y))
        })
        .collect()
}

fn dimension(attrs: &Attributes, name: &str) -> Option<f64> {
    attrs
        .get(name)
        .and_then(|value| value.trim().trim_end_matches("px").parse::<f64>().ok())
}

fn finish_group(group: OpenGroup, source: &mut PlanSource) -> Result<(), LoaderError> {
    let entity = group.kind.entity();
    match group.kind {
        GroupKind::Plain => Ok(()),
        GroupKind::Room { label, index } => {
            let vertices = group.vertices.ok_or(LoaderError::MissingPolygon { entity })?;
            source.rooms.push(RawRoom {
                raw_label: label,
                vertices,
                parse_order_index: index,
            });
            Ok(())
        }
        GroupKind::Door { index } => {
            let vertices = group.vertices.ok_or(LoaderError::MissingPolygon { entity })?;
            source.doors.push(RawDoor {
                vertices,
                parse_order_index: index,
            });
            Ok(())
        }
    }
}

/// Extract rooms, doors and drawing size from a CubiCasa-style SVG.
///
/// Room groups carry `Space` in their class list with the raw label as the
/// second token; door groups carry `Threshold`. Each takes the points of the
/// first `<polygon>` nested anywhere inside it. Entities are numbered in the
/// order their group start tags appear.
pub fn parse_svg_plan(content: &str) -> Result<PlanSource, LoaderError> {
    let mut source = PlanSource::default();
    let mut stack: Vec<OpenGroup> = Vec::new();
    let mut seen_root = false;
    let (mut rooms_seen, mut doors_seen) = (0usize, 0usize);

    for event in svg::read(content)? {
        match event {
            Event::Error(error) => return Err(error.into()),
            Event::Tag("svg", Type::Start | Type::Empty, attrs) if !seen_root => {
                seen_root = true;
                source.width = dimension(&attrs, "width");
                source.height = dimension(&attrs, "height");
            }
            Event::Tag("g", Type::Start, attrs) => {
                let kind = classify_group(&attrs, rooms_seen, doors_seen)?;
                match kind {
                    GroupKind::Room { .. } => rooms_seen += 1,
                    GroupKind::Door { .. } => doors_seen += 1,
                    GroupKind::Plain => {}
                }
                stack.push(OpenGroup { kind, vertices: None });
            }
            Event::Tag("g", Type::Empty, attrs) => {
                let kind = classify_group(&attrs, rooms_seen, doors_seen)?;
                if kind.is_entity() {
                    return Err(LoaderError::MissingPolygon { entity: kind.entity() });
                }
            }
            Event::Tag("g", Type::End, _) => {
                let group = stack
                    .pop()
                    .ok_or_else(|| LoaderError::Malformed("unbalanced </g>".to_string()))?;
                finish_group(group, &mut source)?;
            }
            Event::Tag("polygon", Type::Start | Type::Empty, attrs) => {
                for group in stack
                    .iter_mut()
                    .filter(|g| g.kind.is_entity() && g.vertices.is_none())
                {
                    let entity = group.kind.entity();
                    let raw = attrs
                        .get("points")
                        .ok_or_else(|| LoaderError::MissingPolygon { entity: entity.clone() })?;
                    group.vertices = Some(parse_points(&entity, raw)?);
                }
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(LoaderError::Malformed(format!("{} unclosed <g> elements", stack.len())));
    }

    source.rooms.sort_by_key(|r| r.parse_order_index);
    source.doors.sort_by_key(|d| d.parse_order_index);

    debug!(
        "Parsed SVG plan: {} rooms, {} doors, size {:?}x{:?}",
        source.rooms.len(),
        source.doors.len(),
        source.width,
        source.height
    );
    Ok(source)
}

/// Parse a `PlanSource` serialized as JSON
pub fn parse_json_plan(content: &str) -> Result<PlanSource, LoaderError> {
    Ok(serde_json::from_str(content)?)
}

/// Load a plan from disk, choosing the parser from the file extension
pub fn load_plan(path: &Path) -> Result<PlanSource, LoaderError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("svg") => parse_svg_plan(&fs::read_to_string(path)?),
        Some("json") => parse_json_plan(&fs::read_to_string(path)?),
        _ => Err(LoaderError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Location of plan `plan` inside a dataset root
pub fn model_path(root: &Path, plan: usize) -> PathBuf {
    root.join(plan.to_string()).join(MODEL_FILE)
}

/// Finds the dataset root named by `FLOORPLAN_DATASET`
pub fn find_dataset_path() -> Result<PathBuf, LoaderError> {
    let root = std::env::var(DATASET_ENV).map_err(|e| {
        LoaderError::EnvironmentError(format!("{} environment variable not set: {}", DATASET_ENV, e))
    })?;

    let root = PathBuf::from(root);
    if !root.is_dir() {
        return Err(LoaderError::DatasetNotFound(format!(
            "Dataset directory not found at: {}",
            root.display()
        )));
    }

    Ok(root)
}

/// One plan directory of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub plan_id: String,
    pub model_path: PathBuf,
}

impl PlanEntry {
    pub fn load(&self) -> Result<PlanSource, LoaderError> {
        load_plan(&self.model_path)
    }
}

/// Every subdirectory of `root` holding a `model.svg`, numeric names in numeric order
pub fn list_plans(root: &Path) -> Result<Vec<PlanEntry>, LoaderError> {
    if !root.is_dir() {
        return Err(LoaderError::DatasetNotFound(format!(
            "Dataset directory not found at: {}",
            root.display()
        )));
    }

    let mut entries: Vec<PlanEntry> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let model_path = entry.path().join(MODEL_FILE);
            if !model_path.is_file() {
                debug!("Skipping {}: no {}", entry.path().display(), MODEL_FILE);
                return None;
            }
            Some(PlanEntry {
                plan_id: entry.file_name().to_string_lossy().into_owned(),
                model_path,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        let key = |e: &PlanEntry| e.plan_id.parse::<u64>().unwrap_or(u64::MAX);
        key(a).cmp(&key(b)).then_with(|| a.plan_id.cmp(&b.plan_id))
    });

    Ok(entries)
}

/// Dataset iterator with batch loading support
pub struct PlanDataset {
    plans: Vec<PlanEntry>,
    current_index: usize,
}

impl PlanDataset {
    /// Open the dataset named by `FLOORPLAN_DATASET`
    pub fn new() -> Result<Self, LoaderError> {
        Self::from_path(&find_dataset_path()?)
    }

    /// Create a dataset from a custom path
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let plans = list_plans(path)?;
        info!("Found {} plans under {}", plans.len(), path.display());

        Ok(Self {
            plans,
            current_index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Get the next `size` entries
    pub fn batch(&mut self, size: usize) -> Vec<PlanEntry> {
        let end = (self.current_index + size).min(self.plans.len());
        let batch = self.plans[self.current_index..end].to_vec();
        self.current_index = end;
        batch
    }

    /// Reset iterator to beginning
    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    pub fn all(&self) -> &[PlanEntry] {
        &self.plans
    }
}

impl Iterator for PlanDataset {
    type Item = PlanEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.plans.get(self.current_index)?.clone();
        self.current_index += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_graph::{AdjacencyConfig, CategoryTable, FloorPlan, RelationLabel};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300">
  <g id="Model">
    <g class="Wall External"><polygon points="0,0 400,0 400,5 0,5"/></g>
    <g class="Space Kitchen" id="Space_1">
      <polygon points="0,0 100,0 100,100 0,100"/>
      <g class="Dimension"><polygon points="1,1 2,1 2,2"/></g>
    </g>
    <g class="Space LivingRoom">
      <g class="Visual"><polygon points="100,0 200,0 200,100 100,100"/></g>
    </g>
    <g class="Threshold"><polygon points="95,40 105,40 105,60 95,60"/></g>
  </g>
</svg>"#;

    fn entries(n: usize) -> Vec<PlanEntry> {
        (0..n)
            .map(|i| PlanEntry {
                plan_id: i.to_string(),
                model_path: PathBuf::from(format!("/data/{}/model.svg", i)),
            })
            .collect()
    }

    #[test]
    fn test_parse_svg_plan() {
        let source = parse_svg_plan(SAMPLE).unwrap();

        assert_eq!(source.width, Some(400.0));
        assert_eq!(source.height, Some(300.0));
        assert_eq!(source.rooms.len(), 2);
        assert_eq!(source.doors.len(), 1);

        assert_eq!(source.rooms[0].raw_label, "Kitchen");
        assert_eq!(source.rooms[0].parse_order_index, 0);
        // First polygon only; the nested dimension marker is ignored
        assert_eq!(source.rooms[0].vertices.len(), 4);
        assert_eq!(source.rooms[1].raw_label, "LivingRoom");
        assert_eq!(source.rooms[1].vertices[0], Point::new(100.0, 0.0));
        assert_eq!(source.doors[0].vertices[2], Point::new(105.0, 60.0));
    }

    #[test]
    fn test_parsed_plan_analyzes() {
        let source = parse_svg_plan(SAMPLE).unwrap();
        let graph = FloorPlan::from_source(&source, &CategoryTable::default())
            .unwrap()
            .analyze(&AdjacencyConfig::default());

        assert_eq!(
            graph.adjacency_list().label("Kitchen_1", "LivingRoom_1"),
            Some(RelationLabel::Direct)
        );
        assert_eq!(graph.dimensions(), Some((400.0, 300.0)));
    }

    #[test]
    fn test_room_without_polygon() {
        let svg = r#"<svg width="10" height="10"><g class="Space Bath"><text>Bath</text></g></svg>"#;
        assert!(matches!(
            parse_svg_plan(svg),
            Err(LoaderError::MissingPolygon { .. })
        ));

        let svg = r#"<svg><g class="Threshold"/></svg>"#;
        assert!(matches!(
            parse_svg_plan(svg),
            Err(LoaderError::MissingPolygon { .. })
        ));
    }

    #[test]
    fn test_room_without_label() {
        let svg = r#"<svg><g class="Space"><polygon points="0,0 1,0 1,1"/></g></svg>"#;
        assert!(matches!(parse_svg_plan(svg), Err(LoaderError::MissingLabel { .. })));
    }

    #[test]
    fn test_bad_point() {
        let svg = r#"<svg><g class="Space Bath"><polygon points="0,0 1;0 1,1"/></g></svg>"#;
        match parse_svg_plan(svg) {
            Err(LoaderError::BadPoint { token, .. }) => assert_eq!(token, "1;0"),
            other => panic!("expected BadPoint, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_dimensions_stay_unset() {
        let svg = r#"<svg><g class="Space Bath"><polygon points="0,0 10,0 10,10"/></g></svg>"#;
        let source = parse_svg_plan(svg).unwrap();
        assert_eq!(source.width, None);
        assert_eq!(source.rooms.len(), 1);
    }

    #[test]
    fn test_parse_json_plan_defaults() {
        let source = parse_json_plan(
            r#"{"rooms": [{"raw_label": "Bath", "vertices": [{"x": 0, "y": 0}, {"x": 4, "y": 0}, {"x": 4, "y": 4}]}]}"#,
        )
        .unwrap();
        assert_eq!(source.rooms[0].parse_order_index, 0);
        assert!(source.doors.is_empty());
        assert_eq!(source.width, None);

        assert!(matches!(parse_json_plan("{"), Err(LoaderError::JsonError(_))));
    }

    #[test]
    fn test_load_plan_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let svg_path = model_path(dir.path(), 7);
        fs::create_dir_all(svg_path.parent().unwrap()).unwrap();
        fs::write(&svg_path, SAMPLE).unwrap();
        assert_eq!(load_plan(&svg_path).unwrap().rooms.len(), 2);

        let json_path = dir.path().join("plan.JSON");
        fs::write(&json_path, "{}").unwrap();
        assert!(load_plan(&json_path).unwrap().rooms.is_empty());

        let other = dir.path().join("plan.png");
        fs::write(&other, "").unwrap();
        assert!(matches!(load_plan(&other), Err(LoaderError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_model_path() {
        assert_eq!(
            model_path(Path::new("/data/cubicasa"), 12),
            PathBuf::from("/data/cubicasa/12/model.svg")
        );
    }

    #[test]
    fn test_list_plans_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for plan in [10usize, 2, 1] {
            let path = model_path(dir.path(), plan);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, SAMPLE).unwrap();
        }
        fs::create_dir_all(dir.path().join("notes")).unwrap();

        let dataset = PlanDataset::from_path(dir.path()).unwrap();
        let ids: Vec<&str> = dataset.all().iter().map(|e| e.plan_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
        assert_eq!(dataset.all()[0].load().unwrap().doors.len(), 1);
    }

    #[test]
    fn test_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(matches!(
            PlanDataset::from_path(&missing),
            Err(LoaderError::DatasetNotFound(_))
        ));
    }

    #[test]
    fn test_batch_loading() {
        let mut dataset = PlanDataset {
            plans: entries(10),
            current_index: 0,
        };

        let batch1 = dataset.batch(3);
        assert_eq!(batch1.len(), 3);
        assert_eq!(batch1[0].plan_id, "0");

        let batch2 = dataset.batch(3);
        assert_eq!(batch2[0].plan_id, "3");

        assert_eq!(dataset.batch(10).len(), 4);
        assert!(dataset.batch(1).is_empty());

        dataset.reset();
        assert_eq!(dataset.batch(1)[0].plan_id, "0");
    }

    #[test]
    fn test_iterator() {
        let dataset = PlanDataset {
            plans: entries(5),
            current_index: 0,
        };

        let collected: Vec<_> = dataset.take(3).collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[2].plan_id, "2");
    }
}
