use svg::node::element::{Circle, Line, Polygon, Rectangle, Text};
use svg::Document;

use crate::adjacency::RelationLabel;
use crate::category::CategoryTable;
use crate::geometry::Point;
use crate::graph::PlanGraph;

const ROOM_STROKE_WIDTH: u32 = 5;
const DOOR_STROKE_WIDTH: u32 = 2;
const RELATION_STROKE_WIDTH: u32 = 3;
const MARKER_RADIUS: u32 = 20;
const LABEL_OFFSET: f64 = 30.0;

/// Output size of a rendered plan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    /// Size reported by the loader, else the extent of all room and door vertices
    pub fn for_plan(graph: &PlanGraph) -> Self {
        if let Some((width, height)) = graph.dimensions() {
            return Self { width, height };
        }

        let (max_x, max_y) = graph
            .rooms()
            .iter()
            .flat_map(|r| r.polygon.iter())
            .chain(graph.doors().iter().flat_map(|d| d.polygon.iter()))
            .fold((0.0_f64, 0.0_f64), |(mx, my), p| (mx.max(p.x), my.max(p.y)));

        Self {
            width: max_x + LABEL_OFFSET,
            height: max_y + LABEL_OFFSET,
        }
    }
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Draw rooms, doors, relation lines and labeled room markers.
///
/// Direct relations are solid grey lines between centroids, door-mediated
/// ones dashed; unrelated pairs are not drawn.
pub fn render_relation_svg(graph: &PlanGraph, table: &CategoryTable, canvas: Canvas) -> Document {
    let mut document = Document::new()
        .set("xmlns:xlink", "http://www.w3.org/1999/xlink")
        .set("width", canvas.width)
        .set("height", canvas.height)
        .add(
            Rectangle::new()
                .set("width", "100%")
                .set("height", "100%")
                .set("fill", "none"),
        );

    for room in graph.rooms() {
        document = document.add(
            Polygon::new()
                .set("points", points_attr(&room.polygon))
                .set("fill", "none")
                .set("stroke", table.color_of(room.category))
                .set("stroke-width", ROOM_STROKE_WIDTH),
        );
    }

    for door in graph.doors() {
        document = document.add(
            Polygon::new()
                .set("points", points_attr(&door.polygon))
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", DOOR_STROKE_WIDTH),
        );
    }

    for relation in graph.relations() {
        let (Some(a), Some(b)) = (graph.room(&relation.room_a), graph.room(&relation.room_b)) else {
            continue;
        };
        let line = Line::new()
            .set("x1", a.centroid.x)
            .set("y1", a.centroid.y)
            .set("x2", b.centroid.x)
            .set("y2", b.centroid.y)
            .set("stroke", "grey")
            .set("stroke-width", RELATION_STROKE_WIDTH);

        document = match relation.label {
            RelationLabel::Unrelated => continue,
            RelationLabel::Direct => document.add(line),
            RelationLabel::ViaDoor => document.add(line.set("stroke-dasharray", "10, 10")),
        };
    }

    for room in graph.rooms() {
        document = document
            .add(
                Circle::new()
                    .set("cx", room.centroid.x)
                    .set("cy", room.centroid.y)
                    .set("r", MARKER_RADIUS)
                    .set("fill", table.color_of(room.category))
                    .set("stroke", "grey")
                    .set("stroke-width", 2),
            )
            .add(
                Text::new(room.id.as_str())
                    .set("x", room.centroid.x - LABEL_OFFSET)
                    .set("y", room.centroid.y - LABEL_OFFSET)
                    .set("font-size", "20px")
                    .set("font-family", "sans-serif"),
            );
    }

    document
}
