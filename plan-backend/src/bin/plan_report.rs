use anyhow::Context;
use floorplan_loader::{PlanDataset, PlanEntry};
use plan_graph::{render_relation_svg, AdjacencyConfig, Canvas, CategoryTable, FloorPlan, PlanGraph};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One line of relations.csv
#[derive(Debug, Serialize)]
struct RelationRow<'a> {
    plan: &'a str,
    room_a: &'a str,
    label: u8,
    room_b: &'a str,
}

fn analyze_entry(entry: &PlanEntry, table: &CategoryTable, config: &AdjacencyConfig) -> anyhow::Result<PlanGraph> {
    let source = entry
        .load()
        .with_context(|| format!("failed to load {}", entry.model_path.display()))?;
    let plan = FloorPlan::from_source(&source, table)
        .with_context(|| format!("failed to build plan {}", entry.plan_id))?;
    Ok(plan.analyze(config))
}

fn write_plan<W: std::io::Write>(
    entry: &PlanEntry,
    graph: &PlanGraph,
    table: &CategoryTable,
    relations: &mut csv::Writer<W>,
    output: &Path,
) -> anyhow::Result<()> {
    for relation in graph.relations() {
        relations.serialize(RelationRow {
            plan: &entry.plan_id,
            room_a: &relation.room_a,
            label: relation.label.into(),
            room_b: &relation.room_b,
        })?;
    }

    let document = render_relation_svg(graph, table, Canvas::for_plan(graph));
    let svg_path = output.join(format!("{}.svg", entry.plan_id));
    svg::save(&svg_path, &document).with_context(|| format!("failed to write {}", svg_path.display()))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let output = PathBuf::from(std::env::var("REPORT_OUTPUT").unwrap_or_else(|_| "plan-report".to_string()));
    let sample_size = match std::env::var("SAMPLE_SIZE") {
        Ok(value) => Some(
            value
                .parse::<usize>()
                .with_context(|| format!("SAMPLE_SIZE must be a number, got {:?}", value))?,
        ),
        Err(_) => None,
    };

    let dataset = PlanDataset::new().context("failed to open dataset")?;
    let total = sample_size.unwrap_or(dataset.len()).min(dataset.len());
    info!("Reporting on {} of {} plans into {}", total, dataset.len(), output.display());

    fs::create_dir_all(&output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut relations = csv::Writer::from_path(output.join("relations.csv"))?;

    let table = CategoryTable::default();
    let config = AdjacencyConfig::default();
    let (mut written, mut failed) = (0usize, 0usize);

    for entry in dataset.take(total) {
        let result = analyze_entry(&entry, &table, &config).and_then(|graph| {
            write_plan(&entry, &graph, &table, &mut relations, &output)?;
            Ok(graph.solver().graph_depth())
        });

        match result {
            Ok(depth) => {
                info!("Plan {}: depth {}", entry.plan_id, depth);
                written += 1;
            }
            Err(e) => {
                warn!("Plan {} skipped: {:#}", entry.plan_id, e);
                failed += 1;
            }
        }
    }

    relations.flush()?;
    info!("Done: {} plans written, {} failed", written, failed);
    Ok(())
}
