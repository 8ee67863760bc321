use axum::{
    extract::{DefaultBodyLimit, Json, Path, Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use floorplan_loader::parse_svg_plan;
use plan_graph::{
    render_relation_svg, AdjacencyConfig, Canvas, CategoryTable, FloorPlan, PlanGraph, PlanSource, Point,
    Relation, RelationLabel, RoomCategory, RoomPath,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

mod error;

pub use error::{ApiError, ErrorResponse};

// Input limits per request
pub const MAX_ROOMS: usize = 2_000;
pub const MAX_DOORS: usize = 2_000;
/// Recorded paths a single path query may enumerate
pub const MAX_PATHS: usize = 10_000;

const DEFAULT_ORIGINS: &str = "http://localhost:8080,http://127.0.0.1:8080,http://localhost:9090,http://127.0.0.1:9090";

/// An analyzed plan and the summary handed back to clients
#[derive(Debug)]
pub struct StoredPlan {
    pub graph: PlanGraph,
    pub summary: PlanSummary,
}

/// Shared service state: analyzed plans by id and the label table
#[derive(Clone)]
pub struct AppState {
    plans: Arc<RwLock<HashMap<Uuid, Arc<StoredPlan>>>>,
    table: Arc<CategoryTable>,
    path_limit: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CategoryTable::default())
    }
}

impl AppState {
    pub fn new(table: CategoryTable) -> Self {
        Self {
            plans: Arc::default(),
            table: Arc::new(table),
            path_limit: MAX_PATHS,
        }
    }

    /// Override the per-query path enumeration cap
    pub fn with_path_limit(mut self, limit: usize) -> Self {
        self.path_limit = limit;
        self
    }

    pub async fn plan_count(&self) -> usize {
        self.plans.read().await.len()
    }

    async fn plan(&self, id: Uuid) -> Result<Arc<StoredPlan>, ApiError> {
        self.plans
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ApiError::PlanNotFound(id))
    }

    async fn analyze_and_store(
        &self,
        source: PlanSource,
        config: AdjacencyConfig,
    ) -> Result<PlanSummary, ApiError> {
        check_input_size(&source)?;

        let id = Uuid::new_v4();
        let table = Arc::clone(&self.table);
        // Pairwise buffering is quadratic in the room count; keep it off the async workers
        let (graph, summary) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
            let graph = FloorPlan::from_source(&source, &table)?.analyze(&config);
            let summary = PlanSummary::new(id, &graph);
            Ok((graph, summary))
        })
        .await??;

        info!(
            "Stored plan {}: {} rooms, depth {}, {} components",
            id,
            summary.rooms.len(),
            summary.depth,
            summary.component_count
        );

        self.plans
            .write()
            .await
            .insert(id, Arc::new(StoredPlan { graph, summary: summary.clone() }));
        Ok(summary)
    }
}

fn check_input_size(source: &PlanSource) -> Result<(), ApiError> {
    if source.rooms.len() > MAX_ROOMS {
        warn!("Request rejected: too many rooms ({} > {})", source.rooms.len(), MAX_ROOMS);
        return Err(ApiError::InputTooLarge {
            kind: "rooms",
            max: MAX_ROOMS,
            received: source.rooms.len(),
        });
    }
    if source.doors.len() > MAX_DOORS {
        warn!("Request rejected: too many doors ({} > {})", source.doors.len(), MAX_DOORS);
        return Err(ApiError::InputTooLarge {
            kind: "doors",
            max: MAX_DOORS,
            received: source.doors.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: String,
    pub category: RoomCategory,
    pub polygon: Vec<Point>,
    pub centroid: Point,
    pub area: f64,
    pub adjacent_doors: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorSummary {
    pub id: String,
    pub polygon: Vec<Point>,
}

/// What a client learns about an analyzed plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: Uuid,
    pub rooms: Vec<RoomSummary>,
    pub doors: Vec<DoorSummary>,
    pub relations: Vec<Relation>,
    pub adjacency: BTreeMap<String, BTreeMap<String, RelationLabel>>,
    pub depth: usize,
    pub component_count: usize,
}

impl PlanSummary {
    pub fn new(id: Uuid, graph: &PlanGraph) -> Self {
        Self {
            id,
            rooms: graph
                .rooms()
                .iter()
                .map(|room| RoomSummary {
                    id: room.id.clone(),
                    category: room.category,
                    polygon: room.polygon.clone(),
                    centroid: room.centroid,
                    area: room.area(),
                    adjacent_doors: room.adjacent_doors.clone(),
                })
                .collect(),
            doors: graph
                .doors()
                .iter()
                .map(|door| DoorSummary {
                    id: door.id.clone(),
                    polygon: door.polygon.clone(),
                })
                .collect(),
            relations: graph.relations().to_vec(),
            adjacency: graph.adjacency_list().as_map().clone(),
            depth: graph.solver().graph_depth(),
            component_count: graph.component_count(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub source: PlanSource,
    #[serde(default)]
    pub config: AdjacencyConfig,
}

#[derive(Debug, Deserialize)]
pub struct SvgPlanRequest {
    pub svg: String,
    #[serde(default)]
    pub config: AdjacencyConfig,
}

#[derive(Debug, Deserialize)]
pub struct PathsQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    pub from: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathsResponse {
    pub from: String,
    pub to: String,
    /// Rooms crossed, start excluded
    pub hops: usize,
    pub paths: Vec<RoomPath>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathsFromResponse {
    pub from: String,
    pub paths: BTreeMap<String, Vec<RoomPath>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepthResponse {
    pub from: Option<String>,
    pub depth: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub plans: usize,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        plans: state.plan_count().await,
    })
}

async fn create_plan_handler(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanSummary>), ApiError> {
    info!(
        "Received plan with {} rooms and {} doors",
        request.source.rooms.len(),
        request.source.doors.len()
    );
    let summary = state.analyze_and_store(request.source, request.config).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn create_svg_plan_handler(
    State(state): State<AppState>,
    Json(request): Json<SvgPlanRequest>,
) -> Result<(StatusCode, Json<PlanSummary>), ApiError> {
    info!("Received SVG plan ({} bytes)", request.svg.len());
    let source = parse_svg_plan(&request.svg)?;
    let summary = state.analyze_and_store(source, request.config).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_plan_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanSummary>, ApiError> {
    let plan = state.plan(id).await?;
    Ok(Json(plan.summary.clone()))
}

async fn paths_between_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PathsQuery>,
) -> Result<Json<PathsResponse>, ApiError> {
    let plan = state.plan(id).await?;
    let limit = state.path_limit;
    let (from, to) = (query.from.clone(), query.to.clone());
    let paths = tokio::task::spawn_blocking(move || {
        plan.graph.solver().shortest_paths_between_limited(&from, &to, limit)
    })
    .await??;
    let hops = paths.first().map(|p| p.len().saturating_sub(1)).unwrap_or(0);

    Ok(Json(PathsResponse {
        from: query.from,
        to: query.to,
        hops,
        paths,
    }))
}

async fn paths_from_handler(
    State(state): State<AppState>,
    Path((id, from)): Path<(Uuid, String)>,
) -> Result<Json<PathsFromResponse>, ApiError> {
    let plan = state.plan(id).await?;
    let limit = state.path_limit;
    let start = from.clone();
    let paths = tokio::task::spawn_blocking(move || {
        plan.graph.solver().shortest_paths_from_limited(&start, limit)
    })
    .await??;
    Ok(Json(PathsFromResponse { from, paths }))
}

async fn depth_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<DepthResponse>, ApiError> {
    let plan = state.plan(id).await?;
    let solver = plan.graph.solver();
    let depth = match &query.from {
        Some(from) => solver.depth_from(from)?,
        None => solver.graph_depth(),
    };
    Ok(Json(DepthResponse {
        from: query.from,
        depth,
    }))
}

async fn render_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = state.plan(id).await?;
    let document = render_relation_svg(&plan.graph, &state.table, Canvas::for_plan(&plan.graph));
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], document.to_string()))
}

fn cors_layer() -> CorsLayer {
    // Configure CORS from environment or use localhost for development
    let allowed_origins =
        std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());

    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/plans", post(create_plan_handler))
        .route("/plans/svg", post(create_svg_plan_handler))
        .route("/plans/:id", get(get_plan_handler))
        .route("/plans/:id/paths", get(paths_between_handler))
        .route("/plans/:id/paths/:from", get(paths_from_handler))
        .route("/plans/:id/depth", get(depth_handler))
        .route("/plans/:id/render", get(render_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB max for SVG drawings
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
