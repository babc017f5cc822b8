use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use sim_core::{SimError, Simulation};
use sim_server::{
    load_default_world_config,
    protocol::{
        ApiError, ClientCommand, CountRequest, CreateSessionRequest, CreateSessionResponse,
        HistoryResponse, RestartRequest, ServerEvent, SessionMetadata, SimulationEndedData,
        StepResponse,
    },
};
use sim_types::{RenderFrame, TickDelta, WorldConfig, WorldSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
}

struct Session {
    id: Uuid,
    created_at_unix_ms: u128,
    simulation: Mutex<Simulation>,
    events: broadcast::Sender<ServerEvent>,
    runtime: Mutex<RuntimeState>,
}

#[derive(Default)]
struct RuntimeState {
    running: bool,
    ticks_per_second: u32,
    runner: Option<JoinHandle<()>>,
}

impl Session {
    async fn metadata(&self) -> SessionMetadata {
        let (config, pending_config) = {
            let sim = self.simulation.lock().await;
            (sim.config().clone(), sim.pending_config().cloned())
        };
        let runtime = self.runtime.lock().await;
        SessionMetadata {
            id: self.id,
            created_at_unix_ms: self.created_at_unix_ms,
            config,
            pending_config,
            running: runtime.running,
            ticks_per_second: runtime.ticks_per_second,
        }
    }

    fn publish(&self, event: ServerEvent) {
        // Send only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }

    /// Broadcasts every finished generation in `deltas` and the stats of
    /// the last tick.
    fn publish_deltas(&self, deltas: &[TickDelta]) {
        for delta in deltas {
            if let Some(record) = delta.generation_end {
                self.publish(ServerEvent::GenerationCompleted(record));
            }
        }
        if let Some(last) = deltas.last() {
            self.publish(ServerEvent::Stats(last.stats));
        }
    }

    fn publish_frame(&self, frame: RenderFrame, ended: Option<SimulationEndedData>) {
        self.publish(ServerEvent::Frame(frame));
        if let Some(ended) = ended {
            self.publish(ServerEvent::SimulationEnded(ended));
        }
    }
}

/// Largest tick count a single step request may ask for.
const MAX_STEP_COUNT: u32 = 100_000;
/// Ticks run per lock acquisition while serving a step request.
const STEP_BATCH_SIZE: u32 = 512;

fn validate_step_count(count: u32) -> Result<u32, AppError> {
    if count > MAX_STEP_COUNT {
        return Err(AppError::BadRequest(format!(
            "step count must be at most {MAX_STEP_COUNT}, got {count}"
        )));
    }
    Ok(count.max(1))
}

fn ended_data(sim: &Simulation) -> Option<SimulationEndedData> {
    sim.is_halted().then(|| SimulationEndedData {
        generation: sim.generation(),
        history: sim.history().to_vec(),
    })
}

fn now_unix_ms() -> Result<u128, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))
        .map(|duration| duration.as_millis())
}

fn load_runtime_default_world_config() -> Result<WorldConfig, AppError> {
    load_default_world_config().map_err(|err| {
        AppError::Internal(format!(
            "failed to load {}: {err:#}",
            sim_server::default_world_config_path().display()
        ))
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug)]
enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(message)
            | AppError::BadRequest(message)
            | AppError::Internal(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let error = ApiError {
            code: code.to_owned(),
            message,
        };

        (status, Json(error)).into_response()
    }
}

impl From<SimError> for AppError {
    fn from(value: SimError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "sim_server=info,sim_core=info,tower_http=info".to_owned()
        }))
        .init();

    let app = build_app(new_state());

    let addr = std::env::var("SIM_SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("sim-server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn new_state() -> AppState {
    AppState {
        sessions: Arc::new(RwLock::new(HashMap::new())),
    }
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/{id}", get(get_session_metadata))
        .route("/v1/sessions/{id}/state", get(get_state))
        .route("/v1/sessions/{id}/frame", get(get_frame))
        .route("/v1/sessions/{id}/history", get(get_history))
        .route("/v1/sessions/{id}/step", post(step_session))
        .route("/v1/sessions/{id}/restart", post(restart_session))
        .route("/v1/sessions/{id}/config", post(queue_session_config))
        .route("/v1/sessions/{id}/stream", get(stream_session))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let config = match req.config {
        Some(config) => config,
        None => load_runtime_default_world_config()?,
    };
    let simulation = Simulation::new(config, req.seed)?;
    let snapshot = simulation.snapshot();
    let ticks_per_second = simulation.config().steps_per_second;

    let id = Uuid::new_v4();
    let (events_tx, _events_rx) = broadcast::channel(1024);
    let session = Arc::new(Session {
        id,
        created_at_unix_ms: now_unix_ms()?,
        simulation: Mutex::new(simulation),
        events: events_tx,
        runtime: Mutex::new(RuntimeState {
            running: false,
            ticks_per_second,
            runner: None,
        }),
    });
    let metadata = session.metadata().await;

    state.sessions.write().await.insert(id, session);
    info!(session = %id, seed = req.seed, "session created");

    Ok(Json(CreateSessionResponse { metadata, snapshot }))
}

async fn get_session_metadata(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionMetadata>, AppError> {
    let session = get_session(&state, id).await?;
    Ok(Json(session.metadata().await))
}

async fn get_state(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WorldSnapshot>, AppError> {
    let session = get_session(&state, id).await?;
    let sim = session.simulation.lock().await;
    Ok(Json(sim.snapshot()))
}

async fn get_frame(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<RenderFrame>, AppError> {
    let session = get_session(&state, id).await?;
    let sim = session.simulation.lock().await;
    Ok(Json(sim.render_frame()))
}

async fn get_history(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = get_session(&state, id).await?;
    let sim = session.simulation.lock().await;
    Ok(Json(HistoryResponse {
        generation: sim.generation(),
        timelife: sim.timelife(),
        halted: sim.is_halted(),
        history: sim.history().to_vec(),
    }))
}

async fn step_session(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<CountRequest>,
) -> Result<Json<StepResponse>, AppError> {
    let count = validate_step_count(req.count)?;
    let session = get_session(&state, id).await?;
    Ok(Json(run_steps(&session, count).await))
}

async fn restart_session(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<RestartRequest>,
) -> Result<Json<WorldSnapshot>, AppError> {
    let session = get_session(&state, id).await?;
    Ok(Json(restart(&session, req.seed).await))
}

async fn queue_session_config(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(config): Json<WorldConfig>,
) -> Result<Json<SessionMetadata>, AppError> {
    let session = get_session(&state, id).await?;
    session.simulation.lock().await.queue_config(config)?;
    info!(session = %id, "configuration queued for next generation");
    Ok(Json(session.metadata().await))
}

/// Runs `count` ticks in batches, releasing the session lock and yielding
/// between batches. Stops early once the simulation halts.
async fn run_steps(session: &Session, count: u32) -> StepResponse {
    let mut ticks_run = 0;
    let mut generations_completed = Vec::new();
    while ticks_run < count {
        let batch = (count - ticks_run).min(STEP_BATCH_SIZE);
        let deltas = session.simulation.lock().await.step_n(batch);
        ticks_run += deltas.len() as u32;
        generations_completed.extend(deltas.iter().filter_map(|delta| delta.generation_end));
        session.publish_deltas(&deltas);

        if (deltas.len() as u32) < batch {
            break;
        }
        tokio::task::yield_now().await;
    }

    let (snapshot, frame, ended) = {
        let sim = session.simulation.lock().await;
        (sim.snapshot(), sim.render_frame(), ended_data(&sim))
    };
    session.publish_frame(frame, ended);
    session.publish(ServerEvent::StateSnapshot(snapshot.clone()));

    StepResponse {
        ticks_run,
        generations_completed,
        snapshot,
    }
}

async fn restart(session: &Session, seed: Option<u64>) -> WorldSnapshot {
    let mut sim = session.simulation.lock().await;
    sim.reset(seed);
    let snapshot = sim.snapshot();
    drop(sim);

    info!(session = %session.id, seed = snapshot.rng_seed, "session restarted");
    session.publish(ServerEvent::StateSnapshot(snapshot.clone()));
    snapshot
}

async fn stream_session(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let session = get_session(&state, id).await?;
    Ok(ws
        .on_upgrade(move |socket| socket_loop(socket, session))
        .into_response())
}

async fn socket_loop(socket: WebSocket, session: Arc<Session>) {
    let mut rx = session.events.subscribe();
    let (mut sender, mut receiver) = socket.split();

    {
        let event = ServerEvent::StateSnapshot(session.simulation.lock().await.snapshot());
        if send_ws_event(&mut sender, &event).await.is_err() {
            return;
        }
    }

    let session_for_send = session.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("ws receiver lagged by {skipped} events; sending state snapshot");
                    let snapshot_event = {
                        let sim = session_for_send.simulation.lock().await;
                        ServerEvent::StateSnapshot(sim.snapshot())
                    };
                    if send_ws_event(&mut sender, &snapshot_event).await.is_err() {
                        break;
                    }
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if send_ws_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let command = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => cmd,
                    Err(err) => {
                        session.publish(ServerEvent::Error(ApiError {
                            code: "bad_command".to_owned(),
                            message: format!("failed to parse command: {err}"),
                        }));
                        continue;
                    }
                };

                if let Err(err) = handle_command(command, session.clone()).await {
                    session.publish(ServerEvent::Error(ApiError {
                        code: "command_error".to_owned(),
                        message: err,
                    }));
                }
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Ping(_)) => {}
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => break,
            Err(err) => {
                error!("ws receive error: {err}");
                break;
            }
        }
    }

    send_task.abort();
}

async fn handle_command(command: ClientCommand, session: Arc<Session>) -> Result<(), String> {
    match command {
        ClientCommand::Start { ticks_per_second } => {
            session_start(session, ticks_per_second.max(1)).await;
            Ok(())
        }
        ClientCommand::Stop => {
            session_stop(&session).await;
            Ok(())
        }
        ClientCommand::Step { count } => {
            let count = validate_step_count(count).map_err(|err| err.to_string())?;
            run_steps(&session, count).await;
            Ok(())
        }
        ClientCommand::Restart { seed } => {
            restart(&session, seed).await;
            Ok(())
        }
        ClientCommand::SetConfig { config } => session
            .simulation
            .lock()
            .await
            .queue_config(config)
            .map_err(|err| err.to_string()),
    }
}

async fn session_start(session: Arc<Session>, ticks_per_second: u32) {
    let mut runtime = session.runtime.lock().await;
    runtime.ticks_per_second = ticks_per_second.max(1);

    if runtime.running {
        return;
    }

    runtime.running = true;
    debug!(session = %session.id, ticks_per_second, "runner started");
    let session_for_task = session.clone();
    runtime.runner = Some(tokio::spawn(async move {
        loop {
            let tps = {
                let rt = session_for_task.runtime.lock().await;
                if !rt.running {
                    break;
                }
                rt.ticks_per_second.max(1)
            };

            let (delta, frame, ended) = {
                let mut sim = session_for_task.simulation.lock().await;
                let delta = sim.step_n(1);
                (delta, sim.render_frame(), ended_data(&sim))
            };
            let halted = ended.is_some();
            session_for_task.publish_deltas(&delta);
            session_for_task.publish_frame(frame, ended);
            if halted {
                info!(session = %session_for_task.id, "simulation ended; runner stopping");
                break;
            }

            tokio::time::sleep(Duration::from_millis((1000_u64 / tps as u64).max(1))).await;
        }

        let mut rt = session_for_task.runtime.lock().await;
        rt.running = false;
        rt.runner = None;
    }));
}

async fn send_ws_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), ()> {
    match serde_json::to_string(event) {
        Ok(text) => sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| ()),
        Err(err) => {
            error!("failed to serialize server event: {err}");
            Ok(())
        }
    }
}

async fn session_stop(session: &Arc<Session>) {
    let mut runtime = session.runtime.lock().await;
    runtime.running = false;
    if let Some(handle) = runtime.runner.take() {
        handle.abort();
    }
}

async fn get_session(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    let sessions = state.sessions.read().await;
    sessions
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("session {id} not found")))
}
