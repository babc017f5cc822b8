use serde::{Deserialize, Serialize};
use sim_types::{GenerationRecord, RenderFrame, StatsRecord, WorldConfig, WorldSnapshot};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMetadata {
    pub id: Uuid,
    pub created_at_unix_ms: u128,
    pub config: WorldConfig,
    pub pending_config: Option<WorldConfig>,
    pub running: bool,
    pub ticks_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSessionRequest {
    /// Falls back to `config/default.toml` when absent.
    #[serde(default)]
    pub config: Option<WorldConfig>,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSessionResponse {
    pub metadata: SessionMetadata,
    pub snapshot: WorldSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountRequest {
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestartRequest {
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResponse {
    pub ticks_run: u32,
    pub generations_completed: Vec<GenerationRecord>,
    pub snapshot: WorldSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    pub generation: u32,
    pub timelife: u64,
    pub halted: bool,
    pub history: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationEndedData {
    pub generation: u32,
    pub history: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    Start {
        ticks_per_second: u32,
    },
    Stop,
    Step {
        count: u32,
    },
    Restart {
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Queued until the next generation boundary or restart.
    SetConfig {
        config: WorldConfig,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    StateSnapshot(WorldSnapshot),
    Frame(RenderFrame),
    Stats(StatsRecord),
    GenerationCompleted(GenerationRecord),
    SimulationEnded(SimulationEndedData),
    Error(ApiError),
}
