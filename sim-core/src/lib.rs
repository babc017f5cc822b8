use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_types::{
    AgentState, AgentView, MetricsSnapshot, RenderFrame, ResourceKind, TickDelta, WorldConfig,
    WorldSnapshot,
};
use std::cmp::Ordering;
use thiserror::Error;

mod automaton;
mod generation;
mod genome;
mod grid;
mod spawn;
mod tick;

#[cfg(test)]
mod tests;

pub use grid::ResourceGrid;

/// Largest grid side accepted; positions are `i32` and scans are linear.
const MAX_FIELD_SIZE: u32 = 65_535;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid world config: {0}")]
    InvalidConfig(String),
}

/// The whole generation state: population, resources, counters and RNG.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: WorldConfig,
    pending_config: Option<WorldConfig>,
    seed: u64,
    rng: ChaCha8Rng,
    next_agent_id: u64,
    agents: Vec<AgentState>,
    resources: ResourceGrid,
    generation: u32,
    timelife: u64,
    ticks: u64,
    history: Vec<u64>,
    halted: bool,
    metrics: MetricsSnapshot,
}

impl Simulation {
    pub fn new(config: WorldConfig, seed: u64) -> Result<Self, SimError> {
        validate_config(&config)?;

        let field_size = config.field_size;
        let mut sim = Self {
            config,
            pending_config: None,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_agent_id: 0,
            agents: Vec::new(),
            resources: ResourceGrid::new(field_size),
            generation: 0,
            timelife: 0,
            ticks: 0,
            history: Vec::new(),
            halted: false,
            metrics: MetricsSnapshot::default(),
        };

        sim.reinitialize();
        sim.refresh_population_metrics();
        Ok(sim)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn pending_config(&self) -> Option<&WorldConfig> {
        self.pending_config.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn timelife(&self) -> u64 {
        self.timelife
    }

    /// Elapsed ticks of every finished generation since the last full
    /// reinitialization, indexed by generation.
    pub fn history(&self) -> &[u64] {
        &self.history
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    pub fn resources(&self) -> &ResourceGrid {
        &self.resources
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.alive).count()
    }

    /// Queues `config` for the next generation boundary or restart.
    pub fn queue_config(&mut self, config: WorldConfig) -> Result<(), SimError> {
        validate_config(&config)?;
        self.pending_config = Some(config);
        Ok(())
    }

    /// Rebuilds the world from scratch, applying any queued configuration.
    /// The RNG is reseeded with `seed`, or the current seed when `None`.
    pub fn reset(&mut self, seed: Option<u64>) {
        self.apply_pending_config();
        self.seed = seed.unwrap_or(self.seed);
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.ticks = 0;
        self.metrics = MetricsSnapshot::default();
        self.reinitialize();
        self.refresh_population_metrics();
    }

    /// Runs up to `count` ticks, stopping early once the simulation halts.
    pub fn step_n(&mut self, count: u32) -> Vec<TickDelta> {
        let mut deltas = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if self.halted {
                break;
            }
            deltas.push(self.tick());
        }
        deltas
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            generation: self.generation,
            timelife: self.timelife,
            rng_seed: self.seed,
            halted: self.halted,
            config: self.config.clone(),
            agents: self.agents.clone(),
            resources: self.resources.cells(),
            history: self.history.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn render_frame(&self) -> RenderFrame {
        RenderFrame {
            generation: self.generation,
            timelife: self.timelife,
            field_size: self.config.field_size,
            resources: self.resources.cells(),
            agents: self.agents.iter().map(AgentView::from).collect(),
        }
    }

    /// Snapshot lines for `ticks` ticks as JSONL, starting with the
    /// current state. Stops early if the simulation halts.
    pub fn export_trace_jsonl(&mut self, ticks: u32) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(
            serde_json::to_string(&self.snapshot())
                .expect("serialize initial snapshot for trace export"),
        );

        for _ in 0..ticks {
            if self.halted {
                break;
            }
            self.tick();
            lines.push(
                serde_json::to_string(&self.snapshot())
                    .expect("serialize tick snapshot for trace export"),
            );
        }
        lines
    }

    fn refresh_population_metrics(&mut self) {
        self.metrics.ticks = self.ticks;
        self.metrics.generation = self.generation;
        self.metrics.timelife = self.timelife;
        self.metrics.agents_alive = self.alive_count() as u32;
        self.metrics.food_count = self.resources.count(ResourceKind::Food) as u32;
        self.metrics.poison_count = self.resources.count(ResourceKind::Poison) as u32;
    }

    fn debug_assert_consistent_state(&self) {
        if cfg!(debug_assertions) {
            let size = self.config.field_size as i32;
            for agent in &self.agents {
                debug_assert!(
                    (0..size).contains(&agent.x) && (0..size).contains(&agent.y),
                    "agent position must remain on the torus",
                );
                debug_assert!(
                    agent.energy <= sim_types::MAX_ENERGY,
                    "energy is clamped to its maximum",
                );
                debug_assert!(
                    agent.energy > 0 || !agent.alive,
                    "agents without energy must be dead",
                );
            }
            debug_assert_eq!(self.resources.field_size(), self.config.field_size);
            debug_assert_eq!(self.history.len(), self.generation as usize);
        }
    }
}

fn validate_config(config: &WorldConfig) -> Result<(), SimError> {
    if config.field_size == 0 {
        return Err(SimError::InvalidConfig(
            "field_size must be greater than zero".to_owned(),
        ));
    }
    if config.field_size > MAX_FIELD_SIZE {
        return Err(SimError::InvalidConfig(format!(
            "field_size must be at most {MAX_FIELD_SIZE}"
        )));
    }
    if config.bots_num == 0 {
        return Err(SimError::InvalidConfig(
            "bots_num must be greater than zero".to_owned(),
        ));
    }
    if config.survivors == 0 {
        return Err(SimError::InvalidConfig(
            "survivors must be greater than zero".to_owned(),
        ));
    }
    if config.bots_num < config.survivors {
        return Err(SimError::InvalidConfig(
            "bots_num must be at least survivors".to_owned(),
        ));
    }
    if config.food_generation == 0 {
        return Err(SimError::InvalidConfig(
            "food_generation must be greater than zero".to_owned(),
        ));
    }
    if config.max_generations == 0 {
        return Err(SimError::InvalidConfig(
            "max_generations must be greater than zero".to_owned(),
        ));
    }
    if config.steps_per_second == 0 {
        return Err(SimError::InvalidConfig(
            "steps_per_second must be greater than zero".to_owned(),
        ));
    }
    Ok(())
}

pub fn compare_snapshots(a: &WorldSnapshot, b: &WorldSnapshot) -> Ordering {
    let snapshot_a = serde_json::to_string(a).expect("serialize snapshot A");
    let snapshot_b = serde_json::to_string(b).expect("serialize snapshot B");
    snapshot_a.cmp(&snapshot_b)
}
