use serde::{Deserialize, Serialize};

/// Number of opcodes on every DNA tape.
pub const DNA_LENGTH: usize = 32;
/// Opcodes are drawn from `0..DNA_COMMANDS`.
pub const DNA_COMMANDS: u8 = 32;
/// Instructions executed before the tape scan is forced back to the start.
pub const DNA_RUN_LIMIT: u32 = 20;
/// Opcodes below this value are act instructions.
pub const ACT_OPCODE_END: u8 = 20;
pub const JUMP_OPCODE: u8 = 20;
/// Act instructions select one of this many tasks.
pub const TASK_COUNT: u8 = 10;

pub const MAX_ENERGY: i32 = 99;
pub const INSTRUCTION_ENERGY_COST: i32 = 1;
pub const FOOD_ENERGY: i32 = 10;
pub const NEUTRALIZE_ENERGY: i32 = 5;
pub const MATE_ENERGY: i32 = 5;
/// Per-gene chance of inheriting the mate's opcode during crossover.
pub const MATE_GENE_CHANCE: f64 = 0.2;

pub type DnaTape = [u8; DNA_LENGTH];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wraps both coordinates onto a torus of side `field_size`.
    pub fn wrapped(self, field_size: u32) -> Self {
        let size = field_size.max(1) as i32;
        Self {
            x: self.x.rem_euclid(size),
            y: self.y.rem_euclid(size),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Food,
    Poison,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Lineage {
    #[default]
    Founder,
    Mutant,
    Mated,
}

/// Compass directions, `y` grows southward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldConfig {
    pub field_size: u32,
    pub bots_num: u32,
    pub food_limit: u32,
    pub poison_limit: u32,
    pub food_generation: u32,
    pub max_generations: u32,
    #[serde(default = "default_steps_per_second")]
    pub steps_per_second: u32,
    #[serde(default = "default_survivors")]
    pub survivors: u32,
    #[serde(default = "default_mutation_events")]
    pub mutation_events: u32,
    #[serde(default = "default_mutation_genes")]
    pub mutation_genes: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        default_world_config()
    }
}

pub fn world_config_from_toml_str(raw: &str) -> Result<WorldConfig, toml::de::Error> {
    toml::from_str(raw)
}

fn default_world_config() -> WorldConfig {
    world_config_from_toml_str(include_str!("../../config/default.toml"))
        .expect("default world config TOML must deserialize")
}

fn default_steps_per_second() -> u32 {
    30
}

fn default_survivors() -> u32 {
    2
}

fn default_mutation_events() -> u32 {
    1
}

fn default_mutation_genes() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub id: AgentId,
    pub x: i32,
    pub y: i32,
    pub energy: i32,
    pub alive: bool,
    pub dna: DnaTape,
    pub cursor: u32,
    pub run_counter: u32,
    pub lineage: Lineage,
    #[serde(default)]
    pub mated: bool,
}

impl AgentState {
    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceCell {
    pub x: i32,
    pub y: i32,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentView {
    pub id: AgentId,
    pub x: i32,
    pub y: i32,
    pub energy: i32,
    pub lineage: Lineage,
    pub alive: bool,
}

impl From<&AgentState> for AgentView {
    fn from(agent: &AgentState) -> Self {
        Self {
            id: agent.id,
            x: agent.x,
            y: agent.y,
            energy: agent.energy,
            lineage: agent.lineage,
            alive: agent.alive,
        }
    }
}

/// Everything a grid renderer needs for one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderFrame {
    pub generation: u32,
    pub timelife: u64,
    pub field_size: u32,
    pub resources: Vec<ResourceCell>,
    pub agents: Vec<AgentView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StatsRecord {
    pub generation: u32,
    pub alive: u32,
    pub timelife: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Survivors were cloned into the next generation.
    Rollover,
    /// Nobody survived; the world was reinitialized from scratch.
    Extinction,
}

/// A finished generation, as appended to the history series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRecord {
    pub generation: u32,
    pub timelife: u64,
    pub outcome: GenerationOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub generation: u32,
    pub timelife: u64,
    pub agents_alive: u32,
    pub food_count: u32,
    pub poison_count: u32,
    pub instructions_last_tick: u64,
    pub meals_last_tick: u64,
    pub neutralizations_last_tick: u64,
    pub matings_last_tick: u64,
    pub deaths_last_tick: u64,
    pub total_rollovers: u64,
    pub total_extinctions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TickDelta {
    pub stats: StatsRecord,
    pub generation_end: Option<GenerationRecord>,
    pub halted: bool,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub generation: u32,
    pub timelife: u64,
    pub rng_seed: u64,
    pub halted: bool,
    pub config: WorldConfig,
    pub agents: Vec<AgentState>,
    pub resources: Vec<ResourceCell>,
    pub history: Vec<u64>,
    pub metrics: MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let cfg = WorldConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize config");
        let parsed: WorldConfig = serde_json::from_str(&json).expect("deserialize config");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn default_config_matches_shipped_defaults() {
        let cfg = WorldConfig::default();
        assert_eq!(cfg.field_size, 24);
        assert_eq!(cfg.bots_num, 8);
        assert_eq!(cfg.food_limit, 100);
        assert_eq!(cfg.poison_limit, 0);
        assert_eq!(cfg.food_generation, 200);
        assert_eq!(cfg.survivors, 2);
        assert_eq!(cfg.mutation_events, 1);
        assert_eq!(cfg.mutation_genes, 2);
    }

    #[test]
    fn engine_tuning_keys_fall_back_to_defaults() {
        let cfg = world_config_from_toml_str(
            "field_size = 10\nbots_num = 4\nfood_limit = 5\npoison_limit = 5\nfood_generation = 3\nmax_generations = 7\n",
        )
        .expect("parse partial config");
        assert_eq!(cfg.field_size, 10);
        assert_eq!(cfg.survivors, 2);
        assert_eq!(cfg.mutation_events, 1);
        assert_eq!(cfg.mutation_genes, 2);
        assert_eq!(cfg.steps_per_second, 30);
    }

    #[test]
    fn wrapped_positions_stay_on_the_torus() {
        assert_eq!(GridPosition::new(-1, 24).wrapped(24), GridPosition::new(23, 0));
        assert_eq!(GridPosition::new(-25, 49).wrapped(24), GridPosition::new(23, 1));
        assert_eq!(GridPosition::new(5, 5).wrapped(24), GridPosition::new(5, 5));
    }

    #[test]
    fn agent_state_roundtrips_with_full_tape() {
        let agent = AgentState {
            id: AgentId(3),
            x: 1,
            y: 2,
            energy: 99,
            alive: true,
            dna: [7; DNA_LENGTH],
            cursor: 31,
            run_counter: 4,
            lineage: Lineage::Mutant,
            mated: false,
        };
        let json = serde_json::to_string(&agent).expect("serialize agent");
        let parsed: AgentState = serde_json::from_str(&json).expect("deserialize agent");
        assert_eq!(parsed, agent);
        assert_eq!(parsed.dna.len(), DNA_LENGTH);
    }
}
