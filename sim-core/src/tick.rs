use crate::automaton::{advance, apply_energy, Instruction, Task};
use crate::genome::blend_from_mate;
use crate::grid::{neighbor, random_direction};
use crate::Simulation;
use rand::Rng;
use sim_types::{
    AgentState, Direction, GridPosition, Lineage, ResourceKind, StatsRecord, TickDelta, FOOD_ENERGY,
    MATE_ENERGY, NEUTRALIZE_ENERGY,
};

const STEP_DISTANCE: i32 = 1;

/// Result of resolving one act instruction against the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interaction {
    /// Task 0, 8 or 9: the agent stays put.
    Idle,
    /// The candidate cell did not hold what the task needs.
    Blocked,
    Ate,
    Neutralized,
    Mated,
    Explored,
}

#[derive(Default)]
struct TickCounters {
    instructions: u64,
    meals: u64,
    neutralizations: u64,
    matings: u64,
    deaths: u64,
}

impl TickCounters {
    fn record(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Ate => self.meals += 1,
            Interaction::Neutralized => self.neutralizations += 1,
            Interaction::Mated => self.matings += 1,
            Interaction::Idle | Interaction::Blocked | Interaction::Explored => {}
        }
    }
}

impl Simulation {
    pub(crate) fn tick(&mut self) -> TickDelta {
        if self.halted {
            return self.frozen_delta();
        }

        let mut counters = TickCounters::default();
        for idx in 0..self.agents.len() {
            if !self.agents[idx].alive {
                continue;
            }
            self.step_agent(idx, &mut counters);
            if !self.agents[idx].alive {
                counters.deaths += 1;
            }
        }

        self.regenerate_resources();
        self.timelife += 1;
        self.ticks += 1;

        let stats = StatsRecord {
            generation: self.generation,
            alive: self.alive_count() as u32,
            timelife: self.timelife,
        };

        let generation_end = if stats.alive <= self.config.survivors {
            Some(self.rollover())
        } else {
            None
        };

        self.metrics.instructions_last_tick = counters.instructions;
        self.metrics.meals_last_tick = counters.meals;
        self.metrics.neutralizations_last_tick = counters.neutralizations;
        self.metrics.matings_last_tick = counters.matings;
        self.metrics.deaths_last_tick = counters.deaths;
        self.refresh_population_metrics();
        self.debug_assert_consistent_state();

        TickDelta {
            stats,
            generation_end,
            halted: self.halted,
            metrics: self.metrics.clone(),
        }
    }

    fn step_agent(&mut self, idx: usize, counters: &mut TickCounters) {
        let instruction = advance(&mut self.agents[idx]);
        if !matches!(instruction, Instruction::Restart) {
            counters.instructions += 1;
        }

        let Instruction::Act { task } = instruction else {
            return;
        };

        // Resolves even when the act cost was fatal; liveness is only
        // checked before the step.
        let direction = random_direction(&mut self.rng);
        let interaction = self.resolve_interaction(idx, task, direction);
        counters.record(interaction);
    }

    /// Applies `task` for agent `idx` against the cell one step in
    /// `direction`. Every branch is exclusive; a mismatch leaves the agent
    /// in place with its act cost already paid.
    pub(crate) fn resolve_interaction(
        &mut self,
        idx: usize,
        task: Task,
        direction: Direction,
    ) -> Interaction {
        let field_size = self.config.field_size;
        let origin = self.agents[idx].position();
        let candidate = neighbor(origin, direction, STEP_DISTANCE, field_size);

        match task {
            Task::Stay => Interaction::Idle,
            Task::Forage => {
                if self.resources.at(candidate) != Some(ResourceKind::Food) {
                    return Interaction::Blocked;
                }
                self.resources.remove(candidate);
                let agent = &mut self.agents[idx];
                move_to(agent, candidate);
                apply_energy(agent, FOOD_ENERGY);
                Interaction::Ate
            }
            Task::Neutralize => {
                if self.resources.at(candidate) != Some(ResourceKind::Poison) {
                    return Interaction::Blocked;
                }
                self.resources.remove(candidate);
                self.resources.place(ResourceKind::Food, candidate);
                let agent = &mut self.agents[idx];
                move_to(agent, candidate);
                apply_energy(agent, NEUTRALIZE_ENERGY);
                Interaction::Neutralized
            }
            Task::Mate => {
                let Some(mate_idx) = self.find_mate(idx, candidate) else {
                    return Interaction::Blocked;
                };
                let mate_dna = self.agents[mate_idx].dna;
                let agent = &mut self.agents[idx];
                move_to(agent, candidate);
                apply_energy(agent, MATE_ENERGY);
                agent.mated = true;
                agent.lineage = Lineage::Mated;
                blend_from_mate(&mut agent.dna, &mate_dna, &mut self.rng);
                Interaction::Mated
            }
            Task::Explore => {
                move_to(&mut self.agents[idx], candidate);
                Interaction::Explored
            }
        }
    }

    /// First living agent other than `idx` standing on `position`, in
    /// population order.
    fn find_mate(&self, idx: usize, position: GridPosition) -> Option<usize> {
        self.agents
            .iter()
            .enumerate()
            .find(|(other, agent)| *other != idx && agent.alive && agent.position() == position)
            .map(|(other, _)| other)
    }

    fn regenerate_resources(&mut self) {
        let chance = 1.0 / f64::from(self.config.food_generation);
        if !self.rng.random_bool(chance) {
            return;
        }
        let kind = if self.rng.random_bool(0.5) {
            ResourceKind::Food
        } else {
            ResourceKind::Poison
        };
        self.resources.place_random(kind, &mut self.rng);
    }

    fn frozen_delta(&self) -> TickDelta {
        TickDelta {
            stats: StatsRecord {
                generation: self.generation,
                alive: self.alive_count() as u32,
                timelife: self.timelife,
            },
            generation_end: None,
            halted: true,
            metrics: self.metrics.clone(),
        }
    }
}

fn move_to(agent: &mut AgentState, position: GridPosition) {
    agent.x = position.x;
    agent.y = position.y;
}
