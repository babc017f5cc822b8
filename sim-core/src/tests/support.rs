use super::*;

/// Tape whose every gene is an idle opcode.
pub(super) const IDLE_TAPE: DnaTape = [31; DNA_LENGTH];

/// Config with no initial resources and regeneration effectively off.
pub(super) fn test_config(field_size: u32, bots_num: u32) -> WorldConfig {
    WorldConfig {
        field_size,
        bots_num,
        food_limit: 0,
        poison_limit: 0,
        food_generation: u32::MAX,
        max_generations: 1_000,
        steps_per_second: 30,
        survivors: 2,
        mutation_events: 1,
        mutation_genes: 2,
    }
}

pub(super) fn stable_test_config() -> WorldConfig {
    test_config(24, 8)
}

/// Tape that acts with the same task selector on every gene.
pub(super) fn task_tape(selector: u8) -> DnaTape {
    assert!(selector < 20, "selector must also be an act opcode");
    [selector; DNA_LENGTH]
}

pub(super) fn make_agent(id: u64, x: i32, y: i32, dna: DnaTape, energy: i32) -> AgentState {
    AgentState {
        id: AgentId(id),
        x,
        y,
        energy,
        alive: energy > 0,
        dna,
        cursor: 0,
        run_counter: 0,
        lineage: Lineage::Founder,
        mated: false,
    }
}

/// Idle agents parked on row `y` starting at column `first_x`, used to keep
/// the living count above the survivor threshold.
pub(super) fn idle_crowd(first_id: u64, count: u32, y: i32, first_x: i32) -> Vec<AgentState> {
    (0..count)
        .map(|offset| {
            make_agent(
                first_id + u64::from(offset),
                first_x + offset as i32,
                y,
                IDLE_TAPE,
                MAX_ENERGY,
            )
        })
        .collect()
}

pub(super) fn configure_sim(
    sim: &mut Simulation,
    agents: Vec<AgentState>,
    resources: &[(i32, i32, ResourceKind)],
) {
    sim.next_agent_id = agents.iter().map(|agent| agent.id.0 + 1).max().unwrap_or(0);
    sim.agents = agents;
    sim.resources.reset(sim.config.field_size);
    for &(x, y, kind) in resources {
        sim.resources.place(kind, GridPosition::new(x, y));
    }
    sim.generation = 0;
    sim.timelife = 0;
    sim.history.clear();
    sim.halted = false;
    sim.refresh_population_metrics();
}

pub(super) fn tick_once(sim: &mut Simulation) -> TickDelta {
    sim.step_n(1)
        .into_iter()
        .next()
        .expect("a running simulation yields one delta per tick")
}

/// Marks every agent past the first `keep` as dead.
pub(super) fn kill_all_but(sim: &mut Simulation, keep: usize) {
    for agent in sim.agents.iter_mut().skip(keep) {
        agent.energy = 0;
        agent.alive = false;
    }
}

pub(super) fn all_neighbors(x: i32, y: i32, kind: ResourceKind) -> Vec<(i32, i32, ResourceKind)> {
    Direction::ALL
        .iter()
        .map(|direction| {
            let (dx, dy) = direction.offset();
            (x + dx, y + dy, kind)
        })
        .collect()
}
