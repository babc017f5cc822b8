use crate::genome::generate_random_genome;
use crate::grid::random_position;
use crate::Simulation;
use sim_types::{AgentId, AgentState, DnaTape, Lineage, ResourceKind, MAX_ENERGY};

impl Simulation {
    /// Replaces the population with `bots_num` founders carrying random tapes.
    pub(crate) fn spawn_initial_population(&mut self) {
        self.agents.clear();
        self.next_agent_id = 0;
        for _ in 0..self.config.bots_num {
            let dna = generate_random_genome(&mut self.rng);
            let agent = self.new_agent(dna, Lineage::Founder);
            self.agents.push(agent);
        }
    }

    /// A fresh agent at a random cell. Agents may share cells.
    pub(crate) fn new_agent(&mut self, dna: DnaTape, lineage: Lineage) -> AgentState {
        let position = random_position(self.config.field_size, &mut self.rng);
        AgentState {
            id: self.alloc_agent_id(),
            x: position.x,
            y: position.y,
            energy: MAX_ENERGY,
            alive: true,
            dna,
            cursor: 0,
            run_counter: 0,
            lineage,
            mated: false,
        }
    }

    /// Clears the grid and attempts `food_limit` then `poison_limit`
    /// random placements. Collisions are skipped, so counts may fall short.
    pub(crate) fn seed_resources(&mut self) {
        self.resources.reset(self.config.field_size);
        for _ in 0..self.config.food_limit {
            self.resources.place_random(ResourceKind::Food, &mut self.rng);
        }
        for _ in 0..self.config.poison_limit {
            self.resources.place_random(ResourceKind::Poison, &mut self.rng);
        }
    }

    fn alloc_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }
}
