use crate::genome::mutate_genome;
use crate::Simulation;
use rand::Rng;
use sim_types::{GenerationOutcome, GenerationRecord, Lineage};
use tracing::{debug, info};

impl Simulation {
    /// Ends the current generation and builds the next one from survivors.
    ///
    /// Survivors are the first `survivors` living agents in population order.
    /// With no survivors the whole world is reinitialized instead.
    pub(crate) fn rollover(&mut self) -> GenerationRecord {
        let finished = self.generation;
        let timelife = self.timelife;
        self.history.push(timelife);

        let survivor_limit = self.config.survivors as usize;
        let survivors: Vec<_> = self
            .agents
            .iter()
            .filter(|agent| agent.alive)
            .take(survivor_limit)
            .map(|agent| (agent.dna, agent.lineage))
            .collect();

        self.apply_pending_config();

        if survivors.is_empty() {
            info!(generation = finished, timelife, "population went extinct; reinitializing");
            self.reinitialize();
            self.metrics.total_extinctions += 1;
            return GenerationRecord {
                generation: finished,
                timelife,
                outcome: GenerationOutcome::Extinction,
            };
        }

        let clones_per_survivor = (self.config.bots_num / self.config.survivors) as usize;
        let mut next_agents = Vec::with_capacity(survivors.len() * clones_per_survivor);
        for (dna, lineage) in &survivors {
            for _ in 0..clones_per_survivor {
                next_agents.push(self.new_agent(*dna, *lineage));
            }
        }

        if !next_agents.is_empty() {
            for _ in 0..self.config.mutation_events {
                let idx = self.rng.random_range(0..next_agents.len());
                let agent = &mut next_agents[idx];
                mutate_genome(&mut agent.dna, self.config.mutation_genes, &mut self.rng);
                agent.lineage = Lineage::Mutant;
            }
        }

        self.agents = next_agents;
        self.seed_resources();
        self.timelife = 0;
        self.generation += 1;
        self.metrics.total_rollovers += 1;

        debug!(
            generation = finished,
            timelife,
            survivors = survivors.len(),
            population = self.agents.len(),
            "generation rolled over"
        );

        if self.generation >= self.config.max_generations {
            self.halted = true;
            info!(
                generations = self.generation,
                "maximum generation count reached; simulation halted"
            );
        }

        GenerationRecord {
            generation: finished,
            timelife,
            outcome: GenerationOutcome::Rollover,
        }
    }

    /// Fresh random population and resources, generation 0, empty history.
    pub(crate) fn reinitialize(&mut self) {
        self.spawn_initial_population();
        self.seed_resources();
        self.generation = 0;
        self.timelife = 0;
        self.history.clear();
        self.halted = false;
    }

    pub(crate) fn apply_pending_config(&mut self) {
        if let Some(config) = self.pending_config.take() {
            debug!(?config, "applying queued configuration");
            self.config = config;
        }
    }
}
