use sim_types::{
    AgentState, DnaTape, ACT_OPCODE_END, DNA_LENGTH, DNA_RUN_LIMIT, INSTRUCTION_ENERGY_COST,
    JUMP_OPCODE, MAX_ENERGY, TASK_COUNT,
};

/// What a single automaton step decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instruction {
    /// The run limit was hit; cursor and run counter went back to zero.
    Restart,
    Act { task: Task },
    Jump { target: u32 },
    Idle,
}

/// Interaction selected by the gene following an act opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    Stay,
    Forage,
    Neutralize,
    Mate,
    Explore,
}

impl Task {
    pub(crate) fn from_selector(selector: u8) -> Self {
        match selector % TASK_COUNT {
            1 => Task::Forage,
            2..=4 => Task::Neutralize,
            5 => Task::Mate,
            6 | 7 => Task::Explore,
            _ => Task::Stay,
        }
    }
}

/// Secondary read of the gene after `cursor`. Reads past the tape end wrap.
pub(crate) fn operand(tape: &DnaTape, cursor: usize) -> u8 {
    tape[(cursor + 1) % DNA_LENGTH]
}

pub(crate) fn decode(tape: &DnaTape, cursor: usize) -> Instruction {
    let opcode = tape[cursor % DNA_LENGTH];
    if opcode < ACT_OPCODE_END {
        Instruction::Act {
            task: Task::from_selector(operand(tape, cursor)),
        }
    } else if opcode == JUMP_OPCODE {
        Instruction::Jump {
            target: (operand(tape, cursor) as usize % DNA_LENGTH) as u32,
        }
    } else {
        Instruction::Idle
    }
}

/// Adds `delta` to the agent's energy, clamping only the upper bound. The
/// alive flag clears the moment energy reaches zero and is never restored.
pub(crate) fn apply_energy(agent: &mut AgentState, delta: i32) {
    agent.energy = agent.energy.saturating_add(delta).min(MAX_ENERGY);
    if agent.energy <= 0 {
        agent.alive = false;
    }
}

/// Advances the agent's tape by one instruction and charges its cost.
///
/// Act instructions are returned to the caller for resolution against the
/// world; jumps and idles are fully applied here.
pub(crate) fn advance(agent: &mut AgentState) -> Instruction {
    agent.run_counter += 1;
    if agent.run_counter >= DNA_RUN_LIMIT {
        agent.run_counter = 0;
        agent.cursor = 0;
        return Instruction::Restart;
    }

    let cursor = (agent.cursor as usize + 1) % DNA_LENGTH;
    agent.cursor = cursor as u32;

    let instruction = decode(&agent.dna, cursor);
    match instruction {
        Instruction::Act { .. } => apply_energy(agent, -INSTRUCTION_ENERGY_COST),
        Instruction::Jump { target } => {
            agent.cursor = target;
            apply_energy(agent, -INSTRUCTION_ENERGY_COST);
        }
        Instruction::Idle | Instruction::Restart => {}
    }
    instruction
}
