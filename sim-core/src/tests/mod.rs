pub(super) use super::*;
pub(super) use crate::automaton::Task;
pub(super) use crate::tick::Interaction;
pub(super) use sim_types::{
    AgentId, AgentState, Direction, DnaTape, GenerationOutcome, GridPosition, Lineage,
    DNA_LENGTH, JUMP_OPCODE, MAX_ENERGY,
};

mod movement_resolution;
mod support;
