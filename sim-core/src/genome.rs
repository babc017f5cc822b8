use rand::Rng;
use sim_types::{DnaTape, DNA_COMMANDS, DNA_LENGTH, MATE_GENE_CHANCE};

pub(crate) fn random_opcode<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(0..DNA_COMMANDS)
}

pub(crate) fn generate_random_genome<R: Rng + ?Sized>(rng: &mut R) -> DnaTape {
    let mut tape = [0; DNA_LENGTH];
    for gene in &mut tape {
        *gene = random_opcode(rng);
    }
    tape
}

/// Overwrites `gene_writes` independently chosen positions with fresh opcodes.
/// Positions may repeat. Returns the positions written, in order.
pub(crate) fn mutate_genome<R: Rng + ?Sized>(
    tape: &mut DnaTape,
    gene_writes: u32,
    rng: &mut R,
) -> Vec<usize> {
    let mut written = Vec::with_capacity(gene_writes as usize);
    for _ in 0..gene_writes {
        let idx = rng.random_range(0..DNA_LENGTH);
        tape[idx] = random_opcode(rng);
        written.push(idx);
    }
    written
}

/// One-directional crossover: every gene of `tape` independently takes the
/// mate's opcode with probability `MATE_GENE_CHANCE`.
pub(crate) fn blend_from_mate<R: Rng + ?Sized>(
    tape: &mut DnaTape,
    mate: &DnaTape,
    rng: &mut R,
) -> usize {
    let mut copied = 0;
    for (gene, mate_gene) in tape.iter_mut().zip(mate.iter()) {
        if rng.random_bool(MATE_GENE_CHANCE) {
            *gene = *mate_gene;
            copied += 1;
        }
    }
    copied
}
