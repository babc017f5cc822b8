use super::support::*;
use super::*;

fn world(agents: Vec<AgentState>, resources: &[(i32, i32, ResourceKind)]) -> Simulation {
    let mut sim = Simulation::new(stable_test_config(), 21).expect("simulation should initialize");
    configure_sim(&mut sim, agents, resources);
    sim
}

#[test]
fn forage_consumes_food_and_moves() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &[(6, 5, ResourceKind::Food)],
    );

    let outcome = sim.resolve_interaction(0, Task::Forage, Direction::East);
    assert_eq!(outcome, Interaction::Ate);
    assert_eq!(sim.agents()[0].position(), GridPosition::new(6, 5));
    assert_eq!(sim.agents()[0].energy, 60);
    assert!(sim.resources().is_empty());
}

#[test]
fn forage_is_blocked_by_empty_cells_and_poison() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &[(5, 4, ResourceKind::Poison)],
    );

    assert_eq!(
        sim.resolve_interaction(0, Task::Forage, Direction::South),
        Interaction::Blocked
    );
    assert_eq!(
        sim.resolve_interaction(0, Task::Forage, Direction::North),
        Interaction::Blocked
    );
    assert_eq!(sim.agents()[0].position(), GridPosition::new(5, 5));
    assert_eq!(sim.agents()[0].energy, 50);
    assert_eq!(
        sim.resources().at(GridPosition::new(5, 4)),
        Some(ResourceKind::Poison)
    );
}

#[test]
fn neutralize_turns_poison_into_food_and_moves() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &[(4, 6, ResourceKind::Poison)],
    );

    let outcome = sim.resolve_interaction(0, Task::Neutralize, Direction::SouthWest);
    assert_eq!(outcome, Interaction::Neutralized);
    assert_eq!(sim.agents()[0].position(), GridPosition::new(4, 6));
    assert_eq!(sim.agents()[0].energy, 55);
    assert_eq!(
        sim.resources().at(GridPosition::new(4, 6)),
        Some(ResourceKind::Food)
    );
    assert_eq!(sim.resources().count(ResourceKind::Poison), 0);
}

#[test]
fn neutralize_ignores_food() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &[(5, 6, ResourceKind::Food)],
    );

    assert_eq!(
        sim.resolve_interaction(0, Task::Neutralize, Direction::South),
        Interaction::Blocked
    );
    assert_eq!(sim.agents()[0].position(), GridPosition::new(5, 5));
    assert_eq!(
        sim.resources().at(GridPosition::new(5, 6)),
        Some(ResourceKind::Food)
    );
}

#[test]
fn mate_copies_only_mate_genes_and_marks_lineage() {
    let mut sim = world(
        vec![
            make_agent(0, 5, 5, [1; DNA_LENGTH], 50),
            make_agent(1, 6, 6, [30; DNA_LENGTH], 40),
        ],
        &[],
    );

    let outcome = sim.resolve_interaction(0, Task::Mate, Direction::SouthEast);
    assert_eq!(outcome, Interaction::Mated);
    let agent = &sim.agents()[0];
    assert_eq!(agent.position(), GridPosition::new(6, 6));
    assert_eq!(agent.energy, 55);
    assert!(agent.mated);
    assert_eq!(agent.lineage, Lineage::Mated);
    assert!(agent.dna.iter().all(|gene| *gene == 1 || *gene == 30));

    let mate = &sim.agents()[1];
    assert_eq!(mate.dna, [30; DNA_LENGTH]);
    assert_eq!(mate.energy, 40);
    assert!(!mate.mated);
}

#[test]
fn mate_picks_first_living_occupant_in_population_order() {
    let mut sim = world(
        vec![
            make_agent(0, 5, 5, [1; DNA_LENGTH], 50),
            make_agent(1, 5, 6, [10; DNA_LENGTH], 0),
            make_agent(2, 5, 6, [30; DNA_LENGTH], 40),
            make_agent(3, 5, 6, [12; DNA_LENGTH], 40),
        ],
        &[],
    );

    assert_eq!(
        sim.resolve_interaction(0, Task::Mate, Direction::South),
        Interaction::Mated
    );
    assert!(sim.agents()[0]
        .dna
        .iter()
        .all(|gene| *gene == 1 || *gene == 30));
}

#[test]
fn mate_is_blocked_by_empty_cells_and_corpses() {
    let mut sim = world(
        vec![
            make_agent(0, 5, 5, [1; DNA_LENGTH], 50),
            make_agent(1, 4, 5, [30; DNA_LENGTH], 0),
        ],
        &[],
    );

    assert_eq!(
        sim.resolve_interaction(0, Task::Mate, Direction::West),
        Interaction::Blocked
    );
    assert_eq!(
        sim.resolve_interaction(0, Task::Mate, Direction::East),
        Interaction::Blocked
    );
    let agent = &sim.agents()[0];
    assert_eq!(agent.position(), GridPosition::new(5, 5));
    assert!(!agent.mated);
    assert_eq!(agent.dna, [1; DNA_LENGTH]);
}

#[test]
fn explore_moves_unconditionally_and_leaves_resources() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &[(5, 4, ResourceKind::Poison)],
    );

    let outcome = sim.resolve_interaction(0, Task::Explore, Direction::North);
    assert_eq!(outcome, Interaction::Explored);
    assert_eq!(sim.agents()[0].position(), GridPosition::new(5, 4));
    assert_eq!(sim.agents()[0].energy, 50);
    assert_eq!(
        sim.resources().at(GridPosition::new(5, 4)),
        Some(ResourceKind::Poison)
    );
}

#[test]
fn stay_leaves_agent_and_world_untouched() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &all_neighbors(5, 5, ResourceKind::Food),
    );

    for direction in Direction::ALL {
        assert_eq!(
            sim.resolve_interaction(0, Task::Stay, direction),
            Interaction::Idle
        );
    }
    assert_eq!(sim.agents()[0].position(), GridPosition::new(5, 5));
    assert_eq!(sim.resources().len(), 8);
}

#[test]
fn moves_wrap_across_the_torus_edges() {
    let mut sim = world(vec![make_agent(0, 0, 0, IDLE_TAPE, 50)], &[]);

    sim.resolve_interaction(0, Task::Explore, Direction::NorthWest);
    assert_eq!(sim.agents()[0].position(), GridPosition::new(23, 23));

    sim.resolve_interaction(0, Task::Explore, Direction::SouthEast);
    assert_eq!(sim.agents()[0].position(), GridPosition::new(0, 0));
}

#[test]
fn earlier_moves_in_the_pass_are_visible_to_later_agents() {
    let mut sim = world(
        vec![
            make_agent(0, 1, 1, IDLE_TAPE, 50),
            make_agent(1, 1, 1, [1; DNA_LENGTH], 50),
        ],
        &[],
    );
    sim.resolve_interaction(0, Task::Explore, Direction::East);
    assert_eq!(
        sim.resolve_interaction(1, Task::Mate, Direction::East),
        Interaction::Mated
    );

    let mut sim = world(
        vec![
            make_agent(0, 1, 1, [1; DNA_LENGTH], 50),
            make_agent(1, 1, 1, IDLE_TAPE, 50),
        ],
        &[],
    );
    assert_eq!(
        sim.resolve_interaction(0, Task::Mate, Direction::East),
        Interaction::Blocked
    );
    sim.resolve_interaction(1, Task::Explore, Direction::East);
    assert_eq!(sim.agents()[1].position(), GridPosition::new(2, 1));
}

#[test]
fn placing_on_an_occupied_cell_is_a_no_op() {
    let mut sim = world(
        vec![make_agent(0, 5, 5, IDLE_TAPE, 50)],
        &[(3, 3, ResourceKind::Poison)],
    );
    assert!(!sim
        .resources
        .place(ResourceKind::Food, GridPosition::new(3, 3)));
    assert_eq!(
        sim.resources().at(GridPosition::new(3, 3)),
        Some(ResourceKind::Poison)
    );
}
