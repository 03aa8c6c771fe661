use fixedbitset::FixedBitSet;
use std::collections::{BTreeMap, BTreeSet};
use wave_collapse::{
    Catalog, Cell, Event, Field, HistoryEntry, Neighbour, Snapshot, Solver, SolverError, Step,
    Tile,
};

type Pair = Catalog<&'static str, char, char>;

fn opposite(slot: &char) -> char {
    if *slot == 'e' { 'w' } else { 'e' }
}

/// Feeds the given draws in order, then zeros.
fn scripted(draws: &[f64]) -> impl FnMut() -> f64 + 'static {
    let mut draws = draws.to_vec().into_iter();
    move || draws.next().unwrap_or(0.0)
}

/// `a` sees `b` to its east; `b` sees `a` to its west.
fn side_by_side(id: &u8) -> Vec<(char, Neighbour<u8>)> {
    match id {
        0 => vec![('e', Neighbour::Cell(1))],
        _ => vec![('w', Neighbour::Cell(0))],
    }
}

/// A tile that accepts nothing on either side.
fn loner(id: &'static str) -> Tile<&'static str, char, char> {
    Tile::new(
        id,
        BTreeMap::from([('e', 'x'), ('w', 'x')]),
        BTreeMap::from([('e', BTreeSet::from(['q'])), ('w', BTreeSet::from(['q']))]),
    )
}

/// Shows `socket` on both sides and plugs `plugs` on both sides.
fn plugged(id: &'static str, socket: char, plugs: &[char]) -> Tile<&'static str, char, char> {
    let plugs: BTreeSet<char> = plugs.iter().copied().collect();
    Tile::new(
        id,
        BTreeMap::from([('e', socket), ('w', socket)]),
        BTreeMap::from([('e', plugs.clone()), ('w', plugs)]),
    )
}

fn drain(solver: &mut Solver<'_, u8, &'static str, char, char>) -> Vec<Event<u8>> {
    solver
        .by_ref()
        .map(|snapshot| snapshot.unwrap().event)
        .collect()
}

#[test]
fn test_single_boundary_cell_needs_no_propagation() {
    let catalog: Pair = Catalog::new([Tile::simple("edge", &['n'], ['b'])]).unwrap();
    let mut solver = Solver::builder(&catalog)
        .field(Field::new([Cell::new(0u8, ['n'], catalog.all())]))
        .adjacent_cells(|_: &u8| vec![('n', Neighbour::Boundary)])
        .matching_slot(|_: &char| 'n')
        .boundary_socket('b')
        .seed(3)
        .build()
        .unwrap();

    let step = solver.step().unwrap();
    assert!(step.is_done());
    assert_eq!(step.snapshot().field.resolve(&catalog)[&0u8], "edge");
    assert_eq!(solver.stats().updates, 0);
}

#[test]
fn test_single_boundary_cell_collapses_once() {
    let catalog: Pair = Catalog::new([
        Tile::simple("plain", &['n'], ['b']),
        Tile::simple("fancy", &['n'], ['b']),
        Tile::simple("inner", &['n'], ['i']),
    ])
    .unwrap();
    let mut solver = Solver::builder(&catalog)
        .field(Field::new([Cell::new(0u8, ['n'], catalog.all())]))
        .adjacent_cells(|_: &u8| vec![('n', Neighbour::Boundary)])
        .matching_slot(|_: &char| 'n')
        .boundary_socket('b')
        .random_source(scripted(&[0.0, 0.75]))
        .build()
        .unwrap();
    assert_eq!(solver.field()[&0].count(), 2);

    let events = drain(&mut solver);
    assert_eq!(
        events,
        vec![Event::Collapsed { cell: 0, tile: 1 }, Event::Finished]
    );
    assert!(solver.field()[&0].is_observed());
}

#[test]
fn test_line_propagates_first_choice() {
    let catalog: Pair = Catalog::new([
        Tile::simple("one", &['e', 'w'], ['1', '1']),
        Tile::simple("two", &['e', 'w'], ['2', '2']),
    ])
    .unwrap();

    for (draw, tile) in [(0.1, 0), (0.9, 1)] {
        let field = Field::new((0..3u8).map(|id| Cell::new(id, ['e', 'w'], catalog.all())));
        let mut solver = Solver::builder(&catalog)
            .field(field)
            .adjacent_cells(|id: &u8| {
                let mut neighbours = Vec::new();
                if *id > 0 {
                    neighbours.push(('w', Neighbour::Cell(id - 1)));
                }
                if *id < 2 {
                    neighbours.push(('e', Neighbour::Cell(id + 1)));
                }
                neighbours
            })
            .matching_slot(opposite)
            .boundary_socket('1')
            // Jitter makes the first cell the lowest, then the choice draw.
            .random_source(scripted(&[0.0, 0.5, 0.5, draw]))
            .build()
            .unwrap();

        let events = drain(&mut solver);
        assert_eq!(
            events,
            vec![
                Event::Collapsed { cell: 0, tile },
                Event::Updated { source: 0, cell: 1 },
                Event::Updated { source: 1, cell: 2 },
                Event::Finished,
            ]
        );
        let assignment = solver.field().assignment();
        assert!(assignment.values().all(|&chosen| chosen == tile));
        assert!(!solver.field()[&2].is_observed());
    }
}

#[test]
fn test_contradiction_rolls_back_and_retries() {
    let catalog: Pair = Catalog::new([
        loner("x"),
        Tile::simple("y", &['e', 'w'], ['y', 'y']),
    ])
    .unwrap();
    let field = Field::new((0..2u8).map(|id| Cell::new(id, ['e', 'w'], catalog.all())));
    let mut solver = Solver::builder(&catalog)
        .field(field)
        .adjacent_cells(side_by_side)
        .matching_slot(opposite)
        .boundary_socket('y')
        .random_source(scripted(&[0.0, 0.5, 0.0]))
        .build()
        .unwrap();

    assert_eq!(
        solver.step().unwrap().into_snapshot().event,
        Event::Collapsed { cell: 0, tile: 0 }
    );
    assert_eq!(
        solver.step().unwrap().into_snapshot().event,
        Event::RolledBack { cell: 0 }
    );
    assert!(solver.history().is_empty());
    assert_eq!(solver.field()[&0].count(), 2);

    assert_eq!(
        solver.step().unwrap().into_snapshot().event,
        Event::Collapsed { cell: 0, tile: 1 }
    );
    let Some(HistoryEntry::Collapse(entry)) = solver.history().last() else {
        panic!("retry should be recorded as a collapse");
    };
    assert_eq!(entry.tried.ones().collect::<Vec<_>>(), vec![0, 1]);

    let done = solver.run().unwrap();
    assert_eq!(done.field.resolve(&catalog), BTreeMap::from([(0, "y"), (1, "y")]));
    let stats = solver.stats();
    assert_eq!((stats.collapses, stats.updates, stats.rollbacks), (2, 1, 1));
}

#[test]
fn test_forced_seed_without_alternative_is_fatal() {
    let catalog: Pair = Catalog::new([loner("only"), loner("other")]).unwrap();
    let seed = catalog.tile_set(&["only"]).unwrap();
    let field = Field::new([
        Cell::new(0u8, ['e', 'w'], seed),
        Cell::new(1u8, ['e', 'w'], catalog.all()),
    ]);
    let mut solver = Solver::builder(&catalog)
        .field(field)
        .adjacent_cells(side_by_side)
        .matching_slot(opposite)
        .boundary_socket('x')
        .seed(11)
        .build()
        .unwrap();

    assert!(matches!(solver.step(), Err(SolverError::RollbackExhausted)));
    assert!(solver.is_finished());
    assert!(matches!(solver.step(), Err(SolverError::Finished)));
}

#[test]
fn test_exhausted_retries_are_fatal() {
    let catalog: Pair = Catalog::new([loner("a"), loner("b")]).unwrap();
    let field = Field::new((0..2u8).map(|id| Cell::new(id, ['e', 'w'], catalog.all())));
    let mut solver = Solver::builder(&catalog)
        .field(field)
        .adjacent_cells(side_by_side)
        .matching_slot(opposite)
        .boundary_socket('x')
        .random_source(scripted(&[0.0, 0.5, 0.0]))
        .build()
        .unwrap();

    let mut events = Vec::new();
    let error = loop {
        match solver.step() {
            Ok(step) => events.push(step.into_snapshot().event),
            Err(error) => break error,
        }
        assert!(events.len() < 10, "solver kept retrying: {events:?}");
    };
    assert!(matches!(error, SolverError::RollbackExhausted));
    assert_eq!(
        events,
        vec![
            Event::Collapsed { cell: 0, tile: 0 },
            Event::RolledBack { cell: 0 },
            Event::Collapsed { cell: 0, tile: 1 },
            Event::RolledBack { cell: 0 },
        ]
    );
}

#[test]
fn test_weighting_picks_favoured_tile() {
    let catalog: Pair = Catalog::new([
        Tile::simple("rare", &['n'], ['a']),
        Tile::simple("common", &['n'], ['a']),
        Tile::simple("odd", &['n'], ['a']),
    ])
    .unwrap();
    let weight = |tile: usize, _: &u8| if tile == 1 { 100.0 } else { 1.0 };

    for (draw, expected) in [(0.5, 1), (0.001, 0), (0.999, 2)] {
        let mut solver = Solver::builder(&catalog)
            .field(Field::new([Cell::new(0u8, ['n'], catalog.all())]))
            .adjacent_cells(|_: &u8| Vec::new())
            .matching_slot(|_: &char| 'n')
            .boundary_socket('a')
            .tile_weighting(weight)
            .random_source(scripted(&[0.0, draw]))
            .build()
            .unwrap();
        let step = solver.step().unwrap();
        assert_eq!(
            step.snapshot().event,
            Event::Collapsed { cell: 0, tile: expected }
        );
    }
}

#[test]
fn test_catalog_weights_are_used() {
    let catalog: Pair = Catalog::new([
        Tile::simple("light", &['n'], ['a']).with_weight(0.0),
        Tile::simple("heavy", &['n'], ['a']).with_weight(5.0),
    ])
    .unwrap();
    let mut solver = Solver::builder(&catalog)
        .field(Field::new([Cell::new(0u8, ['n'], catalog.all())]))
        .adjacent_cells(|_: &u8| Vec::new())
        .matching_slot(|_: &char| 'n')
        .boundary_socket('a')
        .catalog_weights()
        .random_source(scripted(&[0.0, 0.0]))
        .build()
        .unwrap();
    let snapshot: Snapshot<u8, char> = solver.run().unwrap();
    assert_eq!(snapshot.field.resolve(&catalog)[&0u8], "heavy");
}

#[test]
fn test_steps_after_done_are_refused() {
    let catalog: Pair = Catalog::new([Tile::simple("one", &['n'], ['a'])]).unwrap();
    let mut solver = Solver::builder(&catalog)
        .field(Field::new([Cell::new(0u8, ['n'], catalog.all())]))
        .adjacent_cells(|_: &u8| Vec::new())
        .matching_slot(|_: &char| 'n')
        .boundary_socket('a')
        .build()
        .unwrap();
    assert!(matches!(solver.step(), Ok(Step::Done(_))));
    assert!(matches!(solver.step(), Err(SolverError::Finished)));
}

#[test]
fn test_empty_start_is_rejected() {
    let catalog: Pair = Catalog::new([Tile::simple("inner", &['n'], ['i'])]).unwrap();
    let built = Solver::builder(&catalog)
        .field(Field::new([Cell::new(0u8, ['n'], catalog.all())]))
        .adjacent_cells(|_: &u8| vec![('n', Neighbour::Boundary)])
        .matching_slot(|_: &char| 'n')
        .boundary_socket('b')
        .build();
    assert!(matches!(built, Err(SolverError::RollbackExhausted)));
}

#[test]
fn test_collapsed_neighbour_must_accept_choice() {
    // `q` takes either tile on its west, but only `a` takes `q` on its east.
    let catalog: Pair = Catalog::new([
        plugged("a", 'a', &['q']),
        plugged("b", 'b', &['a']),
        plugged("q", 'q', &['a', 'b']),
    ])
    .unwrap();
    let field = Field::new([
        Cell::new(0u8, ['e', 'w'], catalog.tile_set(&["a", "b"]).unwrap()),
        Cell::new(1u8, ['e', 'w'], catalog.tile_set(&["q"]).unwrap()),
    ]);
    let mut solver = Solver::builder(&catalog)
        .field(field)
        .adjacent_cells(side_by_side)
        .matching_slot(opposite)
        .boundary_socket('a')
        .random_source(scripted(&[0.0, 0.75]))
        .build()
        .unwrap();

    assert_eq!(
        drain(&mut solver),
        vec![
            Event::Collapsed { cell: 0, tile: 1 },
            Event::RolledBack { cell: 0 },
            Event::Collapsed { cell: 0, tile: 0 },
            Event::Finished,
        ]
    );
    assert_eq!(
        solver.field().resolve(&catalog),
        BTreeMap::from([(0, "a"), (1, "q")])
    );
    let stats = solver.stats();
    assert_eq!((stats.collapses, stats.rollbacks), (2, 1));
}

#[test]
fn test_incompatible_seeds_are_fatal() {
    let catalog: Pair = Catalog::new([
        plugged("a", 'a', &['q']),
        plugged("b", 'b', &['a']),
        plugged("q", 'q', &['a', 'b']),
    ])
    .unwrap();
    let field = Field::new([
        Cell::new(0u8, ['e', 'w'], catalog.tile_set(&["b"]).unwrap()),
        Cell::new(1u8, ['e', 'w'], catalog.tile_set(&["q"]).unwrap()),
    ]);
    let mut solver = Solver::builder(&catalog)
        .field(field)
        .adjacent_cells(side_by_side)
        .matching_slot(opposite)
        .boundary_socket('a')
        .seed(1)
        .build()
        .unwrap();

    assert!(matches!(solver.step(), Err(SolverError::RollbackExhausted)));
}

#[test]
fn test_out_of_range_tile_is_rejected() {
    let catalog: Pair = Catalog::new([Tile::simple("one", &['n'], ['a'])]).unwrap();
    let mut tiles = FixedBitSet::with_capacity(6);
    tiles.insert(0);
    tiles.insert(5);
    let built = Solver::builder(&catalog)
        .field(Field::new([Cell::new(0u8, ['n'], tiles)]))
        .adjacent_cells(|_: &u8| vec![('n', Neighbour::Boundary)])
        .matching_slot(|_: &char| 'n')
        .boundary_socket('a')
        .build();
    assert!(matches!(built, Err(SolverError::UnknownTile(_))));
}
