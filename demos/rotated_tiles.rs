use anyhow::Result;
use clap::Parser;
use ndarray::Array2;
use std::collections::BTreeSet;
use wave_collapse::{
    Catalog, Cell, DebugTag, Event, Field, Neighbour, Solver, Step, Tile, rotate_slots,
};

/// Builds a catalog from rotated base tiles and solves a small grid with
/// debugging enabled.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Config {
    #[arg(long, default_value_t = 8)]
    size: usize,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Print every step instead of a summary.
    #[clap(short, long)]
    verbose: bool,
}

const SLOTS: [char; 4] = ['n', 'e', 's', 'w'];

fn opposite(slot: &char) -> char {
    let order = SLOTS.iter().position(|s| s == slot).unwrap_or(0);
    SLOTS[(order + 2) % SLOTS.len()]
}

/// Every distinct rotation of the base tiles.
fn catalog() -> Result<Catalog<String, char, bool>> {
    let bases = [
        ("grass", [false, false, false, false], 4.0),
        ("straight", [true, false, true, false], 1.0),
        ("bend", [true, true, false, false], 1.0),
        ("tee", [true, true, true, false], 0.5),
        ("cross", [true, true, true, true], 0.25),
    ];

    let mut seen = BTreeSet::new();
    let mut tiles = Vec::new();
    for (name, roads, weight) in bases {
        let base = Tile::simple(name.to_string(), &SLOTS, roads).with_weight(weight);
        for turn in 0..4 {
            let rotated = rotate_slots(&roads, turn)?;
            if !seen.insert(rotated) {
                continue;
            }
            tiles.push(base.rotated(format!("{name}_{turn}"), &SLOTS, turn)?);
        }
    }
    Ok(Catalog::new(tiles)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let config = Config::parse();

    let catalog = catalog()?;
    println!("Number of tiles   : {}", catalog.len());
    for tile in catalog.tiles() {
        println!("  {:<12} {:?}", tile.id(), tile.sockets());
    }

    let size = config.size;
    let ids = Array2::from_shape_fn((size, size), |(row, col)| row * size + col);
    let field = Field::new(ids.iter().map(|&id| Cell::new(id, SLOTS, catalog.all())));
    let adjacent = move |id: &usize| {
        let (row, col) = (id / size, id % size);
        let cell = |row: usize, col: usize| Neighbour::Cell(row * size + col);
        vec![
            ('n', if row > 0 { cell(row - 1, col) } else { Neighbour::Boundary }),
            ('e', if col + 1 < size { cell(row, col + 1) } else { Neighbour::Boundary }),
            ('s', if row + 1 < size { cell(row + 1, col) } else { Neighbour::Boundary }),
            ('w', if col > 0 { cell(row, col - 1) } else { Neighbour::Boundary }),
        ]
    };

    let mut solver = Solver::builder(&catalog)
        .field(field)
        .adjacent_cells(adjacent)
        .matching_slot(opposite)
        .boundary_socket(false)
        .catalog_weights()
        .seed(config.seed)
        .debug(true)
        .build()?;

    let mut inspections = 0;
    let mut conflicts = 0;
    let done = loop {
        match solver.step()? {
            Step::Progress(snapshot) => {
                if let Event::Inspected { .. } = snapshot.event {
                    inspections += 1;
                }
                let tags = snapshot.debug.as_ref();
                if tags.is_some_and(|tags| tags.values().any(|tag| *tag == DebugTag::Conflict)) {
                    conflicts += 1;
                }
                if config.verbose {
                    println!("{:?}", snapshot.event);
                }
            }
            Step::Done(snapshot) => break snapshot,
        }
    };

    let tiles = done.field.resolve(&catalog);
    let names = ids.mapv(|id| tiles[&id].clone());
    for row in names.rows() {
        let line: Vec<_> = row.iter().map(|name| format!("{name:<11}")).collect();
        println!("{}", line.join(" "));
    }

    let stats = solver.stats();
    println!(
        "Collapses: {}  Updates: {}  Rollbacks: {}  Inspections: {}  Conflicts: {}",
        stats.collapses, stats.updates, stats.rollbacks, inspections, conflicts
    );
    Ok(())
}
