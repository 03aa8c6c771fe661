use anyhow::Result;
use clap::Parser;
use ndarray::Array2;
use std::{collections::BTreeMap, path::PathBuf};
use tracing::Level;
use wave_collapse::{
    CatalogFile, Cell, DebugTag, Field, Neighbour, Snapshot, Step, Tile,
    progress::solve_with_progress,
};

type Roads = CatalogFile<String, String, String>;

/// Grid solving configuration.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Config {
    #[arg(short, long)]
    catalog: PathBuf,

    #[arg(long, default_value_t = 24)]
    width: usize,

    #[arg(long, default_value_t = 12)]
    height: usize,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Weight choices by the catalog's tile weights.
    #[arg(short, long)]
    weighted: bool,

    #[arg(short, long)]
    progress: bool,

    /// Print every step with its debug tags.
    #[arg(short, long)]
    debug: bool,

    #[clap(short, long)]
    verbose: bool,
}

const SLOTS: [&str; 4] = ["n", "e", "s", "w"];

fn neighbours(ids: &Array2<usize>) -> BTreeMap<usize, Vec<(String, Neighbour<usize>)>> {
    ids.indexed_iter()
        .map(|((row, col), &id)| {
            let across = |index: Option<(usize, usize)>| match index.and_then(|index| ids.get(index)) {
                Some(&other) => Neighbour::Cell(other),
                None => Neighbour::Boundary,
            };
            let adjacent = [
                across(row.checked_sub(1).map(|row| (row, col))),
                across(Some((row, col + 1))),
                across(Some((row + 1, col))),
                across(col.checked_sub(1).map(|col| (row, col))),
            ];
            let slots = SLOTS.iter().map(|slot| (*slot).to_string());
            (id, slots.zip(adjacent).collect())
        })
        .collect()
}

/// Box-drawing glyph for the road sockets of a tile.
fn glyph(tile: &Tile<String, String, String>, road: &str) -> char {
    let is_road = |slot: &str| tile.socket(&slot.to_string()).is_some_and(|socket| socket == road);
    match (is_road("n"), is_road("e"), is_road("s"), is_road("w")) {
        (false, false, false, false) => '.',
        (true, false, true, false) => '│',
        (false, true, false, true) => '─',
        (true, true, false, false) => '└',
        (false, true, true, false) => '┌',
        (false, false, true, true) => '┐',
        (true, false, false, true) => '┘',
        (true, true, true, false) => '├',
        (false, true, true, true) => '┬',
        (true, false, true, true) => '┤',
        (true, true, false, true) => '┴',
        (true, true, true, true) => '┼',
        _ => '•',
    }
}

fn print_step(snapshot: &Snapshot<usize, String>) {
    let tagged: Vec<_> = snapshot
        .debug
        .iter()
        .flat_map(|tags| tags.iter())
        .filter(|(_, tag)| **tag != DebugTag::Default)
        .map(|(cell, tag)| format!("{cell}:{tag}"))
        .collect();
    println!("{:<40} {}", format!("{:?}", snapshot.event), tagged.join(" "));
}

fn main() -> Result<()> {
    let config = Config::parse();
    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if config.verbose {
        println!("Catalog           : {}", config.catalog.display());
        println!("Resolution        : {}x{}", config.width, config.height);
        println!("Seed              : {:?}", config.seed);
    }

    let file = Roads::load(&config.catalog)?;
    let catalog = file.catalog();
    if config.verbose {
        println!("Number of tiles   : {}", catalog.len());
    }

    let ids = Array2::from_shape_fn((config.height, config.width), |(row, col)| {
        row * config.width + col
    });
    let field = Field::new(ids.iter().map(|&id| {
        Cell::new(id, SLOTS.map(String::from), catalog.all())
    }));
    let adjacency = neighbours(&ids);

    let mut builder = file
        .builder()
        .field(field)
        .adjacent_cells(move |id: &usize| adjacency[id].clone());
    if config.weighted {
        builder = builder.catalog_weights();
    }
    if let Some(seed) = config.seed {
        builder = builder.seed(seed);
    }
    let mut solver = builder.debug(config.debug).build()?;

    let done = if config.debug {
        loop {
            match solver.step()? {
                Step::Progress(snapshot) => print_step(&snapshot),
                Step::Done(snapshot) => break snapshot,
            }
        }
    } else if config.progress {
        solve_with_progress(&mut solver)?
    } else {
        solver.run()?
    };

    let assignment = done.field.assignment();
    let road = "r";
    let glyphs = ids.mapv(|id| glyph(&catalog[assignment[&id]], road));
    for row in glyphs.rows() {
        println!("{}", row.iter().collect::<String>());
    }

    let stats = solver.stats();
    println!(
        "Collapses: {}  Updates: {}  Rollbacks: {}",
        stats.collapses, stats.updates, stats.rollbacks
    );
    Ok(())
}
