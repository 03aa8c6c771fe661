#![allow(dead_code)]

use ndarray::Array2;
use std::collections::BTreeMap;
use wave_collapse::{Catalog, Cell, Field, Neighbour, Solver, SolverBuilder, Tile};

pub const SLOTS: [char; 4] = ['n', 'e', 's', 'w'];
pub const GRASS: char = 'g';
pub const ROAD: char = 'r';

pub type Roads = Catalog<String, char, char>;

pub fn opposite(slot: &char) -> char {
    match slot {
        'n' => 's',
        's' => 'n',
        'e' => 'w',
        _ => 'e',
    }
}

/// Every grass/road combination over the four sides, except dead ends.
pub fn road_catalog() -> Roads {
    let tiles = (0..16u8)
        .map(|bits| {
            SLOTS
                .iter()
                .enumerate()
                .map(|(i, _)| if bits & (1 << i) == 0 { GRASS } else { ROAD })
                .collect::<Vec<_>>()
        })
        .filter(|sockets| sockets.iter().filter(|&&socket| socket == ROAD).count() != 1)
        .map(|sockets| Tile::simple(sockets.iter().collect::<String>(), &SLOTS, sockets));
    Catalog::new(tiles).unwrap()
}

/// Cell identifiers of a `height` by `width` grid, numbered row by row.
pub fn grid(height: usize, width: usize) -> Array2<usize> {
    Array2::from_shape_fn((height, width), |(row, col)| row * width + col)
}

/// Four-way adjacency over `ids`; sides off the grid face the boundary.
pub fn adjacency(ids: &Array2<usize>) -> BTreeMap<usize, Vec<(char, Neighbour<usize>)>> {
    ids.indexed_iter()
        .map(|((row, col), &id)| {
            let across = |row: Option<usize>, col: Option<usize>| {
                match row.zip(col).and_then(|index| ids.get(index)) {
                    Some(&other) => Neighbour::Cell(other),
                    None => Neighbour::Boundary,
                }
            };
            let neighbours = vec![
                ('n', across(row.checked_sub(1), Some(col))),
                ('e', across(Some(row), Some(col + 1))),
                ('s', across(Some(row + 1), Some(col))),
                ('w', across(Some(row), col.checked_sub(1))),
            ];
            (id, neighbours)
        })
        .collect()
}

/// Builder for a solve of `ids` over `catalog` with grass at the border.
pub fn grid_builder<'a>(
    catalog: &'a Roads,
    ids: &Array2<usize>,
) -> SolverBuilder<'a, usize, String, char, char> {
    let field = Field::new(ids.iter().map(|&id| Cell::new(id, SLOTS, catalog.all())));
    let adjacency = adjacency(ids);
    Solver::builder(catalog)
        .field(field)
        .adjacent_cells(move |id: &usize| adjacency[id].clone())
        .matching_slot(opposite)
        .boundary_socket(GRASS)
}

/// Tile identifier of every cell laid back out on the grid.
pub fn layout(ids: &Array2<usize>, field: &Field<usize, char>, catalog: &Roads) -> Array2<String> {
    let tiles = field.resolve(catalog);
    ids.mapv(|id| tiles[&id].clone())
}

/// True if every pair of neighbours shows matching sockets and every border
/// side shows grass.
pub fn is_consistent(tiles: &Array2<String>, catalog: &Roads) -> bool {
    let socket = |id: &String, slot: char| {
        catalog
            .index_of(id)
            .and_then(|index| catalog[index].socket(&slot).copied())
    };
    tiles.indexed_iter().all(|((row, col), id)| {
        let east = match tiles.get((row, col + 1)) {
            Some(other) => socket(id, 'e') == socket(other, 'w'),
            None => socket(id, 'e') == Some(GRASS),
        };
        let south = match tiles.get((row + 1, col)) {
            Some(other) => socket(id, 's') == socket(other, 'n'),
            None => socket(id, 's') == Some(GRASS),
        };
        let north = row > 0 || socket(id, 'n') == Some(GRASS);
        let west = col > 0 || socket(id, 'w') == Some(GRASS);
        east && south && north && west
    })
}
