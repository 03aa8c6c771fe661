use anyhow::{Context, Result};
use fixedbitset::FixedBitSet;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::Index,
    path::Path,
};

use crate::{Id, SolverBuilder, SolverError, Tile};

/// The tile variants a solve may choose from, addressed by dense index.
#[derive(Clone, Debug)]
pub struct Catalog<T, Sl, So> {
    tiles: Vec<Tile<T, Sl, So>>,
    indices: HashMap<T, usize>,
}

impl<T: Id, Sl: Id, So: Id> Catalog<T, Sl, So> {
    /// Creates a catalog; tile indices follow iteration order.
    ///
    /// # Errors
    ///
    /// Fails if two tiles share an identifier.
    pub fn new(tiles: impl IntoIterator<Item = Tile<T, Sl, So>>) -> Result<Self, SolverError> {
        let tiles: Vec<_> = tiles.into_iter().collect();
        let mut indices = HashMap::with_capacity(tiles.len());
        for (index, tile) in tiles.iter().enumerate() {
            if indices.insert(tile.id().clone(), index).is_some() {
                return Err(SolverError::DuplicateTile(format!("{:?}", tile.id())));
            }
        }
        Ok(Self { tiles, indices })
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True if the catalog holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All tiles in index order.
    pub fn tiles(&self) -> &[Tile<T, Sl, So>] {
        &self.tiles
    }

    /// The tile at `index`.
    pub fn tile(&self, index: usize) -> Option<&Tile<T, Sl, So>> {
        self.tiles.get(index)
    }

    /// Index of the tile with identifier `id`.
    pub fn index_of(&self, id: &T) -> Option<usize> {
        self.indices.get(id).copied()
    }

    /// Identifier of the tile at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn id(&self, index: usize) -> &T {
        self.tiles[index].id()
    }

    /// Weight of the tile at `index`.
    pub fn weight(&self, index: usize) -> f64 {
        debug_assert!(
            index < self.tiles.len(),
            "Index out of bounds: {} >= {}",
            index,
            self.tiles.len()
        );
        self.tiles[index].weight()
    }

    /// Candidate set holding every tile.
    pub fn all(&self) -> FixedBitSet {
        let mut set = FixedBitSet::with_capacity(self.len());
        set.insert_range(..);
        set
    }

    /// Candidate set holding the named tiles.
    ///
    /// # Errors
    ///
    /// Fails on an identifier the catalog does not contain.
    pub fn tile_set<'t>(&self, ids: impl IntoIterator<Item = &'t T>) -> Result<FixedBitSet, SolverError>
    where
        T: 't,
    {
        let mut set = FixedBitSet::with_capacity(self.len());
        for id in ids {
            let index = self
                .index_of(id)
                .ok_or_else(|| SolverError::UnknownTile(format!("{id:?}")))?;
            set.insert(index);
        }
        Ok(set)
    }

    /// Identifiers of the tiles in `set`, in index order.
    pub fn ids<'c>(&'c self, set: &'c FixedBitSet) -> impl Iterator<Item = &'c T> + 'c {
        set.ones().map(move |index| self.id(index))
    }
}

impl<T, Sl, So> Index<usize> for Catalog<T, Sl, So> {
    type Output = Tile<T, Sl, So>;
    fn index(&self, idx: usize) -> &Self::Output {
        &self.tiles[idx]
    }
}

/// A tile entry as written in a catalog document.
///
/// `plugs` may be left out, in which case every slot accepts exactly the
/// socket it shows.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>, Sl: Deserialize<'de> + Ord, So: Deserialize<'de> + Ord"))]
pub struct TileSpec<T, Sl, So> {
    /// Tile identifier.
    pub id: T,
    /// Socket shown on each slot.
    pub sockets: BTreeMap<Sl, So>,
    /// Sockets accepted across each slot.
    #[serde(default)]
    pub plugs: Option<BTreeMap<Sl, BTreeSet<So>>>,
    /// Relative weight.
    #[serde(default)]
    pub weight: Option<f64>,
}

impl<T: Id, Sl: Id, So: Id> From<TileSpec<T, Sl, So>> for Tile<T, Sl, So> {
    fn from(spec: TileSpec<T, Sl, So>) -> Self {
        let plugs = spec.plugs.unwrap_or_else(|| {
            spec.sockets
                .iter()
                .map(|(slot, socket)| (slot.clone(), BTreeSet::from([socket.clone()])))
                .collect()
        });
        let tile = Tile::new(spec.id, spec.sockets, plugs);
        match spec.weight {
            Some(weight) => tile.with_weight(weight),
            None => tile,
        }
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>, Sl: Deserialize<'de> + Ord, So: Deserialize<'de> + Ord"))]
struct CatalogDocument<T, Sl, So> {
    boundary_socket: So,
    opposites: BTreeMap<Sl, Sl>,
    tiles: Vec<TileSpec<T, Sl, So>>,
}

/// A catalog loaded from a YAML document, together with the slot pairing and
/// boundary socket the document declares.
#[derive(Clone, Debug)]
pub struct CatalogFile<T, Sl, So> {
    catalog: Catalog<T, Sl, So>,
    opposites: BTreeMap<Sl, Sl>,
    boundary_socket: So,
}

impl<T, Sl, So> CatalogFile<T, Sl, So>
where
    T: Id + for<'de> Deserialize<'de>,
    Sl: Id + for<'de> Deserialize<'de>,
    So: Id + for<'de> Deserialize<'de>,
{
    /// Parses a catalog document.
    ///
    /// ```yaml
    /// boundary_socket: g
    /// opposites: { n: s, e: w, s: n, w: e }
    /// tiles:
    ///   - id: grass
    ///     sockets: { n: g, e: g, s: g, w: g }
    ///     weight: 3.0
    ///   - id: shore
    ///     sockets: { n: g, e: w, s: g, w: g }
    ///     plugs: { n: [g], e: [w], s: [g], w: [g] }
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML, duplicate tiles, or a slot without an
    /// opposite.
    pub fn from_yaml(data: &str) -> Result<Self, SolverError> {
        let document: CatalogDocument<T, Sl, So> = serde_yaml::from_str(data)?;
        let catalog = Catalog::new(document.tiles.into_iter().map(Tile::from))?;

        let unpaired = catalog
            .tiles()
            .iter()
            .flat_map(|tile| tile.sockets().keys().chain(tile.plugs().keys()))
            .any(|slot| !document.opposites.contains_key(slot));
        if unpaired {
            return Err(SolverError::MissingConfig("opposites"));
        }

        Ok(Self {
            catalog,
            opposites: document.opposites,
            boundary_socket: document.boundary_socket,
        })
    }

    /// Reads and parses a catalog document from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        debug_assert!(path.is_file(), "Path must be a file");
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_yaml(&data).with_context(|| format!("Invalid catalog {}", path.display()))
    }
}

impl<T: Id, Sl: Id, So: Id> CatalogFile<T, Sl, So> {
    /// The loaded tiles.
    pub fn catalog(&self) -> &Catalog<T, Sl, So> {
        &self.catalog
    }

    /// The socket standing for "outside the field".
    pub fn boundary_socket(&self) -> &So {
        &self.boundary_socket
    }

    /// The slot facing back across `slot`.
    pub fn opposite(&self, slot: &Sl) -> Option<&Sl> {
        self.opposites.get(slot)
    }

    /// A solver builder with the catalog, slot pairing and boundary socket
    /// already supplied.
    pub fn builder<C: Id>(&self) -> SolverBuilder<'_, C, T, Sl, So> {
        let opposites = self.opposites.clone();
        SolverBuilder::new(&self.catalog)
            .matching_slot(move |slot: &Sl| opposites.get(slot).cloned().unwrap_or_else(|| slot.clone()))
            .boundary_socket(self.boundary_socket.clone())
    }
}
