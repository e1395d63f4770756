pub mod dataset;
pub mod tile_retriever;

use std::collections::HashSet;

use crate::data::feature::FeatureCollection;
use crate::map::map_tile::{MapTile, TileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileLayer {
    Basemap,
    Overview,
}

/// Results delivered from the fetch runtime to the UI thread.
pub enum Fetched {
    Tile {
        layer: TileLayer,
        key: TileKey,
        result: anyhow::Result<MapTile>,
    },
    Dataset(anyhow::Result<FeatureCollection>),
}

/// Tile bookkeeping between the UI thread and the fetch runtime. A failed
/// tile leaves the in-flight set, so the spinner can stop, and is never
/// requested again this session.
#[derive(Default)]
pub struct TileRequests {
    in_flight: HashSet<(TileLayer, TileKey)>,
    failed: HashSet<(TileLayer, TileKey)>,
}

impl TileRequests {
    pub fn should_fetch(&self, layer: TileLayer, key: TileKey) -> bool {
        !self.in_flight.contains(&(layer, key)) && !self.failed.contains(&(layer, key))
    }

    pub fn started(&mut self, layer: TileLayer, key: TileKey) {
        self.in_flight.insert((layer, key));
    }

    pub fn succeeded(&mut self, layer: TileLayer, key: TileKey) {
        self.in_flight.remove(&(layer, key));
    }

    pub fn failed(&mut self, layer: TileLayer, key: TileKey) {
        self.in_flight.remove(&(layer, key));
        self.failed.insert((layer, key));
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
