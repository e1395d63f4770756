use geo::{Contains, Coord, Point};
use rstar::{RTree, RTreeObject, AABB};

use crate::data::feature::FeatureCollection;

/// Bounding box of the feature at `index` in the indexed collection.
#[derive(Debug, Clone)]
struct IndexedBounds {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over feature bounding boxes, used to answer "which feature is
/// under the pointer" without testing every polygon.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    tree: RTree<IndexedBounds>,
}

impl FeatureIndex {
    pub fn build(collection: &FeatureCollection) -> Self {
        let entries = collection.iter()
            .enumerate()
            .map(|(index, feature)| IndexedBounds {
                index,
                envelope: AABB::from_corners(
                    [feature.bounds.min().x, feature.bounds.min().y],
                    [feature.bounds.max().x, feature.bounds.max().y],
                ),
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    /// Index of the topmost feature containing `c`. Features are painted in
    /// collection order, so the highest index is on top.
    pub fn feature_at(&self, collection: &FeatureCollection, c: Coord<f64>) -> Option<usize> {
        let point = Point::from(c);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([c.x, c.y]))
            .map(|entry| entry.index)
            .filter(|&index| collection.get(index).is_some_and(|feature| feature.geometry.contains(&point)))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feature::tests::square;
    use crate::map::map_tile::lon_lat_to_mercator;

    fn collection() -> FeatureCollection {
        [
            square("a", Some(1.0), 0.0, 0.0, 10.0),
            square("b", Some(2.0), 20.0, 0.0, 10.0),
            square("c", Some(3.0), 5.0, 5.0, 10.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn finds_the_feature_under_a_point() {
        let features = collection();
        let index = FeatureIndex::build(&features);
        assert_eq!(index.feature_at(&features, lon_lat_to_mercator(2.0, 2.0)), Some(0));
        assert_eq!(index.feature_at(&features, lon_lat_to_mercator(25.0, 5.0)), Some(1));
        assert_eq!(index.feature_at(&features, lon_lat_to_mercator(17.0, 5.0)), None);
    }

    #[test]
    fn topmost_feature_wins_on_overlap() {
        let features = collection();
        let index = FeatureIndex::build(&features);
        assert_eq!(index.feature_at(&features, lon_lat_to_mercator(7.0, 7.0)), Some(2));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = FeatureIndex::default();
        assert_eq!(index.feature_at(&FeatureCollection::default(), lon_lat_to_mercator(0.0, 0.0)), None);
    }
}
