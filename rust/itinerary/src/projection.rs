//! # Map Projection
//!
//! Read-only view of the current day order for the map overlay: one marker
//! per located place and a path connecting them in list order. Places without
//! coordinates stay in the list but never reach the map.

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::models::{Item, ItemId, LatLng};

/// Where the map opens before any place is known (Seoul City Hall).
pub const DEFAULT_MAP_CENTER: LatLng = LatLng {
    latitude: 37.5665,
    longitude: 126.9780,
};

/// A map marker for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub item_id: ItemId,
    pub title: String,
    pub position: LatLng,
}

/// Viewport that fits all markers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub ne: [f64; 2], // [lat, lng]
    pub sw: [f64; 2], // [lat, lng]
}

/// Markers and connecting path derived from an ordered list of items.
#[derive(Debug, Clone, PartialEq)]
pub struct MapProjection {
    pub markers: Vec<Marker>,
    /// x = longitude, y = latitude, in list order
    pub path: LineString<f64>,
}

impl MapProjection {
    /// Project `ordered` (already in display order).
    pub fn from_items(ordered: &[Item]) -> Self {
        let markers: Vec<Marker> = ordered
            .iter()
            .filter_map(|item| {
                let position = item.position().filter(LatLng::is_valid)?;
                Some(Marker {
                    item_id: item.id,
                    title: item.place_name.clone(),
                    position,
                })
            })
            .collect();

        let path = LineString::new(
            markers
                .iter()
                .map(|m| Coord {
                    x: m.position.longitude,
                    y: m.position.latitude,
                })
                .collect(),
        );

        Self { markers, path }
    }

    /// Path as `(latitude, longitude)` pairs.
    pub fn path_points(&self) -> Vec<(f64, f64)> {
        self.path.coords().map(|c| (c.y, c.x)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Bounding box of all markers, `None` when there are none.
    pub fn bounds(&self) -> Option<MapBounds> {
        let rect = self.path.bounding_rect()?;
        Some(MapBounds {
            ne: [rect.max().y, rect.max().x],
            sw: [rect.min().y, rect.min().x],
        })
    }
}

/// Position of the last located item, in the given order.
pub fn last_position(items: &[Item]) -> Option<LatLng> {
    items
        .iter()
        .rev()
        .find_map(|item| item.position().filter(LatLng::is_valid))
}

/// Caches one projection keyed by the revision of the order it was built
/// from. A new revision always recomputes, whatever the contents.
#[derive(Debug, Default)]
pub struct ProjectionMemo {
    cached: Option<(u64, MapProjection)>,
    computations: u64,
}

impl ProjectionMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection for `revision`, building it from `ordered` on a miss.
    pub fn project_with<F>(&mut self, revision: u64, ordered: F) -> &MapProjection
    where
        F: FnOnce() -> Vec<Item>,
    {
        let fresh = matches!(&self.cached, Some((cached, _)) if *cached == revision);
        if !fresh {
            self.computations += 1;
            self.cached = None;
        }

        let (_, projection) = self
            .cached
            .get_or_insert_with(|| (revision, MapProjection::from_items(&ordered())));
        projection
    }

    /// How many times a projection was actually built.
    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
