//! Coordinates, polylines and bounding boxes

use serde::{Deserialize, Serialize};

/// Geographic coordinate in degrees, elevation in metres (NaN in 2D graphs)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "nan")]
    pub ele: f64,
}

fn nan() -> f64 {
    f64::NAN
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat
            && self.lon == other.lon
            && (self.ele == other.ele || (self.ele.is_nan() && other.ele.is_nan()))
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: f64::NAN,
        }
    }

    pub fn new_3d(lat: f64, lon: f64, ele: f64) -> Self {
        Self { lat, lon, ele }
    }

    pub fn has_elevation(&self) -> bool {
        !self.ele.is_nan()
    }
}

/// Which part of an edge geometry to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Base node, pillars and adjacent node
    All,
    /// Base and adjacent node only
    TowerOnly,
    /// Base node and pillars
    BaseAndPillar,
    /// Pillars and adjacent node
    PillarAndAdj,
    /// Pillars only
    PillarOnly,
}

/// Ordered polyline, optionally carrying elevation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointList {
    points: Vec<GeoPoint>,
    is_3d: bool,
}

impl PointList {
    pub fn new(is_3d: bool) -> Self {
        Self {
            points: Vec::new(),
            is_3d,
        }
    }

    pub fn with_capacity(capacity: usize, is_3d: bool) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            is_3d,
        }
    }

    pub fn from_points(points: Vec<GeoPoint>, is_3d: bool) -> Self {
        Self { points, is_3d }
    }

    pub fn is_3d(&self) -> bool {
        self.is_3d
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    /// Panics when `index` is out of bounds, like slice indexing
    pub fn get(&self, index: usize) -> GeoPoint {
        self.points[index]
    }

    pub fn lat(&self, index: usize) -> f64 {
        self.points[index].lat
    }

    pub fn lon(&self, index: usize) -> f64 {
        self.points[index].lon
    }

    pub fn ele(&self, index: usize) -> f64 {
        self.points[index].ele
    }

    pub fn first(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeoPoint> + '_ {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Append the points in `[from, to)` of `other`
    pub fn extend_from(&mut self, other: &PointList, from: usize, to: usize) {
        self.points.extend_from_slice(&other.points[from..to]);
    }

    pub fn reversed(&self) -> PointList {
        let mut points = self.points.clone();
        points.reverse();
        PointList {
            points,
            is_3d: self.is_3d,
        }
    }

    /// Slice of the full geometry (base, pillars..., adjacent) selected by `mode`
    pub fn fetch(&self, mode: FetchMode) -> PointList {
        let len = self.points.len();
        let (from, to) = match mode {
            FetchMode::All => (0, len),
            FetchMode::TowerOnly => {
                if len < 3 {
                    (0, len)
                } else {
                    let points = vec![self.points[0], self.points[len - 1]];
                    return PointList::from_points(points, self.is_3d);
                }
            }
            FetchMode::BaseAndPillar => (0, len.saturating_sub(1)),
            FetchMode::PillarAndAdj => (len.min(1), len),
            FetchMode::PillarOnly => (len.min(1), len.saturating_sub(1).max(len.min(1))),
        };
        PointList::from_points(self.points[from..to].to_vec(), self.is_3d)
    }
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Inverted box that any `extend` call will replace
    pub fn empty() -> Self {
        Self {
            min_lon: f64::MAX,
            max_lon: f64::MIN,
            min_lat: f64::MAX,
            max_lat: f64::MIN,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_lon <= self.max_lon && self.min_lat <= self.max_lat
    }

    pub fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> PointList {
        PointList::from_points(
            (0..n).map(|i| GeoPoint::new(i as f64, i as f64 * 2.0)).collect(),
            false,
        )
    }

    #[test]
    fn test_fetch_modes() {
        let pl = line(4);
        assert_eq!(pl.fetch(FetchMode::All).len(), 4);

        let towers = pl.fetch(FetchMode::TowerOnly);
        assert_eq!(towers.len(), 2);
        assert_eq!(towers.lat(0), 0.0);
        assert_eq!(towers.lat(1), 3.0);

        let base_and_pillar = pl.fetch(FetchMode::BaseAndPillar);
        assert_eq!(base_and_pillar.len(), 3);
        assert_eq!(base_and_pillar.lat(2), 2.0);

        let pillar_and_adj = pl.fetch(FetchMode::PillarAndAdj);
        assert_eq!(pillar_and_adj.len(), 3);
        assert_eq!(pillar_and_adj.lat(0), 1.0);

        let pillars = pl.fetch(FetchMode::PillarOnly);
        assert_eq!(pillars.len(), 2);
        assert_eq!(pillars.lat(0), 1.0);
        assert_eq!(pillars.lat(1), 2.0);
    }

    #[test]
    fn test_fetch_modes_without_pillars() {
        let pl = line(2);
        assert_eq!(pl.fetch(FetchMode::TowerOnly).len(), 2);
        assert_eq!(pl.fetch(FetchMode::BaseAndPillar).len(), 1);
        assert_eq!(pl.fetch(FetchMode::PillarAndAdj).len(), 1);
        assert!(pl.fetch(FetchMode::PillarOnly).is_empty());
    }

    #[test]
    fn test_reversed() {
        let pl = line(3).reversed();
        assert_eq!(pl.lat(0), 2.0);
        assert_eq!(pl.lon(2), 0.0);
    }

    #[test]
    fn test_bbox() {
        let mut bbox = BBox::empty();
        assert!(!bbox.is_valid());
        bbox.extend(1.0, 2.0);
        bbox.extend(-1.0, 0.5);
        assert!(bbox.is_valid());
        assert!(bbox.contains(0.0, 1.0));
        assert!(!bbox.contains(2.0, 1.0));
    }
}
