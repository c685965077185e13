use crate::intersection::Intersection;
use crate::math::{angle_around, Point2d};
use crate::VehicleId;
use cgmath::MetricSpace;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// Unique ID of a tile in a [ReservationGrid].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId(pub u32);

/// A cell of the reservation grid, and the vehicles holding it over time.
#[derive(Clone, Debug)]
pub struct Tile {
    id: TileId,
    /// The index of the tile around the ring.
    sector: u32,
    /// The index of the tile across the ring, from the inside out.
    band: u32,
    /// Whether the tile lies on the outer edge of the grid.
    edge: bool,
    /// The vehicle holding the tile at each time step.
    reservations: BTreeMap<i64, VehicleId>,
}

/// Divides the annulus between an intersection's minimal and maximal circles
/// into tiles, each of which can be held by at most one vehicle per time step.
///
/// Points outside the annulus belong to the tile of the nearest band in their sector.
#[derive(Clone, Debug)]
pub struct ReservationGrid {
    centre: Point2d,
    min_radius: f64,
    band_width: f64,
    sector_angle: f64,
    sectors: u32,
    bands: u32,
    /// The length of a time step, in s.
    time_step: f64,
    tiles: Vec<Tile>,
}

impl Tile {
    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn sector(&self) -> u32 {
        self.sector
    }

    pub fn band(&self) -> u32 {
        self.band
    }

    /// Returns true if the tile lies on the outer edge of the grid.
    pub fn is_edge(&self) -> bool {
        self.edge
    }

    /// The vehicle holding the tile at the given time step, if any.
    pub fn holder(&self, step: i64) -> Option<VehicleId> {
        self.reservations.get(&step).copied()
    }
}

impl ReservationGrid {
    /// Creates an empty grid covering the intersection.
    ///
    /// # Parameters
    /// * `intersection` - The intersection to cover
    /// * `granularity` - The number of tiles per m, both around and across the ring
    /// * `time_step` - The length of a time step, in s
    pub fn new(intersection: &Intersection, granularity: f64, time_step: f64) -> Self {
        assert!(granularity > 0.0 && time_step > 0.0);
        let centre = intersection.centroid();
        let min_radius = intersection.min_circle().radius;
        let max_radius = intersection.max_circle().radius;
        let mid_radius = 0.5 * (min_radius + max_radius);

        let sectors = u32::max((TAU * mid_radius * granularity).ceil() as u32, 1);
        let bands = u32::max(((max_radius - min_radius) * granularity).ceil() as u32, 1);
        let tiles = (0..sectors * bands)
            .map(|i| Tile {
                id: TileId(i),
                sector: i / bands,
                band: i % bands,
                edge: i % bands == bands - 1,
                reservations: BTreeMap::new(),
            })
            .collect();

        Self {
            centre,
            min_radius,
            band_width: (max_radius - min_radius) / bands as f64,
            sector_angle: TAU / sectors as f64,
            sectors,
            bands,
            time_step,
            tiles,
        }
    }

    /// The number of tiles around the ring.
    pub fn sectors(&self) -> u32 {
        self.sectors
    }

    /// The number of tiles across the ring.
    pub fn bands(&self) -> u32 {
        self.bands
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0 as usize]
    }

    pub fn iter_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Finds the tile containing a point.
    pub fn tile_at(&self, point: Point2d) -> TileId {
        let sector = (angle_around(self.centre, point) / self.sector_angle) as u32;
        let sector = u32::min(sector, self.sectors - 1);
        let offset = point.distance(self.centre) - self.min_radius;
        let band = if self.band_width > 0.0 {
            (f64::max(offset, 0.0) / self.band_width) as u32
        } else {
            0
        };
        let band = u32::min(band, self.bands - 1);
        TileId(sector * self.bands + band)
    }

    /// The time step containing the given time.
    pub fn time_step(&self, time: f64) -> i64 {
        // Absorb rounding error when the time is a multiple of the step
        (time / self.time_step + 1e-9).floor() as i64
    }

    /// The length of a time step, in s.
    pub fn time_step_size(&self) -> f64 {
        self.time_step
    }

    /// The vehicle holding a tile at a time step, if any.
    pub fn holder(&self, tile: TileId, step: i64) -> Option<VehicleId> {
        self.tile(tile).holder(step)
    }

    /// Returns true if any vehicle holds the tile at the time step.
    pub fn is_reserved(&self, tile: TileId, step: i64) -> bool {
        self.holder(tile, step).is_some()
    }

    /// Reserves a tile at a time step for a vehicle.
    ///
    /// Returns false, and leaves the tile untouched, if another vehicle holds it.
    pub fn reserve(&mut self, tile: TileId, step: i64, vehicle: VehicleId) -> bool {
        let tile = &mut self.tiles[tile.0 as usize];
        match tile.reservations.get(&step) {
            Some(holder) if *holder != vehicle => false,
            _ => {
                tile.reservations.insert(step, vehicle);
                true
            }
        }
    }

    /// Releases a tile at a time step, if the vehicle holds it.
    pub fn release(&mut self, tile: TileId, step: i64, vehicle: VehicleId) {
        let tile = &mut self.tiles[tile.0 as usize];
        if tile.reservations.get(&step) == Some(&vehicle) {
            tile.reservations.remove(&step);
        }
    }

    /// Forgets every reservation for a time step before the given one.
    pub fn clean_up(&mut self, step: i64) {
        let mut removed = 0;
        for tile in &mut self.tiles {
            let kept = tile.reservations.split_off(&step);
            removed += tile.reservations.len();
            tile.reservations = kept;
        }
        if removed > 0 {
            trace!("Cleaned up {} tile reservations before step {}", removed, step);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::RoundaboutLayout;
    use crate::Network;

    fn grid() -> ReservationGrid {
        let mut network = Network::new();
        let roundabout = RoundaboutLayout::default().build(&mut network);
        ReservationGrid::new(network.intersection(roundabout.manager), 1.0, 0.1)
    }

    #[test]
    fn tiles_cover_annulus() {
        let grid = grid();
        assert!(grid.sectors() >= 120);
        assert!(grid.bands() >= 4);
        assert_eq!(grid.iter_tiles().count() as u32, grid.sectors() * grid.bands());
        assert_eq!(grid.iter_tiles().filter(|t| t.is_edge()).count() as u32, grid.sectors());
    }

    #[test]
    fn points_outside_annulus_clamp_to_nearest_band() {
        let grid = grid();
        let inner = grid.tile(grid.tile_at(Point2d::new(1.0, 0.0)));
        let outer = grid.tile(grid.tile_at(Point2d::new(100.0, 0.0)));
        assert_eq!(inner.band(), 0);
        assert_eq!(outer.band(), grid.bands() - 1);
        assert!(outer.is_edge());
        assert_eq!(inner.sector(), outer.sector());
    }

    #[test]
    fn one_holder_per_tile_and_step() {
        let mut grid = grid();
        let tile = TileId(3);
        assert!(grid.reserve(tile, 5, VehicleId(1)));
        assert!(grid.reserve(tile, 5, VehicleId(1)));
        assert!(!grid.reserve(tile, 5, VehicleId(2)));
        assert_eq!(grid.holder(tile, 5), Some(VehicleId(1)));
        assert!(!grid.is_reserved(tile, 6));

        grid.release(tile, 5, VehicleId(2));
        assert!(grid.is_reserved(tile, 5));
        grid.release(tile, 5, VehicleId(1));
        assert!(!grid.is_reserved(tile, 5));
    }

    #[test]
    fn clean_up_drops_past_steps() {
        let mut grid = grid();
        grid.reserve(TileId(0), 1, VehicleId(1));
        grid.reserve(TileId(0), 2, VehicleId(1));
        grid.clean_up(2);
        assert!(!grid.is_reserved(TileId(0), 1));
        assert!(grid.is_reserved(TileId(0), 2));
    }

    #[test]
    fn time_steps_absorb_rounding() {
        let grid = grid();
        assert_eq!(grid.time_step(0.3), 3);
        assert_eq!(grid.time_step(0.29), 2);
        assert_eq!(grid.time_step(-0.05), -1);
    }
}
