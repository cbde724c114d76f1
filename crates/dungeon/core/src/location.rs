//! World coordinates and axis-aligned regions.

use std::fmt;

/// A point in a named world.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub yaw: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_rotation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Euclidean distance; locations in different worlds are infinitely apart.
    pub fn distance(&self, other: &Location) -> f64 {
        if self.world != other.world {
            return f64::INFINITY;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Block coordinates, flooring each axis.
    pub fn block(&self) -> (i64, i64, i64) {
        (
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64,
        )
    }

    /// True when both locations fall on the same block of the same world.
    pub fn same_block(&self, other: &Location) -> bool {
        self.world == other.world && self.block() == other.block()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:.2}, {:.2}, {:.2})",
            self.world, self.x, self.y, self.z
        )
    }
}

/// Inclusive axis-aligned box inside a single world.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockRegion {
    pub min: Location,
    pub max: Location,
}

impl BlockRegion {
    /// Builds a region from two opposite corners in any order.
    ///
    /// The world of `a` is used for the region; `b` is assumed to share it.
    pub fn from_corners(a: &Location, b: &Location) -> Self {
        let min = Location::new(a.world.clone(), a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let max = Location::new(a.world.clone(), a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        Self { min, max }
    }

    pub fn contains(&self, loc: &Location) -> bool {
        loc.world == self.min.world
            && (self.min.x..=self.max.x).contains(&loc.x)
            && (self.min.y..=self.max.y).contains(&loc.y)
            && (self.min.z..=self.max.z).contains(&loc.z)
    }

    pub fn center(&self) -> Location {
        Location::new(
            self.min.world.clone(),
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// True when the move `from -> to` crosses into this region.
    pub fn entered(&self, from: &Location, to: &Location) -> bool {
        self.contains(to) && !self.contains(from)
    }
}
