//! Basic geometry of the Scribit, including conversion from wall
//! coordinates to cord lengths.
//!
//! The robot hangs from two anchors (nails) fixed at the same height on the
//! wall, `anchor_distance` apart. Wall coordinates are in millimeters, with
//! the origin at the left anchor, x growing to the right and y growing
//! downwards. The two "cords" go from the plotter head to the anchors, and
//! their lengths are the robot's native actuation space.
//!
//! This crate supports `no_std` and uses `libm` for the handful of
//! transcendental functions we need.

#![cfg_attr(not(feature = "std"), no_std)]

use libm::{hypot, sqrt};

mod travel;

pub use travel::{segment_travel, TravelSegments, TRAVEL_EPSILON};

/// Wall millimeters.
pub struct Mm;

pub type Len = euclid::Length<f64, Mm>;
pub type WallPoint = euclid::Point2D<f64, Mm>;

pub const DEFAULT_ANCHOR_DISTANCE: f64 = 1860.0;

fn square(x: f64) -> f64 {
    x * x
}

pub trait LenExt {
    fn mm(self) -> Len;
}

impl LenExt for f64 {
    fn mm(self) -> Len {
        Len::new(self)
    }
}

pub trait FromKurbo {
    type Input;
    fn from_kurbo(p: Self::Input) -> Self;
}

#[cfg(feature = "kurbo")]
impl FromKurbo for WallPoint {
    type Input = kurbo::Point;
    fn from_kurbo(p: kurbo::Point) -> Self {
        WallPoint::new(p.x, p.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LeftRight<T> {
    pub left: T,
    pub right: T,
}

/// Lengths of the cords, from the head to the anchors.
///
/// Left and right are measured from the point of view of the person
/// looking at the wall.
pub type CordLengths = LeftRight<Len>;

/// The change in cord lengths between two head positions. Positive means
/// the cord gets longer.
pub type CordDelta = LeftRight<Len>;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("anchor distance must be positive, got {0} mm")]
    NonPositiveAnchorDistance(f64),
}

pub struct ConfigBuilder {
    anchor_distance: Len,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            anchor_distance: DEFAULT_ANCHOR_DISTANCE.mm(),
        }
    }
}

impl ConfigBuilder {
    pub fn build(&self) -> Result<Config, ConfigError> {
        let d = self.anchor_distance.get();
        // Written this way round so that NaN is rejected too.
        if !(d > 0.0 && d.is_finite()) {
            return Err(ConfigError::NonPositiveAnchorDistance(d));
        }
        Ok(Config {
            anchor_distance: self.anchor_distance,
        })
    }

    pub fn with_anchor_distance(&mut self, anchor_distance: Len) -> &mut Self {
        self.anchor_distance = anchor_distance;
        self
    }
}

/// The geometric configuration of a Scribit.
///
/// A `Config` can only be obtained from [`ConfigBuilder::build`], so the
/// anchor distance is always positive and the kinematics below are total.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Config {
    /// The horizontal distance between anchors. (We assume that the
    /// anchors are aligned vertically.)
    anchor_distance: Len,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            anchor_distance: DEFAULT_ANCHOR_DISTANCE.mm(),
        }
    }
}

impl Config {
    pub fn anchor_distance(&self) -> Len {
        self.anchor_distance
    }

    /// The middle of the drawable square below the anchors, which is where
    /// the robot is assumed to start.
    pub fn wall_center(&self) -> WallPoint {
        let half = self.anchor_distance.get() / 2.0;
        WallPoint::new(half, half)
    }

    pub fn point_to_cord_lengths(&self, p: &WallPoint) -> CordLengths {
        let d = self.anchor_distance.get();
        CordLengths {
            left: hypot(p.x, p.y).mm(),
            right: hypot(d - p.x, p.y).mm(),
        }
    }

    /// How much each cord changes when the head moves from `from` to `to`.
    pub fn cord_delta(&self, from: &WallPoint, to: &WallPoint) -> CordDelta {
        let start = self.point_to_cord_lengths(from);
        let end = self.point_to_cord_lengths(to);
        CordDelta {
            left: end.left - start.left,
            right: end.right - start.right,
        }
    }

    /// Inverse of [`Config::point_to_cord_lengths`], for heads hanging
    /// below the anchors.
    ///
    /// Cord lengths that can't meet (because they are too short to span the
    /// anchors) are resolved onto the anchor line.
    pub fn cord_lengths_to_point(&self, lengths: &CordLengths) -> WallPoint {
        let d = self.anchor_distance.get();
        let l = lengths.left.get();
        let r = lengths.right.get();
        let x = (square(l) - square(r) + square(d)) / (2.0 * d);
        let y = sqrt((square(l) - square(x)).max(0.0));
        WallPoint::new(x, y)
    }
}
