//! The four approach roads and the fixed world geometry they share.

use crate::math::Point2d;
use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Index, IndexMut};

/// The width and height of the simulated world.
pub const WORLD_SIZE: f64 = 600.0;

/// The coordinate of the road centre lines on both axes.
pub const ROAD_CENTRE: f64 = 300.0;

/// The extent of the central intersection box on both axes.
pub const INTERSECTION_MIN: f64 = 240.0;
/// See [INTERSECTION_MIN].
pub const INTERSECTION_MAX: f64 = 360.0;

/// How far outside the world edge vehicles spawn.
const SPAWN_OFFSET: f64 = 50.0;

/// How far beyond the world edge vehicles may travel before removal.
const EXIT_MARGIN: f64 = 100.0;

/// Lane centre offsets from the road centre line.
const INNER_LANE_OFFSET: f64 = 15.0;
const OUTER_LANE_OFFSET: f64 = 45.0;

/// Stop line coordinates along the axis of travel. Traffic from the north
/// and west stops at the near line, traffic from the south and east at the
/// far one.
const STOP_LINE_NEAR: f64 = 220.0;
const STOP_LINE_FAR: f64 = 380.0;

/// One of the four compass directions from which traffic enters the
/// intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Approach {
    North,
    South,
    East,
    West,
}

impl Approach {
    /// All approaches, in service priority order.
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::South,
        Approach::East,
        Approach::West,
    ];

    /// The approach served after this one in the signal rotation.
    pub fn next(self) -> Approach {
        match self {
            Approach::North => Approach::South,
            Approach::South => Approach::East,
            Approach::East => Approach::West,
            Approach::West => Approach::North,
        }
    }

    /// The heading of traffic entering from this approach, in radians.
    /// The world uses screen axes, so the y-axis points south.
    pub fn heading(self) -> f64 {
        match self {
            Approach::North => FRAC_PI_2,
            Approach::South => -FRAC_PI_2,
            Approach::East => PI,
            Approach::West => 0.0,
        }
    }

    fn index(self) -> usize {
        match self {
            Approach::North => 0,
            Approach::South => 1,
            Approach::East => 2,
            Approach::West => 3,
        }
    }
}

/// A lane on an approach road. `Inner` runs closest to the road centre line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lane {
    Inner,
    Outer,
}

impl Lane {
    fn offset(self) -> f64 {
        match self {
            Lane::Inner => INNER_LANE_OFFSET,
            Lane::Outer => OUTER_LANE_OFFSET,
        }
    }
}

/// A fixed map from each approach to a value.
#[derive(Clone, Copy, Debug)]
pub struct ApproachMap<T>([T; 4]);

impl<T> ApproachMap<T> {
    /// Creates a map by evaluating `f` once per approach.
    pub fn from_fn(f: impl FnMut(Approach) -> T) -> Self {
        ApproachMap(Approach::ALL.map(f))
    }

    /// Iterates over the entries in approach priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Approach, &T)> {
        Approach::ALL.iter().copied().zip(self.0.iter())
    }
}

impl<T> Index<Approach> for ApproachMap<T> {
    type Output = T;

    fn index(&self, approach: Approach) -> &T {
        &self.0[approach.index()]
    }
}

impl<T> IndexMut<Approach> for ApproachMap<T> {
    fn index_mut(&mut self, approach: Approach) -> &mut T {
        &mut self.0[approach.index()]
    }
}

/// The position and heading at which a vehicle enters from an approach.
pub fn spawn_pose(approach: Approach, lane: Lane) -> (Point2d, f64) {
    let offset = lane.offset();
    let entry = -SPAWN_OFFSET;
    let exit = WORLD_SIZE + SPAWN_OFFSET;
    let point = match approach {
        Approach::North => Point2d::new(ROAD_CENTRE - offset, entry),
        Approach::South => Point2d::new(ROAD_CENTRE + offset, exit),
        Approach::East => Point2d::new(exit, ROAD_CENTRE - offset),
        Approach::West => Point2d::new(entry, ROAD_CENTRE + offset),
    };
    (point, approach.heading())
}

/// Signed distance from a position to the approach's stop line. Positive
/// while the vehicle has not yet crossed the line.
pub fn stop_line_distance(approach: Approach, pos: Point2d) -> f64 {
    match approach {
        Approach::North => STOP_LINE_NEAR - pos.y,
        Approach::South => pos.y - STOP_LINE_FAR,
        Approach::East => pos.x - STOP_LINE_FAR,
        Approach::West => STOP_LINE_NEAR - pos.x,
    }
}

/// Whether a position on this approach has passed into the intersection box.
pub fn has_entered_intersection(approach: Approach, pos: Point2d) -> bool {
    match approach {
        Approach::North => pos.y > INTERSECTION_MIN,
        Approach::South => pos.y < INTERSECTION_MAX,
        Approach::East => pos.x < INTERSECTION_MAX,
        Approach::West => pos.x > INTERSECTION_MIN,
    }
}

/// Whether `other` lies ahead of `pos` in the approach's direction of travel.
pub fn is_ahead(approach: Approach, pos: Point2d, other: Point2d) -> bool {
    match approach {
        Approach::North => other.y > pos.y,
        Approach::South => other.y < pos.y,
        Approach::East => other.x < pos.x,
        Approach::West => other.x > pos.x,
    }
}

/// Whether a position is beyond the removal margin on either axis.
pub fn out_of_bounds(pos: Point2d) -> bool {
    pos.x < -EXIT_MARGIN
        || pos.x > WORLD_SIZE + EXIT_MARGIN
        || pos.y < -EXIT_MARGIN
        || pos.y > WORLD_SIZE + EXIT_MARGIN
}
