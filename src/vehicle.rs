use crate::approach::{self, Approach, ApproachMap, Lane};
use crate::light::{LightState, TrafficLight};
use crate::math::{self, Point2d, Vector2d};
use crate::{VehicleId, VehicleSet};
use cgmath::prelude::*;
use rand::Rng;
use std::cell::Cell;
use std::f64::consts::FRAC_PI_2;

/// The vehicle's width in world units.
const VEHICLE_WIDTH: f64 = 18.0;

/// The vehicle's length in world units.
const VEHICLE_LENGTH: f64 = 38.0;

/// The maximum speed, in world units per tick.
const MAX_SPEED: f64 = 1.5;

/// Speed gained per tick while moving freely.
const ACCELERATION: f64 = 0.08;

/// Multiplicative speed decay per tick while braking.
const BRAKE_DECAY: f64 = 0.8;

/// Speeds below this snap to a standstill.
const STANDSTILL: f64 = 0.1;

/// The speed a vehicle must regain before it stops counting as waiting.
const WAITING_RELEASE: f64 = 0.5;

/// Distance to the stop line within which a red or yellow light forces a stop.
const STOP_WINDOW: f64 = 40.0;

/// Minimum gap to the vehicle ahead before braking.
const FOLLOW_GAP: f64 = 70.0;

/// The speed below which a right turner may creep through a red.
const CREEP_SPEED: f64 = 0.2;

/// Turning circle radii. Right turns hug the near corner, left turns sweep
/// across the box.
const RIGHT_TURN_RADIUS: f64 = 30.0;
const LEFT_TURN_RADIUS: f64 = 90.0;

/// Angular tolerance for completing a turn, in radians.
const TURN_TOLERANCE: f64 = 0.1;

/// Body colors assigned at spawn, for renderers.
const PALETTE: [[u8; 3]; 8] = [
    [226, 232, 240],
    [203, 213, 225],
    [100, 116, 139],
    [15, 23, 42],
    [185, 28, 28],
    [29, 78, 216],
    [21, 128, 61],
    [161, 98, 7],
];

/// A vehicle's intended movement through the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnIntent {
    Left,
    Straight,
    Right,
}

impl TurnIntent {
    /// The lane this intent requires, if it requires a particular one.
    /// Left turns depart from the inner lane, right turns from the outer.
    pub fn required_lane(self) -> Option<Lane> {
        match self {
            TurnIntent::Left => Some(Lane::Inner),
            TurnIntent::Straight => None,
            TurnIntent::Right => Some(Lane::Outer),
        }
    }
}

/// An in-progress turn manoeuvre.
#[derive(Clone, Copy, Debug)]
struct Turn {
    /// The turning circle radius.
    radius: f64,
    /// The direction of rotation: `1.0` turns clockwise on screen.
    sign: f64,
    /// The heading at which the turn is complete.
    target: f64,
}

impl Turn {
    /// Starts the manoeuvre for an intent, or `None` for straight travel.
    fn begin(intent: TurnIntent, heading: f64) -> Option<Turn> {
        match intent {
            TurnIntent::Straight => None,
            TurnIntent::Right => Some(Turn {
                radius: RIGHT_TURN_RADIUS,
                sign: 1.0,
                target: heading + FRAC_PI_2,
            }),
            TurnIntent::Left => Some(Turn {
                radius: LEFT_TURN_RADIUS,
                sign: -1.0,
                target: heading - FRAC_PI_2,
            }),
        }
    }
}

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The approach the vehicle entered from.
    approach: Approach,
    /// The lane the vehicle travels in, fixed at spawn.
    lane: Lane,
    /// The intended movement through the intersection.
    /// Reverts to `Straight` once a turn completes.
    intent: TurnIntent,
    /// The world space coordinates of the centre of the vehicle.
    pos: Point2d,
    /// The heading in radians. The y-axis points south.
    heading: f64,
    /// The speed in world units per tick.
    vel: f64,
    /// Whether the vehicle is held up by a light or by the vehicle ahead.
    waiting: bool,
    /// The in-progress turn, if there is one.
    turn: Option<Turn>,
    /// Whether the vehicle will brake this tick. Set during planning.
    braking: Cell<bool>,
    /// Body color for renderers. Has no effect on behavior.
    color: [u8; 3],
}

impl Vehicle {
    /// Creates a vehicle at its approach's spawn point.
    pub(crate) fn new(
        id: VehicleId,
        approach: Approach,
        lane: Lane,
        intent: TurnIntent,
        rng: &mut impl Rng,
    ) -> Self {
        debug_assert!(intent.required_lane().map_or(true, |required| required == lane));
        let (pos, heading) = approach::spawn_pose(approach, lane);
        Self {
            id,
            approach,
            lane,
            intent,
            pos,
            heading,
            vel: 0.0,
            waiting: false,
            turn: None,
            braking: Cell::new(false),
            color: PALETTE[rng.gen_range(0..PALETTE.len())],
        }
    }

    /// The vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The approach the vehicle entered from.
    pub fn approach(&self) -> Approach {
        self.approach
    }

    /// The lane the vehicle travels in.
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// The vehicle's current turn intent.
    pub fn intent(&self) -> TurnIntent {
        self.intent
    }

    /// The world space coordinates of the centre of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    /// The vehicle's heading in radians.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// The vehicle's speed in world units per tick.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// Whether the vehicle is held up by a light or by the vehicle ahead.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Whether the vehicle is part way through a turn.
    pub fn is_turning(&self) -> bool {
        self.turn.is_some()
    }

    /// The body color assigned at spawn.
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// The rotated rectangle the vehicle occupies, for renderers and
    /// overlap queries.
    pub fn footprint(&self) -> [Point2d; 4] {
        math::rect_corners(self.pos, VEHICLE_LENGTH, VEHICLE_WIDTH, self.heading)
    }

    /// Whether the vehicle has left the world beyond the removal margin.
    pub fn out_of_bounds(&self) -> bool {
        approach::out_of_bounds(self.pos)
    }

    /// Decides whether the vehicle must brake this tick, from the signal
    /// state and the traffic ahead. Does not move the vehicle.
    pub(crate) fn plan(
        &self,
        lights: &ApproachMap<TrafficLight>,
        vehicles: &VehicleSet,
        right_on_red: f64,
        rng: &mut impl Rng,
    ) {
        let state = lights[self.approach].state();
        let braking =
            self.must_stop_for_light(state, right_on_red, rng) || self.must_follow(vehicles);
        self.braking.set(braking);
    }

    /// Stop line logic. A red or yellow light within the stop window forces
    /// a stop, except that a slow right turner may creep through a red with
    /// a small per-tick probability.
    fn must_stop_for_light(
        &self,
        light: LightState,
        right_on_red: f64,
        rng: &mut impl Rng,
    ) -> bool {
        if self.turn.is_some() {
            return false;
        }
        let dist = approach::stop_line_distance(self.approach, self.pos);
        if dist <= 0.0 || dist >= STOP_WINDOW {
            return false;
        }
        match light {
            LightState::Green => false,
            LightState::Yellow => true,
            LightState::Red => {
                let creeping = self.intent == TurnIntent::Right
                    && self.vel < CREEP_SPEED
                    && rng.gen::<f64>() < right_on_red;
                !creeping
            }
        }
    }

    /// Car following. Brakes when another vehicle in the same lane of the
    /// same approach sits ahead within the follow gap.
    fn must_follow(&self, vehicles: &VehicleSet) -> bool {
        vehicles.iter().any(|(id, other)| {
            id != self.id
                && other.approach == self.approach
                && other.lane == self.lane
                && approach::is_ahead(self.approach, self.pos, other.pos)
                && self.pos.distance(other.pos) < FOLLOW_GAP
        })
    }

    /// Applies the planned braking decision and advances the vehicle.
    pub(crate) fn integrate(&mut self) {
        if self.braking.get() {
            self.vel *= BRAKE_DECAY;
            if self.vel < STANDSTILL {
                self.vel = 0.0;
            }
            self.waiting = true;
        } else {
            self.vel = (self.vel + ACCELERATION).min(MAX_SPEED);
            if self.vel > WAITING_RELEASE {
                self.waiting = false;
            }
        }

        if self.turn.is_none()
            && self.intent != TurnIntent::Straight
            && approach::has_entered_intersection(self.approach, self.pos)
        {
            self.turn = Turn::begin(self.intent, self.heading);
        }

        if let Some(turn) = self.turn {
            self.heading += turn.sign * self.vel / turn.radius;
            self.advance();
            if (self.heading - turn.target).abs() < TURN_TOLERANCE {
                self.heading = turn.target;
                self.turn = None;
                self.intent = TurnIntent::Straight;
            }
        } else {
            self.advance();
        }
    }

    /// Moves the vehicle along its heading at its current speed.
    fn advance(&mut self) {
        let (sin, cos) = self.heading.sin_cos();
        self.pos += Vector2d::new(cos, sin) * self.vel;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use slotmap::SlotMap;
    use std::f64::consts::PI;

    fn all_red() -> ApproachMap<TrafficLight> {
        ApproachMap::from_fn(|_| TrafficLight::new())
    }

    fn spawn(
        vehicles: &mut VehicleSet,
        approach: Approach,
        lane: Lane,
        intent: TurnIntent,
        rng: &mut StdRng,
    ) -> VehicleId {
        vehicles.insert_with_key(|id| Vehicle::new(id, approach, lane, intent, rng))
    }

    #[test]
    fn accelerates_to_max_speed_on_green() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut vehicles: VehicleSet = SlotMap::with_key();
        let id = spawn(
            &mut vehicles,
            Approach::North,
            Lane::Inner,
            TurnIntent::Straight,
            &mut rng,
        );
        let mut lights = all_red();
        lights[Approach::North].set_green();

        let mut last_y = vehicles[id].position().y;
        for _ in 0..60 {
            vehicles[id].plan(&lights, &vehicles, 0.0, &mut rng);
            vehicles[id].integrate();
            let y = vehicles[id].position().y;
            assert!(y > last_y);
            last_y = y;
        }
        assert_approx_eq!(vehicles[id].vel(), MAX_SPEED);
    }

    #[test]
    fn brakes_to_a_standstill_at_a_red_light() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut vehicles: VehicleSet = SlotMap::with_key();
        let id = spawn(
            &mut vehicles,
            Approach::North,
            Lane::Inner,
            TurnIntent::Straight,
            &mut rng,
        );
        vehicles[id].pos = Point2d::new(285.0, 190.0);
        vehicles[id].vel = 1.5;

        let lights = all_red();
        for _ in 0..40 {
            vehicles[id].plan(&lights, &vehicles, 0.0, &mut rng);
            vehicles[id].integrate();
        }
        let vehicle = &vehicles[id];
        assert_eq!(vehicle.vel(), 0.0);
        assert!(vehicle.is_waiting());
        assert!(vehicle.position().y < 220.0);
    }

    #[test]
    fn right_turner_creeps_through_red_only_when_enabled() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut vehicles: VehicleSet = SlotMap::with_key();
        let id = spawn(
            &mut vehicles,
            Approach::East,
            Lane::Outer,
            TurnIntent::Right,
            &mut rng,
        );
        vehicles[id].pos = Point2d::new(390.0, 255.0);
        vehicles[id].vel = 0.1;
        let lights = all_red();

        vehicles[id].plan(&lights, &vehicles, 0.0, &mut rng);
        assert!(vehicles[id].braking.get());
        vehicles[id].plan(&lights, &vehicles, 1.0, &mut rng);
        assert!(!vehicles[id].braking.get());
    }

    #[test]
    fn completes_a_right_turn_and_reverts_to_straight() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut vehicles: VehicleSet = SlotMap::with_key();
        let id = spawn(
            &mut vehicles,
            Approach::North,
            Lane::Outer,
            TurnIntent::Right,
            &mut rng,
        );
        vehicles[id].pos = Point2d::new(255.0, 245.0);
        vehicles[id].vel = 1.0;

        for _ in 0..200 {
            vehicles[id].integrate();
        }
        let vehicle = &vehicles[id];
        assert!(vehicle.turn.is_none());
        assert_eq!(vehicle.intent(), TurnIntent::Straight);
        assert_approx_eq!(vehicle.heading(), PI);
    }

    #[test]
    fn follows_the_vehicle_ahead() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut vehicles: VehicleSet = SlotMap::with_key();
        let rear = spawn(
            &mut vehicles,
            Approach::West,
            Lane::Inner,
            TurnIntent::Straight,
            &mut rng,
        );
        let front = spawn(
            &mut vehicles,
            Approach::West,
            Lane::Inner,
            TurnIntent::Straight,
            &mut rng,
        );
        vehicles[rear].pos = Point2d::new(60.0, 315.0);
        vehicles[front].pos = Point2d::new(110.0, 315.0);
        let lights = all_red();

        vehicles[rear].plan(&lights, &vehicles, 0.0, &mut rng);
        vehicles[front].plan(&lights, &vehicles, 0.0, &mut rng);
        assert!(vehicles[rear].braking.get());
        assert!(!vehicles[front].braking.get());
    }

    #[test]
    fn lane_rules_for_turns() {
        assert_eq!(TurnIntent::Left.required_lane(), Some(Lane::Inner));
        assert_eq!(TurnIntent::Right.required_lane(), Some(Lane::Outer));
        assert_eq!(TurnIntent::Straight.required_lane(), None);
    }

    #[test]
    fn adjacent_lane_footprints_do_not_overlap() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut vehicles: VehicleSet = SlotMap::with_key();
        let inner = spawn(
            &mut vehicles,
            Approach::North,
            Lane::Inner,
            TurnIntent::Straight,
            &mut rng,
        );
        let outer = spawn(
            &mut vehicles,
            Approach::North,
            Lane::Outer,
            TurnIntent::Straight,
            &mut rng,
        );
        vehicles[inner].pos = Point2d::new(285.0, 100.0);
        vehicles[outer].pos = Point2d::new(255.0, 100.0);

        let a = vehicles[inner].footprint();
        let b = vehicles[outer].footprint();
        assert!(!math::polygons_intersect(&a, &b));
        assert!(math::polygons_intersect(&a, &vehicles[inner].footprint()));
    }
}
