use crate::approach::{self, Approach, ApproachMap, Lane};
use crate::config::Config;
use crate::light::TrafficLight;
use crate::math::{self, Point2d};
use crate::vehicle::{TurnIntent, Vehicle};
use crate::{VehicleId, VehicleSet};
use log::trace;
use rand::distributions::{Bernoulli, Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;
use smallvec::SmallVec;

/// Look-ahead distance within which an approaching vehicle adds pressure.
const PRESSURE_DISTANCE: f64 = 400.0;

/// A single-intersection traffic simulation.
pub struct Simulation {
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The per-approach signal heads.
    lights: ApproachMap<TrafficLight>,
    /// Source of every stochastic draw in the simulation.
    rng: StdRng,
    /// The per-tick spawn draw.
    spawn: Bernoulli,
    /// The turn intent draw, weighted left, straight, right.
    turn_intents: WeightedIndex<f64>,
    /// Per-tick probability that a slow right turner proceeds on red.
    right_on_red: f64,
    /// Vehicles retired on the most recent step.
    throughput: usize,
}

impl Simulation {
    /// The length of the observation vector returned by
    /// [state_vector](Self::state_vector).
    pub const STATE_LEN: usize = 4;

    /// Creates an empty simulation.
    pub fn new(config: &Config, seed: u64) -> Self {
        Self {
            vehicles: SlotMap::with_key(),
            lights: ApproachMap::from_fn(|_| TrafficLight::new()),
            rng: StdRng::seed_from_u64(seed),
            spawn: Bernoulli::new(config.spawn_rate).expect("Invalid spawn rate"),
            turn_intents: WeightedIndex::new(config.turn_weights)
                .expect("Invalid turn weights"),
            right_on_red: config.right_on_red,
            throughput: 0,
        }
    }

    /// Removes every vehicle and zeroes the throughput counter. Light states
    /// are left alone; phase ownership lies with the controller.
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.throughput = 0;
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        self.spawn_vehicles();
        self.plan_vehicles();
        self.integrate_vehicles();
        self.retire_vehicles();
    }

    /// Spawns at most one vehicle per tick, on a uniformly random approach.
    fn spawn_vehicles(&mut self) {
        if !self.spawn.sample(&mut self.rng) {
            return;
        }
        let approach = Approach::ALL[self.rng.gen_range(0..Approach::ALL.len())];
        let intent = match self.turn_intents.sample(&mut self.rng) {
            0 => TurnIntent::Left,
            1 => TurnIntent::Straight,
            _ => TurnIntent::Right,
        };
        self.add_vehicle(approach, intent);
    }

    /// Adds a vehicle at the approach's spawn point, in a lane consistent
    /// with its intent. Straight vehicles pick a lane at random.
    pub fn add_vehicle(&mut self, approach: Approach, intent: TurnIntent) -> VehicleId {
        let lane = intent.required_lane().unwrap_or_else(|| {
            if self.rng.gen::<bool>() {
                Lane::Inner
            } else {
                Lane::Outer
            }
        });
        let rng = &mut self.rng;
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, approach, lane, intent, rng));
        trace!("spawned {:?} vehicle on {:?}", intent, approach);
        id
    }

    /// First pass: every vehicle decides whether it must brake, reading the
    /// lights and the rest of the population in place.
    fn plan_vehicles(&mut self) {
        for (_, vehicle) in &self.vehicles {
            vehicle.plan(&self.lights, &self.vehicles, self.right_on_red, &mut self.rng);
        }
    }

    /// Second pass: applies the braking decisions and moves every vehicle.
    fn integrate_vehicles(&mut self) {
        for (_, vehicle) in &mut self.vehicles {
            vehicle.integrate();
        }
    }

    /// Removes vehicles beyond the world margin and records this tick's
    /// throughput.
    fn retire_vehicles(&mut self) {
        let exited: SmallVec<[VehicleId; 4]> = self
            .vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.out_of_bounds())
            .map(|(id, _)| id)
            .collect();
        self.throughput = exited.len();
        for id in exited {
            self.vehicles.remove(id);
            trace!("vehicle {:?} left the world", id);
        }
    }

    /// The number of waiting vehicles on an approach.
    pub fn queue(&self, approach: Approach) -> usize {
        self.vehicles
            .values()
            .filter(|v| v.approach() == approach && v.is_waiting())
            .count()
    }

    /// The congestion pressure over a set of approaches: vehicles that are
    /// waiting, plus vehicles still approaching within the look-ahead
    /// distance of their stop line.
    pub fn pressure(&self, approaches: &[Approach]) -> usize {
        self.vehicles
            .values()
            .filter(|v| approaches.contains(&v.approach()))
            .filter(|v| {
                if v.is_waiting() {
                    return true;
                }
                let dist = approach::stop_line_distance(v.approach(), v.position());
                dist > 0.0 && dist < PRESSURE_DISTANCE
            })
            .count()
    }

    /// The observation vector: per-approach queue counts in N, S, E, W order.
    pub fn state_vector(&self) -> [f64; 4] {
        Approach::ALL.map(|a| self.queue(a) as f64)
    }

    /// The total number of waiting vehicles.
    pub fn total_waiting(&self) -> usize {
        self.vehicles.values().filter(|v| v.is_waiting()).count()
    }

    /// True if no vehicle centre is inside the central intersection box.
    pub fn is_intersection_clear(&self) -> bool {
        let min = Point2d::new(approach::INTERSECTION_MIN, approach::INTERSECTION_MIN);
        let max = Point2d::new(approach::INTERSECTION_MAX, approach::INTERSECTION_MAX);
        !self
            .vehicles
            .values()
            .any(|v| math::point_in_rect(v.position(), min, max))
    }

    /// Vehicles retired on the most recent step.
    pub fn throughput(&self) -> usize {
        self.throughput
    }

    /// The number of vehicles currently in the world.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Returns an iterator over the lights by approach.
    pub fn iter_lights(&self) -> impl Iterator<Item = (Approach, &TrafficLight)> {
        self.lights.iter()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    /// The signal head for an approach.
    pub fn light(&self, approach: Approach) -> &TrafficLight {
        &self.lights[approach]
    }

    /// Mutable access to an approach's signal head.
    pub fn light_mut(&mut self, approach: Approach) -> &mut TrafficLight {
        &mut self.lights[approach]
    }

    /// Replaces the per-tick spawn probability.
    pub fn set_spawn_rate(&mut self, rate: f64) {
        self.spawn = Bernoulli::new(rate).expect("Invalid spawn rate");
    }
}
