//! Per-instance world arena for the kinematic backend

use serde::{Deserialize, Serialize};
use sim_rl_core::{
    AgentState, CollisionKind, Goal, LaneInfo, ObjectKind, Result, RoadMap, Scenario, SimError,
    SimEvent, SimulationState,
};
use std::f64::consts::PI;

/// Largest physics substep in seconds
pub const MAX_PHYSICS_STEP: f64 = 0.02;

/// Upper bound on physics substeps per tick
pub const MAX_DECISION_REPEAT: u32 = 1000;

/// Vehicle limits for the ego bicycle model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// m/s
    pub max_speed: f64,
    /// m/s² at full throttle
    pub max_accel: f64,
    /// m/s² at full brake
    pub max_brake: f64,
    /// Front wheel angle at full steering, radians
    pub max_steer: f64,
    /// Axle distance, metres
    pub wheelbase: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_speed: 30.0,
            max_accel: 4.0,
            max_brake: 8.0,
            max_steer: 0.5,
            wheelbase: 2.7,
        }
    }
}

#[derive(Debug, Clone)]
struct Actor {
    id: String,
    kind: ObjectKind,
    position: [f64; 2],
    heading: f64,
    speed: f64,
    length: f64,
    width: f64,
    displacement: [f64; 2],
    collision: Option<CollisionKind>,
}

impl Actor {
    fn velocity(&self) -> [f64; 2] {
        [self.speed * self.heading.cos(), self.speed * self.heading.sin()]
    }

    fn advance(&mut self, dt: f64) {
        let [vx, vy] = self.velocity();
        self.position[0] += vx * dt;
        self.position[1] += vy * dt;
    }

    /// Rectangle corners, counter-clockwise
    fn corners(&self) -> [[f64; 2]; 4] {
        let (sin, cos) = self.heading.sin_cos();
        let (hl, hw) = (self.length / 2.0, self.width / 2.0);
        [(hl, hw), (-hl, hw), (-hl, -hw), (hl, -hw)].map(|(dx, dy)| {
            [
                self.position[0] + dx * cos - dy * sin,
                self.position[1] + dx * sin + dy * cos,
            ]
        })
    }
}

/// All dynamic state of one simulation
///
/// Nothing here is shared: two worlds spawned from the same scenario evolve
/// independently.
#[derive(Debug, Clone)]
pub struct World {
    actors: Vec<Actor>,
    road: RoadMap,
    goal: Option<Goal>,
    physics: PhysicsConfig,
    decision_repeat: u32,
    physics_step: f64,
    tick: u64,
    time: f64,
    goal_reached: bool,
    events: Vec<SimEvent>,
}

impl World {
    /// Place the scenario's objects; the first one must be the ego car
    pub fn spawn(scenario: &Scenario, physics: &PhysicsConfig, timestep: f64) -> Result<Self> {
        scenario.check()?;
        let ego = scenario.ego().ok_or_else(|| {
            SimError::Scenario(format!(
                "scenario `{}` must define at least one object",
                scenario.name
            ))
        })?;
        if ego.kind != ObjectKind::Car {
            return Err(SimError::Scenario(format!(
                "scenario `{}`: the first object must be a car to serve as the ego vehicle",
                scenario.name
            )));
        }
        if !timestep.is_finite() || timestep <= 0.0 {
            return Err(SimError::Configuration(format!("invalid timestep {}", timestep)));
        }
        let substeps = (timestep / MAX_PHYSICS_STEP).ceil().max(1.0);
        if substeps > MAX_DECISION_REPEAT as f64 {
            return Err(SimError::Configuration(format!(
                "timestep {}s needs {} physics substeps, at most {} are allowed",
                timestep, substeps, MAX_DECISION_REPEAT
            )));
        }

        let actors = scenario
            .objects
            .iter()
            .enumerate()
            .map(|(i, obj)| {
                let id = match (&obj.name, i) {
                    (Some(name), _) => name.clone(),
                    (None, 0) => "ego".to_string(),
                    (None, i) => format!("{}-{}", kind_label(obj.kind), i),
                };
                let speed = match obj.kind {
                    ObjectKind::Obstacle => 0.0,
                    _ => obj.velocity[0].hypot(obj.velocity[1]),
                };
                Actor {
                    id,
                    kind: obj.kind,
                    position: obj.position,
                    heading: obj.heading,
                    speed,
                    length: obj.length,
                    width: obj.width,
                    displacement: [0.0, 0.0],
                    collision: None,
                }
            })
            .collect();

        let decision_repeat = substeps as u32;
        Ok(Self {
            actors,
            road: scenario.road.clone(),
            goal: scenario.goal.clone(),
            physics: physics.clone(),
            decision_repeat,
            physics_step: timestep / decision_repeat as f64,
            tick: 0,
            time: 0.0,
            goal_reached: false,
            events: Vec::new(),
        })
    }

    /// Physics substeps per tick
    pub fn decision_repeat(&self) -> u32 {
        self.decision_repeat
    }

    /// Duration of one physics substep
    pub fn physics_step(&self) -> f64 {
        self.physics_step
    }

    /// Advance one tick with normalized ego controls in `[-1, 1]`
    pub fn step(&mut self, steering: f64, throttle: f64) {
        let steering = steering.clamp(-1.0, 1.0);
        let throttle = throttle.clamp(-1.0, 1.0);
        let start: Vec<[f64; 2]> = self.actors.iter().map(|a| a.position).collect();
        let dt = self.physics_step;

        for _ in 0..self.decision_repeat {
            for (i, actor) in self.actors.iter_mut().enumerate() {
                if actor.collision.is_some() {
                    continue;
                }
                match (i, actor.kind) {
                    (0, _) => drive(actor, &self.physics, steering, throttle, dt),
                    (_, ObjectKind::Obstacle) => {}
                    _ => actor.advance(dt),
                }
            }
        }

        for (actor, start) in self.actors.iter_mut().zip(&start) {
            actor.displacement = [actor.position[0] - start[0], actor.position[1] - start[1]];
        }
        self.tick += 1;
        self.time = self.tick as f64 * self.decision_repeat as f64 * self.physics_step;
        self.events.clear();
        self.detect_collisions();
        self.check_ego_bounds();
    }

    fn detect_collisions(&mut self) {
        let n = self.actors.len();
        let mut hits: Vec<Option<(CollisionKind, String)>> = vec![None; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.actors[i], &self.actors[j]);
                if a.kind == ObjectKind::Obstacle && b.kind == ObjectKind::Obstacle {
                    continue;
                }
                if !overlaps(&a.corners(), &b.corners()) {
                    continue;
                }
                if hits[i].is_none() {
                    hits[i] = Some((collision_with(b.kind), b.id.clone()));
                }
                if hits[j].is_none() {
                    hits[j] = Some((collision_with(a.kind), a.id.clone()));
                }
            }
        }
        for (actor, hit) in self.actors.iter_mut().zip(hits) {
            let Some((kind, other)) = hit else { continue };
            if actor.collision.is_some() || actor.kind == ObjectKind::Obstacle {
                continue;
            }
            actor.collision = Some(kind);
            actor.speed = 0.0;
            self.events.push(SimEvent::Collision {
                agent: actor.id.clone(),
                kind,
                other: Some(other),
            });
        }
    }

    fn check_ego_bounds(&mut self) {
        let road_length = self.road.length;
        let on_road = |x: f64, y: f64, road: &RoadMap| {
            road.lane_at(y).is_some() && (0.0..=road_length).contains(&x)
        };
        let ego = &mut self.actors[0];
        if ego.collision.is_none() && !on_road(ego.position[0], ego.position[1], &self.road) {
            ego.collision = Some(CollisionKind::Sidewalk);
            ego.speed = 0.0;
            self.events.push(SimEvent::LeftRoad {
                agent: ego.id.clone(),
            });
        }
        if let Some(goal) = &self.goal {
            if !self.goal_reached && ego.position[0] >= goal.x {
                self.goal_reached = true;
                self.events.push(SimEvent::GoalReached {
                    agent: ego.id.clone(),
                });
            }
        }
    }

    /// Report the world as a [`SimulationState`]
    pub fn snapshot(&self) -> SimulationState {
        let agents = self
            .actors
            .iter()
            .map(|actor| {
                let lane = self.road.lane_at(actor.position[1]).map(|index| LaneInfo {
                    index,
                    lateral_offset: actor.position[1] - self.road.lane_center(index),
                    width: self.road.lane_width,
                    forward: self.road.forward,
                });
                AgentState {
                    id: actor.id.clone(),
                    kind: actor.kind,
                    position: actor.position,
                    velocity: actor.velocity(),
                    heading: actor.heading,
                    speed: actor.speed,
                    displacement: actor.displacement,
                    lane,
                    collision: actor.collision,
                }
            })
            .collect();
        SimulationState {
            tick: self.tick,
            time: self.time,
            agents,
            events: self.events.clone(),
        }
    }
}

/// Kinematic bicycle model for the ego vehicle
fn drive(actor: &mut Actor, physics: &PhysicsConfig, steering: f64, throttle: f64, dt: f64) {
    let accel = if throttle >= 0.0 {
        throttle * physics.max_accel
    } else {
        throttle * physics.max_brake
    };
    actor.speed = (actor.speed + accel * dt).clamp(0.0, physics.max_speed);
    let yaw_rate = actor.speed / physics.wheelbase * (steering * physics.max_steer).tan();
    actor.heading = normalize_angle(actor.heading + yaw_rate * dt);
    actor.advance(dt);
}

fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI { PI } else { wrapped }
}

fn collision_with(kind: ObjectKind) -> CollisionKind {
    match kind {
        ObjectKind::Car => CollisionKind::Vehicle,
        ObjectKind::Pedestrian | ObjectKind::Obstacle => CollisionKind::Object,
    }
}

fn kind_label(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Car => "car",
        ObjectKind::Pedestrian => "pedestrian",
        ObjectKind::Obstacle => "obstacle",
    }
}

/// Separating-axis test for two convex quadrilaterals
fn overlaps(a: &[[f64; 2]; 4], b: &[[f64; 2]; 4]) -> bool {
    for poly in [a, b] {
        for i in 0..4 {
            let p = poly[i];
            let q = poly[(i + 1) % 4];
            let axis = [q[1] - p[1], p[0] - q[0]];
            let project = |pts: &[[f64; 2]; 4]| {
                pts.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                    let d = c[0] * axis[0] + c[1] * axis[1];
                    (lo.min(d), hi.max(d))
                })
            };
            let (a_lo, a_hi) = project(a);
            let (b_lo, b_hi) = project(b);
            if a_hi < b_lo || b_hi < a_lo {
                return false;
            }
        }
    }
    true
}
