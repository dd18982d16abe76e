//! Scenario descriptions and scenario sources

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use crate::error::{Result, SimError};

/// Opaque parameters forwarded to a [`ScenarioSource`] on every reset
pub type ScenarioParameters = BTreeMap<String, serde_json::Value>;

/// Parameter key selecting a scenario by name
pub const SCENARIO_KEY: &str = "scenario";

/// Parameter key carrying the reset seed
pub const SEED_KEY: &str = "seed";

/// Immutable description of an initial world configuration
///
/// The first object is the ego agent controlled by the environment's
/// actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Scene objects, ego first
    pub objects: Vec<SceneObject>,
    /// Road the scene is placed on
    #[serde(default)]
    pub road: RoadMap,
    /// Goal for the ego agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    /// Scenario-specific parameters
    #[serde(default)]
    pub parameters: ScenarioParameters,
}

impl Scenario {
    /// The ego object, if the scene has any objects
    pub fn ego(&self) -> Option<&SceneObject> {
        self.objects.first()
    }

    /// Check geometric sanity of the description
    pub fn check(&self) -> Result<()> {
        if self.road.lanes == 0 || !(self.road.lane_width > 0.0) {
            return Err(SimError::Scenario(format!(
                "scenario `{}` needs at least one lane of positive width",
                self.name
            )));
        }
        for (i, obj) in self.objects.iter().enumerate() {
            let finite = obj.position.iter().chain(obj.velocity.iter()).all(|v| v.is_finite())
                && obj.heading.is_finite();
            if !finite {
                return Err(SimError::Scenario(format!(
                    "scenario `{}` object {} has non-finite pose",
                    self.name, i
                )));
            }
            if !(obj.length > 0.0 && obj.width > 0.0) {
                return Err(SimError::Scenario(format!(
                    "scenario `{}` object {} has non-positive extent",
                    self.name, i
                )));
            }
        }
        Ok(())
    }
}

/// Kind of scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Car,
    Pedestrian,
    Obstacle,
}

/// A single object placed in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Optional stable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: ObjectKind,
    /// Position in metres
    pub position: [f64; 2],
    /// Heading in radians, counter-clockwise from +x
    #[serde(default)]
    pub heading: f64,
    /// Initial velocity in m/s
    #[serde(default)]
    pub velocity: [f64; 2],
    #[serde(default = "default_length")]
    pub length: f64,
    #[serde(default = "default_width")]
    pub width: f64,
}

impl SceneObject {
    /// Object of `kind` at `position` with default extent and zero velocity
    pub fn new(kind: ObjectKind, position: [f64; 2]) -> Self {
        let (length, width) = match kind {
            ObjectKind::Car => (default_length(), default_width()),
            ObjectKind::Pedestrian => (0.6, 0.6),
            ObjectKind::Obstacle => (1.0, 1.0),
        };
        Self {
            name: None,
            kind,
            position,
            heading: 0.0,
            velocity: [0.0, 0.0],
            length,
            width,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_velocity(mut self, velocity: [f64; 2]) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

fn default_length() -> f64 {
    4.5
}

fn default_width() -> f64 {
    1.8
}

/// Straight multi-lane road running along +x from x = 0
///
/// Lane `i` is centred at `y = (i + 0.5) * lane_width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadMap {
    pub lanes: usize,
    pub lane_width: f64,
    /// Whether the lanes carry traffic in the +x direction
    pub forward: bool,
    pub length: f64,
}

impl Default for RoadMap {
    fn default() -> Self {
        Self {
            lanes: 3,
            lane_width: 3.5,
            forward: true,
            length: 400.0,
        }
    }
}

impl RoadMap {
    /// Paved width of the road
    pub fn width(&self) -> f64 {
        self.lanes as f64 * self.lane_width
    }

    /// Centre line of lane `index`
    pub fn lane_center(&self, index: usize) -> f64 {
        (index as f64 + 0.5) * self.lane_width
    }

    /// Index of the lane containing `y`, if `y` is on the road
    pub fn lane_at(&self, y: f64) -> Option<usize> {
        if self.lanes == 0 || y < 0.0 || y > self.width() {
            return None;
        }
        Some(((y / self.lane_width) as usize).min(self.lanes - 1))
    }
}

/// Goal line for the ego agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Ego reaches the goal once its x coordinate passes this value
    pub x: f64,
}

impl Default for Goal {
    fn default() -> Self {
        Self { x: 300.0 }
    }
}

/// Produces one scenario per episode
pub trait ScenarioSource: Send {
    /// Produce the scenario for the next episode
    fn produce_scenario(&mut self, parameters: &ScenarioParameters) -> Result<Scenario>;
}

/// Source that returns the same scenario every episode
#[derive(Debug, Clone)]
pub struct FixedScenario(pub Scenario);

impl ScenarioSource for FixedScenario {
    fn produce_scenario(&mut self, _parameters: &ScenarioParameters) -> Result<Scenario> {
        Ok(self.0.clone())
    }
}

/// Finite source; each scenario is used once
#[derive(Debug, Clone, Default)]
pub struct ScenarioQueue {
    pending: VecDeque<Scenario>,
}

impl ScenarioQueue {
    pub fn new(scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        Self {
            pending: scenarios.into_iter().collect(),
        }
    }
}

impl ScenarioSource for ScenarioQueue {
    fn produce_scenario(&mut self, _parameters: &ScenarioParameters) -> Result<Scenario> {
        self.pending
            .pop_front()
            .ok_or_else(|| SimError::Scenario("scenario queue exhausted".into()))
    }
}

/// Named scenarios, selected by the `scenario` parameter or round-robin
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
    next: usize,
}

impl ScenarioCatalog {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(SimError::Scenario("scenario catalog is empty".into()));
        }
        for scenario in &scenarios {
            scenario.check()?;
        }
        Ok(Self { scenarios, next: 0 })
    }

    /// Parse a JSON array of scenarios
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scenarios: Vec<Scenario> = serde_json::from_str(json)?;
        Self::new(scenarios)
    }

    /// Load a JSON array of scenarios from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SimError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.name.as_str())
    }
}

impl ScenarioSource for ScenarioCatalog {
    fn produce_scenario(&mut self, parameters: &ScenarioParameters) -> Result<Scenario> {
        match parameters.get(SCENARIO_KEY) {
            Some(serde_json::Value::String(name)) => self
                .scenarios
                .iter()
                .find(|s| &s.name == name)
                .cloned()
                .ok_or_else(|| SimError::Scenario(format!("unknown scenario `{}`", name))),
            Some(other) => Err(SimError::Scenario(format!(
                "`{}` parameter must be a string, got {}",
                SCENARIO_KEY, other
            ))),
            None => {
                let scenario = self.scenarios[self.next % self.scenarios.len()].clone();
                self.next = (self.next + 1) % self.scenarios.len();
                Ok(scenario)
            }
        }
    }
}
