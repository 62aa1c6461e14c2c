//! Serializable track-plan records, the external layout definition.
//!
//! A plan is plain data: ids and references, no wiring. `build` hands it to
//! the layout builder, which validates every reference and produces the
//! arena-backed graph plus the initial train roster.

use serde::{Deserialize, Serialize};

use crate::layout::{
    JunctionId, Layout, LayoutError, SectionId, SensorId, ServoId, ServoPosition, ServoState,
    StationId,
};
use crate::train::{Train, TrainId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionPlan {
    pub id: JunctionId,
    #[serde(default)]
    pub servo: Option<ServoId>,
    /// Starting position for switchable junctions; defaults to straight.
    #[serde(default)]
    pub initial: Option<ServoPosition>,
    #[serde(default)]
    pub station: Option<StationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionPlan {
    pub id: SectionId,
    pub source: JunctionId,
    pub target: JunctionId,
    pub source_state: ServoState,
    pub target_state: ServoState,
    pub length: f64,
    #[serde(default)]
    pub platform: Option<PlatformPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformPlan {
    pub station: StationId,
    pub position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPlan {
    pub id: SensorId,
    pub section: SectionId,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationPlan {
    pub id: StationId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainPlan {
    pub id: TrainId,
    pub section: SectionId,
    pub mileage: f64,
}

/// A complete layout description as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPlan {
    pub junctions: Vec<JunctionPlan>,
    pub sections: Vec<SectionPlan>,
    #[serde(default)]
    pub sensors: Vec<SensorPlan>,
    #[serde(default)]
    pub stations: Vec<StationPlan>,
    #[serde(default)]
    pub trains: Vec<TrainPlan>,
}

impl TrackPlan {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validates the plan and assembles the layout and its trains.
    pub fn build(&self) -> Result<(Layout, Vec<Train>), LayoutError> {
        Layout::build(self)
    }
}
