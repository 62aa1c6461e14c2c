use super::junction::ServoState;
use super::{JunctionId, SectionId, SensorId, StationId};

/// A directed track segment between two junctions.
///
/// `source_state`/`target_state` give the servo state each endpoint must
/// hold for this section to be the active path through that junction;
/// `NoServo` on both marks a plain, unswitched segment. Mileage runs from
/// 0 at the source end to `length` at the target end.
#[derive(Debug, Clone)]
pub struct Section {
    pub(crate) id: SectionId,
    pub(crate) source: JunctionId,
    pub(crate) target: JunctionId,
    pub(crate) source_idx: usize,
    pub(crate) target_idx: usize,
    pub(crate) source_state: ServoState,
    pub(crate) target_state: ServoState,
    pub(crate) length: f64,
    pub(crate) platform: Option<Platform>,
}

impl Section {
    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn source(&self) -> JunctionId {
        self.source
    }

    pub fn target(&self) -> JunctionId {
        self.target
    }

    pub fn source_state(&self) -> ServoState {
        self.source_state
    }

    pub fn target_state(&self) -> ServoState {
        self.target_state
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }
}

/// A station stop within a section at a fixed offset from the source end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Platform {
    pub station: StationId,
    pub position: f64,
}

/// A fixed point on a section that reports trains passing over it.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub(crate) id: SensorId,
    pub(crate) section: SectionId,
    pub(crate) section_idx: usize,
    pub(crate) position: f64,
}

impl Sensor {
    pub fn id(&self) -> SensorId {
        self.id
    }

    pub fn section(&self) -> SectionId {
        self.section
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}

/// A named stop referenced by platforms and junction bindings.
#[derive(Debug, Clone)]
pub struct Station {
    pub(crate) id: StationId,
    pub(crate) name: String,
}

impl Station {
    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
