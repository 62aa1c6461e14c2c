//! Track layout model: junction/section arenas, id lookup, and plan assembly.

pub mod junction;
pub mod section;

pub use junction::{Continuation, Face, Junction, ServoPosition, ServoState};
pub use section::{Platform, Section, Sensor, Station};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::plan::TrackPlan;
use crate::train::{Train, TrainId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServoId(pub u8);

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ServoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An id that does not resolve to any entity in the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown junction {0}")]
    UnknownJunction(JunctionId),
    #[error("unknown section {0}")]
    UnknownSection(SectionId),
    #[error("unknown sensor {0}")]
    UnknownSensor(SensorId),
    #[error("unknown station {0}")]
    UnknownStation(StationId),
    #[error("unknown train {0}")]
    UnknownTrain(TrainId),
}

/// Rejected plan or an invalid mutation of layout state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("duplicate junction {0}")]
    DuplicateJunction(JunctionId),
    #[error("duplicate section {0}")]
    DuplicateSection(SectionId),
    #[error("duplicate sensor {0}")]
    DuplicateSensor(SensorId),
    #[error("duplicate station {0}")]
    DuplicateStation(StationId),
    #[error("duplicate train {0}")]
    DuplicateTrain(TrainId),
    #[error("servo {servo} is claimed by junctions {first} and {second}")]
    DuplicateServo {
        servo: ServoId,
        first: JunctionId,
        second: JunctionId,
    },
    #[error("section {section} references unknown junction {junction}")]
    UnknownEndpoint {
        section: SectionId,
        junction: JunctionId,
    },
    #[error("sensor {sensor} references unknown section {section}")]
    UnknownSensorSection { sensor: SensorId, section: SectionId },
    #[error("section {section} hosts a platform for unknown station {station}")]
    UnknownPlatformStation { section: SectionId, station: StationId },
    #[error("junction {junction} references unknown station {station}")]
    UnknownJunctionStation {
        junction: JunctionId,
        station: StationId,
    },
    #[error("train {train} starts on unknown section {section}")]
    UnknownPlacementSection { train: TrainId, section: SectionId },
    #[error("section {section} has invalid length {length}")]
    InvalidLength { section: SectionId, length: f64 },
    #[error("sensor {sensor} position {position} lies outside section {section}")]
    SensorOutOfRange {
        sensor: SensorId,
        section: SectionId,
        position: f64,
    },
    #[error("platform for station {station} at position {position} lies outside section {section}")]
    PlatformOutOfRange {
        section: SectionId,
        station: StationId,
        position: f64,
    },
    #[error("train {train} mileage {mileage} lies outside section {section}")]
    PlacementOutOfRange {
        train: TrainId,
        section: SectionId,
        mileage: f64,
    },
    #[error("junction {0} has no outgoing section")]
    MissingOutbound(JunctionId),
    #[error("junction {junction} has only one branch section on its {face} face")]
    IncompleteBranch { junction: JunctionId, face: Face },
    #[error("junction {junction} has conflicting sections on its {face} face")]
    ConflictingFace { junction: JunctionId, face: Face },
    #[error("junction {junction} declares servo {servo} but its outgoing path is fixed")]
    ServoOnFixedJunction {
        junction: JunctionId,
        servo: ServoId,
    },
    #[error("junction {0} is not switchable")]
    NotSwitchable(JunctionId),
}

/// The assembled track graph.
///
/// Entities live in dense arenas; the id maps give O(1) lookup while
/// continuations and cross-references are wired as arena indices, so
/// traversal after a successful build never fails a lookup.
#[derive(Debug, Clone)]
pub struct Layout {
    junctions: Vec<Junction>,
    sections: Vec<Section>,
    sensors: Vec<Sensor>,
    stations: Vec<Station>,
    junction_index: HashMap<JunctionId, usize>,
    section_index: HashMap<SectionId, usize>,
    sensor_index: HashMap<SensorId, usize>,
    station_index: HashMap<StationId, usize>,
}

impl Layout {
    /// Assembles and validates a layout from plan records, together with
    /// the initial train placements.
    pub fn build(plan: &TrackPlan) -> Result<(Self, Vec<Train>), LayoutError> {
        let mut station_index = HashMap::new();
        let mut stations = Vec::with_capacity(plan.stations.len());
        for (idx, record) in plan.stations.iter().enumerate() {
            if station_index.insert(record.id, idx).is_some() {
                return Err(LayoutError::DuplicateStation(record.id));
            }
            stations.push(Station {
                id: record.id,
                name: record.name.clone(),
            });
        }

        let mut junction_index = HashMap::new();
        for (idx, record) in plan.junctions.iter().enumerate() {
            if junction_index.insert(record.id, idx).is_some() {
                return Err(LayoutError::DuplicateJunction(record.id));
            }
        }

        let mut section_index = HashMap::new();
        let mut sections = Vec::with_capacity(plan.sections.len());
        for (idx, record) in plan.sections.iter().enumerate() {
            if section_index.insert(record.id, idx).is_some() {
                return Err(LayoutError::DuplicateSection(record.id));
            }
            let source_idx = *junction_index.get(&record.source).ok_or(LayoutError::UnknownEndpoint {
                section: record.id,
                junction: record.source,
            })?;
            let target_idx = *junction_index.get(&record.target).ok_or(LayoutError::UnknownEndpoint {
                section: record.id,
                junction: record.target,
            })?;
            if !record.length.is_finite() || record.length <= 0.0 {
                return Err(LayoutError::InvalidLength {
                    section: record.id,
                    length: record.length,
                });
            }
            let platform = match &record.platform {
                Some(p) => {
                    if !station_index.contains_key(&p.station) {
                        return Err(LayoutError::UnknownPlatformStation {
                            section: record.id,
                            station: p.station,
                        });
                    }
                    if !p.position.is_finite() || !(0.0..=record.length).contains(&p.position) {
                        return Err(LayoutError::PlatformOutOfRange {
                            section: record.id,
                            station: p.station,
                            position: p.position,
                        });
                    }
                    Some(Platform {
                        station: p.station,
                        position: p.position,
                    })
                }
                None => None,
            };
            sections.push(Section {
                id: record.id,
                source: record.source,
                target: record.target,
                source_idx,
                target_idx,
                source_state: record.source_state,
                target_state: record.target_state,
                length: record.length,
                platform,
            });
        }

        let mut sensor_index = HashMap::new();
        let mut sensors = Vec::with_capacity(plan.sensors.len());
        for (idx, record) in plan.sensors.iter().enumerate() {
            if sensor_index.insert(record.id, idx).is_some() {
                return Err(LayoutError::DuplicateSensor(record.id));
            }
            let section_idx = *section_index.get(&record.section).ok_or(LayoutError::UnknownSensorSection {
                sensor: record.id,
                section: record.section,
            })?;
            let length = sections[section_idx].length;
            if !record.position.is_finite() || !(0.0..=length).contains(&record.position) {
                return Err(LayoutError::SensorOutOfRange {
                    sensor: record.id,
                    section: record.section,
                    position: record.position,
                });
            }
            sensors.push(Sensor {
                id: record.id,
                section: record.section,
                section_idx,
                position: record.position,
            });
        }

        let mut servo_owners: HashMap<ServoId, JunctionId> = HashMap::new();
        let mut junctions = Vec::with_capacity(plan.junctions.len());
        for (junction_idx, record) in plan.junctions.iter().enumerate() {
            if let Some(servo) = record.servo {
                if let Some(first) = servo_owners.insert(servo, record.id) {
                    return Err(LayoutError::DuplicateServo {
                        servo,
                        first,
                        second: record.id,
                    });
                }
            }
            if let Some(station) = record.station {
                if !station_index.contains_key(&station) {
                    return Err(LayoutError::UnknownJunctionStation {
                        junction: record.id,
                        station,
                    });
                }
            }

            let mut out_entries = Vec::new();
            let mut in_entries = Vec::new();
            for (section_idx, section) in sections.iter().enumerate() {
                if section.source_idx == junction_idx {
                    out_entries.push((section.source_state, section_idx));
                }
                if section.target_idx == junction_idx {
                    in_entries.push((section.target_state, section_idx));
                }
            }
            let outbound = match classify_face(record.id, Face::Outbound, &out_entries)? {
                Some(continuation) => continuation,
                None => return Err(LayoutError::MissingOutbound(record.id)),
            };
            let inbound = classify_face(record.id, Face::Inbound, &in_entries)?;

            if let Some(servo) = record.servo {
                if !outbound.is_branch() {
                    return Err(LayoutError::ServoOnFixedJunction {
                        junction: record.id,
                        servo,
                    });
                }
            }
            let switchable = outbound.is_branch()
                || matches!(inbound, Some(Continuation::Branch { .. }));
            if record.initial.is_some() && !switchable {
                return Err(LayoutError::NotSwitchable(record.id));
            }

            let selected = ServoState::from(record.initial.unwrap_or(ServoPosition::Straight));
            let out_state = if outbound.is_branch() {
                selected
            } else {
                ServoState::NoServo
            };
            let in_state = match inbound {
                Some(Continuation::Branch { .. }) => selected,
                _ => ServoState::NoServo,
            };

            junctions.push(Junction {
                id: record.id,
                servo: record.servo,
                station: record.station,
                out_state,
                in_state,
                outbound,
                inbound,
            });
        }

        let mut train_ids = HashSet::new();
        let mut trains = Vec::with_capacity(plan.trains.len());
        for record in &plan.trains {
            if !train_ids.insert(record.id) {
                return Err(LayoutError::DuplicateTrain(record.id));
            }
            let section_idx = *section_index.get(&record.section).ok_or(LayoutError::UnknownPlacementSection {
                train: record.id,
                section: record.section,
            })?;
            let length = sections[section_idx].length;
            if !record.mileage.is_finite() || !(0.0..=length).contains(&record.mileage) {
                return Err(LayoutError::PlacementOutOfRange {
                    train: record.id,
                    section: record.section,
                    mileage: record.mileage,
                });
            }
            trains.push(Train::new(record.id, record.section, section_idx, record.mileage));
        }

        let layout = Self {
            junctions,
            sections,
            sensors,
            stations,
            junction_index,
            section_index,
            sensor_index,
            station_index,
        };
        Ok((layout, trains))
    }

    pub fn junction(&self, id: JunctionId) -> Result<&Junction, LookupError> {
        match self.junction_index.get(&id) {
            Some(&idx) => Ok(&self.junctions[idx]),
            None => Err(LookupError::UnknownJunction(id)),
        }
    }

    pub fn section(&self, id: SectionId) -> Result<&Section, LookupError> {
        match self.section_index.get(&id) {
            Some(&idx) => Ok(&self.sections[idx]),
            None => Err(LookupError::UnknownSection(id)),
        }
    }

    pub fn sensor(&self, id: SensorId) -> Result<&Sensor, LookupError> {
        match self.sensor_index.get(&id) {
            Some(&idx) => Ok(&self.sensors[idx]),
            None => Err(LookupError::UnknownSensor(id)),
        }
    }

    pub fn station(&self, id: StationId) -> Result<&Station, LookupError> {
        match self.station_index.get(&id) {
            Some(&idx) => Ok(&self.stations[idx]),
            None => Err(LookupError::UnknownStation(id)),
        }
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// All platform bindings of a station as (section, offset) pairs.
    pub fn platforms_of(&self, station: StationId) -> Result<Vec<(SectionId, f64)>, LookupError> {
        if !self.station_index.contains_key(&station) {
            return Err(LookupError::UnknownStation(station));
        }
        let mut platforms = Vec::new();
        for section in &self.sections {
            if let Some(platform) = section.platform {
                if platform.station == station {
                    platforms.push((section.id, platform.position));
                }
            }
        }
        Ok(platforms)
    }

    /// Rotates every branch face of the junction to the given position.
    ///
    /// Junctions whose faces are all fixed reject the command; the physical
    /// plant has nothing to move there.
    pub fn set_servo_state(
        &mut self,
        id: JunctionId,
        position: ServoPosition,
    ) -> Result<(), LayoutError> {
        let idx = match self.junction_index.get(&id) {
            Some(&idx) => idx,
            None => return Err(LayoutError::Lookup(LookupError::UnknownJunction(id))),
        };
        let junction = &mut self.junctions[idx];
        let mut switched = false;
        if junction.outbound.is_branch() {
            junction.out_state = ServoState::from(position);
            switched = true;
        }
        if matches!(junction.inbound, Some(Continuation::Branch { .. })) {
            junction.in_state = ServoState::from(position);
            switched = true;
        }
        if switched {
            Ok(())
        } else {
            Err(LayoutError::NotSwitchable(id))
        }
    }

    pub(crate) fn section_at(&self, idx: usize) -> &Section {
        &self.sections[idx]
    }

    pub(crate) fn junction_at(&self, idx: usize) -> &Junction {
        &self.junctions[idx]
    }

    pub(crate) fn section_index_of(&self, id: SectionId) -> Result<usize, LookupError> {
        match self.section_index.get(&id) {
            Some(&idx) => Ok(idx),
            None => Err(LookupError::UnknownSection(id)),
        }
    }
}

fn classify_face(
    junction: JunctionId,
    face: Face,
    entries: &[(ServoState, usize)],
) -> Result<Option<Continuation>, LayoutError> {
    match entries {
        [] => Ok(None),
        [(ServoState::NoServo, section)] => Ok(Some(Continuation::Fixed(*section))),
        [(ServoState::Straight, straight), (ServoState::Curve, curve)]
        | [(ServoState::Curve, curve), (ServoState::Straight, straight)] => {
            Ok(Some(Continuation::Branch {
                straight: *straight,
                curve: *curve,
            }))
        }
        [(ServoState::Straight | ServoState::Curve, _)] => {
            Err(LayoutError::IncompleteBranch { junction, face })
        }
        _ => Err(LayoutError::ConflictingFace { junction, face }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{JunctionPlan, PlatformPlan, SectionPlan, SensorPlan, StationPlan, TrackPlan, TrainPlan};

    fn chain_plan() -> TrackPlan {
        TrackPlan {
            junctions: vec![
                JunctionPlan { id: JunctionId(0), servo: None, initial: None, station: None },
                JunctionPlan { id: JunctionId(1), servo: None, initial: None, station: None },
                JunctionPlan { id: JunctionId(2), servo: None, initial: None, station: None },
            ],
            sections: vec![
                SectionPlan {
                    id: SectionId(0),
                    source: JunctionId(0),
                    target: JunctionId(1),
                    source_state: ServoState::NoServo,
                    target_state: ServoState::NoServo,
                    length: 10.0,
                    platform: None,
                },
                SectionPlan {
                    id: SectionId(1),
                    source: JunctionId(1),
                    target: JunctionId(2),
                    source_state: ServoState::NoServo,
                    target_state: ServoState::NoServo,
                    length: 20.0,
                    platform: None,
                },
                SectionPlan {
                    id: SectionId(2),
                    source: JunctionId(2),
                    target: JunctionId(0),
                    source_state: ServoState::NoServo,
                    target_state: ServoState::NoServo,
                    length: 30.0,
                    platform: None,
                },
            ],
            sensors: vec![],
            stations: vec![],
            trains: vec![],
        }
    }

    #[test]
    fn builds_a_simple_ring() {
        let (layout, trains) = Layout::build(&chain_plan()).unwrap();
        assert_eq!(layout.junctions().len(), 3);
        assert_eq!(layout.sections().len(), 3);
        assert!(trains.is_empty());
        let junction = layout.junction(JunctionId(1)).unwrap();
        assert_eq!(junction.out_state(), ServoState::NoServo);
        assert!(!junction.is_switchable());
    }

    #[test]
    fn rejects_duplicate_section_ids() {
        let mut plan = chain_plan();
        plan.sections[2].id = SectionId(1);
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::DuplicateSection(SectionId(1))
        );
    }

    #[test]
    fn rejects_unknown_endpoints() {
        let mut plan = chain_plan();
        plan.sections[0].target = JunctionId(9);
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::UnknownEndpoint {
                section: SectionId(0),
                junction: JunctionId(9),
            }
        );
    }

    #[test]
    fn rejects_non_positive_lengths() {
        let mut plan = chain_plan();
        plan.sections[1].length = 0.0;
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::InvalidLength {
                section: SectionId(1),
                length: 0.0,
            }
        );
    }

    #[test]
    fn rejects_a_lone_branch_section() {
        let mut plan = chain_plan();
        plan.sections[1].source_state = ServoState::Straight;
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::IncompleteBranch {
                junction: JunctionId(1),
                face: Face::Outbound,
            }
        );
    }

    #[test]
    fn rejects_a_servo_on_a_fixed_junction() {
        let mut plan = chain_plan();
        plan.junctions[0].servo = Some(ServoId(0));
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::ServoOnFixedJunction {
                junction: JunctionId(0),
                servo: ServoId(0),
            }
        );
    }

    #[test]
    fn rejects_out_of_range_sensors() {
        let mut plan = chain_plan();
        plan.sensors.push(SensorPlan {
            id: SensorId(0),
            section: SectionId(0),
            position: 10.5,
        });
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::SensorOutOfRange {
                sensor: SensorId(0),
                section: SectionId(0),
                position: 10.5,
            }
        );
    }

    #[test]
    fn rejects_misplaced_trains() {
        let mut plan = chain_plan();
        plan.trains.push(TrainPlan {
            id: crate::train::TrainId(0),
            section: SectionId(0),
            mileage: -1.0,
        });
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::PlacementOutOfRange {
                train: crate::train::TrainId(0),
                section: SectionId(0),
                mileage: -1.0,
            }
        );
    }

    #[test]
    fn rejects_platforms_for_unknown_stations() {
        let mut plan = chain_plan();
        plan.sections[0].platform = Some(PlatformPlan {
            station: StationId(7),
            position: 5.0,
        });
        assert_eq!(
            Layout::build(&plan).unwrap_err(),
            LayoutError::UnknownPlatformStation {
                section: SectionId(0),
                station: StationId(7),
            }
        );
    }

    #[test]
    fn switching_rotates_only_branch_faces() {
        let mut plan = chain_plan();
        // Split the middle hop into straight and curve alternatives.
        plan.sections[1].source_state = ServoState::Straight;
        plan.sections[1].target_state = ServoState::Straight;
        plan.sections.push(SectionPlan {
            id: SectionId(3),
            source: JunctionId(1),
            target: JunctionId(2),
            source_state: ServoState::Curve,
            target_state: ServoState::Curve,
            length: 25.0,
            platform: None,
        });
        let (mut layout, _) = Layout::build(&plan).unwrap();

        layout.set_servo_state(JunctionId(1), ServoPosition::Curve).unwrap();
        assert_eq!(layout.junction(JunctionId(1)).unwrap().out_state(), ServoState::Curve);
        assert_eq!(layout.junction(JunctionId(2)).unwrap().in_state(), ServoState::Straight);

        assert_eq!(
            layout.set_servo_state(JunctionId(0), ServoPosition::Curve),
            Err(LayoutError::NotSwitchable(JunctionId(0)))
        );
    }

    #[test]
    fn station_platform_listing() {
        let mut plan = chain_plan();
        plan.stations.push(StationPlan {
            id: StationId(0),
            name: String::from("A"),
        });
        plan.sections[0].platform = Some(PlatformPlan {
            station: StationId(0),
            position: 4.0,
        });
        plan.sections[2].platform = Some(PlatformPlan {
            station: StationId(0),
            position: 12.0,
        });
        let (layout, _) = Layout::build(&plan).unwrap();
        assert_eq!(
            layout.platforms_of(StationId(0)).unwrap(),
            vec![(SectionId(0), 4.0), (SectionId(2), 12.0)]
        );
        assert_eq!(
            layout.platforms_of(StationId(3)),
            Err(LookupError::UnknownStation(StationId(3)))
        );
    }
}
