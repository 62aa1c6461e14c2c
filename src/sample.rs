//! The built-in demonstration layout.
//!
//! A passing loop between two stations: station A sits on the single-track
//! side, station B on the loop, where sections 2 and 3 run in parallel
//! between junctions 1 and 2. Junction 1 carries the only physical servo;
//! junction 2 merges the two loop tracks back together. Lengths follow the
//! track pieces the layout is built from.

use crate::layout::{JunctionId, SectionId, SensorId, ServoId, ServoPosition, ServoState, StationId};
use crate::plan::{
    JunctionPlan, PlatformPlan, SectionPlan, SensorPlan, StationPlan, TrackPlan, TrainPlan,
};
use crate::train::TrainId;

/// Length of one straight track piece, in centimeters.
pub const STRAIGHT_UNIT: f64 = 21.5;
/// Length of one curved track piece, in centimeters.
pub const CURVE_UNIT: f64 = 16.9;

/// Two stations, one passing loop, two sensors, two trains.
pub fn passing_loop_plan() -> TrackPlan {
    TrackPlan {
        junctions: vec![
            JunctionPlan {
                id: JunctionId(0),
                servo: None,
                initial: None,
                station: None,
            },
            JunctionPlan {
                id: JunctionId(1),
                servo: Some(ServoId(0)),
                initial: Some(ServoPosition::Straight),
                station: Some(StationId(1)),
            },
            JunctionPlan {
                id: JunctionId(2),
                servo: None,
                initial: None,
                station: None,
            },
            JunctionPlan {
                id: JunctionId(3),
                servo: None,
                initial: None,
                station: None,
            },
        ],
        sections: vec![
            SectionPlan {
                id: SectionId(0),
                source: JunctionId(3),
                target: JunctionId(0),
                source_state: ServoState::NoServo,
                target_state: ServoState::NoServo,
                length: STRAIGHT_UNIT * 5.5,
                platform: Some(PlatformPlan {
                    station: StationId(0),
                    position: STRAIGHT_UNIT * 3.0,
                }),
            },
            SectionPlan {
                id: SectionId(1),
                source: JunctionId(0),
                target: JunctionId(1),
                source_state: ServoState::NoServo,
                target_state: ServoState::NoServo,
                length: STRAIGHT_UNIT * 5.0 + CURVE_UNIT * 4.0,
                platform: None,
            },
            SectionPlan {
                id: SectionId(2),
                source: JunctionId(1),
                target: JunctionId(2),
                source_state: ServoState::Straight,
                target_state: ServoState::Straight,
                length: STRAIGHT_UNIT * 5.5,
                platform: Some(PlatformPlan {
                    station: StationId(1),
                    position: STRAIGHT_UNIT * 3.0,
                }),
            },
            SectionPlan {
                id: SectionId(3),
                source: JunctionId(1),
                target: JunctionId(2),
                source_state: ServoState::Curve,
                target_state: ServoState::Curve,
                length: STRAIGHT_UNIT * 5.5,
                platform: Some(PlatformPlan {
                    station: StationId(1),
                    position: STRAIGHT_UNIT * 3.0,
                }),
            },
            SectionPlan {
                id: SectionId(4),
                source: JunctionId(2),
                target: JunctionId(3),
                source_state: ServoState::NoServo,
                target_state: ServoState::NoServo,
                length: STRAIGHT_UNIT * 3.0 + CURVE_UNIT * 4.0,
                platform: None,
            },
        ],
        sensors: vec![
            SensorPlan {
                id: SensorId(0),
                section: SectionId(1),
                position: STRAIGHT_UNIT * 2.5 + CURVE_UNIT * 2.0,
            },
            SensorPlan {
                id: SensorId(1),
                section: SectionId(4),
                position: STRAIGHT_UNIT * 1.5 + CURVE_UNIT * 2.0,
            },
        ],
        stations: vec![
            StationPlan {
                id: StationId(0),
                name: String::from("A"),
            },
            StationPlan {
                id: StationId(1),
                name: String::from("B"),
            },
        ],
        trains: vec![
            TrainPlan {
                id: TrainId(0),
                section: SectionId(0),
                mileage: STRAIGHT_UNIT * 3.0,
            },
            TrainPlan {
                id: TrainId(1),
                section: SectionId(2),
                mileage: STRAIGHT_UNIT * 3.0,
            },
        ],
    }
}
