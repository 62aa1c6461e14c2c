//! The per-cycle reconciliation loop.
//!
//! Inbound plant events accumulate in bounded queues between cycles. One
//! `reconcile` pass drains odometry first, then sensor corrections, in
//! arrival order; `commands` afterwards projects the commanded state for
//! the plant. Queries never overlap mutation: the loop owns the state and
//! runs to completion before anything reads it.

use heapless::Deque;
use std::collections::HashMap;
use thiserror::Error;

use crate::layout::{
    JunctionId, Layout, LayoutError, LookupError, SensorId, ServoPosition, StationId,
};
use crate::plan::TrackPlan;
use crate::protocol::OutboundCommand;
use crate::telemetry::{ControllerStats, TelemetryCollector, TelemetryFrame};
use crate::topology::TopologyError;
use crate::train::{Train, TrainId};

pub const ODOMETRY_QUEUE_DEPTH: usize = 64;
pub const SENSOR_QUEUE_DEPTH: usize = 32;

/// A "train moved by delta" report from the plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryEvent {
    pub train: TrainId,
    pub delta: f64,
}

/// A "sensor fired" report from the plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEvent {
    pub sensor: SensorId,
}

/// Any inbound event, as echoed back in failure reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundEvent {
    Odometry(OdometryEvent),
    Sensor(SensorEvent),
}

/// Why a single event could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EventError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("odometry delta {0} is not finite")]
    NonFiniteDelta(f64),
}

/// An event that could not be applied, with its cause. The rest of the
/// batch still ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventFailure {
    pub event: InboundEvent,
    pub error: EventError,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub odometry_applied: u32,
    pub corrections_applied: u32,
    pub corrections_ignored: u32,
    pub failures: Vec<EventFailure>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("odometry queue full")]
    OdometryQueueFull,
    #[error("sensor queue full")]
    SensorQueueFull,
}

/// Owns the layout, the train roster, and the event queues.
pub struct LayoutController {
    layout: Layout,
    trains: Vec<Train>,
    train_index: HashMap<TrainId, usize>,
    odometry_queue: Deque<OdometryEvent, ODOMETRY_QUEUE_DEPTH>,
    sensor_queue: Deque<SensorEvent, SENSOR_QUEUE_DEPTH>,
    telemetry: TelemetryCollector,
    stats: ControllerStats,
    cycle: u64,
}

impl LayoutController {
    pub fn new(layout: Layout, trains: Vec<Train>) -> Self {
        let mut train_index = HashMap::new();
        for (idx, train) in trains.iter().enumerate() {
            let previous = train_index.insert(train.id(), idx);
            debug_assert!(previous.is_none(), "duplicate train id {}", train.id());
        }
        Self {
            layout,
            trains,
            train_index,
            odometry_queue: Deque::new(),
            sensor_queue: Deque::new(),
            telemetry: TelemetryCollector::new(),
            stats: ControllerStats::default(),
            cycle: 0,
        }
    }

    /// Builds the layout from a plan and takes over its trains.
    pub fn from_plan(plan: &TrackPlan) -> Result<Self, LayoutError> {
        let (layout, trains) = Layout::build(plan)?;
        Ok(Self::new(layout, trains))
    }

    /// Queues an odometry report for the next cycle.
    pub fn push_odometry(&mut self, train: TrainId, delta: f64) -> Result<(), ControllerError> {
        match self.odometry_queue.push_back(OdometryEvent { train, delta }) {
            Ok(()) => Ok(()),
            Err(_) => Err(ControllerError::OdometryQueueFull),
        }
    }

    /// Queues a sensor firing for the next cycle.
    pub fn push_sensor(&mut self, sensor: SensorId) -> Result<(), ControllerError> {
        match self.sensor_queue.push_back(SensorEvent { sensor }) {
            Ok(()) => Ok(()),
            Err(_) => Err(ControllerError::SensorQueueFull),
        }
    }

    /// Runs one reconciliation pass: drains odometry, then sensor
    /// corrections, both in arrival order. A failed event is recorded in
    /// the report and the batch keeps going.
    pub fn reconcile(&mut self) -> CycleReport {
        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            ..CycleReport::default()
        };

        while let Some(event) = self.odometry_queue.pop_front() {
            match self.apply_odometry(event) {
                Ok(()) => report.odometry_applied += 1,
                Err(error) => report.failures.push(EventFailure {
                    event: InboundEvent::Odometry(event),
                    error,
                }),
            }
        }

        while let Some(event) = self.sensor_queue.pop_front() {
            match self.apply_sensor(event) {
                Ok(true) => report.corrections_applied += 1,
                Ok(false) => report.corrections_ignored += 1,
                Err(error) => report.failures.push(EventFailure {
                    event: InboundEvent::Sensor(event),
                    error,
                }),
            }
        }

        self.stats.cycles = report.cycle;
        self.stats.odometry_applied += u64::from(report.odometry_applied);
        self.stats.corrections_applied += u64::from(report.corrections_applied);
        self.stats.corrections_ignored += u64::from(report.corrections_ignored);
        self.stats.failed_events += report.failures.len() as u64;
        if let Some(failure) = report.failures.last() {
            self.stats.last_error = Some(failure.error.to_string());
        }
        report
    }

    fn apply_odometry(&mut self, event: OdometryEvent) -> Result<(), EventError> {
        if !event.delta.is_finite() {
            return Err(EventError::NonFiniteDelta(event.delta));
        }
        let idx = match self.train_index.get(&event.train) {
            Some(&idx) => idx,
            None => return Err(EventError::Lookup(LookupError::UnknownTrain(event.train))),
        };
        self.trains[idx].advance(&self.layout, event.delta)?;
        Ok(())
    }

    /// Applies one sensor correction. Returns `Ok(true)` when a train was
    /// snapped, `Ok(false)` when the sensor's section was empty (tolerated
    /// plant noise, not an error).
    ///
    /// At most one train is assumed to occupy a section; with several, the
    /// first in roster order wins.
    fn apply_sensor(&mut self, event: SensorEvent) -> Result<bool, EventError> {
        let sensor = self.layout.sensor(event.sensor)?;
        let section_idx = sensor.section_idx;
        let position = sensor.position();
        match self
            .trains
            .iter_mut()
            .find(|train| train.section_index() == section_idx)
        {
            Some(train) => {
                train.snap(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Projects the commanded state for the plant: one speed command per
    /// train, one servo command per junction with a physical servo. Pure
    /// read, emitted in full every cycle whether or not anything changed.
    pub fn commands(&self) -> Vec<OutboundCommand> {
        let mut commands = Vec::with_capacity(self.trains.len() + self.layout.junctions().len());
        for train in &self.trains {
            commands.push(OutboundCommand::SetTrainSpeed {
                train: train.id(),
                speed: train.target_speed(),
            });
        }
        for junction in self.layout.junctions() {
            if junction.servo().is_none() {
                continue;
            }
            match junction.out_state().position() {
                Some(position) => commands.push(OutboundCommand::SetJunctionServo {
                    junction: junction.id(),
                    position,
                }),
                None => debug_assert!(false, "junction {} has a servo on a fixed face", junction.id()),
            }
        }
        commands
    }

    /// Dispatch path: sets the speed carried by the next command frames.
    pub fn set_target_speed(&mut self, train: TrainId, speed: f64) -> Result<(), LookupError> {
        match self.train_index.get(&train) {
            Some(&idx) => {
                self.trains[idx].set_target_speed(speed);
                Ok(())
            }
            None => Err(LookupError::UnknownTrain(train)),
        }
    }

    /// Dispatch path: rotates a junction's branch faces.
    pub fn set_servo(
        &mut self,
        junction: JunctionId,
        position: ServoPosition,
    ) -> Result<(), LayoutError> {
        self.layout.set_servo_state(junction, position)
    }

    /// Shortest track distance from a train to any platform of a station.
    pub fn distance_to_station(
        &self,
        train: TrainId,
        station: StationId,
    ) -> Result<f64, TopologyError> {
        let idx = match self.train_index.get(&train) {
            Some(&idx) => idx,
            None => return Err(TopologyError::Lookup(LookupError::UnknownTrain(train))),
        };
        self.layout.distance_to_platform(self.trains[idx].position(), station)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    pub fn train(&self, id: TrainId) -> Result<&Train, LookupError> {
        match self.train_index.get(&id) {
            Some(&idx) => Ok(&self.trains[idx]),
            None => Err(LookupError::UnknownTrain(id)),
        }
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Telemetry frame for this cycle, if the collector's cadence is due.
    pub fn telemetry_frame(&mut self, timestamp: u64) -> Option<TelemetryFrame> {
        self.telemetry.collect(timestamp, self.cycle, &self.trains, &self.layout, &self.stats)
    }

    /// Telemetry frame built unconditionally, for status queries.
    pub fn snapshot(&mut self, timestamp: u64) -> TelemetryFrame {
        self.telemetry.frame(timestamp, self.cycle, &self.trains, &self.layout, &self.stats)
    }
}
