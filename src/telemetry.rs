//! Periodic state snapshots for monitoring clients.
//!
//! The collector owns a sequence counter and a cadence: `collect` produces
//! a frame every N cycles, `frame` produces one unconditionally for status
//! queries. Frames are pure projections of controller state.

use serde::{Deserialize, Serialize};

use crate::layout::{JunctionId, Layout, SectionId, ServoId, ServoState};
use crate::train::{Train, TrainId};

/// Default cadence: one frame every ten reconciliation cycles.
pub const DEFAULT_EMIT_EVERY: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainStatus {
    pub train: TrainId,
    pub section: SectionId,
    pub mileage: f64,
    pub target_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionStatus {
    pub junction: JunctionId,
    pub servo: Option<ServoId>,
    pub out_state: ServoState,
    pub in_state: ServoState,
}

/// Running totals across the controller's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerStats {
    pub cycles: u64,
    pub odometry_applied: u64,
    pub corrections_applied: u64,
    pub corrections_ignored: u64,
    pub failed_events: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub cycle: u64,
    pub sequence: u32,
    pub timestamp: u64,
    pub trains: Vec<TrainStatus>,
    pub junctions: Vec<JunctionStatus>,
    pub stats: ControllerStats,
}

#[derive(Debug)]
pub struct TelemetryCollector {
    sequence: u32,
    emit_every: u64,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::with_cadence(DEFAULT_EMIT_EVERY)
    }

    /// A collector emitting every `emit_every` cycles; 1 means every cycle.
    pub fn with_cadence(emit_every: u64) -> Self {
        debug_assert!(emit_every > 0);
        Self {
            sequence: 0,
            emit_every: emit_every.max(1),
        }
    }

    /// A frame for this cycle when the cadence is due, `None` otherwise.
    pub fn collect(
        &mut self,
        timestamp: u64,
        cycle: u64,
        trains: &[Train],
        layout: &Layout,
        stats: &ControllerStats,
    ) -> Option<TelemetryFrame> {
        if cycle % self.emit_every == 0 {
            Some(self.frame(timestamp, cycle, trains, layout, stats))
        } else {
            None
        }
    }

    /// Builds a frame unconditionally, advancing the sequence counter.
    pub fn frame(
        &mut self,
        timestamp: u64,
        cycle: u64,
        trains: &[Train],
        layout: &Layout,
        stats: &ControllerStats,
    ) -> TelemetryFrame {
        self.sequence = self.sequence.wrapping_add(1);
        TelemetryFrame {
            cycle,
            sequence: self.sequence,
            timestamp,
            trains: trains
                .iter()
                .map(|train| TrainStatus {
                    train: train.id(),
                    section: train.section(),
                    mileage: train.mileage(),
                    target_speed: train.target_speed(),
                })
                .collect(),
            junctions: layout
                .junctions()
                .iter()
                .map(|junction| JunctionStatus {
                    junction: junction.id(),
                    servo: junction.servo(),
                    out_state: junction.out_state(),
                    in_state: junction.in_state(),
                })
                .collect(),
            stats: stats.clone(),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;

    #[test]
    fn collect_honors_the_cadence() {
        let (layout, trains) = sample::passing_loop_plan().build().unwrap();
        let stats = ControllerStats::default();
        let mut collector = TelemetryCollector::with_cadence(3);
        assert!(collector.collect(0, 1, &trains, &layout, &stats).is_none());
        assert!(collector.collect(0, 2, &trains, &layout, &stats).is_none());
        let frame = collector.collect(0, 3, &trains, &layout, &stats).unwrap();
        assert_eq!(frame.cycle, 3);
        assert_eq!(frame.sequence, 1);
    }

    #[test]
    fn frames_carry_every_train_and_junction() {
        let (layout, trains) = sample::passing_loop_plan().build().unwrap();
        let stats = ControllerStats::default();
        let mut collector = TelemetryCollector::new();
        let frame = collector.frame(42, 7, &trains, &layout, &stats);
        assert_eq!(frame.timestamp, 42);
        assert_eq!(frame.trains.len(), trains.len());
        assert_eq!(frame.junctions.len(), layout.junctions().len());
        let second = collector.frame(43, 8, &trains, &layout, &stats);
        assert_eq!(second.sequence, frame.sequence + 1);
    }

    #[test]
    fn frames_serialize_as_json() {
        let (layout, trains) = sample::passing_loop_plan().build().unwrap();
        let stats = ControllerStats::default();
        let mut collector = TelemetryCollector::new();
        let frame = collector.frame(1, 1, &trains, &layout, &stats);
        let json = serde_json::to_string(&frame).unwrap();
        let parsed: TelemetryFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }
}
