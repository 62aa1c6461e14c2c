//! # Railyard
//!
//! A live model of a physical model-railway layout: the junction/section
//! track graph, switch positions, and moving-train positions, reconciled
//! each control cycle against odometry deltas and discrete position
//! sensors from the plant.
//!
//! ## Features
//!
//! - **Track topology**: directed section graph with switchable junctions
//!   and signed distance queries across branching track
//! - **Position reconciliation**: per-cycle fusion of odometry with sensor
//!   truth, with per-event error reporting
//! - **Command projection**: speed and servo commands emitted once per
//!   cycle from commanded state
//! - **JSON-lines protocol**: request/reply plus broadcast frames over TCP
//! - **Telemetry**: periodic snapshots of trains, junctions, and counters
//!
//! ## Quick Start
//!
//! ```rust
//! use railyard::{sample, LayoutController, TrainId};
//!
//! let plan = sample::passing_loop_plan();
//! let mut controller = LayoutController::from_plan(&plan).unwrap();
//!
//! // Plant feedback accumulates between cycles.
//! controller.push_odometry(TrainId(0), 12.5).unwrap();
//!
//! // One reconciliation pass, then the command projection.
//! let report = controller.reconcile();
//! assert!(report.is_clean());
//! let commands = controller.commands();
//! assert_eq!(commands.len(), 3); // two trains, one servo junction
//! ```
//!
//! ## Architecture
//!
//! - [`layout`] - junction/section arenas, plan assembly, validation
//! - [`topology`] - signed distance queries over the track graph
//! - [`train`] - train state and boundary-crossing movement
//! - [`controller`] - the per-cycle reconciliation loop
//! - [`protocol`] - wire types and request handling
//! - [`telemetry`] - periodic state snapshots
//! - [`plan`] - serializable layout definition records
//! - [`sample`] - the built-in passing-loop demonstration layout

#![deny(warnings)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]
#![allow(clippy::cast_possible_truncation)]

pub mod controller;
pub mod layout;
pub mod plan;
pub mod protocol;
pub mod sample;
pub mod telemetry;
pub mod topology;
pub mod train;

// Re-export main public types for convenience
pub use controller::{CycleReport, LayoutController};
pub use layout::{JunctionId, Layout, LayoutError, LookupError, SectionId, SensorId, ServoId, ServoPosition, ServoState, StationId};
pub use plan::TrackPlan;
pub use protocol::{Frame, OutboundCommand, ProtocolHandler, Reply, Request, RequestKind};
pub use telemetry::{TelemetryCollector, TelemetryFrame};
pub use topology::{Position, TopologyError};
pub use train::{Train, TrainId};
