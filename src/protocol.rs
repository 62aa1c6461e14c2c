//! Wire types and framing for the TCP boundary.
//!
//! Requests and replies travel as one JSON object per line. Outbound
//! traffic is a tagged `Frame`: the per-cycle command projection or a
//! telemetry snapshot. The handler keeps preallocated scratch buffers and
//! validates parameters before anything touches controller state.

use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use thiserror::Error;

use crate::layout::{JunctionId, SensorId, ServoPosition};
use crate::telemetry::TelemetryFrame;
use crate::train::TrainId;

pub const MAX_REQUEST_SIZE: usize = 512;
pub const MAX_REPLY_SIZE: usize = 1024;
pub const MAX_FRAME_SIZE: usize = 8192;

/// Bound on commandable train speed, in the plant's own speed unit.
pub const MAX_TARGET_SPEED: f64 = 100.0;

// A status reply embeds a telemetry frame; frames must not be the smaller
// of the two limits.
const_assert!(MAX_FRAME_SIZE >= MAX_REPLY_SIZE);
const_assert!(MAX_REQUEST_SIZE <= MAX_REPLY_SIZE);

pub type RequestBuffer = ArrayString<MAX_REQUEST_SIZE>;
pub type ReplyBuffer = ArrayString<MAX_REPLY_SIZE>;

/// One inbound client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u32,
    pub timestamp: u64,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Plant report: a train moved by `delta`. Queued for the next cycle.
    Odometry { train: TrainId, delta: f64 },
    /// Plant report: a position sensor fired. Queued for the next cycle.
    SensorFired { sensor: SensorId },
    /// Dispatch: change a train's commanded speed. Applied immediately.
    SetTargetSpeed { train: TrainId, speed: f64 },
    /// Dispatch: rotate a junction's servo. Applied immediately.
    SetServo {
        junction: JunctionId,
        position: ServoPosition,
    },
    /// Immediate snapshot of the controller state.
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: u32,
    pub timestamp: u64,
    pub status: ReplyStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    Accepted,
    Rejected,
}

/// One entry of the per-cycle command projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutboundCommand {
    SetTrainSpeed { train: TrainId, speed: f64 },
    SetJunctionServo {
        junction: JunctionId,
        position: ServoPosition,
    },
}

/// The full command projection of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub cycle: u64,
    pub timestamp: u64,
    pub commands: Vec<OutboundCommand>,
}

/// Line-delimited outbound broadcast traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Commands(CommandFrame),
    Telemetry(TelemetryFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid JSON")]
    InvalidJson,
    #[error("message exceeds buffer size")]
    MessageTooLarge,
    #[error("serialization failed")]
    SerializationError,
    #[error("non-finite value in request")]
    NonFiniteValue,
    #[error("speed exceeds the actuator bound")]
    SpeedOutOfRange,
}

#[derive(Debug)]
pub struct ProtocolHandler {
    request_buffer: RequestBuffer,
    reply_buffer: ReplyBuffer,
}

impl ProtocolHandler {
    pub fn new() -> Self {
        Self {
            request_buffer: ArrayString::new(),
            reply_buffer: ArrayString::new(),
        }
    }

    /// Parses and validates one request line.
    pub fn parse_request(&mut self, json: &str) -> Result<Request, ProtocolError> {
        if json.len() > MAX_REQUEST_SIZE {
            return Err(ProtocolError::MessageTooLarge);
        }
        self.request_buffer.clear();
        self.request_buffer
            .try_push_str(json)
            .map_err(|_| ProtocolError::MessageTooLarge)?;
        let request: Request =
            serde_json::from_str(&self.request_buffer).map_err(|_| ProtocolError::InvalidJson)?;
        Self::validate(&request)?;
        Ok(request)
    }

    /// Checks request parameters against the plant's physical limits.
    pub fn validate(request: &Request) -> Result<(), ProtocolError> {
        match request.kind {
            RequestKind::Odometry { delta, .. } => {
                if !delta.is_finite() {
                    return Err(ProtocolError::NonFiniteValue);
                }
            }
            RequestKind::SetTargetSpeed { speed, .. } => {
                if !speed.is_finite() {
                    return Err(ProtocolError::NonFiniteValue);
                }
                if speed.abs() > MAX_TARGET_SPEED {
                    return Err(ProtocolError::SpeedOutOfRange);
                }
            }
            RequestKind::SensorFired { .. } | RequestKind::SetServo { .. } | RequestKind::Status => {}
        }
        Ok(())
    }

    pub fn serialize_reply(&mut self, reply: &Reply) -> Result<&str, ProtocolError> {
        self.reply_buffer.clear();
        let json = serde_json::to_string(reply).map_err(|_| ProtocolError::SerializationError)?;
        self.reply_buffer
            .try_push_str(&json)
            .map_err(|_| ProtocolError::MessageTooLarge)?;
        Ok(&self.reply_buffer)
    }

    /// Serializes a broadcast frame; frames vary with the roster size, so
    /// this allocates instead of using a scratch buffer, but still enforces
    /// the wire bound.
    pub fn serialize_frame(frame: &Frame) -> Result<String, ProtocolError> {
        let json = serde_json::to_string(frame).map_err(|_| ProtocolError::SerializationError)?;
        if json.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::MessageTooLarge);
        }
        Ok(json)
    }

    pub fn accepted(request: &Request, timestamp: u64, message: Option<String>) -> Reply {
        Reply {
            id: request.id,
            timestamp,
            status: ReplyStatus::Accepted,
            message,
        }
    }

    pub fn rejected(id: u32, timestamp: u64, reason: &str) -> Reply {
        Reply {
            id,
            timestamp,
            status: ReplyStatus::Rejected,
            message: Some(reason.to_string()),
        }
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}
