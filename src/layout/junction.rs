use serde::{Deserialize, Serialize};
use std::fmt;

use super::{JunctionId, ServoId, StationId};

/// Discrete state of one face of a junction. `NoServo` marks a fixed face
/// with a single continuation and nothing to actuate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServoState {
    NoServo,
    Straight,
    Curve,
}

impl ServoState {
    /// The commandable position this state corresponds to, if any.
    pub fn position(self) -> Option<ServoPosition> {
        match self {
            ServoState::NoServo => None,
            ServoState::Straight => Some(ServoPosition::Straight),
            ServoState::Curve => Some(ServoPosition::Curve),
        }
    }
}

impl fmt::Display for ServoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoState::NoServo => write!(f, "fixed"),
            ServoState::Straight => write!(f, "straight"),
            ServoState::Curve => write!(f, "curve"),
        }
    }
}

/// A switch position that can be commanded on a branch face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServoPosition {
    Straight,
    Curve,
}

impl From<ServoPosition> for ServoState {
    fn from(position: ServoPosition) -> Self {
        match position {
            ServoPosition::Straight => ServoState::Straight,
            ServoPosition::Curve => ServoState::Curve,
        }
    }
}

impl fmt::Display for ServoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoPosition::Straight => write!(f, "straight"),
            ServoPosition::Curve => write!(f, "curve"),
        }
    }
}

/// One resolved face of a junction. Slots hold dense indices into the
/// owning layout's section arena, wired during build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Fixed(usize),
    Branch { straight: usize, curve: usize },
}

impl Continuation {
    pub fn is_branch(self) -> bool {
        matches!(self, Continuation::Branch { .. })
    }

    pub(crate) fn resolve(self, state: ServoState) -> usize {
        match (self, state) {
            (Continuation::Fixed(section), _) => section,
            (Continuation::Branch { straight, .. }, ServoState::Straight) => straight,
            (Continuation::Branch { curve, .. }, ServoState::Curve) => curve,
            (Continuation::Branch { straight, .. }, ServoState::NoServo) => {
                debug_assert!(false, "branch face resolved with a fixed state");
                straight
            }
        }
    }
}

/// Names the side of a junction a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Outbound,
    Inbound,
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Face::Outbound => write!(f, "outbound"),
            Face::Inbound => write!(f, "inbound"),
        }
    }
}

/// A switch point in the track graph.
///
/// The outbound face always resolves to a section; the inbound face is
/// absent on junctions nothing feeds into. `servo` names the physical
/// actuator when one is mounted; branch faces without a servo are switched
/// logically but never emit hardware commands.
#[derive(Debug, Clone)]
pub struct Junction {
    pub(crate) id: JunctionId,
    pub(crate) servo: Option<ServoId>,
    pub(crate) station: Option<StationId>,
    pub(crate) out_state: ServoState,
    pub(crate) in_state: ServoState,
    pub(crate) outbound: Continuation,
    pub(crate) inbound: Option<Continuation>,
}

impl Junction {
    pub fn id(&self) -> JunctionId {
        self.id
    }

    pub fn servo(&self) -> Option<ServoId> {
        self.servo
    }

    pub fn station(&self) -> Option<StationId> {
        self.station
    }

    pub fn out_state(&self) -> ServoState {
        self.out_state
    }

    pub fn in_state(&self) -> ServoState {
        self.in_state
    }

    pub fn outbound(&self) -> Continuation {
        self.outbound
    }

    pub fn inbound(&self) -> Option<Continuation> {
        self.inbound
    }

    /// True when at least one face can be switched.
    pub fn is_switchable(&self) -> bool {
        self.outbound.is_branch()
            || matches!(self.inbound, Some(Continuation::Branch { .. }))
    }

    pub(crate) fn outgoing_section(&self) -> usize {
        self.outbound.resolve(self.out_state)
    }

    pub(crate) fn incoming_section(&self) -> Option<usize> {
        self.inbound.map(|continuation| continuation.resolve(self.in_state))
    }
}
