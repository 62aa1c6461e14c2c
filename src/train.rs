//! Train state and movement along the layout.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::layout::{Layout, SectionId};
use crate::topology::{Position, TopologyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainId(pub u32);

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A moving unit on the layout.
///
/// `mileage` stays within `[0, length]` of the current section at every
/// observable point; moves that overrun an endpoint cross to the adjacent
/// section through the junction's active continuation.
#[derive(Debug, Clone)]
pub struct Train {
    id: TrainId,
    section: SectionId,
    section_idx: usize,
    mileage: f64,
    target_speed: f64,
}

impl Train {
    pub(crate) fn new(id: TrainId, section: SectionId, section_idx: usize, mileage: f64) -> Self {
        Self {
            id,
            section,
            section_idx,
            mileage,
            target_speed: 0.0,
        }
    }

    pub fn id(&self) -> TrainId {
        self.id
    }

    pub fn section(&self) -> SectionId {
        self.section
    }

    pub fn mileage(&self) -> f64 {
        self.mileage
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    pub fn position(&self) -> Position {
        Position::new(self.section, self.mileage)
    }

    pub(crate) fn section_index(&self) -> usize {
        self.section_idx
    }

    pub(crate) fn set_target_speed(&mut self, speed: f64) {
        self.target_speed = speed;
    }

    /// Moves the train by `delta` (negative values run backward), crossing
    /// junctions until the new mileage fits a section. A single large delta
    /// may cross several boundaries. On failure the train keeps the
    /// position it had before the event.
    pub(crate) fn advance(&mut self, layout: &Layout, delta: f64) -> Result<(), TopologyError> {
        let mut idx = self.section_idx;
        let mut mileage = self.mileage + delta;
        loop {
            let section = layout.section_at(idx);
            if mileage > section.length {
                mileage -= section.length;
                idx = layout.junction_at(section.target_idx).outgoing_section();
            } else if mileage < 0.0 {
                let junction = layout.junction_at(section.source_idx);
                match junction.incoming_section() {
                    Some(feeder) => {
                        idx = feeder;
                        mileage += layout.section_at(idx).length;
                    }
                    None => return Err(TopologyError::DeadEnd(junction.id())),
                }
            } else {
                break;
            }
        }
        let landed = layout.section_at(idx);
        debug_assert!((0.0..=landed.length).contains(&mileage));
        self.section_idx = idx;
        self.section = landed.id;
        self.mileage = mileage;
        Ok(())
    }

    /// Snaps the mileage to a surveyed point within the current section.
    pub(crate) fn snap(&mut self, mileage: f64) {
        debug_assert!(mileage >= 0.0);
        self.mileage = mileage;
    }
}
