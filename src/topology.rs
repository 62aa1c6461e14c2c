//! Distance queries over the track graph.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{Continuation, JunctionId, Layout, LookupError, SectionId, StationId};

/// A point on the track: a section plus an offset from its source end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub section: SectionId,
    pub mileage: f64,
}

impl Position {
    pub fn new(section: SectionId, mileage: f64) -> Self {
        Self { section, mileage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("no forward path from section {from} to section {to}")]
    Unreachable { from: SectionId, to: SectionId },
    #[error("no reachable platform for station {0}")]
    UnreachableStation(StationId),
    #[error("junction {0} has no section feeding into it")]
    DeadEnd(JunctionId),
}

impl Layout {
    /// Signed distance from `from` to `to` along the track.
    ///
    /// Within a single section this is the raw offset `to.mileage -
    /// from.mileage` and may be negative. Across sections the walk follows
    /// each target junction forward, accumulating section lengths. A branch
    /// face is resolved by computing the distance via both continuations
    /// and taking the shorter one, regardless of where the servo currently
    /// points: the query asks about the track, not about the switch plan.
    pub fn distance(&self, from: Position, to: Position) -> Result<f64, TopologyError> {
        let from_idx = self.section_index_of(from.section)?;
        let to_idx = self.section_index_of(to.section)?;
        let depth = self.junctions().len();
        match self.walk(from_idx, from.mileage, to_idx, to.mileage, from_idx, depth) {
            Some(distance) => Ok(distance),
            None => Err(TopologyError::Unreachable {
                from: from.section,
                to: to.section,
            }),
        }
    }

    /// Shortest distance from `from` to any platform of `station`.
    ///
    /// Platforms the forward walk cannot reach are skipped; the query only
    /// fails when the station has no reachable platform at all.
    pub fn distance_to_platform(
        &self,
        from: Position,
        station: StationId,
    ) -> Result<f64, TopologyError> {
        let mut best: Option<f64> = None;
        for (section, position) in self.platforms_of(station)? {
            match self.distance(from, Position::new(section, position)) {
                Ok(distance) => {
                    best = Some(match best {
                        Some(current) => current.min(distance),
                        None => distance,
                    });
                }
                Err(TopologyError::Unreachable { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        match best {
            Some(distance) => Ok(distance),
            None => Err(TopologyError::UnreachableStation(station)),
        }
    }

    /// Forward walk from `start` toward `target`, returning the distance
    /// from `from_mileage` in `start` to `to_mileage` in `target`, or
    /// `None` when this path never reaches the target.
    ///
    /// `origin` is the section the outermost query started from: advancing
    /// back into it means the walk has closed a full loop. `depth` bounds
    /// branch recursion and a hop counter bounds each walk, so malformed
    /// graphs terminate instead of spinning.
    fn walk(
        &self,
        start: usize,
        from_mileage: f64,
        target: usize,
        to_mileage: f64,
        origin: usize,
        depth: usize,
    ) -> Option<f64> {
        let mut accumulated = 0.0;
        let mut current = start;
        let mut hops = 0usize;
        while current != target {
            let section = self.section_at(current);
            accumulated += section.length;
            match self.junction_at(section.target_idx).outbound {
                Continuation::Fixed(next) => current = next,
                Continuation::Branch { straight, curve } => {
                    if depth == 0 {
                        return None;
                    }
                    let via_straight =
                        self.walk(straight, 0.0, target, to_mileage, origin, depth - 1);
                    let via_curve = self.walk(curve, 0.0, target, to_mileage, origin, depth - 1);
                    let best = match (via_straight, via_curve) {
                        (Some(a), Some(b)) => a.min(b),
                        (Some(a), None) => a,
                        (None, Some(b)) => b,
                        (None, None) => return None,
                    };
                    return Some(accumulated - from_mileage + best);
                }
            }
            if current == origin {
                return None;
            }
            hops += 1;
            if hops > self.sections().len() {
                return None;
            }
        }
        Some(accumulated - from_mileage + to_mileage)
    }
}
