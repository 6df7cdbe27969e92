//! Sweep events and the queue that orders them.
//!
//! Events are popped in order of their position along the sweep direction,
//! then from left to right, then in the order they were pushed.

use std::collections::BTreeMap;

use tracing::debug;

use crate::geom::Point;
use crate::num::CheapOrderedFloat;
use crate::order::SweepFrame;
use crate::ROLLBACK_LIMIT;

use super::cone::{ConeIdx, SideIdx};
use super::obstacle_side::VertexRef;

/// The different things that can happen during a sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventKind {
    /// The lowest vertex of an obstacle, where both of its boundary chains start.
    LowestVertex(VertexRef),
    /// A vertex on the left boundary chain of an obstacle.
    LeftVertex(VertexRef),
    /// A vertex on the right boundary chain of an obstacle.
    RightVertex(VertexRef),
    /// A port, which is a point obstacle.
    PortObstacle,
    /// A port location, from which cones start in port-locations mode.
    PortLocation,
    /// A straight left cone side hits an obstacle edge that ends at `end_vertex`.
    LeftIntersection {
        /// The cone side.
        side: SideIdx,
        /// The end of the obstacle edge.
        end_vertex: VertexRef,
    },
    /// A straight right cone side hits an obstacle edge that ends at `end_vertex`.
    RightIntersection {
        /// The cone side.
        side: SideIdx,
        /// The end of the obstacle edge.
        end_vertex: VertexRef,
    },
    /// The two sides of a cone meet, so the cone disappears.
    ConeClosure {
        /// The cone to close.
        cone: ConeIdx,
    },
}

/// An event, at a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepEvent {
    /// Where the event happens.
    pub site: Point,
    /// What happens.
    pub kind: EventKind,
}

type Key = (CheapOrderedFloat, CheapOrderedFloat, u64);

/// A priority queue of sweep events.
///
/// Events are popped in sweep order: by their coordinate along the sweep
/// direction, then along the perpendicular direction. Events at the same point
/// come out in the order they were pushed.
#[derive(Clone, Debug)]
pub struct EventQueue {
    events: BTreeMap<Key, SweepEvent>,
    next_seq: u64,
    last_popped_z: f64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            events: BTreeMap::new(),
            next_seq: 0,
            last_popped_z: f64::NEG_INFINITY,
        }
    }
}

impl EventQueue {
    /// Adds an event.
    pub fn push(&mut self, frame: &SweepFrame, event: SweepEvent) {
        let z = frame.z_of(event.site);
        if z < self.last_popped_z - ROLLBACK_LIMIT {
            // It will still be processed next, just a little late.
            debug!(z, sweep_z = self.last_popped_z, "event behind the sweep line");
        }
        let key = (z.into(), frame.perp_of(event.site).into(), self.next_seq);
        self.next_seq += 1;
        self.events.insert(key, event);
    }

    /// Removes and returns the first event in sweep order.
    pub fn pop(&mut self) -> Option<SweepEvent> {
        let ((z, _, _), event) = self.events.pop_first()?;
        self.last_popped_z = z.into_inner();
        Some(event)
    }

    /// The number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_sweep_order() {
        let frame = SweepFrame::new(Point::new(0.0, 1.0), 0.0);
        let mut queue = EventQueue::default();
        let ev = |x, y| SweepEvent {
            site: Point::new(x, y),
            kind: EventKind::PortObstacle,
        };
        queue.push(&frame, ev(5.0, 1.0));
        queue.push(&frame, ev(-5.0, 1.0));
        queue.push(&frame, ev(0.0, -1.0));
        queue.push(&frame, ev(-5.0, 1.0));
        assert_eq!(queue.len(), 4);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|e| e.site).collect();
        // Up is the sweep direction, so smaller y comes first and then
        // smaller x (the perpendicular direction points right).
        assert_eq!(
            order,
            vec![
                Point::new(0.0, -1.0),
                Point::new(-5.0, 1.0),
                Point::new(-5.0, 1.0),
                Point::new(5.0, 1.0)
            ]
        );
        assert!(queue.is_empty());
    }
}
