//! A single sweep in a single direction.
//!
//! The sweep line moves along the sweep direction, stopping at obstacle
//! vertices, ports and the places where cone sides hit obstacles. Every
//! obstacle vertex (and every port) opens a cone: a wedge pointing in the
//! sweep direction, whose half-angle is half the cone angle. A cone stays open
//! until the sweep line reaches a vertex inside it, at which point we add a
//! visibility edge from the cone's apex to that vertex and close the cone.
//! Cones are also closed when an obstacle covers them completely.
//!
//! The sweep status consists of the left sides and the right sides of the open
//! cones, and the obstacle edges currently crossed by the sweep line, split
//! into the left and right boundary chains of their obstacles. Obstacles must
//! be convex, so that each of them has exactly one left and one right chain,
//! and oriented clockwise, so that walking forward along an obstacle from its
//! lowest vertex follows its left chain.

use std::collections::HashSet;

use tracing::{debug, error, trace, warn};

use crate::geom::{
    interval_intersects_ray, is_left_of, is_left_of_or_on, is_right_of_or_on, orientation,
    point_in_cone, rays_intersect_interiors, signed_doubled_triangle_area, Orientation, Point,
    DISTANCE_EPSILON, TOLERANCE,
};
use crate::order::SweepFrame;
use crate::polyline::{NodeIdx, Polyline};
use crate::visibility::{EdgeKind, VisibilityGraph};
use crate::Error;

use super::cone::{ConeIdx, ConeSide, Cones, SideIdx, SideKind};
use super::event::{EventKind, EventQueue, SweepEvent};
use super::obstacle_side::{ObstacleSide, ObstacleSideKind, VertexRef};
use super::status::{ObstacleSideTree, SideTree};
use super::ROLLBACK_LIMIT;

/// Where cones get opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SweepMode {
    /// Cones open at every obstacle vertex, every port and every port location.
    #[default]
    AllVertices,
    /// Cones open only at port locations. Obstacles still block and close
    /// cones, and ports and vertices still receive edges.
    PortLocations,
}

/// Counters describing what happened during a sweep.
///
/// Apart from `events` and `cones_created`, these are all about numerical
/// trouble: in a healthy sweep they're zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepStats {
    /// The number of events processed.
    pub events: usize,
    /// The number of cones opened.
    pub cones_created: usize,
    /// The number of cone sides that weren't where we expected them in the
    /// sweep status, and that we looked up again at an earlier sweep position.
    pub recoveries: usize,
    /// The number of cone sides that we had to find by scanning the whole
    /// sweep status.
    pub emergency_scans: usize,
    /// The number of cone sides that we couldn't find at all.
    pub lost_sides: usize,
    /// The number of times we were asked to close a cone that was already closed.
    pub redundant_cone_removals: usize,
    /// The number of cones still open when we ran out of events.
    pub open_cones_at_end: usize,
    /// The number of cones still open at the very end, after closing cones
    /// against the border.
    pub unclosed_cones: usize,
}

impl std::ops::AddAssign for SweepStats {
    fn add_assign(&mut self, other: SweepStats) {
        self.events += other.events;
        self.cones_created += other.cones_created;
        self.recoveries += other.recoveries;
        self.emergency_scans += other.emergency_scans;
        self.lost_sides += other.lost_sides;
        self.redundant_cone_removals += other.redundant_cone_removals;
        self.open_cones_at_end += other.open_cones_at_end;
        self.unclosed_cones += other.unclosed_cones;
    }
}

/// Decides what kind of edge to create for an edge ending at a port.
pub type PortEdgeCreator<'a> = &'a dyn Fn(Point, Point) -> EdgeKind;

fn default_port_edge(_: Point, _: Point) -> EdgeKind {
    EdgeKind::TollFree {
        length_multiplier: 0.0,
    }
}

/// The position of the sweep line, and where it was before its last real move.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SweepCoordinate {
    z: f64,
    previous_z: f64,
}

impl Default for SweepCoordinate {
    fn default() -> Self {
        SweepCoordinate {
            z: f64::NEG_INFINITY,
            previous_z: f64::NEG_INFINITY,
        }
    }
}

impl SweepCoordinate {
    fn set(&mut self, z: f64) {
        if z > self.z + TOLERANCE {
            self.previous_z = self.z;
        }
        self.z = z;
    }
}

/// Which boundary chain a vertex event walks along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Chain {
    Left,
    Right,
}

fn check_point(p: Point) -> Result<(), Error> {
    if p.is_nan() {
        Err(Error::NaN)
    } else if !p.is_finite() {
        Err(Error::Infinity)
    } else {
        Ok(())
    }
}

/// Sweeps a set of obstacles in one direction, adding visibility edges to a
/// [`VisibilityGraph`].
///
/// ```
/// use conesweeper::{LineSweeper, Point, Polyline, VisibilityGraph};
///
/// // A kite, listed clockwise.
/// let obstacles = [Polyline::closed([(0.0, 0.0), (10.0, 1.5), (10.5, 0.0), (10.0, -1.5)])];
/// let mut graph = VisibilityGraph::new();
/// LineSweeper::new(&obstacles, Point::new(1.0, 0.0), std::f64::consts::PI / 6.0)?
///     .calculate(&mut graph)?;
/// assert_eq!(graph.edge_count(), 2);
/// # Ok::<(), conesweeper::Error>(())
/// ```
pub struct LineSweeper<'a> {
    obstacles: &'a [Polyline],
    direction: Point,
    cone_angle: f64,
    ports: &'a [Point],
    port_locations: &'a [Point],
    border: Option<&'a mut Polyline>,
    port_edge_creator: Option<PortEdgeCreator<'a>>,
    mode: SweepMode,
}

impl std::fmt::Debug for LineSweeper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSweeper")
            .field("obstacles", &self.obstacles.len())
            .field("direction", &self.direction)
            .field("cone_angle", &self.cone_angle)
            .field("ports", &self.ports.len())
            .field("port_locations", &self.port_locations.len())
            .field("border", &self.border.is_some())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> LineSweeper<'a> {
    /// Prepares a sweep.
    ///
    /// `direction` doesn't need to be normalized, but it can't be zero.
    /// `cone_angle` is the full opening angle of every cone, in radians, and
    /// must be strictly between zero and π. Every obstacle must be a closed,
    /// clockwise, convex polyline. (A single point is fine.) The sweep only
    /// looks at the sides of an obstacle that face it, so a non-convex
    /// obstacle would let edges through its pockets; those are rejected with
    /// [`Error::NonConvexObstacle`].
    pub fn new(obstacles: &'a [Polyline], direction: Point, cone_angle: f64) -> Result<Self, Error> {
        check_point(direction)?;
        let direction = direction.normalized().ok_or(Error::DegenerateDirection)?;
        if !(cone_angle > 0.0 && cone_angle < std::f64::consts::PI) {
            return Err(Error::InvalidConeAngle);
        }
        for (i, obstacle) in obstacles.iter().enumerate() {
            if obstacle.is_empty() {
                return Err(Error::EmptyPolyline);
            }
            if !obstacle.is_closed() {
                return Err(Error::NonClosedObstacle(i));
            }
            obstacle.points().try_for_each(check_point)?;
            if !obstacle.is_clockwise() {
                return Err(Error::CounterClockwiseObstacle(i));
            }
            if !obstacle.is_convex() {
                return Err(Error::NonConvexObstacle(i));
            }
        }
        Ok(LineSweeper {
            obstacles,
            direction,
            cone_angle,
            ports: &[],
            port_locations: &[],
            border: None,
            port_edge_creator: None,
            mode: SweepMode::default(),
        })
    }

    /// Sweeps once, with everything specified up front.
    pub fn sweep(
        obstacles: &'a [Polyline],
        direction: Point,
        cone_angle: f64,
        graph: &mut VisibilityGraph,
        ports: &'a [Point],
        border: Option<&'a mut Polyline>,
    ) -> Result<SweepStats, Error> {
        let mut sweeper = LineSweeper::new(obstacles, direction, cone_angle)?.with_ports(ports);
        sweeper.border = border;
        sweeper.calculate(graph)
    }

    /// Adds ports: points that get visibility edges (and, in
    /// [`SweepMode::AllVertices`], cones) without being obstacles.
    ///
    /// Edges out of a port's cone are collected separately and added to the
    /// graph at the end, using the [port edge creator](Self::with_port_edge_creator).
    pub fn with_ports(mut self, ports: &'a [Point]) -> Self {
        self.ports = ports;
        self
    }

    /// Adds port locations: points that open cones in either mode.
    pub fn with_port_locations(mut self, port_locations: &'a [Point]) -> Self {
        self.port_locations = port_locations;
        self
    }

    /// Sets a border, which must be a closed clockwise polyline enclosing all
    /// the obstacles.
    ///
    /// Cones still open at the end of the sweep are closed against the border,
    /// with edges to points on the border. Those points get inserted into
    /// the border polyline.
    pub fn with_border(mut self, border: &'a mut Polyline) -> Self {
        self.border = Some(border);
        self
    }

    /// Chooses the kind of edge created for edges out of ports.
    ///
    /// The default creates [toll-free](EdgeKind::TollFree) edges with length
    /// multiplier zero.
    pub fn with_port_edge_creator(mut self, creator: PortEdgeCreator<'a>) -> Self {
        self.port_edge_creator = Some(creator);
        self
    }

    /// Chooses where cones get opened.
    pub fn with_mode(mut self, mode: SweepMode) -> Self {
        self.mode = mode;
        self
    }

    /// Runs the sweep, adding edges to `graph`.
    ///
    /// The only failure once the inputs are validated is a border that doesn't
    /// enclose the obstacles. The graph may have been partially filled in when
    /// that happens.
    pub fn calculate(self, graph: &mut VisibilityGraph) -> Result<SweepStats, Error> {
        self.ports.iter().copied().try_for_each(check_point)?;
        self.port_locations.iter().copied().try_for_each(check_point)?;
        if let Some(border) = self.border.as_deref() {
            border.points().try_for_each(check_point)?;
            if !border.is_closed() || border.len() < 3 || !border.is_clockwise() {
                return Err(Error::InvalidBorder);
            }
        }

        let sweep = self.new_sweep(graph);
        sweep.run(self.ports, self.port_locations, self.border)
    }

    fn new_sweep<'s>(&self, graph: &'s mut VisibilityGraph) -> Sweep<'s>
    where
        'a: 's,
    {
        Sweep {
            obstacles: self.obstacles,
            base: SweepFrame::new(self.direction, 0.0),
            coord: SweepCoordinate::default(),
            left_dir: self.direction.rotate(self.cone_angle / 2.0),
            right_dir: self.direction.rotate(-self.cone_angle / 2.0),
            mode: self.mode,
            ports: self.ports.iter().map(|p| p.bits()).collect(),
            cones: Cones::default(),
            left_sides: SideTree::default(),
            right_sides: SideTree::default(),
            left_obstacle_sides: ObstacleSideTree::default(),
            right_obstacle_sides: ObstacleSideTree::default(),
            queue: EventQueue::default(),
            enqueued: HashSet::new(),
            graph,
            port_edges: VisibilityGraph::new(),
            port_edge_creator: self.port_edge_creator,
            stats: SweepStats::default(),
        }
    }
}

/// The state of a sweep in progress.
struct Sweep<'s> {
    obstacles: &'s [Polyline],
    /// The sweep direction; its `z` is meaningless, see `coord`.
    base: SweepFrame,
    coord: SweepCoordinate,
    left_dir: Point,
    right_dir: Point,
    mode: SweepMode,
    ports: HashSet<(u64, u64)>,
    cones: Cones,
    left_sides: SideTree,
    right_sides: SideTree,
    left_obstacle_sides: ObstacleSideTree,
    right_obstacle_sides: ObstacleSideTree,
    queue: EventQueue,
    // Degenerate obstacles can make a chain walk revisit a vertex.
    enqueued: HashSet<(VertexRef, Chain)>,
    graph: &'s mut VisibilityGraph,
    port_edges: VisibilityGraph,
    port_edge_creator: Option<PortEdgeCreator<'s>>,
    stats: SweepStats,
}

fn side_orientation(side: &ConeSide, p: Point) -> Orientation {
    orientation(side.start, side.second_point(), p)
}

/// Finds a point of the segment from `left` to `right` that's inside the cone
/// with the given apex and side points, assuming the segment crosses the cone.
fn find_inside_point(mut left: Point, mut right: Point, apex: Point, left_point: Point, right_point: Point) -> Point {
    // Each round halves the segment, so this is plenty for any sane coordinates.
    const MAX_BISECTIONS: usize = 128;

    for _ in 0..MAX_BISECTIONS {
        if left.close_dist_eps(right) || point_in_cone(left, apex, left_point, right_point) {
            return left;
        }
        if point_in_cone(right, apex, left_point, right_point) {
            return right;
        }
        let mid = left.middle(right);
        if is_left_of(mid, apex, left_point) {
            left = mid;
        } else {
            right = mid;
        }
    }
    left.middle(right)
}

impl Sweep<'_> {
    fn frame(&self) -> SweepFrame {
        self.base.at(self.coord.z)
    }

    fn z_of(&self, p: Point) -> f64 {
        self.base.z_of(p)
    }

    fn all_vertices(&self) -> bool {
        self.mode == SweepMode::AllVertices
    }

    fn push(&mut self, site: Point, kind: EventKind) {
        let frame = self.frame();
        self.queue.push(&frame, SweepEvent { site, kind });
    }

    fn run(
        mut self,
        ports: &[Point],
        port_locations: &[Point],
        border: Option<&mut Polyline>,
    ) -> Result<SweepStats, Error> {
        self.init_queue(ports, port_locations);
        while let Some(event) = self.queue.pop() {
            self.process_event(event);
        }

        self.stats.open_cones_at_end = self.left_sides.len();
        if let Some(border) = border {
            self.close_remaining_cones(border)?;
        }
        self.stats.unclosed_cones = self.left_sides.len();
        self.flush_port_edges();

        debug!(
            direction = ?self.base.direction,
            events = self.stats.events,
            cones = self.stats.cones_created,
            recoveries = self.stats.recoveries,
            lost_sides = self.stats.lost_sides,
            unclosed = self.stats.unclosed_cones,
            "sweep finished"
        );
        Ok(self.stats)
    }

    fn init_queue(&mut self, ports: &[Point], port_locations: &[Point]) {
        let obstacles = self.obstacles;
        for (obstacle, poly) in obstacles.iter().enumerate() {
            let lowest = poly
                .node_indices()
                .min_by(|a, b| self.base.compare_points(poly.point(*a), poly.point(*b)));
            if let Some(node) = lowest {
                let v = VertexRef { obstacle, node };
                self.enqueued.insert((v, Chain::Left));
                self.enqueued.insert((v, Chain::Right));
                self.push(poly.point(node), EventKind::LowestVertex(v));
            }
        }
        for p in ports {
            self.push(*p, EventKind::PortObstacle);
        }
        for p in port_locations {
            self.push(*p, EventKind::PortLocation);
        }
    }

    fn process_event(&mut self, event: SweepEvent) {
        self.stats.events += 1;
        self.check_invariants();
        trace!(site = ?event.site, kind = ?event.kind, z = self.coord.z, "event");

        let site = event.site;
        match event.kind {
            EventKind::LowestVertex(v) => self.process_vertex_event(site, v, None),
            EventKind::LeftVertex(v) => self.process_vertex_event(site, v, Some(Chain::Left)),
            EventKind::RightVertex(v) => self.process_vertex_event(site, v, Some(Chain::Right)),
            EventKind::LeftIntersection { side, end_vertex } => {
                self.process_left_intersection(site, side, end_vertex)
            }
            EventKind::RightIntersection { side, end_vertex } => {
                self.process_right_intersection(site, side, end_vertex)
            }
            EventKind::ConeClosure { cone } => {
                if !self.cones.cones[cone].removed {
                    self.remove_cone(cone);
                }
                self.coord.set(self.z_of(site));
            }
            EventKind::PortObstacle => {
                self.coord.set(self.z_of(site));
                self.go_over_cones_seeing(site);
                if self.all_vertices() {
                    self.create_cone_on_vertex(site);
                }
            }
            EventKind::PortLocation => {
                self.coord.set(self.z_of(site));
                self.go_over_cones_seeing(site);
                self.create_cone_on_vertex(site);
            }
        }
    }

    // `chain` is `None` for the lowest vertex, which starts both chains.
    fn process_vertex_event(&mut self, site: Point, v: VertexRef, chain: Option<Chain>) {
        self.coord.set(self.z_of(site));
        self.go_over_cones_seeing(site);

        let obstacles = self.obstacles;
        if obstacles[v.obstacle].len() == 1 {
            // A point obstacle behaves like a port.
            if self.all_vertices() {
                self.create_cone_on_vertex(site);
            }
            return;
        }

        match chain {
            Some(Chain::Left) => self.close_cones_add_cone_at_left_vertex(site, v, v.next(obstacles)),
            Some(Chain::Right) => self.close_cones_add_cone_at_right_vertex(site, v, v.prev(obstacles)),
            None => {
                self.close_cones_add_cone_at_left_vertex(site, v, v.next(obstacles));
                self.close_cones_add_cone_at_right_vertex(site, v, v.prev(obstacles));
            }
        }
    }

    fn enqueue_vertex(&mut self, v: VertexRef, chain: Chain) {
        if !self.enqueued.insert((v, chain)) {
            trace!(?v, ?chain, "vertex already visited");
            return;
        }
        let kind = match chain {
            Chain::Left => EventKind::LeftVertex(v),
            Chain::Right => EventKind::RightVertex(v),
        };
        self.push(v.point(self.obstacles), kind);
    }

    fn enqueue_right_vertex(&mut self, v: VertexRef) {
        let obstacles = self.obstacles;
        // A vertex that is higher than the one before it belongs to the left
        // chain, which will visit it.
        if self.z_of(v.point(obstacles) - v.prev(obstacles).point(obstacles)) > TOLERANCE {
            return;
        }
        self.enqueue_vertex(v, Chain::Right);
    }

    /// Adds edges to `site` from every cone that contains it, and closes those cones.
    fn go_over_cones_seeing(&mut self, site: Point) {
        let sides = &self.cones.sides;
        let Some(right) = self
            .right_sides
            .find_first(|s| side_orientation(&sides[s], site) != Orientation::Clockwise)
            .and_then(|pos| self.right_sides.get(pos))
        else {
            return;
        };
        let cone = sides[right].cone;
        let left = self.cones.cones[cone].left_side;
        if side_orientation(&sides[left], site) == Orientation::Counterclockwise {
            return;
        }

        let frame = self.frame();
        let retry_z = self
            .z_of(sides[left].start)
            .max(self.coord.previous_z)
            .max(frame.z - ROLLBACK_LIMIT);
        let Some(pos) = self.locate(left, retry_z) else {
            return;
        };

        let mut visible = vec![cone];
        visible.extend(
            self.left_sides
                .iter()
                .skip(pos + 1)
                .map(|s| &self.cones.sides[s])
                .take_while(|s| side_orientation(s, site) != Orientation::Counterclockwise)
                .map(|s| s.cone),
        );
        for cone in visible {
            self.add_edge_and_remove_cone(cone, site);
        }
    }

    /// Finds a cone side in its tree, trying harder if the tree is out of order.
    fn locate(&mut self, side: SideIdx, retry_z: f64) -> Option<usize> {
        let tree = if self.cones.is_left(side) {
            &self.left_sides
        } else {
            &self.right_sides
        };
        let frame = self.base.at(self.coord.z);
        if let Some(pos) = tree.position(&frame, &self.cones.sides, side) {
            return Some(pos);
        }

        self.stats.recoveries += 1;
        debug!(?side, z = frame.z, retry_z, "cone side out of order, retrying");
        if let Some(pos) = tree.position(&frame.at(retry_z), &self.cones.sides, side) {
            return Some(pos);
        }

        self.stats.emergency_scans += 1;
        if let Some(pos) = tree.position_linear(side) {
            return Some(pos);
        }

        self.stats.lost_sides += 1;
        warn!(?side, z = frame.z, "lost a cone side");
        None
    }

    fn remove_side(&mut self, side: SideIdx) {
        self.cones.sides[side].removed = true;
        let retry_z = self
            .z_of(self.cones.sides[side].start)
            .max(self.coord.z - ROLLBACK_LIMIT);
        if let Some(pos) = self.locate(side, retry_z) {
            if self.cones.is_left(side) {
                self.left_sides.remove_at(pos);
            } else {
                self.right_sides.remove_at(pos);
            }
        }
    }

    fn remove_cone(&mut self, cone: ConeIdx) {
        let c = &mut self.cones.cones[cone];
        if c.removed {
            self.stats.redundant_cone_removals += 1;
            trace!(?cone, "cone already removed");
            return;
        }
        c.removed = true;
        let (left, right) = (c.left_side, c.right_side);
        self.remove_side(left);
        self.remove_side(right);
    }

    fn add_edge_and_remove_cone(&mut self, cone: ConeIdx, p: Point) {
        let apex = self.cones.cones[cone].apex;
        match self.mode {
            SweepMode::AllVertices if self.ports.contains(&apex.bits()) => self.create_port_edge(apex, p),
            SweepMode::AllVertices => {
                self.graph.add_edge(apex, p);
            }
            SweepMode::PortLocations => self.add_edge_rerouting(apex, p),
        }
        self.remove_cone(cone);
    }

    /// Adds an edge from a port, moving the port's earlier edges over to `p`.
    fn create_port_edge(&mut self, apex: Point, p: Point) {
        if let Some(v) = self.port_edges.find_vertex(apex) {
            let old: Vec<_> = self.port_edges.edges_at(v).collect();
            for e in old {
                if let Some(edge) = self.port_edges.remove_edge(e) {
                    let other = if edge.source == v { edge.target } else { edge.source };
                    let q = self.port_edges.point(other);
                    self.port_edges.add_edge(q, p);
                }
            }
        }
        self.port_edges.add_edge(apex, p);
    }

    /// Adds the edge `ab`, and moves every other edge at `a` over to `b`.
    fn add_edge_rerouting(&mut self, a: Point, b: Point) {
        let ab = self.graph.add_edge(a, b);
        let Some(av) = self.graph.find_vertex(a) else {
            return;
        };
        let old: Vec<_> = self.graph.edges_at(av).filter(|e| Some(*e) != ab).collect();
        for e in old {
            if let Some(edge) = self.graph.remove_edge(e) {
                let other = if edge.source == av { edge.target } else { edge.source };
                let c = self.graph.point(other);
                self.graph.add_edge(c, b);
            }
        }
    }

    fn flush_port_edges(&mut self) {
        let creator = self.port_edge_creator.unwrap_or(&default_port_edge);
        for (_, edge) in self.port_edges.edges() {
            let (a, b) = self.port_edges.edge_points(edge);
            self.graph.add_edge_with(a, b, creator);
        }
    }

    fn insert_cone_sides(&mut self, cone: ConeIdx) -> (usize, usize) {
        let frame = self.frame();
        let c = self.cones.cones[cone];
        let lpos = self.left_sides.insert(&frame, &self.cones.sides, c.left_side);
        let rpos = self.right_sides.insert(&frame, &self.cones.sides, c.right_side);
        (lpos, rpos)
    }

    fn create_cone_on_vertex(&mut self, site: Point) {
        let cone = self.cones.new_cone(site, self.left_dir, self.right_dir);
        self.stats.cones_created += 1;
        let (lpos, rpos) = self.insert_cone_sides(cone);
        self.look_for_intersection_with_cone_right_side(rpos);
        self.look_for_intersection_with_cone_left_side(lpos);
    }

    fn look_for_intersection_with_cone_left_side(&mut self, lpos: usize) {
        let Some(idx) = self.left_sides.get(lpos) else {
            return;
        };
        let side = self.cones.sides[idx];
        match side.kind {
            SideKind::Left => {
                let obstacle_side = self
                    .right_obstacle_sides
                    .find_last(|o| is_right_of_or_on(side.start, o.start, o.end))
                    .copied();
                if let Some(o) = obstacle_side {
                    if let Some(x) = interval_intersects_ray(o.start, o.end, side.start, side.direction) {
                        self.push(
                            x,
                            EventKind::LeftIntersection {
                                side: idx,
                                end_vertex: o.end_vertex,
                            },
                        );
                    }
                }
            }
            SideKind::Broken { end_vertex, end, .. } => {
                let Some(next) = self.left_sides.get(lpos + 1) else {
                    return;
                };
                let ns = self.cones.sides[next];
                if ns.kind == SideKind::Left {
                    if let Some(x) = interval_intersects_ray(side.start, end, ns.start, ns.direction) {
                        self.push(x, EventKind::LeftIntersection { side: next, end_vertex });
                    }
                }
            }
            SideKind::Right => {}
        }
    }

    fn look_for_intersection_with_cone_right_side(&mut self, rpos: usize) {
        let Some(idx) = self.right_sides.get(rpos) else {
            return;
        };
        let side = self.cones.sides[idx];
        match side.kind {
            SideKind::Right => {
                let obstacle_side = self
                    .left_obstacle_sides
                    .find_first(|o| !is_right_of_or_on(side.start, o.start, o.end))
                    .copied();
                if let Some(o) = obstacle_side {
                    if let Some(x) = interval_intersects_ray(o.start, o.end, side.start, side.direction) {
                        self.push(
                            x,
                            EventKind::RightIntersection {
                                side: idx,
                                end_vertex: o.end_vertex,
                            },
                        );
                    }
                }
            }
            SideKind::Broken { end_vertex, end, .. } => {
                let Some(prev) = rpos.checked_sub(1).and_then(|p| self.right_sides.get(p)) else {
                    return;
                };
                let ps = self.cones.sides[prev];
                if ps.kind == SideKind::Right {
                    if let Some(x) = interval_intersects_ray(side.start, end, ps.start, ps.direction) {
                        self.push(x, EventKind::RightIntersection { side: prev, end_vertex });
                    }
                }
            }
            SideKind::Left => {}
        }
    }

    /// After a new obstacle side starts at `start`, checks whether the nearest
    /// straight right cone side to its left runs into it.
    fn look_for_intersection_of_obstacle_side_and_right_cone_side(&mut self, start: Point, end_vertex: VertexRef) {
        let end = end_vertex.point(self.obstacles);
        let sides = &self.cones.sides;
        let Some(idx) = self
            .right_sides
            .find_last(|s| side_orientation(&sides[s], start) == Orientation::Clockwise)
            .and_then(|pos| self.right_sides.get(pos))
        else {
            return;
        };
        let side = sides[idx];
        if side.kind != SideKind::Right {
            return;
        }
        if let Some(x) = interval_intersects_ray(start, end, side.start, self.right_dir) {
            if self.z_of(x - end).abs() > DISTANCE_EPSILON {
                self.push(x, EventKind::RightIntersection { side: idx, end_vertex });
            }
        }
    }

    /// The mirror image of [`Self::look_for_intersection_of_obstacle_side_and_right_cone_side`].
    fn look_for_intersection_of_obstacle_side_and_left_cone_side(&mut self, start: Point, end_vertex: VertexRef) {
        let end = end_vertex.point(self.obstacles);
        let sides = &self.cones.sides;
        let Some(idx) = self
            .left_sides
            .find_first(|s| side_orientation(&sides[s], start) == Orientation::Counterclockwise)
            .and_then(|pos| self.left_sides.get(pos))
        else {
            return;
        };
        let side = sides[idx];
        if side.kind != SideKind::Left {
            return;
        }
        if let Some(x) = interval_intersects_ray(start, end, side.start, self.left_dir) {
            self.push(x, EventKind::LeftIntersection { side: idx, end_vertex });
        }
    }

    /// A new cone's left side is broken along an obstacle side; checks whether
    /// the first straight left side to its right runs into that obstacle side.
    fn fix_cone_left_side_intersections(&mut self, broken: SideIdx, lpos: usize) {
        let b = self.cones.sides[broken];
        let SideKind::Broken { end_vertex, end, .. } = b.kind else {
            return;
        };
        let mut pos = lpos + 1;
        while let Some(s) = self.left_sides.get(pos) {
            let side = &self.cones.sides[s];
            if !is_right_of_or_on(b.start, side.start, side.second_point()) {
                break;
            }
            pos += 1;
        }
        let Some(s) = self.left_sides.get(pos) else {
            return;
        };
        let side = self.cones.sides[s];
        if side.kind == SideKind::Left {
            if let Some(x) = interval_intersects_ray(b.start, end, side.start, side.direction) {
                self.push(x, EventKind::LeftIntersection { side: s, end_vertex });
            }
        }
    }

    fn fix_cone_right_side_intersections(&mut self, broken: SideIdx, rpos: usize) {
        let b = self.cones.sides[broken];
        let SideKind::Broken { end_vertex, end, .. } = b.kind else {
            return;
        };
        let mut pos = rpos;
        let found = loop {
            let Some(p) = pos.checked_sub(1) else {
                break None;
            };
            pos = p;
            let Some(s) = self.right_sides.get(pos) else {
                break None;
            };
            let side = &self.cones.sides[s];
            if !is_left_of_or_on(b.start, side.start, side.second_point()) {
                break Some(s);
            }
        };
        let Some(s) = found else {
            return;
        };
        let side = self.cones.sides[s];
        if side.kind == SideKind::Right {
            if let Some(x) = interval_intersects_ray(b.start, end, side.start, side.direction) {
                self.push(x, EventKind::RightIntersection { side: s, end_vertex });
            }
        }
    }

    /// In port-locations mode an obstacle side starting at a vertex never
    /// belongs to a cone, so we only check the cone side at `lpos`.
    fn fix_port_location_left_side(&mut self, start: Point, end_vertex: VertexRef, lpos: Option<usize>) {
        let Some(s) = lpos.and_then(|p| self.left_sides.get(p)) else {
            return;
        };
        let side = self.cones.sides[s];
        if side.kind == SideKind::Left {
            let end = end_vertex.point(self.obstacles);
            if let Some(x) = interval_intersects_ray(start, end, side.start, side.direction) {
                self.push(x, EventKind::LeftIntersection { side: s, end_vertex });
            }
        }
    }

    fn fix_port_location_right_side(&mut self, start: Point, end_vertex: VertexRef, rpos: Option<usize>) {
        let Some(s) = rpos.and_then(|p| self.right_sides.get(p)) else {
            return;
        };
        let side = self.cones.sides[s];
        if side.kind == SideKind::Right {
            let end = end_vertex.point(self.obstacles);
            if let Some(x) = interval_intersects_ray(start, end, side.start, side.direction) {
                self.push(x, EventKind::RightIntersection { side: s, end_vertex });
            }
        }
    }

    fn process_left_intersection(&mut self, site: Point, side: SideIdx, end_vertex: VertexRef) {
        if self.cones.sides[side].removed {
            self.coord.set(self.z_of(site));
            return;
        }
        let end = end_vertex.point(self.obstacles);
        if self.z_of(end - site).abs() < DISTANCE_EPSILON {
            // The obstacle side is perpendicular to the sweep: it covers the whole cone.
            let cone = self.cones.sides[side].cone;
            self.remove_cone(cone);
            return;
        }

        self.remove_side(side);
        self.coord.set(self.z_of(site));
        let broken = self.cones.break_side(side, site, end_vertex, end);
        let frame = self.frame();
        self.left_sides.insert(&frame, &self.cones.sides, broken);
        self.look_for_intersection_of_obstacle_side_and_left_cone_side(site, end_vertex);
        self.try_create_cone_closure(broken);
    }

    fn process_right_intersection(&mut self, site: Point, side: SideIdx, end_vertex: VertexRef) {
        if self.cones.sides[side].removed {
            self.coord.set(self.z_of(site));
            return;
        }
        let end = end_vertex.point(self.obstacles);
        self.remove_side(side);
        self.coord.set(self.z_of(site));
        let broken = self.cones.break_side(side, site, end_vertex, end);
        let frame = self.frame();
        self.right_sides.insert(&frame, &self.cones.sides, broken);
        self.look_for_intersection_of_obstacle_side_and_right_cone_side(site, end_vertex);
        self.try_create_cone_closure(broken);
    }

    /// If a broken side and the straight side opposite it meet, the cone
    /// closes there.
    fn try_create_cone_closure(&mut self, broken: SideIdx) {
        let b = self.cones.sides[broken];
        let SideKind::Broken { end, .. } = b.kind else {
            return;
        };
        let cone = self.cones.cones[b.cone];
        let (other, kind, closing) = if self.cones.is_left(broken) {
            (cone.right_side, SideKind::Right, Orientation::Clockwise)
        } else {
            (cone.left_side, SideKind::Left, Orientation::Counterclockwise)
        };
        let other = self.cones.sides[other];
        if other.kind != kind || side_orientation(&other, end) != closing {
            return;
        }
        if let Some(x) = rays_intersect_interiors(b.start, b.direction, other.start, other.direction) {
            self.push(x, EventKind::ConeClosure { cone: b.cone });
        }
    }

    /// Closes the cones whose sides cross the obstacle segment from `left` to
    /// `right`, which lies across the sweep direction.
    fn remove_cones_closed_by_segment(&mut self, left: Point, right: Point) {
        let tree = if self.z_of(left) > self.z_of(right) {
            &self.left_sides
        } else {
            &self.right_sides
        };
        let sides = &self.cones.sides;
        let Some(pos) = tree.find_first(|s| side_orientation(&sides[s], left) == Orientation::Counterclockwise)
        else {
            return;
        };
        let closed: Vec<ConeIdx> = tree
            .iter()
            .skip(pos)
            .map(|s| &sides[s])
            .take_while(|s| interval_intersects_ray(left, right, s.start, s.direction).is_some())
            .map(|s| s.cone)
            .collect();
        for cone in closed {
            self.remove_cone(cone);
        }
    }

    fn insert_obstacle_side(&mut self, side: ObstacleSide) {
        let frame = self.frame();
        match side.kind {
            ObstacleSideKind::Left => self.left_obstacle_sides.insert(&frame, side),
            ObstacleSideKind::Right => self.right_obstacle_sides.insert(&frame, side),
        };
    }

    fn remove_obstacle_side(&mut self, side: ObstacleSide) {
        let frame = self.frame();
        let retry = frame.at(self.z_of(side.start).max(frame.z - ROLLBACK_LIMIT));
        let tree = match side.kind {
            ObstacleSideKind::Left => &mut self.left_obstacle_sides,
            ObstacleSideKind::Right => &mut self.right_obstacle_sides,
        };
        let pos = tree
            .position(&frame, &side)
            .or_else(|| tree.position(&retry, &side))
            .or_else(|| tree.position_linear(&side));
        match pos {
            Some(pos) => {
                tree.remove_at(pos);
            }
            // Sides that are (nearly) perpendicular to the sweep never get inserted.
            None => trace!(start = ?side.start, end = ?side.end, "obstacle side not in the status"),
        }
    }

    fn close_cones_add_cone_at_left_vertex(&mut self, site: Point, v: VertexRef, next: VertexRef) {
        let obstacles = self.obstacles;
        let perp = self.base.perp;
        let prev = v.prev(obstacles);
        let prev_site = prev.point(obstacles);
        let next_site = next.point(obstacles);

        if (site - prev_site).dot(perp) < -DISTANCE_EPSILON {
            self.remove_cones_closed_by_segment(site, prev_site);
        }
        if (next_site - site).dot(perp) < -DISTANCE_EPSILON {
            self.remove_cones_closed_by_segment(next_site, site);
        }

        let cone_lp = site + self.left_dir;
        let cone_rp = site + self.right_dir;
        if self.z_of(site - prev_site) > DISTANCE_EPSILON {
            self.remove_obstacle_side(ObstacleSide::left(prev, obstacles));
        }
        let next_del_z = self.z_of(next_site) - self.coord.z;
        if next_del_z < -DISTANCE_EPSILON {
            self.remove_obstacle_side(ObstacleSide::right(next, obstacles));
        }

        let to_next = next_site - site;
        if next_del_z < -DISTANCE_EPSILON
            || (next_del_z.abs() <= DISTANCE_EPSILON
                && self.z_of(to_next) > 0.0
                && to_next.dot(perp) > -DISTANCE_EPSILON)
        {
            // The last vertex of the left chain.
            if self.all_vertices() {
                self.create_cone_on_vertex(site);
            }
        } else if !is_left_of_or_on(next_site, site, cone_rp) {
            // The obstacle turns right of the cone, so it doesn't block it.
            if self.all_vertices() {
                self.create_cone_on_vertex(site);
            }
            self.enqueue_vertex(next, Chain::Left);
        } else if !is_left_of_or_on(next_site, site, cone_lp) {
            // The obstacle side runs through the cone and becomes its right side.
            self.enqueue_vertex(next, Chain::Left);
            if self.all_vertices() {
                let cone = self
                    .cones
                    .new_cone_with_broken_right(site, self.left_dir, self.right_dir, next, next_site);
                self.stats.cones_created += 1;
                let (lpos, rpos) = self.insert_cone_sides(cone);
                self.look_for_intersection_with_cone_left_side(lpos);
                let right = self.cones.cones[cone].right_side;
                self.fix_cone_right_side_intersections(right, rpos);
            } else {
                let sides = &self.cones.sides;
                let rpos = self
                    .right_sides
                    .find_last(|s| side_orientation(&sides[s], site) == Orientation::Clockwise);
                self.fix_port_location_right_side(site, next, rpos);
            }
            if self.z_of(to_next) > DISTANCE_EPSILON {
                self.insert_obstacle_side(ObstacleSide::left(v, obstacles));
            }
        } else {
            self.enqueue_vertex(next, Chain::Left);
            if self.z_of(to_next) > DISTANCE_EPSILON {
                self.look_for_intersection_of_obstacle_side_and_right_cone_side(site, next);
                self.insert_obstacle_side(ObstacleSide::left(v, obstacles));
            }
        }
    }

    fn close_cones_add_cone_at_right_vertex(&mut self, site: Point, v: VertexRef, next: VertexRef) {
        let obstacles = self.obstacles;
        let perp = self.base.perp;
        let prev = v.next(obstacles);
        let prev_site = prev.point(obstacles);
        let next_site = next.point(obstacles);

        if perp.dot(site - prev_site) > DISTANCE_EPSILON {
            self.remove_cones_closed_by_segment(prev_site, site);
        }
        if perp.dot(next_site - site) > DISTANCE_EPSILON {
            self.remove_cones_closed_by_segment(site, next_site);
        }

        let cone_lp = site + self.left_dir;
        let cone_rp = site + self.right_dir;
        if self.z_of(site - prev_site) > DISTANCE_EPSILON {
            self.remove_obstacle_side(ObstacleSide::right(prev, obstacles));
        }
        if self.z_of(site - next_site) > DISTANCE_EPSILON {
            self.remove_obstacle_side(ObstacleSide::left(next, obstacles));
        }

        if self.z_of(next_site) + DISTANCE_EPSILON < self.z_of(site) {
            // The right chain turns back down, so this is its last vertex.
            if !self.all_vertices() {
                return;
            }
            self.create_cone_on_vertex(site);
        }

        if !is_right_of_or_on(next_site, site, cone_lp) {
            if self.all_vertices() {
                self.create_cone_on_vertex(site);
            }
            if is_left_of_or_on(next_site + perp, next_site, site) {
                self.enqueue_right_vertex(next);
            }
        } else if is_left_of_or_on(next_site, site, cone_rp) {
            // The obstacle side runs through the cone and becomes its left side.
            self.enqueue_right_vertex(next);
            if self.all_vertices() {
                let cone = self
                    .cones
                    .new_cone_with_broken_left(site, self.left_dir, self.right_dir, next, next_site);
                self.stats.cones_created += 1;
                let (lpos, rpos) = self.insert_cone_sides(cone);
                self.look_for_intersection_with_cone_right_side(rpos);
                let left = self.cones.cones[cone].left_side;
                self.fix_cone_left_side_intersections(left, lpos);
            } else {
                let sides = &self.cones.sides;
                let lpos = self
                    .left_sides
                    .find_first(|s| side_orientation(&sides[s], site) == Orientation::Counterclockwise);
                self.fix_port_location_left_side(site, next, lpos);
            }
            if self.z_of(next_site - site) > DISTANCE_EPSILON {
                self.insert_obstacle_side(ObstacleSide::right(v, obstacles));
            }
        } else {
            if self.z_of(next_site - site) > DISTANCE_EPSILON {
                self.look_for_intersection_of_obstacle_side_and_left_cone_side(site, next);
                self.insert_obstacle_side(ObstacleSide::right(v, obstacles));
            }
            self.enqueue_right_vertex(next);
        }
    }

    /// Closes every cone still open by connecting it to a point on the border.
    fn close_remaining_cones(&mut self, border: &mut Polyline) -> Result<(), Error> {
        let Some(mut p) = border.start() else {
            return Err(Error::InvalidBorder);
        };
        // Every step closes at least one cone.
        let mut steps = self.left_sides.len();
        while steps > 0 {
            let Some(first) = self.left_sides.get(0) else {
                break;
            };
            let cone = self.cones.sides[first].cone;
            p = self.find_border_side_crossing_right_side(border, p, cone)?;
            p = self.point_inside_cone_and_remove(border, p, cone);
            steps -= 1;
        }
        Ok(())
    }

    /// Walks along the border from `start` until finding a border side that
    /// crosses the line through the cone's right side, from its right to its
    /// left.
    fn find_border_side_crossing_right_side(
        &self,
        border: &Polyline,
        start: NodeIdx,
        cone: ConeIdx,
    ) -> Result<NodeIdx, Error> {
        let apex = self.cones.cones[cone].apex;
        let b = apex + self.right_dir;
        let sign = |node: NodeIdx| {
            let d = signed_doubled_triangle_area(apex, b, border.point(node));
            if d < 0.0 {
                1
            } else if d > 0.0 {
                -1
            } else {
                0
            }
        };

        let mut p = start;
        let mut p_sign = sign(p);
        loop {
            let pn = border.next_on_polyline(p).ok_or(Error::InvalidBorder)?;
            let pn_sign = sign(pn);
            if pn_sign - p_sign > 0 {
                return Ok(p);
            }
            p = pn;
            p_sign = pn_sign;
            if p == start {
                error!(?apex, "the border doesn't cross an open cone");
                return Err(Error::BorderDoesNotEnclose);
            }
        }
    }

    fn point_inside_cone_and_remove(&mut self, border: &mut Polyline, p: NodeIdx, cone: ConeIdx) -> NodeIdx {
        let Some(pn) = border.next_on_polyline(p) else {
            return p;
        };
        let (pp, pnp) = (border.point(p), border.point(pn));
        let apex = self.cones.cones[cone].apex;
        let inside = find_inside_point(pp, pnp, apex, apex + self.left_dir, apex + self.right_dir);

        let (node, point) = if inside.close_dist_eps(pp) {
            // Stay at p: the next cone may cross the same border side.
            (p, pp)
        } else if inside.close_dist_eps(pnp) {
            (pn, pnp)
        } else {
            (border.insert_after(p, inside), inside)
        };
        self.add_edge_and_remove_cone(cone, point);
        self.add_edges_and_remove_remaining_cones_by_point(point);
        node
    }

    fn add_edges_and_remove_remaining_cones_by_point(&mut self, point: Point) {
        let cones: Vec<ConeIdx> = self
            .left_sides
            .iter()
            .map(|s| &self.cones.sides[s])
            .take_while(|s| is_right_of_or_on(point, s.start, s.second_point()))
            .map(|s| s.cone)
            .collect();
        for cone in cones {
            self.add_edge_and_remove_cone(cone, point);
        }
    }

    #[cfg(any(test, feature = "slow-asserts"))]
    fn check_invariants(&self) {
        // Once a side is lost, the trees are known to be inconsistent.
        if self.stats.lost_sides > 0 {
            return;
        }
        assert_eq!(self.left_sides.len(), self.right_sides.len());
        for s in self.left_sides.iter() {
            let side = &self.cones.sides[s];
            assert!(!side.removed, "removed side {s:?} in the left tree");
            let cone = &self.cones.cones[side.cone];
            assert!(!cone.removed, "side {s:?} of removed cone {:?}", side.cone);
            assert_eq!(cone.left_side, s);
            assert!(self.right_sides.position_linear(cone.right_side).is_some());
        }
        for s in self.right_sides.iter() {
            assert!(!self.cones.sides[s].removed, "removed side {s:?} in the right tree");
        }
    }

    #[cfg(not(any(test, feature = "slow-asserts")))]
    fn check_invariants(&self) {}
}
