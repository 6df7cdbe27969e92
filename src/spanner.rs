use std::f64::consts::PI;

use tracing::debug;

use crate::geom::{Point, TOLERANCE};
use crate::polyline::Polyline;
use crate::sweep::{LineSweeper, SweepMode, SweepStats};
use crate::visibility::{EdgeKind, VisibilityGraph};
use crate::Error;

/// Builds a visibility graph by sweeping in enough directions that every cone
/// direction is covered once.
///
/// ```
/// use conesweeper::{ConeSpanner, Polyline};
///
/// let kite = Polyline::closed([(0.0, 0.0), (10.0, 1.5), (10.5, 0.0), (10.0, -1.5)]);
/// let border = Polyline::bounding_box_border(std::slice::from_ref(&kite), 5.0).unwrap();
/// let out = ConeSpanner::new([kite], std::f64::consts::PI / 6.0)
///     .with_border(border)
///     .calculate()?;
/// assert_eq!(out.directions.len(), 12);
/// assert_eq!(out.stats.unclosed_cones, 0);
/// # Ok::<(), conesweeper::Error>(())
/// ```
pub struct ConeSpanner {
    obstacles: Vec<Polyline>,
    cone_angle: f64,
    ports: Vec<Point>,
    port_locations: Vec<Point>,
    border: Option<Polyline>,
    bidirectional: bool,
    mode: SweepMode,
    port_edge_creator: Option<Box<dyn Fn(Point, Point) -> EdgeKind>>,
}

impl std::fmt::Debug for ConeSpanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConeSpanner")
            .field("obstacles", &self.obstacles)
            .field("cone_angle", &self.cone_angle)
            .field("ports", &self.ports)
            .field("port_locations", &self.port_locations)
            .field("border", &self.border)
            .field("bidirectional", &self.bidirectional)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Everything produced by [`ConeSpanner::calculate`].
#[derive(Clone, Debug)]
pub struct ConeSpannerOutput {
    /// The edges found by all the sweeps together.
    pub graph: VisibilityGraph,
    /// The sweep statistics, summed over all the sweeps.
    pub stats: SweepStats,
    /// The border, with every point where a cone was closed against it.
    pub border: Option<Polyline>,
    /// The sweep directions, in the order they were swept.
    pub directions: Vec<Point>,
}

impl ConeSpanner {
    /// Creates a spanner for some obstacles.
    ///
    /// Unlike [`LineSweeper`], this accepts counter-clockwise obstacles: they
    /// get reversed. They still need to be convex, or
    /// [`ConeSpanner::calculate`] fails with [`Error::NonConvexObstacle`].
    pub fn new(obstacles: impl IntoIterator<Item = Polyline>, cone_angle: f64) -> Self {
        let obstacles = obstacles
            .into_iter()
            .map(|o| if o.is_clockwise() { o } else { o.reversed() })
            .collect();
        ConeSpanner {
            obstacles,
            cone_angle,
            ports: Vec::new(),
            port_locations: Vec::new(),
            border: None,
            bidirectional: false,
            mode: SweepMode::AllVertices,
            port_edge_creator: None,
        }
    }

    /// Adds ports. See [`LineSweeper::with_ports`].
    pub fn with_ports(mut self, ports: impl IntoIterator<Item = Point>) -> Self {
        self.ports.extend(ports);
        self
    }

    /// Adds port locations, and switches to [`SweepMode::PortLocations`].
    pub fn with_port_locations(mut self, port_locations: impl IntoIterator<Item = Point>) -> Self {
        self.port_locations.extend(port_locations);
        self.mode = SweepMode::PortLocations;
        self
    }

    /// Sets the border. One border is shared by all the sweeps, so the output
    /// border has the closing points of every sweep.
    pub fn with_border(mut self, border: Polyline) -> Self {
        self.border = Some(border);
        self
    }

    /// If set, only sweeps through half the directions but sweeps each of them
    /// forwards and backwards.
    pub fn bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    /// Chooses the kind of edge created for edges out of ports.
    pub fn with_port_edge_creator(mut self, creator: impl Fn(Point, Point) -> EdgeKind + 'static) -> Self {
        self.port_edge_creator = Some(Box::new(creator));
        self
    }

    /// The directions that [`ConeSpanner::calculate`] will sweep in.
    ///
    /// The first one points a half-cone clockwise of straight up, and the
    /// rest go counter-clockwise in steps of the cone angle.
    pub fn directions(&self) -> Result<Vec<Point>, Error> {
        let angle = self.cone_angle;
        if !(angle > 0.0 && angle < PI) {
            return Err(Error::InvalidConeAngle);
        }
        let half_turns = if self.bidirectional { 1.0 } else { 2.0 };
        let limit = half_turns * PI * (1.0 - TOLERANCE);
        let mut ret = Vec::new();
        let mut i = 0;
        while (i as f64) * angle < limit {
            let theta = PI / 2.0 - angle / 2.0 + i as f64 * angle;
            let dir = Point::new(theta.cos(), theta.sin());
            ret.push(dir);
            if self.bidirectional {
                ret.push(-dir);
            }
            i += 1;
        }
        Ok(ret)
    }

    /// Runs all the sweeps.
    pub fn calculate(&self) -> Result<ConeSpannerOutput, Error> {
        let directions = self.directions()?;
        let mut graph = VisibilityGraph::new();
        let mut stats = SweepStats::default();
        let mut border = self.border.clone();

        for &dir in &directions {
            let mut sweeper = LineSweeper::new(&self.obstacles, dir, self.cone_angle)?
                .with_ports(&self.ports)
                .with_port_locations(&self.port_locations)
                .with_mode(self.mode);
            if let Some(creator) = &self.port_edge_creator {
                sweeper = sweeper.with_port_edge_creator(&**creator);
            }
            if let Some(border) = border.as_mut() {
                sweeper = sweeper.with_border(border);
            }
            stats += sweeper.calculate(&mut graph)?;
        }

        debug!(
            sweeps = directions.len(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "cone spanner finished"
        );
        Ok(ConeSpannerOutput {
            graph,
            stats,
            border,
            directions,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn kite() -> Polyline {
        Polyline::closed([(0.0, 0.0), (10.0, 1.5), (10.5, 0.0), (10.0, -1.5)])
    }

    #[test]
    fn directions() {
        let spanner = ConeSpanner::new([kite()], PI / 6.0);
        let dirs = spanner.directions().unwrap();
        assert_eq!(dirs.len(), 12);
        let first = (75.0f64).to_radians();
        assert!(dirs[0].close_dist_eps(Point::new(first.cos(), first.sin())));

        let dirs = spanner.bidirectional(true).directions().unwrap();
        assert_eq!(dirs.len(), 12);
        for pair in dirs.chunks(2) {
            assert_eq!(pair[1], -pair[0]);
        }

        // 2π isn't a multiple of 0.7, so the last cone overlaps the first.
        let dirs = ConeSpanner::new([kite()], 0.7).directions().unwrap();
        assert_eq!(dirs.len(), 9);
    }

    #[test]
    fn bad_angle() {
        assert_matches!(
            ConeSpanner::new([kite()], 0.0).calculate(),
            Err(Error::InvalidConeAngle)
        );
        assert_matches!(
            ConeSpanner::new([kite()], f64::NAN).calculate(),
            Err(Error::InvalidConeAngle)
        );
    }

    #[test]
    fn orientation_does_not_matter() {
        let cw = ConeSpanner::new([kite()], PI / 6.0).calculate().unwrap();
        let ccw = ConeSpanner::new([kite().reversed()], PI / 6.0).calculate().unwrap();
        assert_eq!(cw.graph.edge_count(), ccw.graph.edge_count());
        assert_eq!(cw.stats, ccw.stats);
    }

    #[test]
    fn rejects_non_convex() {
        let ell = Polyline::closed([
            (0.0, 0.0),
            (0.0, 10.0),
            (3.0, 10.0),
            (3.0, 3.0),
            (10.0, 3.0),
            (10.0, 0.0),
        ]);
        let border = Polyline::bounding_box_border(std::slice::from_ref(&ell), 5.0).unwrap();
        assert_matches!(
            ConeSpanner::new([kite(), ell.clone()], PI / 12.0)
                .with_border(border)
                .calculate(),
            Err(Error::NonConvexObstacle(1))
        );
        // Reversing it doesn't help.
        assert_matches!(
            ConeSpanner::new([ell.reversed()], PI / 12.0).calculate(),
            Err(Error::NonConvexObstacle(0))
        );
    }

    #[test]
    fn kite_in_a_box() {
        let border = Polyline::bounding_box_border(&[kite()], 5.0).unwrap();
        let out = ConeSpanner::new([kite()], PI / 6.0)
            .with_border(border)
            .calculate()
            .unwrap();
        assert_eq!(out.stats.unclosed_cones, 0);
        assert!(out.stats.open_cones_at_end > 0);

        let border = out.border.unwrap();
        assert!(border.len() > 4);
        assert!(border.is_clockwise());
        // Every kite vertex sees something in some direction.
        for v in kite().points() {
            let idx = out.graph.find_vertex(v).unwrap();
            assert!(out.graph.vertex(idx).degree() > 0);
        }
    }
}
