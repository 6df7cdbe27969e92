#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
#[cfg(feature = "debug-svg")]
pub mod debug_svg;
mod geom;
mod num;
pub mod order;
pub mod polyline;
mod spanner;
pub mod sweep;
pub mod visibility;

#[cfg(feature = "generators")]
pub mod generators;

// pub so that we can use it in fuzz tests, but it's really private
#[doc(hidden)]
pub mod treevec;

pub use geom::{
    interval_intersects_ray, is_left_of, is_left_of_or_on, is_right_of, is_right_of_or_on,
    orientation, point_in_cone, rays_intersect_interiors, signed_doubled_triangle_area,
    Orientation, Point, DISTANCE_EPSILON, INTERSECTION_EPSILON, SQUARE_OF_DISTANCE_EPSILON,
    TOLERANCE,
};
pub use polyline::Polyline;
pub use spanner::{ConeSpanner, ConeSpannerOutput};
pub use sweep::{LineSweeper, PortEdgeCreator, SweepMode, SweepStats, ROLLBACK_LIMIT};
pub use visibility::{EdgeIdx, EdgeKind, VertexIdx, VisibilityEdge, VisibilityGraph};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The inputs to a sweep were faulty, or the sweep couldn't finish.
pub enum Error {
    /// At least one of the inputs was infinite.
    Infinity,
    /// At least one of the inputs was not a number.
    NaN,
    /// The cone angle wasn't strictly between zero and π.
    InvalidConeAngle,
    /// The sweep direction was too short to have a direction.
    DegenerateDirection,
    /// The obstacle with this index wasn't a closed polyline.
    NonClosedObstacle(usize),
    /// The obstacle with this index was oriented counter-clockwise.
    CounterClockwiseObstacle(usize),
    /// The obstacle with this index wasn't convex.
    NonConvexObstacle(usize),
    /// One of the obstacles had no points.
    EmptyPolyline,
    /// The border wasn't a closed, clockwise polyline with at least three points.
    InvalidBorder,
    /// A cone was still open at the end of the sweep, but the border never crossed it.
    BorderDoesNotEnclose,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Infinity => write!(f, "one of the inputs was infinite"),
            Error::NaN => write!(f, "one of the inputs had a NaN"),
            Error::InvalidConeAngle => write!(f, "the cone angle must be between 0 and pi"),
            Error::DegenerateDirection => write!(f, "the sweep direction was zero"),
            Error::NonClosedObstacle(i) => write!(f, "obstacle {i} was not closed"),
            Error::CounterClockwiseObstacle(i) => write!(f, "obstacle {i} was counter-clockwise"),
            Error::NonConvexObstacle(i) => write!(f, "obstacle {i} was not convex"),
            Error::EmptyPolyline => write!(f, "one of the obstacles was empty"),
            Error::InvalidBorder => write!(f, "the border must be closed, clockwise, and have at least 3 points"),
            Error::BorderDoesNotEnclose => write!(f, "the border doesn't enclose the obstacles"),
        }
    }
}

impl std::error::Error for Error {}
