//! Drawing sweep inputs and outputs as SVG, for looking at by eye.

use svg::node::element::{path::Data, Circle, Group, Line, Path};
use svg::Document;

use crate::{EdgeKind, Point, Polyline, VisibilityGraph};

fn polyline_data(poly: &Polyline) -> Data {
    let mut data = Data::new();
    for (i, p) in poly.points().enumerate() {
        data = if i == 0 {
            data.move_to((p.x, p.y))
        } else {
            data.line_to((p.x, p.y))
        };
    }
    if poly.is_closed() {
        data = data.close();
    }
    data
}

/// Draws obstacles (filled gray), the border (if any), the graph's edges, and
/// `ports` as little circles.
///
/// Regular edges are blue, and toll-free ones are green. The picture is
/// flipped so that `y` points up.
pub fn draw(obstacles: &[Polyline], border: Option<&Polyline>, graph: &VisibilityGraph, ports: &[Point]) -> Document {
    let bbox = obstacles
        .iter()
        .chain(border)
        .filter_map(Polyline::bounding_box)
        .chain(graph.vertices().map(|(_, v)| kurbo::Rect::from_points(v.point.to_kurbo(), v.point.to_kurbo())))
        .reduce(|a, b| a.union(b))
        .unwrap_or(kurbo::Rect::new(0.0, 0.0, 1.0, 1.0));
    let pad = 0.05 * bbox.width().max(bbox.height()).max(1.0);
    let stroke_width = bbox.width().max(bbox.height()).max(1.0) / 512.0;
    let bbox = bbox.inflate(pad, pad);

    // Flip y around the middle of the bounding box.
    let mut group = Group::new().set(
        "transform",
        format!("translate(0, {}) scale(1, -1)", bbox.y0 + bbox.y1),
    );

    for obstacle in obstacles {
        group = group.add(
            Path::new()
                .set("d", polyline_data(obstacle))
                .set("fill", "lightgray")
                .set("stroke", "black")
                .set("stroke-width", stroke_width),
        );
    }
    if let Some(border) = border {
        group = group.add(
            Path::new()
                .set("d", polyline_data(border))
                .set("fill", "none")
                .set("stroke", "gray")
                .set("stroke-dasharray", format!("{} {}", 4.0 * stroke_width, 4.0 * stroke_width))
                .set("stroke-width", stroke_width),
        );
    }
    for (_, edge) in graph.edges() {
        let (a, b) = graph.edge_points(edge);
        let color = match edge.kind {
            EdgeKind::Regular => "blue",
            EdgeKind::TollFree { .. } => "green",
        };
        group = group.add(
            Line::new()
                .set("x1", a.x)
                .set("y1", a.y)
                .set("x2", b.x)
                .set("y2", b.y)
                .set("stroke", color)
                .set("stroke-width", stroke_width),
        );
    }
    for p in ports {
        group = group.add(
            Circle::new()
                .set("cx", p.x)
                .set("cy", p.y)
                .set("r", 3.0 * stroke_width)
                .set("fill", "red"),
        );
    }

    Document::new()
        .set("viewBox", (bbox.x0, bbox.y0, bbox.width(), bbox.height()))
        .add(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_edges() {
        let obstacles = [Polyline::closed([(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])];
        let mut graph = VisibilityGraph::new();
        graph.add_edge(Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        let doc = draw(&obstacles, None, &graph, &[Point::new(2.0, 2.0)]).to_string();
        assert!(doc.contains("<line"));
        assert!(doc.contains("<circle"));
        assert!(doc.contains("lightgray"));
    }
}
