use conesweeper::{ConeSpanner, LineSweeper, Point, Polyline, SweepMode, SweepStats, VisibilityGraph};
use libtest_mimic::{Arguments, Failed, Trial};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
enum Assertion {
    /// Just check that nothing panics or errors.
    NoPanic,
    /// Every cone gets closed, and no cone side gets lost.
    AllClosed,
    /// Compare the edge list and stats with a saved snapshot. A missing or
    /// different snapshot is a failure, unless `CONESWEEPER_BLESS` is set, in
    /// which case the snapshot gets (re)written.
    Snapshot,
}

#[derive(Serialize, Deserialize, Debug)]
struct RegressionCaseDeclaration {
    obstacles: Vec<Vec<(f64, f64)>>,
    cone_angle_degrees: f64,
    /// Sweep once in this direction. Without it, run a full cone spanner.
    #[serde(default)]
    direction: Option<(f64, f64)>,
    #[serde(default)]
    bidirectional: bool,
    #[serde(default)]
    ports: Vec<(f64, f64)>,
    #[serde(default)]
    port_locations: Vec<(f64, f64)>,
    #[serde(default)]
    border_padding: Option<f64>,
    #[serde(default)]
    expected_edges: Option<Vec<[(f64, f64); 2]>>,
    assert: Option<Assertion>,
}

fn main() {
    let args = Arguments::from_args();
    let tests = regression_tests();

    libtest_mimic::run(&args, tests).exit();
}

fn regression_tests() -> Vec<Trial> {
    let ws = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let file_paths = glob::glob(&format!("{ws}/tests/regression/**/*.yml")).unwrap();

    file_paths
        .into_iter()
        .map(|p| {
            let p = p.unwrap();
            let name = input_path_base(&p).display().to_string();
            Trial::test(name, || generate_regression_test(p))
        })
        .collect()
}

fn input_path_base(input_path: &Path) -> &Path {
    let ws = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let base = format!("{ws}/tests/regression");
    input_path.strip_prefix(base).unwrap()
}

fn point((x, y): (f64, f64)) -> Point {
    Point::new(x, y)
}

fn run_case(case: &RegressionCaseDeclaration) -> Result<(VisibilityGraph, SweepStats), Failed> {
    let obstacles: Vec<Polyline> = case
        .obstacles
        .iter()
        .map(|ps| Polyline::closed(ps.iter().copied()))
        .collect();
    let ports: Vec<Point> = case.ports.iter().copied().map(point).collect();
    let port_locations: Vec<Point> = case.port_locations.iter().copied().map(point).collect();
    let border = case
        .border_padding
        .and_then(|pad| Polyline::bounding_box_border(&obstacles, pad));
    let angle = case.cone_angle_degrees.to_radians();

    match case.direction {
        Some(dir) => {
            let mode = if port_locations.is_empty() {
                SweepMode::AllVertices
            } else {
                SweepMode::PortLocations
            };
            let mut border = border;
            let mut graph = VisibilityGraph::new();
            let mut sweeper = LineSweeper::new(&obstacles, point(dir), angle)
                .map_err(|e| e.to_string())?
                .with_ports(&ports)
                .with_port_locations(&port_locations)
                .with_mode(mode);
            if let Some(border) = border.as_mut() {
                sweeper = sweeper.with_border(border);
            }
            let stats = sweeper.calculate(&mut graph).map_err(|e| e.to_string())?;
            Ok((graph, stats))
        }
        None => {
            let mut spanner = ConeSpanner::new(obstacles, angle)
                .with_ports(ports)
                .bidirectional(case.bidirectional);
            if !port_locations.is_empty() {
                spanner = spanner.with_port_locations(port_locations);
            }
            if let Some(border) = border {
                spanner = spanner.with_border(border);
            }
            let out = spanner.calculate().map_err(|e| e.to_string())?;
            Ok((out.graph, out.stats))
        }
    }
}

fn edge_list(graph: &VisibilityGraph) -> Vec<String> {
    let mut lines: Vec<String> = graph
        .edges()
        .map(|(_, e)| {
            let (a, b) = graph.edge_points(e);
            let (a, b) = if (a.x, a.y) <= (b.x, b.y) { (a, b) } else { (b, a) };
            format!("{a:?} -- {b:?} {:?}", e.kind)
        })
        .collect();
    lines.sort();
    lines
}

fn generate_regression_test(path: PathBuf) -> Result<(), Failed> {
    let input = std::fs::read_to_string(&path).unwrap();
    let case: RegressionCaseDeclaration = serde_yaml::from_str(&input).unwrap();
    let (graph, stats) = run_case(&case)?;

    if let Some(expected) = &case.expected_edges {
        for [a, b] in expected {
            if graph.find_edge(point(*a), point(*b)).is_none() {
                return Err(format!("missing edge {a:?} -- {b:?}").into());
            }
        }
        if graph.edge_count() != expected.len() {
            return Err(format!(
                "expected {} edges, got:\n{}",
                expected.len(),
                edge_list(&graph).join("\n")
            )
            .into());
        }
    }

    match case.assert.unwrap_or(Assertion::NoPanic) {
        Assertion::NoPanic => {}
        Assertion::AllClosed => {
            if stats.unclosed_cones != 0 || stats.lost_sides != 0 {
                return Err(format!("bad stats: {stats:?}").into());
            }
        }
        Assertion::Snapshot => assert_regression_snapshot(&path, &graph, &stats)?,
    }

    Ok(())
}

fn assert_regression_snapshot(path: &Path, graph: &VisibilityGraph, stats: &SweepStats) -> Result<(), Failed> {
    let mut actual = edge_list(graph).join("\n");
    actual.push_str("\n---\n");
    actual.push_str(&serde_yaml::to_string(stats).map_err(|e| e.to_string())?);

    let case_name = path.file_stem().unwrap().to_str().unwrap();
    let ws = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let snapshot_path = PathBuf::from(format!("{ws}/tests/regression/snapshots/{case_name}.txt"));

    let bless = std::env::var_os("CONESWEEPER_BLESS").is_some();
    match std::fs::read_to_string(&snapshot_path) {
        Ok(expected) if expected.trim_end() == actual.trim_end() => {}
        _ if bless => {
            std::fs::create_dir_all(snapshot_path.parent().unwrap()).unwrap();
            std::fs::write(&snapshot_path, actual).unwrap();
        }
        Ok(_) => return Err(format!("snapshot mismatch for {case_name}, got:\n{actual}").into()),
        Err(_) => {
            return Err(format!(
                "no snapshot at {}, rerun with CONESWEEPER_BLESS=1 to save this:\n{actual}",
                snapshot_path.display()
            )
            .into())
        }
    }
    Ok(())
}
