use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{Parser, ValueEnum};
use kurbo::BezPath;

use conesweeper::{debug_svg, generators, ConeSpanner, Point, Polyline};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scene {
    Grid,
    Slanted,
    Diamonds,
    Polygons,
    Slanties,
}

#[derive(Parser)]
struct Cli {
    /// Where to write the svg.
    #[arg(long)]
    output: PathBuf,

    /// A file containing svg path data to use as obstacles, instead of a
    /// generated scene. Every subpath is an obstacle.
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "grid")]
    scene: Scene,

    /// The size of the generated scene.
    #[arg(long, default_value_t = 4)]
    n: usize,

    /// The cone angle, in degrees.
    #[arg(long, default_value_t = 30.0)]
    angle: f64,

    /// Add ports between the obstacles of a generated scene.
    #[arg(long)]
    ports: bool,

    /// Sweep each direction both ways.
    #[arg(long)]
    bidirectional: bool,

    /// Close leftover cones against a border this far outside the obstacles.
    #[arg(long)]
    border: Option<f64>,
}

pub fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let obstacles = match &args.input {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            let path = BezPath::from_svg(data.trim())?;
            // Open subpaths can't be obstacles.
            let obstacles: Vec<Polyline> = Polyline::from_bez_path(&path, 1e-2)
                .into_iter()
                .filter(Polyline::is_closed)
                .collect();
            if let Some(i) = obstacles.iter().position(|o| !o.is_convex()) {
                bail!("closed subpath {i} isn't convex");
            }
            obstacles
        }
        None => match args.scene {
            Scene::Grid => generators::grid(args.n),
            Scene::Slanted => generators::slanted_grid(args.n),
            Scene::Diamonds => generators::diamonds(args.n),
            Scene::Polygons => generators::polygons(args.n, 7),
            Scene::Slanties => generators::slanties(args.n),
        },
    };
    if obstacles.is_empty() {
        bail!("no obstacles");
    }
    let ports: Vec<Point> = match (args.ports, &args.input, args.scene) {
        (false, _, _) | (_, Some(_), _) | (true, None, Scene::Slanties) => Vec::new(),
        (true, None, Scene::Grid | Scene::Slanted) => generators::grid_ports(args.n),
        (true, None, Scene::Diamonds | Scene::Polygons) => generators::centered_ports(args.n),
    };

    let mut spanner = ConeSpanner::new(obstacles.clone(), args.angle.to_radians())
        .with_ports(ports.iter().copied())
        .bidirectional(args.bidirectional);
    if let Some(pad) = args.border {
        let border = Polyline::bounding_box_border(&obstacles, pad).ok_or(anyhow!("empty scene"))?;
        spanner = spanner.with_border(border);
    }
    let out = spanner.calculate()?;

    eprintln!(
        "{} sweeps, {} vertices, {} edges",
        out.directions.len(),
        out.graph.vertex_count(),
        out.graph.edge_count()
    );
    eprintln!("{:#?}", out.stats);

    let document = debug_svg::draw(&obstacles, out.border.as_ref(), &out.graph, &ports);
    svg::save(&args.output, &document)?;
    Ok(())
}
