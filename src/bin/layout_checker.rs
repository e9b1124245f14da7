use std::process::exit;

use clap::{App, load_yaml};

use mpl_color::geometry::{Pattern, Rect};
use mpl_color::graph::ConflictGraph;
use mpl_color::layout::{Config, LayoutDb, MplError};
use mpl_color::layout_json::{JsonLayout, CONFLICT_LAYER, STITCH_LAYER};
use mpl_color::report;

/** re-checks a decomposition result: reads a colored layout (derived
layers `layer*10 + color`), rebuilds the conflict graph and recounts
the monochromatic pairs */
pub fn main() {
    env_logger::init();
    let yaml = load_yaml!("checker_args.yml");
    let main_args = App::from_yaml(yaml).get_matches();
    let filename = main_args.value_of("input").unwrap();
    let distance_nm:f64 = match main_args.value_of("distance").unwrap().parse() {
        Ok(d) => d,
        Err(_) => { eprintln!("cannot parse the coloring distance"); exit(1); }
    };
    let color_num:i8 = main_args.value_of("colors").unwrap_or("3").parse().unwrap_or(3);
    match check(filename, distance_nm, color_num) {
        Ok((conflicts, uncolored)) => {
            println!("{} \t conflicts", conflicts);
            println!("{} \t uncolored pairs", uncolored);
        }
        Err(e) => { eprintln!("{}", e); exit(1); }
    }
}

fn check(filename:&str, distance_nm:f64, color_num:i8) -> Result<(usize, usize), MplError> {
    let lay = JsonLayout::from_file(filename)?;
    let config = Config {
        coloring_distance_nm: distance_nm,
        color_num,
        ..Config::default()
    };
    config.validate()?;
    let mut patterns = Vec::new();
    for shape in &lay.shapes {
        if shape.layer == CONFLICT_LAYER || shape.layer == STITCH_LAYER { continue; }
        let rect = Rect::from_points(&shape.points)
            .ok_or_else(|| MplError::Ingest("empty shape".to_string()))?;
        let color = (shape.layer % 10) as i8;
        if color >= color_num {
            return Err(MplError::Ingest(format!(
                "layer {} encodes color {} but only {} colors exist",
                shape.layer, color, color_num
            )));
        }
        let mut p = Pattern::new(rect, shape.layer / 10);
        p.color = color;
        patterns.push(p);
    }
    let db = LayoutDb::from_patterns(config, lay.unit, patterns);
    let graph = ConflictGraph::build(&db, &[]);
    let stats = report::global_stats(&db, &graph);
    Ok((stats.conflicts, stats.uncolored))
}
