// useful additional warnings if docs are missing, or crates imported but unused, etc.
#![warn(missing_debug_implementations)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_code)]
#![warn(unused_extern_crates)]

use std::process::exit;
use std::time::Instant;

use clap::{App, load_yaml};

use mpl_color::decompose::Decomposer;
use mpl_color::util::{export_results, print_welcome, read_layout, read_params};

/**
reads a layout, colors it with the configured number of colors and
writes the tagged layout with its conflict and stitch reports
*/
pub fn main() {
    env_logger::init();
    let yaml = load_yaml!("main_args.yml");
    let main_args = App::from_yaml(yaml).get_matches();
    print_welcome();
    let config = match read_params(&main_args) {
        Ok(config) => config,
        Err(e) => { eprintln!("{}", e); exit(1); }
    };
    println!("reading layout: {}...", config.input_path);
    let time_init = Instant::now();
    let db = match read_layout(&config) {
        Ok(db) => db,
        Err(e) => { eprintln!("{}", e); exit(1); }
    };
    db.display_statistics();
    println!("=========================================================");
    let mut decomposer = Decomposer::new(db);
    if let Err(e) = decomposer.run() {
        eprintln!("{}", e);
        exit(1);
    }
    decomposer.report();
    decomposer.dump_graphs();
    if let Err(e) = export_results(&decomposer, main_args.value_of("perf")) {
        eprintln!("{}", e);
        exit(1);
    }
    println!("decomposed {} patterns in {:.3} seconds",
        decomposer.db().nb_patterns(), time_init.elapsed().as_secs_f32());
}
