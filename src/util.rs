use std::collections::BTreeSet;

use clap::ArgMatches;
use serde_json::json;

use crate::decompose::Decomposer;
use crate::layout::{Config, InputFormat, LayoutDb, MplError};
use crate::layout_json::JsonLayout;
use crate::layout_text::TextLayout;

/// parses a repeated integer option into a layer set
fn layer_set(args:&ArgMatches, name:&str) -> Result<BTreeSet<i32>, MplError> {
    let mut res = BTreeSet::new();
    if let Some(values) = args.values_of(name) {
        for v in values {
            let layer = v.parse::<i32>().map_err(|_|
                MplError::Config(format!("{}: '{}' is not a layer number", name, v))
            )?;
            res.insert(layer);
        }
    }
    Ok(res)
}

/// parses a single numeric option
fn number<T:std::str::FromStr>(args:&ArgMatches, name:&str) -> Result<Option<T>, MplError> {
    match args.value_of(name) {
        None => Ok(None),
        Some(v) => v.parse::<T>().map(Some).map_err(|_|
            MplError::Config(format!("{}: cannot parse '{}'", name, v))
        ),
    }
}

/** reads command line input and returns a validated configuration */
pub fn read_params(main_args:&ArgMatches) -> Result<Config, MplError> {
    let mut config = Config::default();
    if let Some(i) = main_args.value_of("input") { config.input_path = i.to_string(); }
    if let Some(o) = main_args.value_of("output") { config.output_path = o.to_string(); }
    if let Some(f) = main_args.value_of("format") { config.input_format = f.parse::<InputFormat>()?; }
    config.uncolor_layers = layer_set(main_args, "uncolor")?;
    config.precolor_layers = layer_set(main_args, "precolor")?;
    config.path_layers = layer_set(main_args, "path")?;
    if let Some(d) = number::<f64>(main_args, "distance")? { config.coloring_distance_nm = d; }
    if let Some(k) = number::<i8>(main_args, "colors")? { config.color_num = k; }
    if let Some(s) = number::<u8>(main_args, "simplify")? { config.simplify_level = s; }
    if let Some(t) = number::<usize>(main_args, "threads")? { config.thread_num = t; }
    if let Some(a) = main_args.value_of("algorithm") {
        config.algorithm = a.parse().map_err(MplError::Config)?;
    }
    if let Some(w) = number::<f64>(main_args, "stitch_weight")? { config.stitch_weight = w; }
    if let Some(r) = number::<f64>(main_args, "aspect")? { config.path_aspect_ratio = r; }
    if let Some(j) = number::<usize>(main_args, "jian")? { config.jian_threshold = j; }
    if let Some(dir) = main_args.value_of("dump") { config.graph_dump_dir = Some(dir.to_string()); }
    config.projection = main_args.is_present("projection");
    config.verbose = main_args.is_present("verbose");
    config.validate()?;
    Ok(config)
}

/** reads the input layout in the configured format */
pub fn read_layout(config:&Config) -> Result<LayoutDb, MplError> {
    match config.input_format {
        InputFormat::Json => JsonLayout::from_file(&config.input_path)?.into_db(config.clone()),
        InputFormat::Lay => TextLayout::from_file(&config.input_path)?.into_db(config.clone()),
    }
}

/** exports the colored layout and, optionally, a statistics file */
pub fn export_results(dec:&Decomposer, perf_file:Option<&str>) -> Result<(), MplError> {
    let conflicts = dec.conflict_pairs();
    let stitches = dec.stitch_pairs();
    JsonLayout::result(dec.db(), &conflicts, &stitches)
        .to_file(&dec.db().config().output_path)?;
    if let Some(filename) = perf_file {
        let stats = json!({
            "patterns": dec.db().nb_patterns(),
            "conflict_edges": dec.graph().nb_conflict_edges(),
            "stitch_edges": dec.graph().nb_stitch_edges(),
            "components": dec.decomposition().nb_components(),
            "conflicts": dec.stats().conflicts,
            "stitches": dec.stats().stitches,
        });
        std::fs::write(filename, serde_json::to_string(&stats).unwrap_or_default())
            .map_err(|e| MplError::Io { path:filename.to_string(), source:e })?;
    }
    Ok(())
}

/// print welcome information
pub fn print_welcome() {
    println!("=========================================================");
    println!("  mpl-color: multiple patterning layout decomposition");
    println!("=========================================================");
}
