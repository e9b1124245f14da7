use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use rstar::AABB;
use thiserror::Error;

use crate::color::Color;
use crate::geometry::{Coord, Pattern, PatternEnvelope, PatternTree, Rect, Segment};
use crate::solvers::AlgorithmType;

/** Fatal errors of the decomposition pipeline. Solver refusals and
unavoidable conflicts are not errors, they are recovered in-pipeline
and reported. */
#[derive(Debug, Error)]
pub enum MplError {
    /// invalid configuration, detected before ingestion
    #[error("configuration: {0}")]
    Config(String),
    /// malformed input record, detected at ingestion
    #[error("ingestion: {0}")]
    Ingest(String),
    /// file i/o failure
    #[error("i/o on {path}: {source}")]
    Io {
        /// offending file
        path: String,
        /// underlying error
        source: std::io::Error,
    },
    /// parse failure in an input file
    #[error("parse error in {path}: {msg}")]
    Parse {
        /// offending file
        path: String,
        /// diagnostic
        msg: String,
    },
}

/** Input layout formats understood by the readers */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// normalized json form (unit + per-layer point lists)
    Json,
    /// line-oriented text form
    Lay,
}

impl std::str::FromStr for InputFormat {
    type Err = MplError;

    fn from_str(s:&str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "lay" | "txt" => Ok(Self::Lay),
            _ => Err(MplError::Config(format!("unknown input format '{}' (valid: json, lay)", s))),
        }
    }
}

/** User options of the decomposition pipeline */
#[derive(Debug, Clone)]
pub struct Config {
    /// input layout filename
    pub input_path: String,
    /// output layout filename
    pub output_path: String,
    /// input format selector
    pub input_format: InputFormat,
    /// layers carrying uncolored patterns
    pub uncolor_layers: BTreeSet<i32>,
    /// layers carrying precolored patterns (color = layer - min of the set)
    pub precolor_layers: BTreeSet<i32>,
    /// layers carrying conflict-edge hint paths
    pub path_layers: BTreeSet<i32>,
    /// minimum coloring distance in nanometer
    pub coloring_distance_nm: f64,
    /// number of colors available (3 or 4)
    pub color_num: i8,
    /// simplification level 0|1|2
    pub simplify_level: u8,
    /// number of threads for parallel component solving
    pub thread_num: usize,
    /// coloring backend selector
    pub algorithm: AlgorithmType,
    /// control screen messages
    pub verbose: bool,
    /// enable stitch insertion before coloring
    pub projection: bool,
    /// magnitude of a stitch edge weight (conflict edges weigh 1)
    pub stitch_weight: f64,
    /// aspect ratio above which a 4-vertex boundary on a path layer is a path
    pub path_aspect_ratio: f64,
    /// neighbor count above which the Jian split selector is used
    pub jian_threshold: usize,
    /// directory receiving per-component graphviz dumps (verbose only)
    pub graph_dump_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_path: "out.json".to_string(),
            input_format: InputFormat::Json,
            uncolor_layers: BTreeSet::new(),
            precolor_layers: BTreeSet::new(),
            path_layers: BTreeSet::new(),
            coloring_distance_nm: 0.,
            color_num: 3,
            simplify_level: 2,
            thread_num: 1,
            algorithm: AlgorithmType::Backtrack,
            verbose: false,
            projection: false,
            stitch_weight: 0.1,
            path_aspect_ratio: 10.,
            jian_threshold: 16,
            graph_dump_dir: None,
        }
    }
}

impl Config {
    /** validates the options that must hold before ingestion starts */
    pub fn validate(&self) -> Result<(), MplError> {
        if self.color_num != 3 && self.color_num != 4 {
            return Err(MplError::Config(format!("color num {} not supported (3 or 4)", self.color_num)));
        }
        if self.coloring_distance_nm <= 0. {
            return Err(MplError::Config(format!("coloring distance {} nm must be positive", self.coloring_distance_nm)));
        }
        if self.simplify_level > 2 {
            return Err(MplError::Config(format!("simplification level {} out of range 0..=2", self.simplify_level)));
        }
        if self.thread_num == 0 {
            return Err(MplError::Config("thread num must be at least 1".to_string()));
        }
        if self.stitch_weight <= 0. || self.stitch_weight >= 1. {
            return Err(MplError::Config(format!("stitch weight {} out of range (0,1)", self.stitch_weight)));
        }
        if self.path_aspect_ratio < 1. {
            return Err(MplError::Config(format!("path aspect ratio {} must be at least 1", self.path_aspect_ratio)));
        }
        Ok(())
    }
}

/** The layout database: owns the patterns, the conflict-path hints, the
spatial index and the user options.

Pattern ids are implicit: a pattern's id is its index in the pattern
vector. Ids are re-established after every mutation of the vector
(duplicate removal, stitch registration), and the spatial index is
rebuilt at the same time. */
#[derive(Debug)]
pub struct LayoutDb {
    /// uncolored and precolored patterns
    patterns: Vec<Pattern>,
    /// union bounding box of all patterns
    bbox: Option<Rect>,
    /// conflict-edge hint segments, keyed by path layer
    paths: BTreeMap<i32, Vec<Segment>>,
    /// database unit in meter, output keeps the input unit
    unit: f64,
    /// minimum coloring distance in database units
    coloring_distance: Coord,
    /// spatial index over the pattern bounding boxes
    rtree: PatternTree,
    /// number of duplicates removed at initialization
    duplicate_cnt: usize,
    /// number of ingested shapes discarded for their layer
    discarded_cnt: usize,
    /// user options
    config: Config,
}

impl LayoutDb {
    /** creates an empty database (unit defaults to 1e-9, i.e. 1nm) */
    pub fn new(config:Config) -> Self {
        Self {
            patterns: Vec::new(),
            bbox: None,
            paths: BTreeMap::new(),
            unit: 1e-9,
            coloring_distance: 0,
            rtree: PatternTree::new_with_params(),
            duplicate_cnt: 0,
            discarded_cnt: 0,
            config,
        }
    }

    /** creates an initialized database directly from a pattern vector
    (no classification, no dedup) */
    pub fn from_patterns(config:Config, unit:f64, patterns:Vec<Pattern>) -> Self {
        let mut res = Self::new(config);
        res.unit = unit;
        for p in &patterns {
            match res.bbox.as_mut() {
                None => res.bbox = Some(p.rect),
                Some(b) => b.encompass(&p.rect),
            }
        }
        res.patterns = patterns;
        res.coloring_distance = res.distance_in_db_units();
        res.rebuild_rtree();
        res
    }

    /// database unit in meter
    pub fn unit(&self) -> f64 { self.unit }

    /// sets the database unit (call before initialize)
    pub fn set_unit(&mut self, unit:f64) { self.unit = unit; }

    /// pattern vector
    pub fn patterns(&self) -> &[Pattern] { &self.patterns }

    /// pattern by id
    pub fn pattern(&self, id:usize) -> &Pattern { &self.patterns[id] }

    /// number of patterns
    pub fn nb_patterns(&self) -> usize { self.patterns.len() }

    /// color of pattern id
    pub fn color(&self, id:usize) -> Color { self.patterns[id].color }

    /// assigns a color to pattern id
    pub fn set_color(&mut self, id:usize, c:Color) { self.patterns[id].color = c; }

    /// union bounding box of all patterns
    pub fn bbox(&self) -> Option<&Rect> { self.bbox.as_ref() }

    /// conflict-path hints per layer
    pub fn paths(&self) -> &BTreeMap<i32, Vec<Segment>> { &self.paths }

    /// minimum coloring distance in database units
    pub fn coloring_distance(&self) -> Coord { self.coloring_distance }

    /// number of duplicates removed at initialization
    pub fn duplicate_cnt(&self) -> usize { self.duplicate_cnt }

    /// user options
    pub fn config(&self) -> &Config { &self.config }

    fn distance_in_db_units(&self) -> Coord {
        (self.config.coloring_distance_nm / (self.unit * 1e9)).round() as Coord
    }

    /** ingests one shape: routes it to path handling if its layer is a
    path layer, otherwise to pattern handling */
    pub fn add(&mut self, layer:i32, points:&[(Coord,Coord)]) -> Result<(), MplError> {
        if self.config.path_layers.contains(&layer) {
            self.add_path(layer, points);
            Ok(())
        } else {
            self.add_pattern(layer, points)
        }
    }

    /** ingests a pattern shape: precolor layers fix the color from the
    layer number, uncolor layers leave it free, other layers are
    discarded. The shape must be a 4- or 5-vertex closed Manhattan loop. */
    pub fn add_pattern(&mut self, layer:i32, points:&[(Coord,Coord)]) -> Result<(), MplError> {
        let color = if let Some(first) = self.config.precolor_layers.iter().next() {
            if self.config.precolor_layers.contains(&layer) {
                let c = (layer - first) as i8;
                if c >= self.config.color_num {
                    return Err(MplError::Ingest(format!(
                        "precolor layer {} maps to color {} but only {} colors are available",
                        layer, c, self.config.color_num
                    )));
                }
                Some(c)
            } else { None }
        } else { None };
        let uncolored = self.config.uncolor_layers.contains(&layer);
        if color.is_none() && !uncolored {
            self.discarded_cnt += 1;
            return Ok(());
        }
        if points.len() < 4 || points.len() > 5 {
            return Err(MplError::Ingest(format!(
                "polygon on layer {} has {} vertices (expected a 4- or 5-vertex loop)",
                layer, points.len()
            )));
        }
        let rect = Rect::from_points(points)
            .ok_or_else(|| MplError::Ingest(format!("empty polygon on layer {}", layer)))?;
        match self.bbox.as_mut() {
            None => self.bbox = Some(rect),
            Some(b) => b.encompass(&rect),
        }
        let mut pattern = Pattern::new(rect, layer);
        if let Some(c) = color { pattern.color = c; }
        self.patterns.push(pattern);
        Ok(())
    }

    /** ingests a path shape as conflict-edge hints. A 4-vertex boundary
    whose opposite sides differ by the configured aspect ratio is
    reinterpreted as a single segment along its long side; shorter
    polylines contribute one segment per adjacent vertex pair. */
    pub fn add_path(&mut self, layer:i32, points:&[(Coord,Coord)]) {
        if points.len() < 2 { return; }
        if points.len() == 4 {
            let d0 = Segment { p1:points[0], p2:points[1] }.length2() as f64;
            let d1 = Segment { p1:points[1], p2:points[2] }.length2() as f64;
            let ratio2 = self.config.path_aspect_ratio * self.config.path_aspect_ratio;
            let offset = if d0 > ratio2 * d1 { Some(0) }
                else if ratio2 * d0 < d1 { Some(1) }
                else { None };
            if let Some(o) = offset {
                let seg = Segment { p1:points[o], p2:points[o+1] };
                self.paths.entry(layer).or_insert_with(Vec::new).push(seg);
                return;
            }
        }
        for pair in points.windows(2) {
            let seg = Segment { p1:pair[0], p2:pair[1] };
            self.paths.entry(layer).or_insert_with(Vec::new).push(seg);
        }
    }

    /** finalizes ingestion: computes the coloring distance in database
    units, removes duplicate patterns, renumbers ids and bulk-builds the
    spatial index */
    pub fn initialize(&mut self) {
        self.coloring_distance = self.distance_in_db_units();
        self.remove_duplicates();
        self.rebuild_rtree();
    }

    /** removes exactly-duplicated patterns with a single scan over the
    lexicographically sorted vector. Duplicates are warnings, not errors. */
    fn remove_duplicates(&mut self) {
        self.patterns.sort_by(|a,b| {
            (a.rect.xl, a.rect.yl, a.rect.xh, a.rect.yh)
                .cmp(&(b.rect.xl, b.rect.yl, b.rect.xh, b.rect.yh))
        });
        let before = self.patterns.len();
        self.patterns.dedup_by(|p2, p1| {
            let dup = p1.rect == p2.rect;
            if dup {
                debug!("duplicate pattern {:?} on layer {} ignored", p2.rect, p2.layer);
            }
            dup
        });
        self.duplicate_cnt = before - self.patterns.len();
        info!("ignored {} duplicate patterns", self.duplicate_cnt);
    }

    /** replaces the whole pattern vector (stitch registration) and
    rebuilds the spatial index; ids follow the new vector order */
    pub fn replace_patterns(&mut self, patterns:Vec<Pattern>) {
        self.patterns = patterns;
        self.rebuild_rtree();
    }

    /// bulk-builds the spatial index from the current pattern vector
    fn rebuild_rtree(&mut self) {
        self.rtree = PatternTree::bulk_load_with_params(
            self.patterns.iter().enumerate()
                .map(|(id, p)| PatternEnvelope { id, rect:p.rect })
                .collect()
        );
    }

    /** all patterns whose bounding box intersects `rect` expanded by `d` */
    pub fn probe(&self, rect:&Rect, d:Coord) -> impl Iterator<Item=&PatternEnvelope> {
        let e = rect.expand(d);
        self.rtree.locate_in_envelope_intersecting(
            &AABB::from_corners([e.xl, e.yl], [e.xh, e.yh])
        )
    }

    /** all patterns whose bounding box contains the point (x,y) */
    pub fn probe_point(&self, x:Coord, y:Coord) -> impl Iterator<Item=&PatternEnvelope> {
        self.rtree.locate_in_envelope_intersecting(&AABB::from_corners([x,y], [x,y]))
    }

    /** print statistics of the database */
    pub fn display_statistics(&self) {
        println!("\t{} \t patterns", self.nb_patterns());
        println!("\t{} \t duplicates removed", self.duplicate_cnt);
        println!("\t{} \t shapes discarded by layer", self.discarded_cnt);
        println!("\t{} \t path hints", self.paths.values().map(|v| v.len()).sum::<usize>());
        println!("\t{} db \t coloring distance ( {} nm )", self.coloring_distance, self.config.coloring_distance_nm);
        println!("\t{} \t colors", self.config.color_num);
        println!("\t{} \t simplification level", self.config.simplify_level);
        println!("\t{} \t threads", self.config.thread_num);
        println!("\t{} \t algorithm", self.config.algorithm);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            uncolor_layers: [1].iter().cloned().collect(),
            precolor_layers: [10,11,12].iter().cloned().collect(),
            path_layers: [5].iter().cloned().collect(),
            coloring_distance_nm: 10.,
            ..Config::default()
        }
    }

    fn square(x:Coord, y:Coord) -> Vec<(Coord,Coord)> {
        vec![(x,y),(x+5,y),(x+5,y+5),(x,y+5)]
    }

    #[test]
    fn test_validate() {
        assert!(test_config().validate().is_ok());
        let mut c = test_config();
        c.color_num = 5;
        assert!(c.validate().is_err());
        let mut c2 = test_config();
        c2.coloring_distance_nm = 0.;
        assert!(c2.validate().is_err());
        let mut c3 = test_config();
        c3.thread_num = 0;
        assert!(c3.validate().is_err());
    }

    #[test]
    fn test_classification() {
        let mut db = LayoutDb::new(test_config());
        db.add(1, &square(0,0)).unwrap();    // uncolored
        db.add(11, &square(20,0)).unwrap();  // precolored with color 1
        db.add(99, &square(40,0)).unwrap();  // discarded
        assert_eq!(db.nb_patterns(), 2);
        assert_eq!(db.patterns()[0].color, -1);
        assert_eq!(db.patterns()[1].color, 1);
        assert_eq!(db.discarded_cnt, 1);
    }

    #[test]
    fn test_precolor_out_of_range() {
        let mut c = test_config();
        c.precolor_layers = [10,11,12,13].iter().cloned().collect();
        let mut db = LayoutDb::new(c);
        assert!(db.add(13, &square(0,0)).is_err()); // would map to color 3 with K=3
    }

    #[test]
    fn test_malformed_polygon() {
        let mut db = LayoutDb::new(test_config());
        assert!(db.add(1, &[(0,0),(5,0),(5,5)]).is_err());
    }

    #[test]
    fn test_boundary_reclassified_as_path() {
        let mut db = LayoutDb::new(test_config());
        // 100x2 boundary on the path layer: one long-axis segment
        db.add(5, &[(0,0),(100,0),(100,2),(0,2)]).unwrap();
        let segs = &db.paths()[&5];
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0], Segment { p1:(0,0), p2:(100,0) });
        // near-square boundary: one segment per adjacent pair
        let mut db2 = LayoutDb::new(test_config());
        db2.add(5, &[(0,0),(10,0),(10,8),(0,8)]).unwrap();
        assert_eq!(db2.paths()[&5].len(), 3);
    }

    #[test]
    fn test_dedup_and_renumber() {
        let mut db = LayoutDb::new(test_config());
        db.add(1, &square(20,0)).unwrap();
        db.add(1, &square(0,0)).unwrap();
        db.add(1, &square(20,0)).unwrap(); // duplicate
        db.initialize();
        assert_eq!(db.nb_patterns(), 2);
        assert_eq!(db.duplicate_cnt(), 1);
        // sorted by (xl,yl): ids follow the vector
        assert_eq!(db.pattern(0).rect.xl, 0);
        assert_eq!(db.pattern(1).rect.xl, 20);
        for i in 0..db.nb_patterns() {
            for j in 0..i {
                assert_ne!(db.pattern(i).rect, db.pattern(j).rect);
            }
        }
    }

    #[test]
    fn test_distance_conversion() {
        let mut db = LayoutDb::new(test_config());
        db.set_unit(1e-9); // 1 db unit = 1 nm
        db.add(1, &square(0,0)).unwrap();
        db.initialize();
        assert_eq!(db.coloring_distance(), 10);
        let mut db2 = LayoutDb::new(test_config());
        db2.set_unit(5e-10); // 1 db unit = 0.5 nm
        db2.add(1, &square(0,0)).unwrap();
        db2.initialize();
        assert_eq!(db2.coloring_distance(), 20);
    }

    #[test]
    fn test_probe() {
        let mut db = LayoutDb::new(test_config());
        db.set_unit(1e-9);
        db.add(1, &square(0,0)).unwrap();
        db.add(1, &square(12,0)).unwrap();
        db.add(1, &square(100,100)).unwrap();
        db.initialize();
        let r0 = db.pattern(0).rect;
        let hits:Vec<usize> = db.probe(&r0, db.coloring_distance())
            .map(|e| e.id).collect();
        assert!(hits.contains(&0) && hits.contains(&1) && !hits.contains(&2));
    }

    #[test]
    fn test_bbox() {
        let mut db = LayoutDb::new(test_config());
        db.add(1, &square(0,0)).unwrap();
        db.add(1, &square(100,50)).unwrap();
        assert_eq!(db.bbox(), Some(&Rect::new(0,0,105,55)));
    }
}
