use std::fs;
use std::path::Path;

use log::{info, warn};
use rayon::prelude::*;

use crate::color::{Color, VertexId};
use crate::component::{connected_components, Decomposition};
use crate::graph::ConflictGraph;
use crate::layout::{LayoutDb, MplError};
use crate::report::{self, ReportStats};
use crate::simplify;
use crate::solvers::{create_solver, dsatur::DsaturSolver};
use crate::stitch::{run_projection, StitchMap};

/** The decomposition pipeline driver. Owns the layout database and the
derived state: conflict graph, component partition, stitch bookkeeping
and the final tallies. */
#[derive(Debug)]
pub struct Decomposer {
    db: LayoutDb,
    graph: ConflictGraph,
    decomposition: Decomposition,
    stitch: Option<StitchMap>,
    /// color_density[c]: number of patterns holding color c
    color_density: Vec<usize>,
    stats: ReportStats,
}

impl Decomposer {
    /** wraps an initialized layout database */
    pub fn new(db:LayoutDb) -> Self {
        Self {
            db,
            graph: ConflictGraph::default(),
            decomposition: Decomposition::default(),
            stitch: None,
            color_density: Vec::new(),
            stats: ReportStats::default(),
        }
    }

    /// layout database
    pub fn db(&self) -> &LayoutDb { &self.db }

    /// conflict graph (empty before run)
    pub fn graph(&self) -> &ConflictGraph { &self.graph }

    /// component partition (empty before run)
    pub fn decomposition(&self) -> &Decomposition { &self.decomposition }

    /// final tallies (zero before run)
    pub fn stats(&self) -> &ReportStats { &self.stats }

    /// residual conflict pairs
    pub fn conflict_pairs(&self) -> Vec<(VertexId, VertexId)> {
        report::conflict_pairs(&self.db, &self.graph)
    }

    /// taken stitch pairs
    pub fn stitch_pairs(&self) -> Vec<(VertexId, VertexId)> {
        report::stitch_pairs(&self.db, &self.graph)
    }

    /** runs the full pipeline: optional projection, conflict-graph
    construction, component decomposition, parallel coloring, tallies */
    pub fn run(&mut self) -> Result<(), MplError> {
        if self.db.config().projection {
            self.stitch = Some(run_projection(&mut self.db));
        }
        let relation:&[Vec<VertexId>] = self.stitch.as_ref()
            .map(|s| s.stitch_relation.as_slice())
            .unwrap_or(&[]);
        self.graph = ConflictGraph::build(&self.db, relation);
        self.decomposition = connected_components(&self.graph);
        info!("{} components over {} patterns",
            self.decomposition.nb_components(), self.db.nb_patterns());
        self.solve_components()?;
        self.update_density();
        self.stats = report::global_stats(&self.db, &self.graph);
        Ok(())
    }

    /** solves all components on a worker pool, largest first, and
    applies the returned assignments after the join */
    fn solve_components(&mut self) -> Result<(), MplError> {
        let mut order:Vec<usize> = (0..self.decomposition.nb_components()).collect();
        order.sort_by_key(|c| std::cmp::Reverse(self.decomposition.component(*c).len()));
        let density = self.precolor_density();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.db.config().thread_num)
            .build()
            .map_err(|e| MplError::Config(format!("thread pool: {}", e)))?;
        let assignments:Vec<Vec<(VertexId, Color)>> = {
            let db = &self.db;
            let graph = &self.graph;
            let decomposition = &self.decomposition;
            pool.install(|| {
                order.par_iter()
                    .map(|c| solve_component(db, graph, decomposition.component(*c), *c as u64, &density))
                    .collect()
            })
        };
        for assignment in assignments {
            for (v, c) in assignment { self.db.set_color(v, c); }
        }
        Ok(())
    }

    /// color usage over precolored patterns, the tie-break baseline
    fn precolor_density(&self) -> Vec<usize> {
        let mut res = vec![0 ; self.db.config().color_num as usize];
        for p in self.db.patterns() {
            if p.color >= 0 { res[p.color as usize] += 1; }
        }
        res
    }

    fn update_density(&mut self) {
        let mut res = vec![0 ; self.db.config().color_num as usize];
        for p in self.db.patterns() {
            if p.color >= 0 { res[p.color as usize] += 1; }
        }
        self.color_density = res;
    }

    /** print the final statistics table */
    pub fn report(&self) {
        println!("\t{} \t patterns", self.db.nb_patterns());
        println!("\t{} \t conflict edges", self.graph.nb_conflict_edges());
        println!("\t{} \t stitch edges", self.graph.nb_stitch_edges());
        println!("\t{} \t components", self.decomposition.nb_components());
        if let Some(s) = &self.stitch {
            println!("\t{} \t patterns split", s.nb_split);
        }
        for (c, d) in self.color_density.iter().enumerate() {
            println!("\t{} \t patterns with color {}", d, c);
        }
        println!("\t{} \t conflicts", self.stats.conflicts);
        println!("\t{} \t stitches", self.stats.stitches);
        if self.db.config().verbose {
            for c in 0..self.decomposition.nb_components() {
                let stats = report::component_stats(&self.db, &self.graph, self.decomposition.component(c));
                if stats.conflicts > 0 {
                    println!("\tcomponent {}: {} conflicts", c, stats.conflicts);
                }
            }
        }
    }

    /** dumps each component as a graphviz file into the configured
    directory (verbose runs only) */
    pub fn dump_graphs(&self) {
        let dir = match (&self.db.config().graph_dump_dir, self.db.config().verbose) {
            (Some(dir), true) => dir.clone(),
            _ => return,
        };
        for c in 0..self.decomposition.nb_components() {
            let path = Path::new(&dir).join(format!("comp_{}.gv", c));
            if let Err(e) = fs::write(&path, self.component_dot(c)) {
                warn!("cannot write {}: {}", path.display(), e);
            }
        }
    }

    /// graphviz text of one component, stitch edges dashed
    fn component_dot(&self, c:usize) -> String {
        let mut res = format!("graph comp_{} {{\n", c);
        for u in self.decomposition.component(c) {
            res += &format!("  p{} [label=\"{} c{}\"];\n", u, u, self.db.color(*u));
            for v in self.graph.neighbors(*u) {
                if u < v { res += &format!("  p{} -- p{};\n", u, v); }
            }
            for v in self.graph.stitch_neighbors(*u) {
                if u < v { res += &format!("  p{} -- p{} [style=dashed];\n", u, v); }
            }
        }
        res += "}\n";
        res
    }
}

/** colors one component and returns its assignment.

Singletons keep their precolor or take the first color. Fully
precolored components are left untouched, their conflicts are
unavoidable. Other components go through simplification and the
configured backend, falling back level by level and finally to the
greedy backend when a subgraph is declined. */
fn solve_component(
    db:&LayoutDb,
    graph:&ConflictGraph,
    vertices:&[VertexId],
    seed:u64,
    density:&[usize],
) -> Vec<(VertexId, Color)> {
    if vertices.len() == 1 {
        let v = vertices[0];
        let c = db.color(v);
        return vec![(v, if c >= 0 { c } else { 0 })];
    }
    if vertices.iter().all(|v| db.color(*v) >= 0) {
        return Vec::new();
    }
    let k = db.config().color_num;
    let local = graph.local_graph(db, vertices);
    let mut level = db.config().simplify_level;
    loop {
        let mut solver = create_solver(db.config().algorithm, k);
        match simplify::color_component(&local, level, solver.as_mut(), k, density, seed) {
            Some((colors, _)) => {
                return vertices.iter().enumerate().map(|(i, v)| (*v, colors[i])).collect();
            }
            None if level > 0 => {
                info!("component of {} vertices declined at level {}, retrying simpler",
                    vertices.len(), level);
                level -= 1;
            }
            None => {
                info!("component of {} vertices declined by {}, greedy fallback",
                    vertices.len(), db.config().algorithm);
                let mut fallback = DsaturSolver::with_density(k, density.to_vec());
                let (colors, _) = simplify::color_component(&local, 0, &mut fallback, k, density, seed)
                    .expect("greedy backend accepts any graph");
                return vertices.iter().enumerate().map(|(i, v)| (*v, colors[i])).collect();
            }
        }
    }
}
