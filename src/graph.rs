use std::collections::HashMap;

use log::info;

use crate::color::{LocalGraph, VertexId};
use crate::layout::LayoutDb;

/** The global conflict graph: one vertex per pattern, conflict edges
between patterns within coloring distance or connected by a path hint,
stitch edges between abutting sub-patterns split from the same parent.

Adjacency lists are symmetric, deduplicated and free of self loops. A
pair connected both ways keeps the conflict edge only. */
#[derive(Debug, Default)]
pub struct ConflictGraph {
    /// adj[u]: conflict neighbors of u
    adj: Vec<Vec<VertexId>>,
    /// stitch_adj[u]: stitch neighbors of u
    stitch_adj: Vec<Vec<VertexId>>,
    /// nb conflict edges
    nb_conflict_edges: usize,
    /// nb stitch edges
    nb_stitch_edges: usize,
}

impl ConflictGraph {
    /** builds the graph from the database and the stitch abutments
    (empty slice when stitch insertion did not run) */
    pub fn build(db:&LayoutDb, stitch_relation:&[Vec<VertexId>]) -> Self {
        let n = db.nb_patterns();
        let mut res = Self {
            adj: vec![Vec::new() ; n],
            stitch_adj: vec![Vec::new() ; n],
            nb_conflict_edges: 0,
            nb_stitch_edges: 0,
        };
        res.add_proximity_edges(db);
        res.add_path_edges(db);
        res.dedup();
        res.add_stitch_edges(stitch_relation);
        info!("conflict graph: {} conflict edges, {} stitch edges",
            res.nb_conflict_edges, res.nb_stitch_edges);
        res
    }

    /// number of vertices
    pub fn nb_vertices(&self) -> usize { self.adj.len() }

    /// number of conflict edges
    pub fn nb_conflict_edges(&self) -> usize { self.nb_conflict_edges }

    /// number of stitch edges
    pub fn nb_stitch_edges(&self) -> usize { self.nb_stitch_edges }

    /// conflict neighbors of vertex u
    pub fn neighbors(&self, u:VertexId) -> &[VertexId] { &self.adj[u] }

    /// stitch neighbors of vertex u
    pub fn stitch_neighbors(&self, u:VertexId) -> &[VertexId] { &self.stitch_adj[u] }

    /// conflict and stitch neighbors of vertex u
    pub fn all_neighbors(&self, u:VertexId) -> impl Iterator<Item=&VertexId> {
        self.adj[u].iter().chain(self.stitch_adj[u].iter())
    }

    /** proximity edges: probe the spatial index with each pattern's
    bounding box expanded by the coloring distance. An edge is added when
    the L∞ gap is below the distance (touching and overlapping pairs
    included). Precolored pairs whose colors already differ can never
    conflict and get no edge; sub-patterns of the same parent are wired
    by stitch edges instead. */
    fn add_proximity_edges(&mut self, db:&LayoutDb) {
        let d = db.coloring_distance();
        for p in 0..db.nb_patterns() {
            let pat = db.pattern(p);
            let candidates:Vec<VertexId> = db.probe(&pat.rect, d)
                .filter(|e| e.id > p)
                .map(|e| e.id)
                .collect();
            for q in candidates {
                let other = db.pattern(q);
                if pat.rect.gap(&other.rect) >= d { continue; }
                if pat.is_precolored() && other.is_precolored() && pat.color != other.color {
                    continue;
                }
                if pat.origin.is_some() && pat.origin == other.origin { continue; }
                self.adj[p].push(q);
                self.adj[q].push(p);
            }
        }
    }

    /** path-hint edges: each segment whose two endpoints fall inside two
    distinct patterns connects them; other segments are ignored */
    fn add_path_edges(&mut self, db:&LayoutDb) {
        for segs in db.paths().values() {
            for seg in segs {
                let a = find_pattern_at(db, seg.p1.0, seg.p1.1);
                let b = find_pattern_at(db, seg.p2.0, seg.p2.1);
                if let (Some(u), Some(v)) = (a, b) {
                    if u != v {
                        self.adj[u].push(v);
                        self.adj[v].push(u);
                    }
                }
            }
        }
    }

    /// sorts and deduplicates the adjacency lists, fixes the edge count
    fn dedup(&mut self) {
        for l in self.adj.iter_mut() {
            l.sort_unstable();
            l.dedup();
        }
        self.nb_conflict_edges = self.adj.iter().map(|l| l.len()).sum::<usize>() / 2;
    }

    /** stitch edges from the abutment relation (recorded on the
    lower-indexed side). A pair already conflict-adjacent keeps the
    conflict edge. */
    fn add_stitch_edges(&mut self, stitch_relation:&[Vec<VertexId>]) {
        for (u, partners) in stitch_relation.iter().enumerate() {
            for v in partners {
                if self.adj[u].binary_search(v).is_ok() { continue; }
                self.stitch_adj[u].push(*v);
                self.stitch_adj[*v].push(u);
                self.nb_stitch_edges += 1;
            }
        }
    }

    /** extracts the weighted local graph of a component: global ids are
    remapped to dense local ids and current colors become precolors */
    pub fn local_graph(&self, db:&LayoutDb, vertices:&[VertexId]) -> LocalGraph {
        let stitch_weight = db.config().stitch_weight;
        let mut global_to_local:HashMap<VertexId, VertexId> = HashMap::with_capacity(vertices.len());
        for (local, v) in vertices.iter().enumerate() { global_to_local.insert(*v, local); }
        let mut res = LocalGraph::new(vertices.len());
        for (local, v) in vertices.iter().enumerate() {
            res.set_precolor(local, db.color(*v));
            for w in &self.adj[*v] {
                if let Some(lw) = global_to_local.get(w) {
                    if v < w { res.add_edge(local, *lw, 1.); }
                }
            }
            for w in &self.stitch_adj[*v] {
                if let Some(lw) = global_to_local.get(w) {
                    if v < w { res.add_edge(local, *lw, -stitch_weight); }
                }
            }
        }
        res
    }

    /** print statistics of the graph */
    pub fn display_statistics(&self) {
        println!("\t{} \t vertices", self.nb_vertices());
        println!("\t{} \t conflict edges", self.nb_conflict_edges);
        println!("\t{} \t stitch edges", self.nb_stitch_edges);
        if self.nb_vertices() > 0 {
            let degrees:Vec<usize> = (0..self.nb_vertices()).map(|i| self.adj[i].len()).collect();
            println!("\t{} \t min degree", degrees.iter().min().unwrap());
            println!("\t{} \t max degree", degrees.iter().max().unwrap());
        }
    }
}

/// first pattern containing the point, if any
fn find_pattern_at(db:&LayoutDb, x:i64, y:i64) -> Option<VertexId> {
    db.probe_point(x, y)
        .filter(|e| e.rect.contains_point(x, y))
        .map(|e| e.id)
        .min()
}
