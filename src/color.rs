use bit_set::BitSet;

/** Vertex Id (equals the pattern id for the global graph) */
pub type VertexId = usize;

/** Color of a pattern (-1 if uncolored, 0..K-1 otherwise) */
pub type Color = i8;

/// marker for an uncolored vertex
pub const UNCOLORED: Color = -1;

/** A small dense weighted graph handed to a coloring backend.

Edge weights encode the edge kind: positive weights are conflict edges
(cost paid when both endpoints get the same color), negative weights are
stitch edges (the absolute value is paid when the endpoints get different
colors). Vertices may carry a precolor that the backend must preserve. */
#[derive(Debug, Clone, Default)]
pub struct LocalGraph {
    /// nb vertices
    n: usize,
    /// weighted edges (u < v)
    edges: Vec<(VertexId, VertexId, f64)>,
    /// adj[u]: list of (neighbor, weight)
    adj: Vec<Vec<(VertexId, f64)>>,
    /// precolor[u]: fixed color of u (-1 if free)
    precolor: Vec<Color>,
}

impl LocalGraph {
    /** creates a graph with n vertices and no edges */
    pub fn new(n:usize) -> Self {
        Self { n, edges:Vec::new(), adj:vec![Vec::new() ; n], precolor:vec![UNCOLORED ; n] }
    }

    /// number of vertices
    pub fn n(&self) -> usize { self.n }

    /// number of edges
    pub fn m(&self) -> usize { self.edges.len() }

    /// weighted edge list (u < v)
    pub fn edges(&self) -> &[(VertexId, VertexId, f64)] { &self.edges }

    /// list of (neighbor, weight) adjacent to vertex u
    pub fn adj(&self, u:VertexId) -> &[(VertexId, f64)] { &self.adj[u] }

    /// degree of vertex u
    pub fn degree(&self, u:VertexId) -> usize { self.adj[u].len() }

    /// precolor of vertex u (-1 if free)
    pub fn precolor(&self, u:VertexId) -> Color { self.precolor[u] }

    /// true iff some vertex carries a precolor
    pub fn has_precolor(&self) -> bool { self.precolor.iter().any(|c| *c >= 0) }

    /// fixes the color of vertex u
    pub fn set_precolor(&mut self, u:VertexId, c:Color) { self.precolor[u] = c; }

    /** adds an edge between u and v. A duplicate insertion keeps the
    stronger kind: a conflict edge dominates a stitch edge. */
    pub fn add_edge(&mut self, u:VertexId, v:VertexId, w:f64) {
        assert!(u != v && u < self.n && v < self.n);
        let (a,b) = if u < v { (u,v) } else { (v,u) };
        if let Some(e) = self.edges.iter_mut().find(|e| e.0 == a && e.1 == b) {
            if e.2 < 0. && w > 0. { // upgrade stitch to conflict
                e.2 = w;
                for (x,y) in &[(a,b),(b,a)] {
                    if let Some(entry) = self.adj[*x].iter_mut().find(|t| t.0 == *y) {
                        entry.1 = w;
                    }
                }
            }
            return;
        }
        self.edges.push((a, b, w));
        self.adj[a].push((b, w));
        self.adj[b].push((a, w));
    }

    /** cost of a full assignment: same-colored conflict edges pay their
    weight, differently-colored stitch edges pay the weight magnitude */
    pub fn assignment_cost(&self, colors:&[Color]) -> f64 {
        let mut cost = 0.;
        for (u,v,w) in &self.edges {
            if *w > 0. {
                if colors[*u] >= 0 && colors[*u] == colors[*v] { cost += w; }
            } else if colors[*u] != colors[*v] {
                cost += -w;
            }
        }
        cost
    }

    /** induced subgraph on a vertex subset.
    Returns the subgraph and the local-to-parent id mapping. */
    pub fn induced(&self, vertices:&[VertexId]) -> (LocalGraph, Vec<VertexId>) {
        let mut inside = BitSet::with_capacity(self.n);
        for v in vertices { inside.insert(*v); }
        let mut parent_to_local = vec![usize::MAX ; self.n];
        for (local, v) in vertices.iter().enumerate() { parent_to_local[*v] = local; }
        let mut res = LocalGraph::new(vertices.len());
        for (local, v) in vertices.iter().enumerate() {
            res.precolor[local] = self.precolor[*v];
            for (w, weight) in &self.adj[*v] {
                if inside.contains(*w) && *v < *w {
                    res.add_edge(local, parent_to_local[*w], *weight);
                }
            }
        }
        (res, vertices.to_vec())
    }
}

/** Contract of a coloring backend: color a small weighted graph with at
most K colors, preserving precolors, minimizing the total edge cost. */
pub trait ColoringSolver {
    /// true iff the backend agrees to solve this graph
    fn accepts(&self, graph:&LocalGraph) -> bool;

    /** colors the graph. Returns one color per vertex (all in 0..K) and
    the achieved cost. The seed makes randomized backends reproducible. */
    fn solve(&mut self, graph:&LocalGraph, seed:u64) -> (Vec<Color>, f64);
}

/** Tallies of an assignment check */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// same-colored conflict edges (both endpoints colored)
    pub conflicts: usize,
    /// differently-colored stitch edges
    pub stitches: usize,
    /// conflict edges with at least one uncolored endpoint
    pub uncolored: usize,
}

/** checks an assignment against a local graph, tallying monochromatic
conflict edges and taken stitches */
pub fn check_assignment(graph:&LocalGraph, colors:&[Color]) -> CheckStats {
    let mut res = CheckStats::default();
    for (u,v,w) in graph.edges() {
        if *w > 0. {
            if colors[*u] < 0 || colors[*v] < 0 { res.uncolored += 1; }
            else if colors[*u] == colors[*v] { res.conflicts += 1; }
        } else if colors[*u] >= 0 && colors[*v] >= 0 && colors[*u] != colors[*v] {
            res.stitches += 1;
        }
    }
    res
}


#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> LocalGraph {
        let mut g = LocalGraph::new(3);
        g.add_edge(0, 1, 1.);
        g.add_edge(1, 2, 1.);
        g.add_edge(0, 2, 1.);
        g
    }

    #[test]
    fn test_add_edge_dedup() {
        let mut g = LocalGraph::new(3);
        g.add_edge(0, 1, 1.);
        g.add_edge(1, 0, 1.);
        assert_eq!(g.m(), 1);
        assert_eq!(g.degree(0), 1);
    }

    #[test]
    fn test_conflict_dominates_stitch() {
        let mut g = LocalGraph::new(2);
        g.add_edge(0, 1, -0.1);
        g.add_edge(0, 1, 1.);
        assert_eq!(g.m(), 1);
        assert_eq!(g.edges()[0].2, 1.);
        assert_eq!(g.adj(0)[0].1, 1.);
        // a later stitch insertion does not downgrade the conflict
        g.add_edge(1, 0, -0.1);
        assert_eq!(g.edges()[0].2, 1.);
    }

    #[test]
    fn test_assignment_cost() {
        let g = triangle();
        assert_eq!(g.assignment_cost(&[0,1,2]), 0.);
        assert_eq!(g.assignment_cost(&[0,0,1]), 1.);
        let mut gs = LocalGraph::new(2);
        gs.add_edge(0, 1, -0.1);
        assert!((gs.assignment_cost(&[0,1]) - 0.1).abs() < 1e-9);
        assert_eq!(gs.assignment_cost(&[1,1]), 0.);
    }

    #[test]
    fn test_induced() {
        let g = triangle();
        let (sub, map) = g.induced(&[0,2]);
        assert_eq!(sub.n(), 2);
        assert_eq!(sub.m(), 1);
        assert_eq!(map, vec![0,2]);
    }

    #[test]
    fn test_check_assignment() {
        let g = triangle();
        let stats = check_assignment(&g, &[0,0,1]);
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.uncolored, 0);
        let stats2 = check_assignment(&g, &[0,-1,1]);
        assert_eq!(stats2.uncolored, 2);
    }
}
