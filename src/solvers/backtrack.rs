use crate::color::{Color, ColoringSolver, LocalGraph, VertexId, UNCOLORED};
use crate::solvers::dsatur::DsaturSolver;

/// largest component the backend agrees to solve
const MAX_VERTICES:usize = 150;
/// search node budget; on exhaustion the incumbent is returned
const NODE_BUDGET:usize = 1_000_000;
/// tolerance for cost comparisons
const EPS:f64 = 1e-9;

/** Exact minimum-cost K-coloring by branch and bound.

Vertices are assigned in decreasing degree order (precolored vertices
first, with their single fixed candidate). A branch is cut as soon as
its partial cost reaches the incumbent. The incumbent starts from the
greedy DSATUR solution, so an exhausted node budget still returns a
complete assignment. */
#[derive(Debug)]
pub struct BacktrackSolver {
    /// number of colors available
    color_num: i8,
}

impl BacktrackSolver {
    /** creates a solver with K colors */
    pub fn new(color_num:i8) -> Self { Self { color_num } }
}

struct Search<'a> {
    graph: &'a LocalGraph,
    k: i8,
    order: Vec<VertexId>,
    colors: Vec<Color>,
    best_colors: Vec<Color>,
    best_cost: f64,
    nodes: usize,
    any_precolor: bool,
}

impl<'a> Search<'a> {
    /// cost added by giving v color c, against already-colored neighbors
    fn incremental_cost(&self, v:VertexId, c:Color) -> f64 {
        let mut cost = 0.;
        for (w, weight) in self.graph.adj(v) {
            if self.colors[*w] < 0 { continue; }
            if *weight > 0. {
                if self.colors[*w] == c { cost += weight; }
            } else if self.colors[*w] != c {
                cost += -weight;
            }
        }
        cost
    }

    fn dfs(&mut self, depth:usize, partial_cost:f64) {
        if partial_cost >= self.best_cost - EPS { return; }
        if self.nodes >= NODE_BUDGET { return; }
        self.nodes += 1;
        if depth == self.order.len() {
            self.best_cost = partial_cost;
            self.best_colors = self.colors.clone();
            return;
        }
        let v = self.order[depth];
        let precolor = self.graph.precolor(v);
        let candidates:Vec<Color> = if precolor >= 0 {
            vec![precolor]
        } else if depth == 0 && !self.any_precolor {
            vec![0] // colors are interchangeable until one is used
        } else {
            (0..self.k).collect()
        };
        for c in candidates {
            self.colors[v] = c;
            let inc = self.incremental_cost(v, c);
            self.dfs(depth + 1, partial_cost + inc);
        }
        self.colors[v] = UNCOLORED;
    }
}

impl ColoringSolver for BacktrackSolver {
    fn accepts(&self, graph:&LocalGraph) -> bool { graph.n() <= MAX_VERTICES }

    fn solve(&mut self, graph:&LocalGraph, seed:u64) -> (Vec<Color>, f64) {
        // greedy incumbent, also the answer when it is already optimal
        let (greedy_colors, greedy_cost) = DsaturSolver::new(self.color_num).solve(graph, seed);
        if greedy_cost <= EPS { return (greedy_colors, greedy_cost); }
        let mut order:Vec<VertexId> = (0..graph.n()).collect();
        order.sort_by_key(|v| (
            graph.precolor(*v) < 0, // precolored first
            std::cmp::Reverse(graph.degree(*v)),
            *v,
        ));
        let mut search = Search {
            graph,
            k: self.color_num,
            order,
            colors: vec![UNCOLORED ; graph.n()],
            best_colors: greedy_colors,
            best_cost: greedy_cost,
            nodes: 0,
            any_precolor: graph.has_precolor(),
        };
        // an incremental-cost DFS revisits the incumbent cost exactly,
        // so the greedy bound is only replaced by strictly better leaves
        search.dfs(0, 0.);
        (search.best_colors, search.best_cost)
    }
}
