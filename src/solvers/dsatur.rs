use std::cmp::Ordering;

use bit_set::BitSet;
use fastrand::Rng;
use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;

use crate::color::{Color, ColoringSolver, LocalGraph, VertexId};

#[derive(PartialEq, Eq)]
struct DSatInfo {
    dsat: usize,
    degree: usize,
}

impl Ord for DSatInfo {
    fn cmp(&self, other:&Self) -> Ordering {
        self.dsat.cmp(&other.dsat)
            .then_with(|| self.degree.cmp(&other.degree))
    }
}

impl PartialOrd for DSatInfo {
    fn partial_cmp(&self, other:&Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/** Greedy DSATUR clamped to K colors, followed by a bounded
conflict-repair pass. Accepts any graph, so it terminates every
fallback chain.
    1. color precolored vertices first
    2. repeatedly take the uncolored vertex seeing the most colors
       (ties by the largest degree)
    3. give it the color of minimum cost against its colored neighbors,
       breaking ties toward the globally least-used color
    4. sweep monochromatic conflict edges, moving one endpoint to a
       strictly cheaper color while improvement lasts
*/
#[derive(Debug)]
pub struct DsaturSolver {
    /// number of colors available
    color_num: i8,
    /// global color usage, used for tie-breaking (may be empty)
    density: Vec<usize>,
}

impl DsaturSolver {
    /** creates a solver with K colors */
    pub fn new(color_num:i8) -> Self {
        Self { color_num, density:Vec::new() }
    }

    /** creates a solver that breaks color ties toward the globally
    least-used color */
    pub fn with_density(color_num:i8, density:Vec<usize>) -> Self {
        Self { color_num, density }
    }

    /// cost of giving vertex v color c against already-colored neighbors
    fn move_cost(graph:&LocalGraph, colors:&[Color], v:VertexId, c:Color) -> f64 {
        let mut cost = 0.;
        for (w, weight) in graph.adj(v) {
            if colors[*w] < 0 { continue; }
            if *weight > 0. {
                if colors[*w] == c { cost += weight; }
            } else if colors[*w] != c {
                cost += -weight;
            }
        }
        cost
    }

    fn greedy(&self, graph:&LocalGraph) -> Vec<Color> {
        let n = graph.n();
        let mut colors:Vec<Color> = (0..n).map(|v| graph.precolor(v)).collect();
        let mut adj_colors:Vec<BitSet> = vec![BitSet::default() ; n]; // colors each vertex sees
        let mut remaining:PriorityQueue<VertexId, DSatInfo> = PriorityQueue::new();
        for v in 0..n {
            if colors[v] < 0 {
                remaining.push(v, DSatInfo { dsat:0, degree:graph.degree(v) });
            }
        }
        // precolored vertices saturate their neighbors up front
        for v in 0..n {
            if colors[v] >= 0 {
                let c = colors[v] as usize;
                for (w, _) in graph.adj(v) {
                    if colors[*w] < 0 && !adj_colors[*w].contains(c) {
                        adj_colors[*w].insert(c);
                        remaining.change_priority_by(w, |p| { p.dsat += 1; });
                    }
                }
            }
        }
        while let Some((v, _)) = remaining.pop() {
            let mut best:(OrderedFloat<f64>, usize, Color) = (OrderedFloat(f64::INFINITY), usize::MAX, 0);
            for c in 0..self.color_num {
                let cost = OrderedFloat(Self::move_cost(graph, &colors, v, c));
                let d = self.density.get(c as usize).copied().unwrap_or(0);
                if (cost, d) < (best.0, best.1) { best = (cost, d, c); }
            }
            let color = best.2;
            colors[v] = color;
            for (w, _) in graph.adj(v) {
                if colors[*w] < 0 && !adj_colors[*w].contains(color as usize) {
                    adj_colors[*w].insert(color as usize);
                    remaining.change_priority_by(w, |p| { p.dsat += 1; });
                }
            }
        }
        colors
    }

    /// moves endpoints of monochromatic conflict edges to strictly
    /// cheaper colors while improvement lasts
    fn repair(&self, graph:&LocalGraph, colors:&mut [Color], rng:&mut Rng) {
        let mut improved = true;
        let mut rounds = 0;
        while improved && rounds < 50 {
            improved = false;
            rounds += 1;
            for (u,v,w) in graph.edges() {
                if *w <= 0. || colors[*u] != colors[*v] { continue; }
                let movable:Vec<VertexId> = [*u,*v].iter().cloned()
                    .filter(|x| graph.precolor(*x) < 0)
                    .collect();
                let x = match movable.len() {
                    0 => continue,
                    1 => movable[0],
                    _ => movable[rng.usize(0..movable.len())],
                };
                let current = OrderedFloat(Self::move_cost(graph, colors, x, colors[x]));
                let mut best:Option<(OrderedFloat<f64>, Color)> = None;
                for c in 0..self.color_num {
                    if c == colors[x] { continue; }
                    let cost = OrderedFloat(Self::move_cost(graph, colors, x, c));
                    if best.map_or(true, |(bc,_)| cost < bc) { best = Some((cost, c)); }
                }
                if let Some((cost, c)) = best {
                    if cost < current {
                        colors[x] = c;
                        improved = true;
                    }
                }
            }
        }
    }
}

impl ColoringSolver for DsaturSolver {
    fn accepts(&self, _graph:&LocalGraph) -> bool { true }

    fn solve(&mut self, graph:&LocalGraph, seed:u64) -> (Vec<Color>, f64) {
        let mut colors = self.greedy(graph);
        let mut rng = Rng::with_seed(seed);
        self.repair(graph, &mut colors, &mut rng);
        let cost = graph.assignment_cost(&colors);
        (colors, cost)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_zero_cost() {
        let mut g = LocalGraph::new(4);
        for v in 1..4 { g.add_edge(v-1, v, 1.); }
        let (colors, cost) = DsaturSolver::new(3).solve(&g, 0);
        assert_eq!(cost, 0.);
        assert!(colors.iter().all(|c| *c >= 0 && *c < 3));
    }

    #[test]
    fn test_triangle_three_colors() {
        let mut g = LocalGraph::new(3);
        g.add_edge(0, 1, 1.);
        g.add_edge(1, 2, 1.);
        g.add_edge(0, 2, 1.);
        let (colors, cost) = DsaturSolver::new(3).solve(&g, 0);
        assert_eq!(cost, 0.);
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[0], colors[2]);
    }

    #[test]
    fn test_precolor_preserved() {
        let mut g = LocalGraph::new(3);
        g.add_edge(0, 1, 1.);
        g.add_edge(1, 2, 1.);
        g.set_precolor(0, 2);
        g.set_precolor(2, 2);
        let (colors, cost) = DsaturSolver::new(3).solve(&g, 0);
        assert_eq!(colors[0], 2);
        assert_eq!(colors[2], 2);
        assert_ne!(colors[1], 2);
        assert_eq!(cost, 0.);
    }

    #[test]
    fn test_stitch_prefers_same_color() {
        let mut g = LocalGraph::new(2);
        g.add_edge(0, 1, -0.1);
        let (colors, cost) = DsaturSolver::new(3).solve(&g, 0);
        assert_eq!(colors[0], colors[1]);
        assert_eq!(cost, 0.);
    }

    #[test]
    fn test_stitch_taken_to_avoid_conflicts() {
        // 0-1 stitch pair; 2 conflicts with 0, 3 conflicts with 1 and 2
        // forcing the pair apart is cheaper than a conflict
        let mut g = LocalGraph::new(4);
        g.add_edge(0, 1, -0.1);
        g.add_edge(0, 2, 1.);
        g.add_edge(1, 3, 1.);
        g.add_edge(2, 3, 1.);
        g.set_precolor(2, 1);
        g.set_precolor(3, 0);
        let (colors, cost) = DsaturSolver::new(2).solve(&g, 0);
        assert_ne!(colors[0], 1);
        assert_ne!(colors[1], 0);
        assert!((cost - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_density_tie_break() {
        let g = LocalGraph::new(1);
        let (colors, _) = DsaturSolver::with_density(3, vec![5,0,2]).solve(&g, 0);
        assert_eq!(colors[0], 1);
    }

    #[test]
    fn test_repair_improves_greedy() {
        // K4 minus one edge is 3-colorable; whatever the greedy does,
        // the final cost must be 0
        let mut g = LocalGraph::new(4);
        for (u,v) in &[(0,1),(0,2),(0,3),(1,2),(2,3)] { g.add_edge(*u, *v, 1.); }
        let (_, cost) = DsaturSolver::new(3).solve(&g, 42);
        assert_eq!(cost, 0.);
    }
}
