use crate::color::{Color, ColoringSolver, LocalGraph, VertexId};

/** Reversible simplification of a component graph before solving.

Level 1 iteratively hides vertices of degree below K; hidden vertices
always have a low-cost color available when re-inserted in reverse
order. Level 2 additionally splits the remaining graph into biconnected
blocks, solves each block independently and merges the block colorings
at the articulation vertices by color permutation. The merge step
assumes colors are freely permutable, so it only runs on components
without precolored vertices; such components are processed at level 1. */
#[derive(Debug)]
pub struct Block {
    /// vertices of the block, in parent-graph ids
    pub vertices: Vec<VertexId>,
}

/** hides vertices of degree < k (precolored vertices stay). Returns the
hiding order and the aliveness of the remaining vertices. */
pub fn hide_small_degree(graph:&LocalGraph, k:i8) -> (Vec<VertexId>, Vec<bool>) {
    let n = graph.n();
    let k = k as usize;
    let mut alive = vec![true ; n];
    let mut deg:Vec<usize> = (0..n).map(|v| graph.degree(v)).collect();
    let mut hidden:Vec<VertexId> = Vec::new();
    let mut worklist:Vec<VertexId> = (0..n)
        .filter(|v| graph.precolor(*v) < 0 && deg[*v] < k)
        .collect();
    while let Some(v) = worklist.pop() {
        if !alive[v] || graph.precolor(v) >= 0 || deg[v] >= k { continue; }
        alive[v] = false;
        hidden.push(v);
        for (w, _) in graph.adj(v) {
            if alive[*w] {
                deg[*w] -= 1;
                if deg[*w] < k && graph.precolor(*w) < 0 { worklist.push(*w); }
            }
        }
    }
    (hidden, alive)
}

/** re-inserts hidden vertices in reverse hiding order, assigning each
the color of minimum cost against its already-colored neighbors. Ties
break toward the globally least-used color. */
pub fn recover_hidden(
    graph:&LocalGraph,
    hidden:&[VertexId],
    colors:&mut [Color],
    k:i8,
    density:&[usize],
) {
    for v in hidden.iter().rev() {
        let mut best:Option<(f64, usize, Color)> = None;
        for c in 0..k {
            let mut cost = 0.;
            for (w, weight) in graph.adj(*v) {
                if colors[*w] < 0 { continue; }
                if *weight > 0. {
                    if colors[*w] == c { cost += weight; }
                } else if colors[*w] != c {
                    cost += -weight;
                }
            }
            let d = density.get(c as usize).copied().unwrap_or(0);
            if best.map_or(true, |(bc, bd, _)| (cost, d) < (bc, bd)) {
                best = Some((cost, d, c));
            }
        }
        colors[*v] = best.map(|(_,_,c)| c).unwrap_or(0);
    }
}

/** splits the alive subgraph into biconnected blocks with an iterative
Tarjan edge-stack traversal. Isolated alive vertices come back as
singleton blocks. */
pub fn biconnected_blocks(graph:&LocalGraph, alive:&[bool]) -> Vec<Block> {
    let n = graph.n();
    let mut disc = vec![0usize ; n]; // discovery time, 0 = unvisited
    let mut low = vec![0usize ; n];
    let mut timer = 0usize;
    let mut blocks:Vec<Block> = Vec::new();
    let mut edge_stack:Vec<(VertexId, VertexId)> = Vec::new();
    // frames: (vertex, parent, next adjacency index)
    let mut frames:Vec<(VertexId, VertexId, usize)> = Vec::new();
    for root in 0..n {
        if !alive[root] || disc[root] != 0 { continue; }
        timer += 1;
        disc[root] = timer;
        low[root] = timer;
        frames.push((root, usize::MAX, 0));
        while let Some(frame) = frames.last_mut() {
            let (v, parent, idx) = (frame.0, frame.1, frame.2);
            if idx < graph.degree(v) {
                frame.2 += 1;
                let (w, _) = graph.adj(v)[idx];
                if !alive[w] { continue; }
                if disc[w] == 0 {
                    edge_stack.push((v, w));
                    timer += 1;
                    disc[w] = timer;
                    low[w] = timer;
                    frames.push((w, v, 0));
                } else if w != parent && disc[w] < disc[v] {
                    edge_stack.push((v, w));
                    low[v] = low[v].min(disc[w]);
                }
            } else {
                frames.pop();
                if let Some(pframe) = frames.last_mut() {
                    let p = pframe.0;
                    low[p] = low[p].min(low[v]);
                    if low[v] >= disc[p] {
                        // (p,v) closes a block
                        let mut verts:Vec<VertexId> = Vec::new();
                        loop {
                            let (a,b) = edge_stack.pop().expect("edge stack underflow");
                            verts.push(a);
                            verts.push(b);
                            if (a,b) == (p,v) { break; }
                        }
                        verts.sort_unstable();
                        verts.dedup();
                        blocks.push(Block { vertices:verts });
                    }
                }
            }
        }
    }
    // isolated alive vertices belong to no edge, give them singleton blocks
    let mut covered = vec![false ; n];
    for b in &blocks {
        for v in &b.vertices { covered[*v] = true; }
    }
    for v in 0..n {
        if alive[v] && !covered[v] {
            blocks.push(Block { vertices:vec![v] });
        }
    }
    blocks
}

/** orders blocks so that each one (except tree roots) is processed
after a block it shares an articulation vertex with; that shared vertex
is returned as the block's merge anchor */
pub fn order_blocks(blocks:&[Block], n:usize) -> Vec<(usize, Option<VertexId>)> {
    let mut vertex_blocks:Vec<Vec<usize>> = vec![Vec::new() ; n];
    for (b, block) in blocks.iter().enumerate() {
        for v in &block.vertices { vertex_blocks[*v].push(b); }
    }
    let mut processed = vec![false ; blocks.len()];
    let mut res:Vec<(usize, Option<VertexId>)> = Vec::new();
    let mut queue:Vec<(usize, Option<VertexId>)> = Vec::new();
    for start in 0..blocks.len() {
        if processed[start] { continue; }
        queue.push((start, None));
        while let Some((b, anchor)) = queue.pop() {
            if processed[b] { continue; }
            processed[b] = true;
            res.push((b, anchor));
            for v in &blocks[b].vertices {
                for b2 in &vertex_blocks[*v] {
                    if !processed[*b2] { queue.push((*b2, Some(*v))); }
                }
            }
        }
    }
    res
}

/** colors a component graph at the given simplification level.

Returns None when the backend declines one of the (simplified)
subgraphs; the caller then retries at the next lower level. */
pub fn color_component(
    graph:&LocalGraph,
    level:u8,
    solver:&mut dyn ColoringSolver,
    k:i8,
    density:&[usize],
    seed:u64,
) -> Option<(Vec<Color>, f64)> {
    if level == 0 {
        if !solver.accepts(graph) { return None; }
        let (colors, _) = solver.solve(graph, seed);
        let cost = graph.assignment_cost(&colors);
        return Some((colors, cost));
    }
    let mut colors:Vec<Color> = (0..graph.n()).map(|v| graph.precolor(v)).collect();
    let (hidden, alive) = hide_small_degree(graph, k);
    let remaining:Vec<VertexId> = (0..graph.n()).filter(|v| alive[*v]).collect();
    if !remaining.is_empty() {
        if level >= 2 && !graph.has_precolor() {
            let blocks = biconnected_blocks(graph, &alive);
            for (bi, (b, anchor)) in order_blocks(&blocks, graph.n()).into_iter().enumerate() {
                let block = &blocks[b];
                let (sub, local_to_parent) = graph.induced(&block.vertices);
                if !solver.accepts(&sub) { return None; }
                let (mut sub_colors, _) = solver.solve(&sub, seed.wrapping_add(bi as u64));
                if let Some(a) = anchor {
                    let local_a = local_to_parent.iter().position(|v| *v == a)
                        .expect("anchor not in its block");
                    let c_prev = colors[a];
                    let c_new = sub_colors[local_a];
                    if c_prev >= 0 && c_new != c_prev {
                        for c in sub_colors.iter_mut() {
                            if *c == c_new { *c = c_prev; }
                            else if *c == c_prev { *c = c_new; }
                        }
                    }
                }
                for (local, parent) in local_to_parent.iter().enumerate() {
                    colors[*parent] = sub_colors[local];
                }
            }
        } else {
            let (sub, local_to_parent) = graph.induced(&remaining);
            if !solver.accepts(&sub) { return None; }
            let (sub_colors, _) = solver.solve(&sub, seed);
            for (local, parent) in local_to_parent.iter().enumerate() {
                colors[*parent] = sub_colors[local];
            }
        }
    }
    recover_hidden(graph, &hidden, &mut colors, k, density);
    let cost = graph.assignment_cost(&colors);
    Some((colors, cost))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::UNCOLORED;
    use crate::solvers::backtrack::BacktrackSolver;

    fn path(n:usize) -> LocalGraph {
        let mut g = LocalGraph::new(n);
        for v in 1..n { g.add_edge(v-1, v, 1.); }
        g
    }

    fn two_triangles_sharing_vertex() -> LocalGraph {
        // triangles {0,1,2} and {2,3,4} articulated at 2
        let mut g = LocalGraph::new(5);
        for (u,v) in &[(0,1),(1,2),(0,2),(2,3),(3,4),(2,4)] {
            g.add_edge(*u, *v, 1.);
        }
        g
    }

    #[test]
    fn test_hide_small_degree_path() {
        let g = path(5);
        let (hidden, alive) = hide_small_degree(&g, 3);
        assert_eq!(hidden.len(), 5);
        assert!(alive.iter().all(|a| !a));
    }

    #[test]
    fn test_hide_skips_precolored() {
        let mut g = path(3);
        g.set_precolor(1, 0);
        let (hidden, alive) = hide_small_degree(&g, 3);
        assert_eq!(hidden.len(), 2);
        assert!(alive[1]);
    }

    #[test]
    fn test_recover_hidden_no_conflict() {
        let g = path(5);
        let (hidden, _) = hide_small_degree(&g, 3);
        let mut colors = vec![UNCOLORED ; 5];
        recover_hidden(&g, &hidden, &mut colors, 3, &[0,0,0]);
        assert!(colors.iter().all(|c| *c >= 0 && *c < 3));
        assert_eq!(g.assignment_cost(&colors), 0.);
    }

    #[test]
    fn test_biconnected_blocks() {
        let g = two_triangles_sharing_vertex();
        let alive = vec![true ; 5];
        let mut blocks = biconnected_blocks(&g, &alive);
        blocks.sort_by_key(|b| b.vertices.clone());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].vertices, vec![0,1,2]);
        assert_eq!(blocks[1].vertices, vec![2,3,4]);
    }

    #[test]
    fn test_biconnected_isolated_vertex() {
        let mut g = LocalGraph::new(3);
        g.add_edge(0, 1, 1.);
        let blocks = biconnected_blocks(&g, &[true,true,true]);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().any(|b| b.vertices == vec![2]));
    }

    #[test]
    fn test_order_blocks_anchors() {
        let g = two_triangles_sharing_vertex();
        let blocks = biconnected_blocks(&g, &[true ; 5]);
        let order = order_blocks(&blocks, g.n());
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].1, None);
        assert_eq!(order[1].1, Some(2));
    }

    #[test]
    fn test_color_component_levels_agree() {
        let g = two_triangles_sharing_vertex();
        for level in 0..=2 {
            let mut solver = BacktrackSolver::new(3);
            let (colors, cost) = color_component(&g, level, &mut solver, 3, &[0,0,0], 0)
                .expect("backtrack accepts small graphs");
            assert_eq!(cost, 0., "level {}", level);
            assert_eq!(g.assignment_cost(&colors), 0.);
        }
    }

    #[test]
    fn test_color_component_preserves_precolor() {
        let mut g = path(4);
        g.set_precolor(2, 1);
        let mut solver = BacktrackSolver::new(3);
        let (colors, cost) = color_component(&g, 2, &mut solver, 3, &[0,0,0], 0).unwrap();
        assert_eq!(colors[2], 1);
        assert_eq!(cost, 0.);
    }

    #[test]
    fn test_color_component_k4_has_one_conflict() {
        // K4 with 3 colors: one conflict is unavoidable
        let mut g = LocalGraph::new(4);
        for u in 0..4 {
            for v in (u+1)..4 { g.add_edge(u, v, 1.); }
        }
        let mut solver = BacktrackSolver::new(3);
        let (colors, cost) = color_component(&g, 2, &mut solver, 3, &[0,0,0], 0).unwrap();
        assert_eq!(cost, 1.);
        assert_eq!(g.assignment_cost(&colors), 1.);
    }
}
