use crate::color::VertexId;
use crate::graph::ConflictGraph;

/** Partition of the conflict graph into connected components.

Vertices of each component are stored contiguously in `vertex_order`;
component c occupies `vertex_order[comp_begin[c]..comp_begin[c+1]]`.
Reachability spans conflict and stitch edges alike. */
#[derive(Debug, Default)]
pub struct Decomposition {
    /// comp_id[v]: component of vertex v
    pub comp_id: Vec<u32>,
    /// vertices grouped by component, DFS discovery order inside each
    pub vertex_order: Vec<VertexId>,
    /// component boundaries in vertex_order (nb components + 1 entries)
    pub comp_begin: Vec<usize>,
}

impl Decomposition {
    /// number of components
    pub fn nb_components(&self) -> usize { self.comp_begin.len().saturating_sub(1) }

    /// vertices of component c
    pub fn component(&self, c:usize) -> &[VertexId] {
        &self.vertex_order[self.comp_begin[c]..self.comp_begin[c+1]]
    }
}

/** computes connected components with an iterative depth-first
traversal over the adjacency lists */
pub fn connected_components(graph:&ConflictGraph) -> Decomposition {
    let n = graph.nb_vertices();
    let mut res = Decomposition {
        comp_id: vec![u32::MAX ; n],
        vertex_order: Vec::with_capacity(n),
        comp_begin: vec![0],
    };
    let mut stack:Vec<VertexId> = Vec::new();
    let mut comp_cnt:u32 = 0;
    for source in 0..n {
        if res.comp_id[source] != u32::MAX { continue; }
        stack.push(source);
        while let Some(v) = stack.pop() {
            if res.comp_id[v] != u32::MAX { continue; }
            res.comp_id[v] = comp_cnt;
            res.vertex_order.push(v);
            for w in graph.all_neighbors(v) {
                if res.comp_id[*w] == u32::MAX { stack.push(*w); }
            }
        }
        comp_cnt += 1;
        res.comp_begin.push(res.vertex_order.len());
    }
    res
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Pattern, Rect};
    use crate::layout::{Config, LayoutDb};

    fn decompose(rects:Vec<Rect>) -> (ConflictGraph, Decomposition) {
        let patterns = rects.into_iter().map(|r| Pattern::new(r, 1)).collect();
        let db = LayoutDb::from_patterns(
            Config { coloring_distance_nm: 10., ..Config::default() },
            1e-9, patterns,
        );
        let g = ConflictGraph::build(&db, &[]);
        let d = connected_components(&g);
        (g, d)
    }

    #[test]
    fn test_two_singletons() {
        let (_, d) = decompose(vec![Rect::new(0,0,5,5), Rect::new(20,0,25,5)]);
        assert_eq!(d.nb_components(), 2);
        assert_eq!(d.component(0), &[0]);
        assert_eq!(d.component(1), &[1]);
    }

    #[test]
    fn test_chain_is_one_component() {
        let (_, d) = decompose(vec![
            Rect::new(0,0,5,5), Rect::new(12,0,17,5), Rect::new(24,0,29,5),
        ]);
        assert_eq!(d.nb_components(), 1);
        assert_eq!(d.component(0).len(), 3);
    }

    #[test]
    fn test_partition_invariants() {
        let (g, d) = decompose(vec![
            Rect::new(0,0,5,5), Rect::new(12,0,17,5),
            Rect::new(100,0,105,5), Rect::new(100,12,105,17),
            Rect::new(200,0,205,5),
        ]);
        // every vertex has exactly one component and appears once in the order
        assert_eq!(d.comp_id.len(), 5);
        let mut order = d.vertex_order.clone();
        order.sort_unstable();
        assert_eq!(order, vec![0,1,2,3,4]);
        // edges never cross components
        for u in 0..g.nb_vertices() {
            for v in g.neighbors(u) {
                assert_eq!(d.comp_id[u], d.comp_id[*v]);
            }
        }
        // vertices in one component are mutually reachable (checked by size here)
        assert_eq!(d.nb_components(), 3);
        assert_eq!(d.component(0).len(), 2);
        assert_eq!(d.component(1).len(), 2);
        assert_eq!(d.component(2).len(), 1);
    }

    #[test]
    fn test_stitch_edges_join_components() {
        let mut a = Pattern::new(Rect::new(0,0,50,5), 1);
        a.origin = Some(0);
        let mut b = Pattern::new(Rect::new(50,0,100,5), 1);
        b.origin = Some(0);
        let db = LayoutDb::from_patterns(
            Config { coloring_distance_nm: 10., ..Config::default() },
            1e-9, vec![a,b],
        );
        let g = ConflictGraph::build(&db, &[vec![1], vec![]]);
        let d = connected_components(&g);
        assert_eq!(d.nb_components(), 1);
    }
}
