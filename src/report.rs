use crate::color::VertexId;
use crate::graph::ConflictGraph;
use crate::layout::LayoutDb;

/** Conflict and stitch tallies of an assignment */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    /// conflict edges whose endpoints share a color (both colored)
    pub conflicts: usize,
    /// stitch edges whose endpoints differ in color
    pub stitches: usize,
    /// conflict edges with at least one uncolored endpoint
    pub uncolored: usize,
}

impl std::ops::Add for ReportStats {
    type Output = ReportStats;

    fn add(self, rhs:ReportStats) -> ReportStats {
        ReportStats {
            conflicts: self.conflicts + rhs.conflicts,
            stitches: self.stitches + rhs.stitches,
            uncolored: self.uncolored + rhs.uncolored,
        }
    }
}

fn tally(db:&LayoutDb, u:VertexId, v:VertexId, stitch:bool, res:&mut ReportStats) {
    let (cu, cv) = (db.color(u), db.color(v));
    if stitch {
        if cu >= 0 && cv >= 0 && cu != cv { res.stitches += 1; }
    } else if cu < 0 || cv < 0 {
        res.uncolored += 1;
    } else if cu == cv {
        res.conflicts += 1;
    }
}

/** tallies over the whole layout (each unordered pair counted once) */
pub fn global_stats(db:&LayoutDb, graph:&ConflictGraph) -> ReportStats {
    let mut res = ReportStats::default();
    for u in 0..graph.nb_vertices() {
        for v in graph.neighbors(u) {
            if u < *v { tally(db, u, *v, false, &mut res); }
        }
        for v in graph.stitch_neighbors(u) {
            if u < *v { tally(db, u, *v, true, &mut res); }
        }
    }
    res
}

/** tallies over one component */
pub fn component_stats(db:&LayoutDb, graph:&ConflictGraph, vertices:&[VertexId]) -> ReportStats {
    let mut res = ReportStats::default();
    for u in vertices {
        for v in graph.neighbors(*u) {
            if u < v { tally(db, *u, *v, false, &mut res); }
        }
        for v in graph.stitch_neighbors(*u) {
            if u < v { tally(db, *u, *v, true, &mut res); }
        }
    }
    res
}

/** residual conflict pairs, for the output conflict layer */
pub fn conflict_pairs(db:&LayoutDb, graph:&ConflictGraph) -> Vec<(VertexId, VertexId)> {
    let mut res = Vec::new();
    for u in 0..graph.nb_vertices() {
        for v in graph.neighbors(u) {
            if u < *v && db.color(u) >= 0 && db.color(u) == db.color(*v) {
                res.push((u, *v));
            }
        }
    }
    res
}

/** taken stitch pairs, for the output stitch layer */
pub fn stitch_pairs(db:&LayoutDb, graph:&ConflictGraph) -> Vec<(VertexId, VertexId)> {
    let mut res = Vec::new();
    for u in 0..graph.nb_vertices() {
        for v in graph.stitch_neighbors(u) {
            if u < *v && db.color(u) >= 0 && db.color(*v) >= 0 && db.color(u) != db.color(*v) {
                res.push((u, *v));
            }
        }
    }
    res
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Pattern, Rect};
    use crate::layout::Config;

    fn db_with_colors(rects:Vec<(Rect, i8)>) -> LayoutDb {
        let patterns = rects.into_iter().map(|(r, c)| {
            let mut p = Pattern::new(r, 1);
            p.color = c;
            p
        }).collect();
        LayoutDb::from_patterns(
            Config { coloring_distance_nm: 10., ..Config::default() },
            1e-9, patterns,
        )
    }

    #[test]
    fn test_conflict_counted_once_per_pair() {
        let db = db_with_colors(vec![
            (Rect::new(0,0,5,5), 0),
            (Rect::new(12,0,17,5), 0),
        ]);
        let g = ConflictGraph::build(&db, &[]);
        let stats = global_stats(&db, &g);
        assert_eq!(stats.conflicts, 1);
        assert_eq!(conflict_pairs(&db, &g), vec![(0,1)]);
    }

    #[test]
    fn test_uncolored_tally_separate() {
        let db = db_with_colors(vec![
            (Rect::new(0,0,5,5), 0),
            (Rect::new(12,0,17,5), -1),
        ]);
        let g = ConflictGraph::build(&db, &[]);
        let stats = global_stats(&db, &g);
        assert_eq!(stats.conflicts, 0);
        assert_eq!(stats.uncolored, 1);
    }

    #[test]
    fn test_stitch_tally() {
        let mut a = Pattern::new(Rect::new(0,0,50,5), 1);
        a.origin = Some(0);
        a.color = 0;
        let mut b = Pattern::new(Rect::new(50,0,100,5), 1);
        b.origin = Some(0);
        b.color = 1;
        let db = LayoutDb::from_patterns(
            Config { coloring_distance_nm: 10., ..Config::default() },
            1e-9, vec![a,b],
        );
        let g = ConflictGraph::build(&db, &[vec![1], vec![]]);
        let stats = global_stats(&db, &g);
        assert_eq!(stats.stitches, 1);
        assert_eq!(stats.conflicts, 0);
        assert_eq!(stitch_pairs(&db, &g), vec![(0,1)]);
    }

    #[test]
    fn test_component_stats_sum_to_global() {
        let db = db_with_colors(vec![
            (Rect::new(0,0,5,5), 0),
            (Rect::new(12,0,17,5), 0),
            (Rect::new(100,0,105,5), 1),
            (Rect::new(112,0,117,5), 1),
        ]);
        let g = ConflictGraph::build(&db, &[]);
        let d = crate::component::connected_components(&g);
        let mut sum = ReportStats::default();
        for c in 0..d.nb_components() {
            sum = sum + component_stats(&db, &g, d.component(c));
        }
        assert_eq!(sum, global_stats(&db, &g));
        assert_eq!(sum.conflicts, 2);
    }
}
