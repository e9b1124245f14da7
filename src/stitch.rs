use log::info;

use crate::color::VertexId;
use crate::geometry::{Coord, Pattern, Rect};
use crate::layout::LayoutDb;

/** Bookkeeping of stitch insertion. Indices refer to the renumbered
pattern vector produced by the registration step. */
#[derive(Debug, Default)]
pub struct StitchMap {
    /// new_to_original[new_id]: pattern the new one descends from
    pub new_to_original: Vec<usize>,
    /// original_to_new[original_id]: patterns produced from it
    pub original_to_new: Vec<Vec<usize>>,
    /// stitch_relation[new_id]: abutting siblings, lower-indexed side only
    pub stitch_relation: Vec<Vec<VertexId>>,
    /// number of patterns that were split
    pub nb_split: usize,
}

/** Runs projection before coloring: selects the patterns worth
splitting, computes split positions perpendicular to the long axis and
registers the resulting sub-patterns. The spatial index is rebuilt. */
pub fn run_projection(db:&mut LayoutDb) -> StitchMap {
    let d = db.coloring_distance();
    let n = db.nb_patterns();
    let jian_threshold = db.config().jian_threshold;
    // chosen split positions per pattern, along its long axis
    let mut splits:Vec<Vec<Coord>> = vec![Vec::new() ; n];
    for p in 0..n {
        let pat = db.pattern(p);
        if pat.color >= 0 { continue; } // only uncolored patterns split
        let neighbors:Vec<Rect> = db.probe(&pat.rect, d)
            .filter(|e| e.id != p && pat.rect.gap(&e.rect) < d)
            .map(|e| e.rect)
            .collect();
        if neighbors.is_empty() { continue; }
        splits[p] = projection(&pat.rect, &neighbors, d, jian_threshold);
    }

    let mut res = StitchMap {
        new_to_original: Vec::with_capacity(n),
        original_to_new: vec![Vec::new() ; n],
        stitch_relation: Vec::new(),
        nb_split: 0,
    };
    let mut new_patterns:Vec<Pattern> = Vec::with_capacity(n);
    let mut stitch_pairs:Vec<(usize, usize)> = Vec::new();
    for p in 0..n {
        let pat = db.pattern(p).clone();
        if splits[p].is_empty() {
            let id = new_patterns.len();
            res.new_to_original.push(p);
            res.original_to_new[p].push(id);
            new_patterns.push(pat);
        } else {
            res.nb_split += 1;
            let horizontal = pat.rect.width() >= pat.rect.height();
            let first = new_patterns.len();
            let subs = split_rect(&pat.rect, &splits[p], horizontal);
            for (i, r) in subs.iter().enumerate() {
                let id = first + i;
                res.new_to_original.push(p);
                res.original_to_new[p].push(id);
                if i + 1 < subs.len() { stitch_pairs.push((id, id+1)); }
                new_patterns.push(Pattern { rect:*r, layer:pat.layer, color:-1, origin:Some(p) });
            }
        }
    }
    res.stitch_relation = vec![Vec::new() ; new_patterns.len()];
    for (a, b) in stitch_pairs {
        res.stitch_relation[a].push(b);
    }
    info!("projection: split {} of {} patterns into {} total",
        res.nb_split, n, new_patterns.len());
    db.replace_patterns(new_patterns);
    res
}

/** computes split positions for one pattern given its close neighbors.
Neighbors are projected onto the long axis, expanded by the coloring
distance and clamped to the pattern span; the selector then picks the
cut positions. Patterns with many neighbors use the coverage-reduction
selector, the others the projection-gap selector. */
fn projection(rect:&Rect, neighbors:&[Rect], d:Coord, jian_threshold:usize) -> Vec<Coord> {
    let horizontal = rect.width() >= rect.height();
    let (lo, hi) = if horizontal { (rect.xl, rect.xh) } else { (rect.yl, rect.yh) };
    let intervals:Vec<(Coord, Coord)> = neighbors.iter().map(|q| {
        let (qlo, qhi) = if horizontal { (q.xl, q.xh) } else { (q.yl, q.yh) };
        (lo.max(qlo - d), hi.min(qhi + d))
    }).collect();
    if neighbors.len() > jian_threshold {
        select_jian(lo, hi, &intervals, d)
    } else {
        select_bei(lo, hi, &intervals, d)
    }
}

/** projection-gap selector: merges the neighbor projections into
maximal overlapping clusters and cuts at the midpoint of each gap
between consecutive clusters. Every cut separates neighbor clusters no
other cut separates. Cuts that would leave a sub-rectangle shorter
than the coloring distance are dropped. */
fn select_bei(lo:Coord, hi:Coord, intervals:&[(Coord, Coord)], d:Coord) -> Vec<Coord> {
    let mut sorted = intervals.to_vec();
    sorted.sort_unstable();
    let mut clusters:Vec<(Coord, Coord)> = Vec::new();
    for (a,b) in sorted {
        match clusters.last_mut() {
            Some(last) if a <= last.1 => { last.1 = last.1.max(b); }
            _ => clusters.push((a,b)),
        }
    }
    let candidates:Vec<Coord> = clusters.windows(2)
        .map(|w| (w[0].1 + w[1].0) / 2)
        .collect();
    enforce_min_length(lo, hi, candidates, d)
}

/** coverage-reduction selector for crowded patterns: cut positions are
picked from the projection endpoints, each pick must strictly reduce
the maximum number of neighbors projected onto any sub-interval. The
cut count is capped at ⌊log2(neighbor count)⌋ + 1. */
fn select_jian(lo:Coord, hi:Coord, intervals:&[(Coord, Coord)], d:Coord) -> Vec<Coord> {
    let cap = (intervals.len() as f64).log2().floor() as usize + 1;
    let mut candidates:Vec<Coord> = intervals.iter()
        .flat_map(|(a,b)| vec![*a, *b])
        .filter(|x| lo < *x && *x < hi)
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    let mut chosen:Vec<Coord> = Vec::new();
    while chosen.len() < cap {
        let current = max_coverage(lo, hi, &chosen, intervals);
        let mut best:Option<(usize, Coord)> = None;
        for x in &candidates {
            if chosen.contains(x) { continue; }
            let mut trial = chosen.clone();
            trial.push(*x);
            trial.sort_unstable();
            if enforce_min_length(lo, hi, trial.clone(), d).len() != trial.len() { continue; }
            let cov = max_coverage(lo, hi, &trial, intervals);
            if cov < current && best.map_or(true, |(bc,_)| cov < bc) {
                best = Some((cov, *x));
            }
        }
        match best {
            Some((_, x)) => {
                chosen.push(x);
                chosen.sort_unstable();
            }
            None => break,
        }
    }
    chosen
}

/// largest number of projections covering one sub-interval of [lo,hi]
fn max_coverage(lo:Coord, hi:Coord, cuts:&[Coord], intervals:&[(Coord, Coord)]) -> usize {
    let mut bounds = vec![lo];
    bounds.extend_from_slice(cuts);
    bounds.push(hi);
    bounds.windows(2).map(|w| {
        intervals.iter().filter(|(a,b)| *a < w[1] && *b > w[0]).count()
    }).max().unwrap_or(0)
}

/// drops cuts leaving a sub-span shorter than d, scanning left to right
fn enforce_min_length(lo:Coord, hi:Coord, candidates:Vec<Coord>, d:Coord) -> Vec<Coord> {
    let mut res = Vec::new();
    let mut prev = lo;
    for x in candidates {
        if x - prev >= d && hi - x >= d {
            res.push(x);
            prev = x;
        }
    }
    res
}

/// cuts a rectangle at the given positions, perpendicular to the long axis
fn split_rect(rect:&Rect, positions:&[Coord], horizontal:bool) -> Vec<Rect> {
    let (lo, hi) = if horizontal { (rect.xl, rect.xh) } else { (rect.yl, rect.yh) };
    let mut bounds = vec![lo];
    bounds.extend_from_slice(positions);
    bounds.push(hi);
    bounds.windows(2).map(|w| {
        if horizontal { Rect::new(w[0], rect.yl, w[1], rect.yh) }
        else { Rect::new(rect.xl, w[0], rect.xh, w[1]) }
    }).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Config, LayoutDb};

    fn test_db(patterns:Vec<Pattern>) -> LayoutDb {
        LayoutDb::from_patterns(
            Config { coloring_distance_nm: 10., projection: true, ..Config::default() },
            1e-9, patterns,
        )
    }

    #[test]
    fn test_select_bei_single_gap() {
        // clusters (0,20) and (80,100): one cut at the gap midpoint
        let cuts = select_bei(0, 100, &[(0,20),(80,100)], 10);
        assert_eq!(cuts, vec![50]);
    }

    #[test]
    fn test_select_bei_overlapping_projections_no_cut() {
        let cuts = select_bei(0, 100, &[(0,60),(40,100)], 10);
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_select_bei_min_length() {
        // the gap midpoint would leave a 4-long piece on the left
        let cuts = select_bei(0, 30, &[(0,2),(6,30)], 10);
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_select_jian_reduces_coverage() {
        let intervals = vec![(0,40),(0,40),(60,100),(60,100),(60,100)];
        let cuts = select_jian(0, 100, &intervals, 10);
        assert!(!cuts.is_empty());
        let before = max_coverage(0, 100, &[], &intervals);
        let after = max_coverage(0, 100, &cuts, &intervals);
        assert!(after < before);
        assert!(cuts.len() <= (intervals.len() as f64).log2().floor() as usize + 1);
    }

    #[test]
    fn test_split_rect() {
        let subs = split_rect(&Rect::new(0,0,100,5), &[50], true);
        assert_eq!(subs, vec![Rect::new(0,0,50,5), Rect::new(50,0,100,5)]);
        let subs_v = split_rect(&Rect::new(0,0,5,100), &[30,60], false);
        assert_eq!(subs_v.len(), 3);
        assert_eq!(subs_v[1], Rect::new(0,30,5,60));
    }

    #[test]
    fn test_run_projection_splits_long_pattern() {
        let db_patterns = vec![
            Pattern::new(Rect::new(0,0,100,5), 1),
            Pattern::new(Rect::new(-5,10,10,15), 1),
            Pattern::new(Rect::new(90,10,105,15), 1),
        ];
        let mut db = test_db(db_patterns);
        let map = run_projection(&mut db);
        assert_eq!(map.nb_split, 1);
        assert_eq!(db.nb_patterns(), 4);
        assert_eq!(map.original_to_new[0].len(), 2);
        let (a, b) = (map.original_to_new[0][0], map.original_to_new[0][1]);
        assert_eq!(map.new_to_original[a], 0);
        assert_eq!(map.new_to_original[b], 0);
        assert_eq!(map.stitch_relation[a], vec![b]);
        assert!(map.stitch_relation[b].is_empty());
        // split products abut at the cut
        assert_eq!(db.pattern(a).rect.xh, db.pattern(b).rect.xl);
        assert_eq!(db.pattern(a).origin, Some(0));
        // ids stay dense after registration
        for (new_id, orig) in map.new_to_original.iter().enumerate() {
            assert!(map.original_to_new[*orig].contains(&new_id));
        }
    }

    #[test]
    fn test_run_projection_skips_precolored_and_lonely() {
        let mut pre = Pattern::new(Rect::new(0,0,100,5), 10);
        pre.color = 0;
        let patterns = vec![
            pre,
            Pattern::new(Rect::new(0,10,100,15), 1), // neighbor of the precolored one
            Pattern::new(Rect::new(0,1000,100,1005), 1), // no neighbor at all
        ];
        let mut db = test_db(patterns);
        let map = run_projection(&mut db);
        // the precolored pattern never splits; the lonely one has no
        // neighbor; the middle one sees a single overlapping projection
        assert_eq!(map.nb_split, 0);
        assert_eq!(db.nb_patterns(), 3);
    }

    #[test]
    fn test_vertical_split() {
        let patterns = vec![
            Pattern::new(Rect::new(0,0,5,100), 1),
            Pattern::new(Rect::new(10,-5,15,10), 1),
            Pattern::new(Rect::new(10,90,15,105), 1),
        ];
        let mut db = test_db(patterns);
        let map = run_projection(&mut db);
        assert_eq!(map.nb_split, 1);
        let (a, b) = (map.original_to_new[0][0], map.original_to_new[0][1]);
        assert_eq!(db.pattern(a).rect.yh, db.pattern(b).rect.yl);
    }
}
