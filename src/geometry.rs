use rstar::{RStarInsertionStrategy, RTree, RTreeObject, RTreeParams, AABB};

use crate::color::Color;

/** Coordinate in database units */
pub type Coord = i64;

/** An axis-aligned rectangle in database units. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// low x coordinate
    pub xl: Coord,
    /// low y coordinate
    pub yl: Coord,
    /// high x coordinate
    pub xh: Coord,
    /// high y coordinate
    pub yh: Coord,
}

impl Rect {
    /** creates a rectangle, normalizing the corner order */
    pub fn new(xl:Coord, yl:Coord, xh:Coord, yh:Coord) -> Self {
        Self {
            xl: xl.min(xh), yl: yl.min(yh),
            xh: xl.max(xh), yh: yl.max(yh),
        }
    }

    /** bounding rectangle of a point list (None if the list is empty) */
    pub fn from_points(points:&[(Coord,Coord)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut res = Self::new(first.0, first.1, first.0, first.1);
        for p in rest { res.encompass_point(p.0, p.1); }
        Some(res)
    }

    /// width of the rectangle
    pub fn width(&self) -> Coord { self.xh - self.xl }

    /// height of the rectangle
    pub fn height(&self) -> Coord { self.yh - self.yl }

    /// area of the rectangle
    pub fn area(&self) -> i64 { self.width() * self.height() }

    /** grows the rectangle to include the point (x,y) */
    pub fn encompass_point(&mut self, x:Coord, y:Coord) {
        self.xl = self.xl.min(x);
        self.yl = self.yl.min(y);
        self.xh = self.xh.max(x);
        self.yh = self.yh.max(y);
    }

    /** grows the rectangle to include another rectangle */
    pub fn encompass(&mut self, other:&Rect) {
        self.encompass_point(other.xl, other.yl);
        self.encompass_point(other.xh, other.yh);
    }

    /** rectangle expanded by d on all four sides */
    pub fn expand(&self, d:Coord) -> Rect {
        Rect { xl:self.xl-d, yl:self.yl-d, xh:self.xh+d, yh:self.yh+d }
    }

    /// true iff (x,y) lies in the rectangle (boundary included)
    pub fn contains_point(&self, x:Coord, y:Coord) -> bool {
        self.xl <= x && x <= self.xh && self.yl <= y && y <= self.yh
    }

    /** L∞ gap between two rectangles.
    Negative or zero when the rectangles touch or overlap. */
    pub fn gap(&self, other:&Rect) -> Coord {
        let gap_x = (self.xl - other.xh).max(other.xl - self.xh);
        let gap_y = (self.yl - other.yh).max(other.yl - self.yh);
        gap_x.max(gap_y)
    }

    /** intersection of two rectangles (None when disjoint) */
    pub fn intersect(&self, other:&Rect) -> Option<Rect> {
        let xl = self.xl.max(other.xl);
        let yl = self.yl.max(other.yl);
        let xh = self.xh.min(other.xh);
        let yh = self.yh.min(other.yh);
        if xl <= xh && yl <= yh { Some(Rect { xl, yl, xh, yh }) } else { None }
    }

    /// center point, rounded down
    pub fn center(&self) -> (Coord, Coord) {
        ((self.xl+self.xh)/2, (self.yl+self.yh)/2)
    }

    /// corner points in counter-clockwise order
    pub fn corners(&self) -> [(Coord,Coord); 4] {
        [(self.xl,self.yl), (self.xh,self.yl), (self.xh,self.yh), (self.xl,self.yh)]
    }
}

/** A conflict-edge hint segment from a path layer. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// first endpoint
    pub p1: (Coord, Coord),
    /// second endpoint
    pub p2: (Coord, Coord),
}

impl Segment {
    /// squared euclidean length
    pub fn length2(&self) -> i64 {
        let dx = self.p2.0 - self.p1.0;
        let dy = self.p2.1 - self.p1.1;
        dx*dx + dy*dy
    }
}

/** A layout pattern: a rectangle tagged with its input layer and color.
The pattern id is implicit, it is the pattern's index in the layout
pattern vector. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// rectangle geometry
    pub rect: Rect,
    /// input layer
    pub layer: i32,
    /// assigned color (-1 if uncolored)
    pub color: Color,
    /// id of the pattern this one was split from, if any
    pub origin: Option<usize>,
}

impl Pattern {
    /** creates an uncolored pattern */
    pub fn new(rect:Rect, layer:i32) -> Self {
        Self { rect, layer, color:-1, origin:None }
    }

    /// true iff the pattern carries a fixed input color
    pub fn is_precolored(&self) -> bool { self.color >= 0 }
}

/** Entry of the spatial index: a pattern bounding box carrying the
dense pattern id. The index holds these by value so its lifetime is
independent from pattern mutation, it is rebuilt whenever the pattern
vector changes. */
#[derive(Debug, Clone)]
pub struct PatternEnvelope {
    /// index of the pattern in the layout pattern vector
    pub id: usize,
    /// cached pattern rectangle
    pub rect: Rect,
}

impl RTreeObject for PatternEnvelope {
    type Envelope = AABB<[Coord; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.rect.xl, self.rect.yl], [self.rect.xh, self.rect.yh])
    }
}

/** R*-tree parameters of the pattern index: node fanout 16, bulk
loaded once after ingestion (packing beats incremental insertion on
large layouts) */
#[derive(Debug)]
pub struct PatternTreeParams;

impl RTreeParams for PatternTreeParams {
    const MIN_SIZE:usize = 8;
    const MAX_SIZE:usize = 16;
    const REINSERTION_COUNT:usize = 4;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

/** the pattern spatial index */
pub type PatternTree = RTree<PatternEnvelope, PatternTreeParams>;
