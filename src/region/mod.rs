//! Region algebra for clipping and dirty tracking.
//!
//! A [`Region`] is a set of pixels stored as y-sorted bands of x-sorted
//! spans. Every operation re-normalizes the bands (no empty bands, no
//! touching spans, vertically adjacent bands with identical spans merged),
//! so two regions covering the same pixels are structurally equal and
//! `==` is region equality, not bounding-box equality.

pub mod pool;

pub use pool::{PooledRegion, RegionPool};

use crate::shared::{Point, Rect};

/// Half-open horizontal run `[left, right)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    left: i32,
    right: i32,
}

/// Half-open band `[top, bottom)` sharing one set of spans.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Band {
    top: i32,
    bottom: i32,
    spans: Vec<Span>,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Union,
    Difference,
    Intersection,
}

impl Op {
    fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Op::Union => a || b,
            Op::Difference => a && !b,
            Op::Intersection => a && b,
        }
    }
}

/// A set of screen pixels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    bands: Vec<Band>,
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        let mut region = Region::new();
        region.set(rect);
        region
    }
}

impl Region {
    pub fn new() -> Self {
        Self { bands: Vec::new() }
    }

    /// Replace the contents with a single rectangle.
    pub fn set(&mut self, rect: Rect) {
        self.bands.clear();
        if rect.is_valid() {
            self.bands.push(Band {
                top: rect.top,
                bottom: rect.bottom + 1,
                spans: vec![Span {
                    left: rect.left,
                    right: rect.right + 1,
                }],
            });
        }
    }

    pub fn make_empty(&mut self) {
        self.bands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Number of disjoint rectangles making up the region.
    pub fn count_rects(&self) -> usize {
        self.bands.iter().map(|band| band.spans.len()).sum()
    }

    /// The disjoint rectangles making up the region, top to bottom.
    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.bands.iter().flat_map(|band| {
            band.spans
                .iter()
                .map(move |span| Rect::new(span.left, band.top, span.right - 1, band.bottom - 1))
        })
    }

    /// Bounding rectangle; invalid for an empty region.
    pub fn frame(&self) -> Rect {
        let (Some(first), Some(last)) = (self.bands.first(), self.bands.last()) else {
            return Rect::INVALID;
        };
        let left = self
            .bands
            .iter()
            .filter_map(|band| band.spans.first())
            .map(|span| span.left)
            .min()
            .unwrap_or(0);
        let right = self
            .bands
            .iter()
            .filter_map(|band| band.spans.last())
            .map(|span| span.right)
            .max()
            .unwrap_or(0);
        Rect::new(left, first.top, right - 1, last.bottom - 1)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bands
            .iter()
            .find(|band| band.top <= point.y && point.y < band.bottom)
            .map(|band| {
                band.spans
                    .iter()
                    .any(|span| span.left <= point.x && point.x < span.right)
            })
            .unwrap_or(false)
    }

    pub fn intersects(&self, rect: Rect) -> bool {
        rect.is_valid() && self.rects().any(|r| r.intersects(&rect))
    }

    /// True if every pixel of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Region) -> bool {
        combine(self, other, Op::Difference).is_empty()
    }

    pub fn include_rect(&mut self, rect: Rect) {
        if rect.is_valid() {
            *self = combine(self, &Region::from(rect), Op::Union);
        }
    }

    pub fn include(&mut self, other: &Region) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.clone_from(other);
            return;
        }
        *self = combine(self, other, Op::Union);
    }

    pub fn exclude_rect(&mut self, rect: Rect) {
        if rect.is_valid() && !self.is_empty() {
            *self = combine(self, &Region::from(rect), Op::Difference);
        }
    }

    pub fn exclude(&mut self, other: &Region) {
        if other.is_empty() || self.is_empty() {
            return;
        }
        *self = combine(self, other, Op::Difference);
    }

    pub fn intersect_with_rect(&mut self, rect: Rect) {
        *self = combine(self, &Region::from(rect), Op::Intersection);
    }

    pub fn intersect_with(&mut self, other: &Region) {
        if self.is_empty() {
            return;
        }
        *self = combine(self, other, Op::Intersection);
    }

    pub fn offset_by(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        for band in &mut self.bands {
            band.top += dy;
            band.bottom += dy;
            for span in &mut band.spans {
                span.left += dx;
                span.right += dx;
            }
        }
    }

    fn push_band(&mut self, top: i32, bottom: i32, spans: Vec<Span>) {
        if spans.is_empty() {
            return;
        }
        if let Some(last) = self.bands.last_mut() {
            if last.bottom == top && last.spans == spans {
                last.bottom = bottom;
                return;
            }
        }
        self.bands.push(Band { top, bottom, spans });
    }
}

/// Sweep both regions band by band and keep what `op` selects.
fn combine(a: &Region, b: &Region, op: Op) -> Region {
    let mut ys: Vec<i32> = a
        .bands
        .iter()
        .chain(b.bands.iter())
        .flat_map(|band| [band.top, band.bottom])
        .collect();
    ys.sort_unstable();
    ys.dedup();

    let mut out = Region::new();
    let (mut ia, mut ib) = (0, 0);
    for pair in ys.windows(2) {
        let (y0, y1) = (pair[0], pair[1]);
        while ia < a.bands.len() && a.bands[ia].bottom <= y0 {
            ia += 1;
        }
        while ib < b.bands.len() && b.bands[ib].bottom <= y0 {
            ib += 1;
        }
        let spans_a = spans_covering(&a.bands, ia, y0);
        let spans_b = spans_covering(&b.bands, ib, y0);
        out.push_band(y0, y1, combine_spans(spans_a, spans_b, op));
    }
    out
}

fn spans_covering(bands: &[Band], index: usize, y: i32) -> &[Span] {
    match bands.get(index) {
        Some(band) if band.top <= y => &band.spans,
        _ => &[],
    }
}

fn combine_spans(a: &[Span], b: &[Span], op: Op) -> Vec<Span> {
    let mut xs: Vec<i32> = a
        .iter()
        .chain(b.iter())
        .flat_map(|span| [span.left, span.right])
        .collect();
    xs.sort_unstable();
    xs.dedup();

    let mut out: Vec<Span> = Vec::new();
    let (mut ia, mut ib) = (0, 0);
    for pair in xs.windows(2) {
        let (x0, x1) = (pair[0], pair[1]);
        while ia < a.len() && a[ia].right <= x0 {
            ia += 1;
        }
        while ib < b.len() && b[ib].right <= x0 {
            ib += 1;
        }
        let in_a = a.get(ia).is_some_and(|span| span.left <= x0);
        let in_b = b.get(ib).is_some_and(|span| span.left <= x0);
        if !op.apply(in_a, in_b) {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.right == x0 => last.right = x1,
            _ => out.push(Span {
                left: x0,
                right: x1,
            }),
        }
    }
    out
}
