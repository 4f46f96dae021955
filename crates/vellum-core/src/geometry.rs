//! Geometry utilities: world-space outlines, convex hull, minimum OBB.

use crate::element::{Element, ElementCommon, ElementId};
use kurbo::{Affine, Point, Rect, Vec2};

/// Number of segments used to approximate an ellipse outline.
const ELLIPSE_SEGMENTS: usize = 32;

/// Tolerance for treating points/edges as coincident.
const EPS: f64 = 1e-9;

/// World transform of an element: rotation and scale about the pivot, in
/// world coordinates. Applies to points that already carry the element's
/// (x, y) position.
pub fn world_transform(common: &ElementCommon) -> Affine {
    let px = common.x + common.transform.pivot_x * common.width;
    let py = common.y + common.transform.pivot_y * common.height;
    Affine::translate(Vec2::new(px, py))
        * Affine::rotate(common.rotation.to_radians())
        * Affine::scale_non_uniform(common.transform.scale_x, common.transform.scale_y)
        * Affine::translate(Vec2::new(-px, -py))
}

/// Transform from an element's origin space (top-left at 0,0) to world
/// space. Node content is built in origin space, so a position change is
/// a transform write that leaves the content untouched.
pub fn node_transform(common: &ElementCommon) -> Affine {
    world_transform(common) * Affine::translate(Vec2::new(common.x, common.y))
}

/// Outline of a non-group element in its local (untransformed) space.
fn local_outline(element: &Element) -> Vec<Point> {
    let c = element.common();
    let rect = c.local_rect();
    match element {
        Element::Circle(_) => {
            let center = rect.center();
            let rx = rect.width() / 2.0;
            let ry = rect.height() / 2.0;
            (0..ELLIPSE_SEGMENTS)
                .map(|i| {
                    let theta = std::f64::consts::TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
                    Point::new(center.x + rx * theta.cos(), center.y + ry * theta.sin())
                })
                .collect()
        }
        Element::Triangle(_) => vec![
            Point::new(rect.x0 + rect.width() / 2.0, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ],
        // Rect, text, image and (nominally) group all outline as their box.
        _ => vec![
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ],
    }
}

/// World-space outline polygon of a non-group element.
///
/// Group outlines depend on child resolution; use [`world_outline`].
pub fn world_outline_flat(element: &Element) -> Vec<Point> {
    let transform = world_transform(element.common());
    local_outline(element)
        .into_iter()
        .map(|p| transform * p)
        .collect()
}

/// World-space outline points of any element.
///
/// For groups this is the concatenation of all (recursively resolved)
/// child outlines; missing children are skipped.
pub fn world_outline(
    element: &Element,
    resolve: &dyn Fn(ElementId) -> Option<Element>,
) -> Vec<Point> {
    match element {
        Element::Group(group) => {
            let mut points = Vec::new();
            for &child_id in &group.children {
                if let Some(child) = resolve(child_id) {
                    points.extend(world_outline(&child, resolve));
                }
            }
            points
        }
        _ => world_outline_flat(element),
    }
}

/// Axis-aligned bounding box of a point set.
pub fn aabb_of(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect::new(first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        rect.x0 = rect.x0.min(p.x);
        rect.y0 = rect.y0.min(p.y);
        rect.x1 = rect.x1.max(p.x);
        rect.y1 = rect.y1.max(p.y);
    }
    Some(rect)
}

/// Point-in-polygon test (even-odd rule).
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pi.x + (point.y - pi.y) / (pj.y - pi.y) * (pj.x - pi.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Minimum distance from a point to the closed polygon boundary.
pub fn distance_to_polygon(point: Point, polygon: &[Point]) -> f64 {
    if polygon.is_empty() {
        return f64::INFINITY;
    }
    let mut min_dist = f64::INFINITY;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        min_dist = min_dist.min(point_to_segment_dist(point, a, b));
    }
    min_dist
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Convex hull via Andrew's monotone chain, counter-clockwise, without a
/// repeated closing point. Duplicate and collinear input points are safe.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS);

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Point, a: Point, b: Point| -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= EPS {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= EPS {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Minimum-area oriented bounding box over a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    /// Corners in order (a closed quadrilateral).
    pub corners: [Point; 4],
    pub center: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation of the width axis in radians.
    pub rotation: f64,
}

impl Obb {
    /// Axis-aligned box as a degenerate OBB (rotation 0).
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            corners: [
                Point::new(rect.x0, rect.y0),
                Point::new(rect.x1, rect.y0),
                Point::new(rect.x1, rect.y1),
                Point::new(rect.x0, rect.y1),
            ],
            center: rect.center(),
            width: rect.width(),
            height: rect.height(),
            rotation: 0.0,
        }
    }

    /// Box with known corner order (top-left first, clockwise) and
    /// rotation, e.g. a single element's transformed local rect.
    pub fn from_corners(corners: [Point; 4], rotation: f64) -> Self {
        let center = Point::new(
            (corners[0].x + corners[2].x) / 2.0,
            (corners[0].y + corners[2].y) / 2.0,
        );
        Self {
            corners,
            center,
            width: corners[0].distance(corners[1]),
            height: corners[1].distance(corners[2]),
            rotation,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Compute the minimum-area oriented bounding box of a point set using
/// rotating calipers over the convex hull.
///
/// Returns `None` for degenerate inputs (fewer than 2 distinct points);
/// callers fall back to an axis-aligned box. Zero-length hull edges are
/// skipped during the sweep.
pub fn minimum_bounding_box(points: &[Point]) -> Option<Obb> {
    let hull = convex_hull(points);
    if hull.len() < 2 {
        return None;
    }

    let mut best: Option<Obb> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let edge = Vec2::new(b.x - a.x, b.y - a.y);
        let len = edge.hypot();
        if len < EPS {
            continue;
        }
        let angle = edge.y.atan2(edge.x);
        let rot = Affine::rotate(-angle);

        // Bounding box of the hull in the edge-aligned frame.
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for &p in &hull {
            let q = rot * p;
            min_x = min_x.min(q.x);
            min_y = min_y.min(q.y);
            max_x = max_x.max(q.x);
            max_y = max_y.max(q.y);
        }

        let width = max_x - min_x;
        let height = max_y - min_y;
        let area = width * height;
        if best.as_ref().is_some_and(|b| b.area() <= area + EPS) {
            continue;
        }

        let back = Affine::rotate(angle);
        let corners = [
            back * Point::new(min_x, min_y),
            back * Point::new(max_x, min_y),
            back * Point::new(max_x, max_y),
            back * Point::new(min_x, max_y),
        ];
        let center = back * Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
        best = Some(Obb {
            corners,
            center,
            width,
            height,
            rotation: angle,
        });
    }

    best
}
