//! Douglas-Peucker simplification over a pluggable distance metric.

use crate::gpx_types::*;

/// Distance of `point` from the chord running from `start` to `end`.
pub trait PerpendicularDistance {
    fn distance(&self, start: &GpxPoint, end: &GpxPoint, point: &GpxPoint) -> f64;
}

/// Height of the triangle `a b p` over the base `a b`, computed from its
/// area. With a zero-length base this is the straight distance `a p`.
fn triangle_height(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let base = (b.0 - a.0).hypot(b.1 - a.1);
    if base == 0.0 {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }
    let doubled_area = ((b.0 - a.0) * (p.1 - a.1) - (p.0 - a.0) * (b.1 - a.1)).abs();
    doubled_area / base
}

/// Planar metric over (seconds since chord start, elevation), for simplifying
/// elevation profiles. Any point missing a time or an elevation, chord ends
/// included, yields zero; [`simplify_elevation_profile`] keeps such points
/// out of the chord search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElevationProfileMetric;

impl PerpendicularDistance for ElevationProfileMetric {
    fn distance(&self, start: &GpxPoint, end: &GpxPoint, point: &GpxPoint) -> f64 {
        let (Some(t0), Some(t1), Some(tp)) = (start.time, end.time, point.time) else {
            return 0.0;
        };
        let (Some(e0), Some(e1), Some(ep)) = (start.ele, end.ele, point.ele) else {
            return 0.0;
        };
        let secs = |t: chrono::DateTime<chrono::Utc>| (t - t0).num_milliseconds() as f64 / 1000.0;
        triangle_height((0.0, e0), (secs(t1), e1), (secs(tp), ep))
    }
}

/// Planar metric over (latitude, longitude) in degrees, for map paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapPathMetric;

impl PerpendicularDistance for MapPathMetric {
    fn distance(&self, start: &GpxPoint, end: &GpxPoint, point: &GpxPoint) -> f64 {
        triangle_height(
            (start.lat, start.lon),
            (end.lat, end.lon),
            (point.lat, point.lon),
        )
    }
}

/// Indices of the points kept by Douglas-Peucker, in ascending order.
///
/// The first and last points are always kept. An interior point is kept when
/// it is the farthest from the chord of its current range and its distance
/// exceeds `tolerance`.
pub fn simplify_indices<M>(points: &[GpxPoint], tolerance: f64, metric: &M) -> Vec<usize>
where
    M: PerpendicularDistance + ?Sized,
{
    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut ranges = vec![(0, n - 1)];
    while let Some((first, last)) = ranges.pop() {
        let mut farthest = 0.0;
        let mut split = None;
        for i in first + 1..last {
            let d = metric.distance(&points[first], &points[last], &points[i]);
            if d > farthest {
                farthest = d;
                split = Some(i);
            }
        }
        if let Some(i) = split.filter(|_| farthest > tolerance) {
            keep[i] = true;
            ranges.push((i, last));
            ranges.push((first, i));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

pub fn simplify<M>(points: &[GpxPoint], tolerance: f64, metric: &M) -> Vec<GpxPoint>
where
    M: PerpendicularDistance + ?Sized,
{
    simplify_indices(points, tolerance, metric)
        .into_iter()
        .map(|i| points[i].clone())
        .collect()
}

/// Douglas-Peucker over the points that carry both a time and an elevation.
///
/// Points missing either are dropped, except the first and last point of
/// `points`, which are always kept.
pub fn simplify_elevation_profile(points: &[GpxPoint], tolerance: f64) -> Vec<GpxPoint> {
    let profiled: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.time.is_some() && p.ele.is_some())
        .map(|(i, _)| i)
        .collect();
    let subset: Vec<GpxPoint> = profiled.iter().map(|&i| points[i].clone()).collect();

    let mut kept: Vec<usize> = simplify_indices(&subset, tolerance, &ElevationProfileMetric)
        .into_iter()
        .map(|k| profiled[k])
        .collect();
    if let Some(last) = points.len().checked_sub(1) {
        kept.extend([0, last]);
    }
    kept.sort_unstable();
    kept.dedup();
    kept.into_iter().map(|i| points[i].clone()).collect()
}

pub fn simplify_path(points: &[GpxPoint], tolerance: f64) -> Vec<GpxPoint> {
    simplify(points, tolerance, &MapPathMetric)
}

/// Copy of `doc` with every route and track segment reduced by [`simplify_path`].
pub fn simplify_document(doc: &GpxDocument, tolerance: f64) -> GpxDocument {
    let mut out = doc.clone();
    for route in &mut out.routes {
        route.points = simplify_path(&route.points, tolerance);
    }
    for segment in out.tracks.iter_mut().flat_map(|t| t.segments.iter_mut()) {
        segment.points = simplify_path(&segment.points, tolerance);
    }
    out
}
