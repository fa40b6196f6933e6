//! Distance, elevation and time statistics over ordered GPX points.
//!
//! Every function takes a [`PointRuns`] source: a plain point slice, a route,
//! a track segment, or a whole track. Track results are accumulated segment
//! by segment; no distance is counted across a segment break.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::gpx_types::*;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Returned by [`start_time`] / [`end_time`] when no point has a timestamp.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// A source of one or more ordered runs of points.
pub trait PointRuns {
    fn runs(&self) -> Vec<&[GpxPoint]>;
}

impl PointRuns for [GpxPoint] {
    fn runs(&self) -> Vec<&[GpxPoint]> {
        vec![self]
    }
}

impl PointRuns for Vec<GpxPoint> {
    fn runs(&self) -> Vec<&[GpxPoint]> {
        vec![self.as_slice()]
    }
}

impl PointRuns for GpxRoute {
    fn runs(&self) -> Vec<&[GpxPoint]> {
        vec![self.points.as_slice()]
    }
}

impl PointRuns for GpxSegment {
    fn runs(&self) -> Vec<&[GpxPoint]> {
        vec![self.points.as_slice()]
    }
}

impl PointRuns for GpxTrack {
    fn runs(&self) -> Vec<&[GpxPoint]> {
        self.segments.iter().map(|s| s.points.as_slice()).collect()
    }
}

/// Great-circle distance between two points in kilometers.
pub fn distance_km(a: &GpxPoint, b: &GpxPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Sum of consecutive great-circle distances along one run.
pub fn path_distance(points: &[GpxPoint]) -> f64 {
    points.windows(2).map(|w| distance_km(&w[0], &w[1])).sum()
}

/// Total distance of every run, in kilometers.
pub fn total_distance<P: PointRuns + ?Sized>(source: &P) -> f64 {
    source.runs().into_iter().map(path_distance).sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ElevationRange {
    pub low: f64,
    pub high: f64,
}

impl ElevationRange {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Lowest and highest elevation among points that have one; all zero when
/// none do.
pub fn elevation_range<P: PointRuns + ?Sized>(source: &P) -> ElevationRange {
    let mut elevations = source
        .runs()
        .into_iter()
        .flatten()
        .filter_map(|p| p.ele);
    let Some(first) = elevations.next() else {
        return ElevationRange::default();
    };
    elevations.fold(
        ElevationRange {
            low: first,
            high: first,
        },
        |acc, ele| ElevationRange {
            low: acc.low.min(ele),
            high: acc.high.max(ele),
        },
    )
}

/// Timestamp of the first point that has one.
pub fn first_time<P: PointRuns + ?Sized>(source: &P) -> Option<DateTime<Utc>> {
    source.runs().into_iter().flatten().find_map(|p| p.time)
}

/// Timestamp of the last point that has one.
pub fn last_time<P: PointRuns + ?Sized>(source: &P) -> Option<DateTime<Utc>> {
    source
        .runs()
        .into_iter()
        .rev()
        .flat_map(|run| run.iter().rev())
        .find_map(|p| p.time)
}

pub fn start_time<P: PointRuns + ?Sized>(source: &P) -> DateTime<Utc> {
    first_time(source).unwrap_or(EPOCH)
}

pub fn end_time<P: PointRuns + ?Sized>(source: &P) -> DateTime<Utc> {
    last_time(source).unwrap_or(EPOCH)
}

/// Elapsed time between the first and last timestamps, never negative.
pub fn duration<P: PointRuns + ?Sized>(source: &P) -> TimeDelta {
    (end_time(source) - start_time(source)).max(TimeDelta::zero())
}

/// A position along a recording at a given time offset.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetPoint {
    pub point: GpxPoint,
    /// Distance travelled from the start of the recording.
    pub distance_km: f64,
}

/// Locate the position `offset` after the first timestamp.
///
/// The offset is clamped into `[0, duration]`. Between two timestamped points
/// the position, elevation and distance are interpolated linearly by time.
/// At the first timestamped point the distance is 0. The returned point's
/// `time` is always `start + offset`. Returns `None` only for an empty source.
pub fn point_at_offset<P: PointRuns + ?Sized>(source: &P, offset: TimeDelta) -> Option<OffsetPoint> {
    let runs = source.runs();
    let (points, cumulative) = flatten(&runs);
    let first_point = *points.first()?;
    let total_km = cumulative.last().copied().unwrap_or(0.0);

    let start = start_time(source);
    let offset = offset.clamp(TimeDelta::zero(), duration(source));
    let target = start + offset;

    let timed: Vec<(usize, DateTime<Utc>)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.time.map(|t| (i, t)))
        .collect();

    let at = |index: usize, distance_km: f64| OffsetPoint {
        point: GpxPoint {
            time: Some(target),
            ..points[index].clone()
        },
        distance_km,
    };

    let (Some(&(first, first_t)), Some(&(last, last_t))) = (timed.first(), timed.last()) else {
        return Some(OffsetPoint {
            point: GpxPoint {
                time: Some(target),
                ..first_point.clone()
            },
            distance_km: 0.0,
        });
    };
    if target <= first_t {
        return Some(at(first, 0.0));
    }
    if target >= last_t {
        return Some(at(last, total_km));
    }

    let upper_pos = timed
        .iter()
        .position(|&(_, t)| t >= target)
        .unwrap_or(timed.len() - 1);
    let (lower, lower_t) = timed[upper_pos.saturating_sub(1)];
    let (upper, upper_t) = timed[upper_pos];

    let span = seconds(upper_t - lower_t);
    let fraction = if span > 0.0 {
        seconds(target - lower_t) / span
    } else {
        0.0
    };

    let (a, b) = (points[lower], points[upper]);
    let ele = match (a.ele, b.ele) {
        (Some(ea), Some(eb)) => Some(ea + (eb - ea) * fraction),
        (ea, eb) => ea.or(eb),
    };

    Some(OffsetPoint {
        point: GpxPoint {
            ele,
            time: Some(target),
            ..GpxPoint::new(
                a.lat + (b.lat - a.lat) * fraction,
                a.lon + (b.lon - a.lon) * fraction,
            )
        },
        distance_km: cumulative[lower] + (cumulative[upper] - cumulative[lower]) * fraction,
    })
}

fn seconds(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

/// All points in order, with the distance travelled up to each one.
fn flatten<'a>(runs: &[&'a [GpxPoint]]) -> (Vec<&'a GpxPoint>, Vec<f64>) {
    let mut points = Vec::new();
    let mut cumulative = Vec::new();
    let mut travelled = 0.0;
    for &run in runs {
        let mut previous: Option<&GpxPoint> = None;
        for point in run {
            if let Some(prev) = previous {
                travelled += distance_km(prev, point);
            }
            points.push(point);
            cumulative.push(travelled);
            previous = Some(point);
        }
    }
    (points, cumulative)
}

/// Summary numbers for one route, segment or track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub point_count: usize,
    pub distance_km: f64,
    pub elevation_low: f64,
    pub elevation_high: f64,
    pub elevation_range: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
}

pub fn stats<P: PointRuns + ?Sized>(source: &P) -> Stats {
    let elevation = elevation_range(source);
    Stats {
        point_count: source.runs().iter().map(|r| r.len()).sum(),
        distance_km: total_distance(source),
        elevation_low: elevation.low,
        elevation_high: elevation.high,
        elevation_range: elevation.range(),
        start_time: first_time(source),
        end_time: last_time(source),
        duration_seconds: seconds(duration(source)),
    }
}

/// [`Stats`] for one route or track of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedStats {
    pub gpx_type: &'static str,
    pub index: usize,
    pub name: Option<String>,
    pub stats: Stats,
}

/// Statistics for every route, then every track, in document order.
pub fn document_stats(doc: &GpxDocument) -> Vec<NamedStats> {
    let routes = doc.routes.iter().enumerate().map(|(index, rte)| NamedStats {
        gpx_type: "route",
        index,
        name: rte.name.clone(),
        stats: stats(rte),
    });
    let tracks = doc.tracks.iter().enumerate().map(|(index, trk)| NamedStats {
        gpx_type: "track",
        index,
        name: trk.name.clone(),
        stats: stats(trk),
    });
    routes.chain(tracks).collect()
}
