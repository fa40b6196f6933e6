use std::borrow::Cow;

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::datetime::format_timestamp;
use crate::gpx_types::*;
use crate::options::{ConvertOptions, GpxElementType};
use crate::simplify::simplify_path;

/// Convert a GPX document to a GeoJSON FeatureCollection.
pub fn to_feature_collection(doc: &GpxDocument, opts: &ConvertOptions) -> FeatureCollection {
    let mut features = Vec::new();

    if opts.should_include(GpxElementType::Waypoint) {
        for wpt in &doc.waypoints {
            features.push(single_point_feature(wpt, "waypoint", opts));
        }
    }

    if opts.should_include(GpxElementType::Route) {
        for rte in &doc.routes {
            if rte.points.len() >= 2 {
                features.push(route_to_feature(rte, opts));
            } else if rte.points.len() == 1 {
                features.push(single_point_feature(&rte.points[0], "route", opts));
            }
        }
    }

    if opts.should_include(GpxElementType::Track) {
        for trk in &doc.tracks {
            features.extend(track_to_features(trk, opts));
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature(value: Value, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Points of one line, reduced when a simplification tolerance is set.
fn line_points<'a>(points: &'a [GpxPoint], opts: &ConvertOptions) -> Cow<'a, [GpxPoint]> {
    match opts.simplify_tolerance {
        Some(tolerance) => Cow::Owned(simplify_path(points, tolerance)),
        None => Cow::Borrowed(points),
    }
}

fn line_coords(points: &[GpxPoint], opts: &ConvertOptions) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|pt| point_coords(pt, opts.include_elevation))
        .collect()
}

fn route_to_feature(rte: &GpxRoute, opts: &ConvertOptions) -> Feature {
    let points = line_points(&rte.points, opts);
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("route".to_string()),
    );

    if opts.include_metadata {
        insert_optional(&mut props, "name", &rte.name);
        insert_optional(&mut props, "cmt", &rte.cmt);
        insert_optional(&mut props, "desc", &rte.desc);
        insert_optional(&mut props, "src", &rte.src);
        insert_optional(&mut props, "type", &rte.route_type);
        if let Some(n) = rte.number {
            props.insert("number".to_string(), JsonValue::Number(n.into()));
        }
        insert_links(&mut props, &rte.links);
    }

    if opts.include_time {
        if let Some(times) = point_times(&points) {
            insert_coordinate_times(&mut props, JsonValue::Array(times));
        }
    }

    feature(Value::LineString(line_coords(&points, opts)), props)
}

fn track_to_features(trk: &GpxTrack, opts: &ConvertOptions) -> Vec<Feature> {
    let non_empty_segments: Vec<&GpxSegment> =
        trk.segments.iter().filter(|s| !s.points.is_empty()).collect();

    if non_empty_segments.is_empty() {
        return Vec::new();
    }

    // Single point across all segments → Point Feature
    let total_points: usize = non_empty_segments.iter().map(|s| s.points.len()).sum();
    if total_points == 1 {
        let pt = &non_empty_segments[0].points[0];
        return vec![single_point_feature(pt, "track", opts)];
    }

    let lines: Vec<Cow<'_, [GpxPoint]>> = non_empty_segments
        .iter()
        .filter(|s| s.points.len() >= 2)
        .map(|seg| line_points(&seg.points, opts))
        .collect();

    if lines.is_empty() {
        return Vec::new();
    }

    if lines.len() == 1 || !opts.join_track_segments {
        // Each segment as a separate LineString Feature
        return lines
            .iter()
            .map(|points| {
                let mut props = build_track_props(trk, opts);
                if opts.include_time {
                    if let Some(times) = point_times(points) {
                        insert_coordinate_times(&mut props, JsonValue::Array(times));
                    }
                }
                feature(Value::LineString(line_coords(points, opts)), props)
            })
            .collect();
    }

    let mut props = build_track_props(trk, opts);
    if opts.include_time {
        let all_times: Vec<Option<Vec<JsonValue>>> =
            lines.iter().map(|points| point_times(points)).collect();
        if all_times.iter().any(Option::is_some) {
            let nested = all_times
                .into_iter()
                .zip(&lines)
                .map(|(times, points)| {
                    JsonValue::Array(times.unwrap_or_else(|| vec![JsonValue::Null; points.len()]))
                })
                .collect();
            insert_coordinate_times(&mut props, JsonValue::Array(nested));
        }
    }

    let line_strings = lines.iter().map(|points| line_coords(points, opts)).collect();
    vec![feature(Value::MultiLineString(line_strings), props)]
}

fn single_point_feature(pt: &GpxPoint, gpx_type: &str, opts: &ConvertOptions) -> Feature {
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String(gpx_type.to_string()),
    );

    if opts.include_metadata {
        insert_point_metadata(&mut props, pt);
    }

    feature(Value::Point(point_coords(pt, opts.include_elevation)), props)
}

fn build_track_props(trk: &GpxTrack, opts: &ConvertOptions) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );

    if opts.include_metadata {
        insert_optional(&mut props, "name", &trk.name);
        insert_optional(&mut props, "cmt", &trk.cmt);
        insert_optional(&mut props, "desc", &trk.desc);
        insert_optional(&mut props, "src", &trk.src);
        insert_optional(&mut props, "type", &trk.track_type);
        if let Some(n) = trk.number {
            props.insert("number".to_string(), JsonValue::Number(n.into()));
        }
        insert_links(&mut props, &trk.links);
    }

    props
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &GpxPoint, include_elevation: bool) -> Vec<f64> {
    match (include_elevation, pt.ele) {
        (true, Some(ele)) => vec![pt.lon, pt.lat, ele],
        _ => vec![pt.lon, pt.lat],
    }
}

fn insert_point_metadata(props: &mut Map<String, JsonValue>, pt: &GpxPoint) {
    insert_optional(props, "name", &pt.name);
    insert_optional(props, "cmt", &pt.cmt);
    insert_optional(props, "desc", &pt.desc);
    insert_optional(props, "src", &pt.src);
    insert_optional(props, "sym", &pt.sym);
    insert_optional(props, "type", &pt.point_type);
    if let Some(ele) = pt.ele.and_then(serde_json::Number::from_f64) {
        props.insert("ele".to_string(), JsonValue::Number(ele));
    }
    if let Some(ref time) = pt.time {
        props.insert("time".to_string(), JsonValue::String(format_timestamp(time)));
    }
    if let Some(fix) = pt.fix {
        props.insert("fix".to_string(), JsonValue::String(fix.to_string()));
    }
    if let Some(sat) = pt.sat {
        props.insert("sat".to_string(), JsonValue::Number(sat.into()));
    }
    insert_links(props, &pt.links);
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

fn insert_links(props: &mut Map<String, JsonValue>, links: &[GpxLink]) {
    let links: Vec<JsonValue> = links
        .iter()
        .filter(|link| link.has_data())
        .map(|link| {
            let mut link_obj = Map::new();
            insert_optional(&mut link_obj, "href", &link.href);
            insert_optional(&mut link_obj, "text", &link.text);
            insert_optional(&mut link_obj, "type", &link.link_type);
            JsonValue::Object(link_obj)
        })
        .collect();
    if !links.is_empty() {
        props.insert("links".to_string(), JsonValue::Array(links));
    }
}

/// Per-point timestamps, or `None` when no point has one.
fn point_times(points: &[GpxPoint]) -> Option<Vec<JsonValue>> {
    if points.iter().all(|pt| pt.time.is_none()) {
        return None;
    }
    Some(
        points
            .iter()
            .map(|pt| match &pt.time {
                Some(t) => JsonValue::String(format_timestamp(t)),
                None => JsonValue::Null,
            })
            .collect(),
    )
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, times: JsonValue) {
    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), times);
    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}
