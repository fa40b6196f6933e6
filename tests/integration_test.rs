use chrono::{TimeDelta, TimeZone, Utc};
use geojson::{FeatureCollection, Value};
use gpx_kit_wasm::analytics::{
    self, distance_km, document_stats, duration, elevation_range, end_time, point_at_offset,
    start_time, total_distance,
};
use gpx_kit_wasm::converter::to_feature_collection;
use gpx_kit_wasm::options::{ConvertOptions, WriteOptions};
use gpx_kit_wasm::simplify::{simplify_document, simplify_path};
use gpx_kit_wasm::{
    parse_gpx, read_gpx, to_string, to_string_with, Extension, GpxDocument, GpxError, GpxFix,
    GpxPoint, Namespace, GPX_NAMESPACE,
};

/// One degree of longitude on the equator.
const DEGREE_KM: f64 = 111.194_926_644_558_73;

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn decode(path: &str) -> GpxDocument {
    parse_gpx(&load_fixture(path)).unwrap()
}

fn convert(gpx: &str) -> FeatureCollection {
    let doc = parse_gpx(gpx).unwrap();
    to_feature_collection(&doc, &ConvertOptions::default())
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ---- decoding ----

#[test]
fn test_01_waypoints() {
    let doc = decode("basic/01_waypoints.gpx");
    assert_eq!(doc.version, "1.1");
    assert_eq!(doc.creator, "fixture");
    assert_eq!(doc.waypoints.len(), 2);

    let wpt = &doc.waypoints[0];
    assert_eq!(wpt.name.as_deref(), Some("Tokyo Tower"));
    assert_eq!(wpt.sym.as_deref(), Some("Flag, Blue"));
    assert_eq!(wpt.point_type.as_deref(), Some("POI"));
    assert_eq!(wpt.fix, Some(GpxFix::ThreeD));
    assert_eq!(wpt.sat, Some(8));
    assert_eq!(wpt.ele, Some(40.5));
    assert_eq!(
        wpt.time,
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
    );
    assert_eq!(wpt.links.len(), 1);
    assert_eq!(wpt.links[0].text.as_deref(), Some("Tokyo Tower Website"));
    assert_eq!(wpt.links[0].link_type.as_deref(), Some("text/html"));

    let bare = &doc.waypoints[1];
    assert_eq!(*bare, GpxPoint::new(35.7101, 139.8107));
}

#[test]
fn test_03_complete_document() {
    let doc = decode("basic/03_complete.gpx");

    let meta = &doc.metadata;
    assert_eq!(meta.name.as_deref(), Some("Weekend Trip"));
    assert_eq!(meta.keywords.as_deref(), Some("hiking, tokyo"));
    let author = meta.author.as_ref().unwrap();
    assert_eq!(
        author.email.as_ref().and_then(|e| e.address()).as_deref(),
        Some("jane@example.com")
    );
    assert_eq!(
        author.link.as_ref().and_then(|l| l.href.as_deref()),
        Some("https://example.com/jane")
    );
    assert_eq!(
        meta.copyright.as_ref().and_then(|c| c.year.as_deref()),
        Some("2025")
    );
    let bounds = meta.bounds.unwrap();
    assert_eq!((bounds.min_lat, bounds.max_lon), (35.6, 139.9));

    let camp = &doc.waypoints[0];
    assert_eq!(camp.fix, Some(GpxFix::Dgps));
    assert_eq!(camp.magvar, Some(7.5));
    assert_eq!(camp.geoid_height, Some(36.2));
    assert_eq!(camp.age_of_dgps_data, Some(3.5));
    assert_eq!(camp.dgps_id, Some(42));

    assert_eq!(doc.routes[0].number, Some(2));
    assert_eq!(doc.routes[0].route_type.as_deref(), Some("road"));

    assert_eq!(
        doc.namespaces,
        vec![Namespace::new(
            "gpxtpx",
            "http://www.garmin.com/xmlschemas/TrackPointExtension/v1"
        )]
    );
    let trk = &doc.tracks[0];
    assert_eq!(
        trk.extensions[0]
            .find("DisplayColor")
            .map(|e| e.value.as_str()),
        Some("Red")
    );
    let hr = trk.segments[0].points[0].extensions[0].child("hr");
    assert_eq!(hr.map(|e| e.value.as_str()), Some("120"));

    let note = &doc.extensions[0];
    assert_eq!(note.qualified_name(), "note");
    assert_eq!(note.value, "Keep the map");
    assert_eq!(note.namespace, Some(Namespace::new("", "urn:example:notes")));
}

#[test]
fn test_segment_back_reference() {
    let doc = decode("tracks/04_multi_segment.gpx");
    let trk = &doc.tracks[0];
    let second = &trk.segments[1];
    assert_eq!(doc.parent_track(second), Some(trk));
    assert_eq!(doc.segment_display_index(second), Some(2));
}

#[test]
fn test_07_lenient_values() {
    let doc = decode("edge_cases/07_lenient.gpx");
    assert_eq!(doc.waypoints.len(), 1);

    let wpt = &doc.waypoints[0];
    assert_eq!(wpt.name.as_deref(), Some("Still here"));
    assert_eq!(wpt.ele, None);
    assert_eq!(wpt.time, None);
    assert_eq!(wpt.fix, None);
    assert_eq!(wpt.sat, None);

    let trk = &doc.tracks[0];
    assert_eq!(trk.segments.len(), 2);
    assert!(trk.segments[0].points.is_empty());
}

#[test]
fn test_08_cdata_and_entities() {
    let doc = decode("edge_cases/08_cdata_and_entities.gpx");
    assert_eq!(doc.creator, "Tom & Jerry");
    let wpt = &doc.waypoints[0];
    assert_eq!(wpt.name.as_deref(), Some("Fish & Chips <3"));
    assert_eq!(wpt.desc.as_deref(), Some("<b>bold</b> & raw"));
    assert_eq!(wpt.cmt.as_deref(), Some("ABC"));
}

#[test]
fn test_09_no_namespace() {
    let doc = decode("edge_cases/09_no_namespace.gpx");
    assert_eq!(doc.waypoints.len(), 1);
    assert_eq!(doc.waypoints[0].name.as_deref(), Some("Bare"));
}

#[test]
fn test_10_gpx10_encodes_as_11() {
    let doc = decode("edge_cases/10_gpx10.gpx");
    assert_eq!(doc.version, "1.0");
    assert_eq!(doc.creator, "legacy");
    assert_eq!(doc.waypoints[0].ele, Some(250.0));
    assert_eq!(doc.tracks[0].segments[0].points.len(), 2);

    let xml = to_string(&doc).unwrap();
    assert!(xml.contains(&format!(r#"xmlns="{GPX_NAMESPACE}" version="1.1""#)));
    let again = parse_gpx(&xml).unwrap();
    assert_eq!(again.version, "1.1");
    assert_eq!(again.waypoints, doc.waypoints);
    assert_eq!(again.tracks, doc.tracks);
}

#[test]
fn test_errors() {
    assert!(matches!(parse_gpx(""), Err(GpxError::MissingRoot)));
    assert!(matches!(
        parse_gpx("<kml></kml>"),
        Err(GpxError::InvalidRoot { .. })
    ));
    let truncated = parse_gpx(r#"<gpx version="1.1"><trk><trkseg>"#).unwrap_err();
    assert!(truncated.is_source_error());
    assert!(parse_gpx("<gpx><wpt></trk></gpx>").is_err());
}

#[test]
fn test_read_gpx_from_reader() {
    let file = std::fs::File::open("tests/fixtures/basic/02_route.gpx").unwrap();
    let doc = read_gpx(file).unwrap();
    assert_eq!(doc.routes[0].name.as_deref(), Some("Tokyo Loop"));
    assert_eq!(doc.routes[0].points.len(), 3);
}

// ---- round trip ----

#[test]
fn test_round_trip_fixtures() {
    for fixture in [
        "basic/01_waypoints.gpx",
        "basic/02_route.gpx",
        "basic/03_complete.gpx",
        "tracks/04_multi_segment.gpx",
        "tracks/05_single_point_track.gpx",
        "edge_cases/06_empty.gpx",
        "edge_cases/08_cdata_and_entities.gpx",
        "vendor/11_garmin_extensions.gpx",
    ] {
        let doc = decode(fixture);
        for indent in [0, 2, 4] {
            let options = WriteOptions {
                indent,
                ..Default::default()
            };
            let xml = to_string_with(&doc, &options).unwrap();
            let again = parse_gpx(&xml).unwrap();
            assert_eq!(again, doc, "round trip of {fixture} with indent {indent}");
        }
    }
}

#[test]
fn test_round_trip_built_document() {
    let mut doc = GpxDocument::new("builder");
    doc.namespaces.push(Namespace::new("ex", "urn:example"));
    doc.metadata.name = Some("Built".to_string());
    doc.waypoints.push(GpxPoint {
        ele: Some(-3.25),
        time: Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 15).unwrap()),
        fix: Some(GpxFix::Pps),
        extensions: vec![
            Extension::new("ex:outer").with_child(Extension::leaf("ex:inner", " spaced ")),
            Extension::leaf("own:tag", "x").with_namespace(Namespace::new("own", "urn:own")),
        ],
        ..GpxPoint::new(-33.8688, 151.2093)
    });

    let again = parse_gpx(&to_string(&doc).unwrap()).unwrap();
    assert_eq!(again, doc);
}

#[test]
fn test_round_trip_prefixes_declared_below_root() {
    let xml = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="t">
  <wpt lat="1" lon="2">
    <extensions xmlns:osm="urn:osm"><osm:color>red</osm:color></extensions>
  </wpt>
  <wpt lat="3" lon="4" xmlns:v="urn:v">
    <extensions><v:tag><v:key>k</v:key></v:tag></extensions>
  </wpt>
  <trk xmlns:c="urn:c">
    <extensions>
      <a:x xmlns:a="urn:a" xmlns:b="urn:b"><b:y>1</b:y><c:z>2</c:z></a:x>
    </extensions>
    <trkseg><trkpt lat="0" lon="0"/></trkseg>
  </trk>
</gpx>"#;
    let doc = parse_gpx(xml).unwrap();

    let color = &doc.waypoints[0].extensions[0];
    assert_eq!(color.value, "red");
    assert_eq!(color.namespace, Some(Namespace::new("osm", "urn:osm")));

    let tag = &doc.waypoints[1].extensions[0];
    assert_eq!(tag.namespace, Some(Namespace::new("v", "urn:v")));
    assert_eq!(tag.children[0].namespace, None);

    let x = &doc.tracks[0].extensions[0];
    assert_eq!(x.namespace, Some(Namespace::new("a", "urn:a")));
    assert_eq!(x.children[0].namespace, Some(Namespace::new("b", "urn:b")));
    assert_eq!(x.children[1].namespace, Some(Namespace::new("c", "urn:c")));

    for indent in [0, 2] {
        let options = WriteOptions {
            indent,
            ..Default::default()
        };
        let again = parse_gpx(&to_string_with(&doc, &options).unwrap()).unwrap();
        assert_eq!(again, doc, "round trip with indent {indent}");
    }
}

// ---- analytics ----

#[test]
fn test_distance_symmetry() {
    let a = GpxPoint::new(35.6812, 139.7671);
    let b = GpxPoint::new(34.7025, 135.4959);
    assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
    assert_eq!(distance_km(&a, &a), 0.0);
    assert!((distance_km(&a, &b) - 403.0).abs() < 5.0);
}

#[test]
fn test_track_statistics() {
    let doc = decode("tracks/04_multi_segment.gpx");
    let trk = &doc.tracks[0];

    assert_close(total_distance(trk), 2.0 * DEGREE_KM);

    let range = elevation_range(trk);
    assert_eq!((range.low, range.high), (5.0, 30.0));
    assert_eq!(range.range(), 25.0);

    assert_eq!(
        start_time(trk),
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(
        end_time(trk),
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap()
    );
    assert_eq!(duration(trk), TimeDelta::minutes(30));
}

#[test]
fn test_statistics_without_data() {
    let doc = decode("basic/02_route.gpx");
    let rte = &doc.routes[0];
    assert_eq!(start_time(rte), analytics::EPOCH);
    assert_eq!(end_time(rte), analytics::EPOCH);
    assert_eq!(duration(rte), TimeDelta::zero());
    let range = elevation_range(rte);
    assert_eq!((range.low, range.high), (0.0, 0.0));
}

#[test]
fn test_point_at_offset() {
    let doc = decode("tracks/04_multi_segment.gpx");
    let trk = &doc.tracks[0];
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let mid = point_at_offset(trk, TimeDelta::minutes(5)).unwrap();
    assert_close(mid.point.lon, 0.5);
    assert_close(mid.point.ele.unwrap(), 20.0);
    assert_close(mid.distance_km, DEGREE_KM / 2.0);
    assert_eq!(mid.point.time, Some(t0 + TimeDelta::minutes(5)));

    // The gap between segments adds no distance.
    let gap = point_at_offset(trk, TimeDelta::minutes(15)).unwrap();
    assert_close(gap.point.lon, 1.5);
    assert_close(gap.point.ele.unwrap(), 17.5);
    assert_close(gap.distance_km, DEGREE_KM);

    let half_known = point_at_offset(trk, TimeDelta::minutes(25)).unwrap();
    assert_eq!(half_known.point.ele, Some(5.0));
    assert_close(half_known.distance_km, 1.5 * DEGREE_KM);
}

#[test]
fn test_point_at_offset_boundaries() {
    let doc = decode("tracks/04_multi_segment.gpx");
    let trk = &doc.tracks[0];
    let first = &trk.segments[0].points[0];
    let last = &trk.segments[1].points[1];

    let before = point_at_offset(trk, TimeDelta::minutes(-10)).unwrap();
    assert_eq!((before.point.lat, before.point.lon), (first.lat, first.lon));
    assert_eq!(before.point.time, first.time);
    assert_eq!(before.distance_km, 0.0);

    let after = point_at_offset(trk, TimeDelta::hours(2)).unwrap();
    assert_eq!((after.point.lat, after.point.lon), (last.lat, last.lon));
    assert_eq!(after.point.time, last.time);
    assert_close(after.distance_km, 2.0 * DEGREE_KM);

    let empty: Vec<GpxPoint> = Vec::new();
    assert!(point_at_offset(&empty, TimeDelta::zero()).is_none());
}

#[test]
fn test_document_stats() {
    let doc = decode("basic/03_complete.gpx");
    let stats = document_stats(&doc);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].gpx_type, "route");
    assert_eq!(stats[0].name.as_deref(), Some("Approach"));
    assert_eq!(stats[1].gpx_type, "track");
    assert_eq!(stats[1].stats.point_count, 2);
    assert_eq!(stats[1].stats.elevation_range, 50.5);
    assert_eq!(stats[1].stats.duration_seconds, 1800.0);
}

// ---- simplification ----

#[test]
fn test_simplify_keeps_endpoints() {
    let doc = decode("tracks/04_multi_segment.gpx");
    let points: Vec<GpxPoint> = doc.tracks[0]
        .segments
        .iter()
        .flat_map(|s| s.points.iter().cloned())
        .collect();
    for tolerance in [0.0, 0.5, 10.0] {
        let kept = simplify_path(&points, tolerance);
        assert_eq!(kept.first(), points.first());
        assert_eq!(kept.last(), points.last());
    }
    // Collinear on the equator.
    assert_eq!(simplify_path(&points, 0.0).len(), 2);
}

#[test]
fn test_simplified_document_still_encodes() {
    let doc = decode("vendor/11_garmin_extensions.gpx");
    let simplified = simplify_document(&doc, 1.0);
    let again = parse_gpx(&to_string(&simplified).unwrap()).unwrap();
    assert_eq!(again, simplified);
}

// ---- GeoJSON ----

#[test]
fn test_geojson_route() {
    let fc = convert(&load_fixture("basic/02_route.gpx"));
    assert_eq!(fc.features.len(), 1);

    let f = &fc.features[0];
    let props = f.properties.as_ref().unwrap();
    assert_eq!(props["gpxType"], "route");
    assert_eq!(props["name"], "Tokyo Loop");
    assert_eq!(props["number"], 1);

    match &f.geometry.as_ref().unwrap().value {
        Value::LineString(coords) => assert_eq!(coords.len(), 3),
        _ => panic!("Expected LineString"),
    }
}

#[test]
fn test_geojson_single_point_track() {
    let fc = convert(&load_fixture("tracks/05_single_point_track.gpx"));
    assert_eq!(fc.features.len(), 1);
    assert!(matches!(
        fc.features[0].geometry.as_ref().unwrap().value,
        Value::Point(_)
    ));
}

#[test]
fn test_geojson_empty_segments_ignored() {
    let fc = convert(&load_fixture("edge_cases/07_lenient.gpx"));
    let gpx_types: Vec<_> = fc
        .features
        .iter()
        .map(|f| f.properties.as_ref().unwrap()["gpxType"].clone())
        .collect();
    assert_eq!(gpx_types, vec!["waypoint", "track"]);
}
