use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extensions::{Extension, Namespace};

/// A complete GPX document: metadata, waypoints, routes, and tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxDocument {
    pub version: String,
    pub creator: String,
    #[serde(default)]
    pub metadata: GpxMetadata,
    #[serde(default)]
    pub routes: Vec<GpxRoute>,
    #[serde(default)]
    pub waypoints: Vec<GpxPoint>,
    #[serde(default)]
    pub tracks: Vec<GpxTrack>,
    /// `xmlns:prefix` declarations found on (or written to) the root element.
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl GpxDocument {
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            version: "1.1".to_string(),
            creator: creator.into(),
            ..Default::default()
        }
    }

    /// URI bound to `prefix` by the root namespace declarations.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.uri.as_str())
    }

    /// Append a track, pointing each of its segments back at it.
    pub fn push_track(&mut self, mut track: GpxTrack) {
        let index = self.tracks.len();
        for segment in &mut track.segments {
            segment.track = index;
        }
        self.tracks.push(track);
    }

    /// The track a segment belongs to.
    pub fn parent_track(&self, segment: &GpxSegment) -> Option<&GpxTrack> {
        self.tracks.get(segment.track)
    }

    /// 1-based position of `segment` inside its parent track, for display.
    pub fn segment_display_index(&self, segment: &GpxSegment) -> Option<usize> {
        self.parent_track(segment)?
            .segments
            .iter()
            .position(|s| std::ptr::eq(s, segment))
            .map(|i| i + 1)
    }
}

/// File-level `<metadata>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxMetadata {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub author: Option<GpxPerson>,
    pub copyright: Option<GpxCopyright>,
    #[serde(default)]
    pub links: Vec<GpxLink>,
    pub time: Option<DateTime<Utc>>,
    pub keywords: Option<String>,
    pub bounds: Option<GpxBounds>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl GpxMetadata {
    pub fn has_data(&self) -> bool {
        self.name.is_some()
            || self.desc.is_some()
            || self.author.as_ref().is_some_and(GpxPerson::has_data)
            || self.copyright.as_ref().is_some_and(GpxCopyright::has_data)
            || self.links.iter().any(GpxLink::has_data)
            || self.time.is_some()
            || self.keywords.is_some()
            || self.bounds.is_some()
            || !self.extensions.is_empty()
    }
}

/// Axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxCopyright {
    pub author: Option<String>,
    pub year: Option<String>,
    pub license: Option<String>,
}

impl GpxCopyright {
    pub fn has_data(&self) -> bool {
        self.author.is_some() || self.year.is_some() || self.license.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxPerson {
    pub name: Option<String>,
    pub email: Option<GpxEmail>,
    pub link: Option<GpxLink>,
}

impl GpxPerson {
    pub fn has_data(&self) -> bool {
        self.name.is_some()
            || self.email.as_ref().is_some_and(GpxEmail::has_data)
            || self.link.as_ref().is_some_and(GpxLink::has_data)
    }
}

/// An e-mail address split the way GPX stores it. Never validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxEmail {
    pub id: Option<String>,
    pub domain: Option<String>,
}

impl GpxEmail {
    pub fn has_data(&self) -> bool {
        self.id.is_some() || self.domain.is_some()
    }

    pub fn address(&self) -> Option<String> {
        match (&self.id, &self.domain) {
            (Some(id), Some(domain)) => Some(format!("{id}@{domain}")),
            _ => None,
        }
    }
}

/// A GPX link element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxLink {
    pub href: Option<String>,
    pub text: Option<String>,
    pub link_type: Option<String>,
}

impl GpxLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Default::default()
        }
    }

    pub fn has_data(&self) -> bool {
        self.href.is_some() || self.text.is_some() || self.link_type.is_some()
    }
}

/// Satellite fix reported for a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpxFix {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
    #[serde(rename = "dgps")]
    Dgps,
    #[serde(rename = "pps")]
    Pps,
}

impl GpxFix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TwoD => "2d",
            Self::ThreeD => "3d",
            Self::Dgps => "dgps",
            Self::Pps => "pps",
        }
    }
}

impl FromStr for GpxFix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "2d" => Ok(Self::TwoD),
            "3d" => Ok(Self::ThreeD),
            "dgps" => Ok(Self::Dgps),
            "pps" => Ok(Self::Pps),
            other => Err(format!("unknown fix type '{other}'")),
        }
    }
}

impl fmt::Display for GpxFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single GPX point (used for wpt, rtept, trkpt).
///
/// Only `lat`/`lon` are required. Coordinates are not range-checked, so
/// out-of-range values pass through decode and encode unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub magvar: Option<f64>,
    pub geoid_height: Option<f64>,
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    #[serde(default)]
    pub links: Vec<GpxLink>,
    pub sym: Option<String>,
    pub point_type: Option<String>,
    pub fix: Option<GpxFix>,
    pub sat: Option<u32>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    pub pdop: Option<f64>,
    pub age_of_dgps_data: Option<f64>,
    pub dgps_id: Option<u32>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ..Default::default()
        }
    }
}

/// A GPX route (<rte>).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxRoute {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    #[serde(default)]
    pub links: Vec<GpxLink>,
    pub number: Option<u32>,
    pub route_type: Option<String>,
    #[serde(default)]
    pub points: Vec<GpxPoint>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl GpxRoute {
    pub fn has_data(&self) -> bool {
        self.name.is_some()
            || self.cmt.is_some()
            || self.desc.is_some()
            || self.src.is_some()
            || self.links.iter().any(GpxLink::has_data)
            || self.number.is_some()
            || self.route_type.is_some()
            || !self.points.is_empty()
            || !self.extensions.is_empty()
    }
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxTrack {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    #[serde(default)]
    pub links: Vec<GpxLink>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    #[serde(default)]
    pub segments: Vec<GpxSegment>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl GpxTrack {
    pub fn has_data(&self) -> bool {
        self.name.is_some()
            || self.cmt.is_some()
            || self.desc.is_some()
            || self.src.is_some()
            || self.links.iter().any(GpxLink::has_data)
            || self.number.is_some()
            || self.track_type.is_some()
            || self.segments.iter().any(|s| !s.points.is_empty())
            || !self.extensions.is_empty()
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxSegment {
    /// Index of the owning track in [`GpxDocument::tracks`]. Only used to
    /// look the parent up; the track owns the segment, not the reverse.
    #[serde(default)]
    pub track: usize,
    #[serde(default)]
    pub points: Vec<GpxPoint>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}
