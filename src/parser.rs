use std::io::Read;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::datetime::parse_timestamp;
use crate::error::GpxError;
use crate::extensions::{Extension, Namespace, GPX_NAMESPACE};
use crate::gpx_types::*;
use crate::xml_tree::{parse_tree, XmlElement};

type Result<T> = std::result::Result<T, GpxError>;

/// Parse a GPX XML string into a [`GpxDocument`].
///
/// Fails only when the text is not well-formed XML or has no `<gpx>` root.
/// Optional values that do not parse (a bad `<ele>`, an unknown `<fix>`)
/// are left as `None`.
pub fn parse_gpx(xml: &str) -> Result<GpxDocument> {
    let root = parse_tree(xml, GPX_NAMESPACE)?.ok_or(GpxError::MissingRoot)?;
    if root.local_name() != "gpx" {
        return Err(GpxError::InvalidRoot { found: root.name });
    }

    let namespaces: Vec<Namespace> = root
        .namespace_declarations()
        .into_iter()
        .filter(|ns| !ns.prefix.is_empty())
        .collect();

    let mut root_scope = vec![Namespace::new("", GPX_NAMESPACE)];
    root_scope.extend(namespaces.iter().cloned());
    let ctx = DecodeContext {
        ns: root.attribute("xmlns").unwrap_or(GPX_NAMESPACE).to_string(),
        root_scope,
    };

    let mut doc = GpxDocument {
        version: root.attribute("version").unwrap_or_default().to_string(),
        creator: root.attribute("creator").unwrap_or_default().to_string(),
        extensions: ctx.extensions(&root),
        namespaces,
        ..Default::default()
    };

    if let Some(metadata) = root.child(&ctx.ns, "metadata") {
        doc.metadata = parse_metadata(&ctx, metadata);
    }
    doc.routes = root
        .children_named(&ctx.ns, "rte")
        .map(|rte| parse_route(&ctx, rte))
        .collect();
    doc.waypoints = root
        .children_named(&ctx.ns, "wpt")
        .filter_map(|wpt| parse_point(&ctx, wpt))
        .collect();
    for trk in root.children_named(&ctx.ns, "trk") {
        let track = parse_track(&ctx, trk);
        doc.push_track(track);
    }

    debug!(
        "decoded GPX {} from '{}': {} waypoints, {} routes, {} tracks",
        doc.version,
        doc.creator,
        doc.waypoints.len(),
        doc.routes.len(),
        doc.tracks.len()
    );
    Ok(doc)
}

/// Read a whole GPX source, then parse it.
pub fn read_gpx<R: Read>(mut source: R) -> Result<GpxDocument> {
    let mut xml = String::new();
    source.read_to_string(&mut xml)?;
    parse_gpx(&xml)
}

/// Per-call decode state: the namespace every GPX element is looked up in,
/// and the bindings an encoder falls back to for extension prefixes.
struct DecodeContext {
    ns: String,
    root_scope: Vec<Namespace>,
}

impl DecodeContext {
    fn child<'a>(&self, parent: &'a XmlElement, name: &str) -> Option<&'a XmlElement> {
        parent.child(&self.ns, name)
    }

    /// Text of a child element, verbatim.
    fn text(&self, parent: &XmlElement, name: &str) -> Option<String> {
        self.child(parent, name).map(|e| e.text.clone())
    }

    /// Parse a child element's trimmed text; unparsable values become `None`.
    fn parse<T: FromStr>(&self, parent: &XmlElement, name: &str) -> Option<T> {
        let text = &self.child(parent, name)?.text;
        let value = text.trim().parse::<T>().ok();
        if value.is_none() {
            debug!("ignoring unparsable <{name}> value '{text}'");
        }
        value
    }

    fn time(&self, parent: &XmlElement, name: &str) -> Option<DateTime<Utc>> {
        let text = &self.child(parent, name)?.text;
        let value = parse_timestamp(text);
        if value.is_none() {
            debug!("ignoring unparsable <{name}> timestamp '{text}'");
        }
        value
    }

    fn links(&self, parent: &XmlElement) -> Vec<GpxLink> {
        parent
            .children_named(&self.ns, "link")
            .map(|link| parse_link(self, link))
            .collect()
    }

    /// Nodes of the `<extensions>` child of `parent`, if it has one.
    fn extensions(&self, parent: &XmlElement) -> Vec<Extension> {
        self.child(parent, "extensions")
            .map(|ext| {
                ext.children
                    .iter()
                    .map(|e| self.read_extension(e, &[]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Convert one element below `<extensions>` into an [`Extension`] node.
    /// `ancestors` holds the namespaces of the enclosing nodes, innermost last.
    ///
    /// The node keeps the URI its name resolved to as its own namespace
    /// unless the same binding is found again from `ancestors` or the root.
    fn read_extension(&self, e: &XmlElement, ancestors: &[Namespace]) -> Extension {
        let prefix = e.prefix();
        let inherited = ancestors
            .iter()
            .rev()
            .find(|ns| ns.prefix == prefix)
            .or_else(|| self.root_scope.iter().find(|ns| ns.prefix == prefix));

        let mut node = Extension::new(&e.name);
        let mut scope = ancestors.to_vec();
        match &e.namespace {
            Some(uri) => {
                let effective = Namespace::new(prefix, uri.as_str());
                if inherited != Some(&effective) {
                    node.namespace = Some(effective.clone());
                }
                scope.push(effective);
            }
            None => warn!("extension <{}> uses an undeclared prefix", e.name),
        }

        if e.children.is_empty() {
            node.value = e.text.clone();
        } else {
            node.children = e
                .children
                .iter()
                .map(|child| self.read_extension(child, &scope))
                .collect();
        }
        node
    }
}

fn attribute_f64(element: &XmlElement, name: &str) -> Option<f64> {
    element.attribute(name)?.trim().parse::<f64>().ok()
}

/// Parse a <metadata> element.
fn parse_metadata(ctx: &DecodeContext, e: &XmlElement) -> GpxMetadata {
    GpxMetadata {
        name: ctx.text(e, "name"),
        desc: ctx.text(e, "desc"),
        author: ctx.child(e, "author").map(|a| parse_person(ctx, a)),
        copyright: ctx.child(e, "copyright").map(|c| parse_copyright(ctx, c)),
        links: ctx.links(e),
        time: ctx.time(e, "time"),
        keywords: ctx.text(e, "keywords"),
        bounds: ctx.child(e, "bounds").and_then(parse_bounds),
        extensions: ctx.extensions(e),
    }
}

fn parse_person(ctx: &DecodeContext, e: &XmlElement) -> GpxPerson {
    GpxPerson {
        name: ctx.text(e, "name"),
        email: ctx.child(e, "email").map(|email| GpxEmail {
            id: email.attribute("id").map(str::to_string),
            domain: email.attribute("domain").map(str::to_string),
        }),
        link: ctx.child(e, "link").map(|l| parse_link(ctx, l)),
    }
}

fn parse_copyright(ctx: &DecodeContext, e: &XmlElement) -> GpxCopyright {
    GpxCopyright {
        author: e.attribute("author").map(str::to_string),
        year: ctx.text(e, "year"),
        license: ctx.text(e, "license"),
    }
}

/// All four corners are required; a partial box is dropped.
fn parse_bounds(e: &XmlElement) -> Option<GpxBounds> {
    Some(GpxBounds {
        min_lat: attribute_f64(e, "minlat")?,
        min_lon: attribute_f64(e, "minlon")?,
        max_lat: attribute_f64(e, "maxlat")?,
        max_lon: attribute_f64(e, "maxlon")?,
    })
}

/// Parse a <link> element.
fn parse_link(ctx: &DecodeContext, e: &XmlElement) -> GpxLink {
    GpxLink {
        href: e.attribute("href").map(str::to_string),
        text: ctx.text(e, "text"),
        link_type: ctx.text(e, "type"),
    }
}

/// Parse a point element (wpt, rtept, trkpt) and its children.
/// Points without usable lat/lon are skipped.
fn parse_point(ctx: &DecodeContext, e: &XmlElement) -> Option<GpxPoint> {
    let (Some(lat), Some(lon)) = (attribute_f64(e, "lat"), attribute_f64(e, "lon")) else {
        warn!("skipping <{}> without valid lat/lon", e.name);
        return None;
    };

    Some(GpxPoint {
        ele: ctx.parse(e, "ele"),
        time: ctx.time(e, "time"),
        magvar: ctx.parse(e, "magvar"),
        geoid_height: ctx.parse(e, "geoidheight"),
        name: ctx.text(e, "name"),
        cmt: ctx.text(e, "cmt"),
        desc: ctx.text(e, "desc"),
        src: ctx.text(e, "src"),
        links: ctx.links(e),
        sym: ctx.text(e, "sym"),
        point_type: ctx.text(e, "type"),
        fix: ctx.parse(e, "fix"),
        sat: ctx.parse(e, "sat"),
        hdop: ctx.parse(e, "hdop"),
        vdop: ctx.parse(e, "vdop"),
        pdop: ctx.parse(e, "pdop"),
        age_of_dgps_data: ctx.parse(e, "ageofdgpsdata"),
        dgps_id: ctx.parse(e, "dgpsid"),
        extensions: ctx.extensions(e),
        ..GpxPoint::new(lat, lon)
    })
}

/// Parse a <rte> element.
fn parse_route(ctx: &DecodeContext, e: &XmlElement) -> GpxRoute {
    GpxRoute {
        name: ctx.text(e, "name"),
        cmt: ctx.text(e, "cmt"),
        desc: ctx.text(e, "desc"),
        src: ctx.text(e, "src"),
        links: ctx.links(e),
        number: ctx.parse(e, "number"),
        route_type: ctx.text(e, "type"),
        points: e
            .children_named(&ctx.ns, "rtept")
            .filter_map(|pt| parse_point(ctx, pt))
            .collect(),
        extensions: ctx.extensions(e),
    }
}

/// Parse a <trk> element. Segment back-references are set when the track
/// is pushed onto the document.
fn parse_track(ctx: &DecodeContext, e: &XmlElement) -> GpxTrack {
    GpxTrack {
        name: ctx.text(e, "name"),
        cmt: ctx.text(e, "cmt"),
        desc: ctx.text(e, "desc"),
        src: ctx.text(e, "src"),
        links: ctx.links(e),
        number: ctx.parse(e, "number"),
        track_type: ctx.text(e, "type"),
        segments: e
            .children_named(&ctx.ns, "trkseg")
            .map(|seg| parse_segment(ctx, seg))
            .collect(),
        extensions: ctx.extensions(e),
    }
}

/// Parse a <trkseg> element.
fn parse_segment(ctx: &DecodeContext, e: &XmlElement) -> GpxSegment {
    GpxSegment {
        track: 0,
        points: e
            .children_named(&ctx.ns, "trkpt")
            .filter_map(|pt| parse_point(ctx, pt))
            .collect(),
        extensions: ctx.extensions(e),
    }
}
