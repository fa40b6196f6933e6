use std::fmt::Display;
use std::io::Write;

use log::{debug, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::datetime::format_timestamp;
use crate::error::GpxError;
use crate::extensions::{Extension, Namespace, GPX_NAMESPACE};
use crate::gpx_types::*;
use crate::options::WriteOptions;

type Result<T> = std::result::Result<T, GpxError>;

/// Serialize a document as GPX 1.1 into `sink`.
///
/// The root is always written as version 1.1 in the GPX 1.1 namespace,
/// whatever version the document was read as. Absent optional values are
/// omitted; routes, tracks and other composites with no data are skipped.
pub fn write_gpx<W: Write>(doc: &GpxDocument, sink: W, options: &WriteOptions) -> Result<()> {
    let writer = if options.indent > 0 {
        Writer::new_with_indent(sink, b' ', options.indent)
    } else {
        Writer::new(sink)
    };

    let mut root_scope = vec![Namespace::new("", GPX_NAMESPACE)];
    root_scope.extend(doc.namespaces.iter().filter(|ns| !ns.prefix.is_empty()).cloned());

    let mut gpx = GpxWriter { writer, root_scope };
    let creator = options.creator.as_deref().unwrap_or(&doc.creator);
    gpx.write_document(doc, creator)?;

    debug!(
        "encoded GPX document: {} waypoints, {} routes, {} tracks",
        doc.waypoints.len(),
        doc.routes.len(),
        doc.tracks.len()
    );
    Ok(())
}

/// Serialize with default options.
pub fn to_string(doc: &GpxDocument) -> Result<String> {
    to_string_with(doc, &WriteOptions::default())
}

pub fn to_string_with(doc: &GpxDocument, options: &WriteOptions) -> Result<String> {
    let mut buf = Vec::new();
    write_gpx(doc, &mut buf, options)?;
    String::from_utf8(buf).map_err(|e| GpxError::Write(e.to_string()))
}

/// Per-call encode state: the XML sink and the namespaces declared on the root.
struct GpxWriter<W: Write> {
    writer: Writer<W>,
    root_scope: Vec<Namespace>,
}

impl<W: Write> GpxWriter<W> {
    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| GpxError::Write(e.to_string()))
    }

    /// Write `start`, the content produced by `body`, and the matching end tag.
    fn element<F>(&mut self, start: BytesStart<'_>, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        self.write(Event::Start(start))?;
        body(self)?;
        self.write(Event::End(end))
    }

    fn text_element(&mut self, start: BytesStart<'_>, text: &str) -> Result<()> {
        self.element(start, |w| w.write(Event::Text(BytesText::new(text))))
    }

    fn opt_text(&mut self, name: &str, value: &Option<String>) -> Result<()> {
        match value {
            Some(text) => self.text_element(BytesStart::new(name), text),
            None => Ok(()),
        }
    }

    fn opt_value<T: Display>(&mut self, name: &str, value: Option<T>) -> Result<()> {
        match value {
            Some(v) => self.text_element(BytesStart::new(name), &v.to_string()),
            None => Ok(()),
        }
    }

    fn write_document(&mut self, doc: &GpxDocument, creator: &str) -> Result<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("gpx");
        root.push_attribute(("xmlns", GPX_NAMESPACE));
        root.push_attribute(("version", "1.1"));
        root.push_attribute(("creator", creator));
        for ns in doc.namespaces.iter().filter(|ns| !ns.prefix.is_empty()) {
            root.push_attribute((ns.attribute_name().as_str(), ns.uri.as_str()));
        }

        self.element(root, |w| {
            if doc.metadata.has_data() {
                w.write_metadata(&doc.metadata)?;
            }
            for wpt in &doc.waypoints {
                w.write_point("wpt", wpt)?;
            }
            for rte in doc.routes.iter().filter(|r| r.has_data()) {
                w.write_route(rte)?;
            }
            for trk in doc.tracks.iter().filter(|t| t.has_data()) {
                w.write_track(trk)?;
            }
            w.write_extensions(&doc.extensions)
        })
    }

    fn write_metadata(&mut self, meta: &GpxMetadata) -> Result<()> {
        self.element(BytesStart::new("metadata"), |w| {
            w.opt_text("name", &meta.name)?;
            w.opt_text("desc", &meta.desc)?;
            if let Some(author) = meta.author.as_ref().filter(|a| a.has_data()) {
                w.write_person(author)?;
            }
            if let Some(copyright) = meta.copyright.as_ref().filter(|c| c.has_data()) {
                w.write_copyright(copyright)?;
            }
            w.write_links(&meta.links)?;
            w.opt_value("time", meta.time.as_ref().map(format_timestamp))?;
            w.opt_text("keywords", &meta.keywords)?;
            if let Some(bounds) = &meta.bounds {
                w.write_bounds(bounds)?;
            }
            w.write_extensions(&meta.extensions)
        })
    }

    fn write_person(&mut self, person: &GpxPerson) -> Result<()> {
        self.element(BytesStart::new("author"), |w| {
            w.opt_text("name", &person.name)?;
            if let Some(email) = person.email.as_ref().filter(|e| e.has_data()) {
                let mut start = BytesStart::new("email");
                if let Some(id) = &email.id {
                    start.push_attribute(("id", id.as_str()));
                }
                if let Some(domain) = &email.domain {
                    start.push_attribute(("domain", domain.as_str()));
                }
                w.write(Event::Empty(start))?;
            }
            if let Some(link) = &person.link {
                w.write_link(link)?;
            }
            Ok(())
        })
    }

    fn write_copyright(&mut self, copyright: &GpxCopyright) -> Result<()> {
        let mut start = BytesStart::new("copyright");
        if let Some(author) = &copyright.author {
            start.push_attribute(("author", author.as_str()));
        }
        self.element(start, |w| {
            w.opt_text("year", &copyright.year)?;
            w.opt_text("license", &copyright.license)
        })
    }

    fn write_bounds(&mut self, bounds: &GpxBounds) -> Result<()> {
        let mut start = BytesStart::new("bounds");
        start.push_attribute(("minlat", bounds.min_lat.to_string().as_str()));
        start.push_attribute(("minlon", bounds.min_lon.to_string().as_str()));
        start.push_attribute(("maxlat", bounds.max_lat.to_string().as_str()));
        start.push_attribute(("maxlon", bounds.max_lon.to_string().as_str()));
        self.write(Event::Empty(start))
    }

    fn write_links(&mut self, links: &[GpxLink]) -> Result<()> {
        links.iter().try_for_each(|link| self.write_link(link))
    }

    fn write_link(&mut self, link: &GpxLink) -> Result<()> {
        if !link.has_data() {
            return Ok(());
        }
        let mut start = BytesStart::new("link");
        if let Some(href) = &link.href {
            start.push_attribute(("href", href.as_str()));
        }
        if link.text.is_none() && link.link_type.is_none() {
            return self.write(Event::Empty(start));
        }
        self.element(start, |w| {
            w.opt_text("text", &link.text)?;
            w.opt_text("type", &link.link_type)
        })
    }

    /// Write a point as `<tag>`; points are written even when they carry
    /// nothing but coordinates.
    fn write_point(&mut self, tag: &str, pt: &GpxPoint) -> Result<()> {
        let mut start = BytesStart::new(tag);
        start.push_attribute(("lat", pt.lat.to_string().as_str()));
        start.push_attribute(("lon", pt.lon.to_string().as_str()));

        if !point_has_children(pt) {
            return self.write(Event::Empty(start));
        }

        self.element(start, |w| {
            w.opt_value("ele", pt.ele)?;
            w.opt_value("time", pt.time.as_ref().map(format_timestamp))?;
            w.opt_value("magvar", pt.magvar)?;
            w.opt_value("geoidheight", pt.geoid_height)?;
            w.opt_text("name", &pt.name)?;
            w.opt_text("cmt", &pt.cmt)?;
            w.opt_text("desc", &pt.desc)?;
            w.opt_text("src", &pt.src)?;
            w.write_links(&pt.links)?;
            w.opt_text("sym", &pt.sym)?;
            w.opt_text("type", &pt.point_type)?;
            w.opt_value("fix", pt.fix)?;
            w.opt_value("sat", pt.sat)?;
            w.opt_value("hdop", pt.hdop)?;
            w.opt_value("pdop", pt.pdop)?;
            w.opt_value("vdop", pt.vdop)?;
            w.opt_value("ageofdgpsdata", pt.age_of_dgps_data)?;
            w.opt_value("dgpsid", pt.dgps_id)?;
            w.write_extensions(&pt.extensions)
        })
    }

    fn write_route(&mut self, rte: &GpxRoute) -> Result<()> {
        self.element(BytesStart::new("rte"), |w| {
            w.opt_text("name", &rte.name)?;
            w.opt_text("cmt", &rte.cmt)?;
            w.opt_text("desc", &rte.desc)?;
            w.opt_text("src", &rte.src)?;
            w.write_links(&rte.links)?;
            w.opt_value("number", rte.number)?;
            w.opt_text("type", &rte.route_type)?;
            w.write_extensions(&rte.extensions)?;
            for pt in &rte.points {
                w.write_point("rtept", pt)?;
            }
            Ok(())
        })
    }

    fn write_track(&mut self, trk: &GpxTrack) -> Result<()> {
        self.element(BytesStart::new("trk"), |w| {
            w.opt_text("name", &trk.name)?;
            w.opt_text("cmt", &trk.cmt)?;
            w.opt_text("desc", &trk.desc)?;
            w.opt_text("src", &trk.src)?;
            w.write_links(&trk.links)?;
            w.opt_value("number", trk.number)?;
            w.opt_text("type", &trk.track_type)?;
            w.write_extensions(&trk.extensions)?;
            for seg in trk.segments.iter().filter(|s| !s.points.is_empty()) {
                w.write_segment(seg)?;
            }
            Ok(())
        })
    }

    fn write_segment(&mut self, seg: &GpxSegment) -> Result<()> {
        self.element(BytesStart::new("trkseg"), |w| {
            for pt in &seg.points {
                w.write_point("trkpt", pt)?;
            }
            w.write_extensions(&seg.extensions)
        })
    }

    fn write_extensions(&mut self, nodes: &[Extension]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.element(BytesStart::new("extensions"), |w| {
            nodes
                .iter()
                .try_for_each(|node| w.write_extension(node, &[]))
        })
    }

    /// Namespace a node is written in: its own declaration, else the nearest
    /// ancestor namespace bound to the same prefix, else the root declaration
    /// for that prefix.
    fn resolve_extension(&self, node: &Extension, ancestors: &[Namespace]) -> Option<Namespace> {
        node.namespace
            .clone()
            .or_else(|| {
                ancestors
                    .iter()
                    .rev()
                    .find(|ns| ns.prefix == node.prefix)
                    .cloned()
            })
            .or_else(|| {
                self.root_scope
                    .iter()
                    .find(|ns| ns.prefix == node.prefix)
                    .cloned()
            })
    }

    /// Write one extension node. `ancestors` holds the effective namespaces
    /// of the enclosing nodes, innermost last. Nodes that resolve to no
    /// namespace are dropped.
    fn write_extension(&mut self, node: &Extension, ancestors: &[Namespace]) -> Result<()> {
        let Some(effective) = self.resolve_extension(node, ancestors) else {
            warn!(
                "dropping extension <{}>: prefix '{}' is not bound to a namespace",
                node.qualified_name(),
                node.prefix
            );
            return Ok(());
        };

        let mut start = BytesStart::new(node.qualified_name());
        if let Some(ns) = &node.namespace {
            start.push_attribute((ns.attribute_name().as_str(), ns.uri.as_str()));
        }

        if node.children.is_empty() {
            return self.text_element(start, &node.value);
        }

        let mut scope = ancestors.to_vec();
        scope.push(effective);
        let writable = node
            .children
            .iter()
            .any(|child| self.resolve_extension(child, &scope).is_some());
        if !writable {
            warn!(
                "writing <{}> empty: none of its children are bound to a namespace",
                node.qualified_name()
            );
            return self.write(Event::Empty(start));
        }

        self.element(start, |w| {
            node.children
                .iter()
                .try_for_each(|child| w.write_extension(child, &scope))
        })
    }
}

fn point_has_children(pt: &GpxPoint) -> bool {
    pt.ele.is_some()
        || pt.time.is_some()
        || pt.magvar.is_some()
        || pt.geoid_height.is_some()
        || pt.name.is_some()
        || pt.cmt.is_some()
        || pt.desc.is_some()
        || pt.src.is_some()
        || pt.links.iter().any(GpxLink::has_data)
        || pt.sym.is_some()
        || pt.point_type.is_some()
        || pt.fix.is_some()
        || pt.sat.is_some()
        || pt.hdop.is_some()
        || pt.pdop.is_some()
        || pt.vdop.is_some()
        || pt.age_of_dgps_data.is_some()
        || pt.dgps_id.is_some()
        || !pt.extensions.is_empty()
}
