//! Package parts calamine does not surface: defined-name scopes and
//! external link targets

use crate::error::{PruneError, PruneResult};
use crate::types::NamedRange;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Built-ins the host shows without their `_xlnm.` prefix
const UNPREFIXED_BUILTINS: [&str; 2] = ["Print_Area", "Print_Titles"];

/// Metadata read straight from the package XML
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PackageMetadata {
    pub names: Vec<NamedRange>,
    /// External link sources in `[n]` index order
    pub links: Vec<String>,
}

impl PackageMetadata {
    /// `sheet_names` must be in workbook order; `localSheetId` indexes it
    pub fn read(path: &Path, sheet_names: &[String]) -> PruneResult<Self> {
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(file)
            .map_err(|e| PruneError::Excel(format!("Failed to read xlsx package: {}", e)))?;

        let workbook_xml = read_part(&mut zip, "xl/workbook.xml")?
            .ok_or_else(|| PruneError::Excel("package has no xl/workbook.xml".to_string()))?;
        let rels_xml = read_part(&mut zip, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();

        let names = parse_defined_names(&workbook_xml, sheet_names)?;

        let targets = parse_relationship_targets(&rels_xml)?;
        let mut links = Vec::new();
        for rid in parse_external_reference_ids(&workbook_xml)? {
            let Some(target) = targets.get(&rid) else {
                continue;
            };
            let part = normalize_part("xl/", target);
            if let Some(source) = read_link_source(&mut zip, &part)? {
                links.push(source);
            }
        }

        Ok(Self { names, links })
    }
}

fn read_part(zip: &mut ZipArchive<File>, name: &str) -> PruneResult<Option<String>> {
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(PruneError::Excel(format!("Failed to read {}: {}", name, e))),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    for attr in e.attributes().with_checks(false) {
        let Ok(attr) = attr else {
            continue;
        };
        if attr.key.local_name().as_ref() != key {
            continue;
        }
        if let Ok(v) = attr.unescape_value() {
            return Some(v.into_owned());
        }
    }
    None
}

fn xml_error(part: &str, e: quick_xml::Error) -> PruneError {
    PruneError::Excel(format!("Failed to parse {}: {}", part, e))
}

fn parse_defined_names(xml: &str, sheet_names: &[String]) -> PruneResult<Vec<NamedRange>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut current: Option<(String, Option<usize>)> = None;
    let mut text = String::new();
    let mut names = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"definedName" => {
                let name = attr_value(&e, b"name");
                let local = attr_value(&e, b"localSheetId").and_then(|s| s.parse().ok());
                current = name.map(|n| (n, local));
                text.clear();
            }
            Ok(Event::Text(e)) if current.is_some() => {
                let t = e.unescape().map_err(|e| xml_error("xl/workbook.xml", e))?;
                text.push_str(&t);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"definedName" => {
                let Some((name, local)) = current.take() else {
                    continue;
                };
                let name = match name.strip_prefix("_xlnm.") {
                    Some(rest) if UNPREFIXED_BUILTINS.contains(&rest) => rest.to_string(),
                    _ => name,
                };
                let refers_to = format!("={}", text.trim());
                let range = NamedRange::new(name, refers_to);
                names.push(match local.and_then(|i| sheet_names.get(i)) {
                    Some(sheet) => range.scoped_to(sheet.as_str()),
                    None => range,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/workbook.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(names)
}

/// `r:id` of each `<externalReference>`, in order
fn parse_external_reference_ids(xml: &str) -> PruneResult<Vec<String>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"externalReference" =>
            {
                if let Some(id) = attr_value(&e, b"id") {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/workbook.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

fn parse_relationship_targets(xml: &str) -> PruneResult<HashMap<String, String>> {
    let mut targets = HashMap::new();
    for (id, target, _) in parse_relationships(xml)? {
        targets.insert(id, target);
    }
    Ok(targets)
}

/// `(Id, Target, TargetMode)` triples
fn parse_relationships(xml: &str) -> PruneResult<Vec<(String, String, Option<String>)>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target"))
                {
                    out.push((id, target, attr_value(&e, b"TargetMode")));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("relationships", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// The external target recorded in an externalLink part's relationships
fn read_link_source(zip: &mut ZipArchive<File>, part: &str) -> PruneResult<Option<String>> {
    let rels_path = match part.rfind('/') {
        Some(i) => format!("{}_rels/{}.rels", &part[..=i], &part[i + 1..]),
        None => format!("_rels/{}.rels", part),
    };
    let Some(xml) = read_part(zip, &rels_path)? else {
        return Ok(None);
    };
    Ok(parse_relationships(&xml)?
        .into_iter()
        .find(|(_, _, mode)| mode.as_deref() == Some("External"))
        .map(|(_, target, _)| target))
}

/// Resolve a relationship target against the part directory
fn normalize_part(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
