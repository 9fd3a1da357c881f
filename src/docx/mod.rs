mod drawing;
mod numbering;
mod styles;
mod text;

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::error::Error;
use crate::model::{
    BlockElement, Bookmark, DocumentSection, DocumentTree, HeaderFooterContent, Image,
    Paragraph, PropertyNode, Run, SectionProperties, Table, TableCell, TableRow,
    UnsupportedBlock,
};
use crate::numbering::NumberingCatalog;
use crate::styles::StylesCatalog;

pub(super) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(super) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(super) const WPD_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(super) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Body-level markup that carries no content of its own.
const BODY_MARKERS: &[&str] = &[
    "bookmarkStart",
    "bookmarkEnd",
    "proofErr",
    "permStart",
    "permEnd",
    "commentRangeStart",
    "commentRangeEnd",
    "moveFromRangeStart",
    "moveFromRangeEnd",
    "moveToRangeStart",
    "moveToRangeEnd",
];

/// Paragraph children whose runs are part of the paragraph text.
const RUN_CONTAINERS: &[&str] = &["hyperlink", "ins", "smartTag", "fldSimple", "customXml"];

/// Everything the layout engine needs from one package.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub styles: StylesCatalog,
    pub numbering: NumberingCatalog,
    pub tree: DocumentTree,
    /// Package paths under `word/media/`, sorted.
    pub media: Vec<String>,
}

pub(super) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(super) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

pub(super) fn wml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    node.children()
        .filter(move |n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

fn is_wml(node: roxmltree::Node) -> bool {
    node.tag_name().namespace() == Some(WML_NS)
}

/// `prefix:name` as written in the source, or the bare name when the
/// namespace has no prefix.
fn qualified_name(node: roxmltree::Node, namespace: Option<&str>, name: &str) -> String {
    match namespace.and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{name}"),
        _ => name.to_string(),
    }
}

/// Verbatim copy of an element subtree.
pub(super) fn property_node(node: roxmltree::Node) -> PropertyNode {
    let tag = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());
    let attributes = node
        .attributes()
        .map(|a| (qualified_name(node, a.namespace(), a.name()), a.value().to_string()))
        .collect();
    let text = node
        .text()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string);
    PropertyNode {
        tag,
        attributes,
        text,
        children: property_block(node),
    }
}

/// Element children of a property container (`w:rPr`, `w:pPr`, ...).
pub(super) fn property_block(node: roxmltree::Node) -> Vec<PropertyNode> {
    node.children()
        .filter(|n| n.is_element())
        .map(property_node)
        .collect()
}

/// Element children of `parent`, with content controls (`w:sdt`) unwrapped.
fn collect_block_nodes<'a>(parent: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "sdt" && is_wml(child) {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

#[derive(Clone, Debug)]
struct Relationship {
    target: String,
    external: bool,
}

/// Relationship ids of one part, with targets resolved to package paths.
#[derive(Clone, Debug, Default)]
pub(super) struct Relationships {
    targets: HashMap<String, Relationship>,
}

impl Relationships {
    /// Parse a `.rels` part. Relative targets are resolved against
    /// `base_dir`, the directory of the source part.
    pub(super) fn from_xml(xml_content: &str, base_dir: &str) -> Self {
        let mut targets = HashMap::new();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            log::warn!("Ignoring malformed relationships of {base_dir}/");
            return Relationships { targets };
        };
        for node in xml.root_element().children() {
            if node.tag_name().name() == "Relationship"
                && let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target"))
            {
                let external = node.attribute("TargetMode") == Some("External");
                let target = if external {
                    target.to_string()
                } else {
                    resolve_part_path(base_dir, target)
                };
                targets.insert(id.to_string(), Relationship { target, external });
            }
        }
        Relationships { targets }
    }

    /// Package path (or external URL) of `id`.
    pub(super) fn resolve(&self, id: &str) -> Option<String> {
        self.targets.get(id).map(|r| r.target.clone())
    }

    fn internal_target(&self, id: &str) -> Option<&str> {
        self.targets
            .get(id)
            .filter(|r| !r.external)
            .map(|r| r.target.as_str())
    }
}

/// Join a relationship target onto `base_dir`, folding `.` and `..`.
/// A leading `/` makes the target package-absolute.
fn resolve_part_path(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = match target.strip_prefix('/') {
        Some(_) => Vec::new(),
        None => base_dir.split('/').filter(|s| !s.is_empty()).collect(),
    };
    for segment in target.trim_start_matches('/').split('/') {
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

fn read_zip_text<R: Read + Seek>(zip: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Relationships of a part like "word/header1.xml", read from
/// "word/_rels/header1.xml.rels".
fn parse_part_relationships<R: Read + Seek>(
    zip: &mut zip::ZipArchive<R>,
    part_path: &str,
) -> Relationships {
    let (dir, file) = match part_path.rsplit_once('/') {
        Some((d, f)) => (d, f),
        None => ("", part_path),
    };
    let rels_path = if dir.is_empty() {
        format!("_rels/{}.rels", file)
    } else {
        format!("{}/_rels/{}.rels", dir, file)
    };
    let Some(xml_content) = read_zip_text(zip, &rels_path) else {
        return Relationships::default();
    };
    Relationships::from_xml(&xml_content, dir)
}

#[derive(Default)]
struct ParagraphParts {
    runs: Vec<Run>,
    bookmarks: Vec<Bookmark>,
    images: Vec<Image>,
}

/// Converts body-like XML (document body, header, footer, table cell) into
/// blocks. Relationship ids are looked up in the owning part's `rels`.
struct BlockParser<'c> {
    numbering: &'c NumberingCatalog,
    rels: &'c Relationships,
}

impl BlockParser<'_> {
    /// Paragraphs, tables and images of a container. Anything else is
    /// skipped.
    fn blocks(&self, parent: roxmltree::Node) -> Vec<BlockElement> {
        let mut blocks = Vec::new();
        for node in collect_block_nodes(parent) {
            if !is_wml(node) {
                continue;
            }
            match node.tag_name().name() {
                "p" => blocks.extend(self.paragraph(node)),
                "tbl" => blocks.push(BlockElement::Table(self.table(node))),
                _ => {}
            }
        }
        blocks
    }

    /// The paragraph followed by the images of its drawings. A paragraph
    /// without text that only holds drawings is replaced by its images.
    fn paragraph(&self, node: roxmltree::Node) -> Vec<BlockElement> {
        let ppr = wml(node, "pPr");
        let mut parts = ParagraphParts::default();
        self.collect_inline(node, &mut parts);

        let properties = ppr
            .map(|ppr| {
                ppr.children()
                    .filter(|n| n.is_element())
                    .filter(|n| !(is_wml(*n) && n.tag_name().name() == "sectPr"))
                    .map(property_node)
                    .collect()
            })
            .unwrap_or_default();

        // a list reference needs both numId and ilvl
        let numbering = ppr.and_then(|ppr| wml(ppr, "numPr")).and_then(|num_pr| {
            let num_id = wml_attr(num_pr, "numId")?.trim().parse().ok()?;
            let level = wml_attr(num_pr, "ilvl")?.trim().parse().ok()?;
            Some(self.numbering.resolve(num_id, level))
        });

        let paragraph = Paragraph {
            runs: parts.runs,
            style_id: ppr.and_then(|ppr| wml_attr(ppr, "pStyle")).map(str::to_string),
            numbering,
            bookmarks: parts.bookmarks,
            properties,
        };

        let drawings_only = !parts.images.is_empty() && paragraph.text().is_empty();
        let images = parts.images.into_iter().map(BlockElement::Image);
        if drawings_only {
            return images.collect();
        }
        std::iter::once(BlockElement::Paragraph(paragraph))
            .chain(images)
            .collect()
    }

    fn collect_inline(&self, parent: roxmltree::Node, parts: &mut ParagraphParts) {
        for child in parent.children().filter(|n| is_wml(*n)) {
            match child.tag_name().name() {
                "r" => self.run(child, parts),
                "bookmarkStart" => {
                    let id = child
                        .attribute((WML_NS, "id"))
                        .and_then(|v| v.trim().parse().ok());
                    let name = child.attribute((WML_NS, "name")).filter(|n| !n.is_empty());
                    if let (Some(id), Some(name)) = (id, name) {
                        parts.bookmarks.push(Bookmark {
                            id,
                            name: name.to_string(),
                        });
                    }
                }
                "sdt" => {
                    if let Some(content) = wml(child, "sdtContent") {
                        self.collect_inline(content, parts);
                    }
                }
                name if RUN_CONTAINERS.contains(&name) => self.collect_inline(child, parts),
                _ => {}
            }
        }
    }

    fn run(&self, node: roxmltree::Node, parts: &mut ParagraphParts) {
        let rpr = wml(node, "rPr");
        let mut text = String::new();
        for child in node.children().filter(|n| is_wml(*n)) {
            match child.tag_name().name() {
                "t" => text.push_str(child.text().unwrap_or("")),
                "tab" | "ptab" => text.push('\t'),
                "br" => text.push('\n'),
                "cr" => text.push('\r'),
                "noBreakHyphen" => text.push('-'),
                "drawing" => parts
                    .images
                    .extend(drawing::parse_drawing(child, self.rels)),
                _ => {}
            }
        }
        parts.runs.push(Run {
            text: text::normalize_text(&text),
            style_id: rpr.and_then(|r| wml_attr(r, "rStyle")).map(str::to_string),
            properties: rpr.map(property_block).unwrap_or_default(),
        });
    }

    fn table(&self, node: roxmltree::Node) -> Table {
        let tbl_pr = wml(node, "tblPr");
        let mut properties: Vec<PropertyNode> = tbl_pr.map(property_block).unwrap_or_default();
        if let Some(grid) = wml(node, "tblGrid") {
            properties.push(property_node(grid));
        }

        let rows = collect_block_nodes(node)
            .into_iter()
            .filter(|n| is_wml(*n) && n.tag_name().name() == "tr")
            .map(|tr| TableRow {
                cells: collect_block_nodes(tr)
                    .into_iter()
                    .filter(|n| is_wml(*n) && n.tag_name().name() == "tc")
                    .map(|tc| TableCell {
                        content: self.blocks(tc),
                        properties: wml(tc, "tcPr").map(property_block).unwrap_or_default(),
                    })
                    .collect(),
                properties: wml(tr, "trPr").map(property_block).unwrap_or_default(),
            })
            .collect();

        Table {
            rows,
            style_id: tbl_pr.and_then(|pr| wml_attr(pr, "tblStyle")).map(str::to_string),
            properties,
        }
    }
}

/// Open package plus the state shared by every part read from it.
struct Package<R> {
    zip: zip::ZipArchive<R>,
    numbering: NumberingCatalog,
    header_footer_cache: HashMap<String, Option<HeaderFooterContent>>,
}

impl<R: Read + Seek> Package<R> {
    /// Header or footer part behind `rel_id`, parsed once per package.
    fn header_footer(
        &mut self,
        rels: &Relationships,
        rel_id: &str,
    ) -> Option<HeaderFooterContent> {
        let Some(part_path) = rels.internal_target(rel_id).map(str::to_string) else {
            log::warn!("Header/footer relationship {rel_id} not found");
            return None;
        };
        if let Some(cached) = self.header_footer_cache.get(&part_path) {
            return cached.clone();
        }

        let content = self.load_header_footer(&part_path, rel_id);
        self.header_footer_cache
            .insert(part_path, content.clone());
        content
    }

    fn load_header_footer(&mut self, part_path: &str, rel_id: &str) -> Option<HeaderFooterContent> {
        let part_rels = parse_part_relationships(&mut self.zip, part_path);
        let Some(xml_content) = read_zip_text(&mut self.zip, part_path) else {
            log::warn!("Missing header/footer part {part_path}");
            return None;
        };
        let xml = match roxmltree::Document::parse(&xml_content) {
            Ok(xml) => xml,
            Err(err) => {
                log::warn!("Skipping malformed header/footer part {part_path}: {err}");
                return None;
            }
        };
        let parser = BlockParser {
            numbering: &self.numbering,
            rels: &part_rels,
        };
        let blocks = parser.blocks(xml.root_element());
        log::debug!("Loaded {part_path} ({} blocks)", blocks.len());
        Some(HeaderFooterContent {
            rel_id: rel_id.to_string(),
            blocks,
        })
    }

    fn section_properties(
        &mut self,
        sect: roxmltree::Node,
        rels: &Relationships,
    ) -> SectionProperties {
        let twips = |node: Option<roxmltree::Node>, attr: &str| {
            node.and_then(|n| n.attribute((WML_NS, attr)))
                .and_then(|v| v.trim().parse::<f32>().ok())
        };
        let pg_sz = wml(sect, "pgSz");
        let pg_mar = wml(sect, "pgMar");

        let mut props = SectionProperties {
            page_width: twips(pg_sz, "w"),
            page_height: twips(pg_sz, "h"),
            orientation: pg_sz
                .and_then(|n| n.attribute((WML_NS, "orient")))
                .map(str::to_string),
            margin_top: twips(pg_mar, "top"),
            margin_bottom: twips(pg_mar, "bottom"),
            margin_left: twips(pg_mar, "left"),
            margin_right: twips(pg_mar, "right"),
            header_margin: twips(pg_mar, "header"),
            footer_margin: twips(pg_mar, "footer"),
            title_page: wml(sect, "titlePg").is_some_and(|n| {
                n.attribute((WML_NS, "val"))
                    .is_none_or(|v| v != "0" && v != "false")
            }),
            raw: Some(property_node(sect)),
            ..Default::default()
        };

        for child in sect.children().filter(|n| is_wml(*n)) {
            let Some(rel_id) = child.attribute((REL_NS, "id")) else {
                continue;
            };
            let kind = child.attribute((WML_NS, "type")).unwrap_or("default");
            let slot = match (child.tag_name().name(), kind) {
                ("headerReference", "default") => &mut props.header_default,
                ("headerReference", "first") => &mut props.header_first,
                ("headerReference", "even") => &mut props.header_even,
                ("footerReference", "default") => &mut props.footer_default,
                ("footerReference", "first") => &mut props.footer_first,
                ("footerReference", "even") => &mut props.footer_even,
                _ => continue,
            };
            *slot = self.header_footer(rels, rel_id);
        }
        props
    }
}

fn media_parts<R: Read + Seek>(zip: &zip::ZipArchive<R>) -> Vec<String> {
    let mut media: Vec<String> = zip
        .file_names()
        .filter(|name| name.starts_with("word/media/") && !name.ends_with('/'))
        .map(str::to_string)
        .collect();
    media.sort();
    media
}

pub fn parse(path: &Path) -> Result<ParsedDocument, Error> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    parse_reader(file)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<ParsedDocument, Error> {
    parse_reader(Cursor::new(bytes))
}

fn parse_reader<R: Read + Seek>(reader: R) -> Result<ParsedDocument, Error> {
    let mut zip = zip::ZipArchive::new(reader)
        .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

    let styles = match read_zip_text(&mut zip, "word/styles.xml") {
        Some(xml_content) => StylesCatalog::resolve(styles::parse_styles(&xml_content)),
        None => {
            log::warn!("word/styles.xml missing, continuing without styles");
            StylesCatalog::default()
        }
    };
    let numbering = read_zip_text(&mut zip, "word/numbering.xml")
        .map(|xml_content| numbering::parse_numbering(&xml_content))
        .unwrap_or_default();
    let rels = parse_part_relationships(&mut zip, "word/document.xml");
    let media = media_parts(&zip);

    let mut xml_content = String::new();
    zip.by_name("word/document.xml")
        .map_err(|_| Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into()))?
        .read_to_string(&mut xml_content)?;

    let xml = roxmltree::Document::parse(&xml_content)?;
    let root = xml.root_element();
    let body = wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let mut package = Package {
        zip,
        numbering,
        header_footer_cache: HashMap::new(),
    };

    let mut sections: Vec<DocumentSection> = Vec::new();
    let mut blocks: Vec<BlockElement> = Vec::new();
    let mut final_sect = None;

    for node in collect_block_nodes(body) {
        let name = node.tag_name().name();
        if is_wml(node) && BODY_MARKERS.contains(&name) {
            continue;
        }
        let parser = BlockParser {
            numbering: &package.numbering,
            rels: &rels,
        };
        match (is_wml(node), name) {
            (true, "p") => {
                let break_props = wml(node, "pPr").and_then(|ppr| wml(ppr, "sectPr"));
                match break_props {
                    Some(sect) => {
                        let properties = package.section_properties(sect, &rels);
                        sections.push(DocumentSection {
                            blocks: std::mem::take(&mut blocks),
                            properties,
                        });
                    }
                    None => blocks.extend(parser.paragraph(node)),
                }
            }
            (true, "tbl") => blocks.push(BlockElement::Table(parser.table(node))),
            (true, "sectPr") => final_sect = Some(node),
            _ => {
                log::debug!("Unsupported body element {name}");
                blocks.push(BlockElement::Unsupported(UnsupportedBlock {
                    tag: qualified_name(node, node.tag_name().namespace(), name),
                    raw: Some(property_node(node)),
                }));
            }
        }
    }

    if !blocks.is_empty() || sections.is_empty() {
        let properties = match final_sect {
            Some(sect) => package.section_properties(sect, &rels),
            None => SectionProperties::default(),
        };
        sections.push(DocumentSection { blocks, properties });
    }
    log::debug!("Parsed {} sections", sections.len());

    Ok(ParsedDocument {
        styles,
        numbering: package.numbering,
        tree: DocumentTree { sections },
        media,
    })
}
