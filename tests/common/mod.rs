#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

use docx_layout::model::{
    BlockElement, Image, Paragraph, PropertyNode, Run, Table, TableCell, TableRow,
};

pub const EPS: f32 = 1e-3;

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPS
}

#[track_caller]
pub fn assert_approx(actual: f32, expected: f32) {
    assert!(approx(actual, expected), "expected {expected}, got {actual}");
}

// ---------------------------------------------------------------------------
// Model builders

pub fn run(text: &str) -> Run {
    Run {
        text: text.to_string(),
        ..Default::default()
    }
}

pub fn sized_run(text: &str, sz: &str) -> Run {
    Run {
        text: text.to_string(),
        style_id: None,
        properties: vec![PropertyNode::new("w:sz").with_attr("w:val", sz)],
    }
}

pub fn para(text: &str) -> Paragraph {
    Paragraph {
        runs: vec![run(text)],
        ..Default::default()
    }
}

pub fn styled_para(text: &str, style_id: &str) -> Paragraph {
    Paragraph {
        style_id: Some(style_id.to_string()),
        ..para(text)
    }
}

pub fn spacing(before: Option<&str>, after: Option<&str>) -> PropertyNode {
    let mut node = PropertyNode::new("w:spacing");
    if let Some(before) = before {
        node = node.with_attr("w:before", before);
    }
    if let Some(after) = after {
        node = node.with_attr("w:after", after);
    }
    node
}

pub fn p_block(p: Paragraph) -> BlockElement {
    BlockElement::Paragraph(p)
}

pub fn text_block(text: &str) -> BlockElement {
    BlockElement::Paragraph(para(text))
}

pub fn cell(texts: &[&str]) -> TableCell {
    TableCell {
        content: texts.iter().map(|t| text_block(t)).collect(),
        properties: Vec::new(),
    }
}

pub fn cell_with(texts: &[&str], properties: Vec<PropertyNode>) -> TableCell {
    TableCell {
        properties,
        ..cell(texts)
    }
}

pub fn v_merge(val: Option<&str>) -> PropertyNode {
    let node = PropertyNode::new("w:vMerge");
    match val {
        Some(val) => node.with_attr("w:val", val),
        None => node,
    }
}

pub fn grid_span(span: u32) -> PropertyNode {
    PropertyNode::new("w:gridSpan").with_attr("w:val", span.to_string())
}

pub fn table(rows: Vec<Vec<TableCell>>) -> Table {
    Table {
        rows: rows
            .into_iter()
            .map(|cells| TableRow {
                cells,
                properties: Vec::new(),
            })
            .collect(),
        ..Default::default()
    }
}

pub fn tbl_grid(widths_twips: &[u32]) -> PropertyNode {
    widths_twips.iter().fold(PropertyNode::new("w:tblGrid"), |grid, w| {
        grid.with_child(PropertyNode::new("w:gridCol").with_attr("w:w", w.to_string()))
    })
}

pub fn image(width_emu: Option<u64>, height_emu: Option<u64>, props: &[(&str, &str)]) -> Image {
    Image {
        rel_id: "rId7".to_string(),
        media_path: "word/media/image1.png".to_string(),
        width_emu,
        height_emu,
        properties: props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// In-memory packages

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const NAMESPACES: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#;

pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NAMESPACES}><w:body>{body}</w:body></w:document>"#
    )
}

pub fn part_xml(root: &str, content: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:{root} {NAMESPACES}>{content}</w:{root}>"#
    )
}

pub fn rels_xml(entries: &[(&str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, target)| {
            format!(r#"<Relationship Id="{id}" Type="http://example.invalid/rel" Target="{target}"/>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
    )
}

/// Zip `parts` (path, content) into a package.
pub fn build_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, content) in parts {
        zip.start_file(*name, options).expect("start zip entry");
        zip.write_all(content).expect("write zip entry");
    }
    zip.finish().expect("finish zip").into_inner()
}

/// Package holding only `word/document.xml` with `body`.
pub fn minimal_docx(body: &str) -> Vec<u8> {
    let document = document_xml(body);
    build_package(&[("word/document.xml", document.as_bytes())])
}

// ---------------------------------------------------------------------------
// Fixture corpus (tests/fixtures/<group>/<case>/input.docx)

fn load_skiplist() -> HashSet<String> {
    let path = Path::new("tests/fixtures/SKIPLIST");
    let Ok(content) = fs::read_to_string(path) else {
        return HashSet::new();
    };
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect()
}

pub fn group_name(fixture: &Path) -> String {
    fixture
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Display name for tables: group/case (long names truncated to 16 chars)
pub fn display_name(fixture: &Path) -> String {
    let case = fixture
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let short = if case.chars().count() > 16 {
        format!("{}..", case.chars().take(16).collect::<String>())
    } else {
        case
    };
    format!("{}/{}", group_name(fixture), short)
}

/// Output directory: tests/output/<group>/<case>/
pub fn output_dir(fixture: &Path) -> PathBuf {
    let case = fixture
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from("tests/output")
        .join(group_name(fixture))
        .join(case)
}

/// Discover fixture cases. Filter with DOCX_LAYOUT_CASE (case name) and
/// DOCX_LAYOUT_GROUP (folder name). A missing fixture directory yields none.
pub fn discover_fixtures() -> io::Result<Vec<PathBuf>> {
    let fixtures_dir = Path::new("tests/fixtures");
    if !fixtures_dir.is_dir() {
        return Ok(Vec::new());
    }
    let case_filter = std::env::var("DOCX_LAYOUT_CASE").ok();
    let group_filter = std::env::var("DOCX_LAYOUT_GROUP").ok();
    let skiplist = load_skiplist();
    let mut fixtures: Vec<PathBuf> = Vec::new();
    for group_entry in fs::read_dir(fixtures_dir)? {
        let group = group_entry?.path();
        if !group.is_dir() {
            continue;
        }
        let gname = group.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if let Some(ref gf) = group_filter
            && gname != gf.as_str()
        {
            continue;
        }
        for entry in fs::read_dir(&group)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if let Some(ref filter) = case_filter {
                if name == filter.as_str() {
                    fixtures.push(path);
                }
            } else if !skiplist.contains(name) && !skiplist.contains(gname) {
                fixtures.push(path);
            }
        }
    }
    fixtures.sort();
    Ok(fixtures)
}

// ---------------------------------------------------------------------------
// Sample package: two sections, styles, a list, a table, a header, a footer
// with its own relationships, and two pictures.

const SAMPLE_STYLES: &str = r#"<w:docDefaults/><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:before="480" w:after="120"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4"/><w:bottom w:val="single" w:sz="4"/></w:tblBorders></w:tblPr></w:style>"#;

const SAMPLE_NUMBERING: &str = r#"<w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="hybridMultilevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/><w:lvlJc w:val="left"/></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>"#;

const SAMPLE_BODY: &str = r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p><w:p><w:pPr><w:sectPr><w:headerReference w:type="first" r:id="rId2"/><w:pgSz w:w="12240" w:h="15840" w:orient="landscape"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720"/></w:sectPr></w:pPr></w:p><w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>first item</w:t></w:r></w:p><w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t xml:space="preserve">second&#160;item</w:t></w:r><w:hyperlink r:id="rId9"><w:r><w:t xml:space="preserve"> link</w:t></w:r></w:hyperlink></w:p><w:bookmarkStart w:id="0" w:name="_GoBack"/><w:bookmarkEnd w:id="0"/><w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="4000"/><w:gridCol w:w="4000"/></w:tblGrid><w:tr><w:tc><w:tcPr><w:tcW w:w="4000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl><w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="914400" cy="457200"/><wp:docPr id="1" name="Picture 1" descr="logo"/><a:graphic><a:graphicData><a:blip r:embed="rId3"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p><w:altChunk r:id="rId4"/><w:sectPr><w:headerReference w:type="default" r:id="rId2"/><w:footerReference r:id="rId5"/><w:pgSz w:w="11906" w:h="16838"/><w:titlePg/></w:sectPr>"#;

const SAMPLE_FOOTER: &str = r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="127000" cy="127000"/><a:graphic><a:graphicData><a:blip r:embed="rId1"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#;

/// Package exercising most of what the parser reads.
pub fn sample_docx() -> Vec<u8> {
    let document = document_xml(SAMPLE_BODY);
    let styles = part_xml("styles", SAMPLE_STYLES);
    let numbering = part_xml("numbering", SAMPLE_NUMBERING);
    let header = part_xml("hdr", r#"<w:p><w:r><w:t>Running head</w:t></w:r></w:p>"#);
    let footer = part_xml("ftr", SAMPLE_FOOTER);
    let document_rels = rels_xml(&[
        ("rId2", "header1.xml"),
        ("rId3", "media/image1.png"),
        ("rId5", "footer1.xml"),
    ]);
    let footer_rels = rels_xml(&[("rId1", "media/image2.png")]);
    build_package(&[
        ("word/document.xml", document.as_bytes()),
        ("word/styles.xml", styles.as_bytes()),
        ("word/numbering.xml", numbering.as_bytes()),
        ("word/header1.xml", header.as_bytes()),
        ("word/footer1.xml", footer.as_bytes()),
        ("word/_rels/document.xml.rels", document_rels.as_bytes()),
        ("word/_rels/footer1.xml.rels", footer_rels.as_bytes()),
        ("word/media/image2.png", &b"\x89PNG"[..]),
        ("word/media/image1.png", &b"\x89PNG"[..]),
    ])
}
