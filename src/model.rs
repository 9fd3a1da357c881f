use std::collections::BTreeMap;
use std::ops::Range;

use indexmap::IndexMap;
use serde::Serialize;

/// Generic formatting directive kept verbatim from the source markup
/// (`w:rPr`, `w:pPr`, `w:tblBorders`, ...). Tags and attribute keys keep
/// their namespace prefix; lookups match on suffix. Attributes stay in source
/// order, so a suffix lookup returns the first one the markup declared.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PropertyNode {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PropertyNode>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleType {
    #[default]
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleType {
    /// `w:type` value; anything unknown is a paragraph style.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("character") => StyleType::Character,
            Some("table") => StyleType::Table,
            Some("numbering") => StyleType::Numbering,
            _ => StyleType::Paragraph,
        }
    }
}

/// A style as declared, or after cascade resolution. `properties` maps a
/// block name (`rPr`, `pPr`, `tblPr`, `tblStylePr`, `numPr`) to its nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub style_id: String,
    pub style_type: StyleType,
    pub name: Option<String>,
    pub based_on: Option<String>,
    pub next_style: Option<String>,
    pub linked_style: Option<String>,
    pub is_default: bool,
    pub ui_priority: Option<i64>,
    pub is_primary: bool,
    pub aliases: Option<String>,
    pub properties: BTreeMap<String, Vec<PropertyNode>>,
}

impl StyleDefinition {
    pub fn new(style_id: impl Into<String>, style_type: StyleType) -> Self {
        StyleDefinition {
            style_id: style_id.into(),
            style_type,
            ..Default::default()
        }
    }

    pub fn block(&self, name: &str) -> &[PropertyNode] {
        self.properties.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub text: String,
    pub style_id: Option<String>,
    pub properties: Vec<PropertyNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub name: String,
}

/// Resolved list reference of a paragraph. Only `num_id` and `level` are
/// guaranteed; the rest is filled as far as the numbering catalog allows.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberingInfo {
    pub num_id: u32,
    pub level: u32,
    pub abstract_id: Option<u32>,
    pub start: Option<u32>,
    pub format: Option<String>,
    pub level_text: Option<String>,
    pub alignment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub style_id: Option<String>,
    pub numbering: Option<NumberingInfo>,
    pub bookmarks: Vec<Bookmark>,
    pub properties: Vec<PropertyNode>,
}

impl Paragraph {
    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableCell {
    pub content: Vec<BlockElement>,
    pub properties: Vec<PropertyNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub properties: Vec<PropertyNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub style_id: Option<String>,
    pub properties: Vec<PropertyNode>,
}

/// Image reference. `properties` is a free-form map (`wrapStyle`,
/// `offsetX`, `relativeY`, `margin_top`, ...) interpreted by the layout pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub rel_id: String,
    pub media_path: String,
    pub width_emu: Option<u64>,
    pub height_emu: Option<u64>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnsupportedBlock {
    pub tag: String,
    pub raw: Option<PropertyNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockElement {
    Paragraph(Paragraph),
    Table(Table),
    Image(Image),
    Unsupported(UnsupportedBlock),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterContent {
    pub rel_id: String,
    pub blocks: Vec<BlockElement>,
}

/// Page setup of a section. Lengths are twips as found in the markup;
/// `None` means "not specified" and is defaulted by the layout engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProperties {
    pub page_width: Option<f32>,
    pub page_height: Option<f32>,
    pub margin_top: Option<f32>,
    pub margin_bottom: Option<f32>,
    pub margin_left: Option<f32>,
    pub margin_right: Option<f32>,
    pub header_margin: Option<f32>,
    pub footer_margin: Option<f32>,
    pub orientation: Option<String>,
    pub header_default: Option<HeaderFooterContent>,
    pub header_first: Option<HeaderFooterContent>,
    pub header_even: Option<HeaderFooterContent>,
    pub footer_default: Option<HeaderFooterContent>,
    pub footer_first: Option<HeaderFooterContent>,
    pub footer_even: Option<HeaderFooterContent>,
    pub title_page: bool,
    pub raw: Option<PropertyNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DocumentSection {
    pub blocks: Vec<BlockElement>,
    pub properties: SectionProperties,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DocumentTree {
    pub sections: Vec<DocumentSection>,
}

impl DocumentTree {
    /// Single section with default page setup.
    pub fn from_blocks(blocks: Vec<BlockElement>) -> Self {
        DocumentTree {
            sections: vec![DocumentSection {
                blocks,
                properties: SectionProperties::default(),
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Layout output

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Paragraph,
    Table,
    Image,
    Header,
    Footer,
    Unsupported,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Edges {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Edges {
    pub fn uniform(value: f32) -> Self {
        Edges {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VMerge {
    Restart,
    Continue,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphContent {
    pub text: String,
    pub lines: Vec<String>,
    pub first_line_indent: f32,
}

/// Per-cell layout record. `x`/`y` are absolute; the nested `boxes` are
/// positioned relative to the cell origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellLayout {
    pub column_index: usize,
    pub row_index: usize,
    pub col_span: usize,
    pub row_span: usize,
    pub v_merge: Option<VMerge>,
    pub base_row: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub content_height: f32,
    pub padding: Edges,
    pub borders: Edges,
    pub boxes: Vec<LayoutBox>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableContent {
    pub rows: usize,
    pub columns: usize,
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
    pub cells: Vec<Vec<CellLayout>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub source: String,
    pub resource_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterBoxContent {
    pub boxes: Vec<LayoutBox>,
    pub relationship_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnsupportedContent {
    pub repr: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BoxContent {
    Paragraph(ParagraphContent),
    Table(TableContent),
    Image(ImageContent),
    HeaderFooter(HeaderFooterBoxContent),
    Unsupported(UnsupportedContent),
}

pub type StyleMap = BTreeMap<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBox {
    pub element_type: ElementType,
    pub content: BoxContent,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: StyleMap,
}

impl LayoutBox {
    /// Move the box vertically, together with the absolute cell records of a
    /// table payload.
    pub fn translate_y(&mut self, dy: f32) {
        self.y += dy;
        if let BoxContent::Table(table) = &mut self.content {
            for cell in table.cells.iter_mut().flatten() {
                cell.y += dy;
            }
        }
    }

    pub fn paragraph(&self) -> Option<&ParagraphContent> {
        match &self.content {
            BoxContent::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableContent> {
        match &self.content {
            BoxContent::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImageContent> {
        match &self.content {
            BoxContent::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn children(&self) -> &[LayoutBox] {
        match &self.content {
            BoxContent::HeaderFooter(hf) => &hf.boxes,
            _ => &[],
        }
    }
}

/// Section-scoped group of boxes (not a paginated page). `box_range`
/// indexes into [`LayoutModel::boxes`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGroup {
    pub page_width: f32,
    pub page_height: f32,
    pub box_range: Range<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LayoutModel {
    pub boxes: Vec<LayoutBox>,
    pub pages: Vec<PageGroup>,
}

impl LayoutModel {
    /// Boxes of the section at `index`, in flow order.
    pub fn section_boxes(&self, index: usize) -> Option<&[LayoutBox]> {
        let page = self.pages.get(index)?;
        self.boxes.get(page.box_range.clone())
    }

    pub fn sections(&self) -> impl Iterator<Item = &[LayoutBox]> {
        self.pages
            .iter()
            .filter_map(|page| self.boxes.get(page.box_range.clone()))
    }
}
