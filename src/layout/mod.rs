mod header_footer;
mod image;
mod paragraph;
mod table;

pub use image::WrapMode;
pub use paragraph::wrap_text;

use crate::model::{
    BlockElement, BoxContent, DocumentTree, ElementType, LayoutBox, LayoutModel, PageGroup,
    SectionProperties, StyleMap, UnsupportedContent,
};
use crate::numbering::{ListCounters, NumberingCatalog};
use crate::property::twips_to_points;
pub use crate::property::{EMU_PER_POINT, TWIPS_PER_POINT};
use crate::styles::StylesCatalog;

pub const DEFAULT_PAGE_WIDTH_PT: f32 = 595.0; // A4
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 842.0;
pub const DEFAULT_MARGIN_PT: f32 = 72.0;
pub const DEFAULT_FONT_SIZE_PT: f32 = 11.0;
pub const DEFAULT_LINE_HEIGHT_PT: f32 = DEFAULT_FONT_SIZE_PT * 1.2;
pub const DEFAULT_TABLE_CELL_PADDING_PT: f32 = 4.0;
pub const DEFAULT_TABLE_BORDER_WIDTH_PT: f32 = 0.5;

/// Height of an empty table row, and minimum width of a column nothing
/// constrains.
pub const BASELINE_CELL_EXTENT_PT: f32 =
    DEFAULT_LINE_HEIGHT_PT + 2.0 * (DEFAULT_TABLE_CELL_PADDING_PT + DEFAULT_TABLE_BORDER_WIDTH_PT);
/// Gap left below every table.
pub const TABLE_SPACING_PT: f32 = DEFAULT_LINE_HEIGHT_PT * 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
    /// Tables nested deeper than this are emitted as unsupported placeholders.
    pub max_table_depth: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions { max_table_depth: 32 }
    }
}

/// Flow state of one section (or one table cell, or one header/footer).
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutContext {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub cursor_x: f32,
    pub cursor_y: f32,
    pub header_margin: f32,
    pub footer_margin: f32,
}

impl LayoutContext {
    /// Page geometry of a section, in points, with the cursor at the top-left
    /// corner of the content area.
    pub fn for_section(props: &SectionProperties) -> Self {
        let pt = |value: Option<f32>, default: f32| value.map(twips_to_points).unwrap_or(default);

        let mut page_width = pt(props.page_width, DEFAULT_PAGE_WIDTH_PT);
        let mut page_height = pt(props.page_height, DEFAULT_PAGE_HEIGHT_PT);
        let landscape = props
            .orientation
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case("landscape"));
        if landscape && page_width < page_height {
            std::mem::swap(&mut page_width, &mut page_height);
        }

        let margin_left = pt(props.margin_left, DEFAULT_MARGIN_PT);
        let margin_top = pt(props.margin_top, DEFAULT_MARGIN_PT);
        LayoutContext {
            page_width,
            page_height,
            margin_left,
            margin_right: pt(props.margin_right, DEFAULT_MARGIN_PT),
            margin_top,
            margin_bottom: pt(props.margin_bottom, DEFAULT_MARGIN_PT),
            cursor_x: margin_left,
            cursor_y: margin_top,
            header_margin: pt(props.header_margin, 0.0),
            footer_margin: pt(props.footer_margin, 0.0),
        }
    }

    /// Width between the left and right margins. Not clamped.
    pub fn available_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }
}

/// Turns a [`DocumentTree`] into positioned [`LayoutBox`]es.
///
/// The engine itself is immutable; every call to [`LayoutEngine::layout`]
/// owns its contexts and list counters, so one engine can serve several
/// threads.
pub struct LayoutEngine<'a> {
    styles: &'a StylesCatalog,
    numbering: Option<&'a NumberingCatalog>,
    options: LayoutOptions,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(styles: &'a StylesCatalog) -> Self {
        LayoutEngine {
            styles,
            numbering: None,
            options: LayoutOptions::default(),
        }
    }

    pub fn with_numbering(mut self, numbering: &'a NumberingCatalog) -> Self {
        self.numbering = Some(numbering);
        self
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn layout(&self, tree: &DocumentTree) -> LayoutModel {
        let mut pass = LayoutPass {
            styles: self.styles,
            numbering: self.numbering,
            options: &self.options,
            counters: ListCounters::default(),
            table_depth: 0,
        };
        let mut model = LayoutModel::default();

        for (index, section) in tree.sections.iter().enumerate() {
            let mut context = LayoutContext::for_section(&section.properties);
            let first = model.boxes.len();

            if let Some(header) = header_footer::select_header(&section.properties)
                && let Some(b) = pass.layout_header_footer(header, &context, ElementType::Header)
            {
                model.boxes.push(b);
            }

            for block in &section.blocks {
                let b = pass.layout_block(block, &mut context);
                model.boxes.push(b);
            }

            if let Some(footer) = header_footer::select_footer(&section.properties)
                && let Some(b) = pass.layout_header_footer(footer, &context, ElementType::Footer)
            {
                model.boxes.push(b);
            }

            log::debug!(
                "Section {}: {} boxes, page {}x{}pt, cursor ended at {:.1}pt",
                index,
                model.boxes.len() - first,
                context.page_width,
                context.page_height,
                context.cursor_y
            );
            model.pages.push(PageGroup {
                page_width: context.page_width,
                page_height: context.page_height,
                box_range: first..model.boxes.len(),
            });
        }

        model
    }
}

/// State of a single layout call.
struct LayoutPass<'e> {
    styles: &'e StylesCatalog,
    numbering: Option<&'e NumberingCatalog>,
    options: &'e LayoutOptions,
    counters: ListCounters,
    /// Number of tables enclosing the block being laid out.
    table_depth: usize,
}

impl LayoutPass<'_> {
    fn layout_block(&mut self, block: &BlockElement, context: &mut LayoutContext) -> LayoutBox {
        match block {
            BlockElement::Paragraph(p) => self.layout_paragraph(p, context),
            BlockElement::Table(t) if self.table_depth < self.options.max_table_depth => {
                self.layout_table(t, context)
            }
            BlockElement::Table(_) => {
                log::warn!(
                    "Table nested deeper than {} levels, emitting placeholder",
                    self.options.max_table_depth
                );
                layout_placeholder(block, context)
            }
            BlockElement::Image(i) => image::layout_image(i, context),
            BlockElement::Unsupported(_) => layout_placeholder(block, context),
        }
    }
}

fn layout_placeholder(block: &BlockElement, context: &mut LayoutContext) -> LayoutBox {
    let b = LayoutBox {
        element_type: ElementType::Unsupported,
        content: BoxContent::Unsupported(UnsupportedContent {
            repr: format!("{block:?}"),
        }),
        x: context.margin_left,
        y: context.cursor_y,
        width: context.available_width(),
        height: DEFAULT_LINE_HEIGHT_PT,
        style: StyleMap::new(),
    };
    context.cursor_y += DEFAULT_LINE_HEIGHT_PT;
    b
}
