use serde_json::json;

use super::{DEFAULT_FONT_SIZE_PT, DEFAULT_LINE_HEIGHT_PT, LayoutContext, LayoutPass};
use crate::model::{
    BoxContent, ElementType, LayoutBox, NumberingInfo, Paragraph, ParagraphContent, PropertyNode,
    StyleDefinition, StyleMap,
};
use crate::property::find_node;

/// Average glyph advance as a fraction of the font size.
const AVERAGE_CHAR_WIDTH: f32 = 0.5;

#[derive(Clone, Debug, Default, PartialEq)]
struct DeclaredSpacing {
    before: Option<f32>,
    after: Option<f32>,
    line: Option<f32>,
    line_rule: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
struct Spacing {
    before: f32,
    after: f32,
    line: Option<f32>,
    line_rule: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct DeclaredIndent {
    left: Option<f32>,
    right: Option<f32>,
    first_line: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Indent {
    left: f32,
    right: f32,
    first_line: f32,
}

/// Sizes above 20 are read as half-points. A genuine 24pt whole-point size
/// comes out as 12pt.
fn normalize_font_size(size: i64) -> f32 {
    if size > 20 {
        size as f32 / 2.0
    } else {
        size as f32
    }
}

fn font_size_from(nodes: &[PropertyNode]) -> Option<f32> {
    nodes
        .iter()
        .filter(|n| n.matches("sz") || n.matches("szCs"))
        .find_map(|n| n.int_attr("val"))
        .map(normalize_font_size)
}

/// Largest explicit run size, else the style's, else the default.
fn resolve_font_size(paragraph: &Paragraph, style: Option<&StyleDefinition>) -> f32 {
    paragraph
        .runs
        .iter()
        .filter_map(|run| font_size_from(&run.properties))
        .reduce(f32::max)
        .or_else(|| style.and_then(|s| font_size_from(s.block("rPr"))))
        .unwrap_or(DEFAULT_FONT_SIZE_PT)
}

fn spacing_from(nodes: &[PropertyNode]) -> DeclaredSpacing {
    let mut spacing = DeclaredSpacing::default();
    let Some(node) = find_node(nodes, "spacing") else {
        return spacing;
    };
    let rule = node.attr("lineRule").filter(|r| !r.is_empty());

    if !node.flag_attr("beforeAutospacing") {
        spacing.before = node.twips_attr("before");
    }
    if !node.flag_attr("afterAutospacing") {
        spacing.after = node.twips_attr("after");
    }
    // exact/atLeast lines are twips, auto lines are 240ths of a line
    spacing.line = node.float_attr("line").map(|line| match rule {
        Some(r) if r.eq_ignore_ascii_case("exact") || r.eq_ignore_ascii_case("atleast") => {
            line / 20.0
        }
        _ => line,
    });
    spacing.line_rule = rule.map(str::to_string);
    spacing
}

fn resolve_spacing(paragraph: &Paragraph, style: Option<&StyleDefinition>) -> Spacing {
    let direct = spacing_from(&paragraph.properties);
    let styled = style.map(|s| spacing_from(s.block("pPr"))).unwrap_or_default();
    Spacing {
        before: direct.before.or(styled.before).unwrap_or(0.0),
        after: direct.after.or(styled.after).unwrap_or(0.0),
        line: direct.line.or(styled.line),
        line_rule: direct.line_rule.or(styled.line_rule),
    }
}

fn line_height(font_size: f32, spacing: &Spacing) -> f32 {
    let base = (font_size * 1.2).max(DEFAULT_LINE_HEIGHT_PT);
    let Some(line) = spacing.line else {
        return base;
    };
    let rule = spacing
        .line_rule
        .as_deref()
        .unwrap_or("auto")
        .to_ascii_lowercase();
    match rule.as_str() {
        "exact" => line,
        "atleast" => base.max(line),
        _ if line > 0.0 => base * (line / 240.0),
        _ => base,
    }
}

fn indent_from(nodes: &[PropertyNode]) -> DeclaredIndent {
    let mut indent = DeclaredIndent::default();
    let Some(node) = find_node(nodes, "ind") else {
        return indent;
    };
    indent.left = node.twips_attr("left").or_else(|| node.twips_attr("start"));
    indent.right = node.twips_attr("right").or_else(|| node.twips_attr("end"));
    indent.first_line = node.twips_attr("firstLine");
    if let Some(hanging) = node.twips_attr("hanging") {
        indent.first_line = Some(-hanging);
    }
    indent
}

fn resolve_indent(paragraph: &Paragraph, style: Option<&StyleDefinition>) -> Indent {
    let direct = indent_from(&paragraph.properties);
    let styled = style.map(|s| indent_from(s.block("pPr"))).unwrap_or_default();
    Indent {
        left: direct.left.or(styled.left).unwrap_or(0.0),
        right: direct.right.or(styled.right).unwrap_or(0.0),
        first_line: direct.first_line.or(styled.first_line).unwrap_or(0.0),
    }
}

fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVERAGE_CHAR_WIDTH
}

/// Greedy word wrap on estimated widths. Words are never split; a word wider
/// than `max_width` gets a line of its own.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let space_width = estimate_text_width(" ", font_size);
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = estimate_text_width(word, font_size);
        let projected = if current.is_empty() {
            word_width
        } else {
            current_width + space_width + word_width
        };
        if !current.is_empty() && projected > max_width {
            lines.push(current.join(" "));
            current.clear();
            current_width = word_width;
        } else {
            current_width = projected;
        }
        current.push(word);
    }

    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

impl<'e> LayoutPass<'e> {
    /// The style the paragraph names. Unstyled paragraphs take only direct
    /// formatting and the built-in defaults.
    pub(super) fn paragraph_style(&self, paragraph: &Paragraph) -> Option<&'e StyleDefinition> {
        paragraph
            .style_id
            .as_deref()
            .and_then(|id| self.styles.get(id))
    }

    pub(super) fn layout_paragraph(
        &mut self,
        paragraph: &Paragraph,
        context: &mut LayoutContext,
    ) -> LayoutBox {
        let text = paragraph.text();
        let style = self.paragraph_style(paragraph);
        let font_size = resolve_font_size(paragraph, style);
        let spacing = resolve_spacing(paragraph, style);
        let line_height = line_height(font_size, &spacing);
        let indent = resolve_indent(paragraph, style);

        context.cursor_y += spacing.before;

        let width = (context.available_width() - indent.left - indent.right).max(0.0);
        let lines = wrap_text(&text, width, font_size);
        let height = line_height * lines.len().max(1) as f32;

        let mut style_map = StyleMap::new();
        style_map.insert("styleId".into(), json!(paragraph.style_id));
        if let Some(resolved) = style {
            style_map.insert("resolved".into(), json!(resolved.properties));
        }
        style_map.insert("fontSize".into(), json!(font_size));
        style_map.insert(
            "spacing".into(),
            json!({
                "before": spacing.before,
                "after": spacing.after,
                "line": spacing.line,
                "lineRule": spacing.line_rule,
            }),
        );
        style_map.insert(
            "indent".into(),
            json!({
                "left": indent.left,
                "right": indent.right,
                "firstLine": indent.first_line,
            }),
        );
        if let Some(info) = self.numbering_for(paragraph) {
            if let Some(label) = self.counters.next_label(self.numbering, &info) {
                style_map.insert("listLabel".into(), json!(label));
            }
            style_map.insert("numbering".into(), json!(info));
        }

        let b = LayoutBox {
            element_type: ElementType::Paragraph,
            content: BoxContent::Paragraph(ParagraphContent {
                text,
                lines,
                first_line_indent: indent.first_line,
            }),
            x: context.margin_left + indent.left,
            y: context.cursor_y,
            width,
            height,
            style: style_map,
        };

        context.cursor_y += height + spacing.after;
        b
    }

    /// The paragraph's list reference, re-resolved against the catalog when
    /// it arrived without formatting.
    fn numbering_for(&self, paragraph: &Paragraph) -> Option<NumberingInfo> {
        let info = paragraph.numbering.as_ref()?;
        match self.numbering {
            Some(catalog) if info.format.is_none() => Some(catalog.resolve(info.num_id, info.level)),
            _ => Some(info.clone()),
        }
    }

    /// Narrowest width the paragraph can take without splitting a word.
    pub(super) fn paragraph_min_width(&self, paragraph: &Paragraph) -> f32 {
        let style = self.paragraph_style(paragraph);
        let font_size = resolve_font_size(paragraph, style);
        let indent = resolve_indent(paragraph, style);

        let text = paragraph.text();
        let mut width = text
            .split_whitespace()
            .map(|word| estimate_text_width(word, font_size))
            .reduce(f32::max)
            .unwrap_or_else(|| estimate_text_width(&text, font_size));

        width = width.max(font_size);
        width + indent.left.max(0.0) + indent.first_line.max(0.0)
    }
}
