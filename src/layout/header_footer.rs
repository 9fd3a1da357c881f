use serde_json::json;

use super::{DEFAULT_LINE_HEIGHT_PT, LayoutContext, LayoutPass};
use crate::model::{
    BoxContent, ElementType, HeaderFooterBoxContent, HeaderFooterContent, LayoutBox,
    SectionProperties, StyleMap,
};

/// Default variant, else first-page, else even-page.
pub(super) fn select_header(props: &SectionProperties) -> Option<&HeaderFooterContent> {
    props
        .header_default
        .as_ref()
        .or(props.header_first.as_ref())
        .or(props.header_even.as_ref())
}

pub(super) fn select_footer(props: &SectionProperties) -> Option<&HeaderFooterContent> {
    props
        .footer_default
        .as_ref()
        .or(props.footer_first.as_ref())
        .or(props.footer_even.as_ref())
}

/// Provisional header top: the header margin (or half the top margin), kept
/// at least one line above the body.
fn header_start(context: &LayoutContext) -> f32 {
    let default_start = if context.margin_top > 0.0 {
        context.margin_top * 0.5
    } else {
        0.0
    };
    let mut desired = if context.header_margin > 0.0 {
        context.header_margin
    } else {
        default_start
    };
    let max_within_margin = (context.margin_top - DEFAULT_LINE_HEIGHT_PT).max(0.0);
    if max_within_margin > 0.0 {
        desired = desired.min(max_within_margin);
    }
    desired.max(0.0)
}

fn header_top(context: &LayoutContext, start: f32, height: f32) -> f32 {
    let top_limit = (context.margin_top - height).max(0.0);
    if top_limit > 0.0 {
        start.min(top_limit)
    } else {
        start.max(0.0)
    }
}

fn footer_target_margin(context: &LayoutContext) -> f32 {
    if context.footer_margin > 0.0 {
        context.footer_margin
    } else {
        context.margin_bottom
    }
}

fn footer_start(context: &LayoutContext) -> f32 {
    (context.page_height - footer_target_margin(context)).max(0.0)
}

/// Footer top so that its bottom sits on the footer margin, clamped between
/// the top margin and the bottom margin line.
fn footer_top(context: &LayoutContext, height: f32) -> f32 {
    let desired = context.page_height - footer_target_margin(context) - height;
    let min_top = context.margin_top;
    let max_top = context.page_height - context.margin_bottom;
    if desired < min_top {
        min_top
    } else if desired > max_top {
        max_top
    } else {
        desired
    }
}

impl LayoutPass<'_> {
    /// Measure the content in a scratch context, then move it to its final
    /// position. Empty content produces no box.
    pub(super) fn layout_header_footer(
        &mut self,
        content: &HeaderFooterContent,
        base: &LayoutContext,
        placement: ElementType,
    ) -> Option<LayoutBox> {
        if content.blocks.is_empty() {
            return None;
        }
        let start = match placement {
            ElementType::Header => header_start(base),
            ElementType::Footer => footer_start(base),
            _ => return None,
        };

        let mut scratch = LayoutContext {
            cursor_x: base.margin_left,
            cursor_y: start,
            ..base.clone()
        };
        let mut children: Vec<LayoutBox> = content
            .blocks
            .iter()
            .map(|block| self.layout_block(block, &mut scratch))
            .collect();
        let height = (scratch.cursor_y - start).max(0.0);

        let top = match placement {
            ElementType::Header => header_top(base, start, height),
            _ => footer_top(base, height),
        };
        let offset = top - start;
        if offset != 0.0 {
            for child in &mut children {
                child.translate_y(offset);
            }
        }
        log::debug!(
            "{:?} {} placed at y={:.1} (height {:.1}, shifted {:.1})",
            placement,
            content.rel_id,
            top,
            height,
            offset
        );

        let kind = match placement {
            ElementType::Header => "header",
            _ => "footer",
        };
        let mut style = StyleMap::new();
        style.insert("type".into(), json!(kind));
        style.insert("rId".into(), json!(content.rel_id));

        Some(LayoutBox {
            element_type: placement,
            content: BoxContent::HeaderFooter(HeaderFooterBoxContent {
                boxes: children,
                relationship_id: content.rel_id.clone(),
            }),
            x: base.margin_left,
            y: top,
            width: base.available_width(),
            height,
            style,
        })
    }
}
