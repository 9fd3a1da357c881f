mod common;

use common::*;
use docx_layout::model::{DocumentSection, DocumentTree, SectionProperties};
use docx_layout::{LayoutContext, LayoutEngine, StylesCatalog};

#[test]
fn defaults_are_a4_with_one_inch_margins() {
    let ctx = LayoutContext::for_section(&SectionProperties::default());
    assert_approx(ctx.page_width, 595.0);
    assert_approx(ctx.page_height, 842.0);
    for margin in [ctx.margin_left, ctx.margin_right, ctx.margin_top, ctx.margin_bottom] {
        assert_approx(margin, 72.0);
    }
    assert_approx(ctx.cursor_x, 72.0);
    assert_approx(ctx.cursor_y, 72.0);
    assert_approx(ctx.header_margin, 0.0);
    assert_approx(ctx.available_width(), 451.0);
}

#[test]
fn twips_are_converted_to_points() {
    let ctx = LayoutContext::for_section(&SectionProperties {
        page_width: Some(12240.0),
        page_height: Some(15840.0),
        margin_left: Some(1800.0),
        margin_right: Some(1800.0),
        margin_top: Some(1440.0),
        margin_bottom: Some(720.0),
        header_margin: Some(708.0),
        footer_margin: Some(708.0),
        ..Default::default()
    });
    assert_approx(ctx.page_width, 612.0);
    assert_approx(ctx.page_height, 792.0);
    assert_approx(ctx.margin_left, 90.0);
    assert_approx(ctx.margin_bottom, 36.0);
    assert_approx(ctx.header_margin, 35.4);
    assert_approx(ctx.available_width(), 432.0);
    assert_approx(ctx.cursor_x, 90.0);
}

#[test]
fn landscape_swaps_portrait_dimensions() {
    let props = SectionProperties {
        page_width: Some(12240.0),
        page_height: Some(15840.0),
        orientation: Some("Landscape".to_string()),
        ..Default::default()
    };
    let ctx = LayoutContext::for_section(&props);
    assert_approx(ctx.page_width, 792.0);
    assert_approx(ctx.page_height, 612.0);

    // already wide pages are left alone
    let ctx = LayoutContext::for_section(&SectionProperties {
        page_width: Some(15840.0),
        page_height: Some(12240.0),
        ..props
    });
    assert_approx(ctx.page_width, 792.0);
}

#[test]
fn available_width_is_not_clamped() {
    let ctx = LayoutContext::for_section(&SectionProperties {
        margin_left: Some(7000.0),
        margin_right: Some(7000.0),
        ..Default::default()
    });
    assert!(ctx.available_width() < 0.0);
}

#[test]
fn each_section_gets_its_own_page_group() {
    let tree = DocumentTree {
        sections: vec![
            DocumentSection {
                blocks: vec![text_block("portrait")],
                properties: SectionProperties::default(),
            },
            DocumentSection {
                blocks: vec![text_block("one"), text_block("two")],
                properties: SectionProperties {
                    page_width: Some(12240.0),
                    page_height: Some(15840.0),
                    orientation: Some("landscape".to_string()),
                    margin_top: Some(720.0),
                    ..Default::default()
                },
            },
        ],
    };
    let model = LayoutEngine::new(&StylesCatalog::default()).layout(&tree);

    assert_eq!(model.pages.len(), 2);
    assert_eq!(model.pages[0].box_range, 0..1);
    assert_eq!(model.pages[1].box_range, 1..3);
    assert_approx(model.pages[1].page_width, 792.0);
    assert_approx(model.pages[1].page_height, 612.0);

    // the second section restarts at its own top margin
    let second = model.section_boxes(1).expect("second section");
    assert_approx(second[0].y, 36.0);
    assert_approx(second[1].y, 36.0 + 13.2);
    assert_approx(second[0].width, 792.0 - 144.0);

    assert_eq!(model.sections().count(), 2);
    assert!(model.section_boxes(2).is_none());
}

#[test]
fn empty_document_has_one_empty_group() {
    let model = LayoutEngine::new(&StylesCatalog::default()).layout(&DocumentTree::from_blocks(Vec::new()));
    assert!(model.boxes.is_empty());
    assert_eq!(model.pages.len(), 1);
    assert!(model.pages[0].box_range.is_empty());
}
