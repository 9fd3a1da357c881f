mod common;

use common::*;
use docx_layout::layout::{DEFAULT_LINE_HEIGHT_PT, wrap_text};
use docx_layout::model::{
    BlockElement, DocumentTree, ElementType, LayoutModel, NumberingInfo, Paragraph, PropertyNode,
    StyleDefinition, StyleType,
};
use docx_layout::styles::StylesCatalog;
use docx_layout::LayoutEngine;

fn layout_with(styles: &StylesCatalog, blocks: Vec<BlockElement>) -> LayoutModel {
    LayoutEngine::new(styles).layout(&DocumentTree::from_blocks(blocks))
}

fn layout(blocks: Vec<BlockElement>) -> LayoutModel {
    layout_with(&StylesCatalog::default(), blocks)
}

fn font_size(model: &LayoutModel, index: usize) -> f64 {
    model.boxes[index].style["fontSize"]
        .as_f64()
        .expect("fontSize is a number")
}

#[test]
fn single_paragraph_in_default_section() {
    let model = layout(vec![text_block("Hello")]);
    assert_eq!(model.boxes.len(), 1);
    let b = &model.boxes[0];
    assert_eq!(b.element_type, ElementType::Paragraph);
    assert_approx(b.x, 72.0);
    assert_approx(b.y, 72.0);
    assert_approx(b.width, 451.0);
    assert_approx(b.height, 13.2);

    let content = b.paragraph().expect("paragraph payload");
    assert_eq!(content.text, "Hello");
    assert_eq!(content.lines, ["Hello"]);
    assert_approx(content.first_line_indent, 0.0);
}

#[test]
fn gap_between_paragraphs_is_after_plus_before() {
    let mut first = para("first");
    first.properties.push(spacing(None, Some("200")));
    let mut second = para("second");
    second.properties.push(spacing(Some("100"), None));

    let model = layout(vec![p_block(first), p_block(second)]);
    let (a, b) = (&model.boxes[0], &model.boxes[1]);
    assert_approx(b.y - (a.y + a.height), 15.0);
}

#[test]
fn paragraphs_stack_in_flow_order() {
    let model = layout((0..5).map(|i| text_block(&format!("line {i}"))).collect());
    for pair in model.boxes.windows(2) {
        assert_approx(pair[1].y, pair[0].y + pair[0].height);
    }
}

#[test]
fn wrapping_never_splits_words() {
    let text = "The quick   brown fox jumps over the lazy dog while an extraordinarily \
                longwindedword refuses to break across lines";
    let lines = wrap_text(text, 80.0, 11.0);
    assert!(lines.len() > 1);

    let words: Vec<&str> = text.split_whitespace().collect();
    let rewrapped: Vec<&str> = lines.iter().flat_map(|l| l.split(' ')).collect();
    assert_eq!(rewrapped, words);
    assert_eq!(lines.join(" "), words.join(" "));

    for line in &lines {
        let width = line.chars().count() as f32 * 11.0 * 0.5;
        assert!(width <= 80.0 || !line.contains(' '), "line too wide: {line:?}");
    }
}

#[test]
fn wrapped_paragraph_height_counts_lines() {
    // 100 four-letter words at 11pt: 5.5pt per glyph, ~2745pt of text
    let text = vec!["word"; 100].join(" ");
    let model = layout(vec![text_block(&text)]);
    let b = &model.boxes[0];
    let lines = &b.paragraph().expect("paragraph").lines;
    assert!(lines.len() >= 3);
    assert_approx(b.height, DEFAULT_LINE_HEIGHT_PT * lines.len() as f32);
}

#[test]
fn empty_paragraph_keeps_one_line() {
    let model = layout(vec![text_block("")]);
    let b = &model.boxes[0];
    assert_eq!(b.paragraph().expect("paragraph").lines, [""]);
    assert_approx(b.height, 13.2);
}

#[test]
fn large_run_sizes_are_read_as_half_points() {
    let model = layout(vec![
        p_block(Paragraph {
            runs: vec![sized_run("twelve", "24")],
            ..Default::default()
        }),
        p_block(Paragraph {
            runs: vec![sized_run("eighteen", "18")],
            ..Default::default()
        }),
    ]);
    assert_eq!(font_size(&model, 0), 12.0);
    assert_eq!(font_size(&model, 1), 18.0);
    assert_approx(model.boxes[1].height, 18.0 * 1.2);
}

#[test]
fn whole_point_sizes_above_twenty_are_halved_too() {
    // sz=24 meant as 24pt still comes out as 12pt
    let model = layout(vec![p_block(Paragraph {
        runs: vec![run("a"), sized_run("b", "24"), sized_run("c", "8")],
        ..Default::default()
    })]);
    assert_eq!(font_size(&model, 0), 12.0);
}

fn heading_styles() -> StylesCatalog {
    let mut normal = StyleDefinition::new("Normal", StyleType::Paragraph);
    normal.is_default = true;
    normal.properties.insert(
        "rPr".to_string(),
        vec![PropertyNode::new("w:sz").with_attr("w:val", "22")],
    );
    normal
        .properties
        .insert("pPr".to_string(), vec![spacing(None, Some("160"))]);

    let mut heading = StyleDefinition::new("Heading1", StyleType::Paragraph);
    heading.based_on = Some("Normal".to_string());
    heading.properties.insert(
        "rPr".to_string(),
        vec![PropertyNode::new("w:sz").with_attr("w:val", "32")],
    );
    heading
        .properties
        .insert("pPr".to_string(), vec![spacing(Some("480"), Some("0"))]);

    StylesCatalog::resolve([normal, heading])
}

#[test]
fn inherited_style_values_take_ancestor_priority() {
    let styles = heading_styles();
    let model = layout_with(
        &styles,
        vec![p_block(styled_para("Title", "Heading1")), text_block("after")],
    );

    // the merged rPr lists Normal's sz=22 before Heading1's sz=32
    assert_eq!(font_size(&model, 0), 11.0);

    // same for spacing: Normal's after=160 wins, its missing before stays 0
    let spacing = &model.boxes[0].style["spacing"];
    assert_eq!(spacing["after"].as_f64(), Some(8.0));
    assert_eq!(spacing["before"].as_f64(), Some(0.0));
    assert_approx(model.boxes[0].y, 72.0);
}

#[test]
fn direct_formatting_beats_style() {
    let styles = heading_styles();
    let mut p = styled_para("Title", "Heading1");
    p.properties.push(spacing(None, Some("400")));
    p.runs = vec![sized_run("Title", "40")];

    let model = layout_with(&styles, vec![p_block(p), text_block("next")]);
    assert_eq!(font_size(&model, 0), 20.0);
    let first = &model.boxes[0];
    assert_approx(model.boxes[1].y, first.y + first.height + 20.0);
}

#[test]
fn unstyled_paragraph_ignores_catalog_styles() {
    let styles = heading_styles();
    let model = layout_with(&styles, vec![text_block("body"), text_block("body")]);
    let first = &model.boxes[0];
    assert_approx(first.y, 72.0);
    assert_approx(model.boxes[1].y, first.y + first.height);
    assert!(!first.style.contains_key("resolved"));
}

#[test]
fn style_declared_before_its_default_parent_is_not_applied() {
    let mut heading = StyleDefinition::new("Heading1", StyleType::Paragraph);
    heading.based_on = Some("Normal".to_string());
    heading
        .properties
        .insert("pPr".to_string(), vec![spacing(Some("480"), None)]);
    let mut normal = StyleDefinition::new("Normal", StyleType::Paragraph);
    normal.is_default = true;
    let styles = StylesCatalog::resolve([heading, normal]);

    let model = layout_with(&styles, vec![text_block("Hello")]);
    assert_approx(model.boxes[0].y, 72.0);
    assert_eq!(font_size(&model, 0), 11.0);
    assert!(model.boxes[0].style["styleId"].is_null());
}

#[test]
fn unknown_style_id_falls_back_to_builtin_defaults() {
    let model = layout(vec![p_block(styled_para("x", "Missing"))]);
    assert_eq!(font_size(&model, 0), 11.0);
    assert_eq!(model.boxes[0].style["styleId"], "Missing");
}

fn line_spacing(line: &str, rule: Option<&str>) -> PropertyNode {
    let node = PropertyNode::new("w:spacing").with_attr("w:line", line);
    match rule {
        Some(rule) => node.with_attr("w:lineRule", rule),
        None => node,
    }
}

fn height_with(node: PropertyNode) -> f32 {
    let mut p = para("x");
    p.properties.push(node);
    layout(vec![p_block(p)]).boxes[0].height
}

#[test]
fn line_rules() {
    assert_approx(height_with(line_spacing("360", Some("exact"))), 18.0);
    assert_approx(height_with(line_spacing("100", Some("atLeast"))), 13.2);
    assert_approx(height_with(line_spacing("400", Some("atLeast"))), 20.0);
    assert_approx(height_with(line_spacing("480", Some("auto"))), 26.4);
    assert_approx(height_with(line_spacing("360", None)), 19.8);
}

#[test]
fn autospacing_ignores_the_twips_value() {
    let mut p = para("x");
    p.properties.push(
        spacing(Some("240"), Some("240"))
            .with_attr("w:beforeAutospacing", "1")
            .with_attr("w:afterAutospacing", "0"),
    );
    let model = layout(vec![p_block(p), text_block("y")]);
    assert_approx(model.boxes[0].y, 72.0);
    assert_approx(model.boxes[1].y, 72.0 + 13.2 + 12.0);
}

#[test]
fn indentation_narrows_the_box() {
    let mut p = para("indented");
    p.properties.push(
        PropertyNode::new("w:ind")
            .with_attr("w:left", "720")
            .with_attr("w:right", "720")
            .with_attr("w:hanging", "360"),
    );
    let model = layout(vec![p_block(p)]);
    let b = &model.boxes[0];
    assert_approx(b.x, 108.0);
    assert_approx(b.width, 451.0 - 72.0);
    assert_approx(b.paragraph().expect("paragraph").first_line_indent, -18.0);
}

#[test]
fn start_and_end_indent_aliases() {
    let mut p = para("bidi");
    p.properties.push(
        PropertyNode::new("w:ind")
            .with_attr("w:start", "1440")
            .with_attr("w:firstLine", "240"),
    );
    let b = &layout(vec![p_block(p)]).boxes[0];
    assert_approx(b.x, 144.0);
    assert_approx(b.paragraph().expect("paragraph").first_line_indent, 12.0);
}

#[test]
fn list_paragraphs_get_labels() {
    let info = NumberingInfo {
        num_id: 5,
        level: 0,
        start: Some(3),
        format: Some("decimal".to_string()),
        level_text: Some("%1.".to_string()),
        ..Default::default()
    };
    let item = |text: &str| {
        p_block(Paragraph {
            numbering: Some(info.clone()),
            ..para(text)
        })
    };
    let model = layout(vec![item("one"), item("two"), text_block("plain")]);
    assert_eq!(model.boxes[0].style["listLabel"], "3.");
    assert_eq!(model.boxes[1].style["listLabel"], "4.");
    assert_eq!(model.boxes[0].style["numbering"]["numId"], 5);
    assert!(!model.boxes[2].style.contains_key("listLabel"));
    // the label does not change the text or geometry
    assert_eq!(model.boxes[0].paragraph().expect("paragraph").text, "one");
    assert_approx(model.boxes[0].height, 13.2);
}
