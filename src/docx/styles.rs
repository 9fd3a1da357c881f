use crate::model::{StyleDefinition, StyleType};

use super::{WML_NS, property_block, property_node, wml, wml_attr, wml_children};

/// Property blocks copied from a `w:style` element, keyed by local name.
const STYLE_BLOCKS: [&str; 4] = ["rPr", "pPr", "tblPr", "numPr"];

/// Raw (unresolved) style definitions of `styles.xml`, in declaration order.
/// Styles without a `w:styleId` are skipped.
pub(super) fn parse_styles(xml_content: &str) -> Vec<StyleDefinition> {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("word/styles.xml is not well-formed, continuing without styles");
        return Vec::new();
    };
    let root = xml.root_element();

    let mut styles = Vec::new();
    for style_node in wml_children(root, "style") {
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };
        let mut style = StyleDefinition::new(
            style_id,
            StyleType::from_attr(style_node.attribute((WML_NS, "type"))),
        );
        style.name = wml_attr(style_node, "name").map(str::to_string);
        style.based_on = wml_attr(style_node, "basedOn").map(str::to_string);
        style.next_style = wml_attr(style_node, "next").map(str::to_string);
        style.linked_style = wml_attr(style_node, "link").map(str::to_string);
        style.aliases = wml_attr(style_node, "alias").map(str::to_string);
        style.ui_priority = wml_attr(style_node, "uiPriority").and_then(|v| v.parse().ok());
        style.is_default = style_node.attribute((WML_NS, "default")) == Some("1");
        style.is_primary = wml(style_node, "qFormat").is_some();

        for block in STYLE_BLOCKS {
            if let Some(node) = wml(style_node, block) {
                style.properties.insert(block.to_string(), property_block(node));
            }
        }
        // one entry per conditional format, each keeping its w:type
        let conditional: Vec<_> = wml_children(style_node, "tblStylePr")
            .map(property_node)
            .collect();
        if !conditional.is_empty() {
            style.properties.insert("tblStylePr".to_string(), conditional);
        }

        styles.push(style);
    }
    log::debug!("Parsed {} style definitions", styles.len());
    styles
}
