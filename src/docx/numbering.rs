use std::collections::BTreeMap;

use crate::numbering::{
    AbstractNumberingDefinition, NumberingCatalog, NumberingInstance, NumberingLevel,
    NumberingOverride,
};

use super::{WML_NS, property_block, wml, wml_attr, wml_children};

fn int_attr(node: roxmltree::Node, name: &str) -> Option<u32> {
    node.attribute((WML_NS, name))
        .and_then(|v| v.trim().parse().ok())
}

fn int_val(node: roxmltree::Node, child: &str) -> Option<u32> {
    wml_attr(node, child).and_then(|v| v.trim().parse().ok())
}

fn parse_level(lvl: roxmltree::Node) -> Option<NumberingLevel> {
    let level = int_attr(lvl, "ilvl")?;
    Some(NumberingLevel {
        level,
        start: int_val(lvl, "start"),
        format: wml_attr(lvl, "numFmt").map(str::to_string),
        level_text: wml_attr(lvl, "lvlText").map(str::to_string),
        alignment: wml_attr(lvl, "lvlJc").map(str::to_string),
        is_legal: wml(lvl, "isLgl")
            .is_some_and(|n| n.attribute((WML_NS, "val")).is_none_or(|v| v != "0")),
        paragraph_properties: wml(lvl, "pPr").map(property_block).unwrap_or_default(),
        run_properties: wml(lvl, "rPr").map(property_block).unwrap_or_default(),
    })
}

fn parse_abstract(node: roxmltree::Node) -> Option<AbstractNumberingDefinition> {
    let abstract_id = int_attr(node, "abstractNumId")?;
    let levels: BTreeMap<u32, NumberingLevel> = wml_children(node, "lvl")
        .filter_map(parse_level)
        .map(|l| (l.level, l))
        .collect();
    Some(AbstractNumberingDefinition {
        abstract_id,
        multi_level_type: wml_attr(node, "multiLevelType").map(str::to_string),
        name: wml_attr(node, "name").map(str::to_string),
        style_link: wml_attr(node, "styleLink").map(str::to_string),
        levels,
    })
}

fn parse_instance(node: roxmltree::Node) -> Option<NumberingInstance> {
    let num_id = int_attr(node, "numId")?;
    let abstract_id = int_val(node, "abstractNumId")?;
    let overrides = wml_children(node, "lvlOverride")
        .filter_map(|o| {
            let level = int_attr(o, "ilvl")?;
            Some((
                level,
                NumberingOverride {
                    level,
                    start_override: int_val(o, "startOverride"),
                },
            ))
        })
        .collect();
    Some(NumberingInstance {
        num_id,
        abstract_id,
        overrides,
    })
}

/// Abstract definitions and instances of `numbering.xml`. Entries missing
/// their ids are skipped.
pub(super) fn parse_numbering(xml_content: &str) -> NumberingCatalog {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("word/numbering.xml is not well-formed, continuing without lists");
        return NumberingCatalog::default();
    };
    let root = xml.root_element();

    let abstracts: Vec<_> = wml_children(root, "abstractNum")
        .filter_map(parse_abstract)
        .collect();
    let instances: Vec<_> = wml_children(root, "num").filter_map(parse_instance).collect();
    log::debug!(
        "Parsed {} abstract numbering definitions, {} instances",
        abstracts.len(),
        instances.len()
    );
    NumberingCatalog::new(abstracts, instances)
}
