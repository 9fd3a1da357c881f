use std::collections::BTreeMap;

use crate::model::Image;
use crate::property::EMU_PER_POINT;

use super::{DML_NS, REL_NS, Relationships, WPD_NS};

fn wpd<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WPD_NS))
}

fn find_blip_embed<'a>(container: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    container
        .descendants()
        .find(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))
        .and_then(|n| n.attribute((REL_NS, "embed")))
}

fn emu_to_pt_string(emu: &str) -> Option<String> {
    let emu: f64 = emu.trim().parse().ok()?;
    Some(format!("{}pt", emu as f32 / EMU_PER_POINT))
}

/// Wrap keyword of an anchored drawing.
fn anchor_wrap_style(anchor: roxmltree::Node) -> &'static str {
    let behind = anchor
        .attribute("behindDoc")
        .is_some_and(|v| v == "1" || v == "true");
    let wrap = anchor.children().find(|n| {
        n.tag_name().namespace() == Some(WPD_NS) && n.tag_name().name().starts_with("wrap")
    });
    match wrap.map(|n| n.tag_name().name()) {
        Some("wrapTight") => "tight",
        Some("wrapThrough") => "through",
        Some("wrapNone") if behind => "behind",
        Some("wrapNone") => "infront",
        _ => "square",
    }
}

/// `positionH` / `positionV` of an anchor: either a `posOffset` in EMU or an
/// `align` keyword.
fn read_position(
    anchor: roxmltree::Node,
    element: &str,
    offset_key: &str,
    align_key: &str,
    relative_key: &str,
    properties: &mut BTreeMap<String, String>,
) {
    let Some(position) = wpd(anchor, element) else {
        return;
    };
    if let Some(relative_from) = position.attribute("relativeFrom") {
        properties.insert(relative_key.to_string(), relative_from.to_string());
    }
    if let Some(offset) = wpd(position, "posOffset")
        .and_then(|n| n.text())
        .and_then(emu_to_pt_string)
    {
        properties.insert(offset_key.to_string(), offset);
    } else if let Some(align) = wpd(position, "align").and_then(|n| n.text()) {
        properties.insert(align_key.to_string(), align.trim().to_string());
    }
}

/// Image block for a `w:drawing`. Drawings without an embedded picture
/// (shapes, charts, linked images) yield `None`.
pub(super) fn parse_drawing(drawing: roxmltree::Node, rels: &Relationships) -> Option<Image> {
    let container = drawing.children().find(|n| {
        n.tag_name().namespace() == Some(WPD_NS)
            && matches!(n.tag_name().name(), "inline" | "anchor")
    })?;
    let Some(embed_id) = find_blip_embed(container) else {
        log::debug!("Skipping drawing without an embedded picture");
        return None;
    };
    let anchored = container.tag_name().name() == "anchor";

    let extent = wpd(container, "extent");
    let extent_attr = |name: &str| {
        extent
            .and_then(|n| n.attribute(name))
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    let mut properties = BTreeMap::new();
    properties.insert("inline".to_string(), (!anchored).to_string());
    if anchored {
        properties.insert("wrapStyle".to_string(), anchor_wrap_style(container).to_string());
        read_position(
            container,
            "positionH",
            "offsetX",
            "relativeX",
            "relativeFromH",
            &mut properties,
        );
        read_position(
            container,
            "positionV",
            "offsetY",
            "relativeY",
            "relativeFromV",
            &mut properties,
        );
    }
    for (attr, key) in [
        ("distT", "margin_top"),
        ("distB", "margin_bottom"),
        ("distL", "margin_left"),
        ("distR", "margin_right"),
    ] {
        if let Some(value) = container.attribute(attr).and_then(emu_to_pt_string) {
            properties.insert(key.to_string(), value);
        }
    }
    if let Some(doc_pr) = wpd(container, "docPr") {
        for (attr, key) in [("descr", "description"), ("name", "name")] {
            if let Some(value) = doc_pr.attribute(attr).filter(|v| !v.is_empty()) {
                properties.insert(key.to_string(), value.to_string());
            }
        }
    }

    let media_path = match rels.resolve(embed_id) {
        Some(path) => path,
        None => {
            log::warn!("Image relationship {embed_id} not found");
            String::new()
        }
    };

    Some(Image {
        rel_id: embed_id.to_string(),
        media_path,
        width_emu: extent_attr("cx"),
        height_emu: extent_attr("cy"),
        properties,
    })
}
