use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use super::LayoutContext;
use crate::model::{BoxContent, Edges, ElementType, Image, ImageContent, LayoutBox, StyleMap};
use crate::property::{coerce_measurement, emu_to_points};

/// Fallback width of an image with no extent and no room to fill.
const FALLBACK_IMAGE_WIDTH_PT: f32 = 96.0;

/// How a floating image interacts with the text flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WrapMode {
    #[serde(rename = "inline")]
    Inline,
    #[serde(rename = "square")]
    Square,
    #[serde(rename = "tight")]
    Tight,
    #[serde(rename = "through")]
    Through,
    #[serde(rename = "behind-text")]
    BehindText,
    #[serde(rename = "infront-of-text")]
    InFrontOfText,
}

impl WrapMode {
    /// Normalise a free-form wrap value. Unknown values are inline.
    pub fn from_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "square" => WrapMode::Square,
            "tight" => WrapMode::Tight,
            "through" => WrapMode::Through,
            "behind" | "behindtext" | "behind-text" => WrapMode::BehindText,
            "infront" | "infronttext" | "infront-text" | "infront-of-text" | "front" => {
                WrapMode::InFrontOfText
            }
            _ => WrapMode::Inline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WrapMode::Inline => "inline",
            WrapMode::Square => "square",
            WrapMode::Tight => "tight",
            WrapMode::Through => "through",
            WrapMode::BehindText => "behind-text",
            WrapMode::InFrontOfText => "infront-of-text",
        }
    }

    /// Floats drawn over or under the text leave the cursor alone.
    fn pushes_text(&self) -> bool {
        !matches!(self, WrapMode::BehindText | WrapMode::InFrontOfText)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Anchor {
    anchored: bool,
    offset_x: Option<f32>,
    offset_y: Option<f32>,
    relative_x: Option<String>,
    relative_y: Option<String>,
}

/// First non-empty value among `keys`, in key order.
fn first_value<'a>(properties: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| properties.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

fn wrap_mode(image: &Image) -> WrapMode {
    first_value(
        &image.properties,
        &["wrapStyle", "wrap_style", "wrap", "positioning"],
    )
    .map(WrapMode::from_value)
    .unwrap_or(WrapMode::Inline)
}

fn resolve_anchor(image: &Image) -> Anchor {
    let props = &image.properties;
    let offset_x = first_value(props, &["offset_x", "offsetX", "x", "left"])
        .and_then(coerce_measurement);
    let offset_y = first_value(props, &["offset_y", "offsetY", "y", "top"])
        .and_then(coerce_measurement);
    let explicitly_floating = props
        .get("inline")
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0"));

    Anchor {
        anchored: explicitly_floating || offset_x.is_some() || offset_y.is_some(),
        offset_x,
        offset_y,
        relative_x: first_value(props, &["relative_x", "relativeX", "align"]).map(str::to_string),
        relative_y: first_value(props, &["relative_y", "relativeY"]).map(str::to_string),
    }
}

pub(super) fn image_margins(image: &Image) -> Edges {
    let margin = |key: &str| {
        image
            .properties
            .get(key)
            .and_then(|v| coerce_measurement(v))
            .unwrap_or(0.0)
    };
    Edges {
        top: margin("margin_top"),
        bottom: margin("margin_bottom"),
        left: margin("margin_left"),
        right: margin("margin_right"),
    }
}

/// Position along one axis: an explicit offset wins, then an alignment
/// keyword inside `extent`, then the origin.
fn anchor_coordinate(
    offset: Option<f32>,
    origin: f32,
    extent: f32,
    size: f32,
    relative: Option<&str>,
) -> f32 {
    if let Some(offset) = offset {
        return origin + offset;
    }
    match relative.map(str::to_ascii_lowercase).as_deref() {
        Some("center" | "centre" | "middle") => origin + ((extent - size) / 2.0).max(0.0),
        Some("right" | "end" | "bottom") => origin + (extent - size).max(0.0),
        _ => origin,
    }
}

pub(super) fn layout_image(image: &Image, context: &mut LayoutContext) -> LayoutBox {
    let wrap = wrap_mode(image);
    let anchor = resolve_anchor(image);
    let margins = image_margins(image);
    let floating = wrap != WrapMode::Inline || anchor.anchored;

    if !floating {
        context.cursor_y += margins.top;
    }

    let limit_width = (context.available_width() - margins.horizontal()).max(0.0);
    let mut width = match image.width_emu {
        Some(emu) if emu > 0 => emu_to_points(emu),
        _ if limit_width > 0.0 => limit_width,
        _ => FALLBACK_IMAGE_WIDTH_PT,
    };
    let mut height = match image.height_emu {
        Some(emu) if emu > 0 => emu_to_points(emu),
        _ => width * 0.75,
    };
    if limit_width > 0.0 && width > limit_width {
        height *= limit_width / width;
        width = limit_width;
    }

    let (x, y) = if floating {
        let x = anchor_coordinate(
            anchor.offset_x,
            context.margin_left + margins.left,
            context.available_width() - margins.horizontal(),
            width,
            anchor.relative_x.as_deref(),
        );
        let y = anchor_coordinate(
            anchor.offset_y,
            context.margin_top + margins.top,
            context.page_height - context.margin_top - context.margin_bottom,
            height,
            anchor.relative_y.as_deref(),
        );
        (x, y)
    } else {
        (context.margin_left + margins.left, context.cursor_y)
    };

    if !floating {
        context.cursor_y += height + margins.bottom;
    } else if wrap.pushes_text() {
        context.cursor_y = context.cursor_y.max(y + height + margins.bottom);
    }

    let mut style = StyleMap::new();
    style.insert("wrapStyle".into(), json!(wrap.as_str()));
    style.insert("inline".into(), json!(!floating));
    style.insert("anchor".into(), json!(anchor));
    style.insert("properties".into(), json!(image.properties));
    style.insert("margins".into(), json!(margins));

    LayoutBox {
        element_type: ElementType::Image,
        content: BoxContent::Image(ImageContent {
            source: image.media_path.clone(),
            resource_id: image.rel_id.clone(),
        }),
        x,
        y,
        width,
        height,
        style,
    }
}
