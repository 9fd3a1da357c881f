//! Suffix-matching accessors over [`PropertyNode`] lists.
//!
//! Property tags keep whatever namespace prefix the source used (`w:sz`,
//! `{ns}sz`, `sz`), so every lookup here compares on the tag/attribute
//! suffix rather than on the full qualified name.

use crate::model::PropertyNode;

pub const TWIPS_PER_POINT: f32 = 20.0;
pub const EMU_PER_POINT: f32 = 12_700.0;

impl PropertyNode {
    pub fn new(tag: impl Into<String>) -> Self {
        PropertyNode {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: PropertyNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    /// True when the tag ends with `suffix` (`w:szCs` matches both `szCs`
    /// and `Cs`).
    pub fn matches(&self, suffix: &str) -> bool {
        self.tag.ends_with(suffix)
    }

    /// First attribute whose key ends with `suffix`.
    pub fn attr(&self, suffix: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.ends_with(suffix))
            .map(|(_, value)| value.as_str())
    }

    pub fn int_attr(&self, suffix: &str) -> Option<i64> {
        self.attr(suffix)?.trim().parse().ok()
    }

    pub fn float_attr(&self, suffix: &str) -> Option<f32> {
        self.attr(suffix)?.trim().parse().ok()
    }

    pub fn twips_attr(&self, suffix: &str) -> Option<f32> {
        self.float_attr(suffix).map(twips_to_points)
    }

    /// OOXML on/off attribute (`1`, `true`, `on`).
    pub fn flag_attr(&self, suffix: &str) -> bool {
        self.attr(suffix).is_some_and(is_truthy)
    }

    pub fn child(&self, suffix: &str) -> Option<&PropertyNode> {
        self.children.iter().find(|c| c.matches(suffix))
    }
}

/// First node of `nodes` whose tag ends with `suffix`. Only the given level
/// is searched.
pub fn find_node<'a>(nodes: &'a [PropertyNode], suffix: &str) -> Option<&'a PropertyNode> {
    nodes.iter().find(|n| n.matches(suffix))
}

pub fn local_name(qualified: &str) -> &str {
    let after_ns = qualified.rsplit('}').next().unwrap_or(qualified);
    after_ns.rsplit(':').next().unwrap_or(after_ns)
}

pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on")
}

pub fn twips_to_points(twips: f32) -> f32 {
    twips / TWIPS_PER_POINT
}

pub fn emu_to_points(emu: u64) -> f32 {
    emu as f32 / EMU_PER_POINT
}

/// Parse a free-form length into points.
///
/// Accepts `pt`, `in`, `cm`, `mm` and `px` suffixes. A bare number above
/// 1000 is taken to be twips.
pub fn coerce_measurement(value: &str) -> Option<f32> {
    let text = value.trim().to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }
    const UNITS: [(&str, f32); 5] = [
        ("pt", 1.0),
        ("in", 72.0),
        ("cm", 28.3465),
        ("mm", 2.83465),
        ("px", 0.75),
    ];
    for (suffix, factor) in UNITS {
        if let Some(number) = text.strip_suffix(suffix) {
            return number.trim().parse::<f32>().ok().map(|n| n * factor);
        }
    }
    let number: f32 = text.parse().ok()?;
    if number > 1000.0 {
        Some(twips_to_points(number))
    } else {
        Some(number)
    }
}
