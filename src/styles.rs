use std::collections::HashMap;

use crate::model::{StyleDefinition, StyleType};

/// Flattened, read-only set of styles. Iteration follows declaration order.
#[derive(Clone, Debug, Default)]
pub struct StylesCatalog {
    styles: Vec<StyleDefinition>,
    index: HashMap<String, usize>,
}

impl StylesCatalog {
    /// Resolve `basedOn` chains of the raw styles into a catalog.
    ///
    /// A later declaration of an already seen id replaces the earlier one but
    /// keeps its position. Cycles are broken: a style whose resolution is
    /// already in progress is used unresolved.
    pub fn resolve(raw: impl IntoIterator<Item = StyleDefinition>) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut raw_by_id: HashMap<String, StyleDefinition> = HashMap::new();
        for style in raw {
            if !raw_by_id.contains_key(&style.style_id) {
                order.push(style.style_id.clone());
            }
            raw_by_id.insert(style.style_id.clone(), style);
        }

        let mut resolved: HashMap<String, StyleDefinition> = HashMap::new();
        let mut in_progress: Vec<String> = Vec::new();
        for id in &order {
            resolve_style(id, &raw_by_id, &mut resolved, &mut in_progress);
        }

        let mut styles = Vec::with_capacity(order.len());
        let mut index = HashMap::with_capacity(order.len());
        for id in order {
            if let Some(style) = resolved.remove(&id) {
                index.insert(id, styles.len());
                styles.push(style);
            }
        }
        log::debug!("Resolved {} styles", styles.len());
        StylesCatalog { styles, index }
    }

    pub fn get(&self, style_id: &str) -> Option<&StyleDefinition> {
        self.index.get(style_id).map(|&i| &self.styles[i])
    }

    /// First style of `style_type` flagged as default.
    pub fn default_for(&self, style_type: StyleType) -> Option<&StyleDefinition> {
        self.styles
            .iter()
            .find(|s| s.style_type == style_type && s.is_default)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDefinition> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn resolve_style(
    style_id: &str,
    raw: &HashMap<String, StyleDefinition>,
    resolved: &mut HashMap<String, StyleDefinition>,
    in_progress: &mut Vec<String>,
) -> Option<StyleDefinition> {
    if let Some(done) = resolved.get(style_id) {
        return Some(done.clone());
    }
    let style = raw.get(style_id)?;
    if in_progress.iter().any(|id| id == style_id) {
        log::warn!("Style inheritance cycle through '{style_id}'");
        return Some(style.clone());
    }

    in_progress.push(style_id.to_string());
    let parent = style
        .based_on
        .as_deref()
        .filter(|parent_id| raw.contains_key(*parent_id))
        .and_then(|parent_id| resolve_style(parent_id, raw, resolved, in_progress));
    in_progress.pop();

    let merged = match parent {
        Some(parent) => merge_with_parent(style, &parent),
        None => style.clone(),
    };
    resolved.insert(style_id.to_string(), merged.clone());
    Some(merged)
}

/// Parent blocks come first, the style's own entries are appended after.
fn merge_with_parent(style: &StyleDefinition, parent: &StyleDefinition) -> StyleDefinition {
    let mut properties = parent.properties.clone();
    for (block, nodes) in &style.properties {
        properties
            .entry(block.clone())
            .or_default()
            .extend(nodes.iter().cloned());
    }

    StyleDefinition {
        style_id: style.style_id.clone(),
        style_type: style.style_type,
        name: style.name.clone(),
        based_on: style.based_on.clone(),
        next_style: style.next_style.clone(),
        linked_style: style
            .linked_style
            .clone()
            .or_else(|| parent.linked_style.clone()),
        is_default: style.is_default || parent.is_default,
        ui_priority: style.ui_priority.or(parent.ui_priority),
        is_primary: style.is_primary || parent.is_primary,
        aliases: style.aliases.clone().or_else(|| parent.aliases.clone()),
        properties,
    }
}
