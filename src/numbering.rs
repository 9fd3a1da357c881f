use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{NumberingInfo, PropertyNode};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberingLevel {
    pub level: u32,
    pub start: Option<u32>,
    pub format: Option<String>,
    pub level_text: Option<String>,
    pub alignment: Option<String>,
    pub is_legal: bool,
    pub paragraph_properties: Vec<PropertyNode>,
    pub run_properties: Vec<PropertyNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstractNumberingDefinition {
    pub abstract_id: u32,
    pub multi_level_type: Option<String>,
    pub name: Option<String>,
    pub style_link: Option<String>,
    pub levels: BTreeMap<u32, NumberingLevel>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberingOverride {
    pub level: u32,
    pub start_override: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberingInstance {
    pub num_id: u32,
    pub abstract_id: u32,
    pub overrides: BTreeMap<u32, NumberingOverride>,
}

#[derive(Clone, Debug, Default)]
pub struct NumberingCatalog {
    abstracts: HashMap<u32, AbstractNumberingDefinition>,
    instances: HashMap<u32, NumberingInstance>,
}

impl NumberingCatalog {
    pub fn new(
        abstracts: impl IntoIterator<Item = AbstractNumberingDefinition>,
        instances: impl IntoIterator<Item = NumberingInstance>,
    ) -> Self {
        NumberingCatalog {
            abstracts: abstracts.into_iter().map(|a| (a.abstract_id, a)).collect(),
            instances: instances.into_iter().map(|i| (i.num_id, i)).collect(),
        }
    }

    pub fn abstract_definition(&self, abstract_id: u32) -> Option<&AbstractNumberingDefinition> {
        self.abstracts.get(&abstract_id)
    }

    pub fn instance(&self, num_id: u32) -> Option<&NumberingInstance> {
        self.instances.get(&num_id)
    }

    pub fn is_empty(&self) -> bool {
        self.abstracts.is_empty() && self.instances.is_empty()
    }

    /// Concrete formatting of `level` in list `num_id`.
    ///
    /// An unknown instance yields only the ids; an unknown abstract definition
    /// or level additionally carries the abstract id. A start override on the
    /// instance replaces the level's own start.
    pub fn resolve(&self, num_id: u32, level: u32) -> NumberingInfo {
        let mut info = NumberingInfo {
            num_id,
            level,
            ..Default::default()
        };
        let Some(instance) = self.instances.get(&num_id) else {
            return info;
        };
        info.abstract_id = Some(instance.abstract_id);
        let Some(def) = self
            .abstracts
            .get(&instance.abstract_id)
            .and_then(|a| a.levels.get(&level))
        else {
            return info;
        };

        let start_override = instance
            .overrides
            .get(&level)
            .and_then(|o| o.start_override);
        info.start = start_override.or(def.start);
        info.format = def.format.clone();
        info.level_text = def.level_text.clone();
        info.alignment = def.alignment.clone();
        info
    }
}

/// Running list counters of one layout pass.
#[derive(Debug, Default)]
pub struct ListCounters {
    counters: HashMap<(u32, u32), u32>,
    last_seen_level: HashMap<u32, u32>,
}

impl ListCounters {
    /// Advance the counter for `info` and return the rendered label, e.g.
    /// `"2.1."` or a bullet character. `None` when the reference has no
    /// resolved format or `numId` is 0.
    pub fn next_label(
        &mut self,
        catalog: Option<&NumberingCatalog>,
        info: &NumberingInfo,
    ) -> Option<String> {
        if info.num_id == 0 {
            return None;
        }
        let num_fmt = info.format.as_deref()?;
        let num_id = info.num_id;
        let ilvl = info.level;

        // Returning to a shallower level restarts the deeper ones
        if let Some(prev) = self.last_seen_level.get(&num_id).copied()
            && ilvl <= prev
        {
            for deeper in (ilvl + 1)..=prev {
                self.counters.remove(&(num_id, deeper));
            }
        }
        self.last_seen_level.insert(num_id, ilvl);

        let current = *self
            .counters
            .entry((num_id, ilvl))
            .and_modify(|c| *c += 1)
            .or_insert(info.start.unwrap_or(1));

        let lvl_text = info.level_text.as_deref().unwrap_or("");
        if num_fmt == "bullet" {
            let text = normalize_bullet_text(lvl_text);
            return Some(if text.is_empty() { "\u{2022}".to_string() } else { text });
        }

        let mut label = lvl_text.to_string();
        for lvl_idx in 0..9u32 {
            let placeholder = format!("%{}", lvl_idx + 1);
            if !label.contains(&placeholder) {
                continue;
            }
            let (value, fmt) = if lvl_idx == ilvl {
                (current, num_fmt.to_string())
            } else {
                let other = catalog
                    .map(|c| c.resolve(num_id, lvl_idx))
                    .unwrap_or_default();
                let value = self
                    .counters
                    .get(&(num_id, lvl_idx))
                    .copied()
                    .unwrap_or(other.start.unwrap_or(1));
                (value, other.format.unwrap_or_else(|| "decimal".to_string()))
            };
            label = label.replace(&placeholder, &format_number(value, &fmt));
        }
        Some(label)
    }
}

fn to_roman(mut n: u32) -> String {
    const TABLE: &[(u32, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut result = String::new();
    for &(value, numeral) in TABLE {
        while n >= value {
            result.push_str(numeral);
            n -= value;
        }
    }
    result
}

fn to_letters(value: u32, base: u8) -> String {
    if value == 0 {
        return String::new();
    }
    let mut n = value - 1;
    let mut result = String::new();
    loop {
        result.insert(0, (base + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

pub fn format_number(value: u32, num_fmt: &str) -> String {
    match num_fmt {
        "decimal" => value.to_string(),
        "decimalZero" => format!("{value:02}"),
        "lowerLetter" => to_letters(value, b'a'),
        "upperLetter" => to_letters(value, b'A'),
        "lowerRoman" => to_roman(value),
        "upperRoman" => to_roman(value).to_uppercase(),
        "none" => String::new(),
        _ => value.to_string(),
    }
}

fn normalize_bullet_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if (0xF000..=0xF0FF).contains(&cp) {
                symbol_pua_to_unicode(cp).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

fn symbol_pua_to_unicode(cp: u32) -> Option<char> {
    let sym = cp - 0xF000;
    let mapped = match sym {
        0xB7 => '\u{2022}', // •
        0xA7 => '\u{25A0}', // ■
        0xA8 => '\u{25CB}', // ○
        0xD8 => '\u{2666}', // ◆
        0x76 => '\u{221A}', // √
        _ => return char::from_u32(sym),
    };
    Some(mapped)
}
