//! Infobox tokenizer and the value conversions used by the field mappings.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref INT_PATTERN: Regex = Regex::new(r"[+-]?\d+").unwrap();
    static ref FLOAT_PATTERN: Regex = Regex::new(r"[+-]?(?:\d*\.)?\d+").unwrap();
    static ref MIN_MAX_PATTERN: Regex = Regex::new(r"(\d+)-(\d+)").unwrap();
    static ref LOOT_PATTERN: Regex =
        Regex::new(r"\|\{\{Loot Item\|(?:([\d?+-]+)\|)?([^}|]+)").unwrap();
    static ref WALKS_PATTERN: Regex =
        Regex::new(r"(physical|holy|death|fire|ice|energy|earth|poison)(,|$)").unwrap();
    static ref FILE_PREFIX: Regex = Regex::new(r"(?i)(file|image):").unwrap();
    static ref TEMPLATE: Regex = Regex::new(r"\{\{[^{}]*\}\}").unwrap();
    static ref WIKILINK: Regex = Regex::new(r"\[\[(?:[^\[\]|]*\|)*([^\[\]|]*)\]\]").unwrap();
    static ref EXTERNAL_LINK: Regex =
        Regex::new(r"\[[a-z]+://[^\s\]]+(?:\s+([^\]]*))?\]").unwrap();
}

/// Extract the `key=value` attributes of an infobox template.
///
/// The scan tracks bracket depth: the template's own braces bring it to depth 2,
/// where `=` switches from key to value and `|` ends a pair. Anything nested
/// deeper (links, inner templates) is copied verbatim into the current key or
/// value. A pair is committed on `|` or when the depth closes back to 1, so an
/// unterminated trailing pair is lost. Keys and values are trimmed and pairs
/// with empty values are dropped.
pub fn parse_attributes(content: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut depth = 0usize;
    let mut parse_value = false;
    let mut attribute = String::new();
    let mut value = String::new();

    fn commit(
        attributes: &mut HashMap<String, String>,
        attribute: &mut String,
        value: &mut String,
    ) {
        attributes.insert(attribute.trim().to_string(), value.trim().to_string());
        attribute.clear();
        value.clear();
    }

    for c in content.chars() {
        match c {
            '{' | '[' => {
                depth += 1;
                if depth >= 3 {
                    if parse_value {
                        value.push(c)
                    } else {
                        attribute.push(c)
                    }
                }
            }
            '}' | ']' => {
                if depth >= 3 {
                    if parse_value {
                        value.push(c)
                    } else {
                        attribute.push(c)
                    }
                }
                if depth == 2 {
                    commit(&mut attributes, &mut attribute, &mut value);
                    parse_value = false;
                }
                depth = depth.saturating_sub(1);
            }
            '=' if depth == 2 => parse_value = true,
            '|' if depth == 2 => {
                commit(&mut attributes, &mut attribute, &mut value);
                parse_value = false;
            }
            _ if parse_value => value.push(c),
            _ => attribute.push(c),
        }
    }

    attributes.retain(|_, v| !v.is_empty());
    attributes
}

/// First integer found in the string, ignoring thousands separators.
pub fn parse_integer(value: &str) -> Option<i64> {
    let cleaned = value.replace(',', "");
    let parsed = INT_PATTERN
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok());
    if parsed.is_none() {
        tracing::debug!("No integer found in {:?}", value);
    }
    parsed
}

/// Highest integer found in the string.
pub fn parse_maximum_integer(value: &str) -> Option<i64> {
    let cleaned = value.replace(',', "");
    let parsed = INT_PATTERN
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().parse::<i64>().ok())
        .max();
    if parsed.is_none() {
        tracing::debug!("No integer found in {:?}", value);
    }
    parsed
}

/// First decimal number found in the string.
pub fn parse_float(value: &str) -> Option<f64> {
    let cleaned = value.replace(',', "");
    let parsed = FLOAT_PATTERN
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok());
    if parsed.is_none() {
        tracing::debug!("No number found in {:?}", value);
    }
    parsed
}

/// `true` for "yes" in any case, `default` for a blank value, `false` otherwise.
pub fn parse_boolean(value: &str, default: bool) -> bool {
    let value = value.trim();
    if value.is_empty() {
        default
    } else {
        value.eq_ignore_ascii_case("yes")
    }
}

/// Strip wiki markup, keeping the text a reader would see.
///
/// `[[Target|Label]]` becomes `Label`, `[[Target]]` becomes `Target`, external
/// links keep their label and templates are removed entirely.
pub fn clean_links(value: &str) -> String {
    let mut content = FILE_PREFIX.replace_all(value, "").into_owned();
    // Innermost templates first, until nested ones are gone too.
    while TEMPLATE.is_match(&content) {
        content = TEMPLATE.replace_all(&content, "").into_owned();
    }
    let content = WIKILINK.replace_all(&content, "$1");
    let content = EXTERNAL_LINK.replace_all(&content, "$1");
    content.trim().to_string()
}

/// Split an amount like `1-3` into `(min, max)`.
///
/// A plain number `n` yields `(0, n)`; anything unparseable yields `(0, 0)`.
pub fn parse_min_max(value: &str) -> (i64, i64) {
    match MIN_MAX_PATTERN.captures(value) {
        Some(caps) => (
            parse_integer(&caps[1]).unwrap_or(0),
            parse_integer(&caps[2]).unwrap_or(0),
        ),
        None => (0, parse_integer(value).unwrap_or(0)),
    }
}

/// Keep only the field types that are cleanly named, comma separated.
///
/// `Poison?, fire` gives `fire`; `Poison, earth, fire?` gives `poison,earth`;
/// values like `No`, `--` or `None` give `None`.
pub fn parse_monster_walks(value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let content: String = WALKS_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .collect();
    let content = content.trim_end_matches(',');
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Every `{{Loot Item|amount|name}}` entry in a loot table, as
/// `(amount, item name)`. The amount is optional.
pub fn parse_loot(value: &str) -> Vec<(Option<&str>, &str)> {
    LOOT_PATTERN
        .captures_iter(value)
        .filter_map(|caps| {
            let name = caps.get(2)?.as_str().trim();
            if name.is_empty() {
                return None;
            }
            Some((caps.get(1).map(|m| m.as_str()), name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATURE: &str = "{{Infobox Creature|List={{{1|}}}|GetValue={{{GetValue|}}}
| name         = Demon
| article      = a
| hp           = 8200
| exp          = 6000
| abilities    = [[Melee]] (0-500), [[Great Fireball]] (150-250), [[Summon]]s [[Fire Elemental]]
| walksaround  = None
| loot         = {{Loot Table
 |{{Loot Item|0-100|Gold Coin}}
 |{{Loot Item|Fire Axe|rare}}
}}
}}";

    #[test]
    fn test_parse_simple_infobox() {
        let attributes =
            parse_attributes("{{Infobox Creature|name=Demon|hp=1000|armor=15|paraimmune=yes}}");
        assert_eq!(attributes.get("name").map(String::as_str), Some("Demon"));
        assert_eq!(attributes.get("hp").map(String::as_str), Some("1000"));
        assert_eq!(attributes.get("armor").map(String::as_str), Some("15"));
        assert_eq!(attributes.get("paraimmune").map(String::as_str), Some("yes"));
        assert_eq!(attributes.len(), 4);
    }

    #[test]
    fn test_parse_attributes_trims_and_drops_empty() {
        let content = "{{Infobox Item|  name  =  Fire Sword \n| notes = \n| weight= 23.00 }}";
        let attributes = parse_attributes(content);
        assert_eq!(attributes.get("name").map(String::as_str), Some("Fire Sword"));
        assert_eq!(attributes.get("weight").map(String::as_str), Some("23.00"));
        assert!(!attributes.contains_key("notes"));
        for (key, value) in &attributes {
            assert_eq!(key.trim(), key);
            assert_eq!(value.trim(), value);
            assert!(!value.is_empty());
        }
    }

    #[test]
    fn test_parse_attributes_keeps_nested_markup() {
        let attributes = parse_attributes(CREATURE);
        assert_eq!(
            attributes.get("abilities").map(String::as_str),
            Some("[[Melee]] (0-500), [[Great Fireball]] (150-250), [[Summon]]s [[Fire Elemental]]")
        );
        let loot = &attributes["loot"];
        assert!(loot.starts_with("{{Loot Table"));
        assert!(loot.contains("|{{Loot Item|0-100|Gold Coin}}"));
        assert!(loot.ends_with("}}"));
    }

    #[test]
    fn test_nested_equals_is_literal() {
        let content = "{{Infobox Spell|effect={{Damage|type=fire}} on target|mana=20}}";
        let attributes = parse_attributes(content);
        assert_eq!(
            attributes.get("effect").map(String::as_str),
            Some("{{Damage|type=fire}} on target")
        );
        assert_eq!(attributes.get("mana").map(String::as_str), Some("20"));
        assert!(!attributes.contains_key("type"));
    }

    #[test]
    fn test_unterminated_pair_is_lost() {
        let attributes = parse_attributes("{{Infobox Item|name=Sword|weight=12");
        assert_eq!(attributes.get("name").map(String::as_str), Some("Sword"));
        assert!(!attributes.contains_key("weight"));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("1000"), Some(1000));
        assert_eq!(parse_integer("~1,500 (estimated)"), Some(1500));
        assert_eq!(parse_integer("-5%"), Some(-5));
        assert_eq!(parse_integer("unknown"), None);
    }

    #[test]
    fn test_parse_maximum_integer() {
        assert_eq!(parse_maximum_integer("500 (physical), 1200 (fire)"), Some(1200));
        assert_eq!(parse_maximum_integer("?"), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("23.00 oz."), Some(23.0));
        assert_eq!(parse_float(".5"), Some(0.5));
        assert_eq!(parse_float("heavy"), None);
    }

    #[test]
    fn test_parse_boolean() {
        assert!(parse_boolean("yes", false));
        assert!(parse_boolean("YES", false));
        assert!(!parse_boolean("no", true));
        assert!(!parse_boolean("yes?", true));
        assert!(parse_boolean("  ", true));
    }

    #[test]
    fn test_clean_links() {
        assert_eq!(clean_links("[[Ab'Dendriel]]"), "Ab'Dendriel");
        assert_eq!(clean_links("Near [[Ab'Dendriel|the elf town]]."), "Near the elf town.");
        assert_eq!(clean_links("[[File:Key.gif]] Door{{Ref|1}}"), "Key.gif Door");
        assert_eq!(clean_links("[https://tibia.com Tibia] site"), "Tibia site");
    }

    #[test]
    fn test_parse_min_max() {
        assert_eq!(parse_min_max("1-3"), (1, 3));
        assert_eq!(parse_min_max("0-100"), (0, 100));
        assert_eq!(parse_min_max("5"), (0, 5));
        assert_eq!(parse_min_max("?"), (0, 0));
    }

    #[test]
    fn test_parse_monster_walks() {
        assert_eq!(parse_monster_walks("Poison?, fire").as_deref(), Some("fire"));
        assert_eq!(parse_monster_walks("Poison?, fire."), None);
        assert_eq!(
            parse_monster_walks("Poison, earth, fire?, [[ice]]").as_deref(),
            Some("poison,earth")
        );
        assert_eq!(parse_monster_walks("None"), None);
    }

    #[test]
    fn test_parse_loot() {
        let attributes = parse_attributes(CREATURE);
        let loot = parse_loot(&attributes["loot"]);
        assert_eq!(loot, vec![(Some("0-100"), "Gold Coin"), (None, "Fire Axe")]);
        assert_eq!(parse_loot("|{{Loot Item|1-3|Fire Sword}}"), vec![(Some("1-3"), "Fire Sword")]);
    }
}
