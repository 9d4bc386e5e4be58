//! Portion scaling for ingredient lines such as `500 g Hackfleisch`.

use crate::error::ValidationError;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let number = r"\d+\s+\d+/\d+|\d+/\d+|\d+(?:[.,]\d+)?(?:\s*[½¼¾⅓⅔⅛])?|[½¼¾⅓⅔⅛]";
    Regex::new(&format!(
        r"^\s*(?P<low>{number})(?:(?P<dash>\s*-\s*)(?P<high>{number}))?(?P<rest>(?:\s.*)?|[^\d/.,].*)$"
    ))
    .expect("Invalid quantity regex")
});

const UNITS: &[&str] = &[
    "g", "gr.", "kg", "mg", "ml", "cl", "dl", "l", "Liter", "cm", "EL", "TL", "Msp.", "Pck.",
    "Päckchen", "Packung", "Paket", "Prise", "Prise(n)", "Becher", "Dose", "Dose(n)", "Bund",
    "Zehe", "Zehe(n)", "Scheibe", "Scheibe(n)", "Stück", "Stk.", "Stange", "Stange(n)", "Tasse",
    "Tasse(n)", "Glas", "Würfel", "Blatt", "Zweig", "Zweig(e)", "Handvoll", "Schuss", "Spritzer",
    "Tropfen", "Flasche", "Flasche(n)", "Kopf", "Knolle", "Knolle(n)", "Portion", "Portion(en)",
    "Beutel", "Tüte", "Tüte(n)", "Stiel", "Stiel(e)", "Kugel", "Kugel(n)", "Schale", "Schale(n)",
];

const VAGUE_AMOUNTS: &[&str] = &[
    "nach Geschmack",
    "nach Belieben",
    "n. B.",
    "n.B.",
    "etwas",
    "evtl.",
    "einige",
    "wenig",
    "reichlich",
    "some",
];

/// One ingredient line split into amount and name
#[derive(Debug, Clone, PartialEq)]
struct IngredientLine<'a> {
    quantity: Option<Quantity<'a>>,
    amount: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Quantity<'a> {
    low: f64,
    high: Option<(&'a str, f64)>,
    unit: &'a str,
    decimal_comma: bool,
}

/// Scale every ingredient from `base` portions to `target` portions.
pub fn scale_ingredients(
    ingredients: &[String],
    base: u32,
    target: u32,
) -> Result<IndexMap<String, String>, ValidationError> {
    if base == 0 || target == 0 {
        return Err(ValidationError::InvalidPortions { base, target });
    }
    let factor = f64::from(target) / f64::from(base);

    let mut scaled: IndexMap<String, String> = IndexMap::new();
    for line in ingredients.iter().filter(|line| !line.trim().is_empty()) {
        let parsed = parse_line(line);
        let amount = match &parsed.quantity {
            Some(quantity) => quantity.scaled(factor),
            None => parsed.amount.clone(),
        };
        match scaled.get_mut(&parsed.name) {
            Some(existing) if !amount.is_empty() => {
                if existing.is_empty() {
                    *existing = amount;
                } else {
                    existing.push_str(" + ");
                    existing.push_str(&amount);
                }
            }
            Some(_) => {}
            None => {
                scaled.insert(parsed.name, amount);
            }
        }
    }
    Ok(scaled)
}

fn parse_line(line: &str) -> IngredientLine<'_> {
    let line = line.trim();

    if let Some(caps) = QUANTITY_REGEX.captures(line) {
        let low_text = &caps["low"];
        let high_text = caps.name("high").map(|m| m.as_str());
        if let (Some(low), Some(high)) = (
            parse_number(low_text),
            high_text.map_or(Some(None), |text| parse_number(text).map(Some)),
        ) {
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            let after_number = rest.trim_start();
            let separator = &rest[..rest.len() - after_number.len()];
            let (unit, name) = match after_number.split_once(char::is_whitespace) {
                Some((word, name)) if is_unit(word) => (word, name.trim()),
                None if is_unit(after_number) => (after_number, ""),
                _ => ("", after_number),
            };
            let unit_end = if unit.is_empty() {
                0
            } else {
                separator.len() + unit.len()
            };
            let quantity = Quantity {
                low,
                high: high.map(|value| (caps.name("dash").map_or("-", |m| m.as_str()), value)),
                unit: &rest[..unit_end],
                decimal_comma: low_text.contains(',')
                    || high_text.is_some_and(|text| text.contains(',')),
            };
            let amount = quantity.scaled(1.0);
            return IngredientLine {
                quantity: Some(quantity),
                name: if name.is_empty() {
                    line.to_string()
                } else {
                    name.to_string()
                },
                amount,
            };
        }
    }

    for vague in VAGUE_AMOUNTS {
        if let Some(name) = strip_prefix_ignore_case(line, vague) {
            let name = name.trim();
            if !name.is_empty() && name.len() < line.len() {
                return IngredientLine {
                    quantity: None,
                    amount: line[..line.len() - name.len()].trim().to_string(),
                    name: name.to_string(),
                };
            }
        }
    }

    IngredientLine {
        quantity: None,
        amount: String::new(),
        name: line.to_string(),
    }
}

impl Quantity<'_> {
    fn scaled(&self, factor: f64) -> String {
        let mut amount = format_number(self.low * factor, self.decimal_comma);
        if let Some((dash, high)) = self.high {
            amount.push_str(dash);
            amount.push_str(&format_number(high * factor, self.decimal_comma));
        }
        amount.push_str(self.unit);
        amount
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some((whole, fraction)) = text.split_once(char::is_whitespace) {
        if let (Some(whole), Some(fraction)) = (parse_number(whole), parse_number(fraction)) {
            return Some(whole + fraction);
        }
    }
    if let Some((numerator, denominator)) = text.split_once('/') {
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        return (denominator != 0.0).then(|| numerator / denominator);
    }
    if let Some(last) = text.chars().last().and_then(vulgar_fraction) {
        let whole = text[..text.len() - last_char_len(text)].trim();
        let whole = if whole.is_empty() { 0.0 } else { whole.replace(',', ".").parse().ok()? };
        return Some(whole + last);
    }
    text.replace(',', ".").parse().ok()
}

fn vulgar_fraction(c: char) -> Option<f64> {
    match c {
        '½' => Some(0.5),
        '¼' => Some(0.25),
        '¾' => Some(0.75),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '⅛' => Some(0.125),
        _ => None,
    }
}

fn last_char_len(text: &str) -> usize {
    text.chars().last().map_or(0, char::len_utf8)
}

fn format_number(value: f64, decimal_comma: bool) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut text = if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let text = format!("{rounded:.2}");
        text.trim_end_matches('0').to_string()
    };
    if decimal_comma {
        text = text.replace('.', ",");
    }
    text
}

fn is_unit(word: &str) -> bool {
    UNITS.iter().any(|unit| unit.eq_ignore_ascii_case(word))
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &line[prefix.len()..];
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}
