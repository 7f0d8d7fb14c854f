//! Column type canonicalization and type classes.

use std::sync::LazyLock;

use regex::Regex;

/// Canonical spelling of a base type name, resolving MySQL synonyms.
fn canonical_base(name: &str) -> &str {
    match name {
        "integer" => "int",
        "dec" | "numeric" | "fixed" => "decimal",
        "double precision" | "real" => "double",
        "character varying" => "varchar",
        "character" => "char",
        "national char" | "nchar" => "char",
        "national varchar" | "nvarchar" | "national char varying" => "varchar",
        "long varchar" | "long" => "mediumtext",
        "long varbinary" => "mediumblob",
        "geometrycollection" => "geomcollection",
        other => other,
    }
}

/// Builds the canonical type text from its parts.
///
/// `base` is the lower-cased base name (possibly two words such as
/// `double precision`), `args` the lower-cased argument list without
/// parentheses and `flags` any trailing `unsigned`/`signed`/`zerofill`.
#[must_use]
pub fn canonical_type(base: &str, args: Option<&str>, flags: &[&str]) -> String {
    let base = base.to_ascii_lowercase();
    if base == "bool" || base == "boolean" {
        return String::from("tinyint(1)");
    }
    let mut text = String::from(canonical_base(&base));
    if let Some(args) = args {
        text.push('(');
        text.push_str(args);
        text.push(')');
    }
    let zerofill = flags.iter().any(|f| f.eq_ignore_ascii_case("zerofill"));
    let unsigned = zerofill || flags.iter().any(|f| f.eq_ignore_ascii_case("unsigned"));
    if unsigned {
        text.push_str(" unsigned");
    }
    if zerofill {
        text.push_str(" zerofill");
    }
    text
}

/// Canonicalizes free-form type text such as `INTEGER(11) UNSIGNED`.
#[must_use]
pub fn canonicalize_type_text(text: &str) -> String {
    let trimmed = text.trim();
    let (head, args, tail) = match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if open < close => (
            &trimmed[..open],
            Some(&trimmed[open + 1..close]),
            &trimmed[close + 1..],
        ),
        _ => (trimmed, None, ""),
    };
    let words: Vec<&str> = head.split_whitespace().collect();
    let (base_words, mut flags): (Vec<&str>, Vec<&str>) = words
        .into_iter()
        .partition(|w| !matches!(w.to_ascii_lowercase().as_str(), "unsigned" | "signed" | "zerofill"));
    flags.extend(tail.split_whitespace());
    let base = base_words.join(" ").to_ascii_lowercase();
    let args = args.map(lower_outside_quotes);
    canonical_type(&base, args.as_deref(), &flags)
}

/// Lower-cases text outside single-quoted strings.
#[must_use]
pub fn lower_outside_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quote = false;
    for c in text.chars() {
        if c == '\'' {
            in_quote = !in_quote;
        }
        if in_quote || c == '\'' {
            out.push(c);
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Base name of a canonical type, e.g. `varchar` for `varchar(10)`.
#[must_use]
pub fn base_name(column_type: &str) -> String {
    column_type
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// BLOB, TEXT, JSON and spatial types accept only expression defaults.
#[must_use]
pub fn is_expression_default_only(column_type: &str) -> bool {
    matches!(
        base_name(column_type).as_str(),
        "tinyblob"
            | "blob"
            | "mediumblob"
            | "longblob"
            | "tinytext"
            | "text"
            | "mediumtext"
            | "longtext"
            | "json"
            | "geometry"
            | "point"
            | "linestring"
            | "polygon"
            | "multipoint"
            | "multilinestring"
            | "multipolygon"
            | "geomcollection"
            | "geometrycollection"
    )
}

/// `ON UPDATE` is only allowed on these.
#[must_use]
pub fn is_datetime_or_timestamp(column_type: &str) -> bool {
    matches!(base_name(column_type).as_str(), "datetime" | "timestamp")
}

/// Spatial types, which may carry a `SPATIAL` index.
#[must_use]
pub fn is_spatial(column_type: &str) -> bool {
    matches!(
        base_name(column_type).as_str(),
        "geometry"
            | "point"
            | "linestring"
            | "polygon"
            | "multipoint"
            | "multilinestring"
            | "multipolygon"
            | "geomcollection"
    )
}

static CURRENT_TIMESTAMP: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(current_timestamp|now|localtime|localtimestamp)(?:\s*\(\s*(\d*)\s*\))?$").ok()
});

/// Normalizes the `CURRENT_TIMESTAMP` family to `CURRENT_TIMESTAMP[(n)]`.
/// Any other expression is returned unchanged.
#[must_use]
pub fn normalize_on_update(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    let captures = CURRENT_TIMESTAMP
        .as_ref()
        .and_then(|re| re.captures(&lower));
    match captures {
        Some(captures) => match captures.get(2).map(|m| m.as_str()) {
            Some(precision) if !precision.is_empty() => {
                format!("CURRENT_TIMESTAMP({precision})")
            }
            _ => String::from("CURRENT_TIMESTAMP"),
        },
        None => trimmed.to_string(),
    }
}

/// Compares two type spellings after canonicalization.
#[must_use]
pub fn same_type(a: &str, b: &str) -> bool {
    canonicalize_type_text(a) == canonicalize_type_text(b)
}
