use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref INSERT_TARGET: Regex = Regex::new(
        r#"(?i)\bINSERT\s+INTO\s+(?:"[^"]+"|[A-Za-z0-9_]+)(?:\.(?:"[^"]+"|[A-Za-z0-9_]+))?(\s*\()?"#
    )
    .unwrap();
    static ref ROW_SOURCE: Regex = Regex::new(r"(?i)^\s*(VALUES|SELECT|WITH)\b").unwrap();
}

/// Point every `INSERT INTO <table>` of a data script at `target`.
///
/// Statements without an explicit column list get `columns` (in the data
/// script's order) spelled out, so positional VALUES still land in the right
/// columns of a permuted table.
pub fn retarget_inserts(script: &str, target: &str, columns: &[String]) -> String {
    let column_list = columns.join(", ");

    INSERT_TARGET
        .replace_all(script, |caps: &Captures<'_>| {
            if let Some(paren) = caps.get(1) {
                return format!("INSERT INTO {}{}", target, paren.as_str());
            }

            let end = caps.get(0).map_or(0, |m| m.end());
            let positional = ROW_SOURCE.is_match(&script[end..]);
            if positional && !column_list.is_empty() {
                format!("INSERT INTO {} ({})", target, column_list)
            } else {
                format!("INSERT INTO {}", target)
            }
        })
        .into_owned()
}
