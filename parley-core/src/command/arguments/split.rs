//! Splitting a raw argument string into individual values.

use parley_common::util::regex::{ARGUMENT, ARGUMENT_DOUBLE_QUOTED};

fn remove_smart_quotes(arg_string: &str, single_quotes: bool) -> String {
    let replaced = if single_quotes {
        arg_string.replace(['\u{2018}', '\u{2019}'], "'")
    } else {
        arg_string.to_owned()
    };

    replaced.replace(['\u{201c}', '\u{201d}'], "\"")
}

/// Removes one pair of wrapping quotes, if present.
pub fn strip_quotes(s: &str, single_quotes: bool) -> &str {
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '"' || (single_quotes && first == '\'')) => {
            &s[1..s.len() - 1]
        },
        _ => s,
    }
}

/// Splits `arg_string` into at most `count` values (unbounded if `None`).
///
/// Quoted runs count as one value. When the cap is reached, the final value is the unsplit
/// remainder of the string with any wrapping quotes removed.
pub fn split_args(arg_string: &str, count: Option<usize>, single_quotes: bool) -> Vec<String> {
    let modified = remove_smart_quotes(arg_string, single_quotes);
    let re = if single_quotes { &*ARGUMENT } else { &*ARGUMENT_DOUBLE_QUOTED };
    let limit = count.unwrap_or(usize::MAX);

    let mut result = Vec::new();
    let mut last_index = 0;

    while result.len() + 1 < limit {
        let Some(captures) = re.captures_at(&modified, last_index) else {
            // nothing left to split
            return result;
        };

        let value = captures
            .iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_owned())
            .unwrap_or_default();

        result.push(value);
        last_index = captures.get(0).map_or(modified.len(), |m| m.end());
    }

    if last_index < modified.len() {
        result.push(strip_quotes(&modified[last_index..], single_quotes).to_owned());
    }

    result
}
