//! Display formatting. Rounding happens here and nowhere else.

use rust_decimal::Decimal;

/// Groups an integer digit string per locale: Indian locales group the last
/// three digits then twos (`12,34,567`), everything else groups threes.
fn group_digits(digits: &str, indian: bool) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut groups: Vec<String> = Vec::new();
    let mut rest = chars.as_slice();

    let first = 3;
    if rest.len() > first {
        let (head, tail) = rest.split_at(rest.len() - first);
        groups.push(tail.iter().collect());
        rest = head;
    } else {
        return digits.to_string();
    }

    let step = if indian { 2 } else { 3 };
    while rest.len() > step {
        let (head, tail) = rest.split_at(rest.len() - step);
        groups.push(tail.iter().collect());
        rest = head;
    }
    if !rest.is_empty() {
        groups.push(rest.iter().collect());
    }
    groups.reverse();
    groups.join(",")
}

/// Renders a monetary value with locale-aware digit grouping and a fixed
/// number of decimals.
pub fn format_currency(value: Decimal, precision: u32, locale: &str) -> String {
    let mut rounded = value.round_dp(precision);
    rounded.rescale(precision);

    let text = rounded.abs().to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };

    let indian = locale.ends_with("-IN");
    let grouped = group_digits(&integer, indian);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}
