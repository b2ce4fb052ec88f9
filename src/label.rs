//! Outcome labels and the separators used to compose them.
//!
//! Downstream encoders split labels back into their parts, so both
//! separators are reserved and may not occur inside an authored label.

use crate::EffectError;

/// Joins the labels of sibling outcomes that were conjoined together.
pub const CONJUNCTION_SEPARATOR: &str = "__";

/// Joins the label of an enclosing labeled choice to one of its outcomes.
pub const NESTED_SEPARATOR: &str = "-EQ-";

pub fn validate(label: &str) -> Result<(), EffectError> {
    for separator in [CONJUNCTION_SEPARATOR, NESTED_SEPARATOR] {
        if label.contains(separator) {
            return Err(EffectError::ReservedSeparator { label: label.to_string(), separator });
        }
    }
    Ok(())
}

pub fn conjoin<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> Option<String> {
    let joined = labels.into_iter().collect::<Vec<_>>().join(CONJUNCTION_SEPARATOR);
    if joined.is_empty() { None } else { Some(joined) }
}

pub fn join(first: &str, second: &str) -> String {
    format!("{}{}{}", first, CONJUNCTION_SEPARATOR, second)
}

/// Label of the `index`-th branch of an unlabeled choice: `o1`, `o2`, ...
pub fn positional(index: usize) -> String {
    format!("o{}", index + 1)
}

pub fn nest(outer: &str, inner: &str) -> String {
    format!("{}{}{}", outer, NESTED_SEPARATOR, inner)
}

/// Splits a composed label into the authored labels it was built from.
pub fn components(label: &str) -> Vec<&str> {
    label.split(CONJUNCTION_SEPARATOR)
        .flat_map(|part| part.split(NESTED_SEPARATOR))
        .collect()
}
