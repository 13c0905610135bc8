//! Human-readable number formatting

use crate::error::{Error, Result};

/// Group the decimal digits of `number` from the right, separated by spaces.
///
/// `format_integer(1234567, 3)` is `"1 234 567"`.
pub fn format_integer(number: i128, group_size: usize) -> Result<String> {
    if group_size == 0 {
        return Err(Error::configuration("group size must be positive"));
    }

    let digits = number.unsigned_abs().to_string();
    let head = match digits.len() % group_size {
        0 => group_size,
        n => n,
    };

    let mut out = String::with_capacity(digits.len() * 2);
    if number < 0 {
        out.push('-');
    }
    let (first, mut rest) = digits.split_at(head);
    out.push_str(first);
    while !rest.is_empty() {
        let (group, tail) = rest.split_at(group_size);
        out.push(' ');
        out.push_str(group);
        rest = tail;
    }
    Ok(out)
}
