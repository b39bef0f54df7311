//! Instance / export names with natural ordering.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::errors::{CircuitDbError, Result};

/// Name of a node, arc, export or cell
///
/// Ordering is "natural": case-insensitive first, digit runs compared by
/// numeric value (`n2 < n10`), then raw bytes as the final tiebreak so the
/// order stays total and consistent with `Eq`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name(Arc<str>);

impl Name {
    /// Create a name; empty names are rejected
    pub fn new(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(CircuitDbError::invalid_argument("name must not be empty"));
        }
        if s.chars().any(|c| c.is_control()) {
            return Err(CircuitDbError::invalid_argument(format!(
                "name {:?} contains control characters",
                s
            )));
        }
        Ok(Self(Arc::from(s)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        natural_cmp(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// Case-insensitive comparison with numeric digit runs
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let (a_end, b_end) = (digit_run_end(a, i), digit_run_end(b, j));
            let a_num = strip_leading_zeros(&a[i..a_end]);
            let b_num = strip_leading_zeros(&b[j..b_end]);
            let ord = a_num.len().cmp(&b_num.len()).then_with(|| a_num.cmp(b_num));
            if ord != Ordering::Equal {
                return ord;
            }
            i = a_end;
            j = b_end;
            continue;
        }

        let ord = a[i].to_ascii_lowercase().cmp(&b[j].to_ascii_lowercase());
        if ord != Ordering::Equal {
            return ord;
        }
        i += 1;
        j += 1;
    }

    (a.len() - i).cmp(&(b.len() - j))
}

fn digit_run_end(s: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < s.len() && s[end].is_ascii_digit() {
        end += 1;
    }
    end
}

fn strip_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits.iter().position(|&d| d != b'0').unwrap_or(digits.len());
    &digits[first..]
}
