//! Normalization of pt-BR formatted quantities into optional integers.
//!
//! The upstream tables print `1.234.567` for one million and change, `-` for
//! "no data" and occasionally `nan` when an export went wrong. Anything that
//! still does not parse becomes `None`; a bad number never rejects a row.

/// Values that can be normalized into an optional quantity.
pub trait IntoQuantity {
    fn into_quantity(self) -> Option<i64>;
}

impl IntoQuantity for &str {
    fn into_quantity(self) -> Option<i64> {
        parse_text(self)
    }
}

impl IntoQuantity for &String {
    fn into_quantity(self) -> Option<i64> {
        parse_text(self)
    }
}

impl IntoQuantity for String {
    fn into_quantity(self) -> Option<i64> {
        parse_text(&self)
    }
}

impl IntoQuantity for i64 {
    fn into_quantity(self) -> Option<i64> {
        Some(self)
    }
}

impl IntoQuantity for i32 {
    fn into_quantity(self) -> Option<i64> {
        Some(i64::from(self))
    }
}

impl<T: IntoQuantity> IntoQuantity for Option<T> {
    fn into_quantity(self) -> Option<i64> {
        self.and_then(IntoQuantity::into_quantity)
    }
}

/// Normalize a raw cell into a quantity.
pub fn normalize(value: impl IntoQuantity) -> Option<i64> {
    value.into_quantity()
}

fn parse_text(raw: &str) -> Option<i64> {
    let text = raw.trim();
    if text.is_empty() || text == "-" || text.eq_ignore_ascii_case("nan") {
        return None;
    }

    let digits: String = text.chars().filter(|c| *c != '.').collect();

    // ',' is the decimal mark; the fraction is dropped.
    let (whole, fraction) = match digits.split_once(',') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    whole.parse::<i64>().ok()
}
