//! Redaction for key material in logs and debug output.
//!
//! [`Redacted`] wraps a WIF, wallet password or similar so that `Debug` and
//! `Display` print `"<redacted>"` while the inner value stays usable.

use std::fmt::{self, Debug, Display};

/// Wrapper that hides its inner value when formatted.
///
/// ```
/// use neo_lockproxy::redact::Redacted;
///
/// let wif = Redacted("L1QqQJnpBwbsPGAuutuzPTac8piqvbR1HRjrY5qHup48TBCBFe4g".to_string());
/// assert_eq!(format!("{:?}", wif), "<redacted>");
/// assert!(wif.expose().starts_with("L1"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(transparent)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
