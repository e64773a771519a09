use std::{
    fmt,
    fmt::{Debug, Display},
};

/// Wrapper for gateway credentials (API tokens, secret keys) that must never end up in log output.
///
/// Both `Debug` and `Display` are masked, so a `Secret` is safe to embed in config structs that get dumped with
/// `{:?}` at startup. Access to the inner value is always explicit, via [`Secret::reveal`].
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Deliberately noisy accessor. Call sites that need the raw credential (auth headers, mostly) should be easy
    /// to find in a grep.
    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::Secret;

    #[test]
    fn secrets_are_masked_in_formatting() {
        let token = Secret::new("sk_live_abc123".to_string());
        assert_eq!(format!("{token}"), "****");
        assert_eq!(format!("{token:?}"), "****");
        assert_eq!(token.reveal(), "sk_live_abc123");
    }
}
