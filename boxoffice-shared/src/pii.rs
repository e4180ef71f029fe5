use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps customer-identifying data so it never reaches log output in clear text.
///
/// `Debug` and `Display` render a redacted form. Serialization still emits the
/// real value since callers of the service need it back.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> Masked<T> {
    /// Keeps the first character and anything from the `@` on, so support staff
    /// can still tell two customers apart in the logs.
    fn redacted(&self) -> String {
        let raw = self.0.to_string();
        let mut chars = raw.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };
        match raw.find('@') {
            Some(at) if at > 0 => format!("{}***{}", first, &raw[at..]),
            _ => format!("{}***", first),
        }
    }
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.redacted())
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
