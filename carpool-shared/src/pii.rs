use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Personal data (emails, phone numbers) that must not reach log output verbatim.
///
/// `Debug`/`Display` print a redacted form; serialization passes the real
/// value through, since API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0.as_ref()))
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0.as_ref()))
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

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Emails keep their first character and domain, digit strings their last two
/// digits, anything else is fully starred.
fn redact(value: &str) -> String {
    if let Some((local, domain)) = value.split_once('@') {
        let first = local.chars().next().map(String::from).unwrap_or_default();
        return format!("{}***@{}", first, domain);
    }

    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        let keep = value.len().min(2);
        let (hidden, shown) = value.split_at(value.len() - keep);
        return format!("{}{}", "*".repeat(hidden.len()), shown);
    }

    "********".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_partially_masked() {
        let email = Masked("priya@example.com".to_string());
        assert_eq!(format!("{}", email), "p***@example.com");
        assert_eq!(format!("{:?}", email), "p***@example.com");
    }

    #[test]
    fn test_phone_keeps_last_digits() {
        let phone = Masked("9876543210");
        assert_eq!(phone.to_string(), "********10");
    }

    #[test]
    fn test_serialization_is_transparent() {
        let email = Masked("priya@example.com".to_string());
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"priya@example.com\"");
        assert_eq!(email.into_inner(), "priya@example.com");
    }
}
