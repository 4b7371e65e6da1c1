//! Stable identifiers for manager and driver types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier derived from a type name.
///
/// Tokens are case-folded and word-separated: `MyFirstDriver` becomes
/// `my_first_driver`, `POSIX` becomes `posix` and `HTMLParser` becomes
/// `html_parser`. Path qualifiers (`PackageManager::APT`) are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Derive a token from a type name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        let name = name.rsplit("::").next().unwrap_or(name);
        let chars: Vec<char> = name.chars().collect();
        let mut token = String::with_capacity(name.len() + 4);

        for (i, &c) in chars.iter().enumerate() {
            if c == '-' || c == ' ' || c == '_' {
                if !token.is_empty() && !token.ends_with('_') {
                    token.push('_');
                }
                continue;
            }

            if c.is_uppercase() && i > 0 && !token.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    token.push('_');
                }
            }

            token.extend(c.to_lowercase());
        }

        while token.ends_with('_') {
            token.pop();
        }

        Self(token)
    }

    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::from_type_name(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::from_type_name(&value)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
