//! Category tag as the single source of truth for activity category strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of repository activity an event was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    Repo,
    #[default]
    Commit,
    Comment,
    Pr,
    Author,
}

impl Category {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Repo => "REPO",
            Self::Commit => "COMMIT",
            Self::Comment => "COMMENT",
            Self::Pr => "PR",
            Self::Author => "AUTHOR",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REPO" | "repo" => Ok(Self::Repo),
            "COMMIT" | "commit" => Ok(Self::Commit),
            "COMMENT" | "comment" => Ok(Self::Comment),
            "PR" | "pr" | "pull_request" => Ok(Self::Pr),
            "AUTHOR" | "author" => Ok(Self::Author),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown category strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown activity category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_then_parse_yields_same_variant() {
        let variants = [
            Category::Repo,
            Category::Commit,
            Category::Comment,
            Category::Pr,
            Category::Author,
        ];

        for variant in &variants {
            let parsed: Category = variant.to_string().parse().expect("should parse");
            assert_eq!(parsed, *variant, "display/parse mismatch for {variant:?}");
        }
    }

    #[test]
    fn test_lowercase_aliases_parse() {
        assert_eq!("comment".parse::<Category>().unwrap(), Category::Comment);
        assert_eq!("pull_request".parse::<Category>().unwrap(), Category::Pr);
    }

    #[test]
    fn test_unknown_category_errors() {
        let err = "ISSUE".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown activity category: ISSUE");
    }

    #[test]
    fn test_serde_uses_uppercase_tag() {
        let json = serde_json::to_string(&Category::Comment).unwrap();
        assert_eq!(json, "\"COMMENT\"");
        let parsed: Category = serde_json::from_str("\"PR\"").unwrap();
        assert_eq!(parsed, Category::Pr);
    }
}
