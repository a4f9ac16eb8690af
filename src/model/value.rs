//! Declaration values that accept either a scalar or a list.

use serde::{Deserialize, Serialize};

/// A string or a list of strings.
///
/// Declarations may write `roles: web` as shorthand for `roles: [web]`.
/// An empty scalar is an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// A single value.
    Scalar(String),
    /// Several values.
    List(Vec<String>),
}

impl StringOrList {
    /// Converts into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Scalar(s) if s.is_empty() => Vec::new(),
            Self::Scalar(s) => vec![s],
            Self::List(list) => list,
        }
    }
}

impl From<StringOrList> for Vec<String> {
    fn from(value: StringOrList) -> Self {
        value.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_list() {
        let scalar: StringOrList = serde_yaml::from_str("web").unwrap();
        assert_eq!(scalar.into_vec(), vec!["web"]);

        let list: StringOrList = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(list.into_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_scalar_is_empty_list() {
        let empty: StringOrList = serde_yaml::from_str("''").unwrap();
        assert!(empty.into_vec().is_empty());
    }
}
