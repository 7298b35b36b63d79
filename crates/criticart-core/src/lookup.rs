//! Read-only lookup lists shown in filter dropdowns.

use serde::{Deserialize, Serialize};

use crate::de::null_as_default;

/// A review category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "crate::ids::lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// A free-form tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(deserialize_with = "crate::ids::lenient_string")]
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_row() {
        let category: Category =
            serde_json::from_value(serde_json::json!({"id": 3, "name": "Electronics"})).unwrap();
        assert_eq!(category.id, "3");
        assert_eq!(category.description, "");
    }
}
