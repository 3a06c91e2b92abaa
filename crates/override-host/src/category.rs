//! Category index for settings keys.

use std::collections::BTreeMap;

/// Collects keys under the category tag declared in their metadata.
pub trait CategoryIndex {
    /// Record `key` under `category`.
    fn register(&mut self, category: &str, key: &str);
}

/// Category → keys, in first-registration order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    categories: BTreeMap<String, Vec<String>>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys registered under `category`.
    pub fn keys(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Known category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

impl CategoryIndex for CategoryMap {
    fn register(&mut self, category: &str, key: &str) {
        let keys = self.categories.entry(category.to_string()).or_default();
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_deduplicates() {
        let mut index = CategoryMap::new();
        index.register("build", "cmake.generator");
        index.register("build", "cmake.cmakePath");
        index.register("build", "cmake.generator");

        assert_eq!(index.keys("build"), ["cmake.generator", "cmake.cmakePath"]);
        assert!(index.keys("editor").is_empty());
        assert_eq!(index.categories().collect::<Vec<_>>(), vec!["build"]);
    }
}
