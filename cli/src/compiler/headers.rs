use indexmap::IndexMap;

/// Ordered header map with case-insensitive keys. The last write wins and
/// keeps the spelling it was written with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: IndexMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.entries
            .insert(key.to_ascii_lowercase(), (key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries
            .shift_remove(&key.to_ascii_lowercase())
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn merge(&mut self, other: &Headers) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_last_write_wins() {
        let mut h = Headers::new();
        h.insert("Content-Type", "text/plain");
        h.insert("X-A", "1");
        h.insert("content-type", "application/json");
        assert_eq!(h.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(
            h.iter().collect::<Vec<_>>(),
            vec![("content-type", "application/json"), ("X-A", "1")]
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a: Headers = [("A", "1"), ("B", "2")].into_iter().collect();
        let b: Headers = [("b", "3"), ("C", "4")].into_iter().collect();
        let mut once = a.clone();
        once.merge(&b);
        let mut twice = once.clone();
        twice.merge(&b);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }
}
