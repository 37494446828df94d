//! Multi-valued name → values maps for query strings and form bodies.

use indexmap::IndexMap;

/// Ordered, multi-valued parameter map.
///
/// Keys keep their first-seen order and every repeated key keeps all its
/// values, so `ids=1&ids=2` binds naturally into a `Vec`.
///
/// # Example
///
/// ```rust
/// use tessera::Values;
///
/// let values = Values::from_urlencoded("ids=1&ids=2&q=rust+lang").unwrap();
/// assert_eq!(values.get("q"), Some("rust lang"));
/// assert_eq!(values.get_all("ids"), Some(&["1".to_string(), "2".to_string()][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Values {
    inner: IndexMap<String, Vec<String>>,
}

impl Values {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `application/x-www-form-urlencoded` data.
    ///
    /// # Errors
    ///
    /// Returns the decoder error for malformed input.
    pub fn from_urlencoded(input: &str) -> Result<Self, serde_urlencoded::de::Error> {
        Self::from_urlencoded_bytes(input.as_bytes())
    }

    /// Parses urlencoded bytes.
    ///
    /// # Errors
    ///
    /// Returns the decoder error for malformed input.
    pub fn from_urlencoded_bytes(input: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(input)?;
        Ok(pairs.into_iter().collect())
    }

    /// Appends a value under `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(name.into()).or_default().push(value.into());
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value for `name`.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.inner.get(name).map(Vec::as_slice)
    }

    /// Returns true if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates names and their values in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl FromIterator<(String, String)> for Values {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.add(name, value);
        }
        values
    }
}
