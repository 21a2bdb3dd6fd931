//! Typed configuration values.
//!
//! Values read from configuration files are coerced into [`Value`]. Lists and
//! keyed lists share one ordered [`Collection`] type whose keys are either
//! integer indexes or names, so `[a, b]` and `{foo: a, 3: b}` round-trip
//! through the same structure.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

/// Signed decimal integer without leading zeros.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SIGNED_INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-](0|[1-9][0-9]*)$").expect("valid regex"));

/// Decimal number, optionally signed, with optional fraction and exponent.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NUMERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$").expect("valid regex")
});

/// Number with thousands separators (e.g. `1,000.3`).
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static GROUPED_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9,]+(\.[0-9]+)?$").expect("valid regex"));

/// Key of a [`Collection`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Positional key.
    Index(i64),
    /// Named key.
    Name(String),
}

impl Key {
    /// Parse a raw key.
    ///
    /// Canonical decimal integers (`"0"`, `"100"`, `"-5"`) become
    /// [`Key::Index`]; everything else, including `"007"` and `"+1"`,
    /// stays a [`Key::Name`].
    ///
    /// # Examples
    /// ```
    /// use servicewire_loader::Key;
    ///
    /// assert_eq!(Key::parse("100"), Key::Index(100));
    /// assert_eq!(Key::parse("007"), Key::Name("007".to_string()));
    /// assert_eq!(Key::parse("foo"), Key::Name("foo".to_string()));
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let digits = raw.strip_prefix('-').unwrap_or(raw);
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'))
            && raw != "-0";

        if canonical {
            if let Ok(index) = raw.parse::<i64>() {
                return Key::Index(index);
            }
        }
        Key::Name(raw.to_string())
    }

    /// Return the name with ASCII letters lower-cased; indexes are unchanged.
    #[must_use]
    pub fn to_lowercase(&self) -> Self {
        match self {
            Key::Index(i) => Key::Index(*i),
            Key::Name(name) => Key::Name(name.to_lowercase()),
        }
    }

    /// Get the index, if this is a positional key.
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(_) => None,
        }
    }

    /// Get the name, if this is a named key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Index(_) => None,
            Key::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::parse(raw)
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Key::parse(&raw)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Index(i64::from(i))
    }
}

/// Symbolic pointer to another service definition.
///
/// References are never resolved while loading; the container consuming the
/// configuration looks the id up when it instantiates services.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(String);

impl Reference {
    /// Create a reference to the service with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The referenced service id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered map of [`Key`] to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    entries: IndexMap<Key, Value>,
}

impl Collection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The index an unkeyed entry would receive: one past the largest
    /// index key, or 0 when there is none.
    ///
    /// Returns `None` when the largest index key is already `i64::MAX`.
    #[must_use]
    pub fn next_index(&self) -> Option<i64> {
        match self.entries.keys().filter_map(Key::as_index).max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        }
    }

    /// Append a value under the next free index and return its key.
    ///
    /// Returns `None`, leaving the collection unchanged, when no index is
    /// left (see [`Collection::next_index`]).
    pub fn push(&mut self, value: impl Into<Value>) -> Option<Key> {
        let key = Key::Index(self.next_index()?);
        self.entries.insert(key.clone(), value.into());
        Some(key)
    }

    /// Insert a value, replacing (in place) any value with the same key.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a value, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: impl Into<Key>) -> Option<Value> {
        self.entries.shift_remove(&key.into())
    }

    /// Look up a value by key.
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.entries.get(&key.into())
    }

    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut Value> {
        self.entries.get_mut(&key.into())
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the collection has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether the keys are exactly `0..len` in order.
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.entries
            .keys()
            .enumerate()
            .all(|(position, key)| key.as_index() == i64::try_from(position).ok())
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Key, Value> {
        self.entries.iter()
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, Key, Value> {
        self.entries.keys()
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, Key, Value> {
        self.entries.values()
    }

    /// Insert every entry of `other`, overriding values on key collision.
    pub fn extend(&mut self, other: Collection) {
        self.entries.extend(other.entries);
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .zip(0..)
                .map(|(value, index)| (Key::Index(index), value))
                .collect(),
        }
    }
}

impl<K: Into<Key>> FromIterator<(K, Value)> for Collection {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Collection {
    type Item = (Key, Value);
    type IntoIter = indexmap::map::IntoIter<Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = (&'a Key, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Any value that can appear in a parameter or argument slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value, kept verbatim (placeholders are not expanded)
    String(String),
    /// Ordered list or keyed list
    Collection(Collection),
    /// Reference to another service definition
    Reference(Reference),
}

impl Value {
    /// Build a list value from an iterator of values.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Collection(items.into_iter().map(Into::into).collect())
    }

    /// Build a reference value.
    pub fn reference(id: impl Into<String>) -> Self {
        Value::Reference(Reference::new(id))
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get value as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get value as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get value as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get value as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get value as collection reference
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Try to get value as service reference
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Collection(_) => "collection",
            Value::Reference(_) => "reference",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Collection> for Value {
    fn from(c: Collection) -> Self {
        Value::Collection(c)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Coerce raw markup text into a typed scalar.
///
/// Rules, in order:
/// - `null` (any case) becomes [`Value::Null`]
/// - digits become [`Value::Int`]; a leading `0` means octal
/// - `+`/`-` signed integers become [`Value::Int`]
/// - `true`/`on` and `false`/`off` (any case) become [`Value::Bool`]
/// - `0x`-prefixed hex becomes [`Value::Int`]
/// - other decimal numbers, including `1,000.3`, become [`Value::Float`]
/// - anything else stays a [`Value::String`]
///
/// # Examples
/// ```
/// use servicewire_loader::{coerce_scalar, Value};
///
/// assert_eq!(coerce_scalar("4"), Value::Int(4));
/// assert_eq!(coerce_scalar("0755"), Value::Int(0o755));
/// assert_eq!(coerce_scalar("off"), Value::Bool(false));
/// assert_eq!(coerce_scalar("1,000.3"), Value::Float(1000.3));
/// assert_eq!(coerce_scalar("a string"), Value::from("a string"));
/// ```
pub fn coerce_scalar(raw: &str) -> Value {
    match raw.to_ascii_lowercase().as_str() {
        "null" => return Value::Null,
        "true" | "on" => return Value::Bool(true),
        "false" | "off" => return Value::Bool(false),
        _ => {}
    }

    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let parsed = match raw.strip_prefix('0') {
            Some(octal) if !octal.is_empty() => i64::from_str_radix(octal, 8).ok(),
            _ => raw.parse::<i64>().ok(),
        };
        if let Some(i) = parsed {
            return Value::Int(i);
        }
    }

    if SIGNED_INTEGER_PATTERN.is_match(raw) {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
    }

    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            if let Ok(i) = i64::from_str_radix(hex, 16) {
                return Value::Int(i);
            }
        }
    }

    if NUMERIC_PATTERN.is_match(raw) {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
    }

    if GROUPED_NUMBER_PATTERN.is_match(raw) {
        if let Ok(f) = raw.replace(',', "").parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(raw.to_string())
}
