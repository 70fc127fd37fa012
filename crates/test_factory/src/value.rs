//! Field values, override sets and builder output
//!
//! A factory builder receives a [`Kv`] of per-call overrides and returns the
//! complete [`Fields`] for one row:
//!
//! ```rust
//! use test_factory::{kv, Fields, Kv};
//!
//! fn user(kv: &Kv) -> Fields {
//!     Fields::new()
//!         .set("name", kv.string_or("name", "leto"))
//!         .set("age", kv.int_or("age", 40))
//! }
//!
//! let fields = user(&kv! { "age" => 12 });
//! assert_eq!(fields.keys(), vec!["name", "age"]);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::FactoryError;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt16(u16),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Time(DateTime<Utc>),
    Strings(Vec<String>),
    /// Structured payload, run through the backend's JSON encoder before binding
    Json(Value),
    /// Already-encoded JSON text, bound as-is
    RawJson(String),
}

impl FieldValue {
    /// Wraps any serializable value as a JSON payload
    ///
    /// # Panics
    ///
    /// Panics if `value` can't be represented as JSON
    pub fn json<T: Serialize>(value: T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| panic!("factory JSON value is not serializable: {}", err));
        FieldValue::Json(value)
    }

    /// Short name of the stored kind, used in mismatch messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::UInt16(_) => "uint16",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::Time(_) => "time",
            FieldValue::Strings(_) => "strings",
            FieldValue::Json(_) => "json",
            FieldValue::RawJson(_) => "raw json",
        }
    }

    /// Checks for SQL `NULL`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

macro_rules! field_value_from {
    ($($t:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$t> for FieldValue {
                fn from(value: $t) -> Self {
                    FieldValue::$variant($conv(value))
                }
            }
        )*
    };
}

field_value_from! {
    bool => Bool(|v| v),
    i32 => Int(i64::from),
    i64 => Int(|v| v),
    u16 => UInt16(|v| v),
    u32 => Int(i64::from),
    f32 => Float(f64::from),
    f64 => Float(|v| v),
    String => Text(|v| v),
    &str => Text(str::to_string),
    Uuid => Uuid(|v| v),
    DateTime<Utc> => Time(|v| v),
    Vec<String> => Strings(|v| v),
    Vec<&str> => Strings(|v: Vec<&str>| v.into_iter().map(str::to_string).collect()),
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Typed extraction out of a [`FieldValue`]
pub trait FromField: Sized {
    /// Kind name reported on mismatch
    const KIND: &'static str;

    /// Converts the stored value, or `None` if it is of another kind
    fn from_field(value: &FieldValue) -> Option<Self>;

    /// Why a value of an accepted kind still didn't convert
    ///
    /// `None` reports the failure as a plain kind mismatch.
    fn invalid_reason(_value: &FieldValue) -> Option<String> {
        None
    }
}

/// Marker for already-encoded JSON text
#[derive(Debug, Clone, PartialEq)]
pub struct RawJson(pub String);

impl FromField for String {
    const KIND: &'static str = "text";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Uuid(u) => Some(u.to_string()),
            _ => None,
        }
    }
}

impl FromField for Uuid {
    const KIND: &'static str = "uuid";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Uuid(u) => Some(*u),
            FieldValue::Text(s) => Uuid::parse_str(s).ok(),
            _ => None,
        }
    }

    fn invalid_reason(value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Text(s) => Uuid::parse_str(s).err().map(|err| format!("{:?} ({})", s, err)),
            _ => None,
        }
    }
}

impl FromField for i64 {
    const KIND: &'static str = "int";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(i) => Some(*i),
            FieldValue::UInt16(u) => Some(i64::from(*u)),
            _ => None,
        }
    }
}

impl FromField for f64 {
    const KIND: &'static str = "float";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::UInt16(u) => Some(f64::from(*u)),
            _ => None,
        }
    }
}

impl FromField for u16 {
    const KIND: &'static str = "uint16";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::UInt16(u) => Some(*u),
            FieldValue::Int(i) => u16::try_from(*i).ok(),
            _ => None,
        }
    }

    fn invalid_reason(value: &FieldValue) -> Option<String> {
        match value {
            FieldValue::Int(i) if u16::try_from(*i).is_err() => Some(format!("{} is out of range", i)),
            _ => None,
        }
    }
}

impl FromField for bool {
    const KIND: &'static str = "bool";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromField for Vec<String> {
    const KIND: &'static str = "strings";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Strings(list) => Some(list.clone()),
            FieldValue::Text(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }
}

impl FromField for DateTime<Utc> {
    const KIND: &'static str = "time";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromField for Value {
    const KIND: &'static str = "json";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromField for RawJson {
    const KIND: &'static str = "raw json";

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::RawJson(s) | FieldValue::Text(s) => Some(RawJson(s.clone())),
            _ => None,
        }
    }
}

/// Per-call overrides handed to a factory builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kv {
    values: BTreeMap<String, FieldValue>,
}

/// Builds a [`Kv`] from `key => value` pairs
#[macro_export]
macro_rules! kv {
    () => {
        $crate::Kv::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Kv::new()$(.set($key, $value))+
    };
}

macro_rules! typed_accessors {
    ($($name:ident, $name_or:ident => $t:ty),* $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($t), "` override for `key`, if any")]
            #[track_caller]
            pub fn $name(&self, key: &str) -> Option<$t> {
                self.get::<$t>(key)
            }

            #[doc = concat!("The `", stringify!($t), "` override for `key`, or `default`")]
            #[track_caller]
            pub fn $name_or(&self, key: &str, default: impl Into<$t>) -> $t {
                self.get::<$t>(key).unwrap_or_else(|| default.into())
            }
        )*
    };
}

impl Kv {
    /// An empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds overrides from `(key, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |kv, (key, value)| kv.set(key, value))
    }

    /// Adds or replaces an override
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Whether an override exists for `key` (including an explicit null)
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The raw override for `key`
    pub fn raw(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// The raw override for `key`, or `default`; keeps explicit nulls
    pub fn value_or(&self, key: &str, default: impl Into<FieldValue>) -> FieldValue {
        self.values.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Typed override for `key`
    ///
    /// Returns `Ok(None)` when the key is missing or explicitly null,
    /// [`FactoryError::TypeMismatch`] when the stored kind doesn't convert and
    /// [`FactoryError::InvalidValue`] when the kind fits but the content
    /// doesn't (a malformed UUID string, say).
    pub fn try_get<T: FromField>(&self, key: &str) -> Result<Option<T>, FactoryError> {
        match self.values.get(key) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(value) => T::from_field(value).map(Some).ok_or_else(|| {
                match T::invalid_reason(value) {
                    Some(reason) => FactoryError::invalid(key, T::KIND, reason),
                    None => FactoryError::mismatch(key, T::KIND, value.kind()),
                }
            }),
        }
    }

    /// Typed override for `key`
    ///
    /// # Panics
    ///
    /// Panics when the stored kind doesn't convert to `T`
    #[track_caller]
    pub fn get<T: FromField>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => panic!("{}", err),
        }
    }

    typed_accessors! {
        uuid, uuid_or => Uuid,
        int, int_or => i64,
        float, float_or => f64,
        uint16, uint16_or => u16,
        bool, bool_or => bool,
        string, string_or => String,
        strings, strings_or => Vec<String>,
        time, time_or => DateTime<Utc>,
        json, json_or => Value,
    }

    /// The pre-encoded JSON override for `key`, if any
    #[track_caller]
    pub fn raw_json(&self, key: &str) -> Option<String> {
        self.get::<RawJson>(key).map(|raw| raw.0)
    }

    /// The pre-encoded JSON override for `key`, or `default`
    #[track_caller]
    pub fn raw_json_or(&self, key: &str, default: impl Into<String>) -> String {
        self.raw_json(key).unwrap_or_else(|| default.into())
    }
}

/// The complete, ordered column set produced by a builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    /// An empty column set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, replacing the value if it already exists
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Column names in insertion order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Value of a column
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the builder produced no columns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates columns in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
