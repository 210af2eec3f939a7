pub mod credential;
pub mod post;
pub mod user;

use bson::oid::ObjectId;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{DeserializeOwned, Error, Unexpected},
};
use serde_json::{Map, Value};
use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
    str::FromStr,
};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Id(#[from] InvalidIdError),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The id is not a valid object id: {0}")]
pub struct InvalidIdError(String);

/// Drops keys from an opaque payload that the typed fields of a model own.
pub(crate) fn without_fields(mut map: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    for field in fields {
        map.remove(*field);
    }
    map
}

/// Reads a field that the server owns from an otherwise untyped payload. A value of the wrong
/// shape is replaced by the default instead of rejecting the whole payload.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Like [`lenient`], but per element: items of the wrong shape are dropped and anything that
/// is not an array reads as empty.
pub(crate) fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Typed document id.
///
/// Wraps the store's object id and serializes as its 24 character hex form, which is also how
/// ids travel in request bodies and in `likedPosts`.
pub struct Id<Marker>(ObjectId, PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(object_id: ObjectId) -> Self {
        Self(object_id, PhantomData)
    }

    #[must_use]
    pub fn generate() -> Self {
        Self::new(ObjectId::new())
    }

    #[must_use]
    pub fn object_id(self) -> ObjectId {
        self.0
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        self.0.to_hex()
    }
}

// Manual impls so that markers don't need to implement anything.
impl<Marker> Copy for Id<Marker> {}

impl<Marker> Clone for Id<Marker> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Marker> PartialEq for Id<Marker> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<Marker> Eq for Id<Marker> {}

impl<Marker> Hash for Id<Marker> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<Marker> Debug for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.0.to_hex()).finish()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self::new)
            .map_err(|_| InvalidIdError(s.to_owned()))
    }
}

impl<Marker> From<ObjectId> for Id<Marker> {
    fn from(value: ObjectId) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for ObjectId {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> Serialize for Id<Marker> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de, Marker> Deserialize<'de> for Id<Marker> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"hex object id"))
    }
}
