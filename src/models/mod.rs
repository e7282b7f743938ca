pub mod member;
pub mod project;
pub mod task;

pub use member::*;
pub use project::*;
pub use task::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// A persisted entity stored in one datastore table
pub trait Record: DeserializeOwned + Send {
    /// Table holding the rows
    const TABLE: &'static str;
    /// Entity kind used in errors and log events
    const KIND: &'static str;
}

/// Read a nullable text column as an empty string
pub(crate) fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `YYYY-MM-DD` date columns
pub mod date_format {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;
    use time::Date;

    const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => {
                let text = date.format(FORMAT).map_err(ser::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    /// Accepts plain dates and timestamps (only the date part is kept); blank is `None`
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        match text.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => {
                let day = text.get(..10).unwrap_or(text);
                Date::parse(day, FORMAT).map(Some).map_err(de::Error::custom)
            }
        }
    }

    /// Patch field: outer `None` is skipped by the caller, `Some(None)` clears the column
    pub fn serialize_patch<S>(date: &Option<Option<Date>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(inner) => serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }
}
