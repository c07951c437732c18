//! Song records and the filter used to list them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Format of release dates in requests and responses, e.g. `16.07.2006`.
pub const RELEASE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Format of release dates inside the database, sortable and comparable as text.
pub const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a user-facing `DD.MM.YYYY` date.
pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RELEASE_DATE_FORMAT).ok()
}

/// Serde adapter for `DD.MM.YYYY` dates.
pub mod release_date_format {
    use super::RELEASE_DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(RELEASE_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(raw.trim(), RELEASE_DATE_FORMAT).map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid release date '{}', expected DD.MM.YYYY",
                raw
            ))
        })
    }

    pub mod option {
        use super::RELEASE_DATE_FORMAT;
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer};

        /// Missing, null and empty values all mean "no date".
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => NaiveDate::parse_from_str(value, RELEASE_DATE_FORMAT)
                    .map(Some)
                    .map_err(|_| {
                        serde::de::Error::custom(format!(
                            "invalid release date '{}', expected DD.MM.YYYY",
                            value
                        ))
                    }),
            }
        }
    }
}

/// A stored song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    #[serde(rename = "song")]
    pub title: String,
    pub group: String,
    #[serde(rename = "releaseDate", with = "release_date_format")]
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
}

/// A song that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSong {
    pub title: String,
    pub group: String,
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
}

impl NewSong {
    pub fn with_id(self, id: i64) -> Song {
        Song {
            id,
            title: self.title,
            group: self.group,
            release_date: self.release_date,
            text: self.text,
            link: self.link,
        }
    }
}

/// Optional constraints for listing songs.
///
/// Every `Some` field must match; `limit` and `offset` of 0 mean "no cap"
/// and "no skip". Negative values are rejected by the query builder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SongFilter {
    pub title: Option<String>,
    pub group: Option<String>,
    pub release_date: Option<NaiveDate>,
    /// Substring that must appear somewhere in the lyrics.
    pub text: Option<String>,
    pub link: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
impl SongFilter {
    /// True when `song` satisfies every field constraint (limit/offset are ignored).
    pub(crate) fn matches(&self, song: &Song) -> bool {
        self.title.as_ref().map_or(true, |t| &song.title == t)
            && self.group.as_ref().map_or(true, |g| &song.group == g)
            && self.release_date.map_or(true, |d| song.release_date == d)
            && self.text.as_ref().map_or(true, |t| song.text.contains(t.as_str()))
            && self.link.as_ref().map_or(true, |l| &song.link == l)
    }
}
