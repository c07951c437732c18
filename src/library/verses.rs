//! Splitting lyrics into verses and slicing a window out of them.

use super::error::LibraryError;
use serde::Serialize;

/// Verses are separated by one blank line.
pub const VERSE_SEPARATOR: &str = "\n\n";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verse {
    pub verse: String,
}

pub fn split_verses(lyrics: &str) -> Vec<&str> {
    lyrics.split(VERSE_SEPARATOR).collect()
}

/// Returns `count` consecutive verses starting at the 1-based `start`.
///
/// A negative `count` yields no verses. The window must lie entirely within
/// the lyrics, otherwise `VerseOutOfBounds` is returned and nothing is sliced.
pub fn extract_verses(lyrics: &str, start: i64, count: i64) -> Result<Vec<Verse>, LibraryError> {
    let verses = split_verses(lyrics);
    let count = count.max(0);
    let offset = start.saturating_sub(1);
    let end = offset.saturating_add(count);

    if offset < 0 || end > verses.len() as i64 {
        return Err(LibraryError::VerseOutOfBounds {
            start,
            count,
            available: verses.len(),
        });
    }

    Ok(verses[offset as usize..end as usize]
        .iter()
        .map(|v| Verse {
            verse: v.to_string(),
        })
        .collect())
}
