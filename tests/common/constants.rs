//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When the songs known to the fake metadata service change, update only this file.

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for the test server to answer its first request
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Poll interval while waiting for the test server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout for every request made by `TestClient`
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Songs known to the fake metadata service
// ============================================================================

pub const MUSE: &str = "Muse";
pub const RADIOHEAD: &str = "Radiohead";

pub const SUPERMASSIVE_TITLE: &str = "Supermassive Black Hole";
pub const SUPERMASSIVE_RELEASE_DATE: &str = "16.07.2006";
pub const SUPERMASSIVE_TEXT: &str = "Ooh baby, don't you know I suffer?\nOoh baby, can you hear me moan?\n\nYou caught me under false pretenses\nHow long before you let me go?\n\nOoh\nYou set my soul alight";
pub const SUPERMASSIVE_LINK: &str = "https://www.youtube.com/watch?v=Xsp3_a-PMTw";

pub const STARLIGHT_TITLE: &str = "Starlight";
pub const STARLIGHT_RELEASE_DATE: &str = "04.09.2006";
pub const STARLIGHT_TEXT: &str = "Far away\nThis ship is taking me far away\n\nMy life\nYou electrify my life";
pub const STARLIGHT_LINK: &str = "https://www.youtube.com/watch?v=Pgum6OT_VH8";

pub const CREEP_TITLE: &str = "Creep";
pub const CREEP_RELEASE_DATE: &str = "21.09.1992";
pub const CREEP_TEXT: &str = "When you were here before\nCouldn't look you in the eye\n\nBut I'm a creep\nI'm a weirdo";
pub const CREEP_LINK: &str = "https://www.youtube.com/watch?v=XFkzRNyygfk";

/// Group for which the fake metadata service always answers 503
pub const UNAVAILABLE_GROUP: &str = "Offline Band";
