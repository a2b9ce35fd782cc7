// Identifiers and secrets are added as encoded query pairs or path segments
pub const TIKTOK_API_BASE: &str = "https://www.tiktok.com/api/video/details/";
pub const INSTAGRAM_API_BASE: &str = "https://graph.instagram.com/";
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/videos";

pub const INSTAGRAM_TOKEN_ENV: &str = "INSTAGRAM_ACCESS_TOKEN";
pub const YOUTUBE_KEY_ENV: &str = "YOUTUBE_API_KEY";

pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DATA_DIR: &str = "data";

// Samples above this many views/min get the "nice prospect" label
pub const HIGH_GROWTH_THRESHOLD: f64 = 100.0;
pub const HIGH_GROWTH_LABEL: &str = "nice prospect";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Granularity of the interruptible sleep between cycles
pub const SLEEP_SLICE_MS: u64 = 200;
