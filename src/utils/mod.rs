pub mod config_loader;
pub mod time;
pub mod token_cache;

pub use config_loader::{LoadConfigError, load_from_file, load_from_file_sync};
pub use time::{bucket_start, day_ago_bucket, in_range, unix_now};
pub use token_cache::{CacheItem, CacheStats, TokenTtlCache};
