mod building;
mod debug;
mod feed;
mod reading;

pub use building::*;
pub use debug::*;
pub use feed::*;
pub use reading::*;

use time::OffsetDateTime;

/// Store-assigned building key.
pub type BuildingId = String;

/// Wall clock in epoch milliseconds, the unit every record timestamp uses.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
