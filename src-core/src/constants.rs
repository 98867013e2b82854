/// Date format used on the wire for goal and allocation dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Chart window around today for the weekly view
pub const WEEKS_LOOK_BACK: u32 = 12;
pub const WEEKS_LOOK_FORWARD: u32 = 12;

/// Chart window around today for the monthly view
pub const MONTHS_LOOK_BACK: u32 = 6;
pub const MONTHS_LOOK_FORWARD: u32 = 6;

/// Chart window around today for the yearly view
pub const YEARS_LOOK_BACK: u32 = 3;
pub const YEARS_LOOK_FORWARD: u32 = 3;

/// Spans up to this many days get weekly ticks in the "all" view
pub const ALL_WEEKLY_MAX_DAYS: i64 = 92;
/// Spans up to this many months get monthly ticks in the "all" view
pub const ALL_MONTHLY_MAX_MONTHS: u32 = 36;

/// Upper bound on the combined allocation of one account
pub const MAX_ALLOCATION_PERCENT: f64 = 100.0;

/// Time-to-live for cached valuation history ranges
pub const VALUATION_CACHE_TTL_SECS: u64 = 300;
pub const VALUATION_CACHE_CAPACITY: u64 = 1_000;
