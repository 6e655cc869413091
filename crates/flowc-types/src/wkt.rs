//! Constructors for protobuf well-known wrapper types.

use crate::pb::google::protobuf::{BoolValue, Duration, UInt32Value, UInt64Value};

/// Convert a std duration into `google.protobuf.Duration`.
pub fn duration(d: std::time::Duration) -> Duration {
    Duration {
        seconds: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        nanos: d.subsec_nanos() as i32,
    }
}

/// Wrap a `u32`.
pub fn u32_value(value: u32) -> UInt32Value {
    UInt32Value { value }
}

/// Wrap a `u64`.
pub fn u64_value(value: u64) -> UInt64Value {
    UInt64Value { value }
}

/// Wrap a `bool`.
pub fn bool_value(value: bool) -> BoolValue {
    BoolValue { value }
}
