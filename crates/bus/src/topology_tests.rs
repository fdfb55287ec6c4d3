// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lapin::types::ShortString;

fn get(args: &FieldTable, key: &str) -> Option<AMQPValue> {
    args.inner().get(&ShortString::from(key)).cloned()
}

#[test]
fn log_queue_args_bound_the_queue() {
    let args = LogQueueConfig::default().to_args();
    assert_eq!(
        get(&args, "x-message-ttl"),
        Some(AMQPValue::LongUInt(180_000))
    );
    assert_eq!(get(&args, "x-max-length"), Some(AMQPValue::LongUInt(500)));
    assert_eq!(
        get(&args, "x-overflow"),
        Some(AMQPValue::LongString("drop-head".into()))
    );
}

#[test]
fn log_queue_args_honor_overrides() {
    let config = LogQueueConfig {
        ttl_ms: 60_000,
        max_messages: 100,
    };
    let args = config.to_args();
    assert_eq!(
        get(&args, "x-message-ttl"),
        Some(AMQPValue::LongUInt(60_000))
    );
    assert_eq!(get(&args, "x-max-length"), Some(AMQPValue::LongUInt(100)));
}
