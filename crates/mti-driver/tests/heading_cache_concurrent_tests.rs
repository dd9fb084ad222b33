//! 航向缓存并发测试
//!
//! 单写多读：读者永远看到某一次完整写入的值，且从不看到 NaN 覆盖有效值。

use mti_driver::{HeadingCache, HeadingSource};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_heading_cache_concurrent_read() {
    let cache = Arc::new(HeadingCache::new());
    let num_threads = 10;
    let writes = 1000;

    let writer = {
        let cache = cache.clone();
        thread::spawn(move || {
            for i in 0..writes {
                cache.publish(i as f64);
                // 夹杂无效值
                cache.publish(f64::NAN);
                thread::yield_now();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..num_threads {
        let cache = cache.clone();
        readers.push(thread::spawn(move || {
            let mut seen_valid = false;
            for _ in 0..writes {
                let state = cache.snapshot();
                if seen_valid {
                    // 一旦有效就不会再回到未知
                    assert!(state.is_known());
                }
                if state.is_known() {
                    seen_valid = true;
                    assert!(state.updated_at.is_some());
                    assert!(state.yaw >= 0.0 && state.yaw < writes as f64);
                    assert_eq!(state.yaw.fract(), 0.0);
                }
                thread::yield_now();
            }
        }));
    }

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(cache.latest_heading(), (writes - 1) as f64);
}

proptest! {
    /// 任意写入序列之后，缓存等于最后一个有限值（没有则为 NaN）
    #[test]
    fn cache_holds_last_valid_value(
        values in prop::collection::vec(
            prop_oneof![
                Just(f64::NAN),
                Just(f64::INFINITY),
                Just(f64::NEG_INFINITY),
                -180.0..180.0f64,
            ],
            0..50,
        )
    ) {
        let cache = HeadingCache::new();
        for v in &values {
            cache.publish(*v);
        }

        match values.iter().rev().find(|v| v.is_finite()) {
            Some(expected) => prop_assert_eq!(cache.load(), *expected),
            None => prop_assert!(cache.load().is_nan()),
        }
    }

    /// publish 只接受有限值
    #[test]
    fn publish_reports_acceptance(
        yaw in prop_oneof![Just(f64::NAN), Just(f64::INFINITY), any::<f64>()]
    ) {
        let cache = HeadingCache::new();
        prop_assert_eq!(cache.publish(yaw), yaw.is_finite());
    }
}
