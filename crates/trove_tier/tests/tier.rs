// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `CacheTier` defaults, `DynamicTier` and `MockTier`.

use std::{collections::HashMap, sync::Mutex};

use futures::executor::block_on;
use trove_tier::{
    CacheEntry, CacheTier, DynamicTierExt, Error,
    testing::{MockTier, TierOp},
};

/// Implements only the required methods.
struct MinimalTier {
    data: Mutex<HashMap<String, CacheEntry<String>>>,
}

impl MinimalTier {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl CacheTier<String, String> for MinimalTier {
    async fn get(&self, key: &String) -> Result<Option<CacheEntry<String>>, Error> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn insert(&self, key: &String, entry: CacheEntry<String>) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").insert(key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &String) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").clear();
        Ok(())
    }
}

fn key(s: &str) -> String {
    s.to_string()
}

#[test]
fn defaults_for_optional_methods() {
    let tier = MinimalTier::new();
    block_on(tier.ping()).expect("default ping succeeds");
    assert_eq!(tier.len(), None);
    assert_eq!(tier.is_empty(), None);
}

#[test]
fn dynamic_tier_delegates_to_inner_tier() {
    block_on(async {
        let mock = MockTier::<String, String>::new();
        let dynamic = mock.clone().into_dynamic();
        let copy = dynamic.clone();

        dynamic.insert(&key("a"), CacheEntry::new(key("1"))).await.expect("insert");
        let got = copy.get(&key("a")).await.expect("get");
        assert_eq!(got.map(CacheEntry::into_value), Some(key("1")));
        assert_eq!(dynamic.len(), Some(1));

        copy.invalidate(&key("a")).await.expect("invalidate");
        assert!(!mock.contains_key(&key("a")));
        assert_eq!(dynamic.is_empty(), Some(true));

        dynamic.ping().await.expect("ping");
        assert_eq!(mock.operations().last(), Some(&TierOp::Ping));
    });
}

#[test]
fn mock_records_operations_in_order() {
    block_on(async {
        let mock = MockTier::<String, u32>::new();
        mock.insert(&key("k"), CacheEntry::new(1)).await.expect("insert");
        let _ = mock.get(&key("k")).await.expect("get");
        mock.clear().await.expect("clear");

        assert_eq!(
            mock.operations(),
            vec![
                TierOp::Insert {
                    key: key("k"),
                    entry: CacheEntry::new(1),
                },
                TierOp::Get(key("k")),
                TierOp::Clear,
            ]
        );
        assert_eq!(mock.entry_count(), 0);
    });
}

#[test]
fn mock_fails_only_matching_calls() {
    block_on(async {
        let mock = MockTier::<String, u32>::new();
        mock.fail_when(|op| op.key().is_some_and(|k| k == "bad"));

        assert!(mock.insert(&key("bad"), CacheEntry::new(1)).await.is_err());
        mock.insert(&key("good"), CacheEntry::new(2)).await.expect("insert");
        assert!(!mock.contains_key(&key("bad")));
        assert!(mock.contains_key(&key("good")));

        mock.fail_when(|op| matches!(op, TierOp::Ping));
        let err = mock.ping().await.expect_err("ping should fail");
        assert!(err.to_string().contains("ping failed"));

        mock.clear_failures();
        mock.ping().await.expect("ping after clearing failures");
    });
}

#[test]
fn mock_with_data_is_prepopulated() {
    let mut data = HashMap::new();
    data.insert(key("seed"), CacheEntry::new(9_u32));
    let mock = MockTier::with_data(data);

    assert_eq!(mock.peek(&key("seed")).map(CacheEntry::into_value), Some(9));
    assert!(mock.operations().is_empty());
}
