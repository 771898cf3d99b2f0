// Store transactions and undo/redo: grouped commits, rollback of abandoned
// work, and history that is journaled like any other change.

use order_key::journal::{JournalRecord, JournalWriter, SyncPolicy};
use order_key::{Error, ItemId, Mutation, OrderKey, Options, Store};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn values(store: &Store) -> Vec<String> {
    store
        .iter()
        .map(|item| String::from_utf8(item.value.clone()).unwrap())
        .collect()
}

fn snapshot(store: &Store) -> Vec<(ItemId, String, Vec<u8>)> {
    store
        .iter()
        .map(|item| (item.id, item.key.to_string(), item.value.clone()))
        .collect()
}

// =============================================================================
// Test 1: A transaction is journaled as one batch
// =============================================================================
#[test]
fn transaction_commits_as_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();

    let ids = store
        .with_transaction(|txn| {
            let a = txn.push_back(b"a".to_vec())?;
            let c = txn.push_back(b"c".to_vec())?;
            let b = txn.insert_after(Some(a), b"b".to_vec())?;
            assert_eq!(txn.mutations().len(), 3);
            Ok([a, b, c])
        })
        .unwrap();

    assert_eq!(values(&store), ["a", "b", "c"]);
    // Batch header plus three inserts.
    assert_eq!(store.stats().journal_records, 4);
    let before = snapshot(&store);
    drop(store);

    let store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(snapshot(&store), before);
    assert!(ids.iter().all(|id| store.get(*id).is_some()));
}

// =============================================================================
// Test 2: An error inside the transaction reverts and journals nothing
// =============================================================================
#[test]
fn failed_transaction_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();
    let keep = store.push_back(b"keep".to_vec()).unwrap();
    let before = snapshot(&store);

    let result = store.with_transaction(|txn| {
        txn.push_front(b"new".to_vec())?;
        txn.update(keep, b"changed".to_vec())?;
        txn.remove(ItemId(99))
    });

    assert!(matches!(result, Err(Error::NotFound)));
    assert_eq!(snapshot(&store), before);
    assert_eq!(store.stats().journal_records, 1);
    assert_eq!(store.stats().undo_depth, 1);
}

// =============================================================================
// Test 3: Staged work is visible inside, reverted when dropped
// =============================================================================
#[test]
fn dropped_transaction_reverts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();
    let a = store.push_back(b"a".to_vec()).unwrap();
    let b = store.push_back(b"b".to_vec()).unwrap();
    let before = snapshot(&store);

    {
        let mut txn = store.transaction();
        txn.move_after(Some(b), a).unwrap();
        txn.remove(b).unwrap();
        let c = txn.push_back(b"c".to_vec()).unwrap();
        assert!(txn.get(b).is_none());
        assert_eq!(txn.list().len(), 2);
        assert!(txn.get(c).is_some());
        txn.rollback();
    }

    assert_eq!(snapshot(&store), before);
    assert_eq!(store.stats().journal_records, 2);
}

// =============================================================================
// Test 4: An empty transaction writes nothing and leaves no history
// =============================================================================
#[test]
fn empty_transaction_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();
    let a = store.push_back(b"a".to_vec()).unwrap();

    store.transaction().commit().unwrap();
    store.with_transaction(|txn| txn.move_after(None, a)).unwrap();

    let stats = store.stats();
    assert_eq!(stats.journal_records, 1);
    assert_eq!(stats.undo_depth, 1);
}

// =============================================================================
// Test 5: A batch cut short by a crash is dropped on open
// =============================================================================
#[test]
fn torn_batch_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    {
        let mut store = Store::open(&path, Options::default()).unwrap();
        store.push_back(b"a".to_vec()).unwrap();
    }
    let valid_len = std::fs::metadata(&path).unwrap().len();
    {
        // Header promises two mutations; only one made it.
        let mut writer = JournalWriter::new(&path, SyncPolicy::EveryWrite).unwrap();
        writer
            .append_all(&[
                JournalRecord::Batch { count: 2 },
                JournalRecord::new(Mutation::Insert {
                    id: ItemId(1),
                    key: OrderKey::new("u").unwrap(),
                    value: b"b".to_vec(),
                }),
            ])
            .unwrap();
    }

    let mut store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(values(&store), ["a"]);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), valid_len);
    assert_eq!(store.stats().journal_records, 1);

    store.push_back(b"c".to_vec()).unwrap();
    drop(store);
    let store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(values(&store), ["a", "c"]);
}

// =============================================================================
// Test 6: A control record inside a batch is corruption
// =============================================================================
#[test]
fn nested_batch_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    {
        let mut writer = JournalWriter::new(&path, SyncPolicy::EveryWrite).unwrap();
        writer
            .append_all(&[
                JournalRecord::Batch { count: 2 },
                JournalRecord::Batch { count: 1 },
            ])
            .unwrap();
    }

    assert!(matches!(
        Store::open(&path, Options::default()),
        Err(Error::Corruption(_))
    ));
}

// =============================================================================
// Test 7: Undo and redo step through every kind of change
// =============================================================================
#[test]
fn undo_redo_each_operation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();
    assert!(!store.undo().unwrap());
    assert!(!store.redo().unwrap());

    let mut states = vec![snapshot(&store)];
    let a = store.push_back(b"a".to_vec()).unwrap();
    states.push(snapshot(&store));
    let b = store.push_back(b"b".to_vec()).unwrap();
    states.push(snapshot(&store));
    store.move_after(None, b).unwrap();
    states.push(snapshot(&store));
    store.update(a, b"a2".to_vec()).unwrap();
    states.push(snapshot(&store));
    store.remove(b).unwrap();
    states.push(snapshot(&store));

    for expected in states.iter().rev().skip(1) {
        assert!(store.undo().unwrap());
        assert_eq!(&snapshot(&store), expected);
    }
    assert!(!store.undo().unwrap());

    for expected in states.iter().skip(1) {
        assert!(store.redo().unwrap());
        assert_eq!(&snapshot(&store), expected);
    }
    assert!(!store.redo().unwrap());
}

// =============================================================================
// Test 8: Undo reverts a whole transaction
// =============================================================================
#[test]
fn undo_reverts_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();
    store.push_back(b"a".to_vec()).unwrap();
    let before = snapshot(&store);

    store
        .with_transaction(|txn| {
            let x = txn.push_front(b"x".to_vec())?;
            txn.push_back(b"y".to_vec())?;
            txn.remove(x)?;
            Ok(())
        })
        .unwrap();
    assert_eq!(values(&store), ["a", "y"]);

    assert!(store.undo().unwrap());
    assert_eq!(snapshot(&store), before);
}

// =============================================================================
// Test 9: A new commit clears redo
// =============================================================================
#[test]
fn commit_clears_redo() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let mut store = Store::open(&path, Options::default()).unwrap();
    store.push_back(b"a".to_vec()).unwrap();
    store.undo().unwrap();
    assert_eq!(store.stats().redo_depth, 1);

    store.push_back(b"b".to_vec()).unwrap();
    assert_eq!(store.stats().redo_depth, 0);
    assert!(!store.redo().unwrap());
    assert_eq!(values(&store), ["b"]);
}

// =============================================================================
// Test 10: Undo is journaled; history itself does not survive reopen
// =============================================================================
#[test]
fn undo_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    {
        let mut store = Store::open(&path, Options::default()).unwrap();
        let a = store.push_back(b"a".to_vec()).unwrap();
        store.update(a, b"changed".to_vec()).unwrap();
        store.push_back(b"b".to_vec()).unwrap();
        store.undo().unwrap();
        store.undo().unwrap();
    }

    let mut store = Store::open(&path, Options::default()).unwrap();
    assert_eq!(values(&store), ["a"]);
    assert!(!store.undo().unwrap());
}

// =============================================================================
// Test 11: History is capped by history_limit
// =============================================================================
#[test]
fn history_limit_caps_undo() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let options = Options {
        history_limit: 2,
        ..Options::default()
    };
    let mut store = Store::open(&path, options).unwrap();
    for v in ["a", "b", "c"] {
        store.push_back(v.as_bytes().to_vec()).unwrap();
    }

    assert!(store.undo().unwrap());
    assert!(store.undo().unwrap());
    assert!(!store.undo().unwrap());
    assert_eq!(values(&store), ["a"]);

    let options = Options {
        history_limit: 0,
        ..Options::default()
    };
    let mut store = Store::open(&dir.path().join("other.journal"), options).unwrap();
    store.push_back(b"a".to_vec()).unwrap();
    assert!(!store.undo().unwrap());
}

// =============================================================================
// Test 12: Random workload unwinds step by step, across compactions
// =============================================================================
#[test]
fn random_workload_undoes_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.journal");
    let options = Options {
        sync_policy: SyncPolicy::Never,
        compact_threshold: Some(50),
        history_limit: 1000,
    };
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = Store::open(&path, options.clone()).unwrap();
    let mut states = vec![snapshot(&store)];

    for step in 0..400 {
        let ids: Vec<ItemId> = store.iter().map(|item| item.id).collect();
        let depth = store.stats().undo_depth;
        match rng.gen_range(0..6) {
            0..=2 => {
                let previous = if ids.is_empty() || rng.gen_bool(0.2) {
                    None
                } else {
                    Some(ids[rng.gen_range(0..ids.len())])
                };
                store
                    .insert_after(previous, format!("{step}").into_bytes())
                    .unwrap();
            }
            3 if !ids.is_empty() => {
                let id = ids[rng.gen_range(0..ids.len())];
                store.move_after(None, id).unwrap();
            }
            4 if !ids.is_empty() => {
                let id = ids[rng.gen_range(0..ids.len())];
                store.remove(id).unwrap();
            }
            _ => {
                let previous = ids.first().copied();
                store
                    .with_transaction(|txn| {
                        let x = txn.insert_after(previous, b"x".to_vec())?;
                        txn.update(x, format!("x{step}").into_bytes())?;
                        txn.push_front(b"y".to_vec())?;
                        Ok(())
                    })
                    .unwrap();
            }
        }
        if store.stats().undo_depth > depth {
            states.push(snapshot(&store));
        }
    }
    assert!(store.stats().compactions > 0);

    states.pop();
    while let Some(expected) = states.pop() {
        assert!(store.undo().unwrap());
        assert_eq!(snapshot(&store), expected);
    }
    assert!(store.is_empty());
    drop(store);

    let store = Store::open(&path, options).unwrap();
    assert!(store.is_empty());
}
