use std::sync::Arc;
use std::thread;
use std::time::Duration;
use anyhow::Result;
use crossbeam::channel;

use bayun_kernel::common::types::Rid;
use bayun_kernel::transaction::concurrency::GroupLockMode;
use bayun_kernel::transaction::{
    LockDataId, LockError, LockManager, TransactionManager, TransactionState,
};

const WAIT: Duration = Duration::from_millis(100);

fn setup() -> Arc<TransactionManager> {
    Arc::new(TransactionManager::new(Arc::new(LockManager::new())))
}

#[test]
fn test_shared_locks_are_concurrent() -> Result<()> {
    let tm = setup();
    let rid = Rid::new(1, 0);
    let (tx, rx) = channel::unbounded();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let tm = tm.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let txn = tm.begin(None).unwrap();
                tm.lock_manager().lock_shared_on_record(&txn, rid, 1).unwrap();
                tx.send(txn.id()).unwrap();
                txn
            })
        })
        .collect();

    // Both grants arrive while both transactions still hold their locks
    let mut granted = vec![rx.recv_timeout(WAIT * 10)?, rx.recv_timeout(WAIT * 10)?];
    granted.sort();
    assert_eq!(granted.len(), 2);
    assert_eq!(tm.lock_manager().group_mode(&LockDataId::record(1, rid)), GroupLockMode::S);

    for handle in handles {
        let txn = handle.join().unwrap();
        tm.commit(&txn)?;
    }
    assert_eq!(tm.lock_manager().group_mode(&LockDataId::record(1, rid)), GroupLockMode::NonLock);
    Ok(())
}

#[test]
fn test_exclusive_blocks_until_shared_released() -> Result<()> {
    let tm = setup();
    let rid = Rid::new(2, 3);
    let id = LockDataId::record(9, rid);

    let reader = tm.begin(None)?;
    tm.lock_manager().lock_shared_on_record(&reader, rid, 9)?;

    let (tx, rx) = channel::unbounded();
    let writer = {
        let tm = tm.clone();
        thread::spawn(move || {
            let txn = tm.begin(None).unwrap();
            tm.lock_manager().lock_exclusive_on_record(&txn, rid, 9).unwrap();
            tx.send(()).unwrap();
            txn
        })
    };

    assert!(rx.recv_timeout(WAIT).is_err(), "X granted while S was held");
    assert_eq!(tm.lock_manager().group_mode(&id), GroupLockMode::S);

    tm.commit(&reader)?;
    rx.recv_timeout(WAIT * 10)?;
    assert_eq!(tm.lock_manager().group_mode(&id), GroupLockMode::X);

    let txn = writer.join().unwrap();
    tm.commit(&txn)?;
    Ok(())
}

#[test]
fn test_lock_after_unlock_aborts_transaction() -> Result<()> {
    let tm = setup();
    let txn = tm.begin(None)?;
    let lm = tm.lock_manager();

    lm.lock_is_on_table(&txn, 1)?;
    lm.lock_shared_on_record(&txn, Rid::new(1, 1), 1)?;
    lm.unlock(&txn, LockDataId::record(1, Rid::new(1, 1)))?;
    assert_eq!(txn.state(), TransactionState::Shrinking);

    let result = lm.lock_shared_on_record(&txn, Rid::new(1, 2), 1);
    assert_eq!(result, Err(LockError::LockOnShrinking(txn.id())));
    assert_eq!(txn.state(), TransactionState::Aborted);

    // The caller unwinds with abort, which still releases the table lock
    tm.abort(&txn)?;
    assert_eq!(lm.group_mode(&LockDataId::table(1)), GroupLockMode::NonLock);
    Ok(())
}

#[test]
fn test_intention_locks_then_exclusive() -> Result<()> {
    let tm = setup();
    let fd = 5;
    let table = LockDataId::table(fd);

    let t2 = tm.begin(None)?;
    let t3 = tm.begin(None)?;
    tm.lock_manager().lock_is_on_table(&t2, fd)?;
    tm.lock_manager().lock_ix_on_table(&t3, fd)?;
    assert_eq!(tm.lock_manager().group_mode(&table), GroupLockMode::IX);

    let (tx, rx) = channel::unbounded();
    let exclusive = {
        let tm = tm.clone();
        thread::spawn(move || {
            let txn = tm.begin(None).unwrap();
            tm.lock_manager().lock_exclusive_on_table(&txn, fd).unwrap();
            tx.send(()).unwrap();
            txn
        })
    };

    assert!(rx.recv_timeout(WAIT).is_err());
    tm.commit(&t2)?;
    assert!(rx.recv_timeout(WAIT).is_err(), "X granted while IX was held");
    assert_eq!(tm.lock_manager().group_mode(&table), GroupLockMode::IX);

    tm.commit(&t3)?;
    rx.recv_timeout(WAIT * 10)?;
    assert_eq!(tm.lock_manager().group_mode(&table), GroupLockMode::X);

    let txn = exclusive.join().unwrap();
    tm.commit(&txn)?;
    assert_eq!(tm.lock_manager().group_mode(&table), GroupLockMode::NonLock);
    Ok(())
}

#[test]
fn test_update_lock_excludes_update() -> Result<()> {
    let tm = setup();
    let rid = Rid::new(1, 7);
    let id = LockDataId::record(3, rid);

    let t1 = tm.begin(None)?;
    let t2 = tm.begin(None)?;
    tm.lock_manager().lock_update_on_record(&t1, rid, 3)?;
    tm.lock_manager().lock_shared_on_record(&t2, rid, 3)?;
    assert_eq!(tm.lock_manager().group_mode(&id), GroupLockMode::U);

    let (tx, rx) = channel::unbounded();
    let waiter = {
        let tm = tm.clone();
        thread::spawn(move || {
            let txn = tm.begin(None).unwrap();
            tm.lock_manager().lock_update_on_record(&txn, rid, 3).unwrap();
            tx.send(()).unwrap();
            txn
        })
    };

    assert!(rx.recv_timeout(WAIT).is_err());
    tm.commit(&t1)?;
    rx.recv_timeout(WAIT * 10)?;

    tm.commit(&t2)?;
    let txn = waiter.join().unwrap();
    tm.commit(&txn)?;
    Ok(())
}

#[test]
fn test_six_on_table() -> Result<()> {
    let tm = setup();
    let t1 = tm.begin(None)?;
    let t2 = tm.begin(None)?;

    tm.lock_manager().lock_six_on_table(&t1, 4)?;
    tm.lock_manager().lock_is_on_table(&t2, 4)?;
    assert_eq!(tm.lock_manager().group_mode(&LockDataId::table(4)), GroupLockMode::SIX);

    tm.commit(&t1)?;
    assert_eq!(tm.lock_manager().group_mode(&LockDataId::table(4)), GroupLockMode::IS);
    tm.commit(&t2)?;
    Ok(())
}
