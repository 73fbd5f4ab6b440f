use std::collections::HashSet;
use std::thread;
use anyhow::Result;

use bayun_kernel::common::types::{Rid, INVALID_PAGE_NO};
use bayun_kernel::storage::buffer::ReplacerPolicy;
use bayun_kernel::storage::page::{PageError, RecordPageHeader};
use bayun_kernel::storage::record::RecordError;

mod common;
use common::{create_test_table, create_test_table_with, make_record};

#[test]
fn test_insert_get_round_trip() -> Result<()> {
    let t = create_test_table(16, 32)?;

    let rec = make_record(7, 32);
    let rid = t.table.insert_record(&rec)?;
    assert_eq!(rid, Rid::new(1, 0));
    assert_eq!(t.table.get_record(rid)?, Some(rec));
    assert!(t.table.is_record(rid)?);

    Ok(())
}

#[test]
fn test_delete_then_absent() -> Result<()> {
    let t = create_test_table(16, 32)?;

    let rid = t.table.insert_record(&make_record(1, 32))?;
    t.table.delete_record(rid)?;
    assert_eq!(t.table.get_record(rid)?, None);
    assert!(!t.table.is_record(rid)?);

    let result = t.table.delete_record(rid);
    assert!(matches!(result, Err(RecordError::RecordNotFound(r)) if r == rid));
    let result = t.table.update_record(rid, &make_record(2, 32));
    assert!(matches!(result, Err(RecordError::RecordNotFound(_))));

    Ok(())
}

#[test]
fn test_update_record() -> Result<()> {
    let t = create_test_table(16, 16)?;

    let rid = t.table.insert_record(&make_record(1, 16))?;
    t.table.update_record(rid, &make_record(2, 16))?;
    assert_eq!(t.table.get_record(rid)?, Some(make_record(2, 16)));

    Ok(())
}

#[test]
fn test_invalid_arguments() -> Result<()> {
    let t = create_test_table(16, 16)?;
    let capacity = t.table.layout().num_records_per_page() as i32;

    let result = t.table.insert_record(&[0u8; 15]);
    assert!(matches!(
        result,
        Err(RecordError::PageError(PageError::RecordSizeMismatch { expected: 16, actual: 15 }))
    ));

    let result = t.table.get_record(Rid::new(1, capacity));
    assert!(matches!(result, Err(RecordError::InvalidRid(_))));

    let result = t.table.get_record(Rid::new(3, 0));
    assert!(matches!(result, Err(RecordError::PageNotExist(3))));

    let result = t.record_manager.create_file(t.dir.path().join("bad.tbl"), 0);
    assert!(matches!(result, Err(RecordError::PageError(PageError::InvalidRecordSize(0)))));

    Ok(())
}

#[test]
fn test_free_list_transitions() -> Result<()> {
    // 1000-byte records fit 4 to a page
    let t = create_test_table(16, 1000)?;
    assert_eq!(t.table.layout().num_records_per_page(), 4);

    let rids: Vec<Rid> = (0..4).map(|i| t.table.insert_record(&make_record(i, 1000))).collect::<Result<_, _>>()?;
    assert!(rids.iter().all(|r| r.page_no == 1));
    assert_eq!(t.table.file_header().first_free_page_no, INVALID_PAGE_NO);

    // Full page goes back on the list exactly once
    t.table.delete_record(rids[1])?;
    t.table.delete_record(rids[2])?;
    assert_eq!(t.table.file_header().first_free_page_no, 1);

    // Refill: slots are reused and the page leaves the list again
    assert_eq!(t.table.insert_record(&make_record(10, 1000))?, rids[1]);
    assert_eq!(t.table.insert_record(&make_record(11, 1000))?, rids[2]);
    assert_eq!(t.table.file_header().first_free_page_no, INVALID_PAGE_NO);

    // The next insert must open page 2, not revisit page 1
    let rid = t.table.insert_record(&make_record(12, 1000))?;
    assert_eq!(rid, Rid::new(2, 0));
    assert_eq!(t.table.file_header().first_free_page_no, 2);
    assert_eq!(t.table.num_pages(), 3);

    Ok(())
}

#[test]
fn test_scan_completeness_and_order() -> Result<()> {
    let t = create_test_table(8, 200)?;
    let n = 150;

    let mut inserted = Vec::new();
    for i in 0..n {
        inserted.push(t.table.insert_record(&make_record(i, 200))?);
    }

    let scanned: Vec<Rid> = t.table.scan()?.collect::<Result<_, _>>()?;
    assert_eq!(scanned.len(), n as usize);
    assert!(scanned.windows(2).all(|w| w[0] < w[1]));
    let distinct: HashSet<Rid> = scanned.iter().copied().collect();
    assert_eq!(distinct.len(), scanned.len());

    inserted.sort();
    assert_eq!(scanned, inserted);

    Ok(())
}

#[test]
fn test_scan_skips_empty_pages() -> Result<()> {
    let t = create_test_table(16, 1000)?;

    let rids: Vec<Rid> = (0..10).map(|i| t.table.insert_record(&make_record(i, 1000))).collect::<Result<_, _>>()?;
    // Empty out page 1 entirely and page 2 partially
    for rid in rids.iter().filter(|r| r.page_no == 1) {
        t.table.delete_record(*rid)?;
    }
    t.table.delete_record(Rid::new(2, 0))?;

    let scanned: Vec<Rid> = t.table.scan()?.collect::<Result<_, _>>()?;
    assert_eq!(scanned.first(), Some(&Rid::new(2, 1)));
    assert_eq!(scanned.len(), 5);

    let mut scan = t.table.scan()?;
    let mut count = 0;
    while !scan.is_end() {
        assert!(t.table.is_record(scan.rid())?);
        scan.advance()?;
        count += 1;
    }
    assert_eq!(count, 5);

    Ok(())
}

#[test]
fn test_scan_empty_file() -> Result<()> {
    let t = create_test_table(4, 64)?;

    let scan = t.table.scan()?;
    assert!(scan.is_end());
    assert_eq!(scan.count(), 0);

    Ok(())
}

#[test]
fn test_insert_at_restores_location() -> Result<()> {
    let t = create_test_table(16, 1000)?;

    // Beyond the end of the file: pages are added up to the target
    let far = Rid::new(3, 2);
    t.table.insert_record_at(far, &make_record(1, 1000))?;
    assert_eq!(t.table.num_pages(), 4);
    assert_eq!(t.table.get_record(far)?, Some(make_record(1, 1000)));

    // Free list is now 3 -> 2 -> 1. Filling page 1 with forced inserts must
    // unlink it from the tail.
    for slot in 0..4 {
        t.table.insert_record_at(Rid::new(1, slot), &make_record(slot as u32, 1000))?;
    }
    assert_eq!(t.table.file_header().first_free_page_no, 3);

    let mut seen = HashSet::new();
    let mut page_no = t.table.file_header().first_free_page_no;
    while page_no != INVALID_PAGE_NO {
        assert!(seen.insert(page_no), "free list loops at page {}", page_no);
        page_no = next_free(&t, page_no)?;
    }
    assert_eq!(seen, HashSet::from([2, 3]));

    // Ordinary inserts never land on the full page
    for i in 0..8 {
        let rid = t.table.insert_record(&make_record(100 + i, 1000))?;
        assert_ne!(rid.page_no, 1);
    }

    Ok(())
}

fn next_free(t: &common::TestTable, page_no: i32) -> Result<i32> {
    let mut buf = vec![0u8; bayun_kernel::PAGE_SIZE];
    t.buffer_pool.flush_all_pages(t.table.fd())?;
    t.buffer_pool.disk_manager().read_page(t.table.fd(), page_no, &mut buf)?;
    Ok(RecordPageHeader::from_bytes(&buf).next_free_page_no)
}

#[test]
fn test_reopen_persists_records() -> Result<()> {
    let t = create_test_table(4, 100)?;

    let mut rids = Vec::new();
    for i in 0..200 {
        rids.push(t.table.insert_record(&make_record(i, 100))?);
    }
    t.table.delete_record(rids[17])?;
    let header = t.table.file_header();

    let t = t.reopen(4)?;
    assert_eq!(t.table.file_header(), header);
    assert_eq!(t.table.get_record(rids[17])?, None);
    for (i, rid) in rids.iter().enumerate().filter(|(i, _)| *i != 17) {
        assert_eq!(t.table.get_record(*rid)?, Some(make_record(i as u32, 100)));
    }

    // Inserting after reopen reuses the freed slot first
    assert_eq!(t.table.insert_record(&make_record(999, 100))?, rids[17]);

    Ok(())
}

#[test]
fn test_destroy_file() -> Result<()> {
    let t = create_test_table(4, 8)?;
    let path = t.path.clone();

    t.record_manager.close_file(&t.table)?;
    t.record_manager.destroy_file(&path)?;
    assert!(!path.exists());

    Ok(())
}

#[test]
fn test_concurrent_insert_delete() -> Result<()> {
    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 400;
    const RECORD_SIZE: usize = 500;

    for policy in [ReplacerPolicy::Lru, ReplacerPolicy::Clock] {
        // Far fewer frames than pages, so threads keep evicting each other's pages
        let t = create_test_table_with(10, RECORD_SIZE, policy)?;

        let handles: Vec<_> = (0..THREADS)
            .map(|n| {
                let table = t.table.clone();
                thread::spawn(move || -> Result<Vec<(Rid, u32)>> {
                    let mut kept = Vec::new();
                    for i in 0..PER_THREAD {
                        let seed = n * 10_000 + i;
                        let rid = table.insert_record(&make_record(seed, RECORD_SIZE))?;
                        assert_eq!(table.get_record(rid)?, Some(make_record(seed, RECORD_SIZE)));
                        if i % 2 == 1 {
                            table.delete_record(rid)?;
                        } else {
                            kept.push((rid, seed));
                        }
                    }
                    Ok(kept)
                })
            })
            .collect();

        let mut kept = Vec::new();
        for handle in handles {
            kept.extend(handle.join().unwrap()?);
        }
        assert_eq!(kept.len(), (THREADS * PER_THREAD / 2) as usize);

        let distinct: HashSet<Rid> = kept.iter().map(|(rid, _)| *rid).collect();
        assert_eq!(distinct.len(), kept.len(), "two live records share a rid under {:?}", policy);
        for (rid, seed) in &kept {
            assert_eq!(t.table.get_record(*rid)?, Some(make_record(*seed, RECORD_SIZE)));
        }

        let scanned: Vec<Rid> = t.table.scan()?.collect::<Result<_, _>>()?;
        assert_eq!(scanned.len(), kept.len());
        assert_eq!(scanned.into_iter().collect::<HashSet<_>>(), distinct);
        assert_eq!(
            t.buffer_pool.evictable_count(),
            t.buffer_pool.pool_size() - t.buffer_pool.free_frame_count()
        );
    }

    Ok(())
}
