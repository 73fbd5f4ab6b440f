use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use bayun_kernel::storage::buffer::{BufferPoolManager, ReplacerPolicy};
use bayun_kernel::storage::disk::DiskManager;
use bayun_kernel::storage::record::RecordManager;
use bayun_kernel::transaction::{LockManager, TransactionManager, WriteRecord};
use bayun_kernel::KernelConfig;

const RECORD_SIZE: usize = 64;

#[derive(Parser)]
#[command(author, version, about = "Bayun kernel demo - record storage under two-phase locking")]
struct Cli {
    /// Directory for the demo table
    #[arg(short, long, default_value = "data")]
    db_dir: PathBuf,

    /// Buffer pool size (number of frames)
    #[arg(short, long, default_value_t = 256)]
    pool_size: usize,

    /// Page replacement policy (lru or clock)
    #[arg(short, long, default_value = "lru")]
    replacer: ReplacerPolicy,

    /// Number of records to insert
    #[arg(short = 'n', long, default_value_t = 1000)]
    records: usize,
}

fn make_record(i: usize) -> Vec<u8> {
    let mut buf = vec![0u8; RECORD_SIZE];
    let text = format!("record #{}", i);
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = KernelConfig {
        db_dir: cli.db_dir,
        buffer_pool_size: cli.pool_size,
        replacer: cli.replacer,
    };
    std::fs::create_dir_all(&config.db_dir)
        .with_context(|| format!("cannot create {}", config.db_dir.display()))?;

    let disk = Arc::new(DiskManager::new());
    let bpm = Arc::new(BufferPoolManager::with_config(&config, disk));
    let rm = RecordManager::new(bpm.clone());
    let tm = TransactionManager::new(Arc::new(LockManager::new()));

    let path = config.db_dir.join("demo.tbl");
    if path.exists() {
        rm.destroy_file(&path)?;
    }
    rm.create_file(&path, RECORD_SIZE)?;
    let table = rm.open_file(&path)?;
    let fd = table.fd();

    // Committed load
    let txn = tm.begin(None)?;
    tm.lock_manager().lock_ix_on_table(&txn, fd)?;
    for i in 0..cli.records {
        let rid = table.insert_record(&make_record(i))?;
        tm.lock_manager().lock_exclusive_on_record(&txn, rid, fd)?;
        txn.append_write_record(WriteRecord::Insert { table: table.clone(), rid });
    }
    tm.commit(&txn)?;
    info!("loaded {} records into {}", cli.records, path.display());

    // A second transaction whose writes are rolled back
    let txn = tm.begin(None)?;
    tm.lock_manager().lock_ix_on_table(&txn, fd)?;
    let mut undone = 0;
    for i in 0..cli.records.min(10) {
        let rid = table.insert_record(&make_record(cli.records + i))?;
        tm.lock_manager().lock_exclusive_on_record(&txn, rid, fd)?;
        txn.append_write_record(WriteRecord::Insert { table: table.clone(), rid });
        undone += 1;
    }
    tm.abort(&txn)?;

    let reader = tm.begin(None)?;
    tm.lock_manager().lock_shared_on_table(&reader, fd)?;
    let mut scanned = 0;
    for rid in table.scan()? {
        rid?;
        scanned += 1;
    }
    tm.commit(&reader)?;

    let header = table.file_header();
    println!("table:            {}", path.display());
    println!("replacer:         {:?}", config.replacer);
    println!("records per page: {}", header.num_records_per_page);
    println!("pages:            {}", header.num_pages);
    println!("inserted:         {}", cli.records);
    println!("rolled back:      {}", undone);
    println!("scanned:          {}", scanned);
    println!(
        "pool:             {} frames, {} free, {} evictable",
        bpm.pool_size(),
        bpm.free_frame_count(),
        bpm.evictable_count()
    );

    rm.close_file(&table)?;
    Ok(())
}
