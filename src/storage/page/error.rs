use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Invalid record size {0}")]
    InvalidRecordSize(usize),
    #[error("Slot {0} is out of range")]
    SlotOutOfRange(usize),
    #[error("Record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSizeMismatch { expected: usize, actual: usize },
    #[error("Corrupt record file header")]
    CorruptHeader,
}
