pub mod chapa;
pub mod clock;
pub mod in_memory;
pub mod log_notifier;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
