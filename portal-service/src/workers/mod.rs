pub mod compaction;

pub use compaction::CompactionJob;
