pub mod fixtures;
pub mod memory;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{seeded_bytes, write_source_file};
#[allow(unused_imports)]
pub use memory::MemoryStore;
#[allow(unused_imports)]
pub use mocks::FaultStore;
