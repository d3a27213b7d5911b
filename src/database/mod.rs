mod customer;
mod memory;

pub use customer::{CustomerDatabase, CustomerFilter, CustomerStore};
pub use memory::MemoryDatabase;
