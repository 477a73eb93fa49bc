pub mod claim;
pub mod page;
