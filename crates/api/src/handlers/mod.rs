pub mod assignment;
pub mod cases;
pub mod consensus;
pub mod findings;
