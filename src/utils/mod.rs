pub mod file;
pub mod hash;
