pub mod allocate;
pub mod classify;
pub mod universe;
