pub mod check;
pub mod clean;
pub mod clippy;
pub mod demos;
pub mod format;
