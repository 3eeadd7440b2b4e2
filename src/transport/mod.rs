/// Filesystem-backed debug trace reading.
pub mod fs;
