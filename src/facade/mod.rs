pub mod workbench;

pub use workbench::Workbench;
