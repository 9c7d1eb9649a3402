pub mod directory;
pub mod geo;

pub use directory::PracticeDirectoryService;
