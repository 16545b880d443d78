pub mod prompt;
pub mod vector;

pub use prompt::dispatch;
pub use vector::VectorService;
