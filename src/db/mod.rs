pub mod directory;
pub mod pool;

pub use directory::{MemberDirectory, PgDirectory};
pub use pool::{create_lazy_pool, create_pool};
