pub mod attendance;
pub mod event;
pub mod member;
pub mod organization;
pub mod requests;

pub use attendance::*;
pub use event::*;
pub use member::*;
pub use organization::*;
pub use requests::*;
