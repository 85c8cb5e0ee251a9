pub mod community;
pub mod join;
pub mod member;

pub use community::*;
pub use join::*;
pub use member::*;
