pub mod publication;
pub mod ranking;
pub mod user;

pub use publication::*;
pub use ranking::*;
pub use user::*;
