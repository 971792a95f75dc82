// Data models

pub mod user;
pub mod gym;
pub mod weight;
pub mod exercise;
pub mod nutrition;
pub mod reference;

pub use user::*;
pub use gym::*;
pub use weight::*;
pub use exercise::*;
pub use nutrition::*;
pub use reference::*;
