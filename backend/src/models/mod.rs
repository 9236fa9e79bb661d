pub mod task;
pub mod user;

pub use user::{NewUser, User};
