pub mod api;
pub mod turn;

pub use turn::{Role, Turn};
