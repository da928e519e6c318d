pub mod ids;
pub mod password;

pub use ids::{new_chatbot_id, new_file_id, new_user_id};
pub use password::{hash_password, verify_password};
