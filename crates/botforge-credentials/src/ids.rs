use uuid::Uuid;

/// Random identifier truncated from a UUIDv4 string.
///
/// Short ids reproduce the original key format. Truncation raises the
/// collision probability well above a full UUID's; the unique constraint
/// on the primary key column is the backstop if one ever lands.
pub fn new_id(len: usize) -> String {
    let mut id = Uuid::new_v4().to_string();
    id.truncate(len);
    id
}

pub fn new_user_id() -> String {
    new_id(6)
}

pub fn new_chatbot_id() -> String {
    new_id(8)
}

pub fn new_file_id() -> String {
    new_id(8)
}
