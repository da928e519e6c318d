pub mod context;
pub mod generator;
pub mod remote;

pub use context::{ReferenceFile, build_context};
pub use generator::{ReplyGenerator, fallback_reply};
pub use remote::{RemoteReplyClient, ReplyError};
