// mapofus-server/src/services/mod.rs

//! HTTP-backed collaborators: blob storage, session validation and mail.

pub mod mailer;
pub mod session;
pub mod storage;

pub use mailer::ResendMailer;
pub use session::SupabaseSessions;
pub use storage::SupabaseStorage;
