pub mod dispatcher;
pub mod transport;

pub use dispatcher::NotificationDispatcher;
pub use transport::{HttpMailTransport, MailTransport};
