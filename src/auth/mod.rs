mod events;
mod mailer;
mod middleware;
pub mod session;
mod token;

pub use events::{AuthEvent, AuthEvents};
pub use mailer::{LogMailer, Mailer};
pub use middleware::{AuthError, RequireAdmin, RequireEditor, RequireService, RequireUser};
pub use token::{TokenGenerator, parse_token};
