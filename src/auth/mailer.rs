/// Delivery seam for magic links. Production uses [`LogMailer`]; tests inject
/// a capturing implementation.
pub trait Mailer: Send + Sync {
    fn send_magic_link(&self, email: &str, link: &str);
}

/// Writes the link to the log instead of sending mail. Suitable for
/// single-operator deployments where the operator reads the server log.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_magic_link(&self, email: &str, link: &str) {
        tracing::info!("Magic link for {email}: {link}");
    }
}
