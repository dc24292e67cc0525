//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for outbound mail.
///
/// Sending is synchronous; callers that create database rows alongside an
/// email send must keep the send inside the transaction so a failure rolls
/// everything back.
pub trait EmailSender: Send + Sync {
    /// Send a homebuyer invitation carrying a personal signup link
    fn send_invite(
        &self,
        email: &str,
        first_name: &str,
        realtor_name: &str,
        signup_url: &str,
    ) -> Result<(), String>;

    /// Send an email-confirmation link to a freshly signed up realtor
    fn send_confirmation(&self, email: &str, first_name: &str, confirm_url: &str)
        -> Result<(), String>;
}

pub(crate) fn invite_body(first_name: &str, realtor_name: &str, signup_url: &str) -> String {
    format!(
        "Hello {first_name},\n\n\
         {realtor_name} has invited you to Homescore.\n\
         Register at the following link:\n    {signup_url}\n",
    )
}

pub(crate) fn confirmation_body(first_name: &str, confirm_url: &str) -> String {
    format!(
        "Hello {first_name},\n\n\
         Please confirm your email address by visiting:\n    {confirm_url}\n",
    )
}
