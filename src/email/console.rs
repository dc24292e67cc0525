//! Console-based email sender for development

use super::EmailSender;

/// Email sender that logs to console (for development)
pub struct ConsoleEmailSender;

impl EmailSender for ConsoleEmailSender {
    fn send_invite(
        &self,
        email: &str,
        first_name: &str,
        realtor_name: &str,
        signup_url: &str,
    ) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  INVITATION FOR: {} ({})", email, first_name);
        println!("  FROM: {}", realtor_name);
        println!("  SIGNUP LINK: {}", signup_url);
        println!("========================================");
        println!();

        tracing::info!(email = %email, "Invitation sent");

        Ok(())
    }

    fn send_confirmation(
        &self,
        email: &str,
        first_name: &str,
        confirm_url: &str,
    ) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  CONFIRMATION FOR: {} ({})", email, first_name);
        println!("  CONFIRM LINK: {}", confirm_url);
        println!("========================================");
        println!();

        tracing::info!(email = %email, "Confirmation sent");

        Ok(())
    }
}
