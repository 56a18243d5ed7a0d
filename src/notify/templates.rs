//! Email Templates
//!
//! Rendered HTML for the transactional emails the service sends. Kept as
//! plain format strings; the volume does not justify a template engine.

use super::mailer::Email;

/// Welcome email sent after account creation
pub fn welcome(to: &str, name: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Welcome aboard".to_string(),
        html: format!(
            r#"<div style="font-family: sans-serif; max-width: 600px;">
  <h2>Welcome, {name}!</h2>
  <p>Your account is ready. Fund it with a deposit to start investing.</p>
  <p>If you did not create this account, please ignore this email.</p>
</div>"#,
            name = name
        ),
    }
}

/// Password reset email carrying a one-time reset link
pub fn password_reset(to: &str, reset_link: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html: format!(
            r#"<div style="font-family: sans-serif; max-width: 600px;">
  <h2>Password reset requested</h2>
  <p>Click the link below to choose a new password. The link expires shortly.</p>
  <p><a href="{link}">Reset password</a></p>
  <p>If you did not request this, you can safely ignore this email.</p>
</div>"#,
            link = reset_link
        ),
    }
}

/// Confirmation sent to the old address when the account email changes
pub fn email_change(to: &str, new_email: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Your email address was changed".to_string(),
        html: format!(
            r#"<div style="font-family: sans-serif; max-width: 600px;">
  <h2>Email address updated</h2>
  <p>The email on your account was changed to <strong>{new_email}</strong>.</p>
  <p>If this was not you, contact support immediately.</p>
</div>"#,
            new_email = new_email
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_address_the_recipient() {
        let email = welcome("user@example.com", "Ada");
        assert_eq!(email.to, "user@example.com");
        assert!(email.html.contains("Ada"));

        let email = password_reset("user@example.com", "https://app.example/reset?t=abc");
        assert!(email.html.contains("https://app.example/reset?t=abc"));

        let email = email_change("old@example.com", "new@example.com");
        assert_eq!(email.to, "old@example.com");
        assert!(email.html.contains("new@example.com"));
    }
}
