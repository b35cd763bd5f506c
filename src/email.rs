//! Outgoing email for account activation and password reset links.
//!
//! Delivery is fire and forget: a failed send is logged but never fails the
//! HTTP request that triggered it.

use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
};

use crate::Error;

/// An email that is about to be handed to the mailer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sends account emails over SMTP, or logs them when no relay is configured.
#[derive(Clone)]
pub enum Mailer {
    /// Deliver mail through an SMTP relay.
    Smtp {
        transport: SmtpTransport,
        from: Mailbox,
    },
    /// Log the email body instead of sending it. Useful for local development.
    LogOnly,
    /// Collect emails in memory so tests can inspect them.
    #[cfg(test)]
    Capture(std::sync::Arc<std::sync::Mutex<Vec<OutgoingEmail>>>),
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mailer::Smtp { from, .. } => f.debug_struct("Smtp").field("from", from).finish(),
            Mailer::LogOnly => write!(f, "LogOnly"),
            #[cfg(test)]
            Mailer::Capture(_) => write!(f, "Capture"),
        }
    }
}

impl Mailer {
    /// Create a mailer that connects to `relay` over TLS using `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmailConfigError] if `relay` or `from` cannot be parsed.
    pub fn smtp(
        relay: &str,
        from: &str,
        credentials: lettre::transport::smtp::authentication::Credentials,
    ) -> Result<Self, Error> {
        let transport = SmtpTransport::relay(relay)
            .map_err(|error| Error::EmailConfigError(error.to_string()))?
            .credentials(credentials)
            .build();
        let from = from
            .parse::<Mailbox>()
            .map_err(|error| Error::EmailConfigError(error.to_string()))?;

        Ok(Mailer::Smtp { transport, from })
    }

    /// Queue `email` for delivery in the background.
    ///
    /// This returns as soon as the email is handed off. Send failures are
    /// logged at the `error` level.
    pub fn send(&self, email: OutgoingEmail) {
        match self {
            Mailer::Smtp { transport, from } => {
                let transport = transport.clone();
                let from = from.clone();

                tokio::task::spawn_blocking(move || {
                    if let Err(error) = send_over_smtp(&transport, from, &email) {
                        tracing::error!("could not send email to {}: {error}", email.to);
                    }
                });
            }
            Mailer::LogOnly => {
                tracing::info!(
                    "email to {} with subject {:?}:\n{}",
                    email.to,
                    email.subject,
                    email.body
                );
            }
            #[cfg(test)]
            Mailer::Capture(outbox) => {
                outbox
                    .lock()
                    .expect("email outbox lock poisoned")
                    .push(email);
            }
        }
    }
}

fn send_over_smtp(
    transport: &SmtpTransport,
    from: Mailbox,
    email: &OutgoingEmail,
) -> Result<(), Error> {
    let to = email
        .to
        .parse::<Mailbox>()
        .map_err(|error| Error::EmailConfigError(error.to_string()))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(&email.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|error| Error::EmailConfigError(error.to_string()))?;

    transport
        .send(&message)
        .map_err(|error| Error::EmailSendError(error.to_string()))?;

    Ok(())
}

/// The welcome email sent after registration, containing the activation link.
pub fn activation_email(to: &str, username: &str, activation_url: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_owned(),
        subject: "Activate your FinTrack account".to_owned(),
        body: format!(
            "Hi {username},\n\n\
            Thanks for signing up to FinTrack. Please click the link below to \
            verify your email address and activate your account:\n\n\
            {activation_url}\n\n\
            The link expires in 3 days. If you did not create this account, \
            you can ignore this email.\n"
        ),
    }
}

/// The email containing the password reset link.
pub fn password_reset_email(to: &str, username: &str, reset_url: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_owned(),
        subject: "Reset your FinTrack password".to_owned(),
        body: format!(
            "Hi {username},\n\n\
            We received a request to reset the password for your FinTrack \
            account. Click the link below to choose a new password:\n\n\
            {reset_url}\n\n\
            The link expires in 3 days. If you did not request a password \
            reset, you can ignore this email and your password will stay the \
            same.\n"
        ),
    }
}
