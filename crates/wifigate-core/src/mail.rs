// ── Verification mail ──
//
// Composition lives here; delivery is somebody else's job and sits
// behind the `Mailer` trait.

use async_trait::async_trait;
use tracing::info;

use crate::error::MailError;
use crate::model::{VerificationCode, Visitor};

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// The message that carries a verification code to its visitor.
    pub fn verification(visitor: &Visitor, code: &VerificationCode) -> Self {
        let minutes = code.window_minutes();
        Self {
            to: visitor.email.clone(),
            subject: format!("Your Wi-Fi access code: {}", code.code),
            body: format!(
                "Hello {name},\n\n\
                 Your verification code is {code}.\n\n\
                 Enter it on the portal page from the same device you used to \
                 register. The code expires in {minutes} minutes and can only \
                 be used once.\n\n\
                 If you did not request access, ignore this message.\n",
                name = visitor.name,
                code = code.code,
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Mailer that only logs. Useful for development and for the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "verification mail (not delivered)");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{CodeId, MacAddress, VisitorId};
    use chrono::{TimeDelta, Utc};

    #[test]
    fn verification_mail_mentions_code_and_window() {
        let now = Utc::now();
        let visitor = Visitor {
            id: VisitorId::new(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: "83988887777".into(),
            legacy_mac: None,
            authorized: false,
            registered_at: now,
        };
        let code = VerificationCode {
            id: CodeId::new(),
            visitor_id: visitor.id,
            code: "004217".into(),
            ip: "10.0.0.5".parse().unwrap(),
            mac: MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap(),
            issued_at: now,
            validated_at: None,
            expires_at: now + TimeDelta::minutes(10),
        };

        let mail = OutgoingMail::verification(&visitor, &code);
        assert_eq!(mail.to, "ana@example.com");
        assert!(mail.subject.contains("004217"));
        assert!(mail.body.contains("Hello Ana"));
        assert!(mail.body.contains("expires in 10 minutes"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mail = OutgoingMail {
            to: "a@b".into(),
            subject: "s".into(),
            body: "b".into(),
        };
        LogMailer.send(&mail).await.unwrap();
    }
}
