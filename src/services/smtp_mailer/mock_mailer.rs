use std::sync::Mutex;

use async_trait::async_trait;

use super::{MailError, Mailer};

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct MockMailer {
    pub sent_welcome_emails: Mutex<Vec<(String, String, String)>>,
    pub sent_generic_emails: Mutex<Vec<(String, String, String)>>,
    pub fail_send: bool,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_welcome_email(
        &self,
        to: &str,
        empresa_name: &str,
        checkout_url: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent_welcome_emails.lock().unwrap().push((
            to.to_string(),
            empresa_name.to_string(),
            checkout_url.to_string(),
        ));
        Ok(())
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock fail".into()));
        }
        self.sent_generic_emails.lock().unwrap().push((
            to.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}
