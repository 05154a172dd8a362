/// Outbound email over the SendGrid v3 dynamic-template API.
///
/// The service cores only see the `EmailSender` trait; this client is the
/// production implementation. Any transport error or non-2xx response
/// surfaces as an internal error, the caller decides whether delivery is
/// mandatory for its flow.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

use crate::configuration::EmailSettings;
use crate::error::AppError;

const RECOVERY_TEMPLATE_ID: &str = "d-05a101c8a8364128af84e8acc0e51e61";
const WELCOME_TEMPLATE_ID: &str = "d-5bba1686a1d54b58b15a00888dc18362";

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_recovery_email(&self, recipients: &[String], token: &str)
        -> Result<(), AppError>;
    async fn send_welcome_email(
        &self,
        recipients: &[String],
        name: &str,
        token: &str,
    ) -> Result<(), AppError>;
}

#[derive(Serialize)]
struct MailAddress {
    email: String,
}

#[derive(Serialize)]
struct Personalization {
    to: Vec<MailAddress>,
    dynamic_template_data: HashMap<String, String>,
}

#[derive(Serialize)]
struct MailRequest {
    personalizations: Vec<Personalization>,
    from: MailAddress,
    template_id: String,
}

impl MailRequest {
    fn new(
        sender: &str,
        recipients: &[String],
        template_id: &str,
        data: HashMap<String, String>,
    ) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: recipients
                    .iter()
                    .map(|r| MailAddress { email: r.clone() })
                    .collect(),
                dynamic_template_data: data,
            }],
            from: MailAddress {
                email: sender.to_string(),
            },
            template_id: template_id.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    settings: EmailSettings,
}

impl EmailClient {
    pub fn new(settings: EmailSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    fn recovery_link(&self, token: &str) -> String {
        format!("{}{}", self.settings.recovery_url, token)
    }

    async fn send(&self, request: &MailRequest) -> Result<(), AppError> {
        let url = format!("{}/mail/send", self.settings.base_url);

        self.http_client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Connection error sending mail");
                AppError::Internal(format!("email transport failed: {}", e))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!(error = %e, "Invalid response sending mail");
                AppError::Internal(format!("email service rejected the request: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_recovery_email(
        &self,
        recipients: &[String],
        token: &str,
    ) -> Result<(), AppError> {
        let mut data = HashMap::new();
        data.insert("recovery_link".to_string(), self.recovery_link(token));

        let request = MailRequest::new(
            &self.settings.sender_address,
            recipients,
            RECOVERY_TEMPLATE_ID,
            data,
        );
        self.send(&request).await
    }

    async fn send_welcome_email(
        &self,
        recipients: &[String],
        name: &str,
        token: &str,
    ) -> Result<(), AppError> {
        let mut data = HashMap::new();
        data.insert("user_name".to_string(), name.to_string());
        data.insert("welcome_link".to_string(), self.recovery_link(token));

        let request = MailRequest::new(
            &self.settings.sender_address,
            recipients,
            WELCOME_TEMPLATE_ID,
            data,
        );
        self.send(&request).await
    }
}
