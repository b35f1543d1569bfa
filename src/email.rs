//! Access email delivery via the Resend API.
//!
//! Delivery is best-effort: without an API key the message is logged
//! instead of sent, and callers treat send failures as non-fatal.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::tenant::Tenant;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

/// Outbound mail seam. Production talks to Resend; tests substitute a
/// recording double.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct ResendNotifier {
    api_key: Option<String>,
    from: String,
    client: Client,
}

impl ResendNotifier {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            api_key,
            from,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> Result<()> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::info!(
                to = %to,
                subject = %subject,
                "No mail API key configured, logging instead of sending"
            );
            return Ok(());
        };

        let request = ResendEmailRequest {
            from: &self.from,
            to: vec![to],
            subject,
            text,
            html,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .timeout(SEND_TIMEOUT)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Email service error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Email service error: {status} - {body}"
            )));
        }

        let _result: ResendEmailResponse = response
            .json()
            .await
            .map_err(|_| AppError::Internal("Email service response error".into()))?;

        tracing::info!(to = %to, "Access email sent via Resend");
        Ok(())
    }
}

/// Subject and both bodies for one access email.
#[derive(Debug, Clone)]
pub struct AccessEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Builds the post-purchase email carrying the dashboard link with the
/// access token, in the tenant's language.
pub fn build_access_email(tenant: &Tenant, token: &str) -> AccessEmail {
    let dashboard_url = format!("{}?token={}", tenant.success_url, token);

    if tenant.locale == "es" {
        AccessEmail {
            subject: format!("Tu acceso a {}", tenant.name),
            text: format!(
                "¡Pago confirmado!\n\nYa tienes acceso a {}. Entra en tu panel con este enlace:\n\n{}\n\nGuarda este correo: el enlace contiene tu clave de acceso personal.\n\nSi no has realizado esta compra, responde a este correo.",
                tenant.name, dashboard_url
            ),
            html: format!(
                r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">¡Pago confirmado!</h2>
<p>Ya tienes acceso a <strong>{}</strong>. Entra en tu panel:</p>
<div style="background: #f5f5f5; padding: 20px; border-radius: 8px; text-align: center; margin: 24px 0;">
<a href="{}" style="font-size: 18px; font-weight: bold; color: #2563eb;">Abrir mi panel</a>
</div>
<p style="color: #666;">Guarda este correo: el enlace contiene tu clave de acceso personal.</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">Si no has realizado esta compra, responde a este correo.</p>
</body>
</html>"#,
                tenant.name, dashboard_url
            ),
        }
    } else {
        AccessEmail {
            subject: format!("Your access to {}", tenant.name),
            text: format!(
                "Payment confirmed!\n\nYour access to {} is ready. Open your dashboard with this link:\n\n{}\n\nKeep this email: the link contains your personal access key.\n\nIf you did not make this purchase, reply to this email.",
                tenant.name, dashboard_url
            ),
            html: format!(
                r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Payment confirmed!</h2>
<p>Your access to <strong>{}</strong> is ready. Open your dashboard:</p>
<div style="background: #f5f5f5; padding: 20px; border-radius: 8px; text-align: center; margin: 24px 0;">
<a href="{}" style="font-size: 18px; font-weight: bold; color: #2563eb;">Open my dashboard</a>
</div>
<p style="color: #666;">Keep this email: the link contains your personal access key.</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">If you did not make this purchase, reply to this email.</p>
</body>
</html>"#,
                tenant.name, dashboard_url
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{ConnectionProfile, Tenant, TransportKind};

    fn tenant(locale: &str) -> Tenant {
        Tenant {
            id: "lifeinuk".into(),
            name: "Life in UK Express".into(),
            domain: "lifeinuk.express".into(),
            currency: "gbp".into(),
            price_cents: 2499,
            locale: locale.into(),
            exam_questions: 24,
            pass_score: 75,
            stripe_price_id: "price_test".into(),
            success_url: "https://lifeinuk.express/dashboard".into(),
            cancel_url: "https://lifeinuk.express".into(),
            transport: TransportKind::Direct,
            connection: ConnectionProfile {
                host: "127.0.0.1".into(),
                port: 3306,
                database: "db".into(),
                user: "user".into(),
                password: "pw".into(),
                ssh: None,
                proxy_url: None,
            },
        }
    }

    #[test]
    fn access_email_embeds_token_link() {
        let email = build_access_email(&tenant("en"), "abc123");
        assert!(email.subject.contains("Life in UK Express"));
        assert!(
            email
                .text
                .contains("https://lifeinuk.express/dashboard?token=abc123")
        );
        assert!(
            email
                .html
                .contains("https://lifeinuk.express/dashboard?token=abc123")
        );
    }

    #[test]
    fn access_email_is_localized() {
        let spanish = build_access_email(&tenant("es"), "t");
        assert!(spanish.subject.starts_with("Tu acceso"));

        let english = build_access_email(&tenant("en"), "t");
        assert!(english.subject.starts_with("Your access"));
    }
}
