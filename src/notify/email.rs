use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Delivery;
use crate::render;
use crate::report::RunReport;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// Build from `SMTP_HOST`/`SMTP_USER`/`SMTP_PASS` and
    /// `REPORT_EMAIL_FROM`/`REPORT_EMAIL_TO`. Missing variables are an error
    /// the caller can treat as "email not configured".
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("REPORT_EMAIL_FROM").context("REPORT_EMAIL_FROM missing")?;
        let to_addr = std::env::var("REPORT_EMAIL_TO").context("REPORT_EMAIL_TO missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid REPORT_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid REPORT_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }

    pub async fn send_html(&self, subject: &str, html: &str) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

pub struct EmailDelivery {
    sender: EmailSender,
}

impl EmailDelivery {
    pub fn new(sender: EmailSender) -> Self {
        Self { sender }
    }
}

#[async_trait::async_trait]
impl Delivery for EmailDelivery {
    async fn deliver(&self, report: &RunReport) -> Result<()> {
        if report.published_count() == 0 {
            tracing::info!("nothing published; skipping email report");
            return Ok(());
        }
        self.sender
            .send_html(&render::email_subject(report), &render::email_html(report))
            .await
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
