//! Outbound mail: approval links for pending nurse registrations
use anyhow::{bail, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::{Arc, Mutex};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Blocking mail delivery. Callers run it on the blocking pool.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// STARTTLS relay with username/password auth (implicit TLS on port 465).
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let creds = Credentials::new(username.to_string(), password.to_string());
        let builder = if port == 465 {
            SmtpTransport::relay(host)?
        } else {
            SmtpTransport::starttls_relay(host)?
        };
        let transport = builder.port(port).credentials(creds).build();
        Ok(Self {
            transport,
            from: username.parse()?,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        if let Err(e) = self.transport.send(&email) {
            tracing::error!(to = %mail.to, "smtp send failed: {e:?}");
            return Err(e.into());
        }
        Ok(())
    }
}

/// Used when no SMTP credentials are configured; every send fails.
pub struct DisabledMailer;

impl Mailer for DisabledMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        bail!("smtp is not configured, dropping mail to {}", mail.to)
    }
}

/// Keeps outgoing mail in memory instead of delivering it.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose sends always fail, for exercising delivery errors.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if self.fail {
            bail!("simulated delivery failure");
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(mail.clone()),
            Err(_) => bail!("mail store poisoned"),
        }
        Ok(())
    }
}

/// Pick the transport from configuration.
pub fn mailer_from_config(config: &Config) -> Result<Arc<dyn Mailer>> {
    match (&config.smtp_username, &config.smtp_password) {
        (Some(user), Some(pass)) => {
            let mailer = SmtpMailer::new(&config.smtp_host, config.smtp_port, user, pass)?;
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "smtp relay configured");
            Ok(Arc::new(mailer))
        }
        _ => {
            tracing::warn!("SMTP_USERNAME/SMTP_PASSWORD not set, approval mails will fail");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

/// Approval request sent to the approving doctor.
pub fn approval_mail(approver: &str, username: &str, link: &str, hospital_name: &str, ttl_hours: i64) -> OutgoingMail {
    let body = format!(
        "Halo Dokter,\n\n\
         Perawat dengan username '{username}' telah meminta registrasi.\n\
         Silakan konfirmasi registrasi dengan mengklik link berikut:\n\
         {link}\n\n\
         Jika Anda tidak mengenali permintaan ini, abaikan email ini.\n\
         Link ini valid selama {ttl_hours} jam.\n\n\
         Terima kasih,\n\
         Tim {hospital_name}\n"
    );
    OutgoingMail {
        to: approver.to_string(),
        subject: "Konfirmasi Registrasi Perawat".into(),
        body,
    }
}

/// Deliver on the blocking pool; errors come back as strings for the flash/log path.
pub async fn deliver(mailer: Arc<dyn Mailer>, mail: OutgoingMail) -> Result<(), String> {
    match tokio::task::spawn_blocking(move || mailer.send(&mail)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("mail task failed: {e}")),
    }
}
