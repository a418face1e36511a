use async_trait::async_trait;
use maud::{html, Markup};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::error::{AppError, Result};
use crate::types::lenient_string;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Lead {
    #[serde(rename = "refId", deserialize_with = "lenient_string")]
    pub ref_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(rename = "responsibleAgentName", deserialize_with = "lenient_string")]
    pub agent_name: String,
    #[serde(rename = "teamEmail", deserialize_with = "lenient_string")]
    pub team_email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub caller_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub caller_phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub caller_email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub preferred_times: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub transcript: String,
}

impl Lead {
    pub fn has_required_fields(&self) -> bool {
        [&self.ref_id, &self.address, &self.caller_name, &self.caller_phone]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

fn line_breaks(text: &str) -> Markup {
    html! {
        @for (i, line) in text.lines().enumerate() {
            @if i > 0 { br; }
            (line)
        }
    }
}

impl LeadEmail {
    pub fn compose(lead: &Lead, to: &str) -> Self {
        let subject = format!(
            "[PROPERTY ENQUIRY] {} (Ref {})",
            lead.address.trim(),
            lead.ref_id.trim()
        );

        let body = html! {
            h2 { "New property enquiry" }
            p { b { "Property:" } " " (lead.address) " (Ref " (lead.ref_id) ")" }
            p { b { "Agent:" } " " (lead.agent_name) }
            hr;
            p { b { "Caller:" } " " (lead.caller_name) }
            p { b { "Phone:" } " " (lead.caller_phone) }
            p { b { "Email:" } " " (lead.caller_email) }
            @if !lead.preferred_times.trim().is_empty() {
                p { b { "Preferred time(s):" } " " (lead.preferred_times) }
            }
            @if !lead.notes.trim().is_empty() {
                p { b { "Notes:" } br; (line_breaks(&lead.notes)) }
            }
            @if !lead.summary.trim().is_empty() {
                p { b { "Summary:" } br; (line_breaks(&lead.summary)) }
            }
            @if !lead.transcript.trim().is_empty() {
                details {
                    summary { "Full transcript" }
                    pre { (lead.transcript) }
                }
            }
            hr;
            small { "Sent by the voice agent" }
        };

        Self {
            to: to.to_string(),
            subject,
            html: body.into_string(),
        }
    }
}

#[async_trait]
pub trait LeadMailer: Send + Sync {
    async fn send(&self, email: &LeadEmail) -> Result<()>;
}

#[derive(Serialize)]
struct Sender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    sender: Sender<'a>,
    to: Vec<Recipient<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

pub struct ApiMailer {
    client: Client,
    config: MailConfig,
}

impl ApiMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl LeadMailer for ApiMailer {
    async fn send(&self, email: &LeadEmail) -> Result<()> {
        let payload = Payload {
            sender: Sender {
                name: &self.config.from_name,
                email: &self.config.from_email,
            },
            to: vec![Recipient { email: &email.to }],
            subject: &email.subject,
            html_content: &email.html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!("[Mailer] Lead email sent to {}", email.to);
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("[Mailer] Mail API rejected lead email: {} - {}", status, body);
            Err(AppError::mail(format!("mail API returned {}", status)))
        }
    }
}
