//! `epay notify`: Send a signed payment notification to a node.
//!
//! Builds the payload the way the gateway does, so a merchant can exercise
//! their notification endpoint without a real payment.

use chrono::NaiveDateTime;
use clap::Args;
use epay_core::types::parse_timestamp;
use epay_core::{checksum, Payment, PaymentStatus};

use super::GatewayArgs;

#[derive(Args, Debug)]
pub struct NotifyArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Full URL of the notification endpoint.
    #[arg(short, long, default_value = "http://127.0.0.1:8080/epay/notify")]
    pub endpoint: String,

    /// Invoice number being reported.
    #[arg(short, long)]
    pub invoice: u64,

    /// Status to report (PAID, DENIED, EXPIRED).
    #[arg(short, long, default_value = "PAID")]
    pub status: String,

    /// Payment time as "DD.MM.YYYY HH:MM:SS". Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub pay_time: Option<NaiveDateTime>,

    /// Transaction sequence number.
    #[arg(long, default_value_t = 0)]
    pub stan: i64,

    /// Authorization code.
    #[arg(long, default_value = "")]
    pub bcode: String,
}

impl NotifyArgs {
    fn payment(&self) -> Payment {
        let status = PaymentStatus::from(self.status.trim().to_uppercase());
        let pay_time = match status {
            PaymentStatus::Paid => Some(
                self.pay_time
                    .unwrap_or_else(|| chrono::Local::now().naive_local()),
            ),
            _ => self.pay_time,
        };
        Payment {
            invoice: self.invoice,
            status,
            pay_time,
            stan: self.stan,
            bcode: self.bcode.clone(),
        }
    }
}

pub async fn run(args: &NotifyArgs) -> anyhow::Result<()> {
    let gateway = args.gateway.gateway()?;
    let secret = args.gateway.secret(&gateway);
    if secret.is_empty() {
        anyhow::bail!("no secret configured (use --secret or EPAY_SECRET)");
    }

    let payment = args.payment();
    let encoded = payment.encode();
    let checksum = checksum::sign(encoded.as_bytes(), secret.as_bytes());

    println!("Sending notification...");
    println!("  Invoice:  {}", payment.invoice);
    println!("  Status:   {}", payment.status);
    println!("  To:       {}", args.endpoint);
    println!();

    let client = reqwest::Client::new();
    let resp = client
        .post(&args.endpoint)
        .form(&[("encoded", encoded.as_str()), ("checksum", checksum.as_str())])
        .send()
        .await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let body = r.text().await?;
            println!("Reply: {}", body.trim_end());
            if !body.contains("STATUS=OK") {
                anyhow::bail!("node did not accept the payment");
            }
        }
        Ok(r) => {
            let status = r.status();
            let body = r.text().await.unwrap_or_default();
            anyhow::bail!("notification failed (HTTP {}): {}", status, body.trim_end());
        }
        Err(e) => {
            println!("Could not reach node at {}", args.endpoint);
            println!("  Error: {}", e);
            println!();
            println!("Make sure the node is running: epay-node --config epay.toml");
            anyhow::bail!("connection failed");
        }
    }

    Ok(())
}
