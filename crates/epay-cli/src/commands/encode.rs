//! `epay encode`: Render and base64-encode a payment request payload.

use chrono::NaiveDateTime;
use clap::Args;
use epay_core::types::parse_timestamp;
use epay_core::{Currency, Language, PaymentOption, PaymentPage, PaymentRequestBuilder};
use rust_decimal::Decimal;

use super::GatewayArgs;

/// Fields of a payment request.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Amount to charge, e.g. 12.50.
    #[arg(short, long)]
    pub amount: Decimal,

    /// What the payment is for.
    #[arg(short, long)]
    pub description: String,

    /// Invoice number.
    #[arg(short, long)]
    pub invoice: u64,

    /// Language of the gateway pages (en, bg).
    #[arg(long)]
    pub language: Option<Language>,

    /// Currency (EUR, BGN, USD). Defaults to the configured currency.
    #[arg(long)]
    pub currency: Option<Currency>,

    /// Gateway page (direct, login).
    #[arg(long)]
    pub page: Option<PaymentPage>,

    /// Expiration time as "DD.MM.YYYY HH:MM:SS". Defaults to seven days from now.
    #[arg(long, value_parser = parse_timestamp)]
    pub expires: Option<NaiveDateTime>,

    /// Return URL after a successful payment.
    #[arg(long)]
    pub url_ok: Option<String>,

    /// Return URL after a cancelled payment.
    #[arg(long)]
    pub url_cancel: Option<String>,
}

impl RequestArgs {
    /// Options in the order they are applied, the configured currency first.
    pub fn options(&self, default_currency: Currency) -> Vec<PaymentOption> {
        let mut options = vec![PaymentOption::Currency(self.currency.unwrap_or(default_currency))];
        if let Some(language) = self.language {
            options.push(PaymentOption::Language(language));
        }
        if let Some(page) = self.page {
            options.push(PaymentOption::Page(page));
        }
        if let Some(expires) = self.expires {
            options.push(PaymentOption::ExpirationTime(expires));
        }
        if let Some(url) = &self.url_ok {
            options.push(PaymentOption::UrlOk(url.clone()));
        }
        if let Some(url) = &self.url_cancel {
            options.push(PaymentOption::UrlCancel(url.clone()));
        }
        options
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub fn run(args: &EncodeArgs) -> anyhow::Result<()> {
    let gateway = args.gateway.gateway()?;
    let request = PaymentRequestBuilder::new(
        gateway.base_url(),
        gateway.cin.clone(),
        args.request.amount,
        args.request.description.clone(),
        args.request.invoice,
    )
    .default_language(gateway.default_language)
    .options(args.request.options(gateway.default_currency))
    .build()?;

    let encoded = request.encode()?;
    let text = request.fields().canonical_text()?;

    println!("Payload:");
    for line in text.lines() {
        println!("  {}", line);
    }
    println!();
    println!("ENCODED={}", encoded);
    Ok(())
}
