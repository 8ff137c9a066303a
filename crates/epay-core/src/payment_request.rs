use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use std::sync::{PoisonError, RwLock};

use crate::checksum;
use crate::encoding::FieldSet;
use crate::error::CoreError;
use crate::types::{Currency, Language, PaymentPage};

/// How long a request stays payable when no expiration time is given.
pub const DEFAULT_EXPIRATION_DAYS: i64 = 7;

/// An optional override applied on top of the request defaults.
///
/// Options are applied in the order given, so a later option wins over an
/// earlier one touching the same field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOption {
    /// Override the expiration time. Must be after the Unix epoch.
    ExpirationTime(NaiveDateTime),
    /// Language of the gateway pages.
    Language(Language),
    /// Currency of the amount.
    Currency(Currency),
    /// Which gateway page to open.
    Page(PaymentPage),
    /// Where the customer returns after paying.
    UrlOk(String),
    /// Where the customer returns after cancelling.
    UrlCancel(String),
}

impl PaymentOption {
    fn apply(self, request: &mut PaymentRequest) -> Result<(), CoreError> {
        match self {
            Self::ExpirationTime(t) => {
                if t.and_utc().timestamp() <= 0 {
                    return Err(CoreError::InvalidField("invalid expiration time".into()));
                }
                request.expiration_time = Some(t);
            }
            Self::Language(language) => request.language = Some(language),
            Self::Currency(currency) => request.currency = Some(currency),
            Self::Page(page) => request.page = page,
            Self::UrlOk(url) => request.url_ok = Some(validate_url("URL_OK", url)?),
            Self::UrlCancel(url) => request.url_cancel = Some(validate_url("URL_CANCEL", url)?),
        }
        Ok(())
    }
}

fn validate_url(field: &str, url: String) -> Result<String, CoreError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url)
    } else {
        Err(CoreError::InvalidField(format!(
            "{} must be an absolute http(s) URL, got {:?}",
            field, url
        )))
    }
}

/// Values derived from the request fields, computed on demand.
#[derive(Debug, Default)]
struct Derived {
    encoded: Option<String>,
    checksum: Option<String>,
}

/// An outbound payment request for the gateway.
///
/// Fields are fixed once the request is built. The encoded payload and its
/// checksum are computed lazily by [`PaymentRequest::encode`] and
/// [`PaymentRequest::sign`] and cached behind a per-request lock, so readers
/// on other threads see either nothing or the complete value.
#[derive(Debug)]
pub struct PaymentRequest {
    page: PaymentPage,
    url: String,
    cin: String,
    amount: Decimal,
    description: String,
    invoice: u64,
    expiration_time: Option<NaiveDateTime>,
    currency: Option<Currency>,
    language: Option<Language>,
    url_ok: Option<String>,
    url_cancel: Option<String>,
    derived: RwLock<Derived>,
}

impl PaymentRequest {
    /// Gateway URL the redirect form posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Value of the `PAGE` form field.
    pub fn page(&self) -> PaymentPage {
        self.page
    }

    /// Client identification number.
    pub fn cin(&self) -> &str {
        &self.cin
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn invoice(&self) -> u64 {
        self.invoice
    }

    pub fn expiration_time(&self) -> Option<NaiveDateTime> {
        self.expiration_time
    }

    pub fn currency(&self) -> Option<Currency> {
        self.currency
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn url_ok(&self) -> Option<&str> {
        self.url_ok.as_deref()
    }

    pub fn url_cancel(&self) -> Option<&str> {
        self.url_cancel.as_deref()
    }

    /// The fields that go into the encoded payload.
    pub fn fields(&self) -> FieldSet<'_> {
        FieldSet {
            cin: &self.cin,
            invoice: self.invoice,
            amount: self.amount,
            expiration_time: self.expiration_time,
            currency: self.currency,
            language: self.language,
            description: &self.description,
        }
    }

    /// Encoded payload, or an empty string if [`encode`](Self::encode) has not run yet.
    pub fn encoded(&self) -> String {
        self.read_derived(|d| d.encoded.clone())
    }

    /// Checksum, or an empty string if [`sign`](Self::sign) has not run yet.
    pub fn checksum(&self) -> String {
        self.read_derived(|d| d.checksum.clone())
    }

    /// Validate the fields and compute the encoded payload, once.
    pub fn encode(&self) -> Result<String, CoreError> {
        let mut derived = self.derived.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(encoded) = &derived.encoded {
            return Ok(encoded.clone());
        }
        let encoded = self.fields().encode()?;
        tracing::debug!(invoice = self.invoice, len = encoded.len(), "payment request encoded");
        derived.encoded = Some(encoded.clone());
        Ok(encoded)
    }

    /// Compute the checksum of the encoded payload, encoding first if needed.
    pub fn sign(&self, secret: &[u8]) -> Result<String, CoreError> {
        let encoded = self
            .encode()
            .map_err(|e| CoreError::Encoding(Box::new(e)))?;
        let checksum = checksum::sign(encoded.as_bytes(), secret);

        let mut derived = self.derived.write().unwrap_or_else(PoisonError::into_inner);
        derived.checksum = Some(checksum.clone());
        Ok(checksum)
    }

    /// Plaintext fields of the redirect form, in rendering order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("PAGE", self.page.code().to_string()),
            ("ENCODED", self.encoded()),
            ("CHECKSUM", self.checksum()),
        ];
        if let Some(url) = &self.url_ok {
            fields.push(("URL_OK", url.clone()));
        }
        if let Some(url) = &self.url_cancel {
            fields.push(("URL_CANCEL", url.clone()));
        }
        fields
    }

    fn read_derived(&self, f: impl FnOnce(&Derived) -> Option<String>) -> String {
        let derived = self.derived.read().unwrap_or_else(PoisonError::into_inner);
        f(&derived).unwrap_or_default()
    }
}

/// Builder for constructing PaymentRequest instances.
///
/// Defaults: direct card page, expiration in seven days, English, EUR.
#[derive(Debug)]
pub struct PaymentRequestBuilder {
    url: String,
    cin: String,
    amount: Decimal,
    description: String,
    invoice: u64,
    default_language: Language,
    options: Vec<PaymentOption>,
}

impl PaymentRequestBuilder {
    /// Start a request with its mandatory fields.
    pub fn new(
        url: impl Into<String>,
        cin: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
        invoice: u64,
    ) -> Self {
        Self {
            url: url.into(),
            cin: cin.into(),
            amount,
            description: description.into(),
            invoice,
            default_language: Language::English,
            options: Vec::new(),
        }
    }

    /// Language used when no [`PaymentOption::Language`] is given.
    pub fn default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    /// Append an option.
    pub fn option(mut self, option: PaymentOption) -> Self {
        self.options.push(option);
        self
    }

    /// Append several options, keeping their order.
    pub fn options(mut self, options: impl IntoIterator<Item = PaymentOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Set the expiration time.
    pub fn expiration_time(self, t: NaiveDateTime) -> Self {
        self.option(PaymentOption::ExpirationTime(t))
    }

    /// Set the language.
    pub fn language(self, language: Language) -> Self {
        self.option(PaymentOption::Language(language))
    }

    /// Set the currency.
    pub fn currency(self, currency: Currency) -> Self {
        self.option(PaymentOption::Currency(currency))
    }

    /// Set the gateway page.
    pub fn page(self, page: PaymentPage) -> Self {
        self.option(PaymentOption::Page(page))
    }

    /// Set the return URL after a successful payment.
    pub fn url_ok(self, url: impl Into<String>) -> Self {
        self.option(PaymentOption::UrlOk(url.into()))
    }

    /// Set the return URL after a cancelled payment.
    pub fn url_cancel(self, url: impl Into<String>) -> Self {
        self.option(PaymentOption::UrlCancel(url.into()))
    }

    /// Apply the defaults, then every option in order.
    pub fn build(self) -> Result<PaymentRequest, CoreError> {
        let mut request = PaymentRequest {
            page: PaymentPage::DirectCard,
            url: self.url,
            cin: self.cin,
            amount: self.amount,
            description: self.description,
            invoice: self.invoice,
            expiration_time: Some(
                chrono::Local::now().naive_local() + Duration::days(DEFAULT_EXPIRATION_DAYS),
            ),
            currency: Some(Currency::EUR),
            language: Some(self.default_language),
            url_ok: None,
            url_cancel: None,
            derived: RwLock::new(Derived::default()),
        };

        for option in self.options {
            option.apply(&mut request)?;
        }

        Ok(request)
    }
}
