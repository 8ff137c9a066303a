//! Integration test: building, encoding and signing payment requests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Local};
use epay_core::encoding::decode_payload;
use epay_core::{verify, CoreError, Currency, Language, PaymentOption, PaymentPage};
use epay_integration_tests::{fixed_time, sandbox_client, CIN, SECRET};
use rust_decimal_macros::dec;

#[test]
fn test_request_payload_is_canonical() {
    let client = sandbox_client();
    let request = client
        .payment_request(dec!(12.5), "Order 55", 55)
        .expiration_time(fixed_time())
        .currency(Currency::EUR)
        .language(Language::English)
        .build()
        .expect("build");

    let checksum = client.sign_request(&request).expect("sign");
    let encoded = request.encoded();

    let expected_text = format!(
        "MIN={}\nINVOICE=55\nAMOUNT=12.50\nEXP_TIME=05.03.2024 14:30:00\n\
         CURRENCY=EUR\nLANGUAGE=en\nDESCRIPTION=Order 55\n",
        CIN
    );
    assert_eq!(encoded, STANDARD.encode(&expected_text));
    assert_eq!(decode_payload(&encoded).unwrap(), expected_text);

    assert_eq!(checksum.len(), 40);
    assert!(verify(encoded.as_bytes(), SECRET.as_bytes(), &checksum));
    assert!(!verify(encoded.as_bytes(), b"wrong", &checksum));
}

#[test]
fn test_form_fields_for_redirect() {
    let client = sandbox_client();
    let request = client
        .payment_request(dec!(5), "Subscription", 7)
        .page(PaymentPage::Login)
        .url_ok("https://shop.example/ok")
        .url_cancel("https://shop.example/cancel")
        .build()
        .unwrap();
    let checksum = client.sign_request(&request).unwrap();

    let fields = request.form_fields();
    let names: Vec<_> = fields.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, ["PAGE", "ENCODED", "CHECKSUM", "URL_OK", "URL_CANCEL"]);
    assert_eq!(fields[0].1, "paylogin");
    assert_eq!(fields[2].1, checksum);

    // Redirect targets stay out of the signed payload.
    let text = decode_payload(&request.encoded()).unwrap();
    assert!(!text.contains("shop.example"));
    assert_eq!(request.url(), "https://demo.epay.bg/");
}

#[test]
fn test_later_options_win() {
    let request = sandbox_client()
        .payment_request(dec!(1), "x", 1)
        .options([
            PaymentOption::Currency(Currency::USD),
            PaymentOption::Language(Language::Bulgarian),
            PaymentOption::Currency(Currency::BGN),
        ])
        .build()
        .unwrap();
    assert_eq!(request.currency(), Some(Currency::BGN));
    assert_eq!(request.language(), Some(Language::Bulgarian));
}

#[test]
fn test_failing_option_aborts_build() {
    let result = sandbox_client()
        .payment_request(dec!(1), "x", 1)
        .url_ok("javascript:alert(1)")
        .currency(Currency::USD)
        .build();
    assert!(matches!(result, Err(CoreError::InvalidField(_))));
}

#[test]
fn test_default_expiration_is_a_week_out() {
    let before = Local::now().naive_local();
    let request = sandbox_client()
        .payment_request(dec!(1), "x", 1)
        .build()
        .unwrap();
    let after = Local::now().naive_local();

    let expiration = request.expiration_time().unwrap();
    assert!(expiration >= before + Duration::days(7));
    assert!(expiration <= after + Duration::days(7));
}

#[test]
fn test_invalid_request_cannot_be_signed() {
    let client = sandbox_client();
    let request = client.payment_request(dec!(0.001), "x", 1).build().unwrap();

    let err = client.sign_request(&request).unwrap_err();
    assert!(matches!(err, CoreError::Encoding(_)));
    assert_eq!(request.encoded(), "");
    assert_eq!(request.checksum(), "");
}
