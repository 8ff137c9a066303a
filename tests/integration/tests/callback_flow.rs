//! Integration test: a request issued by the merchant and the gateway's
//! notification about it, end to end.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use epay_core::{checksum, CallbackOutcome, CallbackState, Payment, PaymentStatus, ReplyStatus};
use epay_integration_tests::{fixed_time, sandbox_client, RecordingHandler, Verdict, SECRET};
use rust_decimal_macros::dec;

fn signed(text: &str) -> (String, String) {
    let encoded = STANDARD.encode(text);
    let checksum = checksum::sign(encoded.as_bytes(), SECRET.as_bytes());
    (encoded, checksum)
}

#[test]
fn test_request_then_paid_notification() {
    let client = sandbox_client();
    let request = client
        .payment_request(dec!(10), "Order 55", 55)
        .build()
        .unwrap();
    client.sign_request(&request).unwrap();

    // The gateway reports the payment for the same invoice.
    let payment = Payment {
        invoice: request.invoice(),
        status: PaymentStatus::Paid,
        pay_time: Some(fixed_time()),
        stan: 99,
        bcode: "ABC".into(),
    };
    let encoded = payment.encode();
    let checksum = checksum::sign(encoded.as_bytes(), SECRET.as_bytes());

    let handler = RecordingHandler::new(Verdict::Accept);
    let reply = client.handle_callback(&encoded, &checksum, &handler);

    assert_eq!(reply.body(), "INVOICE=55:STATUS=OK\n");
    assert_eq!(reply.state, CallbackState::RepliedOk);
    assert_eq!(handler.seen(), vec![payment]);
}

#[test]
fn test_gateway_payload_with_extra_keys() {
    let (encoded, checksum) = signed(
        "MIN=123\nINVOICE=55\nAMOUNT=10.00\nEXP_TIME=05.03.2024 14:30:00\nSTATUS=PAID\nSTAN=99\nBCODE=ABC\n",
    );
    let handler = RecordingHandler::new(Verdict::Accept);
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);

    assert_eq!(reply.body(), "INVOICE=55:STATUS=OK\n");
    let seen = handler.seen();
    assert_eq!(seen[0].stan, 99);
    assert_eq!(seen[0].bcode, "ABC");
}

#[test]
fn test_crlf_payload_accepted() {
    let (encoded, checksum) = signed("INVOICE=8\r\nSTATUS=EXPIRED\r\n\r\n");
    let handler = RecordingHandler::new(Verdict::Accept);
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);

    assert_eq!(reply.body(), "INVOICE=8:STATUS=OK\n");
    assert_eq!(handler.seen()[0].status, PaymentStatus::Expired);
}

#[test]
fn test_tampered_payload_rejected() {
    let (encoded, checksum) = signed("INVOICE=55\nSTATUS=DENIED\n");
    let forged = STANDARD.encode("INVOICE=55\nSTATUS=PAID\n");

    let handler = RecordingHandler::new(Verdict::Accept);
    let reply = sandbox_client().handle_callback(&forged, &checksum, &handler);

    assert_eq!(reply.body(), "INVOICE=0:STATUS=ERR\n");
    assert_eq!(handler.calls(), 0);
    match reply.outcome {
        CallbackOutcome::ChecksumMismatch { expected, received } => {
            assert_eq!(received, checksum);
            assert_ne!(expected, checksum);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    // The original is still fine.
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);
    assert_eq!(reply.status, ReplyStatus::Ok);
}

#[test]
fn test_unknown_invoice_replies_no() {
    let (encoded, checksum) = signed("INVOICE=404\nSTATUS=PAID\n");
    let handler = RecordingHandler::new(Verdict::UnknownInvoice);
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);
    assert_eq!(reply.body(), "INVOICE=404:STATUS=NO\n");
    assert_eq!(handler.calls(), 1);
}

#[test]
fn test_handler_failure_replies_err() {
    let (encoded, checksum) = signed("INVOICE=12\nSTATUS=PAID\n");
    let handler = RecordingHandler::new(Verdict::Fail);
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);
    assert_eq!(reply.body(), "INVOICE=12:STATUS=ERR\n");
    assert_eq!(
        reply.outcome,
        CallbackOutcome::HandlerFailed("ledger unavailable".into())
    );
}

#[test]
fn test_unparseable_pay_time_skips_handler() {
    let (encoded, checksum) = signed("INVOICE=12\nSTATUS=PAID\nPAY_TIME=2024-03-05T14:30:00\n");
    let handler = RecordingHandler::new(Verdict::Accept);
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);
    assert_eq!(reply.body(), "INVOICE=12:STATUS=ERR\n");
    assert_eq!(reply.state, CallbackState::RepliedErr);
    assert_eq!(handler.calls(), 0);
}

#[test]
fn test_missing_invoice_reaches_handler_as_zero() {
    let (encoded, checksum) = signed("STATUS=PAID\n");
    let handler = RecordingHandler::new(Verdict::UnknownInvoice);
    let reply = sandbox_client().handle_callback(&encoded, &checksum, &handler);
    assert_eq!(reply.body(), "INVOICE=0:STATUS=NO\n");
}

#[test]
fn test_unknown_status_passed_through() {
    let (encoded, checksum) = signed("INVOICE=3\nSTATUS=REVERSED\n");
    let handler = RecordingHandler::new(Verdict::Accept);
    sandbox_client().handle_callback(&encoded, &checksum, &handler);
    assert_eq!(
        handler.seen()[0].status,
        PaymentStatus::Unknown("REVERSED".into())
    );
}
