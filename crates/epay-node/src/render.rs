//! HTML for the page that forwards the customer to the gateway.

use epay_core::PaymentRequest;
use std::fmt::Write;

/// Escape text for use inside HTML attribute values and element content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render an auto-submitting form posting a signed request to the gateway.
///
/// The request must already be signed; its cached payload and checksum are
/// what gets rendered.
pub fn payment_form(request: &PaymentRequest) -> String {
    let mut inputs = String::new();
    for (name, value) in request.form_fields() {
        // Writing to a String cannot fail.
        let _ = writeln!(
            inputs,
            r#"    <input type="hidden" name="{}" value="{}">"#,
            name,
            escape_html(&value)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Redirecting to ePay</title>
</head>
<body onload="document.forms[0].submit()">
  <form action="{action}" method="POST">
{inputs}    <noscript><button type="submit">Continue to payment</button></noscript>
  </form>
  <p>{description}</p>
</body>
</html>
"#,
        action = escape_html(request.url()),
        inputs = inputs,
        description = escape_html(request.description()),
    )
}
