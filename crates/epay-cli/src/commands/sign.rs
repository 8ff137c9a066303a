//! `epay sign`: Encode and sign a payment request.

use clap::Args;
use serde_json::{Map, Value};

use super::encode::RequestArgs;
use super::GatewayArgs;

#[derive(Args, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Print the form as JSON instead of KEY=value lines.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &SignArgs) -> anyhow::Result<()> {
    let gateway = args.gateway.gateway()?;
    let client = args.gateway.client(&gateway)?;

    let request = client
        .payment_request(
            args.request.amount,
            args.request.description.clone(),
            args.request.invoice,
        )
        .options(args.request.options(gateway.default_currency))
        .build()?;
    client.sign_request(&request)?;

    if args.json {
        let mut fields = Map::new();
        fields.insert("action".into(), Value::String(request.url().to_string()));
        for (name, value) in request.form_fields() {
            fields.insert(name.to_string(), Value::String(value));
        }
        println!("{}", serde_json::to_string_pretty(&Value::Object(fields))?);
    } else {
        println!("POST {}", request.url());
        for (name, value) in request.form_fields() {
            println!("{}={}", name, value);
        }
    }
    Ok(())
}
