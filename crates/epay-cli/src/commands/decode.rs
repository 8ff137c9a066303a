//! `epay decode`: Decode a base64 payload and show what it contains.

use clap::Args;
use epay_core::encoding::{decode_payload, records, Record};
use epay_core::parse_callback;

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// The base64 payload.
    pub encoded: String,

    /// Interpret the payload as a payment notification and print it as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &DecodeArgs) -> anyhow::Result<()> {
    let text = decode_payload(&args.encoded)?;

    if args.json {
        let parsed = parse_callback(&text);
        for issue in &parsed.issues {
            eprintln!("warning: {}", issue);
        }
        println!("{}", serde_json::to_string_pretty(&parsed.payment)?);
        return Ok(());
    }

    for record in records(&text) {
        match record {
            Record::Field { key, value } => println!("{:<12} {}", key, value),
            Record::Malformed(line) => println!("{:<12} {}", "?", line),
        }
    }
    Ok(())
}
