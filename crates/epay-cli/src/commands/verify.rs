//! `epay verify`: Check a checksum against an encoded payload.

use clap::Args;
use epay_core::checksum;

use super::GatewayArgs;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// The base64 payload, exactly as received.
    #[arg(short, long)]
    pub encoded: String,

    /// The hex checksum to check.
    #[arg(short = 'k', long)]
    pub checksum: String,
}

pub fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let gateway = args.gateway.gateway()?;
    let secret = args.gateway.secret(&gateway);
    if secret.is_empty() {
        anyhow::bail!("no secret configured (use --secret or EPAY_SECRET)");
    }

    checksum::verify_checksum(args.encoded.as_bytes(), secret.as_bytes(), &args.checksum)?;
    println!("Checksum OK");
    Ok(())
}
