//! `epay init`: Write a default configuration file.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

const DEFAULT_CONFIG: &str = r#"# ePay Configuration

[gateway]
# production or sandbox
environment = "sandbox"
cin = ""
# Leave empty and export EPAY_SECRET instead.
secret = ""
default_language = "en"
default_currency = "EUR"

[api]
listen_addr = "127.0.0.1"
port = 8080
notify_path = "/epay/notify"
# Invoices kept in memory before new ones are refused.
max_invoices = 10000

[logging]
level = "info"
format = "text"
"#;

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join("epay.toml");

    if config_path.exists() && !args.force {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    std::fs::create_dir_all(&args.dir)?;
    std::fs::write(&config_path, DEFAULT_CONFIG)?;

    println!("Wrote {}", config_path.display());
    println!("Set gateway.cin and EPAY_SECRET, then run 'epay-node'.");
    Ok(())
}
