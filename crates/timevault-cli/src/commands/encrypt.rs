use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context as AnyhowContext, Result};
use clap::Args;
use serde::Serialize;

use timevault_core::UnlockSpec;

use super::Context;
use crate::output::{print_json, print_success};

#[derive(Args)]
pub struct EncryptArgs {
    /// File to encrypt, or `-` for stdin
    #[arg(long)]
    pub input: String,
    /// Password required to decrypt
    #[arg(long, env = "TIMEVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// 1min, 1hour, 1day, 1week, 1month, 1year, custom:<ms>, or an RFC 3339 instant
    #[arg(long)]
    pub unlock: UnlockSpec,
    /// Bundle output file (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: EncryptArgs, ctx: &Context) -> Result<()> {
    let plaintext = if args.input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        fs::read(&args.input).with_context(|| format!("Failed to read {}", args.input))?
    };

    let lock = ctx.lock().await?;
    let bundle = lock
        .encrypt(&plaintext, &args.password, args.unlock)
        .await
        .context("Encryption failed")?;

    match &args.output {
        Some(path) => {
            bundle
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if ctx.json_output {
                #[derive(Serialize)]
                struct Output<'a> {
                    output: String,
                    round: u64,
                    unlock_instant: &'a chrono::DateTime<chrono::Utc>,
                }
                print_json(&Output {
                    output: path.display().to_string(),
                    round: bundle.round_number,
                    unlock_instant: &bundle.unlock_instant,
                })?;
            } else {
                print_success(format!(
                    "Encrypted {} -> {} (unlocks {} at round {})",
                    args.input,
                    path.display(),
                    bundle.unlock_instant.to_rfc3339(),
                    bundle.round_number
                ));
            }
        }
        None => println!("{}", bundle.to_json()?),
    }

    Ok(())
}
