use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result};
use clap::Args;
use serde::Serialize;

use timevault_core::{decrypt_when_unlocked, EncryptedBundle, LockError, PollOptions};

use super::Context;
use crate::output::{print_info, print_json, print_success};

#[derive(Args)]
pub struct DecryptArgs {
    /// Bundle file
    #[arg(long)]
    pub bundle: PathBuf,
    /// Password given at encryption
    #[arg(long, env = "TIMEVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Wait for the unlock round instead of failing early
    #[arg(long)]
    pub wait: bool,
    /// Give up waiting after this many seconds
    #[arg(long, requires = "wait")]
    pub timeout_secs: Option<u64>,
    /// Plaintext output file (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// `--json` status for a successful decryption.
///
/// The plaintext is inlined only when it is UTF-8 and no output file was
/// given.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecryptReport {
    round: u64,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plaintext: Option<String>,
}

impl DecryptReport {
    fn new(round: u64, plaintext: Vec<u8>, output: Option<&PathBuf>) -> Result<Self> {
        let bytes = plaintext.len();
        let plaintext = match output {
            Some(_) => None,
            None => Some(String::from_utf8(plaintext).map_err(|_| {
                anyhow::anyhow!("Plaintext is binary; pass --output to write it with --json")
            })?),
        };
        Ok(Self {
            round,
            bytes,
            output: output.map(|p| p.display().to_string()),
            plaintext,
        })
    }
}

pub async fn run(args: DecryptArgs, ctx: &Context) -> Result<()> {
    let bundle = EncryptedBundle::load(&args.bundle)
        .with_context(|| format!("Failed to load {}", args.bundle.display()))?;
    let lock = ctx.lock().await?;

    let result = if args.wait {
        print_info(format!(
            "Waiting for round {} ({})",
            bundle.round_number,
            bundle.unlock_instant.to_rfc3339()
        ));
        let options = PollOptions {
            interval: None,
            deadline: args.timeout_secs.map(Duration::from_secs),
        };
        decrypt_when_unlocked(&lock, &bundle, &args.password, options).await
    } else {
        lock.decrypt(&bundle, &args.password).await
    };

    let plaintext = match result {
        Ok(plaintext) => plaintext,
        Err(LockError::TimeLockNotYetAvailable { round, available_at }) => {
            anyhow::bail!(
                "Bundle is still locked: round {} is published at {} (use --wait to block until then)",
                round,
                available_at.to_rfc3339()
            );
        }
        Err(err) => return Err(err).context("Decryption failed"),
    };

    if let Some(path) = &args.output {
        fs::write(path, &plaintext)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if ctx.json_output {
        let report = DecryptReport::new(bundle.round_number, plaintext, args.output.as_ref())?;
        return print_json(&report);
    }

    match &args.output {
        Some(path) => {
            print_success(format!(
                "Decrypted {} -> {} ({} bytes)",
                args.bundle.display(),
                path.display(),
                plaintext.len()
            ));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&plaintext)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
