use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use timevault_core::{TimeLockOracle, UnlockSpec};

use super::Context;
use crate::output::print_json;

#[derive(Args)]
pub struct RoundArgs {
    /// 1min, 1hour, 1day, 1week, 1month, 1year, custom:<ms>, or an RFC 3339 instant
    #[arg(long)]
    pub at: UnlockSpec,
}

pub async fn run(args: RoundArgs, ctx: &Context) -> Result<()> {
    let lock = ctx.lock().await?;
    let unlock_instant = args.at.resolve(Utc::now());
    let round = lock.oracle().round_for_instant(unlock_instant);
    let published_at = lock.oracle().round_available_at(round);

    if ctx.json_output {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output {
            unlock_instant: String,
            round: u64,
            published_at: String,
        }
        print_json(&Output {
            unlock_instant: unlock_instant.to_rfc3339(),
            round,
            published_at: published_at.to_rfc3339(),
        })?;
    } else {
        println!("unlock instant: {}", unlock_instant.to_rfc3339());
        println!("round:          {}", round);
        println!("published at:   {}", published_at.to_rfc3339());
    }
    Ok(())
}
