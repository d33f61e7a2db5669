use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as AnyhowContext, Result};
use clap::Args;

use timevault_core::{
    decrypt_when_unlocked, AsymmetricCryptosystem, ChainConfig, ChainParameters, HybridLock,
    LockErrorKind, P256Cryptosystem, PollOptions, SimulatedBeacon, TimeLockOracle, UnlockSpec,
};

use super::Context;
use crate::output::{print_error, print_info, print_success};

const MESSAGE: &[u8] = b"Hello";
const PASSWORD: &str = "p1";
const WRONG_PASSWORD: &str = "p2";

#[derive(Args)]
pub struct DemoArgs {
    /// Seconds until the message unlocks
    #[arg(long, default_value_t = 10)]
    pub seconds: u64,
    /// Use an in-process beacon on the quicknet schedule instead of the network
    #[arg(long)]
    pub simulated: bool,
}

pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    if args.simulated {
        let chain = ChainParameters::from_config(&ChainConfig::quicknet())?;
        let lock = HybridLock::new(
            Arc::new(P256Cryptosystem::default()),
            Arc::new(SimulatedBeacon::new(Arc::new(chain))?),
        );
        scenario(&lock, args.seconds).await
    } else {
        let lock = ctx.lock().await?;
        scenario(&lock, args.seconds).await
    }
}

async fn scenario<C, O>(lock: &HybridLock<C, O>, seconds: u64) -> Result<()>
where
    C: AsymmetricCryptosystem + 'static,
    C::PrivateKey: 'static,
    O: TimeLockOracle,
{
    let bundle = lock
        .encrypt(MESSAGE, PASSWORD, UnlockSpec::AfterMillis(seconds * 1000))
        .await
        .context("Encryption failed")?;
    print_info(format!(
        "Locked {:?} with {:?} until {} (round {})",
        String::from_utf8_lossy(MESSAGE),
        PASSWORD,
        bundle.unlock_instant.to_rfc3339(),
        bundle.round_number
    ));

    for password in [PASSWORD, WRONG_PASSWORD] {
        match lock.decrypt(&bundle, password).await {
            Err(err) if err.is_not_yet_available() => {
                print_success(format!("{:?} before unlock: {}", password, err))
            }
            Err(err) => bail!("unexpected failure before unlock with {:?}: {}", password, err),
            Ok(_) => bail!("bundle opened before its round with {:?}", password),
        }
    }

    print_info(format!("Waiting about {} seconds for the beacon", seconds));
    let options = PollOptions {
        interval: None,
        deadline: Some(Duration::from_secs(seconds + 60)),
    };
    let opened = decrypt_when_unlocked(lock, &bundle, PASSWORD, options)
        .await
        .context("Decryption after unlock failed")?;
    if opened != MESSAGE {
        print_error("decrypted bytes differ from the original message");
        bail!("round trip mismatch");
    }
    print_success(format!(
        "{:?} after unlock: {:?}",
        PASSWORD,
        String::from_utf8_lossy(&opened)
    ));

    match lock.decrypt(&bundle, WRONG_PASSWORD).await {
        Err(err) if err.kind() == LockErrorKind::Password => {
            print_success(format!("{:?} after unlock: {}", WRONG_PASSWORD, err))
        }
        Err(err) => bail!("unexpected failure with {:?}: {}", WRONG_PASSWORD, err),
        Ok(_) => bail!("wrong password opened the bundle"),
    }
    Ok(())
}
