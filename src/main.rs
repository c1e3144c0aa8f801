use anyhow::Result;

use dou_robo::cli;
use dou_robo::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // logging first: setup failures should be visible
    logging::init();

    // batch failures are reported in the batch report, not via exit code;
    // an Err here means setup itself was unrecoverable
    cli::run().await?;

    Ok(())
}
