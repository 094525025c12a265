//! metric-bridge CLI entry point.

use metric_bridge::cli::{self, Cli};
use metric_bridge::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
