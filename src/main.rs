//! stratum: layered configuration and ordered component lifecycle

use anyhow::Result;

fn main() -> Result<()> {
    stratum::cli::run()
}
