// Jackson Coxson
// Lockdown query, the core of ideviceinfo

use std::io::Write;

use idevice::provider::IdeviceProvider;
use tracing::{debug, warn};

use crate::{
    cli::{OutputFormat, is_domain_known},
    common::connect_lockdown,
    error::ToolError,
    output,
};

pub const LABEL: &str = "ideviceinfo";

/// Runs one GetValue against lockdown and prints the answer.
///
/// Only connection failures are errors; a refused query prints nothing.
pub async fn main(
    provider: &dyn IdeviceProvider,
    domain: Option<&str>,
    key: Option<&str>,
    format: OutputFormat,
    simple: bool,
) -> Result<(), ToolError> {
    if let Some(domain) = domain
        && !is_domain_known(domain)
    {
        warn!("Sending query with unknown domain \"{domain}\"");
    }

    let mut lockdown_client = connect_lockdown(provider, !simple).await?;

    debug!("Querying domain {domain:?} key {key:?}");
    match lockdown_client.get_value(key, domain).await {
        Ok(value) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = output::write_value(&mut stdout, &value, format)
                .and_then(|_| stdout.flush())
            {
                warn!("Failed to write output: {e}");
            }
        }
        Err(e) => {
            warn!("GetValue failed: {e}");
        }
    }

    Ok(())
}
