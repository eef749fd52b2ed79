// Jackson Coxson
// Toggles AssistiveTouch through the lockdown accessibility domain

use std::io::Write;

use idevice::provider::IdeviceProvider;
use plist::Value;
use tracing::warn;

use crate::{cli::AssistiveAction, common::connect_lockdown, error::ToolError, output};

pub const LABEL: &str = "oa";
pub const ACCESSIBILITY_DOMAIN: &str = "com.apple.Accessibility";
pub const ASSISTIVE_TOUCH_KEY: &str = "AssistiveTouchEnabledByiTunes";

/// The value written for an enable or disable request, `None` for a read
pub fn requested_state(action: AssistiveAction) -> Option<bool> {
    match action {
        AssistiveAction::Enable => Some(true),
        AssistiveAction::Disable => Some(false),
        AssistiveAction::Get => None,
    }
}

pub async fn main(
    provider: &dyn IdeviceProvider,
    action: AssistiveAction,
) -> Result<(), ToolError> {
    let mut lockdown_client = connect_lockdown(provider, true).await?;
    let mut stdout = std::io::stdout();

    let res = match requested_state(action) {
        None => match lockdown_client
            .get_value(Some(ASSISTIVE_TOUCH_KEY), Some(ACCESSIBILITY_DOMAIN))
            .await
        {
            Ok(value) => output::write_key_value(&mut stdout, &value),
            Err(e) => {
                warn!("Unable to read {ASSISTIVE_TOUCH_KEY}: {e}");
                Ok(())
            }
        },
        Some(enabled) => match lockdown_client
            .set_value(
                ASSISTIVE_TOUCH_KEY,
                Value::Boolean(enabled),
                Some(ACCESSIBILITY_DOMAIN),
            )
            .await
        {
            Ok(()) => write!(stdout, "1"),
            Err(e) => {
                warn!("Unable to set {ASSISTIVE_TOUCH_KEY}: {e}");
                Ok(())
            }
        },
    };

    if let Err(e) = res.and_then(|_| stdout.flush()) {
        warn!("Failed to write output: {e}");
    }
    Ok(())
}
