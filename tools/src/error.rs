// Jackson Coxson

use std::net::AddrParseError;

use idevice::IdeviceError;
use thiserror::Error;

/// Exit status used for every device-side failure, the same as returning -1 from C's main
pub const EXIT_DEVICE_FAILURE: u8 = 255;

/// Everything that can stop the tool after argument parsing succeeded
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{}", not_found_message(.0.as_deref()))]
    DeviceNotFound(Option<String>),
    #[error("Unable to connect to usbmuxd: {0}")]
    Usbmuxd(#[source] IdeviceError),
    #[error("Could not connect to lockdownd: {0} ({code})", code = .0.code())]
    Lockdown(#[source] IdeviceError),
    #[error("Could not connect to lockdownd: unable to read pairing record: {0} ({code})", code = .0.code())]
    PairingFile(#[source] IdeviceError),
    #[error("Bad USBMUXD_SOCKET_ADDRESS: {0}")]
    InvalidUsbmuxdAddress(#[from] AddrParseError),
}

fn not_found_message(udid: Option<&str>) -> String {
    match udid {
        Some(udid) => format!("Device {udid} not found!"),
        None => "No device found!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_udid() {
        let e = ToolError::DeviceNotFound(Some("00008030-001A".to_string()));
        assert_eq!(e.to_string(), "Device 00008030-001A not found!");

        let e = ToolError::DeviceNotFound(None);
        assert_eq!(e.to_string(), "No device found!");
    }

    #[test]
    fn lockdown_errors_carry_the_library_code() {
        let e = ToolError::Lockdown(IdeviceError::InvalidHostID);
        assert_eq!(
            e.to_string(),
            format!(
                "Could not connect to lockdownd: {} ({})",
                IdeviceError::InvalidHostID,
                IdeviceError::InvalidHostID.code()
            )
        );
    }

    #[test]
    fn device_failures_exit_with_minus_one() {
        assert_eq!(EXIT_DEVICE_FAILURE as i8, -1);
    }
}
