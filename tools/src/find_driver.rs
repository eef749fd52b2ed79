// Jackson Coxson
// Checks whether an attached Apple USB device reports a given UDID as its serial

use std::io::Write;

use rusb::UsbContext;
use tracing::{debug, warn};

pub const APPLE_VENDOR_ID: u16 = 0x05ac;

/// A USB device as far as the serial lookup cares
pub trait UsbCandidate {
    /// Vendor and product id from the device descriptor
    fn ids(&self) -> Option<(u16, u16)>;
    /// Opens the device and reads its serial number string descriptor
    fn serial_number(&self) -> Option<String>;
}

impl<T: UsbContext> UsbCandidate for rusb::Device<T> {
    fn ids(&self) -> Option<(u16, u16)> {
        let desc = self.device_descriptor().ok()?;
        Some((desc.vendor_id(), desc.product_id()))
    }

    fn serial_number(&self) -> Option<String> {
        let desc = self.device_descriptor().ok()?;
        let handle = match self.open() {
            Ok(h) => h,
            Err(e) => {
                debug!(
                    "Unable to open {:03}:{:03}: {e}",
                    self.bus_number(),
                    self.address()
                );
                return None;
            }
        };
        handle.read_serial_number_string_ascii(&desc).ok()
    }
}

/// Walks `devices` looking for an Apple device with `product_id` whose serial equals `udid`
pub fn serial_matches<I>(devices: I, product_id: i64, udid: &str) -> bool
where
    I: IntoIterator,
    I::Item: UsbCandidate,
{
    devices.into_iter().any(|device| {
        match device.ids() {
            Some((APPLE_VENDOR_ID, pid)) if i64::from(pid) == product_id => {}
            _ => return false,
        }
        match device.serial_number() {
            Some(serial) => {
                debug!("Apple device {product_id:#06x} has serial {serial}");
                serial == udid
            }
            None => false,
        }
    })
}

/// Enumerates the host's USB devices, `false` if the backend is unavailable
pub fn find_driver(product_id: i64, udid: Option<&str>) -> bool {
    find_driver_in(rusb::Context::new, product_id, udid)
}

/// Same as [`find_driver`] with the libusb context supplied by `new_context`
pub fn find_driver_in<C, F>(new_context: F, product_id: i64, udid: Option<&str>) -> bool
where
    C: UsbContext,
    F: FnOnce() -> rusb::Result<C>,
{
    let Some(udid) = udid else {
        return false;
    };

    let context = match new_context() {
        Ok(c) => c,
        Err(e) => {
            warn!("Unable to initialize libusb: {e}");
            return false;
        }
    };
    let devices = match context.devices() {
        Ok(d) => d,
        Err(e) => {
            warn!("Unable to enumerate USB devices: {e}");
            return false;
        }
    };
    serial_matches(devices.iter(), product_id, udid)
}

/// Prints `TRUE` or `FALSE` with no trailing newline
pub fn main(product_id: i64, udid: Option<&str>) {
    let found = find_driver(product_id, udid);
    let mut stdout = std::io::stdout().lock();
    let res = write!(stdout, "{}", if found { "TRUE" } else { "FALSE" })
        .and_then(|_| stdout.flush());
    if let Err(e) = res {
        warn!("Failed to write output: {e}");
    }
}
