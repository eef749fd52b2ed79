// Jackson Coxson
// Device selection and lockdown connection shared by the query and AssistiveTouch paths

use idevice::{
    IdeviceService,
    lockdown::LockdownClient,
    pairing_file::PairingFile,
    provider::{IdeviceProvider, TcpProvider},
    usbmuxd::{Connection, UsbmuxdAddr, UsbmuxdDevice},
};
use tracing::debug;

use crate::{
    cli::{LookupOptions, Options},
    error::ToolError,
};

/// Picks the device to talk to out of a usbmuxd device list.
///
/// USB devices are preferred over network devices when both lookups are allowed.
/// With a UDID only an exact match of an allowed connection type is returned.
pub fn select_device<'a>(
    devices: &'a [UsbmuxdDevice],
    udid: Option<&str>,
    lookup: LookupOptions,
) -> Option<&'a UsbmuxdDevice> {
    let wanted = |device: &&UsbmuxdDevice| udid.is_none_or(|udid| device.udid == udid);

    let usb = devices
        .iter()
        .filter(|d| lookup.usb && d.connection_type == Connection::Usb);
    let network = devices
        .iter()
        .filter(|d| lookup.network && matches!(d.connection_type, Connection::Network(_)));

    usb.chain(network).find(wanted)
}

pub async fn get_provider(
    options: &Options,
    label: &str,
) -> Result<Box<dyn IdeviceProvider>, ToolError> {
    if let Some(host) = options.host
        && let Some(pairing_file) = &options.pairing_file
    {
        let pairing_file =
            PairingFile::read_from_file(pairing_file).map_err(ToolError::PairingFile)?;
        debug!("Connecting to {host} directly");
        return Ok(Box::new(TcpProvider {
            addr: host,
            pairing_file,
            label: label.to_string(),
        }));
    }

    let addr = UsbmuxdAddr::from_env_var()?;
    let mut usbmuxd = addr.connect(1).await.map_err(ToolError::Usbmuxd)?;
    let devices = usbmuxd.get_devices().await.map_err(ToolError::Usbmuxd)?;
    debug!("usbmuxd reported {} device(s)", devices.len());

    let device = select_device(&devices, options.udid.as_deref(), options.lookup)
        .ok_or_else(|| ToolError::DeviceNotFound(options.udid.clone()))?;
    debug!(
        "Selected {} ({:?}, mux id {})",
        device.udid, device.connection_type, device.device_id
    );

    Ok(Box::new(device.to_provider(addr, label)))
}

/// Opens lockdown, optionally completing the TLS session handshake with the pairing record
pub async fn connect_lockdown(
    provider: &dyn IdeviceProvider,
    handshake: bool,
) -> Result<LockdownClient, ToolError> {
    let mut lockdown_client = LockdownClient::connect(provider)
        .await
        .map_err(ToolError::Lockdown)?;

    if handshake {
        let pairing_file = provider
            .get_pairing_file()
            .await
            .map_err(ToolError::PairingFile)?;
        lockdown_client
            .start_session(&pairing_file)
            .await
            .map_err(ToolError::Lockdown)?;
        debug!("Lockdown session started");
    }

    Ok(lockdown_client)
}
