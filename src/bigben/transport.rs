//! USB transport abstraction
//!
//! The supervisor only needs a blocking-with-timeout byte transfer to and
//! from the controller. [`Transport`] opens the device and hands back a
//! [`Connection`] that owns the handle; dropping the connection releases it.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No data arrived within the timeout; a normal outcome
    #[error("Transfer timed out")]
    Timeout,

    /// The device is gone (unplugged, or not present when opening)
    #[error("No such device")]
    NoDevice,

    #[error("Transport error: {0}")]
    Other(String),
}

/// An open device handle
pub trait Connection: Send {
    /// Read one interrupt report into `buf`, returning the number of bytes read
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Write one output report
    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<(), TransportError>;

    /// Release the handle. Implementations also release on drop.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// Opens connections to the controller
pub trait Transport: Send + 'static {
    type Connection: Connection;

    fn open(&mut self) -> Result<Self::Connection, TransportError>;
}

#[cfg(feature = "usb")]
pub use usb::{UsbConnection, UsbTransport};

#[cfg(feature = "usb")]
mod usb {
    use super::{Connection, Transport, TransportError};
    use crate::bigben::constants::{
        BIGBEN_VENDOR_ID, ENDPOINT_IN, ENDPOINT_OUT, SUPPORTED_PRODUCT_IDS, USB_INTERFACE,
    };
    use log::{debug, info, warn};
    use rusb::{Context, DeviceHandle, UsbContext};
    use std::time::Duration;

    impl From<rusb::Error> for TransportError {
        fn from(e: rusb::Error) -> Self {
            match e {
                rusb::Error::Timeout => TransportError::Timeout,
                rusb::Error::NoDevice | rusb::Error::NotFound => TransportError::NoDevice,
                other => TransportError::Other(other.to_string()),
            }
        }
    }

    /// libusb-backed transport.
    ///
    /// Owns the libusb context for its whole lifetime; the context is torn
    /// down when the transport is dropped.
    pub struct UsbTransport {
        context: Context,
        vendor_id: u16,
        product_ids: Vec<u16>,
    }

    impl UsbTransport {
        /// Create a transport that looks for any supported Bigben controller
        pub fn new() -> Result<Self, TransportError> {
            Ok(Self {
                context: Context::new()?,
                vendor_id: BIGBEN_VENDOR_ID,
                product_ids: SUPPORTED_PRODUCT_IDS.to_vec(),
            })
        }

        /// Restrict the transport to specific product IDs
        pub fn with_product_ids(mut self, product_ids: &[u16]) -> Self {
            self.product_ids = product_ids.to_vec();
            self
        }

        fn find_device(&self) -> Result<rusb::Device<Context>, TransportError> {
            for device in self.context.devices()?.iter() {
                let descriptor = match device.device_descriptor() {
                    Ok(d) => d,
                    Err(e) => {
                        debug!("Skipping device without descriptor: {}", e);
                        continue;
                    }
                };
                if descriptor.vendor_id() == self.vendor_id
                    && self.product_ids.contains(&descriptor.product_id())
                {
                    debug!(
                        "Found controller {:04x}:{:04x} on bus {} address {}",
                        descriptor.vendor_id(),
                        descriptor.product_id(),
                        device.bus_number(),
                        device.address()
                    );
                    return Ok(device);
                }
            }
            Err(TransportError::NoDevice)
        }
    }

    impl Transport for UsbTransport {
        type Connection = UsbConnection;

        fn open(&mut self) -> Result<UsbConnection, TransportError> {
            let device = self.find_device()?;
            let mut handle = device.open()?;

            // Not supported on every platform; claiming may still succeed
            if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
                debug!("Kernel driver auto-detach unavailable: {}", e);
            }

            handle.claim_interface(USB_INTERFACE)?;
            info!("✓ Claimed interface {} on Bigben controller", USB_INTERFACE);

            Ok(UsbConnection { handle })
        }
    }

    /// Claimed device handle; the interface is released on drop
    pub struct UsbConnection {
        handle: DeviceHandle<Context>,
    }

    impl Connection for UsbConnection {
        fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
            Ok(self.handle.read_interrupt(ENDPOINT_IN, buf, timeout)?)
        }

        fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<(), TransportError> {
            let written = self.handle.write_interrupt(ENDPOINT_OUT, buf, timeout)?;
            if written != buf.len() {
                return Err(TransportError::Other(format!(
                    "short write: {} of {} bytes",
                    written,
                    buf.len()
                )));
            }
            Ok(())
        }
    }

    impl Drop for UsbConnection {
        fn drop(&mut self) {
            if let Err(e) = self.handle.release_interface(USB_INTERFACE) {
                // Expected when the device was unplugged
                if e != rusb::Error::NoDevice {
                    warn!("Failed to release interface: {}", e);
                }
            }
            debug!("USB handle closed");
        }
    }
}
