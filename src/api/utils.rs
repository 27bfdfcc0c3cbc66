use anyhow::{anyhow, Result};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

/// Open a serial port 8N1 with the requested timeout, enabling exclusive access on Unix systems.
pub fn open_serial_port(
    port: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn serialport::SerialPort>> {
    if port.trim().is_empty() {
        return Err(anyhow!("No serial port configured"));
    }

    let builder = serialport::new(port, baud_rate)
        .timeout(timeout)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None);

    #[cfg(unix)]
    {
        let mut handle = builder
            .open_native()
            .map_err(|err| anyhow!("Failed to open port {port}: {err}"))?;
        handle
            .set_exclusive(true)
            .map_err(|err| anyhow!("Failed to acquire exclusive access to {port}: {err}"))?;
        log::info!("Opened {port} @ {baud_rate} baud (exclusive)");
        Ok(Box::new(handle))
    }

    #[cfg(not(unix))]
    {
        let handle = builder
            .open()
            .map_err(|err| anyhow!("Failed to open port {port}: {err}"))?;
        log::info!("Opened {port} @ {baud_rate} baud");
        Ok(handle)
    }
}
