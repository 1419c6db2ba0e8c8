//! Devices reported by a node scan

use serde::{Deserialize, Serialize};

/// An unconfigured ONU discovered on an OLT
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    /// Device serial number (unique key in the batch queue)
    #[serde(rename = "sn")]
    pub serial: String,
    #[serde(alias = "pon_port")]
    pub port: String,
    #[serde(alias = "pon_slot")]
    pub slot: String,
}

impl Device {
    pub fn new(serial: impl Into<String>, port: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            port: port.into(),
            slot: slot.into(),
        }
    }

    /// Port identifier shown in the queue, e.g. `1/3`
    pub fn port_label(&self) -> String {
        format!("{}/{}", self.port, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_label() {
        let device = Device::new("ZTEG0001", "1", "3");
        assert_eq!(device.port_label(), "1/3");
    }

    #[test]
    fn test_deserialize_scan_row() {
        let json = r#"{"sn": "HWTC0042", "pon_port": "2", "pon_slot": "7"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device, Device::new("HWTC0042", "2", "7"));
    }
}
