use serde::Serialize;

/// Parse the integer after the last `:` of a device line, e.g. `SENSOR_BAUD:57600`.
pub fn parse_trailing_u32(line: &str) -> Option<u32> {
    line.rsplit(':').next()?.trim().parse().ok()
}

/// Sensor facts extracted from the INFO reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    pub detected: bool,
    pub baud: u32,
    pub templates: u32,
}

impl SensorReading {
    /// Scan reply lines for `SENSOR_BAUD:`/`BAUDRATE:` and `TEMPLATES:`.
    ///
    /// Unparseable values leave the previous value in place (0 initially);
    /// later lines override earlier ones.
    pub fn scan(lines: &[String]) -> Self {
        let mut reading = Self::default();
        for line in lines {
            if line.contains("SENSOR_BAUD:") || line.contains("BAUDRATE:") {
                match parse_trailing_u32(line) {
                    Some(baud) => {
                        reading.baud = baud;
                        reading.detected = true;
                    }
                    None => log::warn!("Ignoring unparseable sensor baud line: {line}"),
                }
            }
            if line.contains("TEMPLATES:") {
                match parse_trailing_u32(line) {
                    Some(count) => reading.templates = count,
                    None => log::warn!("Ignoring unparseable template count line: {line}"),
                }
            }
        }
        reading
    }

    /// Sensor speed agrees with the host-side configuration.
    pub fn baud_matches(&self, host_baud: u32) -> bool {
        self.baud == host_baud
    }
}

/// A single decoded line from the firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceReply {
    Pong,
    /// `STATUS:<detail>`
    Status { detail: String },
    /// `ERROR:<code>:<message>`
    Error { code: String, message: String },
    /// `VERIFY_SUCCESS:<id>:<confidence>`
    Match { template_id: u32, confidence: u32 },
    Text { line: String },
}

impl DeviceReply {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line == "PONG" {
            return DeviceReply::Pong;
        }
        if let Some(rest) = line.strip_prefix("STATUS:") {
            return DeviceReply::Status {
                detail: rest.to_string(),
            };
        }
        if let Some(rest) = line.strip_prefix("ERROR:") {
            let mut parts = rest.splitn(2, ':');
            let code = parts.next().unwrap_or("UNKNOWN").trim();
            let message = parts.next().unwrap_or("").trim();
            return DeviceReply::Error {
                code: if code.is_empty() { "UNKNOWN" } else { code }.to_string(),
                message: message.to_string(),
            };
        }
        if let Some(rest) = line.strip_prefix("VERIFY_SUCCESS:") {
            let mut parts = rest.split(':').map(|p| p.trim().parse::<u32>());
            if let (Some(Ok(template_id)), Some(Ok(confidence))) = (parts.next(), parts.next()) {
                return DeviceReply::Match {
                    template_id,
                    confidence,
                };
            }
        }
        DeviceReply::Text {
            line: line.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_reads_baud_and_templates() {
        let reading = SensorReading::scan(&lines(&[
            "INFO:DY50",
            "SENSOR_BAUD:57600",
            "TEMPLATES:12",
        ]));
        assert!(reading.detected);
        assert_eq!(reading.baud, 57600);
        assert_eq!(reading.templates, 12);
        assert!(reading.baud_matches(57600));
        assert!(!reading.baud_matches(9600));
    }

    #[test]
    fn test_scan_accepts_baudrate_alias_with_prefix() {
        let reading = SensorReading::scan(&lines(&["INFO:BAUDRATE: 115200"]));
        assert!(reading.detected);
        assert_eq!(reading.baud, 115200);
    }

    #[test]
    fn test_malformed_values_default_to_zero() {
        let reading = SensorReading::scan(&lines(&["TEMPLATES:abc", "SENSOR_BAUD:fast"]));
        assert_eq!(reading, SensorReading::default());
    }

    #[test]
    fn test_malformed_line_keeps_earlier_value() {
        let reading = SensorReading::scan(&lines(&["TEMPLATES:4", "TEMPLATES:?"]));
        assert_eq!(reading.templates, 4);
    }

    #[test]
    fn test_decode_tagged_replies() {
        assert_eq!(DeviceReply::parse("PONG"), DeviceReply::Pong);
        assert_eq!(
            DeviceReply::parse("STATUS:TEMPLATES:3"),
            DeviceReply::Status {
                detail: "TEMPLATES:3".to_string()
            }
        );
        assert_eq!(
            DeviceReply::parse("ERROR:NOT_FOUND:No match"),
            DeviceReply::Error {
                code: "NOT_FOUND".to_string(),
                message: "No match".to_string()
            }
        );
        assert_eq!(
            DeviceReply::parse("VERIFY_SUCCESS:7:88"),
            DeviceReply::Match {
                template_id: 7,
                confidence: 88
            }
        );
        assert_eq!(
            DeviceReply::parse("VERIFY_SUCCESS:x"),
            DeviceReply::Text {
                line: "VERIFY_SUCCESS:x".to_string()
            }
        );
    }
}
