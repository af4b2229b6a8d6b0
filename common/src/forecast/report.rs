use core::fmt::Write;

use super::buffer::BoundedText;
use crate::error::CapacityError;
use crate::sensor::Reading;

/// Upper bound of request paths and report bodies.
pub const FORM_CAPACITY: usize = 96;

pub type FormBody = heapless::String<FORM_CAPACITY>;
pub type RequestPath = heapless::String<FORM_CAPACITY>;

/// Outdoor text reported when the forecast is unavailable.
pub const PLACEHOLDER: &str = "?";

/// `/{location}?0Tm&format=%t`: current conditions, metric units, temperature
/// only.
pub fn forecast_path(location: &str) -> Result<RequestPath, CapacityError> {
    let mut path = RequestPath::new();
    write!(path, "/{location}?0Tm&format=%t").map_err(|_| CapacityError {
        needed: location.len() + 15,
        capacity: FORM_CAPACITY,
    })?;
    Ok(path)
}

/// Escapes the characters that would change the meaning of a form field value.
///
/// Everything else, including non-ASCII text such as `°`, passes through
/// unchanged.
fn push_form_value(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' | '=' | '+' | '%' | '#' | '\0'..=' ' | '\x7f' => {
                let _ = write!(out, "%{:02X}", u32::from(ch));
            }
            _ => out.push(ch),
        }
    }
}

/// One cycle's report to the collector.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportPayload {
    pub local_temperature: f64,
    pub local_humidity: f64,
    pub outdoor: BoundedText,
}

impl ReportPayload {
    pub fn new(reading: &Reading, outdoor: BoundedText) -> Self {
        Self {
            local_temperature: reading.temperature,
            local_humidity: reading.humidity,
            outdoor,
        }
    }

    pub fn placeholder_text() -> BoundedText {
        let mut text = BoundedText::new();
        let _ = text.push_str(PLACEHOLDER);
        text
    }

    /// Replaces the outdoor text with the placeholder.
    pub fn without_outdoor(&self) -> Self {
        Self {
            outdoor: Self::placeholder_text(),
            ..self.clone()
        }
    }

    /// `localtemp=<2dp>&localhumi=<2dp>&outtemp=<text>`
    pub fn encode(&self) -> Result<FormBody, CapacityError> {
        let mut body = format!(
            "localtemp={:.2}&localhumi={:.2}&outtemp=",
            self.local_temperature, self.local_humidity
        );
        push_form_value(&mut body, &self.outdoor);

        let mut encoded = FormBody::new();
        encoded.push_str(&body).map_err(|_| CapacityError {
            needed: body.len(),
            capacity: FORM_CAPACITY,
        })?;
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> BoundedText {
        let mut text = BoundedText::new();
        text.push_str(value).unwrap();
        text
    }

    #[test]
    fn test_forecast_path() {
        assert_eq!(forecast_path("Santa+Cruz").unwrap(), "/Santa+Cruz?0Tm&format=%t");
        assert_eq!(forecast_path("").unwrap(), "/?0Tm&format=%t");
    }

    #[test]
    fn test_forecast_path_with_longest_location() {
        let location = "l".repeat(47);
        assert_eq!(forecast_path(&location).unwrap().len(), 62);
    }

    #[test]
    fn test_encode_two_decimals() {
        let payload = ReportPayload {
            local_temperature: 18.648930,
            local_humidity: 7.0,
            outdoor: text("12°C"),
        };
        assert_eq!(
            payload.encode().unwrap(),
            "localtemp=18.65&localhumi=7.00&outtemp=12°C"
        );
    }

    #[test]
    fn test_encode_placeholder() {
        let payload = ReportPayload::new(
            &Reading {
                temperature: -5.0,
                humidity: 100.0,
            },
            ReportPayload::placeholder_text(),
        );
        assert_eq!(payload.outdoor, "?");
        assert_eq!(
            payload.encode().unwrap(),
            "localtemp=-5.00&localhumi=100.00&outtemp=?"
        );
    }

    #[test]
    fn test_encode_escapes_form_delimiters() {
        let payload = ReportPayload {
            local_temperature: 1.0,
            local_humidity: 2.0,
            outdoor: text("+12°C &x=1"),
        };
        assert_eq!(
            payload.encode().unwrap(),
            "localtemp=1.00&localhumi=2.00&outtemp=%2B12°C%20%26x%3D1"
        );
    }

    #[test]
    fn test_encode_overflow_is_reported() {
        let payload = ReportPayload {
            local_temperature: 1.0,
            local_humidity: 2.0,
            outdoor: text(&"+".repeat(47)),
        };
        let err = payload.encode().unwrap_err();
        assert_eq!(err.capacity, 96);
        assert_eq!(err.needed, 38 + 47 * 3);

        assert!(payload.without_outdoor().encode().is_ok());
    }
}
