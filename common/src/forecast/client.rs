// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use log::{debug, error, info, warn};

use super::buffer::{text_of, BoundedText, CaptureBuffer};
use super::report::{forecast_path, ReportPayload};
use super::{HttpTransport, Method, Request};
use crate::config::{Endpoint, NodeConfig};
use crate::error::HttpError;
use crate::orchestrator::Reporter;
use crate::sensor::Reading;

/// Location string handed out by the collector, captured once at startup.
/// Empty if the lookup failed.
pub type LocationCache = BoundedText;

const STATUS_OK: u16 = 200;

const NODE_USER_AGENT: &str = "esp32c3";
const FORECAST_USER_AGENT: &str = "curl/8.7.1";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Talks to the collector and the forecast provider.
pub struct ForecastClient<T> {
    transport: T,
    collector: Endpoint,
    forecast: Endpoint,
    location: LocationCache,
}

impl<T: HttpTransport> ForecastClient<T> {
    pub fn new(transport: T, collector: Endpoint, forecast: Endpoint) -> Self {
        Self {
            transport,
            collector,
            forecast,
            location: LocationCache::new(),
        }
    }

    pub fn from_config(transport: T, config: &NodeConfig) -> Self {
        Self::new(transport, config.collector, config.forecast)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Asks the collector where the node is. Runs once; a failure leaves the
    /// cache empty for the rest of the process lifetime.
    pub fn lookup_location(&mut self) -> &str {
        let headers = [
            ("Accept", "*/*"),
            ("Host", self.collector.host),
            ("User-Agent", NODE_USER_AGENT),
        ];
        let request = Request {
            method: Method::Get,
            endpoint: &self.collector,
            path: "/location",
            headers: &headers,
            follow_redirects: false,
            body: None,
        };

        let mut body = CaptureBuffer::new();
        match self.transport.execute(&request, &mut body) {
            Ok(status) => {
                debug!("location status: {status}");
                self.location = text_of(&body);
                info!("location: {}", self.location);
            }
            Err(e) => error!("location lookup: {e}"),
        }

        if self.location.is_empty() {
            warn!("no location, forecasts will use an empty path segment");
        }
        &self.location
    }

    /// Current outdoor temperature text, or `"?"` if it could not be fetched.
    pub fn fetch_outdoor(&mut self) -> BoundedText {
        match self.try_fetch_outdoor() {
            Ok(text) => text,
            Err(e) => {
                warn!("wttr: {e}");
                ReportPayload::placeholder_text()
            }
        }
    }

    fn try_fetch_outdoor(&mut self) -> Result<BoundedText, HttpError> {
        let path = forecast_path(&self.location).map_err(|e| HttpError::Transport(e.to_string()))?;
        let headers = [
            ("Accept", "text/html,text/plain,*/*"),
            ("Accept-Language", "en-US,en"),
            ("Connection", "keep-alive"),
            ("Host", self.forecast.host),
            ("User-Agent", FORECAST_USER_AGENT),
        ];
        let request = Request {
            method: Method::Get,
            endpoint: &self.forecast,
            path: &path,
            headers: &headers,
            follow_redirects: true,
            body: None,
        };

        let mut body = CaptureBuffer::new();
        let status = self.transport.execute(&request, &mut body)?;
        if status != STATUS_OK {
            return Err(HttpError::UnexpectedStatus(status));
        }

        debug!("wttr status 200 OK, {} bytes", body.len());
        Ok(text_of(&body))
    }

    /// Posts `payload` to the collector. The response is not inspected.
    pub fn post_report(&mut self, payload: &ReportPayload) -> Result<(), HttpError> {
        let form = match payload.encode() {
            Ok(form) => form,
            Err(e) => {
                warn!("report body: {e}, sending placeholder");
                payload
                    .without_outdoor()
                    .encode()
                    .map_err(|e| HttpError::Transport(e.to_string()))?
            }
        };
        debug!("post: {form}");

        let content_length = form.len().to_string();
        let headers = [
            ("Host", self.collector.host),
            ("User-Agent", NODE_USER_AGENT),
            ("Content-Type", FORM_CONTENT_TYPE),
            ("Content-Length", content_length.as_str()),
        ];
        let request = Request {
            method: Method::Post,
            endpoint: &self.collector,
            path: "/weather",
            headers: &headers,
            follow_redirects: false,
            body: Some(form.as_bytes()),
        };

        let mut ignored = CaptureBuffer::new();
        self.transport.execute(&request, &mut ignored)?;
        Ok(())
    }

    /// One reporting step: fetch the outdoor temperature, then post it
    /// together with the local reading. Failures are logged only.
    pub fn fetch_and_report(&mut self, local_temperature: f64, local_humidity: f64) -> ReportPayload {
        let reading = Reading {
            temperature: local_temperature,
            humidity: local_humidity,
        };
        let payload = ReportPayload::new(&reading, self.fetch_outdoor());

        if let Err(e) = self.post_report(&payload) {
            error!("weather post: {e}");
        }

        info!(
            "location:\t{}\twttr.in temp:\t{}\tlocal temp:\t{:.2}°C\tlocal humidity:\t{:.2}%",
            self.location, payload.outdoor, payload.local_temperature, payload.local_humidity
        );
        payload
    }

    #[cfg(test)]
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: HttpTransport> Reporter for ForecastClient<T> {
    fn report(&mut self, reading: &Reading) {
        self.fetch_and_report(reading.temperature, reading.humidity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    struct Recorded {
        method: Method,
        url: String,
        headers: Vec<(String, String)>,
        follow_redirects: bool,
        body: Option<Vec<u8>>,
    }

    impl Recorded {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }
    }

    /// Replays scripted responses in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: VecDeque<Result<(u16, &'static [u8]), HttpError>>,
        requests: Vec<Recorded>,
    }

    impl ScriptedTransport {
        fn respond(mut self, status: u16, body: &'static [u8]) -> Self {
            self.responses.push_back(Ok((status, body)));
            self
        }

        fn fail(mut self, reason: &str) -> Self {
            self.responses
                .push_back(Err(HttpError::Transport(reason.to_string())));
            self
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn execute(&mut self, request: &Request<'_>, body: &mut CaptureBuffer) -> Result<u16, HttpError> {
            self.requests.push(Recorded {
                method: request.method,
                url: request.url(),
                headers: request
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                follow_redirects: request.follow_redirects,
                body: request.body.map(<[u8]>::to_vec),
            });

            let (status, payload) = self
                .responses
                .pop_front()
                .unwrap_or(Err(HttpError::Transport("unscripted".into())))?;
            body.extend(payload);
            Ok(status)
        }
    }

    fn client(transport: ScriptedTransport) -> ForecastClient<ScriptedTransport> {
        ForecastClient::new(
            transport,
            Endpoint::new("192.168.1.80", 1234),
            Endpoint::new("wttr.in", 80),
        )
    }

    #[test]
    fn test_lookup_location_caches_body() {
        let mut client = client(ScriptedTransport::default().respond(200, b"Santa+Cruz"));

        assert_eq!(client.lookup_location(), "Santa+Cruz");
        assert_eq!(client.location(), "Santa+Cruz");

        let transport = client.into_transport();
        let request = &transport.requests[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "http://192.168.1.80:1234/location");
        assert!(!request.follow_redirects);
        assert_eq!(request.header("User-Agent"), Some("esp32c3"));
        assert_eq!(request.header("Accept"), Some("*/*"));
    }

    #[test]
    fn test_lookup_location_truncates_long_body() {
        let mut client = client(ScriptedTransport::default().respond(200, &[b'x'; 80]));
        assert_eq!(client.lookup_location().len(), 47);
    }

    #[test]
    fn test_failed_lookup_leaves_cache_empty() {
        let mut client = client(
            ScriptedTransport::default()
                .fail("connection refused")
                .respond(200, b"+9C")
                .respond(200, b""),
        );

        assert_eq!(client.lookup_location(), "");

        client.fetch_and_report(20.0, 50.0);
        let transport = client.into_transport();
        assert_eq!(transport.requests[1].url, "http://wttr.in:80/?0Tm&format=%t");
    }

    #[test]
    fn test_fetch_and_report_chains_requests() {
        let mut client = client(
            ScriptedTransport::default()
                .respond(200, b"Santa+Cruz")
                .respond(200, b"+12\xc2\xb0C")
                .respond(200, b"ok"),
        );
        client.lookup_location();

        let payload = client.fetch_and_report(18.648930, 40.0);
        assert_eq!(payload.outdoor, "+12°C");

        let transport = client.into_transport();
        assert_eq!(transport.requests.len(), 3);

        let forecast = &transport.requests[1];
        assert_eq!(forecast.url, "http://wttr.in:80/Santa+Cruz?0Tm&format=%t");
        assert!(forecast.follow_redirects);
        assert_eq!(forecast.header("User-Agent"), Some("curl/8.7.1"));
        assert_eq!(forecast.header("Accept-Language"), Some("en-US,en"));

        let post = &transport.requests[2];
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.url, "http://192.168.1.80:1234/weather");
        assert_eq!(
            post.header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        let body = "localtemp=18.65&localhumi=40.00&outtemp=%2B12°C";
        assert_eq!(post.body.as_deref(), Some(body.as_bytes()));
        assert_eq!(post.header("Content-Length"), Some(body.len().to_string().as_str()));
    }

    #[test]
    fn test_non_200_forecast_uses_placeholder() {
        let mut client = client(
            ScriptedTransport::default()
                .respond(404, b"Not Found")
                .respond(200, b""),
        );

        let payload = client.fetch_and_report(18.648930, 3.14159);
        assert_eq!(payload.outdoor, "?");

        let transport = client.into_transport();
        assert_eq!(
            transport.requests[1].body.as_deref(),
            Some(&b"localtemp=18.65&localhumi=3.14&outtemp=?"[..])
        );
    }

    #[test]
    fn test_redirect_status_is_not_success() {
        let mut client = client(ScriptedTransport::default().respond(302, b"moved"));
        assert_eq!(client.fetch_outdoor(), "?");
    }

    #[test]
    fn test_transport_failures_do_not_escalate() {
        let mut client = client(
            ScriptedTransport::default()
                .fail("dns")
                .fail("reset"),
        );

        let payload = client.fetch_and_report(1.0, 2.0);
        assert_eq!(payload.outdoor, "?");
        assert_eq!(client.into_transport().requests.len(), 2);
    }

    #[test]
    fn test_reporter_forwards_reading() {
        let mut client = client(
            ScriptedTransport::default()
                .respond(200, b"-3C")
                .respond(200, b""),
        );

        client.report(&Reading {
            temperature: -0.004,
            humidity: 99.999,
        });

        let transport = client.into_transport();
        assert_eq!(
            transport.requests[1].body.as_deref(),
            Some(&b"localtemp=-0.00&localhumi=100.00&outtemp=-3C"[..])
        );
    }
}
