use core::time::Duration;

use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::Method as HttpMethod;
use embedded_svc::io::Write;
use embedded_svc::utils::io;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection, FollowRedirectsPolicy};
use log::debug;

use weather_node_common::forecast::{CaptureBuffer, HttpTransport, Method, Request, CAPTURE_CAPACITY};
use weather_node_common::HttpError;

/// Plain-TCP HTTP client. A fresh connection is made per request, like the
/// init/perform/cleanup cycle of the IDF client.
pub struct EspHttpTransport {
    timeout: Option<Duration>,
}

impl EspHttpTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn perform(&self, request: &Request<'_>, body: &mut CaptureBuffer) -> anyhow::Result<u16> {
        let configuration = Configuration {
            timeout: self.timeout,
            follow_redirects_policy: if request.follow_redirects {
                FollowRedirectsPolicy::FollowGetHead
            } else {
                FollowRedirectsPolicy::FollowNone
            },
            ..Default::default()
        };
        let mut client = HttpClient::wrap(EspHttpConnection::new(&configuration)?);

        let method = match request.method {
            Method::Get => HttpMethod::Get,
            Method::Post => HttpMethod::Post,
        };
        let url = request.url();

        let mut outgoing = client.request(method, &url, request.headers)?;
        debug!("-> {:?} {}", request.method, url);
        if let Some(payload) = request.body {
            outgoing.write_all(payload)?;
            outgoing.flush()?;
        }
        let mut response = outgoing.submit()?;

        let status = response.status();
        debug!("<- {}", status);

        // Drain the whole body so the capture can count what it drops.
        let mut buf = [0u8; CAPTURE_CAPACITY];
        loop {
            let bytes_read = io::try_read_full(&mut response, &mut buf).map_err(|e| e.0)?;
            if bytes_read == 0 {
                break;
            }
            body.extend(&buf[..bytes_read]);
        }
        if body.truncated() > 0 {
            debug!("response body truncated to {} bytes, {} dropped", body.len(), body.truncated());
        }

        Ok(status)
    }
}

impl HttpTransport for EspHttpTransport {
    fn execute(&mut self, request: &Request<'_>, body: &mut CaptureBuffer) -> Result<u16, HttpError> {
        self.perform(request, body)
            .map_err(|e| HttpError::Transport(e.to_string()))
    }
}
