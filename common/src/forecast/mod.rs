// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

mod buffer;
mod client;
mod report;

pub use buffer::{text_of, BoundedText, CaptureBuffer, CAPTURE_CAPACITY, CAPTURE_LIMIT};
pub use client::{ForecastClient, LocationCache};
pub use report::{forecast_path, FormBody, ReportPayload, RequestPath, FORM_CAPACITY, PLACEHOLDER};

use crate::config::Endpoint;
use crate::error::HttpError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One plain-HTTP exchange.
#[derive(Clone, Debug)]
pub struct Request<'a> {
    pub method: Method,
    pub endpoint: &'a Endpoint,
    pub path: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub follow_redirects: bool,
    pub body: Option<&'a [u8]>,
}

impl Request<'_> {
    pub fn url(&self) -> String {
        self.endpoint.url(self.path)
    }
}

/// The HTTP client the forecast pipeline talks through.
pub trait HttpTransport {
    /// Performs `request` and copies the response body into `body`.
    ///
    /// Returns the HTTP status code. Any status counts as success at this
    /// level, callers decide which codes they accept.
    fn execute(&mut self, request: &Request<'_>, body: &mut CaptureBuffer) -> Result<u16, HttpError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &mut T {
    fn execute(&mut self, request: &Request<'_>, body: &mut CaptureBuffer) -> Result<u16, HttpError> {
        (**self).execute(request, body)
    }
}
