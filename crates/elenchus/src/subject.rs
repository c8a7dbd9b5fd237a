//! Subject wrappers: the request, response, and agent shapes predicates
//! operate on.
//!
//! Subjects are built either directly through the `with_` builder methods or
//! from `http` crate values via the `from_http` adapters. Each kind exposes
//! only the capabilities it has; predicates discover them through
//! [`HttpSubject`].

use crate::error::SubjectError;
use cookie::{Cookie, CookieJar};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::fmt;

/// The role a subject plays in an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// An outgoing request.
    Request,
    /// An incoming response.
    Response,
    /// A persistent client retaining cookies across exchanges.
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
            Self::Agent => f.write_str("agent"),
        }
    }
}

type HeaderFn = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where a subject's headers come from: a direct header map or an accessor
/// function supplied by the client library.
pub enum HeaderSource {
    /// A materialized header map.
    Map(HeaderMap),
    /// A lookup function. It is always called with a lowercased name.
    Accessor(HeaderFn),
}

impl HeaderSource {
    /// Looks up a header by name, case-insensitively. Returns the first
    /// value when the header is multi-valued.
    pub fn get(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        match self {
            Self::Map(map) => map
                .get(name.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
            Self::Accessor(lookup) => lookup(&name),
        }
    }

    /// Looks up every value of a header by name, case-insensitively.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        let name = name.to_ascii_lowercase();
        match self {
            Self::Map(map) => map
                .get_all(name.as_str())
                .iter()
                .filter_map(|value| value.to_str().ok())
                .map(str::to_owned)
                .collect(),
            Self::Accessor(lookup) => lookup(&name).into_iter().collect(),
        }
    }
}

impl fmt::Debug for HeaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(map) => map.fmt(f),
            Self::Accessor(_) => f.write_str("<header accessor>"),
        }
    }
}

/// Capability surface read by the predicates. Each subject kind overrides
/// the accessors for the attributes it actually carries.
pub trait HttpSubject {
    /// The subject's role.
    fn role(&self) -> Role;

    /// The `status` field, for clients that report the code under that name.
    fn status(&self) -> Option<u16> {
        None
    }

    /// The `statusCode`-convention field, for clients that use the longer
    /// name. `status` wins when both are present.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// The subject's headers, when it has any.
    fn header_source(&self) -> Option<&HeaderSource> {
        None
    }

    /// The raw target URL, for requests.
    fn target_url(&self) -> Option<&str> {
        None
    }

    /// Locations visited while a client auto-followed redirects.
    fn redirects(&self) -> Option<&[String]> {
        None
    }

    /// An attached structured cookie store.
    fn cookie_jar(&self) -> Option<&CookieJar> {
        None
    }
}

impl<S: HttpSubject + ?Sized> HttpSubject for &S {
    fn role(&self) -> Role {
        (**self).role()
    }

    fn status(&self) -> Option<u16> {
        (**self).status()
    }

    fn status_code(&self) -> Option<u16> {
        (**self).status_code()
    }

    fn header_source(&self) -> Option<&HeaderSource> {
        (**self).header_source()
    }

    fn target_url(&self) -> Option<&str> {
        (**self).target_url()
    }

    fn redirects(&self) -> Option<&[String]> {
        (**self).redirects()
    }

    fn cookie_jar(&self) -> Option<&CookieJar> {
        (**self).cookie_jar()
    }
}

/// Appends a header into `slot`, materializing a map if the source was
/// absent or accessor-backed.
fn append_header(
    slot: &mut Option<HeaderSource>,
    name: &str,
    value: &str,
) -> Result<(), SubjectError> {
    let name = HeaderName::try_from(name)?;
    let value = HeaderValue::try_from(value)?;
    match slot {
        Some(HeaderSource::Map(map)) => {
            map.append(name, value);
        }
        _ => {
            let mut map = HeaderMap::new();
            map.append(name, value);
            *slot = Some(HeaderSource::Map(map));
        }
    }
    Ok(())
}

/// An outgoing-request subject.
#[derive(Default)]
pub struct Request {
    method: Option<Method>,
    url: Option<String>,
    headers: Option<HeaderSource>,
    jar: Option<CookieJar>,
}

impl Request {
    /// Creates an empty request subject.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request subject from an `http` crate request.
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        Self {
            method: Some(request.method().clone()),
            url: Some(request.uri().to_string()),
            headers: Some(HeaderSource::Map(request.headers().clone())),
            jar: None,
        }
    }

    /// Sets the request method. Only used in failure prose.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the raw target URL. Relative targets are accepted.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Appends a header, replacing any accessor previously installed.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError`] if the name or value is not valid HTTP.
    pub fn try_with_header(mut self, name: &str, value: &str) -> Result<Self, SubjectError> {
        append_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// Appends a header, replacing any accessor previously installed.
    ///
    /// # Panics
    ///
    /// Panics if the name or value is not valid HTTP; use
    /// [`Request::try_with_header`] to handle that case.
    #[must_use]
    pub fn with_header(self, name: &str, value: &str) -> Self {
        self.try_with_header(name, value)
            .expect("valid header name and value")
    }

    /// Installs an accessor-style header lookup in place of a map.
    #[must_use]
    pub fn with_header_accessor(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.headers = Some(HeaderSource::Accessor(Box::new(lookup)));
        self
    }

    /// Attaches a structured cookie store. Cookie assertions query it
    /// directly instead of parsing headers.
    #[must_use]
    pub fn with_jar(mut self, jar: CookieJar) -> Self {
        self.jar = Some(jar);
        self
    }
}

impl HttpSubject for Request {
    fn role(&self) -> Role {
        Role::Request
    }

    fn header_source(&self) -> Option<&HeaderSource> {
        self.headers.as_ref()
    }

    fn target_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn cookie_jar(&self) -> Option<&CookieJar> {
        self.jar.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Request");
        if let Some(method) = &self.method {
            out.field("method", &format_args!("{method}"));
        }
        if let Some(url) = &self.url {
            out.field("url", url);
        }
        if let Some(headers) = &self.headers {
            out.field("headers", headers);
        }
        if self.jar.is_some() {
            out.field("jar", &format_args!("<cookie jar>"));
        }
        out.finish()
    }
}

/// An incoming-response subject.
#[derive(Default)]
pub struct Response {
    status: Option<u16>,
    status_code: Option<u16>,
    headers: Option<HeaderSource>,
    redirects: Vec<String>,
}

impl Response {
    /// Creates an empty response subject.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a response subject from an `http` crate response.
    pub fn from_http<B>(response: &http::Response<B>) -> Self {
        Self {
            status: Some(response.status().as_u16()),
            status_code: None,
            headers: Some(HeaderSource::Map(response.headers().clone())),
            redirects: Vec::new(),
        }
    }

    /// Sets the status under the `status` field name.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the status under the `statusCode` field name.
    #[must_use]
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Appends a header, replacing any accessor previously installed.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError`] if the name or value is not valid HTTP.
    pub fn try_with_header(mut self, name: &str, value: &str) -> Result<Self, SubjectError> {
        append_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    /// Appends a header, replacing any accessor previously installed.
    ///
    /// # Panics
    ///
    /// Panics if the name or value is not valid HTTP; use
    /// [`Response::try_with_header`] to handle that case.
    #[must_use]
    pub fn with_header(self, name: &str, value: &str) -> Self {
        self.try_with_header(name, value)
            .expect("valid header name and value")
    }

    /// Installs an accessor-style header lookup in place of a map.
    #[must_use]
    pub fn with_header_accessor(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.headers = Some(HeaderSource::Accessor(Box::new(lookup)));
        self
    }

    /// Records the locations a client visited while auto-following
    /// redirects.
    #[must_use]
    pub fn with_redirects<I>(mut self, redirects: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.redirects = redirects.into_iter().map(Into::into).collect();
        self
    }
}

impl HttpSubject for Response {
    fn role(&self) -> Role {
        Role::Response
    }

    fn status(&self) -> Option<u16> {
        self.status
    }

    fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    fn header_source(&self) -> Option<&HeaderSource> {
        self.headers.as_ref()
    }

    fn redirects(&self) -> Option<&[String]> {
        Some(&self.redirects)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Response");
        if let Some(status) = self.status {
            out.field("status", &status);
        }
        if let Some(status_code) = self.status_code {
            out.field("statusCode", &status_code);
        }
        if let Some(headers) = &self.headers {
            out.field("headers", headers);
        }
        if !self.redirects.is_empty() {
            out.field("redirects", &self.redirects);
        }
        out.finish()
    }
}

/// A persistent-client subject: a cookie jar retained across exchanges.
#[derive(Default)]
pub struct Agent {
    jar: CookieJar,
}

impl Agent {
    /// Creates an agent with an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an agent pre-populated from raw cookie strings.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError`] if any string is not a valid cookie.
    pub fn from_cookies<I>(cookies: I) -> Result<Self, SubjectError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut jar = CookieJar::new();
        for raw in cookies {
            jar.add(Cookie::parse(raw.as_ref().to_owned())?);
        }
        Ok(Self { jar })
    }

    /// Absorbs the `set-cookie` headers of `response` into the jar, the way
    /// a cookie-retaining client does after each exchange.
    ///
    /// # Errors
    ///
    /// Returns [`SubjectError`] if a `set-cookie` value is not a valid
    /// cookie.
    pub fn remember(&mut self, response: &Response) -> Result<(), SubjectError> {
        if let Some(headers) = &response.headers {
            for raw in headers.get_all("set-cookie") {
                self.jar.add(Cookie::parse(raw)?);
            }
        }
        Ok(())
    }

    /// The retained cookie jar.
    #[must_use]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Mutable access to the retained cookie jar.
    pub fn jar_mut(&mut self) -> &mut CookieJar {
        &mut self.jar
    }
}

impl HttpSubject for Agent {
    fn role(&self) -> Role {
        Role::Agent
    }

    fn cookie_jar(&self) -> Option<&CookieJar> {
        Some(&self.jar)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("cookies", &self.jar.iter().count())
            .finish()
    }
}
