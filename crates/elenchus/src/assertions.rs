//! HTTP-aware predicates over request, response, and agent subjects.
//!
//! Each predicate reads an attribute off the subject (a status field, a
//! header lookup, a cookie jar, the URL's query string) and asserts
//! equality, containment, or matching against an expected value, producing
//! failure prose in both the affirmative and negated form.

use crate::cookies;
use crate::expect::{Expect, ValueMatch};
use crate::query;
use crate::subject::{HeaderSource, HttpSubject, Role};
use std::fmt;
use std::net::IpAddr;
use tracing::trace;

/// Status codes that mark a response as a redirect.
const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// HTTP predicates. Implemented for every [`Expect`] whose subject exposes
/// the [`HttpSubject`] capability surface.
pub trait HttpAssertions {
    /// Asserts the subject has the supplied status code.
    ///
    /// The subject must carry a status under either field name; if it
    /// carries neither, the assertion fails regardless of negation.
    ///
    /// # Example
    ///
    /// ```
    /// use elenchus::{expect, HttpAssertions, Response};
    ///
    /// let response = Response::new().with_status(200);
    /// expect(&response).to_have_status(200);
    /// ```
    fn to_have_status(&self, code: u16) -> &Self;

    /// Asserts a header is present, by case-insensitive name.
    fn to_have_header(&self, name: &str) -> &Self;

    /// Asserts a header is present with the given value: exact when given
    /// a string, pattern-matched when given a [`regex::Regex`].
    ///
    /// # Example
    ///
    /// ```
    /// use elenchus::{expect, HttpAssertions, Request};
    /// use regex::Regex;
    ///
    /// let request = Request::new().with_header("content-type", "text/plain");
    /// expect(&request).to_have_header_value("content-type", "text/plain");
    /// expect(&request).to_have_header_value("content-type", Regex::new("^text").unwrap());
    /// ```
    fn to_have_header_value<V: Into<ValueMatch>>(&self, name: &str, value: V) -> &Self;

    /// Asserts the subject has headers at all, either a map or an accessor.
    fn to_have_headers(&self) -> &Self;

    /// Asserts the content type includes `application/json`.
    fn to_be_json(&self) -> &Self;

    /// Asserts the content type includes `text/plain`.
    fn to_be_text(&self) -> &Self;

    /// Asserts the content type includes `text/html`.
    fn to_be_html(&self) -> &Self;

    /// Asserts the charset declared by the subject's content type.
    ///
    /// Comparison is case-insensitive, with `utf8` and `utf-8` treated as
    /// the same encoding on both sides. A subject declaring no charset
    /// never matches.
    fn to_have_charset(&self, charset: &str) -> &Self;

    /// Asserts the subject is a redirect: a 301/302/303/307/308 status, or
    /// a non-empty list of recorded redirect locations (for clients that
    /// auto-follow redirects and record the chain).
    fn to_redirect(&self) -> &Self;

    /// Asserts the subject redirects to the supplied destination, exact or
    /// pattern-matched against the recorded redirect chain when one exists,
    /// otherwise against the `location` header.
    fn to_redirect_to<V: Into<ValueMatch>>(&self, destination: V) -> &Self;

    /// Asserts the request's query string has a parameter with the given
    /// key.
    fn to_have_param(&self, key: &str) -> &Self;

    /// Asserts the request's query string has a parameter with the given
    /// key and value.
    fn to_have_param_value(&self, key: &str, value: &str) -> &Self;

    /// Like [`HttpAssertions::to_have_param`], but the key is a dotted path
    /// into bracket-encoded parameters: `form[name]=jim` is addressable as
    /// `form.name`.
    fn to_have_nested_param(&self, path: &str) -> &Self;

    /// Like [`HttpAssertions::to_have_param_value`] with dotted-path
    /// addressing.
    fn to_have_nested_param_value(&self, path: &str, value: &str) -> &Self;

    /// Asserts a cookie with the given name is present on the subject.
    ///
    /// Cookies come from the subject's attached jar when it has one,
    /// otherwise from its `set-cookie` or `cookie` headers.
    fn to_have_cookie(&self, name: &str) -> &Self;

    /// Asserts a cookie with the given name and exact value is present on
    /// the subject.
    fn to_have_cookie_value(&self, name: &str, value: &str) -> &Self;
}

impl<S: HttpSubject + fmt::Debug> HttpAssertions for Expect<S> {
    #[track_caller]
    fn to_have_status(&self, code: u16) -> &Self {
        guard(self, &[Role::Response]);
        let Some(status) = resolved_status(self.subject()) else {
            self.fail(format!(
                "expected {:?} to have keys 'status' or 'statusCode'",
                self.subject()
            ));
        };
        self.verify(
            status == code,
            format!(
                "expected {:?} to have status code {code} but got {status}",
                self.subject()
            ),
            format!(
                "expected {:?} to not have status code {status}",
                self.subject()
            ),
        )
    }

    #[track_caller]
    fn to_have_header(&self, name: &str) -> &Self {
        guard(self, &[Role::Request, Role::Response]);
        self.verify(
            header_of(self.subject(), name).is_some(),
            format!("expected header '{name}' to exist"),
            format!("expected header '{name}' to not exist"),
        )
    }

    #[track_caller]
    fn to_have_header_value<V: Into<ValueMatch>>(&self, name: &str, value: V) -> &Self {
        guard(self, &[Role::Request, Role::Response]);
        let value = value.into();
        let header = header_of(self.subject(), name);
        let actual = match &header {
            Some(found) => format!("'{found}'"),
            None => "nothing".to_owned(),
        };
        let passed = header.as_deref().is_some_and(|found| value.matches(found));
        if value.is_pattern() {
            self.verify(
                passed,
                format!("expected header '{name}' to match {value} but got {actual}"),
                format!("expected header '{name}' not to match {value} but got {actual}"),
            )
        } else {
            self.verify(
                passed,
                format!("expected header '{name}' to have value {value} but got {actual}"),
                format!("expected header '{name}' to not have value {value}"),
            )
        }
    }

    #[track_caller]
    fn to_have_headers(&self) -> &Self {
        guard(self, &[Role::Request, Role::Response]);
        self.verify(
            self.subject().header_source().is_some(),
            format!(
                "expected {:?} to have headers or a header accessor",
                self.subject()
            ),
            format!(
                "expected {:?} to not have headers or a header accessor",
                self.subject()
            ),
        )
    }

    #[track_caller]
    fn to_be_json(&self) -> &Self {
        content_type_check(self, "application/json");
        self
    }

    #[track_caller]
    fn to_be_text(&self) -> &Self {
        content_type_check(self, "text/plain");
        self
    }

    #[track_caller]
    fn to_be_html(&self) -> &Self {
        content_type_check(self, "text/html");
        self
    }

    #[track_caller]
    fn to_have_charset(&self, charset: &str) -> &Self {
        guard(self, &[Role::Request, Role::Response]);
        let wanted = charset.to_ascii_lowercase();
        let detected = self.subject().header_source().and_then(sniff_charset);
        let passed = detected.as_deref() == Some(normalize_charset(&wanted).as_str());
        self.verify(
            passed,
            format!("expected content type to have {wanted} charset"),
            format!("expected content type to not have {wanted} charset"),
        )
    }

    #[track_caller]
    fn to_redirect(&self) -> &Self {
        guard(self, &[Role::Response]);
        let status = resolved_status(self.subject());
        let followed = self
            .subject()
            .redirects()
            .is_some_and(|chain| !chain.is_empty());
        let passed = status.is_some_and(|code| REDIRECT_CODES.contains(&code)) || followed;
        let shown = status.map_or_else(|| "no status".to_owned(), |code| code.to_string());
        self.verify(
            passed,
            format!("expected redirect with 30X status code but got {shown}"),
            format!("expected not to redirect but got {shown} status"),
        )
    }

    #[track_caller]
    fn to_redirect_to<V: Into<ValueMatch>>(&self, destination: V) -> &Self {
        guard(self, &[Role::Response]);
        let destination = destination.into();
        self.affirmed().to_redirect();
        match self.subject().redirects() {
            Some(chain) if !chain.is_empty() => {
                let passed = chain.iter().any(|location| destination.matches(location));
                let visited = chain.join(" then ");
                self.verify(
                    passed,
                    format!("expected redirect to {destination} but got {visited}"),
                    format!("expected not to redirect to {destination} but got {visited}"),
                )
            }
            _ => self.to_have_header_value("location", destination),
        }
    }

    #[track_caller]
    fn to_have_param(&self, key: &str) -> &Self {
        guard(self, &[Role::Request]);
        params_of(self).to_have_property(key);
        self
    }

    #[track_caller]
    fn to_have_param_value(&self, key: &str, value: &str) -> &Self {
        guard(self, &[Role::Request]);
        params_of(self).to_have_property_value(key, value);
        self
    }

    #[track_caller]
    fn to_have_nested_param(&self, path: &str) -> &Self {
        guard(self, &[Role::Request]);
        params_of(self).to_have_nested_property(path);
        self
    }

    #[track_caller]
    fn to_have_nested_param_value(&self, path: &str, value: &str) -> &Self {
        guard(self, &[Role::Request]);
        params_of(self).to_have_nested_property_value(path, value);
        self
    }

    #[track_caller]
    fn to_have_cookie(&self, name: &str) -> &Self {
        guard(self, &[Role::Request, Role::Response, Role::Agent]);
        self.verify(
            cookies::find(self.subject(), name).is_some(),
            format!("expected cookie '{name}' to exist"),
            format!("expected cookie '{name}' to not exist"),
        )
    }

    #[track_caller]
    fn to_have_cookie_value(&self, name: &str, value: &str) -> &Self {
        guard(self, &[Role::Request, Role::Response, Role::Agent]);
        let found = cookies::find(self.subject(), name);
        let passed = found.as_ref().is_some_and(|cookie| cookie.value() == value);
        let actual = found
            .as_ref()
            .map_or("no cookie".to_owned(), |cookie| format!("'{}'", cookie.value()));
        self.verify(
            passed,
            format!("expected cookie '{name}' to have value '{value}' but got {actual}"),
            format!("expected cookie '{name}' to not have value '{value}'"),
        )
    }
}

/// Syntax checks for string subjects.
pub trait IpAssertions {
    /// Asserts the subject is a valid IPv4 or IPv6 address literal.
    ///
    /// # Example
    ///
    /// ```
    /// use elenchus::{expect, IpAssertions};
    ///
    /// expect("127.0.0.1").to_be_an_ip();
    /// expect("2001:0db8:85a3:0000:0000:8a2e:0370:7334").to_be_an_ip();
    /// expect("example.com").not().to_be_an_ip();
    /// ```
    fn to_be_an_ip(&self) -> &Self;
}

impl<S: AsRef<str> + fmt::Debug> IpAssertions for Expect<S> {
    #[track_caller]
    fn to_be_an_ip(&self) -> &Self {
        self.verify(
            self.subject().as_ref().parse::<IpAddr>().is_ok(),
            format!("expected {:?} to be an ip", self.subject()),
            format!("expected {:?} to not be an ip", self.subject()),
        )
    }
}

/// Strict-mode role guard: rejects subjects outside the allowed roles
/// before any attribute is inspected. A no-op under the lenient policy.
#[track_caller]
fn guard<S: HttpSubject + fmt::Debug>(chain: &Expect<S>, allowed: &[Role]) {
    if !chain.config().strict {
        return;
    }
    let role = chain.subject().role();
    if allowed.contains(&role) {
        return;
    }
    let wanted = allowed
        .iter()
        .map(Role::to_string)
        .collect::<Vec<_>>()
        .join(" or ");
    chain.fail(format!("expected {:?} to be a {wanted}", chain.subject()));
}

fn resolved_status<S: HttpSubject>(subject: &S) -> Option<u16> {
    subject.status().or_else(|| subject.status_code())
}

fn header_of<S: HttpSubject>(subject: &S, name: &str) -> Option<String> {
    subject.header_source().and_then(|headers| headers.get(name))
}

/// Shared body of the json/text/html predicates: headers must exist, and
/// the content type must include the expected token. An absent content-type
/// header is reported as "headers" rather than a phantom value.
#[track_caller]
fn content_type_check<S: HttpSubject + fmt::Debug>(chain: &Expect<S>, token: &str) {
    guard(chain, &[Role::Request, Role::Response]);
    chain.affirmed().to_have_headers();
    let content_type = header_of(chain.subject(), "content-type");
    let shown = match &content_type {
        Some(found) => format!("'{found}'"),
        None => "headers".to_owned(),
    };
    chain.verify(
        content_type
            .as_deref()
            .is_some_and(|found| found.contains(token)),
        format!("expected {shown} to include '{token}'"),
        format!("expected {shown} to not include '{token}'"),
    );
}

/// Parses the subject's query string into a parameter tree and re-wraps it
/// for property assertions, carrying negation through.
#[track_caller]
fn params_of<S: HttpSubject + fmt::Debug>(chain: &Expect<S>) -> Expect<serde_json::Value> {
    let Some(url) = chain.subject().target_url() else {
        chain.fail(format!("expected {:?} to have a url", chain.subject()));
    };
    match query::target_query(url) {
        Ok(raw) => chain.transfer(query::parse(&raw)),
        Err(error) => chain.fail(format!(
            "expected {:?} to have a parseable url: {error}",
            chain.subject()
        )),
    }
}

/// Reads the charset parameter out of the subject's content type,
/// normalized for comparison.
fn sniff_charset(headers: &HeaderSource) -> Option<String> {
    let content_type = headers.get("content-type")?;
    let mime: mime::Mime = content_type.parse().ok()?;
    let charset = normalize_charset(mime.get_param(mime::CHARSET)?.as_str());
    trace!(charset = %charset, "sniffed charset from content type");
    Some(charset)
}

/// Lowercases and folds the `utf8` alias into `utf-8`, so the two spellings
/// compare equal no matter which side uses which.
fn normalize_charset(value: &str) -> String {
    let value = value.to_ascii_lowercase();
    if value == "utf8" {
        "utf-8".to_owned()
    } else {
        value
    }
}
