//! # Elenchus
//!
//! HTTP-aware assertions for tests: fluent predicates over request,
//! response, and persistent-client subjects, covering status codes,
//! headers, cookies, content types, charsets, redirects, and query
//! parameters.
//!
//! ## Key Features
//!
//! - **Three subject kinds**: [`Request`], [`Response`], and [`Agent`] (a
//!   cookie-retaining client), built directly or adapted from `http` crate
//!   values
//! - **Negation**: every predicate has a `.not()` form with its own failure
//!   prose
//! - **Header duality**: headers may come from a materialized map or an
//!   accessor function; lookup is case-insensitive either way
//! - **Cookie resolution**: attached jars, `set-cookie` response headers,
//!   and `cookie` request headers are all understood
//! - **Nested query parameters**: `form[name]=jim` is addressable as
//!   `form.name`
//!
//! ## Example
//!
//! ```
//! use elenchus::{expect, HttpAssertions, Request, Response};
//!
//! let response = Response::new()
//!     .with_status(200)
//!     .with_header("content-type", "application/json; charset=utf-8")
//!     .with_header("set-cookie", "session=abc123");
//!
//! expect(&response)
//!     .to_have_status(200)
//!     .to_be_json()
//!     .to_have_charset("utf-8")
//!     .to_have_cookie_value("session", "abc123");
//! expect(&response).not().to_redirect();
//!
//! let request = Request::new().with_url("/search?form[name]=jim");
//! expect(&request).to_have_nested_param_value("form.name", "jim");
//! ```
//!
//! Predicates check the subject's role before inspecting it; build the
//! chain through [`Config::lenient`] to skip role checks and operate on
//! whatever capabilities the subject exposes.

#![doc(html_root_url = "https://docs.rs/elenchus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assertions;
mod cookies;
mod error;
mod expect;
mod query;
mod subject;

pub use assertions::{HttpAssertions, IpAssertions};
pub use error::SubjectError;
pub use expect::{expect, Config, Expect, ValueMatch};
pub use subject::{Agent, HeaderSource, HttpSubject, Request, Response, Role};

// Cookie vocabulary re-exported for building jars and inspecting results.
pub use cookie::{Cookie, CookieJar};
