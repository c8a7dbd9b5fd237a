//! Cookie source resolution for the cookie predicates.
//!
//! A request or agent carrying a structured jar is queried directly.
//! Otherwise cookies come from raw header strings: every `set-cookie`
//! value, or failing that the `cookie` request header split on `;`.

use crate::subject::{HttpSubject, Role};
use cookie::{Cookie, CookieJar};
use tracing::{debug, trace};

/// Finds a cookie on `subject` by exact, case-sensitive name.
pub(crate) fn find<S: HttpSubject>(subject: &S, name: &str) -> Option<Cookie<'static>> {
    if matches!(subject.role(), Role::Request | Role::Agent) {
        if let Some(jar) = subject.cookie_jar() {
            trace!(cookie = name, source = "jar", "resolving cookie");
            return jar.get(name).cloned();
        }
    }
    transient_jar(subject).get(name).cloned()
}

/// Builds a throwaway jar from whatever raw cookie strings the subject's
/// headers carry.
fn transient_jar<S: HttpSubject>(subject: &S) -> CookieJar {
    let mut jar = CookieJar::new();
    for raw in raw_cookie_strings(subject) {
        match Cookie::parse(raw) {
            Ok(cookie) => jar.add(cookie),
            Err(error) => debug!(%error, "skipping unparseable cookie string"),
        }
    }
    jar
}

fn raw_cookie_strings<S: HttpSubject>(subject: &S) -> Vec<String> {
    let Some(headers) = subject.header_source() else {
        return Vec::new();
    };
    let set_cookie = headers.get_all("set-cookie");
    if !set_cookie.is_empty() {
        trace!(source = "set-cookie", count = set_cookie.len(), "resolving cookies");
        return set_cookie;
    }
    headers
        .get("cookie")
        .map(|header| {
            header
                .split(';')
                .map(|piece| piece.trim().to_owned())
                .filter(|piece| !piece.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::{Agent, Request, Response};

    #[test]
    fn set_cookie_headers_are_preferred() {
        let response = Response::new()
            .with_header("set-cookie", "name=value")
            .with_header("cookie", "name=other");
        assert_eq!(find(&response, "name").unwrap().value(), "value");
    }

    #[test]
    fn cookie_header_splits_on_semicolons() {
        let request = Request::new().with_header("cookie", "abc=def; foo=baz");
        assert_eq!(find(&request, "abc").unwrap().value(), "def");
        assert_eq!(find(&request, "foo").unwrap().value(), "baz");
        assert!(find(&request, "foobar").is_none());
    }

    #[test]
    fn cookie_names_are_case_sensitive() {
        let request = Request::new().with_header("cookie", "Name=value");
        assert!(find(&request, "name").is_none());
        assert!(find(&request, "Name").is_some());
    }

    #[test]
    fn attributes_are_parsed_not_treated_as_cookies() {
        let response = Response::new().with_header(
            "set-cookie",
            "name2=value2; Expires=Wed, 09 Jun 2024 10:18:14 GMT",
        );
        let cookie = find(&response, "name2").unwrap();
        assert_eq!(cookie.value(), "value2");
        assert!(find(&response, "Expires").is_none());
    }

    #[test]
    fn attached_jar_bypasses_headers() {
        let agent = Agent::from_cookies(["name=jarred"]).unwrap();
        assert_eq!(find(&agent, "name").unwrap().value(), "jarred");

        let request = Request::new()
            .with_header("cookie", "name=from-header")
            .with_jar(agent.jar().clone());
        assert_eq!(find(&request, "name").unwrap().value(), "jarred");
    }

    #[test]
    fn no_headers_means_no_cookies() {
        assert!(find(&Request::new(), "name").is_none());
    }
}
