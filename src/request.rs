//! Descriptions of the requests a load test makes.
//!
//! A [`GoslingRequest`] is a plain description of one HTTP request. The
//! [`Runner`](../runner/struct.Runner.html) asks a [`RequestFactory`] for a fresh
//! description each time it fills a slot, hands the description to the
//! [`Transport`](../transport/trait.Transport.html), and never looks at it again.

use http::Method;
use url::Url;

/// One HTTP request to make against the target.
#[derive(Debug, Clone, PartialEq)]
pub struct GoslingRequest {
    /// The HTTP method.
    pub method: Method,
    /// The fully qualified URL to request.
    pub url: Url,
    /// Additional headers, in the order they were configured.
    pub headers: Vec<(String, String)>,
    /// An optional request body.
    pub body: Option<String>,
}
impl GoslingRequest {
    /// Create a request with no headers and no body.
    ///
    /// # Example
    /// ```rust
    /// use gosling::request::GoslingRequest;
    /// use http::Method;
    ///
    /// let url = url::Url::parse("http://localhost/").unwrap();
    /// let request = GoslingRequest::new(Method::GET, url);
    /// assert_eq!(request.body_len(), 0);
    /// ```
    pub fn new(method: Method, url: Url) -> Self {
        GoslingRequest {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Size of the request body in bytes.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, |body| body.len())
    }
}

/// Produces a fresh [`GoslingRequest`] each time a request slot is filled.
pub trait RequestFactory {
    fn make_request(&mut self) -> GoslingRequest;
}

/// Any closure returning a [`GoslingRequest`] can be used as a [`RequestFactory`].
impl<F> RequestFactory for F
where
    F: FnMut() -> GoslingRequest,
{
    fn make_request(&mut self) -> GoslingRequest {
        self()
    }
}

/// A [`RequestFactory`] that returns a copy of the same request every time.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    request: GoslingRequest,
}
impl RequestTemplate {
    pub fn new(request: GoslingRequest) -> Self {
        RequestTemplate { request }
    }

    /// The request being copied.
    pub fn request(&self) -> &GoslingRequest {
        &self.request
    }
}
impl RequestFactory for RequestTemplate {
    fn make_request(&mut self) -> GoslingRequest {
        self.request.clone()
    }
}
