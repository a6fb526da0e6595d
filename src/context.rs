//! Ambient request/user context supplied by the host application.
//!
//! The formatter never reaches for a global accessor; whatever knows about
//! the current principal and request is passed in as a [`ContextProvider`].

/// Snapshot of the request being served when the event was logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    /// Query string, with or without the leading `?`.
    pub query: Option<String>,
    /// Header names with every value sent for them, in arrival order.
    pub headers: Vec<(String, Vec<String>)>,
}

impl RequestContext {
    /// Rebuild the request URL. Port 80 is never printed.
    pub fn url(&self) -> String {
        let mut url = format!("{}://{}", self.scheme, self.host);
        if let Some(port) = self.port.filter(|p| *p != 80) {
            url.push(':');
            url.push_str(&port.to_string());
        }
        if !self.path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&self.path);
        if let Some(query) = self.query.as_deref() {
            let query = query.trim_start_matches('?');
            if !query.is_empty() {
                url.push('?');
                url.push_str(query);
            }
        }
        url
    }
}

/// Lookup capability for ambient context.
pub trait ContextProvider: Send + Sync {
    /// Value of `claim_key` for the current principal, if any.
    fn principal_claim(&self, claim_key: &str) -> Option<String>;

    /// The request currently being served, if any.
    fn current_request(&self) -> Option<RequestContext>;
}

/// Provider for hosts without request or user context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextProvider for NoContext {
    fn principal_claim(&self, _claim_key: &str) -> Option<String> {
        None
    }

    fn current_request(&self) -> Option<RequestContext> {
        None
    }
}
