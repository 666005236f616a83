/// Routing fields of a call as seen by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeader {
    pub sequence_id: u64,
    pub method_name: String,
}

/// Routing fields of a reply, plus the error text when the call failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub sequence_id: u64,
    pub method_name: String,
    pub error: Option<String>,
}

impl ResponseHeader {
    /// A successful reply to `request`.
    pub fn reply_to(request: &RequestHeader) -> Self {
        Self {
            sequence_id: request.sequence_id,
            method_name: request.method_name.clone(),
            error: None,
        }
    }

    /// A failed reply to `request` carrying `error`.
    pub fn error_to(request: &RequestHeader, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::reply_to(request)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
