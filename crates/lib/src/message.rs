//! Inbound message from the authenticated caller.
//!
//! One per request; created from the request body plus the identity the auth
//! collaborator delivers, and discarded once the reply is sent.

/// A user message together with the caller identity it arrived under.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub text: String,
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
}
