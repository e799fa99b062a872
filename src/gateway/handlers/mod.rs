//! HTTP handlers
//!
//! Thin translation between HTTP and the services: parse, call, wrap.

pub mod balance;
pub mod health;
pub mod payment;
pub mod webhook;
pub mod withdrawal;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::PaymentError;
use crate::payment::RequestContext;

/// Client IP and user agent of the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// First `X-Forwarded-For` hop, else the socket peer
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            ip: forwarded.or_else(|| peer.map(|p| p.ip().to_string())),
            user_agent,
        }
    }
}

impl From<ClientContext> for RequestContext {
    fn from(ctx: ClientContext) -> Self {
        RequestContext {
            ip: ctx.ip,
            user_agent: ctx.user_agent,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer))
    }
}

/// Parse a path id, reporting malformed ids as validation errors
pub(crate) fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T, PaymentError> {
    raw.parse()
        .map_err(|_| PaymentError::Validation(format!("invalid {} id: {}", kind, raw)))
}
