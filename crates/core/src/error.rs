//! Closed error taxonomy and policy table. Single source of truth consulted
//! by the static fetcher, the orchestrator, and the scheduler — no other
//! module re-derives severity/retryability/user messages.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("TLS certificate expired")]
    SslCertExpired,
    #[error("TLS certificate invalid")]
    SslCertInvalid,
    #[error("TLS certificate self-signed")]
    SslSelfSigned,
    #[error("TLS error")]
    SslOther,
    #[error("request timed out")]
    Timeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("DNS resolution failed")]
    DnsError,
    #[error("rate limited")]
    RateLimited,
    #[error("client error")]
    Http4xx,
    #[error("server error")]
    Http5xx,
    #[error("invalid URL")]
    InvalidUrl,
    #[error("unknown error")]
    Unknown,
}

impl ErrorKind {
    /// `true` for the kinds whose TLS fallback to the Legacy profile should
    /// be attempted before giving up, per spec.md §4.2/§4.3. Every
    /// SSL-family kind except an expired certificate, since an expired cert
    /// will still be expired under a non-verifying client and retrying
    /// teaches nothing.
    pub fn is_ssl_family(self) -> bool {
        matches!(
            self,
            ErrorKind::SslCertInvalid | ErrorKind::SslSelfSigned | ErrorKind::SslOther
        )
    }

    pub fn severity(self) -> Severity {
        use ErrorKind::*;
        match self {
            SslCertExpired | SslCertInvalid => Severity::Critical,
            SslSelfSigned | SslOther => Severity::High,
            ConnectionRefused | DnsError => Severity::High,
            Timeout | Http5xx => Severity::Medium,
            RateLimited | Http4xx => Severity::Low,
            InvalidUrl => Severity::Medium,
            Unknown => Severity::Medium,
        }
    }

    /// Whether a failed fetch with this kind is worth retrying (within the
    /// static fetcher's retry budget, not the SSL-fallback path).
    pub fn retryable(self) -> bool {
        use ErrorKind::*;
        !matches!(
            self,
            DnsError | InvalidUrl | ConnectionRefused | SslCertExpired | Http4xx
        )
    }

    pub fn user_message(self) -> &'static str {
        use ErrorKind::*;
        match self {
            SslCertExpired => "the site's security certificate has expired",
            SslCertInvalid => "the site's security certificate is invalid",
            SslSelfSigned => "the site uses a self-signed certificate",
            SslOther => "a TLS connection error occurred",
            Timeout => "the request timed out",
            ConnectionRefused => "the connection was refused",
            DnsError => "the domain name could not be resolved",
            RateLimited => "the site is rate-limiting requests",
            Http4xx => "the site returned a client error",
            Http5xx => "the site returned a server error",
            InvalidUrl => "the URL is not valid",
            Unknown => "an unknown error occurred",
        }
    }
}

/// Classify a raw failure message plus optional HTTP status into exactly
/// one `ErrorKind`. Ordered: first match wins, per spec.md §4.2.
pub fn classify_message(message: &str, status: Option<u16>) -> ErrorKind {
    let kind = classify_message_inner(message, status);
    tracing::debug!(kind = ?kind, status, "classified error");
    kind
}

fn classify_message_inner(message: &str, status: Option<u16>) -> ErrorKind {
    let lower = message.to_lowercase();

    if let Some(status) = status {
        if status == 429 {
            return ErrorKind::RateLimited;
        }
        if status == 408 {
            return ErrorKind::Timeout;
        }
        if (400..500).contains(&status) {
            return ErrorKind::Http4xx;
        }
        if (500..600).contains(&status) {
            return ErrorKind::Http5xx;
        }
    }

    if lower.contains("expired") && (lower.contains("cert") || lower.contains("ssl") || lower.contains("tls")) {
        return ErrorKind::SslCertExpired;
    }
    if lower.contains("self signed") || lower.contains("self-signed") {
        return ErrorKind::SslSelfSigned;
    }
    if (lower.contains("cert") || lower.contains("ssl") || lower.contains("tls"))
        && (lower.contains("invalid")
            || lower.contains("verify")
            || lower.contains("verification")
            || lower.contains("unknown issuer")
            || lower.contains("untrusted"))
    {
        return ErrorKind::SslCertInvalid;
    }
    if lower.contains("ssl") || lower.contains("tls") || lower.contains("handshake") {
        return ErrorKind::SslOther;
    }
    if lower.contains("timeout") || lower.contains("timed out") {
        return ErrorKind::Timeout;
    }
    if lower.contains("connection refused") || lower.contains("refused") {
        return ErrorKind::ConnectionRefused;
    }
    if lower.contains("dns") || lower.contains("resolve") || lower.contains("no such host") || lower.contains("name not found") {
        return ErrorKind::DnsError;
    }
    if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
        return ErrorKind::RateLimited;
    }
    if lower.contains("invalid url") || lower.contains("invalid uri") || lower.contains("url parse") {
        return ErrorKind::InvalidUrl;
    }

    ErrorKind::Unknown
}
