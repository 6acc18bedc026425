//! JWT fixtures
//!
//! Tokens carry a fixed header, the given payload and a dummy signature.
//! They decode like real tokens but will not pass server verification.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};

/// Unsigned JWT with an arbitrary payload.
pub fn jwt_with_payload(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unsigned JWT whose `exp` is `seconds` from now (negative for the past).
///
/// Every call yields a distinct token.
pub fn jwt_expiring_in(seconds: i64) -> String {
    jwt_with_payload(&json!({
        "sub": "user-1",
        "jti": NEXT_ID.fetch_add(1, Ordering::Relaxed),
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + seconds,
    }))
}

pub fn expired_jwt() -> String {
    jwt_expiring_in(-60)
}
