//! Backend endpoint paths, relative to the configured base URL.

/// Authentication endpoints
pub mod auth {
    pub const REGISTER: &str = "/api/auth/register";
    pub const LOGIN: &str = "/api/auth/login";
    pub const REFRESH: &str = "/api/auth/refresh";
    pub const CHECK_TOKEN: &str = "/api/auth/check-token";
    pub const LOGOUT: &str = "/api/auth/logout";
}

/// User management endpoints
pub mod users {
    pub const BASE: &str = "/api/users";
    pub const ALL: &str = "/api/users/all";

    pub fn by_id(id: &str) -> String {
        format!("{BASE}/{id}")
    }

    pub fn avatar(id: &str) -> String {
        format!("{BASE}/{id}/avatar")
    }

    pub fn settings(id: &str) -> String {
        format!("{BASE}/{id}/settings")
    }

    pub fn login_history(id: &str) -> String {
        format!("{BASE}/{id}/login-history")
    }

    pub fn login_history_entry(id: &str, entry_id: &str) -> String {
        format!("{BASE}/{id}/login-history/{entry_id}")
    }

    pub fn status(id: &str) -> String {
        format!("{BASE}/status/{id}")
    }
}

/// Service metadata endpoints
pub mod service {
    pub const HEALTH: &str = "/api/health";
    pub const INFO: &str = "/api/info";
}
