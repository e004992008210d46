use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Token cookies are HttpOnly + Secure; the JSON body carries the same values
/// for non-browser clients.
pub fn build_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Strict; Secure; HttpOnly",
        name, value, max_age_secs
    )
}

pub fn clear_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; SameSite=Strict; Secure; HttpOnly",
        name
    )
}

pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &str) {
    if let Ok(v) = HeaderValue::from_str(cookie) {
        headers.append(SET_COOKIE, v);
    }
}

/// Pull a single value out of the request `Cookie` header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in cookie_header.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn build_cookie_sets_expected_attributes() {
        let c = build_cookie(ACCESS_COOKIE, "tok123", 900);
        assert!(c.starts_with("accessToken=tok123"));
        assert!(c.contains("Max-Age=900"));
        assert!(c.contains("HttpOnly"));
        assert!(c.contains("Secure"));
        assert!(c.contains("SameSite=Strict"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let c = clear_cookie(REFRESH_COOKIE);
        assert!(c.starts_with("refreshToken=;"));
        assert!(c.contains("Max-Age=0"));
    }

    #[test]
    fn cookie_value_parses_multi_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "theme=dark; accessToken=abc.def.ghi; refreshToken=jkl"
                .parse()
                .unwrap(),
        );
        assert_eq!(
            cookie_value(&headers, ACCESS_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(cookie_value(&headers, REFRESH_COOKIE).as_deref(), Some("jkl"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_value_without_header_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(cookie_value(&headers, ACCESS_COOKIE), None);
    }
}
