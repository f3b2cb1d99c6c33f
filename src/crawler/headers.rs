use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT,
};

/// Build browser-like headers for the blog search endpoint
///
/// Header values that are not valid header text are skipped rather than
/// failing the request.
///
/// # Examples
///
/// ```
/// use naver_blog_scraper::crawler::headers::build_search_headers;
///
/// let headers = build_search_headers(
///     "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
///     "https://section.blog.naver.com/",
///     "ko-KR,ko;q=0.9",
/// );
/// assert!(headers.contains_key("referer"));
/// ```
pub fn build_search_headers(user_agent: &str, referer: &str, accept_language: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    if let Ok(value) = HeaderValue::from_str(accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );

    // The search page issues these as same-origin XHRs
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_headers() {
        let headers = build_search_headers(
            "Mozilla/5.0 Test",
            "https://section.blog.naver.com/",
            "ko-KR,ko;q=0.9,en;q=0.8",
        );

        assert_eq!(headers.get(USER_AGENT).unwrap(), "Mozilla/5.0 Test");
        assert_eq!(
            headers.get(REFERER).unwrap(),
            "https://section.blog.naver.com/"
        );
        assert_eq!(
            headers.get(ACCEPT_LANGUAGE).unwrap(),
            "ko-KR,ko;q=0.9,en;q=0.8"
        );
        assert!(headers.contains_key("x-requested-with"));
    }

    #[test]
    fn test_invalid_values_are_skipped() {
        let headers = build_search_headers("bad\nagent", "https://section.blog.naver.com/", "ko");
        assert!(!headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(REFERER));
    }
}
