pub mod backend;
pub mod chain;
pub mod collections;
pub mod context;
pub mod llm;
pub mod retrieve;

#[cfg(test)]
mod tests {
    use super::backend::BackendClient;

    #[test]
    fn validates_backend_base_url() {
        assert!(BackendClient::new("http://127.0.0.1:11435").is_ok());
        assert!(BackendClient::new("http://localhost:11435/v1").is_ok());
        assert!(BackendClient::new("https://rag.internal").is_ok());
        assert!(BackendClient::new("http://[::1]:8080").is_ok());

        assert!(BackendClient::new("127.0.0.1:11435").is_err());
        assert!(BackendClient::new("ftp://127.0.0.1").is_err());
        assert!(BackendClient::new("http://").is_err());
        assert!(BackendClient::new("http://:8080").is_err());

        // Reject userinfo and junk ports.
        assert!(BackendClient::new("http://127.0.0.1@evil.com:11435").is_err());
        assert!(BackendClient::new("http://127.0.0.1:0").is_err());
        assert!(BackendClient::new("http://127.0.0.1:99999").is_err());
        assert!(BackendClient::new("http://127.0.0.1:11435/?x=1").is_err());
        assert!(BackendClient::new("http://127.0.0.1:11435/#top").is_err());
        assert!(BackendClient::new("http://user:pw@127.0.0.1:11435").is_err());

        // Hosts the HTTP stack cannot resolve must fail here, not as a network error later.
        for bad in [
            "http://local host:11435",
            "http://exa<mple>.com",
            "http://%%%:8080",
            "http://a\\b",
            "http://127.0.0.1:11435/v1\tx",
        ] {
            let err = BackendClient::new(bad).unwrap_err();
            assert_eq!(err.code, "BACKEND_URL_INVALID", "base_url={bad}");
        }
    }

    #[test]
    fn trims_trailing_slash_and_builds_endpoints() {
        let c = BackendClient::new("http://127.0.0.1:11435/v1/").unwrap();
        assert_eq!(c.base_url(), "http://127.0.0.1:11435/v1");
        assert_eq!(c.endpoint("/chat/completions"), "http://127.0.0.1:11435/v1/chat/completions");

        let err = BackendClient::new("nope").unwrap_err();
        assert_eq!(err.code, "BACKEND_URL_INVALID");
    }
}
