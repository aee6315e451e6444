use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Basic-auth header value for the relay handshake.
pub fn auth_header(login: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{login}:{password}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_login_and_password() {
        assert_eq!(auth_header("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn empty_credentials_still_produce_header() {
        assert_eq!(auth_header("", ""), "Basic Og==");
    }
}
