//! Maps HTTP status codes onto the [`FetchError`] taxonomy.
//!
//! Classification happens before any decoding: a non-2xx response never
//! reaches the JSON decoder, and a 2xx response is never an error here.

use starlight_domain::FetchError;

/// Pass the payload through for 2xx, otherwise produce the matching error.
///
/// | status      | result                          |
/// |-------------|---------------------------------|
/// | 200..=299   | `Ok(body)`                      |
/// | 404         | `NotFound("Resource not found")`|
/// | 400..=499   | `Client { status, body }`       |
/// | 500..=599   | `Server { status, body }`       |
/// | anything else | `Unknown { status, body }`    |
pub fn classify(status: u16, body: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    match status {
        200..=299 => Ok(body),
        404 => Err(FetchError::not_found()),
        400..=499 => Err(FetchError::Client { status, body }),
        500..=599 => Err(FetchError::Server { status, body }),
        _ => Err(FetchError::Unknown { status, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range_passes_body_through() {
        for status in [200, 201, 204, 299] {
            assert_eq!(classify(status, b"{}".to_vec()), Ok(b"{}".to_vec()));
        }
    }

    #[test]
    fn test_not_found_has_fixed_message() {
        let err = classify(404, b"<html>gone</html>".to_vec()).unwrap_err();
        assert_eq!(err, FetchError::NotFound("Resource not found".into()));
        assert_eq!(err.body(), None);
    }

    #[test]
    fn test_client_and_server_keep_raw_body() {
        let raw = br#"{"error":"The access token is invalid"}"#.to_vec();

        let client = classify(401, raw.clone()).unwrap_err();
        assert_eq!(client, FetchError::Client { status: 401, body: raw.clone() });
        assert_eq!(client.status(), Some(401));

        let server = classify(503, raw.clone()).unwrap_err();
        assert_eq!(server, FetchError::Server { status: 503, body: raw });
    }

    #[test]
    fn test_other_statuses_are_unknown() {
        for status in [100, 301, 304, 600] {
            let err = classify(status, Vec::new()).unwrap_err();
            assert_eq!(err, FetchError::Unknown { status, body: Vec::new() });
        }
    }

    #[test]
    fn test_boundaries() {
        assert!(matches!(classify(399, vec![]), Err(FetchError::Unknown { status: 399, .. })));
        assert!(matches!(classify(400, vec![]), Err(FetchError::Client { status: 400, .. })));
        assert!(matches!(classify(499, vec![]), Err(FetchError::Client { status: 499, .. })));
        assert!(matches!(classify(500, vec![]), Err(FetchError::Server { status: 500, .. })));
        assert!(matches!(classify(599, vec![]), Err(FetchError::Server { status: 599, .. })));
    }
}
