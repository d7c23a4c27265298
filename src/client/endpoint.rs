//! Service address resolution

/// Host prefixes treated as the local machine
const LOCAL_HOST_PREFIXES: &[&str] = &["localhost", "127.", "::1", "[::1]"];

/// Returns true if `host` names the local machine
pub fn is_local_host(host: &str) -> bool {
    LOCAL_HOST_PREFIXES
        .iter()
        .any(|prefix| host.starts_with(prefix))
}

/// Builds the service base URL for `host` and `port`
///
/// Local hosts are reached over plain HTTP on the given port. Any other
/// host is assumed to sit behind TLS termination on the standard port, so
/// the URL uses HTTPS and omits the port.
///
/// # Examples
///
/// ```
/// use crawl_relay::client::base_url;
///
/// assert_eq!(base_url("localhost", 11235), "http://localhost:11235");
/// assert_eq!(base_url("crawl.example.com", 11235), "https://crawl.example.com");
/// ```
pub fn base_url(host: &str, port: u16) -> String {
    if is_local_host(host) {
        if host.starts_with("::1") {
            format!("http://[{}]:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        }
    } else {
        format!("https://{}", host)
    }
}
