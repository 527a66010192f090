pub mod account;
pub mod admin;
pub mod check_in;
pub mod claim;
pub mod game;
pub mod lucky_draw;
pub mod stats;

pub use account::account_config;
pub use admin::admin_config;
pub use check_in::check_in_config;
pub use claim::claim_config;
pub use game::game_config;
pub use lucky_draw::lucky_draw_config;
pub use stats::stats_config;

use actix_web::HttpRequest;
use std::net::{IpAddr, SocketAddr};

const X_FORWARDED_FOR: &str = "X-Forwarded-For";

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .ok()
        .or_else(|| raw.parse().ok())
}

/// 客户端 IP
///
/// 默认取 TCP 对端地址。只有对端在 `trusted_proxies` 里时才读取
/// X-Forwarded-For，并从右往左跳过受信任代理，取第一个外部地址。
pub(crate) fn client_ip(req: &HttpRequest, trusted_proxies: &[IpAddr]) -> Option<String> {
    let peer = req.peer_addr().map(|addr| addr.ip());

    if peer.is_some_and(|ip| trusted_proxies.contains(&ip)) {
        let forwarded = req
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok());
        if let Some(chain) = forwarded {
            for hop in chain.rsplit(',').map(str::trim) {
                match parse_ip(hop) {
                    Some(ip) if trusted_proxies.contains(&ip) => continue,
                    Some(ip) => return Some(ip.to_string()),
                    None => break,
                }
            }
        }
    }

    peer.map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn proxy() -> IpAddr {
        "10.0.0.2".parse().unwrap()
    }

    #[test]
    fn test_forwarded_header_ignored_from_untrusted_peer() {
        let req = TestRequest::default()
            .peer_addr("203.0.113.7:51000".parse().unwrap())
            .insert_header((X_FORWARDED_FOR, "198.51.100.1"))
            .to_http_request();
        assert_eq!(client_ip(&req, &[]).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&req, &[proxy()]).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_forwarded_header_from_trusted_proxy() {
        // 客户端自己伪造的最左侧地址不会被采用
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:443".parse().unwrap())
            .insert_header((X_FORWARDED_FOR, "1.1.1.1, 203.0.113.7, 10.0.0.2"))
            .to_http_request();
        assert_eq!(client_ip(&req, &[proxy()]).as_deref(), Some("203.0.113.7"));

        // 没有转发头时退回对端地址
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:443".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(&req, &[proxy()]).as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_missing_peer() {
        let req = TestRequest::default()
            .insert_header((X_FORWARDED_FOR, "198.51.100.1"))
            .to_http_request();
        assert_eq!(client_ip(&req, &[proxy()]), None);
    }
}
