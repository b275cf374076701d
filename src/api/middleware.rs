//! Optional request guards for the tribunal API: a shared bearer token, a
//! per-client request budget and the CORS policy.
//!
//! Nothing is enforced unless configured through `TRIBUNAL_API_KEY`,
//! `TRIBUNAL_RATE_LIMIT` (requests per minute per client) or
//! `TRIBUNAL_CORS_ORIGINS` (comma-separated).

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::{HashMap, VecDeque},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    pub api_key: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; blank or non-positive values mean "off".
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("TRIBUNAL_API_KEY").filter(|k| !k.trim().is_empty());

        let cors_origins = lookup("TRIBUNAL_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        let rate_limiter = lookup("TRIBUNAL_RATE_LIMIT")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .map(|n| RateLimiter::new(n, RATE_WINDOW));

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_rate_limit(max_requests: u32) -> Self {
        Self {
            rate_limiter: Some(RateLimiter::new(max_requests, RATE_WINDOW)),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some() || self.rate_limiter.is_some()
    }

    /// Permissive unless explicit origins are configured.
    pub fn cors_layer(&self) -> CorsLayer {
        match &self.cors_origins {
            Some(origins) => {
                let origins: Vec<HeaderValue> =
                    origins.iter().filter_map(|o| o.parse().ok()).collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
            None => CorsLayer::permissive(),
        }
    }
}

/// Sliding-window request budget per client address.
///
/// Idle clients are swept at most once per window, during a later check, so
/// the table only holds clients seen within the last window or so.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Arc<Mutex<Clients>>,
}

#[derive(Debug)]
struct Clients {
    hits: HashMap<IpAddr, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(Clients {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Record a request from `ip`. When the budget is spent, returns how long
    /// until the oldest counted request leaves the window.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let window = self.window;
        let mut clients = self.clients.lock().expect("rate limiter lock poisoned");

        if now.duration_since(clients.last_sweep) >= window {
            clients.hits.retain(|_, hits| {
                hits.back()
                    .is_some_and(|&t| now.duration_since(t) < window)
            });
            clients.last_sweep = now;
        }

        let hits = clients.hits.entry(ip).or_default();
        while hits
            .front()
            .is_some_and(|&t| now.duration_since(t) >= window)
        {
            hits.pop_front();
        }

        if hits.len() < self.max_requests as usize {
            hits.push_back(now);
            return Ok(());
        }
        let oldest = hits.front().copied().unwrap_or(now);
        Err(window.saturating_sub(now.duration_since(oldest)))
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .expect("rate limiter lock poisoned")
            .hits
            .len()
    }
}

pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").ok_or("malformed Authorization header"))
        .unwrap_or(Err("missing Authorization header"));

    match token {
        Ok(token) if token == expected => Ok(next.run(request).await),
        Ok(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected invalid API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(reason) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request: {}", reason);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = &config.rate_limiter else {
        return next.run(request).await;
    };
    let ip = client_ip(&request);

    match limiter.check(ip) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(%ip, "Rate limit exceeded");
            let seconds = retry_after.as_secs().max(1).to_string();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, seconds)],
            )
                .into_response()
        }
    }
}

/// Proxy headers first, then the socket peer, then loopback.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let headers = request.headers();
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    let real_ip = || {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok())
    };
    let peer = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    };

    forwarded
        .or_else(real_ip)
        .or_else(peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn budget_is_per_client() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.check(ip("192.168.1.1")).is_ok());
        assert!(limiter.check(ip("192.168.1.1")).is_ok());
        let retry = limiter.check(ip("192.168.1.1")).unwrap_err();
        assert!(retry <= Duration::from_secs(60) && retry > Duration::from_secs(55));

        assert!(limiter.check(ip("192.168.1.2")).is_ok());
    }

    #[test]
    fn idle_clients_are_swept_by_later_checks() {
        let limiter = RateLimiter::new(1, Duration::ZERO);
        for n in 1..=50 {
            assert!(limiter.check(ip(&format!("10.0.0.{}", n))).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn lookup_ignores_blank_and_zero_values() {
        let config = SecurityConfig::from_lookup(|key| match key {
            "TRIBUNAL_API_KEY" => Some("  ".into()),
            "TRIBUNAL_RATE_LIMIT" => Some("0".into()),
            "TRIBUNAL_CORS_ORIGINS" => Some(" , ".into()),
            _ => None,
        });
        assert!(!config.is_enabled());
        assert!(config.cors_origins.is_none());
    }

    #[test]
    fn lookup_enables_configured_guards() {
        let config = SecurityConfig::from_lookup(|key| match key {
            "TRIBUNAL_API_KEY" => Some("secret".into()),
            "TRIBUNAL_RATE_LIMIT" => Some(" 30 ".into()),
            "TRIBUNAL_CORS_ORIGINS" => Some("http://a.test, http://b.test".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert!(config.rate_limiter.is_some());
        assert_eq!(
            config.cors_origins,
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
    }

    #[test]
    fn client_ip_prefers_proxy_headers_then_peer() {
        let forwarded = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&forwarded), ip("203.0.113.7"));

        let mut direct = Request::builder().body(Body::empty()).unwrap();
        direct
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5000))));
        assert_eq!(client_ip(&direct), ip("198.51.100.4"));

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
