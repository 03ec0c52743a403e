//! Request handler module
//!
//! Route table assembly plus the debug endpoints: echo helpers, the ASCII
//! table and static assets. Body-derived endpoints are wrapped in `BodyEtag`.

pub mod ascii;
pub mod assets;
pub mod echo;
pub mod router;

use crate::config::Config;
use crate::http::{BodyEtag, Handler};
use std::io;
use std::sync::Arc;

pub use assets::{
    AssetClock, AssetError, AssetProvider, DirAssets, EmbeddedAssets, StaticAssets,
};
pub use router::{handle_request, index_page, Router};

/// Build the full route table for `config`
///
/// Assets are stamped with `clock` so every response agrees on `Last-Modified`.
pub fn build_router(config: &Config, clock: AssetClock) -> io::Result<Router> {
    let mode = config.etag.match_mode;
    let strong = |h: Arc<dyn Handler>| -> Arc<dyn Handler> {
        Arc::new(BodyEtag::strong(h).with_match_mode(mode))
    };
    let weak = |h: Arc<dyn Handler>| -> Arc<dyn Handler> {
        Arc::new(BodyEtag::weak(h).with_match_mode(mode))
    };

    let provider: Arc<dyn AssetProvider> = match config.assets.dir.as_deref() {
        Some(dir) => Arc::new(DirAssets::new(dir)?),
        None => Arc::new(EmbeddedAssets),
    };
    let assets = Arc::new(StaticAssets::new(provider, clock));

    let mut router = Router::new();
    router.get("/headers", Arc::new(echo::headers));
    router.get("/set-cookie", Arc::new(echo::set_cookie));
    router.get("/hello", weak(Arc::new(echo::hello)));
    router.get("/ascii", strong(Arc::new(ascii::ascii)));
    router.post("/body", Arc::new(echo::body));

    for name in assets.names() {
        router.get(&name, Arc::clone(&assets) as Arc<dyn Handler>);
    }

    let mut listing = router.routes();
    listing.push((hyper::Method::GET, "/".to_string()));
    listing.sort_by(|a, b| a.1.cmp(&b.1));
    router.get("/", strong(index_page(&listing)));

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use hyper::body::Bytes;
    use hyper::header::{ETAG, IF_NONE_MATCH};
    use hyper::{Method, StatusCode};
    use std::time::{Duration, UNIX_EPOCH};

    fn router() -> Router {
        let config = Config::load_from("/nonexistent/hare-config").unwrap();
        let clock = AssetClock::fixed(UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        build_router(&config, clock).unwrap()
    }

    fn get(path: &str, inm: Option<&str>) -> crate::http::Request {
        let mut builder = hyper::Request::builder().method(Method::GET).uri(path);
        if let Some(v) = inm {
            builder = builder.header(IF_NONE_MATCH, v);
        }
        builder.body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_hello_has_weak_etag() {
        let resp = router().dispatch(&get("/hello", None));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[ETAG], "W/\"HSKScZKNP54rsDdb1s5dtsbTSNk=\"");
    }

    #[test]
    fn test_hello_revalidates() {
        let resp = router().dispatch(&get("/hello", Some("W/\"HSKScZKNP54rsDdb1s5dtsbTSNk=\"")));
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_index_and_assets_registered() {
        let router = router();
        let paths: Vec<String> = router.routes().into_iter().map(|(_, p)| p).collect();
        for expected in ["/", "/ascii", "/body", "/favicon.svg", "/hello", "/robots.txt"] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected}");
        }

        let resp = router.dispatch(&get("/", None));
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(ETAG));
    }

    #[test]
    fn test_asset_served_with_etag() {
        let resp = router().dispatch(&get("/robots.txt", None));
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(ETAG));
        assert!(resp.headers().contains_key(hyper::header::LAST_MODIFIED));
    }

    #[test]
    fn test_missing_asset_dir_fails() {
        let mut config = Config::load_from("/nonexistent/hare-config").unwrap();
        config.assets.dir = Some("/nonexistent/hare-assets".to_string());
        assert!(build_router(&config, AssetClock::startup()).is_err());
    }
}
