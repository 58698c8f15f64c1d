use crate::config::Settings;
use crate::proxy::{GatewayService, HistoryStore, ProxyEngine};
use crate::Result;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    engine: ProxyEngine,
}

impl Application {
    /// Build every component from settings.
    ///
    /// Invalid routes, capacity or correlation header are fatal here, before
    /// any request is served.
    #[instrument(skip(settings))]
    pub fn new(settings: Settings) -> Result<Self> {
        let config = settings.proxy_config()?;
        let capacity = settings.history_capacity()?;
        let routes = settings.route_table()?;

        for route in routes.entries() {
            info!(prefix = %route.prefix(), target = %route.target(), "Registered route");
        }
        if routes.is_empty() {
            warn!("No routes configured; every proxied request will be rejected");
        }

        let history = Arc::new(HistoryStore::new(capacity));
        let engine = ProxyEngine::new(config, Arc::new(routes), history);

        Ok(Self { settings, engine })
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        self.engine.history()
    }

    pub fn router(&self) -> axum::Router {
        GatewayService::new(self.engine.clone()).into_router()
    }

    /// Bind the configured address and serve until Ctrl-C
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.settings.bind_address()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(
            address = %addr,
            routes = self.engine.routes().len(),
            history_capacity = %self.history().capacity(),
            "Starting Golden Gate"
        );

        let router = self.router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Golden Gate stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteSettings;
    use crate::proxy::test_utils::spawn_backend;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;
    use std::io::Write;
    use tokio::sync::oneshot;

    fn settings_with_routes(routes: Vec<RouteSettings>) -> Settings {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        file.write_all(b"[history]\ncapacity = 3\n").expect("write config");
        let mut settings = Settings::from_file(file.path()).expect("settings load");
        settings.routes = routes;
        settings
    }

    #[test]
    fn test_invalid_route_fails_construction() {
        let settings = settings_with_routes(vec![RouteSettings {
            prefix: "/svc".to_string(),
            target: "ftp://example.com".to_string(),
        }]);
        assert!(Application::new(settings).is_err());
    }

    #[tokio::test]
    async fn test_serves_proxy_and_gateway_endpoints() {
        let backend = spawn_backend().await;
        let settings = settings_with_routes(vec![RouteSettings {
            prefix: "/svc-a".to_string(),
            target: format!("http://{backend}"),
        }]);
        let app = Application::new(settings).expect("application builds");
        let history = Arc::clone(app.history());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(app.serve(listener, async {
            let _ = stop_rx.await;
        }));

        let client = Client::builder(TokioExecutor::new()).build_http::<Body>();

        let health = client
            .request(
                Request::get(format!("http://{addr}/__gateway/health"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let proxied = client
            .request(
                Request::post(format!("http://{addr}/svc-a/echo"))
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(proxied.status(), StatusCode::OK);
        // Peer address comes from connect info on a real listener
        assert_eq!(
            proxied.headers().get("x-echo-forwarded-for").unwrap(),
            "127.0.0.1"
        );

        let records = history.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_body.to_text(), "hello");

        drop(client);
        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
