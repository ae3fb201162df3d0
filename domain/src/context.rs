use crate::error::Error;
use crate::notifier::Notifier;
use crate::render::Surface;
use crate::sequencer::RequestSequencer;
use api_client::auth::{login, AuthenticatedUser, UserCredentials};
use api_client::ApiClient;
use log::*;
use service::config::Config;
use sse::{Client, EventSourceTransport, StreamOptions};
use std::sync::Arc;

/// Shared services handed to every feature module. Built once at startup.
pub struct AppContext {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub stream: Arc<Client>,
    pub surface: Arc<dyn Surface>,
    pub notifier: Arc<dyn Notifier>,
    pub sequencer: Arc<RequestSequencer>,
    pub user: Option<AuthenticatedUser>,
}

impl AppContext {
    pub fn new(
        config: Config,
        api: Arc<ApiClient>,
        stream: Arc<Client>,
        surface: Arc<dyn Surface>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            api,
            stream,
            surface,
            notifier,
            sequencer: Arc::new(RequestSequencer::new()),
            user: None,
        }
    }

    /// Build the REST client, log in when credentials are configured and
    /// create a stream client that shares the resulting session cookie.
    pub async fn from_config(
        config: Config,
        surface: Arc<dyn Surface>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Error> {
        let api = ApiClient::builder(config.base_url())
            .with_timeout(config.request_timeout())
            .with_csrf_path(config.csrf_path())
            .build()?;

        let user = match config.credentials() {
            Some(raw) => {
                let credentials = UserCredentials::parse(&raw)?;
                Some(login(&api, config.login_path(), &credentials).await?)
            }
            None => {
                warn!("No credentials configured; relying on an existing session");
                None
            }
        };

        let mut transport = EventSourceTransport::new();
        if let Some(cookie) = api.cookie_header() {
            transport = transport.with_cookie(&cookie);
        }

        let mut ctx = Self::new(
            config,
            Arc::new(api),
            Client::new(Arc::new(transport)),
            surface,
            notifier,
        );
        ctx.user = user;
        Ok(ctx)
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            max_reconnect_attempts: self.config.max_reconnect_attempts,
            reconnect_delay: self.config.reconnect_delay(),
            max_reconnect_delay: self.config.max_reconnect_delay(),
        }
    }

    /// Open the event stream. Returns immediately.
    pub fn connect(&self) {
        self.stream
            .connect(self.config.realtime_url(), self.stream_options());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::LogNotifier;
    use crate::render::MemorySurface;
    use clap::Parser;
    use mockito::Server;
    use std::time::Duration;

    fn config(args: &[&str]) -> Config {
        let mut argv = vec!["printshop_console"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn stream_options_follow_the_configuration() {
        let config = config(&[
            "--max-reconnect-attempts",
            "3",
            "--reconnect-delay-ms",
            "250",
            "--max-reconnect-delay-ms",
            "4000",
        ]);
        let ctx = AppContext::from_config(
            config,
            Arc::new(MemorySurface::default()),
            Arc::new(LogNotifier),
        )
        .await
        .unwrap();

        let options = ctx.stream_options();
        assert_eq!(options.max_reconnect_attempts, 3);
        assert_eq!(options.reconnect_delay, Duration::from_millis(250));
        assert_eq!(options.max_reconnect_delay, Duration::from_millis(4000));
        assert!(ctx.user.is_none());
    }

    #[tokio::test]
    async fn credentials_open_a_session_before_streaming() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/csrf_token.php")
            .with_body(r#"{"success":true,"csrf_token":"t1"}"#)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/api/login.php")
            .with_header("set-cookie", "PHPSESSID=abc123; Path=/")
            .with_body(r#"{"success":true,"data":{"user_id":3,"role":"staff"}}"#)
            .expect(1)
            .create_async()
            .await;

        let url = server.url();
        let config = config(&["--base-url", url.as_str(), "--credentials", "staff@shop.test:pw"]);
        let ctx = AppContext::from_config(
            config,
            Arc::new(MemorySurface::default()),
            Arc::new(LogNotifier),
        )
        .await
        .unwrap();

        login.assert_async().await;
        assert_eq!(ctx.user.map(|u| u.user_id), Some(3));
        assert_eq!(ctx.api.cookie_header().as_deref(), Some("PHPSESSID=abc123"));
    }

    #[tokio::test]
    async fn malformed_credentials_are_a_configuration_error() {
        let config = config(&["--credentials", "no-separator"]);
        let result = AppContext::from_config(
            config,
            Arc::new(MemorySurface::default()),
            Arc::new(LogNotifier),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(
            err.error_kind,
            crate::error::DomainErrorKind::Internal(crate::error::InternalErrorKind::Config)
        );
    }
}
