use std::{net::SocketAddr, sync::Arc};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use configs::AppConfig;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::session::RedisSessionStore;
use service::auth::tokens::TokenIssuer;
use service::auth::{AuthService, AuthSettings};
use service::listings::{ListingService, SeaOrmListingRepository};
use service::mail::smtp::SmtpMailer;
use service::mail::{LogMailer, MailDispatcher, Mailer};
use service::media::{CloudinaryHost, DisabledImageHost, ImageHost};
use service::orders::{OrderService, SeaOrmOrderRepository};
use service::payments::{CheckoutService, DisabledGateway, PaymentGateway, StripeGateway};
use service::users::{SeaOrmUserRepository, UserService};

use crate::cookies::CookiePolicy;
use crate::routes;
use crate::state::ServerState;

fn build_cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn build_mailer(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match &cfg.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "smtp mailer configured");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            warn!("SMTP_HOST not set; outgoing mail is logged only");
            Ok(Arc::new(LogMailer))
        }
    }
}

fn build_gateway(cfg: &AppConfig) -> Arc<dyn PaymentGateway> {
    match &cfg.stripe {
        Some(stripe) => Arc::new(StripeGateway::new(stripe.clone())),
        None => {
            warn!("STRIPE_SECRET_KEY not set; checkout is disabled");
            Arc::new(DisabledGateway)
        }
    }
}

fn build_image_host(cfg: &AppConfig) -> Arc<dyn ImageHost> {
    match &cfg.cloudinary {
        Some(c) => Arc::new(CloudinaryHost::new(c.clone())),
        None => {
            warn!("Cloudinary credentials not set; image upload is disabled");
            Arc::new(DisabledImageHost)
        }
    }
}

fn require_pong(pong: bool) -> anyhow::Result<()> {
    if !pong {
        anyhow::bail!("redis did not answer PING");
    }
    Ok(())
}

/// Wire every service against the real backends.
pub async fn build_state(cfg: &AppConfig, db: DatabaseConnection) -> anyhow::Result<ServerState> {
    let sessions = RedisSessionStore::connect(&cfg.redis.url).await?;
    require_pong(sessions.ping().await?)?;
    info!("redis session store ready");

    let tokens = TokenIssuer::from_config(&cfg.auth);
    let cookies = CookiePolicy::new(cfg.server.production, tokens.access_ttl(), tokens.refresh_ttl());
    let auth = AuthService::new(
        Arc::new(SeaOrmAuthRepository::new(db.clone())),
        Arc::new(sessions),
        tokens,
        MailDispatcher::new(build_mailer(cfg)?),
        AuthSettings::from_config(&cfg.auth, &cfg.client_url),
    );

    let folder = cfg.cloudinary.as_ref().map(|c| c.folder.clone()).unwrap_or_else(|| "services".into());
    let listing_repo = Arc::new(SeaOrmListingRepository { db: db.clone() });
    let listings = ListingService::new(listing_repo.clone(), build_image_host(cfg), folder);

    let orders_repo = Arc::new(SeaOrmOrderRepository { db: db.clone() });
    let currency = cfg.stripe.as_ref().map(|s| s.currency.clone()).unwrap_or_else(|| "usd".into());
    let checkout = CheckoutService::new(build_gateway(cfg), orders_repo.clone(), listing_repo.clone(), &cfg.client_url, &currency);

    Ok(ServerState {
        auth: Arc::new(auth),
        users: Arc::new(UserService::new(Arc::new(SeaOrmUserRepository { db }))),
        listings: Arc::new(listings),
        checkout: Arc::new(checkout),
        orders: Arc::new(OrderService::new(orders_repo)),
        cookies,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    common::env::ensure_env()?;
    let cfg = AppConfig::load_and_validate()?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.run_migrations {
        Migrator::up(&db, None).await?;
        info!("migrations applied");
    }

    let state = build_state(&cfg, db.clone()).await?;
    let app: Router = routes::build_router(state, build_cors(&cfg.server.cors_origins));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, production = cfg.server.production, "starting marketplace server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    db.close().await?;
    info!("database pool closed");
    Ok(())
}
