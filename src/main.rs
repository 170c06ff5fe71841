use clap::Parser;
use env_logger::Env;
use recipe_api::{cors, pool, routes, Config, Stores, ACCESS_LOG_TARGET, DEFAULT_LOG_FILTER};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER)).init();

    let config = Config::parse();
    let pool = pool::connect(&config.database).await?;

    let app = routes(Stores::sqlite(pool.clone()), config.rate_limiter())
        .with(cors())
        .with(warp::log(ACCESS_LOG_TARGET));

    let (addr, server) = warp::serve(app)
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), shutdown_signal())?;

    log::info!("starting server on {addr}");
    server.await;

    log::info!("server stopped, closing database pool");
    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("> Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("> Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("shutdown signal received");
}
