use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use rusty_users::auth::{AuthorizationGate, NewUser, SessionService, TokenManager};
use rusty_users::clock::system_clock;
use rusty_users::config::{BootstrapAccount, ServerConfig};
use rusty_users::error::RustyUsersError;
use rusty_users::handlers::{create_routes, AppState};
use rusty_users::security_logger::init_security_logger;
use rusty_users::storage::{
    create_memory_credential_store, create_memory_revocation_store, RevocationSweeper,
    SharedCredentialStore, SharedTokenRevocationStore,
};

#[tokio::main]
async fn main() {
    // Initialize env
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }

    // Initialize logging
    env_logger::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration: host={}, port={}", config.host, config.port);

    if let Err(e) = run(config).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), RustyUsersError> {
    init_security_logger();

    let to_chrono = |d: std::time::Duration| {
        chrono::Duration::from_std(d).map_err(|e| RustyUsersError::ConfigError(e.to_string()))
    };

    let clock = system_clock();
    let (credentials, revocations) = open_stores(&config).await?;

    let tokens = Arc::new(TokenManager::new(
        &config.jwt_secret,
        to_chrono(config.token_ttl)?,
        clock.clone(),
    ));
    let gate = Arc::new(AuthorizationGate::new(tokens.clone(), revocations.clone()));
    let sessions = Arc::new(SessionService::new(
        credentials,
        revocations.clone(),
        tokens,
        to_chrono(config.revocation_ttl)?,
        config.login_min_duration,
    ));

    if let Some(account) = &config.bootstrap_account {
        seed_account(&sessions, account).await?;
    }

    let sweeper = Arc::new(RevocationSweeper::new(revocations, clock));
    sweeper.start(config.sweep_interval);

    let routes = create_routes(AppState { gate, sessions });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| RustyUsersError::ConfigError(format!("Failed to parse server address: {}", e)))?;

    info!("Starting Rusty Users server on {}", addr);
    warp::serve(routes).run(addr).await;
    Ok(())
}

async fn open_stores(
    config: &ServerConfig,
) -> Result<(SharedCredentialStore, SharedTokenRevocationStore), RustyUsersError> {
    #[cfg(feature = "postgres")]
    {
        if let Some(url) = &config.database_url {
            use rusty_users::storage::postgres::{connect, PgCredentialStore, PgTokenRevocationStore};

            let pool = connect(url).await?;
            info!("Using PostgreSQL stores");
            return Ok((
                Arc::new(PgCredentialStore::new(pool.clone())),
                Arc::new(PgTokenRevocationStore::new(pool)),
            ));
        }
    }

    #[cfg(not(feature = "postgres"))]
    {
        if config.database_url.is_some() {
            warn!("DATABASE_URL is set but the postgres feature is disabled; using in-memory stores");
        }
    }

    warn!("Using in-memory stores: users and revoked tokens are lost on restart");
    Ok((create_memory_credential_store(), create_memory_revocation_store()))
}

async fn seed_account(
    sessions: &SessionService,
    account: &BootstrapAccount,
) -> Result<(), RustyUsersError> {
    let new_user = NewUser {
        firstname: "Admin".to_string(),
        lastname: "User".to_string(),
        email: account.email.clone(),
        password: account.password.clone(),
    };

    match sessions.register(new_user).await {
        Ok(user) => {
            info!("Bootstrap account created: {}", user.email);
            Ok(())
        }
        Err(RustyUsersError::Conflict(_)) => {
            info!("Bootstrap account already exists");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
