// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{FinanceRepository, UserRepository},
    services::{auth::AuthService, finance_service::FinanceService, recurrence::RecurrenceService},
};

/// Configuração lida do ambiente (e do `.env`, se existir).
/// Nenhuma credencial fica no código.
#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub database_max_connections: u32,
    pub jwt_expiration_days: i64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} contém um valor inválido: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            server_addr: env_or("SERVER_ADDR", "0.0.0.0:3000".to_string())?,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_expiration_days: env_or("JWT_EXPIRATION_DAYS", 7)?,
        })
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let db_pool = PgPoolOptions::new()
            .max_connections(self.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(db_pool)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub finance_service: FinanceService,
    pub recurrence_service: RecurrenceService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = settings.connect().await?;
        Ok(Self::with_pool(db_pool, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, settings: &Settings) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo,
            settings.jwt_secret.clone(),
            settings.jwt_expiration_days,
        );
        let finance_service = FinanceService::new(finance_repo.clone());
        let recurrence_service = RecurrenceService::new(Arc::new(finance_repo));

        Self {
            db_pool,
            auth_service,
            finance_service,
            recurrence_service,
        }
    }
}
