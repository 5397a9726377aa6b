// src/db/maintenance_repo.rs

use serde::Serialize;
use sqlx::PgPool;

use crate::common::{db_utils::transacao_do_sistema, error::AppError};

#[derive(Debug, Clone, Serialize)]
pub struct InfoTabela {
    pub tabela: String,
    pub colunas: Vec<String>,
    pub linhas: i64,
    pub rls_ativo: bool,
}

fn nome_de_tabela_valido(tabela: &str) -> bool {
    !tabela.is_empty()
        && tabela.len() <= 63
        && tabela.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// Consultas de diagnóstico usadas pela CLI de manutenção
#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Estrutura e volume de uma tabela do schema atual; `None` se não existir.
    pub async fn check_table(&self, tabela: &str) -> Result<Option<InfoTabela>, AppError> {
        if !nome_de_tabela_valido(tabela) {
            return Err(AppError::BadRequest(format!("Nome de tabela inválido: {}", tabela)));
        }

        let colunas: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
            .bind(tabela)
            .fetch_all(&self.pool)
            .await?;

        if colunas.is_empty() {
            return Ok(None);
        }

        let rls_ativo: bool = sqlx::query_scalar(
            "SELECT relrowsecurity FROM pg_class WHERE oid = to_regclass($1)",
        )
            .bind(tabela)
            .fetch_optional(&self.pool)
            .await?
            .unwrap_or(false);

        // O nome já foi validado acima e confirmado no information_schema.
        // Contexto de sistema: com RLS forçado a contagem seria zero.
        let mut tx = transacao_do_sistema(&self.pool).await?;
        let linhas: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", tabela))
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(InfoTabela {
            tabela: tabela.to_string(),
            colunas,
            linhas,
            rls_ativo,
        }))
    }

    /// `true` se o papel conectado ignora RLS (SUPERUSER ou BYPASSRLS).
    pub async fn papel_ignora_rls(&self) -> Result<bool, AppError> {
        let ignora: bool = sqlx::query_scalar(
            "SELECT rolsuper OR rolbypassrls FROM pg_roles WHERE rolname = current_user",
        )
            .fetch_one(&self.pool)
            .await?;

        Ok(ignora)
    }
}
