use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::auth::{PapelUsuario, User},
};

const USER_COLUMNS: &str =
    "id, email, nome, papel, password_hash, ativo, created_at, updated_at";

// O repositório de usuários, responsável por todas as interações com a tabela 'usuarios'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário ativo pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM usuarios WHERE lower(email) = lower($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM usuarios WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // Cria um novo usuário no banco de dados
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        nome: &str,
        papel: PapelUsuario,
        hashed_password: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO usuarios (email, nome, papel, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(nome)
            .bind(papel)
            .bind(hashed_password)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // Converte erro de violação de chave única em um erro mais amigável
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::EmailAlreadyExists;
                    }
                }
                AppError::DatabaseError(e)
            })
    }

    // Troca a senha (usado pela CLI de manutenção)
    pub async fn update_password(&self, email: &str, hashed_password: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE usuarios SET password_hash = $2, updated_at = now() WHERE lower(email) = lower($1)",
        )
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
