use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
// As políticas das tabelas financeiras só liberam linhas para um usuário
// ativo (app.user_id) ou para as rotinas do sistema (app.rotina). Os dois
// valores são locais à transação: somem no commit/rollback e nunca
// passam de uma requisição para outra pela pool.

/// Abre uma transação com `app.user_id` definido.
pub async fn transacao_do_usuario(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Abre uma transação das rotinas internas (geração recorrente, vencimentos, CLI).
pub async fn transacao_do_sistema(pool: &PgPool) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.rotina', 'sistema', true)")
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

pub(crate) async fn get_rls_transaction(
    app_state: &AppState,
    user: &AuthenticatedUser,
) -> Result<Transaction<'static, Postgres>, AppError> {
    transacao_do_usuario(&app_state.db_pool, user.0.id).await
}
