// src/db/finance_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::transacao_do_sistema, error::AppError},
    models::{
        finance::{
            CategoriaFinanceira, ContaPagar, ContaReceber, FiltroContas, NovaContaPagar,
            NovaContaReceber, StatusContaPagar, StatusContaReceber, TipoConta,
        },
        recurrence::ChaveRecorrencia,
    },
    services::recurrence::RecurrenceStore,
};

const CONTA_PAGAR_COLUMNS: &str = r#"
    id, descricao, valor, categoria_id,
    fornecedor_nome, fornecedor_documento, fornecedor_telefone,
    forma_pagamento, observacoes,
    data_vencimento, data_pagamento, status,
    recorrente, frequencia_recorrencia, data_proxima_geracao, conta_origem_id,
    criado_por, created_at, updated_at
"#;

const CONTA_RECEBER_COLUMNS: &str = r#"
    id, descricao, valor, categoria_id,
    idoso_id, pagador_nome, pagador_documento,
    forma_pagamento, observacoes,
    data_vencimento, data_recebimento, status,
    recorrente, frequencia_recorrencia, conta_origem_id,
    criado_por, created_at, updated_at
"#;

// Índice parcial criado na migração: unicidade de (origem, vencimento)
const ON_CONFLICT_GERACAO: &str =
    "ON CONFLICT (conta_origem_id, data_vencimento) WHERE conta_origem_id IS NOT NULL DO NOTHING";

fn insert_conta_pagar_sql(on_conflict: &str) -> String {
    format!(
        r#"
        INSERT INTO contas_pagar (
            descricao, valor, categoria_id,
            fornecedor_nome, fornecedor_documento, fornecedor_telefone,
            forma_pagamento, observacoes, data_vencimento, status,
            recorrente, frequencia_recorrencia, data_proxima_geracao,
            conta_origem_id, criado_por
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        {}
        RETURNING {}
        "#,
        on_conflict, CONTA_PAGAR_COLUMNS
    )
}

fn insert_conta_receber_sql(on_conflict: &str) -> String {
    format!(
        r#"
        INSERT INTO contas_receber (
            descricao, valor, categoria_id,
            idoso_id, pagador_nome, pagador_documento,
            forma_pagamento, observacoes, data_vencimento, status,
            recorrente, frequencia_recorrencia, conta_origem_id, criado_por
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        {}
        RETURNING {}
        "#,
        on_conflict, CONTA_RECEBER_COLUMNS
    )
}

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn create_categoria<'e, E>(
        &self,
        executor: E,
        nome: &str,
        tipo: TipoConta,
    ) -> Result<CategoriaFinanceira, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CategoriaFinanceira>(
            r#"
            INSERT INTO categorias_financeiras (nome, tipo)
            VALUES ($1, $2)
            RETURNING id, nome, tipo, ativo, created_at
            "#,
        )
            .bind(nome)
            .bind(tipo)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::Conflict(format!("A categoria '{}' já existe.", nome));
                    }
                }
                AppError::DatabaseError(e)
            })
    }

    pub async fn list_categorias<'e, E>(
        &self,
        executor: E,
        tipo: Option<TipoConta>,
    ) -> Result<Vec<CategoriaFinanceira>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categorias = sqlx::query_as::<_, CategoriaFinanceira>(
            r#"
            SELECT id, nome, tipo, ativo, created_at
            FROM categorias_financeiras
            WHERE ativo AND ($1::tipo_conta IS NULL OR tipo = $1)
            ORDER BY nome ASC
            "#,
        )
            .bind(tipo)
            .fetch_all(executor)
            .await?;

        Ok(categorias)
    }

    // =========================================================================
    //  CONTAS A PAGAR
    // =========================================================================

    pub async fn create_conta_pagar<'e, E>(
        &self,
        executor: E,
        nova: &NovaContaPagar,
    ) -> Result<ContaPagar, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = insert_conta_pagar_sql("");
        let conta = bind_conta_pagar(sqlx::query_as::<_, ContaPagar>(&sql), nova)
            .fetch_one(executor)
            .await?;

        Ok(conta)
    }

    pub async fn list_contas_pagar<'e, E>(
        &self,
        executor: E,
        filtro: &FiltroContas<StatusContaPagar>,
    ) -> Result<Vec<ContaPagar>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {}
            FROM contas_pagar
            WHERE ($1::status_conta_pagar IS NULL OR status = $1)
              AND ($2::date IS NULL OR data_vencimento >= $2)
              AND ($3::date IS NULL OR data_vencimento <= $3)
            ORDER BY data_vencimento ASC, created_at ASC
            "#,
            CONTA_PAGAR_COLUMNS
        );
        let contas = sqlx::query_as::<_, ContaPagar>(&sql)
            .bind(filtro.status)
            .bind(filtro.de)
            .bind(filtro.ate)
            .fetch_all(executor)
            .await?;

        Ok(contas)
    }

    pub async fn get_conta_pagar<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<ContaPagar>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {} FROM contas_pagar WHERE id = $1", CONTA_PAGAR_COLUMNS);
        let conta = sqlx::query_as::<_, ContaPagar>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(conta)
    }

    pub async fn update_status_conta_pagar<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: StatusContaPagar,
        data_pagamento: Option<NaiveDate>,
    ) -> Result<Option<ContaPagar>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE contas_pagar
            SET status = $2, data_pagamento = $3, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            CONTA_PAGAR_COLUMNS
        );
        let conta = sqlx::query_as::<_, ContaPagar>(&sql)
            .bind(id)
            .bind(status)
            .bind(data_pagamento)
            .fetch_optional(executor)
            .await?;

        Ok(conta)
    }

    pub async fn delete_conta_pagar<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM contas_pagar WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn marcar_vencidas_pagar<'e, E>(&self, executor: E, hoje: NaiveDate) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE contas_pagar
            SET status = 'vencido', updated_at = now()
            WHERE status = 'pendente'
              AND data_vencimento < $1
              -- Recorrente que ainda não gerou a sucessora continua pendente,
              -- senão sai da fila do gerador
              AND NOT (
                  recorrente
                  AND COALESCE(data_proxima_geracao <= $1, FALSE)
                  AND NOT EXISTS (
                      SELECT 1
                      FROM contas_pagar filha
                      WHERE filha.conta_origem_id = contas_pagar.id
                        AND filha.data_vencimento > contas_pagar.data_vencimento
                  )
              )
            "#,
        )
            .bind(hoje)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  CONTAS A RECEBER
    // =========================================================================

    pub async fn create_conta_receber<'e, E>(
        &self,
        executor: E,
        nova: &NovaContaReceber,
    ) -> Result<ContaReceber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = insert_conta_receber_sql("");
        let conta = bind_conta_receber(sqlx::query_as::<_, ContaReceber>(&sql), nova)
            .fetch_one(executor)
            .await?;

        Ok(conta)
    }

    pub async fn list_contas_receber<'e, E>(
        &self,
        executor: E,
        filtro: &FiltroContas<StatusContaReceber>,
    ) -> Result<Vec<ContaReceber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {}
            FROM contas_receber
            WHERE ($1::status_conta_receber IS NULL OR status = $1)
              AND ($2::date IS NULL OR data_vencimento >= $2)
              AND ($3::date IS NULL OR data_vencimento <= $3)
            ORDER BY data_vencimento ASC, created_at ASC
            "#,
            CONTA_RECEBER_COLUMNS
        );
        let contas = sqlx::query_as::<_, ContaReceber>(&sql)
            .bind(filtro.status)
            .bind(filtro.de)
            .bind(filtro.ate)
            .fetch_all(executor)
            .await?;

        Ok(contas)
    }

    pub async fn get_conta_receber<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<ContaReceber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {} FROM contas_receber WHERE id = $1", CONTA_RECEBER_COLUMNS);
        let conta = sqlx::query_as::<_, ContaReceber>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(conta)
    }

    pub async fn update_status_conta_receber<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: StatusContaReceber,
        data_recebimento: Option<NaiveDate>,
    ) -> Result<Option<ContaReceber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE contas_receber
            SET status = $2, data_recebimento = $3, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            CONTA_RECEBER_COLUMNS
        );
        let conta = sqlx::query_as::<_, ContaReceber>(&sql)
            .bind(id)
            .bind(status)
            .bind(data_recebimento)
            .fetch_optional(executor)
            .await?;

        Ok(conta)
    }

    pub async fn delete_conta_receber<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM contas_receber WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn marcar_vencidas_receber<'e, E>(&self, executor: E, hoje: NaiveDate) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE contas_receber
            SET status = 'vencido', updated_at = now()
            WHERE status = 'pendente' AND data_vencimento < $1
            "#,
        )
            .bind(hoje)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

type QueryAs<'q, T> = sqlx::query::QueryAs<'q, Postgres, T, sqlx::postgres::PgArguments>;

fn bind_conta_pagar<'q>(query: QueryAs<'q, ContaPagar>, nova: &'q NovaContaPagar) -> QueryAs<'q, ContaPagar> {
    query
        .bind(&nova.descricao)
        .bind(nova.valor)
        .bind(nova.categoria_id)
        .bind(nova.fornecedor_nome.as_deref())
        .bind(nova.fornecedor_documento.as_deref())
        .bind(nova.fornecedor_telefone.as_deref())
        .bind(nova.forma_pagamento)
        .bind(nova.observacoes.as_deref())
        .bind(nova.data_vencimento)
        .bind(nova.status)
        .bind(nova.recorrente)
        .bind(nova.frequencia_recorrencia.map(|f| f.as_str()))
        .bind(nova.data_proxima_geracao)
        .bind(nova.conta_origem_id)
        .bind(nova.criado_por)
}

fn bind_conta_receber<'q>(
    query: QueryAs<'q, ContaReceber>,
    nova: &'q NovaContaReceber,
) -> QueryAs<'q, ContaReceber> {
    query
        .bind(&nova.descricao)
        .bind(nova.valor)
        .bind(nova.categoria_id)
        .bind(nova.idoso_id)
        .bind(nova.pagador_nome.as_deref())
        .bind(nova.pagador_documento.as_deref())
        .bind(nova.forma_pagamento)
        .bind(nova.observacoes.as_deref())
        .bind(nova.data_vencimento)
        .bind(nova.status)
        .bind(nova.recorrente)
        .bind(nova.frequencia_recorrencia.map(|f| f.as_str()))
        .bind(nova.conta_origem_id)
        .bind(nova.criado_por)
}

// =========================================================================
//  GERAÇÃO RECORRENTE
// =========================================================================
// Roda fora de uma requisição (endpoint de geração ou CLI), então cada
// chamada abre a própria transação no contexto de rotina do sistema.
//
// Uma conta que já tem sucessora (filha com vencimento posterior) deixou
// de ser candidata: a cadeia segue pela filha.

#[async_trait]
impl RecurrenceStore for FinanceRepository {
    async fn contas_pagar_para_gerar(&self, hoje: NaiveDate) -> Result<Vec<ContaPagar>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM contas_pagar
            WHERE recorrente
              AND status = 'pendente'
              AND data_proxima_geracao <= $1
              AND NOT EXISTS (
                  SELECT 1
                  FROM contas_pagar filha
                  WHERE filha.conta_origem_id = contas_pagar.id
                    AND filha.data_vencimento > contas_pagar.data_vencimento
              )
            ORDER BY data_proxima_geracao ASC, created_at ASC
            "#,
            CONTA_PAGAR_COLUMNS
        );

        let mut tx = transacao_do_sistema(&self.pool).await?;
        let contas = sqlx::query_as::<_, ContaPagar>(&sql)
            .bind(hoje)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(contas)
    }

    async fn contas_receber_para_gerar(&self, hoje: NaiveDate) -> Result<Vec<ContaReceber>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM contas_receber
            WHERE recorrente
              AND status <> 'cancelado'
              AND data_vencimento <= $1
              AND NOT EXISTS (
                  SELECT 1
                  FROM contas_receber filha
                  WHERE filha.conta_origem_id = contas_receber.id
                    AND filha.data_vencimento > contas_receber.data_vencimento
              )
            ORDER BY data_vencimento ASC, created_at ASC
            "#,
            CONTA_RECEBER_COLUMNS
        );

        let mut tx = transacao_do_sistema(&self.pool).await?;
        let contas = sqlx::query_as::<_, ContaReceber>(&sql)
            .bind(hoje)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(contas)
    }

    async fn existe_geracao(&self, tipo: TipoConta, chave: &ChaveRecorrencia) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE conta_origem_id = $1 AND data_vencimento = $2)",
            tipo.tabela()
        );

        let mut tx = transacao_do_sistema(&self.pool).await?;
        let existe = sqlx::query_scalar::<_, bool>(&sql)
            .bind(chave.origem_id)
            .bind(chave.vencimento)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(existe)
    }

    async fn inserir_conta_pagar_gerada(
        &self,
        nova: &NovaContaPagar,
        proxima_geracao_origem: NaiveDate,
    ) -> Result<Option<ContaPagar>, AppError> {
        let origem_id = nova.conta_origem_id.ok_or_else(|| {
            AppError::BadRequest("Conta gerada sem conta de origem.".to_string())
        })?;

        // Inserção e avanço do ponteiro da origem são atômicos: se a
        // inserção falhar, a origem continua apontando para o mesmo período.
        let mut tx = transacao_do_sistema(&self.pool).await?;

        let sql = insert_conta_pagar_sql(ON_CONFLICT_GERACAO);
        let inserida = bind_conta_pagar(sqlx::query_as::<_, ContaPagar>(&sql), nova)
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE contas_pagar SET data_proxima_geracao = $2, updated_at = now() WHERE id = $1",
        )
            .bind(origem_id)
            .bind(proxima_geracao_origem)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(inserida)
    }

    async fn inserir_conta_receber_gerada(
        &self,
        nova: &NovaContaReceber,
    ) -> Result<Option<ContaReceber>, AppError> {
        let sql = insert_conta_receber_sql(ON_CONFLICT_GERACAO);

        let mut tx = transacao_do_sistema(&self.pool).await?;
        let inserida = bind_conta_receber(sqlx::query_as::<_, ContaReceber>(&sql), nova)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(inserida)
    }

    async fn avancar_proxima_geracao(&self, conta_id: Uuid, proxima: NaiveDate) -> Result<(), AppError> {
        let mut tx = transacao_do_sistema(&self.pool).await?;
        sqlx::query(
            "UPDATE contas_pagar SET data_proxima_geracao = $2, updated_at = now() WHERE id = $1",
        )
            .bind(conta_id)
            .bind(proxima)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}
