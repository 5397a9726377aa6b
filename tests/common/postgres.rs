//! Banco Postgres isolado por teste.
//!
//! Só roda com `TEST_DATABASE_URL` definida; sem ela os testes retornam
//! cedo. Cada teste ganha um schema próprio com as migrações aplicadas.
//! Quando o papel da URL é SUPERUSER ou BYPASSRLS, a pool da aplicação
//! troca para `crevin_app_teste`, que está sujeito às políticas de RLS.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDate;
use crevin_backend::{
    common::{db_utils::transacao_do_sistema, error::AppError},
    db::{FinanceRepository, UserRepository},
    models::{
        auth::{PapelUsuario, User},
        finance::{
            ContaPagar, ContaReceber, FormaPagamento, Frequencia, NovaContaPagar, NovaContaReceber,
            StatusContaPagar, StatusContaReceber,
        },
    },
};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

const PAPEL_APLICACAO: &str = "crevin_app_teste";

static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_crevin_{}_{}", std::process::id(), counter)
}

pub struct BancoTeste {
    /// Pool da aplicação (papel sem bypass de RLS).
    pub pool: PgPool,
    pub repo: FinanceRepository,
    admin: PgPool,
    schema: String,
}

impl BancoTeste {
    pub async fn novo() -> Option<Self> {
        Self::com_conexoes(5).await
    }

    pub async fn com_conexoes(max_connections: u32) -> Option<Self> {
        let Ok(base_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL não definida; teste com Postgres ignorado");
            return None;
        };
        let schema = unique_schema_name();

        let admin = PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .expect("Falha ao conectar no banco de teste");

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
            .execute(&admin)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema))
            .execute(&admin)
            .await
            .expect("Falha ao criar o schema de teste");

        let separator = if base_url.contains('?') { "&" } else { "?" };
        let url_schema = format!("{}{}options=-c search_path%3D{}%2Cpublic", base_url, separator, schema);

        let migracao = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url_schema)
            .await
            .expect("Falha ao conectar no schema de teste");
        sqlx::migrate!("./migrations")
            .run(&migracao)
            .await
            .expect("Falha ao aplicar as migrações");

        let ignora_rls: bool = sqlx::query_scalar(
            "SELECT rolsuper OR rolbypassrls FROM pg_roles WHERE rolname = current_user",
        )
            .fetch_one(&migracao)
            .await
            .expect("Falha ao consultar o papel atual");

        if ignora_rls {
            preparar_papel_aplicacao(&migracao, &schema).await;
        }
        migracao.close().await;

        let mut opcoes = PgPoolOptions::new().max_connections(max_connections);
        if ignora_rls {
            opcoes = opcoes.after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute(format!("SET ROLE {}", PAPEL_APLICACAO).as_str()).await?;
                    Ok(())
                })
            });
        }
        let pool = opcoes
            .connect(&url_schema)
            .await
            .expect("Falha ao criar a pool da aplicação");

        Some(Self {
            repo: FinanceRepository::new(pool.clone()),
            pool,
            admin,
            schema,
        })
    }

    pub async fn usuario(&self, email: &str) -> User {
        UserRepository::new(self.pool.clone())
            .create_user(&self.pool, email, "Tesouraria", PapelUsuario::Financeiro, "hash")
            .await
            .expect("Falha ao criar usuário")
    }

    pub async fn inserir_pagar(&self, nova: &NovaContaPagar) -> ContaPagar {
        let mut tx = transacao_do_sistema(&self.pool).await.unwrap();
        let conta = self.repo.create_conta_pagar(&mut *tx, nova).await.unwrap();
        tx.commit().await.unwrap();
        conta
    }

    pub async fn inserir_receber(&self, nova: &NovaContaReceber) -> ContaReceber {
        let mut tx = transacao_do_sistema(&self.pool).await.unwrap();
        let conta = self.repo.create_conta_receber(&mut *tx, nova).await.unwrap();
        tx.commit().await.unwrap();
        conta
    }

    pub async fn pagar(&self, id: Uuid) -> ContaPagar {
        let mut tx = transacao_do_sistema(&self.pool).await.unwrap();
        let conta = self.repo.get_conta_pagar(&mut *tx, id).await.unwrap();
        tx.commit().await.unwrap();
        conta.expect("conta a pagar não encontrada")
    }

    /// Quantas linhas a tabela tem, vistas pelo contexto de sistema.
    pub async fn contar_filhas(&self, tabela: &str, origem_id: Uuid) -> i64 {
        let mut tx = transacao_do_sistema(&self.pool).await.unwrap();
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE conta_origem_id = $1",
            tabela
        ))
            .bind(origem_id)
            .fetch_one(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        total
    }

    pub async fn encerrar(self) {
        self.pool.close().await;
        let _ = sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.admin)
            .await;
        self.admin.close().await;
    }
}

async fn preparar_papel_aplicacao(pool: &PgPool, schema: &str) {
    pool.execute(
        format!(
            r#"
            DO $$
            BEGIN
                CREATE ROLE {papel} NOLOGIN NOSUPERUSER NOBYPASSRLS;
            EXCEPTION
                WHEN duplicate_object OR unique_violation THEN NULL;
            END
            $$;
            GRANT USAGE ON SCHEMA {schema} TO {papel};
            GRANT ALL ON ALL TABLES IN SCHEMA {schema} TO {papel};
            GRANT ALL ON ALL SEQUENCES IN SCHEMA {schema} TO {papel};
            GRANT EXECUTE ON ALL FUNCTIONS IN SCHEMA {schema} TO {papel};
            "#,
            papel = PAPEL_APLICACAO,
            schema = schema,
        )
        .as_str(),
    )
        .await
        .expect("Falha ao preparar o papel da aplicação");
}

pub fn nova_pagar(descricao: &str, vencimento: NaiveDate, frequencia: Option<Frequencia>) -> NovaContaPagar {
    NovaContaPagar {
        descricao: descricao.to_string(),
        valor: Decimal::new(150000, 2),
        categoria_id: None,
        fornecedor_nome: Some("Distribuidora Vale Verde".to_string()),
        fornecedor_documento: Some("11.222.333/0001-81".to_string()),
        fornecedor_telefone: None,
        forma_pagamento: Some(FormaPagamento::Boleto),
        observacoes: None,
        data_vencimento: vencimento,
        status: StatusContaPagar::Pendente,
        recorrente: frequencia.is_some(),
        frequencia_recorrencia: frequencia,
        data_proxima_geracao: frequencia.map(|_| vencimento),
        conta_origem_id: None,
        criado_por: None,
    }
}

pub fn nova_receber(descricao: &str, vencimento: NaiveDate, frequencia: Option<Frequencia>) -> NovaContaReceber {
    NovaContaReceber {
        descricao: descricao.to_string(),
        valor: Decimal::new(320000, 2),
        categoria_id: None,
        idoso_id: Some(Uuid::new_v4()),
        pagador_nome: Some("Maria Aparecida".to_string()),
        pagador_documento: Some("529.982.247-25".to_string()),
        forma_pagamento: Some(FormaPagamento::Pix),
        observacoes: None,
        data_vencimento: vencimento,
        status: StatusContaReceber::Pendente,
        recorrente: frequencia.is_some(),
        frequencia_recorrencia: frequencia,
        conta_origem_id: None,
        criado_por: None,
    }
}

/// Erro de banco esperado (violação de constraint ou de política).
pub fn e_erro_de_banco(resultado: &Result<impl Sized, AppError>) -> bool {
    matches!(resultado, Err(AppError::DatabaseError(_)))
}
