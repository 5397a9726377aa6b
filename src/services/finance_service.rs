// src/services/finance_service.rs

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        format::{formatar_cpf, formatar_moeda},
    },
    db::FinanceRepository,
    models::finance::{
        AtualizarStatusPagarPayload, AtualizarStatusReceberPayload, CategoriaFinanceira, ContaPagar,
        ContaReceber, CreateContaPagarPayload, CreateContaReceberPayload, FiltroContas, NovaContaPagar,
        NovaContaReceber, ResultadoVencidas, StatusContaPagar, StatusContaReceber, TipoConta,
    },
};

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
}

/// Monta a conta a pagar a partir do payload, já com as regras de recorrência.
pub fn nova_conta_pagar(
    payload: CreateContaPagarPayload,
    criado_por: Uuid,
) -> Result<NovaContaPagar, AppError> {
    let (frequencia, proxima_geracao) = match (payload.recorrente, payload.frequencia_recorrencia) {
        (true, None) => {
            return Err(AppError::BadRequest(
                "Informe a frequência de uma conta recorrente.".to_string(),
            ));
        }
        (true, Some(freq)) => (
            Some(freq),
            Some(payload.data_proxima_geracao.unwrap_or(payload.data_vencimento)),
        ),
        (false, _) => (None, None),
    };

    Ok(NovaContaPagar {
        descricao: payload.descricao.trim().to_string(),
        valor: payload.valor,
        categoria_id: payload.categoria_id,
        fornecedor_nome: payload.fornecedor_nome,
        fornecedor_documento: payload.fornecedor_documento,
        fornecedor_telefone: payload.fornecedor_telefone,
        forma_pagamento: payload.forma_pagamento,
        observacoes: payload.observacoes,
        data_vencimento: payload.data_vencimento,
        status: StatusContaPagar::Pendente,
        recorrente: payload.recorrente,
        frequencia_recorrencia: frequencia,
        data_proxima_geracao: proxima_geracao,
        conta_origem_id: None,
        criado_por: Some(criado_por),
    })
}

pub fn nova_conta_receber(
    payload: CreateContaReceberPayload,
    criado_por: Uuid,
) -> Result<NovaContaReceber, AppError> {
    if payload.recorrente && payload.frequencia_recorrencia.is_none() {
        return Err(AppError::BadRequest(
            "Informe a frequência de uma conta recorrente.".to_string(),
        ));
    }

    Ok(NovaContaReceber {
        descricao: payload.descricao.trim().to_string(),
        valor: payload.valor,
        categoria_id: payload.categoria_id,
        idoso_id: payload.idoso_id,
        pagador_nome: payload.pagador_nome,
        // CPF do pagador fica sempre com máscara; CNPJ é gravado como veio
        pagador_documento: payload.pagador_documento.map(|d| formatar_cpf(&d).unwrap_or(d)),
        forma_pagamento: payload.forma_pagamento,
        observacoes: payload.observacoes,
        data_vencimento: payload.data_vencimento,
        status: StatusContaReceber::Pendente,
        recorrente: payload.recorrente,
        frequencia_recorrencia: payload.frequencia_recorrencia.filter(|_| payload.recorrente),
        conta_origem_id: None,
        criado_por: Some(criado_por),
    })
}

impl FinanceService {
    pub fn new(repo: FinanceRepository) -> Self {
        Self { repo }
    }

    // --- CATEGORIAS ---

    pub async fn create_categoria<'e, E>(
        &self,
        executor: E,
        nome: &str,
        tipo: TipoConta,
    ) -> Result<CategoriaFinanceira, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_categoria(executor, nome.trim(), tipo).await
    }

    pub async fn list_categorias<'e, E>(
        &self,
        executor: E,
        tipo: Option<TipoConta>,
    ) -> Result<Vec<CategoriaFinanceira>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_categorias(executor, tipo).await
    }

    // --- CONTAS A PAGAR ---

    pub async fn create_conta_pagar<'e, E>(
        &self,
        executor: E,
        payload: CreateContaPagarPayload,
        criado_por: Uuid,
    ) -> Result<ContaPagar, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let nova = nova_conta_pagar(payload, criado_por)?;
        let conta = self.repo.create_conta_pagar(executor, &nova).await?;

        tracing::info!(
            conta_id = %conta.id,
            valor = %formatar_moeda(conta.valor),
            recorrente = conta.recorrente,
            "💸 Conta a pagar cadastrada"
        );
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
        self.repo.list_contas_pagar(executor, filtro).await
    }

    pub async fn get_conta_pagar<'e, E>(&self, executor: E, id: Uuid) -> Result<ContaPagar, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .get_conta_pagar(executor, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conta a pagar".to_string()))
    }

    pub async fn update_status_conta_pagar<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: AtualizarStatusPagarPayload,
    ) -> Result<ContaPagar, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Só conta paga carrega data de pagamento
        let data_pagamento = match payload.status {
            StatusContaPagar::Pago => Some(payload.data_pagamento.unwrap_or_else(hoje)),
            _ => None,
        };

        self.repo
            .update_status_conta_pagar(executor, id, payload.status, data_pagamento)
            .await?
            .ok_or_else(|| AppError::NotFound("Conta a pagar".to_string()))
    }

    pub async fn delete_conta_pagar<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        match self.repo.delete_conta_pagar(executor, id).await? {
            0 => Err(AppError::NotFound("Conta a pagar".to_string())),
            _ => Ok(()),
        }
    }

    // --- CONTAS A RECEBER ---

    pub async fn create_conta_receber<'e, E>(
        &self,
        executor: E,
        payload: CreateContaReceberPayload,
        criado_por: Uuid,
    ) -> Result<ContaReceber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let nova = nova_conta_receber(payload, criado_por)?;
        let conta = self.repo.create_conta_receber(executor, &nova).await?;

        tracing::info!(
            conta_id = %conta.id,
            valor = %formatar_moeda(conta.valor),
            recorrente = conta.recorrente,
            "💰 Conta a receber cadastrada"
        );
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
        self.repo.list_contas_receber(executor, filtro).await
    }

    pub async fn get_conta_receber<'e, E>(&self, executor: E, id: Uuid) -> Result<ContaReceber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .get_conta_receber(executor, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conta a receber".to_string()))
    }

    pub async fn update_status_conta_receber<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: AtualizarStatusReceberPayload,
    ) -> Result<ContaReceber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data_recebimento = match payload.status {
            StatusContaReceber::Recebido => Some(payload.data_recebimento.unwrap_or_else(hoje)),
            _ => None,
        };

        self.repo
            .update_status_conta_receber(executor, id, payload.status, data_recebimento)
            .await?
            .ok_or_else(|| AppError::NotFound("Conta a receber".to_string()))
    }

    pub async fn delete_conta_receber<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        match self.repo.delete_conta_receber(executor, id).await? {
            0 => Err(AppError::NotFound("Conta a receber".to_string())),
            _ => Ok(()),
        }
    }

    // --- VENCIMENTOS ---

    /// Marca como vencidas as contas pendentes com vencimento anterior a `hoje`.
    pub async fn marcar_vencidas<'e, E>(
        &self,
        executor: E,
        data_referencia: NaiveDate,
    ) -> Result<ResultadoVencidas, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let contas_pagar = self.repo.marcar_vencidas_pagar(&mut *tx, data_referencia).await?;
        let contas_receber = self.repo.marcar_vencidas_receber(&mut *tx, data_referencia).await?;

        tx.commit().await?;

        if contas_pagar + contas_receber > 0 {
            tracing::info!(contas_pagar, contas_receber, "⏰ Contas marcadas como vencidas");
        }

        Ok(ResultadoVencidas { contas_pagar, contas_receber })
    }
}

fn hoje() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
