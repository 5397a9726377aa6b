// src/services/recurrence.rs
//
// Geração das contas recorrentes (a pagar e a receber).
//
// Para cada conta candidata: calcula o próximo vencimento, consulta a chave
// (origem, vencimento) e insere a cópia se ela ainda não existe. Erros de
// uma candidata ficam no log e não interrompem o lote.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        finance::{
            ContaPagar, ContaReceber, NovaContaPagar, NovaContaReceber, StatusContaPagar,
            StatusContaReceber, TipoConta,
        },
        recurrence::{ChaveRecorrencia, ResumoGeracao},
    },
};

/// Acesso ao armazenamento usado pelo gerador.
#[async_trait]
pub trait RecurrenceStore: Send + Sync {
    /// Recorrentes pendentes com `data_proxima_geracao <= hoje`.
    async fn contas_pagar_para_gerar(&self, hoje: NaiveDate) -> Result<Vec<ContaPagar>, AppError>;

    /// Recorrentes não canceladas com `data_vencimento <= hoje`.
    async fn contas_receber_para_gerar(&self, hoje: NaiveDate) -> Result<Vec<ContaReceber>, AppError>;

    async fn existe_geracao(&self, tipo: TipoConta, chave: &ChaveRecorrencia) -> Result<bool, AppError>;

    /// Insere a conta gerada e avança `data_proxima_geracao` da origem na
    /// mesma transação. `None` quando a chave já existia.
    async fn inserir_conta_pagar_gerada(
        &self,
        nova: &NovaContaPagar,
        proxima_geracao_origem: NaiveDate,
    ) -> Result<Option<ContaPagar>, AppError>;

    /// `None` quando a chave já existia.
    async fn inserir_conta_receber_gerada(
        &self,
        nova: &NovaContaReceber,
    ) -> Result<Option<ContaReceber>, AppError>;

    async fn avancar_proxima_geracao(&self, conta_id: Uuid, proxima: NaiveDate) -> Result<(), AppError>;
}

/// Copia uma conta a pagar recorrente para o vencimento `vencimento`.
pub fn clonar_conta_pagar(origem: &ContaPagar, vencimento: NaiveDate) -> NovaContaPagar {
    NovaContaPagar {
        descricao: origem.descricao.clone(),
        valor: origem.valor,
        categoria_id: origem.categoria_id,
        fornecedor_nome: origem.fornecedor_nome.clone(),
        fornecedor_documento: origem.fornecedor_documento.clone(),
        fornecedor_telefone: origem.fornecedor_telefone.clone(),
        forma_pagamento: origem.forma_pagamento,
        observacoes: origem.observacoes.clone(),
        data_vencimento: vencimento,
        status: StatusContaPagar::Pendente,
        recorrente: true,
        frequencia_recorrencia: Some(origem.frequencia()),
        // A nova conta gera a seguinte quando ela mesma vencer
        data_proxima_geracao: Some(vencimento),
        conta_origem_id: Some(origem.id),
        criado_por: origem.criado_por,
    }
}

/// Copia uma conta a receber recorrente para o vencimento `vencimento`.
pub fn clonar_conta_receber(origem: &ContaReceber, vencimento: NaiveDate) -> NovaContaReceber {
    NovaContaReceber {
        descricao: origem.descricao.clone(),
        valor: origem.valor,
        categoria_id: origem.categoria_id,
        idoso_id: origem.idoso_id,
        pagador_nome: origem.pagador_nome.clone(),
        pagador_documento: origem.pagador_documento.clone(),
        forma_pagamento: origem.forma_pagamento,
        observacoes: origem.observacoes.clone(),
        data_vencimento: vencimento,
        status: StatusContaReceber::Pendente,
        recorrente: true,
        frequencia_recorrencia: Some(origem.frequencia()),
        conta_origem_id: Some(origem.id),
        criado_por: origem.criado_por,
    }
}

#[derive(Clone)]
pub struct RecurrenceService {
    store: Arc<dyn RecurrenceStore>,
}

impl RecurrenceService {
    pub fn new(store: Arc<dyn RecurrenceStore>) -> Self {
        Self { store }
    }

    /// Gera contas a pagar e a receber vencidas até `hoje`.
    pub async fn executar(&self, hoje: NaiveDate) -> Result<ResumoGeracao, AppError> {
        let pagar = self.gerar_contas_pagar(hoje).await?;
        let receber = self.gerar_contas_receber(hoje).await?;
        let resumo = pagar.somar(receber);

        if let Some(mensagem) = resumo.mensagem() {
            tracing::info!(
                geradas = resumo.geradas,
                ignoradas = resumo.ignoradas,
                falhas = resumo.falhas,
                "🔁 {}",
                mensagem
            );
        }

        Ok(resumo)
    }

    pub async fn gerar_contas_pagar(&self, hoje: NaiveDate) -> Result<ResumoGeracao, AppError> {
        let candidatas = self.store.contas_pagar_para_gerar(hoje).await?;
        let mut resumo = ResumoGeracao::default();

        for origem in &candidatas {
            let frequencia = origem.frequencia();
            let ponteiro_atual = origem.data_proxima_geracao.unwrap_or(origem.data_vencimento);
            let (Some(vencimento), Some(proxima_geracao)) = (
                frequencia.avancar(origem.data_vencimento),
                frequencia.avancar(ponteiro_atual),
            ) else {
                tracing::error!(
                    conta_id = %origem.id,
                    vencimento = %origem.data_vencimento,
                    "Próximo vencimento fora do calendário; conta a pagar não gerada"
                );
                resumo.falhas += 1;
                continue;
            };
            let chave = ChaveRecorrencia::new(origem.id, vencimento);

            match self.store.existe_geracao(TipoConta::Pagar, &chave).await {
                Ok(true) => {
                    // Já gerada (ex.: execução anterior); só tira a origem da fila do período
                    if let Err(e) = self.store.avancar_proxima_geracao(origem.id, proxima_geracao).await {
                        tracing::error!(chave = %chave, "Falha ao avançar próxima geração: {}", e);
                        resumo.falhas += 1;
                    } else {
                        resumo.ignoradas += 1;
                    }
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(chave = %chave, "Falha ao verificar conta a pagar gerada: {}", e);
                    resumo.falhas += 1;
                    continue;
                }
            }

            let nova = clonar_conta_pagar(origem, vencimento);
            match self.store.inserir_conta_pagar_gerada(&nova, proxima_geracao).await {
                Ok(Some(conta)) => {
                    tracing::debug!(chave = %chave, conta_id = %conta.id, "Conta a pagar gerada");
                    resumo.geradas += 1;
                }
                Ok(None) => resumo.ignoradas += 1,
                Err(e) => {
                    tracing::error!(chave = %chave, "Falha ao gerar conta a pagar: {}", e);
                    resumo.falhas += 1;
                }
            }
        }

        Ok(resumo)
    }

    pub async fn gerar_contas_receber(&self, hoje: NaiveDate) -> Result<ResumoGeracao, AppError> {
        let candidatas = self.store.contas_receber_para_gerar(hoje).await?;
        let mut resumo = ResumoGeracao::default();

        for origem in &candidatas {
            let Some(vencimento) = origem.frequencia().avancar(origem.data_vencimento) else {
                tracing::error!(
                    conta_id = %origem.id,
                    vencimento = %origem.data_vencimento,
                    "Próximo vencimento fora do calendário; conta a receber não gerada"
                );
                resumo.falhas += 1;
                continue;
            };
            let chave = ChaveRecorrencia::new(origem.id, vencimento);

            match self.store.existe_geracao(TipoConta::Receber, &chave).await {
                Ok(true) => {
                    resumo.ignoradas += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(chave = %chave, "Falha ao verificar conta a receber gerada: {}", e);
                    resumo.falhas += 1;
                    continue;
                }
            }

            let nova = clonar_conta_receber(origem, vencimento);
            match self.store.inserir_conta_receber_gerada(&nova).await {
                Ok(Some(conta)) => {
                    tracing::debug!(chave = %chave, conta_id = %conta.id, "Conta a receber gerada");
                    resumo.geradas += 1;
                }
                Ok(None) => resumo.ignoradas += 1,
                Err(e) => {
                    tracing::error!(chave = %chave, "Falha ao gerar conta a receber: {}", e);
                    resumo.falhas += 1;
                }
            }
        }

        Ok(resumo)
    }
}
