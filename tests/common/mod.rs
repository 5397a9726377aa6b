//! Armazenamento em memória para os testes do gerador de recorrências.
//!
//! Reproduz as consultas e a chave única do Postgres e permite injetar
//! falhas de inserção por conta de origem.

#![allow(dead_code)]

pub mod postgres;

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use crevin_backend::{
    common::error::AppError,
    models::{
        finance::{
            ContaPagar, ContaReceber, FormaPagamento, Frequencia, NovaContaPagar, NovaContaReceber,
            StatusContaPagar, StatusContaReceber, TipoConta,
        },
        recurrence::ChaveRecorrencia,
    },
    services::recurrence::RecurrenceStore,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn data(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Default)]
pub struct MemoryStore {
    pub contas_pagar: Mutex<Vec<ContaPagar>>,
    pub contas_receber: Mutex<Vec<ContaReceber>>,
    /// Origens cuja inserção gerada deve falhar.
    pub falhar_origens: Mutex<HashSet<Uuid>>,
    pub inseridas: Mutex<u32>,
    /// Faz a seleção de candidatas falhar (banco fora do ar).
    pub falhar_selecao: AtomicBool,
    /// Filhas gravadas logo após a seleção, como faria outra execução em paralelo.
    pub pagar_concorrentes: Mutex<Vec<ContaPagar>>,
    pub receber_concorrentes: Mutex<Vec<ContaReceber>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pagar(&self, conta: ContaPagar) {
        self.contas_pagar.lock().unwrap().push(conta);
    }

    pub fn add_receber(&self, conta: ContaReceber) {
        self.contas_receber.lock().unwrap().push(conta);
    }

    pub fn falhar_insercao_de(&self, origem_id: Uuid) {
        self.falhar_origens.lock().unwrap().insert(origem_id);
    }

    /// Grava `filha` depois da seleção de candidatas da próxima execução.
    pub fn pagar_gerada_em_paralelo(&self, filha: ContaPagar) {
        self.pagar_concorrentes.lock().unwrap().push(filha);
    }

    pub fn receber_gerada_em_paralelo(&self, filha: ContaReceber) {
        self.receber_concorrentes.lock().unwrap().push(filha);
    }

    pub fn derrubar_banco(&self) {
        self.falhar_selecao.store(true, Ordering::SeqCst);
    }

    pub fn pagar(&self, id: Uuid) -> ContaPagar {
        self.contas_pagar
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .expect("conta a pagar não encontrada")
    }

    pub fn pagar_geradas_de(&self, origem_id: Uuid) -> Vec<ContaPagar> {
        self.contas_pagar
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.conta_origem_id == Some(origem_id))
            .cloned()
            .collect()
    }

    pub fn receber_geradas_de(&self, origem_id: Uuid) -> Vec<ContaReceber> {
        self.contas_receber
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.conta_origem_id == Some(origem_id))
            .cloned()
            .collect()
    }

    pub fn total_inseridas(&self) -> u32 {
        *self.inseridas.lock().unwrap()
    }

    fn deve_falhar(&self, origem_id: Option<Uuid>) -> bool {
        origem_id.is_some_and(|id| self.falhar_origens.lock().unwrap().contains(&id))
    }
}

#[async_trait]
impl RecurrenceStore for MemoryStore {
    async fn contas_pagar_para_gerar(&self, hoje: NaiveDate) -> Result<Vec<ContaPagar>, AppError> {
        if self.falhar_selecao.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let mut contas = self.contas_pagar.lock().unwrap();
        let candidatas: Vec<_> = contas
            .iter()
            .filter(|c| {
                c.recorrente
                    && c.status == StatusContaPagar::Pendente
                    && c.data_proxima_geracao.is_some_and(|d| d <= hoje)
                    && !tem_sucessora(contas.iter().map(|f| (f.conta_origem_id, f.data_vencimento)), c.id, c.data_vencimento)
            })
            .cloned()
            .collect();

        contas.append(&mut self.pagar_concorrentes.lock().unwrap());
        Ok(candidatas)
    }

    async fn contas_receber_para_gerar(&self, hoje: NaiveDate) -> Result<Vec<ContaReceber>, AppError> {
        if self.falhar_selecao.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let mut contas = self.contas_receber.lock().unwrap();
        let candidatas: Vec<_> = contas
            .iter()
            .filter(|c| {
                c.recorrente
                    && c.status != StatusContaReceber::Cancelado
                    && c.data_vencimento <= hoje
                    && !tem_sucessora(contas.iter().map(|f| (f.conta_origem_id, f.data_vencimento)), c.id, c.data_vencimento)
            })
            .cloned()
            .collect();

        contas.append(&mut self.receber_concorrentes.lock().unwrap());
        Ok(candidatas)
    }

    async fn existe_geracao(&self, tipo: TipoConta, chave: &ChaveRecorrencia) -> Result<bool, AppError> {
        let existe = match tipo {
            TipoConta::Pagar => self.contas_pagar.lock().unwrap().iter().any(|c| {
                c.conta_origem_id == Some(chave.origem_id) && c.data_vencimento == chave.vencimento
            }),
            TipoConta::Receber => self.contas_receber.lock().unwrap().iter().any(|c| {
                c.conta_origem_id == Some(chave.origem_id) && c.data_vencimento == chave.vencimento
            }),
        };
        Ok(existe)
    }

    async fn inserir_conta_pagar_gerada(
        &self,
        nova: &NovaContaPagar,
        proxima_geracao_origem: NaiveDate,
    ) -> Result<Option<ContaPagar>, AppError> {
        if self.deve_falhar(nova.conta_origem_id) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("falha injetada")));
        }

        let mut contas = self.contas_pagar.lock().unwrap();
        let duplicada = contas.iter().any(|c| {
            c.conta_origem_id == nova.conta_origem_id && c.data_vencimento == nova.data_vencimento
        });

        let inserida = if duplicada {
            None
        } else {
            let conta = pagar_de_nova(nova);
            contas.push(conta.clone());
            *self.inseridas.lock().unwrap() += 1;
            Some(conta)
        };

        if let Some(origem) = contas.iter_mut().find(|c| Some(c.id) == nova.conta_origem_id) {
            origem.data_proxima_geracao = Some(proxima_geracao_origem);
        }

        Ok(inserida)
    }

    async fn inserir_conta_receber_gerada(
        &self,
        nova: &NovaContaReceber,
    ) -> Result<Option<ContaReceber>, AppError> {
        if self.deve_falhar(nova.conta_origem_id) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("falha injetada")));
        }

        let mut contas = self.contas_receber.lock().unwrap();
        if contas.iter().any(|c| {
            c.conta_origem_id == nova.conta_origem_id && c.data_vencimento == nova.data_vencimento
        }) {
            return Ok(None);
        }

        let conta = receber_de_nova(nova);
        contas.push(conta.clone());
        *self.inseridas.lock().unwrap() += 1;
        Ok(Some(conta))
    }

    async fn avancar_proxima_geracao(&self, conta_id: Uuid, proxima: NaiveDate) -> Result<(), AppError> {
        if let Some(conta) = self.contas_pagar.lock().unwrap().iter_mut().find(|c| c.id == conta_id) {
            conta.data_proxima_geracao = Some(proxima);
        }
        Ok(())
    }
}

/// Alguma conta gerada a partir de `origem_id` vence depois da origem.
fn tem_sucessora(
    mut contas: impl Iterator<Item = (Option<Uuid>, NaiveDate)>,
    origem_id: Uuid,
    vencimento_origem: NaiveDate,
) -> bool {
    contas.any(|(origem, vencimento)| origem == Some(origem_id) && vencimento > vencimento_origem)
}

fn pagar_de_nova(nova: &NovaContaPagar) -> ContaPagar {
    let agora = Utc::now();
    ContaPagar {
        id: Uuid::new_v4(),
        descricao: nova.descricao.clone(),
        valor: nova.valor,
        categoria_id: nova.categoria_id,
        fornecedor_nome: nova.fornecedor_nome.clone(),
        fornecedor_documento: nova.fornecedor_documento.clone(),
        fornecedor_telefone: nova.fornecedor_telefone.clone(),
        forma_pagamento: nova.forma_pagamento,
        observacoes: nova.observacoes.clone(),
        data_vencimento: nova.data_vencimento,
        data_pagamento: None,
        status: nova.status,
        recorrente: nova.recorrente,
        frequencia_recorrencia: nova.frequencia_recorrencia.map(|f| f.as_str().to_string()),
        data_proxima_geracao: nova.data_proxima_geracao,
        conta_origem_id: nova.conta_origem_id,
        criado_por: nova.criado_por,
        created_at: agora,
        updated_at: agora,
    }
}

fn receber_de_nova(nova: &NovaContaReceber) -> ContaReceber {
    let agora = Utc::now();
    ContaReceber {
        id: Uuid::new_v4(),
        descricao: nova.descricao.clone(),
        valor: nova.valor,
        categoria_id: nova.categoria_id,
        idoso_id: nova.idoso_id,
        pagador_nome: nova.pagador_nome.clone(),
        pagador_documento: nova.pagador_documento.clone(),
        forma_pagamento: nova.forma_pagamento,
        observacoes: nova.observacoes.clone(),
        data_vencimento: nova.data_vencimento,
        data_recebimento: None,
        status: nova.status,
        recorrente: nova.recorrente,
        frequencia_recorrencia: nova.frequencia_recorrencia.map(|f| f.as_str().to_string()),
        conta_origem_id: nova.conta_origem_id,
        criado_por: nova.criado_por,
        created_at: agora,
        updated_at: agora,
    }
}

/// Conta a pagar recorrente pendente, gerando em `data_proxima_geracao`.
pub fn conta_pagar(descricao: &str, vencimento: NaiveDate, frequencia: Frequencia) -> ContaPagar {
    let agora = Utc::now();
    ContaPagar {
        id: Uuid::new_v4(),
        descricao: descricao.to_string(),
        valor: Decimal::new(150000, 2),
        categoria_id: Some(Uuid::new_v4()),
        fornecedor_nome: Some("Distribuidora Vale Verde".to_string()),
        fornecedor_documento: Some("11.222.333/0001-81".to_string()),
        fornecedor_telefone: None,
        forma_pagamento: Some(FormaPagamento::Boleto),
        observacoes: None,
        data_vencimento: vencimento,
        data_pagamento: None,
        status: StatusContaPagar::Pendente,
        recorrente: true,
        frequencia_recorrencia: Some(frequencia.as_str().to_string()),
        data_proxima_geracao: Some(vencimento),
        conta_origem_id: None,
        criado_por: Some(Uuid::new_v4()),
        created_at: agora,
        updated_at: agora,
    }
}

/// Mensalidade recorrente de um idoso.
pub fn conta_receber(descricao: &str, vencimento: NaiveDate, frequencia: Frequencia) -> ContaReceber {
    let agora = Utc::now();
    ContaReceber {
        id: Uuid::new_v4(),
        descricao: descricao.to_string(),
        valor: Decimal::new(320000, 2),
        categoria_id: Some(Uuid::new_v4()),
        idoso_id: Some(Uuid::new_v4()),
        pagador_nome: Some("Maria Aparecida".to_string()),
        pagador_documento: Some("529.982.247-25".to_string()),
        forma_pagamento: Some(FormaPagamento::Pix),
        observacoes: Some("Mensalidade".to_string()),
        data_vencimento: vencimento,
        data_recebimento: None,
        status: StatusContaReceber::Pendente,
        recorrente: true,
        frequencia_recorrencia: Some(frequencia.as_str().to_string()),
        conta_origem_id: None,
        criado_por: Some(Uuid::new_v4()),
        created_at: agora,
        updated_at: agora,
    }
}
