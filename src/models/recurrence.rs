// src/models/recurrence.rs

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Chave de idempotência de uma geração: a conta de origem mais o
/// vencimento que está sendo gerado.
///
/// O banco garante unicidade de `(conta_origem_id, data_vencimento)` nas
/// duas tabelas, então duas execuções concorrentes não duplicam contas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChaveRecorrencia {
    pub origem_id: Uuid,
    pub vencimento: NaiveDate,
}

impl ChaveRecorrencia {
    pub fn new(origem_id: Uuid, vencimento: NaiveDate) -> Self {
        Self { origem_id, vencimento }
    }
}

impl fmt::Display for ChaveRecorrencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origem_id, self.vencimento.format("%Y-%m-%d"))
    }
}

/// Resultado de uma execução do gerador.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumoGeracao {
    /// Contas novas efetivamente inseridas.
    pub geradas: u32,
    /// Candidatas cuja próxima conta já existia.
    pub ignoradas: u32,
    /// Candidatas que falharam (erro registrado no log).
    pub falhas: u32,
}

impl ResumoGeracao {
    pub fn somar(self, outro: ResumoGeracao) -> ResumoGeracao {
        ResumoGeracao {
            geradas: self.geradas + outro.geradas,
            ignoradas: self.ignoradas + outro.ignoradas,
            falhas: self.falhas + outro.falhas,
        }
    }

    /// Mensagem única para o usuário; `None` quando nada foi gerado.
    pub fn mensagem(&self) -> Option<String> {
        match self.geradas {
            0 => None,
            1 => Some("1 conta recorrente gerada com sucesso.".to_string()),
            n => Some(format!("{} contas recorrentes geradas com sucesso.", n)),
        }
    }
}

/// Corpo da resposta HTTP do gerador.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumoGeracaoResponse {
    #[serde(flatten)]
    pub resumo: ResumoGeracao,
    pub mensagem: Option<String>,
}

impl From<ResumoGeracao> for ResumoGeracaoResponse {
    fn from(resumo: ResumoGeracao) -> Self {
        Self { mensagem: resumo.mensagem(), resumo }
    }
}
