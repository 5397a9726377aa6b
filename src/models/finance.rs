// src/models/finance.rs

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::format::validar_documento;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tipo_conta", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TipoConta {
    Pagar,   // Contas a Pagar
    Receber, // Contas a Receber
}

impl TipoConta {
    pub fn tabela(&self) -> &'static str {
        match self {
            TipoConta::Pagar => "contas_pagar",
            TipoConta::Receber => "contas_receber",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_conta_pagar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StatusContaPagar {
    Pendente,
    Pago,
    Vencido,
    Cancelado,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_conta_receber", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StatusContaReceber {
    Pendente,
    Recebido,
    Vencido,
    Cancelado,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "forma_pagamento", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FormaPagamento {
    Dinheiro,
    Pix,
    Boleto,
    CartaoCredito,
    CartaoDebito,
    Transferencia,
    Cheque,
    DebitoAutomatico,
}

/// Periodicidade de uma conta recorrente.
///
/// No banco a frequência fica em texto livre; qualquer valor que não seja
/// reconhecido é lido como [`Frequencia::Mensal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequencia {
    Semanal,
    #[default]
    Mensal,
    Bimestral,
    Trimestral,
    Semestral,
    Anual,
}

impl Frequencia {
    pub const TODAS: [Frequencia; 6] = [
        Frequencia::Semanal,
        Frequencia::Mensal,
        Frequencia::Bimestral,
        Frequencia::Trimestral,
        Frequencia::Semestral,
        Frequencia::Anual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequencia::Semanal => "semanal",
            Frequencia::Mensal => "mensal",
            Frequencia::Bimestral => "bimestral",
            Frequencia::Trimestral => "trimestral",
            Frequencia::Semestral => "semestral",
            Frequencia::Anual => "anual",
        }
    }

    pub fn from_str_lossy(valor: &str) -> Self {
        match valor.trim().to_lowercase().as_str() {
            "semanal" => Frequencia::Semanal,
            "bimestral" => Frequencia::Bimestral,
            "trimestral" => Frequencia::Trimestral,
            "semestral" => Frequencia::Semestral,
            "anual" => Frequencia::Anual,
            _ => Frequencia::Mensal,
        }
    }

    /// Avança `data` exatamente um período.
    ///
    /// Períodos em meses usam o calendário e limitam o dia ao último dia do
    /// mês de destino: 31/01/2025 + mensal = 28/02/2025. `None` quando o
    /// resultado passa do maior dia representável.
    pub fn avancar(&self, data: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequencia::Semanal => data.checked_add_days(Days::new(7)),
            Frequencia::Mensal => data.checked_add_months(Months::new(1)),
            Frequencia::Bimestral => data.checked_add_months(Months::new(2)),
            Frequencia::Trimestral => data.checked_add_months(Months::new(3)),
            Frequencia::Semestral => data.checked_add_months(Months::new(6)),
            Frequencia::Anual => data.checked_add_months(Months::new(12)),
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoriaFinanceira {
    pub id: Uuid,
    pub nome: String,
    pub tipo: TipoConta,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContaPagar {
    pub id: Uuid,
    pub descricao: String,
    pub valor: Decimal,
    pub categoria_id: Option<Uuid>,

    // Fornecedor
    pub fornecedor_nome: Option<String>,
    pub fornecedor_documento: Option<String>,
    pub fornecedor_telefone: Option<String>,

    pub forma_pagamento: Option<FormaPagamento>,
    pub observacoes: Option<String>,

    pub data_vencimento: NaiveDate,
    pub data_pagamento: Option<NaiveDate>,
    pub status: StatusContaPagar,

    // Recorrência
    pub recorrente: bool,
    pub frequencia_recorrencia: Option<String>,
    pub data_proxima_geracao: Option<NaiveDate>,
    pub conta_origem_id: Option<Uuid>,

    pub criado_por: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContaPagar {
    pub fn frequencia(&self) -> Frequencia {
        self.frequencia_recorrencia
            .as_deref()
            .map(Frequencia::from_str_lossy)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContaReceber {
    pub id: Uuid,
    pub descricao: String,
    pub valor: Decimal,
    pub categoria_id: Option<Uuid>,

    // Pagador (normalmente o idoso ou seu responsável)
    pub idoso_id: Option<Uuid>,
    pub pagador_nome: Option<String>,
    pub pagador_documento: Option<String>,

    pub forma_pagamento: Option<FormaPagamento>,
    pub observacoes: Option<String>,

    pub data_vencimento: NaiveDate,
    pub data_recebimento: Option<NaiveDate>,
    pub status: StatusContaReceber,

    // Recorrência
    pub recorrente: bool,
    pub frequencia_recorrencia: Option<String>,
    pub conta_origem_id: Option<Uuid>,

    pub criado_por: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContaReceber {
    pub fn frequencia(&self) -> Frequencia {
        self.frequencia_recorrencia
            .as_deref()
            .map(Frequencia::from_str_lossy)
            .unwrap_or_default()
    }
}

/// Dados de inserção de uma conta a pagar (manual ou gerada).
#[derive(Debug, Clone, PartialEq)]
pub struct NovaContaPagar {
    pub descricao: String,
    pub valor: Decimal,
    pub categoria_id: Option<Uuid>,
    pub fornecedor_nome: Option<String>,
    pub fornecedor_documento: Option<String>,
    pub fornecedor_telefone: Option<String>,
    pub forma_pagamento: Option<FormaPagamento>,
    pub observacoes: Option<String>,
    pub data_vencimento: NaiveDate,
    pub status: StatusContaPagar,
    pub recorrente: bool,
    pub frequencia_recorrencia: Option<Frequencia>,
    pub data_proxima_geracao: Option<NaiveDate>,
    pub conta_origem_id: Option<Uuid>,
    pub criado_por: Option<Uuid>,
}

/// Dados de inserção de uma conta a receber (manual ou gerada).
#[derive(Debug, Clone, PartialEq)]
pub struct NovaContaReceber {
    pub descricao: String,
    pub valor: Decimal,
    pub categoria_id: Option<Uuid>,
    pub idoso_id: Option<Uuid>,
    pub pagador_nome: Option<String>,
    pub pagador_documento: Option<String>,
    pub forma_pagamento: Option<FormaPagamento>,
    pub observacoes: Option<String>,
    pub data_vencimento: NaiveDate,
    pub status: StatusContaReceber,
    pub recorrente: bool,
    pub frequencia_recorrencia: Option<Frequencia>,
    pub conta_origem_id: Option<Uuid>,
    pub criado_por: Option<Uuid>,
}

// --- Payloads ---

fn validar_valor_positivo(valor: &Decimal) -> Result<(), ValidationError> {
    if valor.is_sign_positive() && !valor.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("valor_positivo")
            .with_message("O valor deve ser maior que zero.".into()))
    }
}

fn validar_documento_campo(documento: &str) -> Result<(), ValidationError> {
    if validar_documento(documento) {
        Ok(())
    } else {
        Err(ValidationError::new("documento")
            .with_message("CPF ou CNPJ inválido.".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoriaPayload {
    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório."))]
    pub nome: String,
    pub tipo: TipoConta,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContaPagarPayload {
    #[validate(length(min = 1, max = 255, message = "A descrição é obrigatória."))]
    pub descricao: String,

    #[validate(custom(function = "validar_valor_positivo"))]
    pub valor: Decimal,

    pub categoria_id: Option<Uuid>,

    #[validate(length(max = 255))]
    pub fornecedor_nome: Option<String>,

    #[validate(custom(function = "validar_documento_campo"))]
    pub fornecedor_documento: Option<String>,

    #[validate(length(max = 20))]
    pub fornecedor_telefone: Option<String>,

    pub forma_pagamento: Option<FormaPagamento>,
    pub observacoes: Option<String>,
    pub data_vencimento: NaiveDate,

    #[serde(default)]
    pub recorrente: bool,
    pub frequencia_recorrencia: Option<Frequencia>,
    pub data_proxima_geracao: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContaReceberPayload {
    #[validate(length(min = 1, max = 255, message = "A descrição é obrigatória."))]
    pub descricao: String,

    #[validate(custom(function = "validar_valor_positivo"))]
    pub valor: Decimal,

    pub categoria_id: Option<Uuid>,
    pub idoso_id: Option<Uuid>,

    #[validate(length(max = 255))]
    pub pagador_nome: Option<String>,

    #[validate(custom(function = "validar_documento_campo"))]
    pub pagador_documento: Option<String>,

    pub forma_pagamento: Option<FormaPagamento>,
    pub observacoes: Option<String>,
    pub data_vencimento: NaiveDate,

    #[serde(default)]
    pub recorrente: bool,
    pub frequencia_recorrencia: Option<Frequencia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtualizarStatusPagarPayload {
    pub status: StatusContaPagar,
    pub data_pagamento: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtualizarStatusReceberPayload {
    pub status: StatusContaReceber,
    pub data_recebimento: Option<NaiveDate>,
}

/// Filtros de listagem (`?status=pendente&de=2025-01-01&ate=2025-01-31`).
#[derive(Debug, Clone, Deserialize)]
pub struct FiltroContas<S> {
    pub status: Option<S>,
    pub de: Option<NaiveDate>,
    pub ate: Option<NaiveDate>,
}

impl<S> Default for FiltroContas<S> {
    fn default() -> Self {
        Self { status: None, de: None, ate: None }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultadoVencidas {
    pub contas_pagar: u64,
    pub contas_receber: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn data(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn frequencia_desconhecida_vira_mensal() {
        assert_eq!(Frequencia::from_str_lossy("quinzenal"), Frequencia::Mensal);
        assert_eq!(Frequencia::from_str_lossy(""), Frequencia::Mensal);
        assert_eq!(Frequencia::from_str_lossy(" Anual "), Frequencia::Anual);
    }

    #[test]
    fn frequencia_ida_e_volta_em_texto() {
        for freq in Frequencia::TODAS {
            assert_eq!(Frequencia::from_str_lossy(freq.as_str()), freq);
        }
    }

    #[test]
    fn avancar_cada_frequencia() {
        let base = data(2025, 3, 15);
        assert_eq!(Frequencia::Semanal.avancar(base), Some(data(2025, 3, 22)));
        assert_eq!(Frequencia::Mensal.avancar(base), Some(data(2025, 4, 15)));
        assert_eq!(Frequencia::Bimestral.avancar(base), Some(data(2025, 5, 15)));
        assert_eq!(Frequencia::Trimestral.avancar(base), Some(data(2025, 6, 15)));
        assert_eq!(Frequencia::Semestral.avancar(base), Some(data(2025, 9, 15)));
        assert_eq!(Frequencia::Anual.avancar(base), Some(data(2026, 3, 15)));
    }

    #[test]
    fn fim_de_mes_e_limitado_ao_ultimo_dia() {
        assert_eq!(Frequencia::Mensal.avancar(data(2025, 1, 31)), Some(data(2025, 2, 28)));
        assert_eq!(Frequencia::Mensal.avancar(data(2024, 1, 31)), Some(data(2024, 2, 29)));
        assert_eq!(Frequencia::Trimestral.avancar(data(2025, 11, 30)), Some(data(2026, 2, 28)));
        assert_eq!(Frequencia::Anual.avancar(data(2024, 2, 29)), Some(data(2025, 2, 28)));
    }

    #[test]
    fn fim_do_calendario_nao_avanca() {
        for freq in Frequencia::TODAS {
            assert_eq!(freq.avancar(NaiveDate::MAX), None, "{:?}", freq);
        }
        let ultimo_mes = NaiveDate::MAX.with_day(1).unwrap();
        assert_eq!(Frequencia::Semanal.avancar(ultimo_mes), Some(ultimo_mes + Days::new(7)));
        assert_eq!(Frequencia::Mensal.avancar(ultimo_mes), None);
    }

    #[test]
    fn conta_sem_frequencia_usa_mensal() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "descricao": "Energia",
            "valor": 100.0,
            "categoriaId": null,
            "idosoId": null,
            "pagadorNome": null,
            "pagadorDocumento": null,
            "formaPagamento": "pix",
            "observacoes": null,
            "dataVencimento": "2025-01-10",
            "dataRecebimento": null,
            "status": "pendente",
            "recorrente": true,
            "frequenciaRecorrencia": "xpto",
            "contaOrigemId": null,
            "criadoPor": null,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        });
        let conta: ContaReceber = serde_json::from_value(json).unwrap();
        assert_eq!(conta.frequencia(), Frequencia::Mensal);
    }

    #[test]
    fn payload_rejeita_valor_zero_e_documento_invalido() {
        let payload = CreateContaPagarPayload {
            descricao: "Aluguel".into(),
            valor: Decimal::ZERO,
            categoria_id: None,
            fornecedor_nome: None,
            fornecedor_documento: Some("111.111.111-11".into()),
            fornecedor_telefone: None,
            forma_pagamento: None,
            observacoes: None,
            data_vencimento: data(2025, 1, 10),
            recorrente: false,
            frequencia_recorrencia: None,
            data_proxima_geracao: None,
        };
        let erros = payload.validate().unwrap_err();
        let campos = erros.field_errors();
        assert!(campos.contains_key("valor"));
        assert!(campos.contains_key("fornecedor_documento"));
    }
}
