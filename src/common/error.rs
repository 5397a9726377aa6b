use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Conflito: {0}")]
    Conflict(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de migração: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Erro já traduzido e pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

fn traduzir(locale: &Locale, pt: &str, en: &str) -> String {
    if locale.is_portuguese() { pt.to_string() } else { en.to_string() }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro na resposta do idioma pedido em `Accept-Language`.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status_code();
        let error = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                return ApiError {
                    status,
                    error: traduzir(locale, "Um ou mais campos são inválidos.", "One or more fields are invalid."),
                    details: Some(json!(details)),
                };
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::EmailAlreadyExists => traduzir(locale, "Este e-mail já está em uso.", "This e-mail is already in use."),
            AppError::InvalidCredentials => traduzir(locale, "E-mail ou senha inválidos.", "Invalid e-mail or password."),
            AppError::InvalidToken => traduzir(
                locale,
                "Token de autenticação inválido ou ausente.",
                "Missing or invalid authentication token.",
            ),
            AppError::UserNotFound => traduzir(locale, "Usuário não encontrado.", "User not found."),
            AppError::Forbidden => traduzir(
                locale,
                "Você não tem permissão para realizar esta ação.",
                "You are not allowed to perform this action.",
            ),
            AppError::NotFound(what) => match locale.is_portuguese() {
                true => format!("{} não encontrado(a).", what),
                false => format!("{} not found.", what),
            },
            AppError::Conflict(msg) => msg.clone(),

            // Todos os outros erros viram 500. O detalhe fica só no log.
            e => {
                tracing::error!("🔥 Erro Interno do Servidor: {}", e);
                traduzir(locale, "Ocorreu um erro inesperado.", "An unexpected error occurred.")
            }
        };

        ApiError { status, error, details: None }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
