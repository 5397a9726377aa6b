// src/common/format.rs
//
// Máscaras e validações no padrão brasileiro (moeda, data, CPF/CNPJ).

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// `1234.5` -> `R$ 1.234,50`
pub fn formatar_moeda(valor: Decimal) -> String {
    let arredondado = valor.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let texto = format!("{:.2}", arredondado.abs());
    let (inteiro, centavos) = texto.split_once('.').unwrap_or((texto.as_str(), "00"));

    let mut agrupado = String::with_capacity(inteiro.len() + inteiro.len() / 3);
    for (i, c) in inteiro.chars().enumerate() {
        if i > 0 && (inteiro.len() - i) % 3 == 0 {
            agrupado.push('.');
        }
        agrupado.push(c);
    }

    let sinal = if arredondado.is_sign_negative() && !arredondado.is_zero() { "-" } else { "" };
    format!("{}R$ {},{}", sinal, agrupado, centavos)
}

/// `2025-02-28` -> `28/02/2025`
pub fn formatar_data(data: NaiveDate) -> String {
    data.format("%d/%m/%Y").to_string()
}

fn digitos(texto: &str) -> Vec<u32> {
    texto.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn digito_verificador(numeros: &[u32], pesos: &[u32]) -> u32 {
    let soma: u32 = numeros.iter().zip(pesos).map(|(n, p)| n * p).sum();
    match soma % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

pub fn validar_cpf(cpf: &str) -> bool {
    let d = digitos(cpf);
    if d.len() != 11 || d.iter().all(|&x| x == d[0]) {
        return false;
    }

    let primeiro = digito_verificador(&d[..9], &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let segundo = digito_verificador(&d[..10], &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);
    d[9] == primeiro && d[10] == segundo
}

pub fn validar_cnpj(cnpj: &str) -> bool {
    let d = digitos(cnpj);
    if d.len() != 14 || d.iter().all(|&x| x == d[0]) {
        return false;
    }

    let primeiro = digito_verificador(&d[..12], &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let segundo = digito_verificador(&d[..13], &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    d[12] == primeiro && d[13] == segundo
}

/// Aceita CPF (11 dígitos) ou CNPJ (14 dígitos), com ou sem máscara.
pub fn validar_documento(documento: &str) -> bool {
    match digitos(documento).len() {
        11 => validar_cpf(documento),
        14 => validar_cnpj(documento),
        _ => false,
    }
}

/// `52998224725` -> `529.982.247-25`
pub fn formatar_cpf(cpf: &str) -> Option<String> {
    let d: String = cpf.chars().filter(|c| c.is_ascii_digit()).collect();
    if d.len() != 11 {
        return None;
    }
    Some(format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]))
}
