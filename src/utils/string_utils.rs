/// Utilitários para manipulação segura de strings UTF-8

use subtle::ConstantTimeEq;

/// Trunca uma string de forma segura, garantindo que o índice não corte no meio de um caractere UTF-8
///
/// Usado principalmente para logar prefixos de tokens e codes sem expor o valor inteiro.
///
/// # Exemplo
/// ```
/// use jira_ticket_middleware::utils::string_utils::truncate_safe;
///
/// let text = "Olá, mundo! 🌍";
/// assert_eq!(truncate_safe(text, 10), "Olá, mund");
/// ```
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;

    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Trunca uma string e adiciona um sufixo (como "...") de forma segura
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    let truncated = truncate_safe(s, max_bytes);
    if truncated.len() < s.len() {
        format!("{}{}", truncated, suffix)
    } else {
        truncated.to_string()
    }
}

/// Mantém no máximo `max_chars` caracteres (não bytes)
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Mantém no máximo `max_chars` caracteres, cortando no último espaço quando possível
///
/// Se não houver espaço dentro do limite (uma única palavra gigante), o corte é seco.
pub fn truncate_at_word_boundary(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    let hard = truncate_chars(s, max_chars);

    // Se o próximo caractere já é espaço, o corte caiu entre palavras
    let next_is_space = s.chars().nth(max_chars).map_or(false, char::is_whitespace);
    if next_is_space {
        return hard.trim_end().to_string();
    }

    match hard.rfind(char::is_whitespace) {
        Some(idx) if !hard[..idx].trim().is_empty() => hard[..idx].trim_end().to_string(),
        _ => hard,
    }
}

/// Colapsa quebras de linha, tabs e espaços repetidos em um espaço
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compara segredos (nonce, API key) sem vazar a posição da primeira diferença
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
