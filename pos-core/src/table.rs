//! # Tabelas de Contagem e de Log-Probabilidade
//!
//! Estrutura esparsa de dois níveis (`chave externa → chave interna → valor`)
//! usada tanto para **contagens** (durante o treino) quanto para
//! **log-probabilidades** (no modelo treinado).
//!
//! ```text
//! emissões:   tag  → token → ln P(token | tag)
//! transições: tag  → tag'  → ln P(tag' | tag)
//! ```
//!
//! ## Total por linha
//!
//! Cada linha de contagens carrega o seu total como um escalar ao lado do mapa
//! ([`CountRow::total`]), e não como uma chave reservada dentro do mapa. Assim
//! nenhum token ou tag real pode colidir com o total.
//!
//! Os mapas são `BTreeMap`: a iteração segue a ordem lexicográfica das chaves,
//! o que torna o desempate do Viterbi reprodutível.

use std::collections::BTreeMap;

use crate::error::TableError;

/// Distribuição normalizada de uma chave externa: `chave interna → ln(p)`.
pub type LogRow = BTreeMap<String, f64>;

/// Tabela de log-probabilidades: `chave externa → LogRow`.
pub type LogTable = BTreeMap<String, LogRow>;

/// Contagens brutas de uma chave externa, com o total acumulado à parte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountRow {
    counts: BTreeMap<String, u64>,
    total: u64,
}

impl CountRow {
    /// Soma `n` à contagem de `inner` (e ao total da linha).
    pub fn add(&mut self, inner: &str, n: u64) {
        *self.counts.entry(inner.to_string()).or_insert(0) += n;
        self.total += n;
    }

    /// Contagem de `inner` (0 se nunca visto).
    pub fn count(&self, inner: &str) -> u64 {
        self.counts.get(inner).copied().unwrap_or(0)
    }

    /// Soma de todas as contagens da linha.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Converte as contagens em log-probabilidades: `ln(count / total)`.
    ///
    /// O total é consumido aqui e não aparece na linha resultante.
    /// Uma linha vazia produz uma distribuição vazia.
    pub fn into_log_probs(self) -> LogRow {
        let total = self.total as f64;
        self.counts
            .into_iter()
            .map(|(key, count)| (key, (count as f64 / total).ln()))
            .collect()
    }
}

/// Normaliza a linha de `key`, se existir.
///
/// Linha ausente não é fatal: o chamador recebe [`TableError::MissingRow`],
/// registra um aviso e segue adiante.
pub fn normalize(key: &str, row: Option<CountRow>) -> Result<LogRow, TableError> {
    row.map(CountRow::into_log_probs)
        .ok_or_else(|| TableError::MissingRow { key: key.to_string() })
}

/// Acumulador de contagens `chave externa → CountRow`, usado apenas no treino.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    rows: BTreeMap<String, CountRow>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incrementa `outer → inner` em 1, criando a linha se necessário.
    pub fn increment(&mut self, outer: &str, inner: &str) {
        self.add(outer, inner, 1);
    }

    /// Soma `n` a `outer → inner`. Útil para montar tabelas a partir de
    /// contagens já conhecidas.
    pub fn add(&mut self, outer: &str, inner: &str, n: u64) {
        self.rows.entry(outer.to_string()).or_default().add(inner, n);
    }

    /// Garante que `outer` tenha uma linha (possivelmente vazia).
    pub fn ensure_row(&mut self, outer: &str) {
        self.rows.entry(outer.to_string()).or_default();
    }

    pub fn row(&self, outer: &str) -> Option<&CountRow> {
        self.rows.get(outer)
    }

    /// Remove e devolve a linha de `outer`.
    pub fn take_row(&mut self, outer: &str) -> Option<CountRow> {
        self.rows.remove(outer)
    }

    pub fn contains(&self, outer: &str) -> bool {
        self.rows.contains_key(outer)
    }

    /// Chaves externas em ordem lexicográfica.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> impl Iterator<Item = (String, CountRow)> {
        self.rows.into_iter()
    }
}

impl<'a> FromIterator<(&'a str, &'a [(&'a str, u64)])> for CountTable {
    /// Monta uma tabela a partir de contagens brutas por chave externa.
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a [(&'a str, u64)])>>(iter: I) -> Self {
        let mut table = CountTable::new();
        for (outer, inner) in iter {
            table.ensure_row(outer);
            for &(key, n) in inner {
                table.add(outer, key, n);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_tracks_total() {
        let mut table = CountTable::new();
        table.increment("N", "dog");
        table.increment("N", "dog");
        table.increment("N", "cat");

        let row = table.row("N").unwrap();
        assert_eq!(row.count("dog"), 2);
        assert_eq!(row.count("cat"), 1);
        assert_eq!(row.count("fish"), 0);
        assert_eq!(row.total(), 3);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_total_never_collides_with_real_keys() {
        // Um token chamado "countsTotal" é só mais um token
        let mut table = CountTable::new();
        table.increment("N", "countsTotal");
        table.increment("N", "dog");

        let probs = normalize("N", table.take_row("N")).unwrap();
        assert_eq!(probs.len(), 2);
        assert!((probs["countsTotal"] - 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_sums_to_one() {
        let mut table = CountTable::new();
        for (token, n) in [("cat", 4), ("dog", 4), ("watch", 2)] {
            table.add("N", token, n);
        }
        let row = table.take_row("N").unwrap();
        let total = row.total() as f64;
        let raw = row.clone();
        let probs = row.into_log_probs();

        let sum: f64 = probs.values().map(|p| p.exp()).sum();
        assert!((sum - 1.0).abs() < 1e-9);

        // exp(logp) * total recupera as contagens originais
        for (token, count) in raw.iter() {
            assert!((probs[token].exp() * total - count as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalize_missing_row() {
        let err = normalize("X", None).unwrap_err();
        assert_eq!(err, TableError::MissingRow { key: "X".to_string() });
    }

    #[test]
    fn test_empty_row_normalizes_to_empty() {
        let mut table = CountTable::new();
        table.ensure_row("#");
        let probs = normalize("#", table.take_row("#")).unwrap();
        assert!(probs.is_empty());
    }

    #[test]
    fn test_from_iter_raw_counts() {
        let table: CountTable = [("#", &[("NP", 3u64), ("N", 7)][..])].into_iter().collect();
        assert_eq!(table.row("#").unwrap().total(), 10);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["#"]);
    }
}
