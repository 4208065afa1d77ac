//! # Treinamento Supervisionado do HMM
//!
//! O treino tem duas fases:
//!
//! 1. **Contagem**: para cada par alinhado `(tokens, tags)`, conta quantas vezes
//!    cada tag emitiu cada token e quantas vezes cada tag seguiu outra. Toda
//!    sentença começa no estado sintético [`START_TAG`].
//! 2. **Normalização**: cada linha de contagens vira uma distribuição em
//!    log-space, $\ln(count / total)$.
//!
//! ```text
//! tokens: the  dog  barks .
//! tags:   DET  N    V     .
//!
//! transições: # → DET, DET → N, N → V, V → .
//! emissões:   DET → the, N → dog, V → barks, . → .
//! ```
//!
//! Cada chamada de treino parte do zero: não há fusão incremental com um
//! modelo anterior.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corpus::TrainingPair;
use crate::error::TrainWarning;
use crate::hmm::{HmmModel, START_TAG};
use crate::table::{normalize, CountTable, LogTable};

/// Resumo de uma chamada de treino.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Pares efetivamente contados.
    pub pairs_used: usize,
    /// Pares ignorados (ver `warnings`).
    pub pairs_skipped: usize,
    /// Tags distintas no modelo final (sem contar [`START_TAG`]).
    pub tags: usize,
    /// Tokens distintos no modelo final.
    pub vocabulary: usize,
    pub warnings: Vec<TrainWarning>,
}

/// Modelo treinado mais o relatório do treino.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: HmmModel,
    pub report: TrainReport,
}

/// Acumulador de contagens de um treino.
#[derive(Debug, Clone)]
pub struct Trainer {
    emissions: CountTable,
    transitions: CountTable,
    report: TrainReport,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Trainer {
    /// Trainer vazio, já com a linha de transições do estado inicial.
    pub fn new() -> Self {
        let mut transitions = CountTable::new();
        transitions.ensure_row(START_TAG);
        Self {
            emissions: CountTable::new(),
            transitions,
            report: TrainReport::default(),
        }
    }

    /// Conta um par. Retorna `false` (e registra um aviso) se o par foi ignorado.
    ///
    /// `index` identifica o par nos avisos.
    pub fn add_pair(&mut self, index: usize, pair: &TrainingPair) -> bool {
        if pair.tokens.len() != pair.tags.len() {
            let warning = TrainWarning::LengthMismatch {
                index,
                tokens: pair.tokens.len(),
                tags: pair.tags.len(),
            };
            warn!("{warning}");
            self.skip(warning);
            return false;
        }
        if pair.tags.iter().any(|tag| tag == START_TAG) {
            let warning = TrainWarning::ReservedTag { index };
            warn!("{warning}");
            self.skip(warning);
            return false;
        }

        let mut prev = START_TAG;
        for (token, tag) in pair.tokens.iter().zip(&pair.tags) {
            self.emissions.increment(tag, token);
            self.transitions.increment(prev, tag);
            prev = tag.as_str();
        }
        self.report.pairs_used += 1;
        true
    }

    fn skip(&mut self, warning: TrainWarning) {
        self.report.pairs_skipped += 1;
        self.report.warnings.push(warning);
    }

    /// Normaliza as contagens e produz o modelo final.
    pub fn finish(self) -> TrainOutcome {
        let Trainer {
            emissions,
            transitions,
            mut report,
        } = self;

        let (model, warnings) = normalize_tables(emissions, transitions);
        report.warnings.extend(warnings);
        report.tags = model.tags().len();
        report.vocabulary = model.vocabulary_size();

        info!(
            "training finished: {} pairs used, {} skipped, {} tags, {} tokens",
            report.pairs_used, report.pairs_skipped, report.tags, report.vocabulary
        );
        TrainOutcome { model, report }
    }
}

/// Treina um modelo novo a partir dos pares fornecidos.
pub fn train(pairs: &[TrainingPair]) -> TrainOutcome {
    let mut trainer = Trainer::new();
    for (index, pair) in pairs.iter().enumerate() {
        trainer.add_pair(index, pair);
    }
    trainer.finish()
}

/// Converte as duas tabelas de contagem em log-probabilidades.
///
/// Percorre cada chave externa da tabela de transições (o universo de tags que
/// transitam, incluindo [`START_TAG`]) normalizando a linha de transições e,
/// exceto para o estado inicial, a linha de emissões. Tags que só aparecem no
/// fim das sentenças emitem mas não transitam; suas emissões também são
/// normalizadas.
pub(crate) fn normalize_tables(
    mut emissions: CountTable,
    transitions: CountTable,
) -> (HmmModel, Vec<TrainWarning>) {
    let mut emission_table = LogTable::new();
    let mut transition_table = LogTable::new();
    let mut warnings = Vec::new();

    for (tag, row) in transitions.into_rows() {
        if tag != START_TAG {
            match normalize(&tag, emissions.take_row(&tag)) {
                Ok(probs) => {
                    emission_table.insert(tag.clone(), probs);
                }
                Err(err) => {
                    warn!("skipping emissions for `{tag}`: {err}");
                    warnings.push(TrainWarning::MissingEmissions { tag: tag.clone() });
                }
            }
        }
        transition_table.insert(tag, row.into_log_probs());
    }

    for (tag, row) in emissions.into_rows() {
        if tag == START_TAG {
            continue;
        }
        debug!("tag `{tag}` emits but never transitions");
        emission_table.insert(tag, row.into_log_probs());
    }

    (HmmModel::from_tables(emission_table, transition_table), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::demo_pairs;

    fn pair(sentence: &str, tags: &str) -> TrainingPair {
        TrainingPair::from_lines(sentence, tags)
    }

    fn assert_tables_close(a: &LogTable, b: &LogTable) {
        assert_eq!(a.len(), b.len());
        for (outer, row) in a {
            let other = &b[outer];
            assert_eq!(row.len(), other.len(), "row `{outer}`");
            for (inner, p) in row {
                assert!((p - other[inner]).abs() < 1e-12, "{outer} -> {inner}");
            }
        }
    }

    #[test]
    fn test_counts_become_log_probabilities() {
        let pairs = vec![
            pair("the dog barks .", "DET N V ."),
            pair("the cat sleeps .", "DET N V ."),
            pair("a dog runs .", "DET N V ."),
        ];
        let outcome = train(&pairs);
        let model = &outcome.model;

        // # → DET sempre
        assert_eq!(model.transitions_from(START_TAG).unwrap()["DET"], 0.0);
        // DET emite "the" 2 de 3 vezes
        assert!((model.emission_score("DET", "the") - (2.0f64 / 3.0).ln()).abs() < 1e-12);
        assert!((model.emission_score("N", "dog") - (2.0f64 / 3.0).ln()).abs() < 1e-12);

        assert_eq!(outcome.report.pairs_used, 3);
        assert_eq!(outcome.report.tags, 4);
        assert!(outcome.report.warnings.is_empty());
    }

    #[test]
    fn test_every_row_sums_to_one() {
        let outcome = train(&demo_pairs());
        let model = &outcome.model;
        for table in [model.emissions(), model.transitions()] {
            for (tag, row) in table {
                let sum: f64 = row.values().map(|p| p.exp()).sum();
                assert!((sum - 1.0).abs() < 1e-9, "row `{tag}` sums to {sum}");
            }
        }
    }

    #[test]
    fn test_final_only_tag_keeps_normalized_emissions() {
        // "." só aparece no fim: emite, mas não transita
        let outcome = train(&[pair("dogs bark .", "N V ."), pair("cats sleep !", "N V .")]);
        let model = &outcome.model;

        assert!(model.transitions_from(".").is_none());
        assert!((model.emission_score(".", ".") - 0.5f64.ln()).abs() < 1e-12);
        assert!((model.emission_score(".", "!") - 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_skipped() {
        let pairs = vec![
            pair("the dog barks .", "DET N V ."),
            pair("the cat", "DET N V"),
        ];
        let outcome = train(&pairs);

        assert_eq!(outcome.report.pairs_used, 1);
        assert_eq!(outcome.report.pairs_skipped, 1);
        assert_eq!(
            outcome.report.warnings,
            vec![TrainWarning::LengthMismatch { index: 1, tokens: 2, tags: 3 }]
        );
        // Nada do par inválido entrou nas tabelas
        assert_eq!(outcome.model.emission_score("N", "cat"), crate::hmm::UNSEEN_EMISSION_SCORE);
        assert_eq!(outcome.model.emission_score("N", "dog"), 0.0);
    }

    #[test]
    fn test_reserved_start_tag_is_rejected() {
        let outcome = train(&[pair("hash tag", "# N"), pair("a dog", "DET N")]);
        assert_eq!(outcome.report.pairs_used, 1);
        assert_eq!(outcome.report.warnings, vec![TrainWarning::ReservedTag { index: 0 }]);
        assert!(!outcome.model.emissions().contains_key(START_TAG));
    }

    #[test]
    fn test_missing_emissions_is_reported() {
        // Tag que transita mas nunca emite (só possível com contagens manuais)
        let emissions: CountTable = [("N", &[("dog", 1u64)][..])].into_iter().collect();
        let transitions: CountTable = [
            ("#", &[("X", 1u64)][..]),
            ("X", &[("N", 1u64)][..]),
        ]
        .into_iter()
        .collect();

        let (model, warnings) = normalize_tables(emissions, transitions);
        assert_eq!(warnings, vec![TrainWarning::MissingEmissions { tag: "X".to_string() }]);
        assert!(model.emissions().get("X").is_none());
        assert!(model.transitions_from("X").is_some());
    }

    #[test]
    fn test_retraining_is_idempotent() {
        let pairs = demo_pairs();
        let first = train(&pairs).model;
        let second = train(&pairs).model;
        assert_tables_close(first.emissions(), second.emissions());
        assert_tables_close(first.transitions(), second.transitions());
    }

    #[test]
    fn test_no_pairs_gives_empty_model() {
        let outcome = train(&[]);
        assert!(outcome.model.is_empty());
        // O estado inicial existe, mas sem transições
        assert!(outcome.model.transitions_from(START_TAG).unwrap().is_empty());
    }
}
