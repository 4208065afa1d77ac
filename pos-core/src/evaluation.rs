//! # Avaliação de Acurácia
//!
//! Compara as tags calculadas pelo etiquetador com as tags de referência,
//! posição a posição, e acumula os acertos por tag e por sentença.

use std::fmt::Display;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingPair;
use crate::tagger::PosTagger;

/// Acertos e erros de uma sentença.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAccuracy {
    pub right: usize,
    pub wrong: usize,
}

/// Compara duas sequências de tags posição a posição.
///
/// Se os tamanhos diferirem, as posições excedentes da mais longa contam como erro.
pub fn compare<A: AsRef<str>, B: AsRef<str>>(computed: &[A], reference: &[B]) -> TagAccuracy {
    let right = computed
        .iter()
        .zip(reference)
        .filter(|&(c, r)| c.as_ref() == r.as_ref())
        .count();
    TagAccuracy {
        right,
        wrong: computed.len().max(reference.len()) - right,
    }
}

/// Totais acumulados de uma avaliação.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Tags corretas.
    pub tags_right: usize,
    /// Tags incorretas.
    pub tags_wrong: usize,
    /// Sentenças sem nenhum erro.
    pub sentences_right: usize,
    /// Sentenças com ao menos um erro.
    pub sentences_wrong: usize,
    /// Sentenças que não puderam ser decodificadas (contam como erradas).
    pub failures: usize,
}

impl Evaluation {
    /// Acumula uma sentença etiquetada.
    pub fn accumulate<A: AsRef<str>, B: AsRef<str>>(&mut self, computed: &[A], reference: &[B]) {
        let accuracy = compare(computed, reference);
        self.tags_right += accuracy.right;
        self.tags_wrong += accuracy.wrong;
        if accuracy.wrong == 0 {
            self.sentences_right += 1;
        } else {
            self.sentences_wrong += 1;
        }
    }

    /// Uma sentença que o etiquetador não conseguiu decodificar: todas as suas
    /// tags contam como erradas.
    pub fn record_failure(&mut self, reference_len: usize) {
        self.failures += 1;
        self.tags_wrong += reference_len;
        self.sentences_wrong += 1;
    }

    pub fn total_tags(&self) -> usize {
        self.tags_right + self.tags_wrong
    }

    pub fn total_sentences(&self) -> usize {
        self.sentences_right + self.sentences_wrong
    }

    /// Fração de tags corretas (0 se não houve nenhuma tag).
    pub fn tag_accuracy(&self) -> f64 {
        match self.total_tags() {
            0 => 0.0,
            n => self.tags_right as f64 / n as f64,
        }
    }

    pub fn sentence_accuracy(&self) -> f64 {
        match self.total_sentences() {
            0 => 0.0,
            n => self.sentences_right as f64 / n as f64,
        }
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Out of {} lines, {} were tagged correctly and {} incorrectly ({} undecodable).",
            self.total_sentences(),
            self.sentences_right,
            self.sentences_wrong,
            self.failures
        )?;
        writeln!(
            f,
            "Out of {} tags, {} were correct and {} were incorrect.",
            self.total_tags(),
            self.tags_right,
            self.tags_wrong
        )?;
        write!(
            f,
            "Tag accuracy: {:.4}, sentence accuracy: {:.4}",
            self.tag_accuracy(),
            self.sentence_accuracy()
        )
    }
}

/// Etiqueta cada par de teste e compara com as tags de referência.
///
/// As sentenças são decodificadas em paralelo (o modelo é somente leitura) e
/// acumuladas na ordem original.
pub fn evaluate(tagger: &PosTagger, pairs: &[TrainingPair]) -> Evaluation {
    let results: Vec<_> = pairs
        .par_iter()
        .map(|pair| tagger.tag_tokens(&pair.tokens))
        .collect();

    let mut evaluation = Evaluation::default();
    for (pair, result) in pairs.iter().zip(results) {
        match result {
            Ok(decoded) => evaluation.accumulate(&decoded.tags, &pair.tags),
            Err(err) => {
                tracing::warn!("could not tag {:?}: {err}", pair.tokens);
                evaluation.record_failure(pair.tags.len());
            }
        }
    }
    evaluation
}
