//! # Hidden Markov Model (HMM) para Etiquetagem Morfossintática
//!
//! Modelo clássico onde:
//! - **Estados Ocultos**: Tags (N, V, DET, CNJ, ...)
//! - **Observações**: Tokens (palavras e pontuação, em minúsculas)
//!
//! O modelo guarda:
//! 1. Probabilidade de Transição: $\ln P(tag_i | tag_{i-1})$, incluindo o estado
//!    inicial sintético [`START_TAG`].
//! 2. Probabilidade de Emissão: $\ln P(palavra | tag)$.
//!
//! As probabilidades ficam em **log-space**: o Viterbi soma scores em vez de
//! multiplicar probabilidades, evitando underflow em sentenças longas.
//! $$ \log(A \cdot B) = \log(A) + \log(B) $$
//!
//! Não há suavização: um token nunca visto para uma tag recebe o score fixo
//! [`UNSEEN_EMISSION_SCORE`], e uma transição nunca vista simplesmente não existe.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, TrainWarning};
use crate::table::{CountTable, LogRow, LogTable};
use crate::trainer::normalize_tables;

/// Tag sintética do estado inicial. Só aparece como chave externa da tabela de
/// transições: nunca emite tokens e nunca é destino de uma transição.
pub const START_TAG: &str = "#";

/// Score de emissão para um token que a tag nunca emitiu no treino.
///
/// Log-probabilidade finita e muito baixa. O valor é mantido exatamente para
/// reproduzir as saídas do etiquetador original.
pub const UNSEEN_EMISSION_SCORE: f64 = -15.625;

/// Modelo HMM treinado: tabelas de emissão e transição em log-space.
///
/// O modelo é um valor comum, sem estado global: é criado pelo
/// [`crate::trainer::Trainer`] (ou por [`HmmModel::from_counts`]), fica somente
/// leitura e é passado por referência ao decodificador.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HmmModel {
    /// `tag → token → ln P(token | tag)`.
    emissions: LogTable,
    /// `tag → próxima tag → ln P(próxima | tag)`. Inclui [`START_TAG`].
    transitions: LogTable,
}

impl HmmModel {
    /// Modelo vazio (não treinado).
    pub fn new() -> Self {
        Self::default()
    }

    /// Monta o modelo a partir de tabelas já normalizadas.
    pub fn from_tables(emissions: LogTable, transitions: LogTable) -> Self {
        Self { emissions, transitions }
    }

    /// Normaliza contagens brutas e monta o modelo, exatamente como o
    /// treinamento faz ao final da contagem.
    ///
    /// Útil para "treinar" manualmente a partir de tabelas de contagem conhecidas.
    pub fn from_counts(emissions: CountTable, transitions: CountTable) -> (Self, Vec<TrainWarning>) {
        normalize_tables(emissions, transitions)
    }

    pub fn emissions(&self) -> &LogTable {
        &self.emissions
    }

    pub fn transitions(&self) -> &LogTable {
        &self.transitions
    }

    /// Transições observadas a partir de `tag`, se houver.
    pub fn transitions_from(&self, tag: &str) -> Option<&LogRow> {
        self.transitions.get(tag)
    }

    /// $\ln P(token | tag)$, ou [`UNSEEN_EMISSION_SCORE`] se a tag nunca emitiu o token
    /// (ou não emite nada).
    pub fn emission_score(&self, tag: &str, token: &str) -> f64 {
        self.emissions
            .get(tag)
            .and_then(|row| row.get(token))
            .copied()
            .unwrap_or(UNSEEN_EMISSION_SCORE)
    }

    /// Um modelo sem emissões ou sem transições não serve para decodificar.
    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty() || self.transitions.is_empty()
    }

    /// Todas as tags conhecidas (exceto [`START_TAG`]), em ordem.
    pub fn tags(&self) -> BTreeSet<&str> {
        self.emissions
            .keys()
            .chain(self.transitions.keys())
            .chain(self.transitions.values().flat_map(|row| row.keys()))
            .map(String::as_str)
            .filter(|tag| *tag != START_TAG)
            .collect()
    }

    /// Número de tokens distintos emitidos por alguma tag.
    pub fn vocabulary_size(&self) -> usize {
        self.emissions
            .values()
            .flat_map(|row| row.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Salva o modelo como JSON.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Carrega um modelo salvo com [`HmmModel::save`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
