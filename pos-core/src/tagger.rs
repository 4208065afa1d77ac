//! # Etiquetador POS
//!
//! Fachada sobre o modelo: guarda o [`HmmModel`] treinado (se houver), troca o
//! modelo inteiro a cada novo treino e decodifica sentenças.
//!
//! ```rust
//! use pos_core::{corpus::TrainingPair, PosTagger};
//!
//! let mut tagger = PosTagger::new();
//! tagger.train(&[
//!     TrainingPair::from_lines("The dog barks .", "DET N V ."),
//!     TrainingPair::from_lines("A cat sleeps .", "DET N V ."),
//! ]);
//!
//! let decoded = tagger.tag_sentence("The cat barks .").unwrap();
//! assert_eq!(decoded.tags, vec!["DET", "N", "V", "."]);
//! ```
//!
//! ## Concorrência
//!
//! O etiquetador é um valor comum: treinar exige `&mut self` e decodificar
//! apenas `&self`. Para compartilhar entre threads, envolva-o em um `RwLock`
//! (um escritor durante o treino, vários leitores na decodificação).

use crate::corpus::{normalize_sentence, TrainingPair};
use crate::error::TagError;
use crate::hmm::HmmModel;
use crate::trainer::{train, TrainReport};
use crate::viterbi::{viterbi_decode_with, Decoded, NoopObserver, ViterbiObserver};

/// Etiquetador HMM com ciclo de vida explícito: vazio → treinado → retreinado.
#[derive(Debug, Clone, Default)]
pub struct PosTagger {
    model: Option<HmmModel>,
}

impl PosTagger {
    /// Etiquetador ainda não treinado.
    pub fn new() -> Self {
        Self::default()
    }

    /// Etiquetador com um modelo pronto (ex: carregado do disco).
    pub fn with_model(model: HmmModel) -> Self {
        Self { model: Some(model) }
    }

    /// Treina um modelo novo e descarta o anterior por completo.
    pub fn train(&mut self, pairs: &[TrainingPair]) -> TrainReport {
        let outcome = train(pairs);
        self.model = Some(outcome.model);
        outcome.report
    }

    /// Substitui o modelo atual.
    pub fn set_model(&mut self, model: HmmModel) {
        self.model = Some(model);
    }

    pub fn model(&self) -> Option<&HmmModel> {
        self.model.as_ref()
    }

    /// Há um modelo com emissões e transições.
    pub fn is_trained(&self) -> bool {
        self.model.as_ref().is_some_and(|model| !model.is_empty())
    }

    /// Etiqueta tokens já normalizados (minúsculas).
    pub fn tag_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Decoded, TagError> {
        self.tag_tokens_with(tokens, &mut NoopObserver)
    }

    pub fn tag_tokens_with<S, O>(&self, tokens: &[S], observer: &mut O) -> Result<Decoded, TagError>
    where
        S: AsRef<str>,
        O: ViterbiObserver + ?Sized,
    {
        let model = self.trained_model()?;
        Ok(viterbi_decode_with(model, tokens, observer)?)
    }

    /// Etiqueta uma linha de texto: minúsculas e divisão por espaço simples.
    pub fn tag_sentence(&self, sentence: &str) -> Result<Decoded, TagError> {
        self.tag_tokens(&normalize_sentence(sentence))
    }

    pub fn tag_sentence_with<O>(&self, sentence: &str, observer: &mut O) -> Result<Decoded, TagError>
    where
        O: ViterbiObserver + ?Sized,
    {
        self.tag_tokens_with(&normalize_sentence(sentence), observer)
    }

    fn trained_model(&self) -> Result<&HmmModel, TagError> {
        self.model
            .as_ref()
            .filter(|model| !model.is_empty())
            .ok_or(TagError::NotTrained)
    }
}
