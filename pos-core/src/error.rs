//! # Erros e Avisos do Etiquetador
//!
//! Todas as condições de erro do núcleo são **locais e recuperáveis**: nada aqui
//! derruba o processo. Há duas famílias:
//!
//! - **Erros** (`Result::Err`): a operação não produziu resultado
//!   (ex: decodificar antes de treinar).
//! - **Avisos** ([`TrainWarning`]): o treinamento continuou, mas algo foi ignorado
//!   (ex: um par com número diferente de tokens e tags).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Falha ao normalizar uma linha da tabela de contagens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Não existe linha de contagens para a chave externa pedida.
    #[error("no counts recorded for `{key}`")]
    MissingRow { key: String },
}

/// Falha na decodificação Viterbi de uma sequência.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Sequência de entrada vazia: não existe estado terminal.
    #[error("cannot decode an empty token sequence")]
    EmptyInput,
    /// Nenhum estado alcançável a partir da fronteira nesta posição.
    #[error("no reachable state at position {position}")]
    Unreachable { position: usize },
}

/// Erros da fachada [`crate::tagger::PosTagger`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    /// O etiquetador ainda não possui modelo treinado.
    #[error("POS tagger not trained")]
    NotTrained,
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Erros de leitura do corpus de treino/teste.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de (de)serialização do modelo treinado.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Aviso emitido durante o treinamento. O par/tag afetado é ignorado e o
/// treinamento segue normalmente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainWarning {
    /// O par `index` tem quantidades diferentes de tokens e tags.
    LengthMismatch {
        index: usize,
        tokens: usize,
        tags: usize,
    },
    /// O par `index` usa a tag reservada do estado inicial.
    ReservedTag { index: usize },
    /// A tag transita mas nunca emitiu nenhum token.
    MissingEmissions { tag: String },
}

impl std::fmt::Display for TrainWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainWarning::LengthMismatch { index, tokens, tags } => write!(
                f,
                "pair {index}: non-matching number of tokens ({tokens}) and tags ({tags})"
            ),
            TrainWarning::ReservedTag { index } => {
                write!(f, "pair {index}: uses the reserved start tag")
            }
            TrainWarning::MissingEmissions { tag } => {
                write!(f, "emission counts for `{tag}` were missing")
            }
        }
    }
}
