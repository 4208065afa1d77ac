//! # pos-core — Etiquetador Morfossintático com HMM
//!
//! Este crate atribui a uma sequência de tokens (palavras e pontuação) a sequência
//! de tags gramaticais mais provável, usando um Hidden Markov Model treinado a
//! partir de sentenças anotadas.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: Pares alinhados `(tokens, tags)` ([`corpus`]).
//! 2.  **Contagem** ([`table`]): Tabelas esparsas `tag → token` (emissões) e
//!     `tag → tag` (transições), com o total de cada linha guardado à parte.
//! 3.  **Treinamento** ([`trainer`]): As contagens viram log-probabilidades e
//!     formam o [`HmmModel`] ([`hmm`]).
//! 4.  **Decodificação** ([`viterbi`]): Viterbi com expansão esparsa de estados e
//!     reconstrução por backpointers.
//! 5.  **Saída**: Uma tag por token, ou um erro explícito
//!     (não treinado, entrada vazia, estado inalcançável).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use pos_core::{corpus::demo_pairs, PosTagger};
//!
//! // 1. Treina com o corpus de demonstração
//! let mut tagger = PosTagger::new();
//! let report = tagger.train(&demo_pairs());
//! assert_eq!(report.pairs_skipped, 0);
//!
//! // 2. Etiqueta uma sentença (minúsculas e divisão por espaço são automáticas)
//! let decoded = tagger.tag_sentence("The dog saw a cat .").unwrap();
//! assert_eq!(decoded.tags, vec!["DET", "N", "VD", "DET", "N", "."]);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`tagger`]: Fachada com o ciclo de vida do modelo.
//! - [`evaluation`]: Acurácia por tag e por sentença.
//! - [`pipeline`]: Etiquetagem com eventos passo a passo (para a UI).

pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod hmm;
pub mod pipeline;
pub mod table;
pub mod tagger;
pub mod trainer;
pub mod viterbi;

pub use error::{CorpusError, DecodeError, ModelError, TableError, TagError, TrainWarning};
pub use hmm::{HmmModel, START_TAG, UNSEEN_EMISSION_SCORE};
pub use pipeline::TagEvent;
pub use tagger::PosTagger;
pub use trainer::{TrainOutcome, TrainReport, Trainer};
pub use viterbi::{Decoded, ViterbiObserver, ViterbiStep};
