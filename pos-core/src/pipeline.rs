//! # Pipeline de Etiquetagem — Eventos Observáveis
//!
//! Executa a etiquetagem de uma sentença emitindo eventos a cada etapa via um
//! canal Rust (`mpsc`), permitindo que o servidor WebSocket transmita o
//! progresso do Viterbi em tempo real para o cliente.

use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::corpus::normalize_sentence;
use crate::tagger::PosTagger;
use crate::viterbi::ViterbiStep;

/// Eventos emitidos durante a etiquetagem de uma sentença.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TagEvent {
    /// **Passo 1**: Tokens normalizados (minúsculas, separados por espaço).
    TokenizationDone { tokens: Vec<String>, total: usize },
    /// **Passo 2**: Um passo do Viterbi: fronteira, scores e backpointers.
    ViterbiStep { step: ViterbiStep },
    /// **Passo 3**: Tag final de um token, após o backtracking.
    TagAssigned {
        token_index: usize,
        token: String,
        tag: String,
    },
    /// **Conclusão**: Sequência completa e score do melhor caminho.
    Done {
        tags: Vec<String>,
        score: f64,
        total_tokens: usize,
        processing_ms: u64,
    },
    /// **Falha**: Etiquetador não treinado, entrada vazia ou estado inalcançável.
    Error { message: String },
}

/// Etiqueta `text` e envia os eventos pelo canal `tx`.
///
/// Sempre termina com `Done` ou `Error`. Se o receptor já foi descartado, os
/// eventos são simplesmente perdidos.
pub fn tag_streaming(tagger: &PosTagger, text: &str, tx: mpsc::Sender<TagEvent>) {
    let start = Instant::now();

    let tokens = normalize_sentence(text);
    let _ = tx.send(TagEvent::TokenizationDone {
        tokens: tokens.clone(),
        total: tokens.len(),
    });

    let result = tagger.tag_tokens_with(&tokens, &mut |step: &ViterbiStep| {
        let _ = tx.send(TagEvent::ViterbiStep { step: step.clone() });
    });

    match result {
        Ok(decoded) => {
            for (i, (token, tag)) in tokens.iter().zip(&decoded.tags).enumerate() {
                let _ = tx.send(TagEvent::TagAssigned {
                    token_index: i,
                    token: token.clone(),
                    tag: tag.clone(),
                });
            }
            let _ = tx.send(TagEvent::Done {
                total_tokens: decoded.tags.len(),
                tags: decoded.tags,
                score: decoded.score,
                processing_ms: start.elapsed().as_millis() as u64,
            });
        }
        Err(err) => {
            let _ = tx.send(TagEvent::Error {
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::demo_pairs;

    fn trained() -> PosTagger {
        let mut tagger = PosTagger::new();
        tagger.train(&demo_pairs());
        tagger
    }

    #[test]
    fn test_events_streaming() {
        let (tx, rx) = mpsc::channel();
        tag_streaming(&trained(), "The dog saw a cat .", tx);

        let events: Vec<TagEvent> = rx.try_iter().collect();
        assert!(
            matches!(&events[0], TagEvent::TokenizationDone { total: 6, .. }),
            "Primeiro evento deve ser TokenizationDone"
        );

        let steps = events
            .iter()
            .filter(|e| matches!(e, TagEvent::ViterbiStep { .. }))
            .count();
        let assigned = events
            .iter()
            .filter(|e| matches!(e, TagEvent::TagAssigned { .. }))
            .count();
        assert_eq!(steps, 6);
        assert_eq!(assigned, 6);

        match events.last().unwrap() {
            TagEvent::Done { tags, total_tokens, .. } => {
                assert_eq!(*total_tokens, 6);
                assert_eq!(tags, &vec!["DET", "N", "VD", "DET", "N", "."]);
            }
            other => panic!("Último evento deve ser Done, veio {other:?}"),
        }
    }

    #[test]
    fn test_untrained_ends_with_error() {
        let (tx, rx) = mpsc::channel();
        tag_streaming(&PosTagger::new(), "the dog .", tx);

        let events: Vec<TagEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events.last(), Some(TagEvent::Error { .. })));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = TagEvent::Error { message: "x".to_string() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["data"]["message"], "x");
    }
}
