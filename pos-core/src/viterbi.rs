//! # Algoritmo de Viterbi — Decodificação Esparsa
//!
//! Encontra a sequência de tags de maior score para uma sequência de tokens,
//! usando programação dinâmica sobre as tabelas do [`HmmModel`].
//!
//! ## Expansão esparsa
//!
//! Em vez de considerar todas as tags em cada posição (`O(N × T²)`), a
//! fronteira só avança pelas transições que **de fato** foram observadas no
//! treino. Uma tag sem linha de transições não leva a lugar nenhum.
//!
//! ```text
//! Inicialização: fronteira = { # : 0 }
//!
//! Recursão: para cada s na fronteira e cada d em transições[s]:
//!     candidato = score[s] + transição(s, d) + emissão(d, token_i)
//!     se d ainda não tem score ou candidato > score[d]:
//!         score'[d] = candidato; back[i][d] = s
//!
//! Backtracking: da melhor tag final, segue back[i] de trás pra frente
//! ```
//!
//! ## Desempate
//!
//! Comparação estrita (`>`): em caso de empate vence o primeiro candidato
//! visto. Estados e destinos são percorridos em ordem lexicográfica (as tabelas
//! são `BTreeMap`), então o resultado é determinístico.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DecodeError;
use crate::hmm::{HmmModel, START_TAG};

/// Score de uma tag individual ao fim de um passo do Viterbi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagScore {
    /// Label da tag (ex: "N")
    pub tag: String,
    /// Score acumulado do melhor caminho que termina nesta tag
    pub score: f64,
    /// Tag anterior desse melhor caminho
    pub best_prev: String,
    /// Score de transição `best_prev → tag`
    pub transition: f64,
    /// Score de emissão do token por esta tag
    pub emission: f64,
}

/// Estado do Viterbi após processar um token (para depuração e visualização).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViterbiStep {
    /// Índice do token processado
    pub token_index: usize,
    /// O token processado
    pub token: String,
    /// Fronteira de entrada deste passo: `(tag, score)`
    pub frontier: Vec<(String, f64)>,
    /// Scores da nova fronteira, em ordem de tag
    pub scores: Vec<TagScore>,
    /// Tag com maior score neste passo (`None` se nenhuma tag foi alcançada)
    pub best_tag: Option<String>,
    /// Score dessa tag
    pub best_score: f64,
}

/// Resultado de uma decodificação bem-sucedida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoded {
    /// Uma tag por token, na ordem de entrada.
    pub tags: Vec<String>,
    /// Score (log) do melhor caminho.
    pub score: f64,
}

/// Observador chamado a cada passo do Viterbi.
///
/// Instrumentação fica fora do algoritmo: quem quiser acompanhar a evolução da
/// fronteira implementa este trait (ou passa uma closure).
pub trait ViterbiObserver {
    fn on_step(&mut self, step: &ViterbiStep);

    /// Se `false`, o decodificador nem monta os [`ViterbiStep`]s.
    fn is_enabled(&self) -> bool {
        true
    }
}

impl<F: FnMut(&ViterbiStep)> ViterbiObserver for F {
    fn on_step(&mut self, step: &ViterbiStep) {
        self(step)
    }
}

/// Observador que não faz nada.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ViterbiObserver for NoopObserver {
    fn on_step(&mut self, _step: &ViterbiStep) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Registra cada passo com `tracing::debug!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceObserver;

impl ViterbiObserver for TraceObserver {
    fn on_step(&mut self, step: &ViterbiStep) {
        debug!(
            "processed token ({}) {}: frontier {:?}",
            step.token, step.token_index, step.frontier
        );
        for s in &step.scores {
            debug!(
                "\t{} <- {}: {:.4} (trans {:.4}, emit {:.4})",
                s.tag, s.best_prev, s.score, s.transition, s.emission
            );
        }
        debug!("\tbest: {:?} ({:.4})", step.best_tag, step.best_score);
    }
}

/// Decodifica `tokens` com o modelo, sem observador.
pub fn viterbi_decode<S: AsRef<str>>(model: &HmmModel, tokens: &[S]) -> Result<Decoded, DecodeError> {
    viterbi_decode_with(model, tokens, &mut NoopObserver)
}

/// Decodifica `tokens` chamando `observer` a cada posição.
///
/// # Erros
/// - [`DecodeError::EmptyInput`] para uma sequência vazia.
/// - [`DecodeError::Unreachable`] se, em alguma posição, nenhuma tag pode ser
///   alcançada a partir da fronteira (ex: o estado inicial não tem transições).
pub fn viterbi_decode_with<S, O>(
    model: &HmmModel,
    tokens: &[S],
    observer: &mut O,
) -> Result<Decoded, DecodeError>
where
    S: AsRef<str>,
    O: ViterbiObserver + ?Sized,
{
    if tokens.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    let last = tokens.len() - 1;
    let mut scores: BTreeMap<&str, f64> = BTreeMap::from([(START_TAG, 0.0)]);
    // backpointers[i][d] = estado anterior do melhor caminho que chega em d na posição i
    let mut backpointers: Vec<BTreeMap<&str, &str>> = Vec::with_capacity(tokens.len());
    let mut terminal: Option<(&str, f64)> = None;

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        let mut next: BTreeMap<&str, f64> = BTreeMap::new();
        let mut back: BTreeMap<&str, &str> = BTreeMap::new();
        // (transição, emissão) do melhor caminho de cada destino, só para o observador
        let mut parts: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

        for (&state, &score) in &scores {
            let Some(row) = model.transitions_from(state) else {
                continue;
            };
            for (dest, &transition) in row {
                let dest = dest.as_str();
                let emission = model.emission_score(dest, token);
                let candidate = score + transition + emission;

                if next.get(dest).map_or(true, |&best| candidate > best) {
                    next.insert(dest, candidate);
                    back.insert(dest, state);
                    parts.insert(dest, (transition, emission));
                }
                if i == last && terminal.map_or(true, |(_, best)| candidate > best) {
                    terminal = Some((dest, candidate));
                }
            }
        }

        if observer.is_enabled() {
            observer.on_step(&build_step(i, token, &scores, &next, &back, &parts));
        }
        if next.is_empty() {
            return Err(DecodeError::Unreachable { position: i });
        }

        backpointers.push(back);
        scores = next;
    }

    let (mut tag, score) = terminal.ok_or(DecodeError::Unreachable { position: last })?;
    let mut tags = vec![String::new(); tokens.len()];
    for i in (0..tokens.len()).rev() {
        tags[i] = tag.to_string();
        tag = match backpointers[i].get(tag) {
            Some(&prev) => prev,
            None => return Err(DecodeError::Unreachable { position: i }),
        };
    }

    Ok(Decoded { tags, score })
}

fn build_step(
    token_index: usize,
    token: &str,
    frontier: &BTreeMap<&str, f64>,
    next: &BTreeMap<&str, f64>,
    back: &BTreeMap<&str, &str>,
    parts: &BTreeMap<&str, (f64, f64)>,
) -> ViterbiStep {
    let scores: Vec<TagScore> = next
        .iter()
        .map(|(&tag, &score)| {
            let (transition, emission) = parts.get(tag).copied().unwrap_or_default();
            TagScore {
                tag: tag.to_string(),
                score,
                best_prev: back.get(tag).map(|prev| prev.to_string()).unwrap_or_default(),
                transition,
                emission,
            }
        })
        .collect();

    let mut best: Option<(&str, f64)> = None;
    for (&tag, &score) in next {
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((tag, score));
        }
    }

    ViterbiStep {
        token_index,
        token: token.to_string(),
        frontier: frontier.iter().map(|(&tag, &score)| (tag.to_string(), score)).collect(),
        scores,
        best_tag: best.map(|(tag, _)| tag.to_string()),
        best_score: best.map_or(f64::NEG_INFINITY, |(_, score)| score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{demo_pairs, fixture_counts, normalize_sentence};
    use crate::hmm::UNSEEN_EMISSION_SCORE;
    use crate::table::CountTable;
    use crate::trainer::train;

    fn fixture_model() -> HmmModel {
        let (emissions, transitions) = fixture_counts();
        HmmModel::from_counts(emissions, transitions).0
    }

    #[test]
    fn test_fixture_golden_output() {
        let model = fixture_model();
        let tokens = normalize_sentence("I chase the dog .");
        let decoded = viterbi_decode(&model, &tokens).unwrap();

        assert_eq!(decoded.tags, vec!["N", "V", "CNJ", "N", "V"]);

        // # →N (i) →V (chase) →CNJ (the) →N (dog) →V (.)
        let expected = [
            0.7f64.ln() + UNSEEN_EMISSION_SCORE,
            0.8f64.ln() + 0.3f64.ln(),
            0.2f64.ln() + UNSEEN_EMISSION_SCORE,
            0.4f64.ln() + 0.4f64.ln(),
            0.8f64.ln() + UNSEEN_EMISSION_SCORE,
        ]
        .iter()
        .sum::<f64>();
        assert!((decoded.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fixture_longer_sentence() {
        let model = fixture_model();
        let tokens = normalize_sentence("I chase the dog");
        let decoded = viterbi_decode(&model, &tokens).unwrap();
        assert_eq!(decoded.tags, vec!["N", "V", "CNJ", "N"]);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let model = train(&demo_pairs()).model;
        let tokens = normalize_sentence("While we watch , you chase the dog and cat .");
        let first = viterbi_decode(&model, &tokens).unwrap();
        for _ in 0..10 {
            assert_eq!(viterbi_decode(&model, &tokens).unwrap(), first);
        }
    }

    #[test]
    fn test_length_is_preserved() {
        let model = train(&demo_pairs()).model;
        for sentence in ["the dog .", "alice will chase the small cat .", "where is the big bird ?"] {
            let tokens = normalize_sentence(sentence);
            let decoded = viterbi_decode(&model, &tokens).unwrap();
            assert_eq!(decoded.tags.len(), tokens.len(), "{sentence}");
        }
    }

    #[test]
    fn test_training_sentence_is_recovered() {
        let model = train(&demo_pairs()).model;
        let tokens = normalize_sentence("The dog saw a cat .");
        let decoded = viterbi_decode(&model, &tokens).unwrap();
        assert_eq!(decoded.tags, vec!["DET", "N", "VD", "DET", "N", "."]);
    }

    #[test]
    fn test_unseen_words_still_decode() {
        let model = train(&demo_pairs()).model;
        let tokens = normalize_sentence("the zyzzyva flibbertigibbets .");
        let decoded = viterbi_decode(&model, &tokens).unwrap();
        assert_eq!(decoded.tags.len(), 4);
        assert_eq!(decoded.tags[0], "DET");
        assert_eq!(decoded.tags[3], ".");
    }

    #[test]
    fn test_empty_input() {
        let model = fixture_model();
        let tokens: Vec<String> = vec![];
        assert_eq!(viterbi_decode(&model, &tokens), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn test_start_without_transitions_is_unreachable() {
        let emissions: CountTable = [("N", &[("dog", 1u64)][..])].into_iter().collect();
        let transitions: CountTable = [("N", &[("N", 1u64)][..])].into_iter().collect();
        let (model, _) = HmmModel::from_counts(emissions, transitions);

        assert_eq!(
            viterbi_decode(&model, &["dog"]),
            Err(DecodeError::Unreachable { position: 0 })
        );
    }

    #[test]
    fn test_dead_end_state_is_unreachable() {
        // # → N, e N não transita para lugar nenhum
        let emissions: CountTable = [("N", &[("dog", 1u64)][..])].into_iter().collect();
        let transitions: CountTable = [("#", &[("N", 1u64)][..])].into_iter().collect();
        let (model, _) = HmmModel::from_counts(emissions, transitions);

        assert!(viterbi_decode(&model, &["dog"]).is_ok());
        assert_eq!(
            viterbi_decode(&model, &["dog", "dog"]),
            Err(DecodeError::Unreachable { position: 1 })
        );
    }

    #[test]
    fn test_ties_resolve_to_first_seen() {
        // Dois destinos com exatamente o mesmo score: vence o primeiro em ordem
        let emissions: CountTable = [
            ("A", &[("x", 1u64)][..]),
            ("B", &[("x", 1u64)][..]),
        ]
        .into_iter()
        .collect();
        let transitions: CountTable = [("#", &[("B", 1u64), ("A", 1)][..])].into_iter().collect();
        let (model, _) = HmmModel::from_counts(emissions, transitions);

        let decoded = viterbi_decode(&model, &["x"]).unwrap();
        assert_eq!(decoded.tags, vec!["A"]);
    }

    #[test]
    fn test_observer_sees_every_step() {
        let model = fixture_model();
        let tokens = normalize_sentence("I chase the dog .");
        let mut steps = Vec::new();
        let decoded = viterbi_decode_with(&model, &tokens, &mut |step: &ViterbiStep| {
            steps.push(step.clone())
        })
        .unwrap();

        assert_eq!(steps.len(), tokens.len());
        assert_eq!(steps[0].frontier, vec![(START_TAG.to_string(), 0.0)]);
        assert_eq!(steps[1].token, "chase");
        // A melhor tag do último passo é a terminal
        assert_eq!(steps[4].best_tag.as_deref(), Some("V"));
        assert!((steps[4].best_score - decoded.score).abs() < 1e-12);

        let cnj = steps[2].scores.iter().find(|s| s.tag == "CNJ").unwrap();
        assert_eq!(cnj.best_prev, "V");
        assert_eq!(cnj.emission, UNSEEN_EMISSION_SCORE);
    }

    #[test]
    fn test_observer_does_not_change_result() {
        let model = train(&demo_pairs()).model;
        let tokens = normalize_sentence("you watch the cat .");
        let plain = viterbi_decode(&model, &tokens).unwrap();
        let traced = viterbi_decode_with(&model, &tokens, &mut TraceObserver).unwrap();
        assert_eq!(plain, traced);
    }
}
