//! # Corpus Anotado (Sentenças + Tags)
//!
//! O formato de entrada segue o de arquivos paralelos de treino:
//!
//! ```text
//! sentences.txt:  The dog saw a cat .
//! tags.txt:       DET N VD DET N .
//! ```
//!
//! Cada linha do arquivo de sentenças corresponde à mesma linha do arquivo de
//! tags. Os tokens são separados por **um** espaço e convertidos para minúsculas;
//! as tags são mantidas como estão.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CorpusError;
use crate::table::CountTable;

/// Um par alinhado `(tokens, tags)`: uma sentença de treino.
///
/// O alinhamento não é verificado aqui: pares com tamanhos diferentes são
/// ignorados (com aviso) pelo [`crate::trainer::Trainer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
}

impl TrainingPair {
    pub fn new(tokens: Vec<String>, tags: Vec<String>) -> Self {
        Self { tokens, tags }
    }

    /// Monta o par a partir de uma linha de sentença e uma linha de tags.
    pub fn from_lines(sentence: &str, tags: &str) -> Self {
        Self {
            tokens: normalize_sentence(sentence),
            tags: split_tags(tags),
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.tokens.len() == self.tags.len()
    }
}

/// Divide uma linha em tokens por espaço simples, em minúsculas.
///
/// Uma linha em branco não tem tokens. Espaços no fim da linha são descartados,
/// mas espaços repetidos no meio geram tokens vazios.
pub fn normalize_sentence(line: &str) -> Vec<String> {
    split_line(line).map(str::to_lowercase).collect()
}

/// Divide uma linha de tags por espaço simples.
pub fn split_tags(line: &str) -> Vec<String> {
    split_line(line).map(str::to_string).collect()
}

fn split_line(line: &str) -> impl Iterator<Item = &str> {
    let line = line.trim_end_matches(['\r', '\n']).trim_end_matches(' ');
    let blank = line.trim().is_empty();
    line.split(' ').filter(move |_| !blank)
}

/// Lê pares de dois leitores paralelos (sentenças e tags), linha a linha.
///
/// A leitura para no fim do leitor mais curto.
pub fn read_pairs<S: BufRead, T: BufRead>(sentences: S, tags: T) -> Result<Vec<TrainingPair>, CorpusError> {
    let mut pairs = Vec::new();
    for (sentence, tag_line) in sentences.lines().zip(tags.lines()) {
        pairs.push(TrainingPair::from_lines(&sentence?, &tag_line?));
    }
    Ok(pairs)
}

/// Abre os dois arquivos e lê os pares.
pub fn load_pairs(sentences_path: &Path, tags_path: &Path) -> Result<Vec<TrainingPair>, CorpusError> {
    let open = |path: &Path| {
        File::open(path)
            .map(BufReader::new)
            .map_err(|source| CorpusError::Open {
                path: path.to_path_buf(),
                source,
            })
    };
    read_pairs(open(sentences_path)?, open(tags_path)?)
}

/// Pequeno corpus em inglês para demonstração (servidor web sem arquivos de treino).
///
/// Tags no estilo do Brown simplificado: DET, N, NP, PRO, V, VD, VG, VN, MOD,
/// ADJ, ADV, P, CNJ, TO, WH, além de "." e "," para pontuação.
pub fn demo_pairs() -> Vec<TrainingPair> {
    DEMO_CORPUS
        .iter()
        .map(|(sentence, tags)| TrainingPair::from_lines(sentence, tags))
        .collect()
}

const DEMO_CORPUS: &[(&str, &str)] = &[
    ("The dog saw a cat .", "DET N VD DET N ."),
    ("The cat chased the dog .", "DET N VD DET N ."),
    ("I chase the dog .", "PRO V DET N ."),
    ("You watch the cat and the dog .", "PRO V DET N CNJ DET N ."),
    ("We watch dogs .", "PRO V N ."),
    ("While we watch , you chase the dog and cat .", "WH PRO V , PRO V DET N CNJ N ."),
    ("Bob likes the big dog .", "NP V DET ADJ N ."),
    ("Alice will chase the small cat .", "NP MOD V DET ADJ N ."),
    ("The old man walked slowly to the park .", "DET ADJ N VD ADV P DET N ."),
    ("She is watching the dog in the park .", "PRO V VG DET N P DET N ."),
    ("They have seen a big cat .", "PRO V VN DET ADJ N ."),
    ("He wants to get a dog .", "PRO V TO V DET N ."),
    ("The dog and the cat get food .", "DET N CNJ DET N V N ."),
    ("Alice and Bob watch the birds .", "NP CNJ NP V DET N ."),
    ("Where is the cat ?", "WH V DET N ."),
    ("I can see the small bird in the tree .", "PRO MOD V DET ADJ N P DET N ."),
];

/// Contagens brutas do exercício manual: tabelas de emissão e transição
/// prontas para normalização com [`crate::hmm::HmmModel::from_counts`].
///
/// ```text
/// transições: # → NP:3 N:7   NP → V:8 CNJ:2   N → V:8 CNJ:2
///             CNJ → V:4 NP:2 N:4   V → CNJ:2 NP:4 N:4
/// emissões:   NP → chase:10   N → cat:4 dog:4 watch:2
///             CNJ → and:10   V → get:1 chase:3 watch:6
/// ```
pub fn fixture_counts() -> (CountTable, CountTable) {
    let emissions: CountTable = [
        ("NP", &[("chase", 10u64)][..]),
        ("N", &[("cat", 4), ("dog", 4), ("watch", 2)][..]),
        ("CNJ", &[("and", 10)][..]),
        ("V", &[("get", 1), ("chase", 3), ("watch", 6)][..]),
    ]
    .into_iter()
    .collect();

    let transitions: CountTable = [
        ("#", &[("NP", 3u64), ("N", 7)][..]),
        ("NP", &[("V", 8), ("CNJ", 2)][..]),
        ("N", &[("V", 8), ("CNJ", 2)][..]),
        ("CNJ", &[("V", 4), ("NP", 2), ("N", 4)][..]),
        ("V", &[("CNJ", 2), ("NP", 4), ("N", 4)][..]),
    ]
    .into_iter()
    .collect();

    (emissions, transitions)
}
