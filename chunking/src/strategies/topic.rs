use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{require_input, sentence::split_sentences, Chunker, ChunkingError};

const GIBBS_ITERATIONS: usize = 50;
const TOP_TERMS: usize = 5;
const ALPHA: f64 = 0.1;
const BETA: f64 = 0.01;

/// Topic-based chunking: fits a small Latent Dirichlet Allocation model over
/// the sentence-level corpus with a collapsed Gibbs sampler, labels each
/// sentence with its most probable topic and that topic's top terms, and
/// emits one `"Topic k: <terms> - <sentence>"` chunk per sentence.
///
/// The sampler runs from a fixed seed so output is reproducible for
/// identical input and configuration.
pub struct TopicChunker {
    num_topics: usize,
    seed: u64,
}

impl TopicChunker {
    pub fn new(num_topics: usize, seed: u64) -> Result<Self, ChunkingError> {
        if num_topics == 0 {
            return Err(ChunkingError::InvalidConfig(
                "num_topics must be greater than zero".into(),
            ));
        }
        Ok(Self { num_topics, seed })
    }
}

impl Chunker for TopicChunker {
    fn name(&self) -> &'static str {
        "topic"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let sentences = split_sentences(text);
        let corpus = Corpus::build(&sentences);
        let model = corpus.fit(self.num_topics, self.seed);

        Ok(sentences
            .iter()
            .enumerate()
            .map(|(doc, sentence)| {
                let topic = model.dominant_topic(doc);
                let terms = model.top_terms(topic, TOP_TERMS, &corpus.vocabulary);
                format!("Topic {topic}: {terms} - {sentence}")
            })
            .collect())
    }
}

struct Corpus {
    vocabulary: Vec<String>,
    documents: Vec<Vec<usize>>,
}

impl Corpus {
    fn build(sentences: &[String]) -> Self {
        let mut vocabulary: Vec<String> = Vec::new();
        let mut documents = Vec::with_capacity(sentences.len());

        for sentence in sentences {
            let mut doc = Vec::new();
            for token in tokenize(sentence) {
                let id = match vocabulary.iter().position(|w| *w == token) {
                    Some(id) => id,
                    None => {
                        vocabulary.push(token);
                        vocabulary.len() - 1
                    }
                };
                doc.push(id);
            }
            documents.push(doc);
        }

        Self {
            vocabulary,
            documents,
        }
    }

    fn fit(&self, num_topics: usize, seed: u64) -> LdaModel {
        let vocab_size = self.vocabulary.len();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut doc_topic = vec![vec![0u32; num_topics]; self.documents.len()];
        let mut topic_word = vec![vec![0u32; vocab_size]; num_topics];
        let mut topic_total = vec![0u32; num_topics];
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(self.documents.len());

        for (d, doc) in self.documents.iter().enumerate() {
            let mut doc_assignments = Vec::with_capacity(doc.len());
            for &word in doc {
                let topic = rng.gen_range(0..num_topics);
                doc_topic[d][topic] += 1;
                topic_word[topic][word] += 1;
                topic_total[topic] += 1;
                doc_assignments.push(topic);
            }
            assignments.push(doc_assignments);
        }

        let mut weights = vec![0f64; num_topics];
        for _ in 0..GIBBS_ITERATIONS {
            for (d, doc) in self.documents.iter().enumerate() {
                for (i, &word) in doc.iter().enumerate() {
                    let old = assignments[d][i];
                    doc_topic[d][old] -= 1;
                    topic_word[old][word] -= 1;
                    topic_total[old] -= 1;

                    let mut total = 0f64;
                    for k in 0..num_topics {
                        let w = (f64::from(doc_topic[d][k]) + ALPHA)
                            * (f64::from(topic_word[k][word]) + BETA)
                            / (f64::from(topic_total[k]) + BETA * vocab_size as f64);
                        weights[k] = w;
                        total += w;
                    }

                    let mut target = rng.gen::<f64>() * total;
                    let mut new = num_topics - 1;
                    for (k, &w) in weights.iter().enumerate() {
                        if target < w {
                            new = k;
                            break;
                        }
                        target -= w;
                    }

                    doc_topic[d][new] += 1;
                    topic_word[new][word] += 1;
                    topic_total[new] += 1;
                    assignments[d][i] = new;
                }
            }
        }

        LdaModel {
            doc_topic,
            topic_word,
        }
    }
}

struct LdaModel {
    doc_topic: Vec<Vec<u32>>,
    topic_word: Vec<Vec<u32>>,
}

impl LdaModel {
    /// The sentence's most probable topic; ties break toward the lowest
    /// topic index, and token-free sentences land on topic 0.
    fn dominant_topic(&self, doc: usize) -> usize {
        self.doc_topic
            .get(doc)
            .map(|counts| {
                counts
                    .iter()
                    .enumerate()
                    .max_by(|(ka, a), (kb, b)| a.cmp(b).then(kb.cmp(ka)))
                    .map(|(k, _)| k)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    fn top_terms(&self, topic: usize, limit: usize, vocabulary: &[String]) -> String {
        let Some(counts) = self.topic_word.get(topic) else {
            return String::new();
        };

        let mut ranked: Vec<(usize, u32)> = counts
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, count)| *count > 0)
            .collect();
        ranked.sort_by(|(wa, ca), (wb, cb)| cb.cmp(ca).then(wa.cmp(wb)));

        ranked
            .iter()
            .take(limit)
            .filter_map(|(word, _)| vocabulary.get(*word).map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn tokenize(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 3)
        .map(str::to_ascii_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "Cats chase mice in the garden. Dogs fetch sticks in the park. \
                        Mice hide from cats. Sticks fly when dogs run.";

    #[test]
    fn emits_one_labelled_chunk_per_sentence() {
        let chunker = TopicChunker::new(2, 42).expect("chunker");
        let chunks = chunker.chunk(TEXT).expect("chunks");
        assert_eq!(chunks.len(), 4);
        for (chunk, sentence) in chunks.iter().zip(split_sentences(TEXT)) {
            assert!(chunk.starts_with("Topic "), "chunk: {chunk}");
            assert!(chunk.ends_with(&format!("- {sentence}")), "chunk: {chunk}");
        }
    }

    #[test]
    fn seeded_sampler_is_deterministic() {
        let chunker = TopicChunker::new(3, 7).expect("chunker");
        let first = chunker.chunk(TEXT).expect("first run");
        let second = chunker.chunk(TEXT).expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn zero_topics_is_a_config_error() {
        assert!(TopicChunker::new(0, 42).is_err());
    }
}
