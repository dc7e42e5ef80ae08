use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use super::{load_tokenizer, load_weights, parse_id2label, read_config, ModelFiles, WINDOW_STRIDE};
use crate::traits::EntitySpan;

/// BERT token classifier for named-entity recognition with BIO tags
/// (e.g. `dslim/bert-base-NER`: PER, ORG, LOC, MISC).
pub struct TokenClassifier {
    model: BertModel,
    classifier_weight: Tensor,
    classifier_bias: Tensor,
    tokenizer: Tokenizer,
    device: Device,
    labels: Vec<String>,
}

/// Per-token prediction fed to the BIO merger.
#[derive(Debug, Clone)]
pub(crate) struct TaggedToken<'a> {
    pub tag: &'a str,
    pub start: usize,
    pub end: usize,
    pub word: Option<u32>,
}

impl TokenClassifier {
    pub fn new(files: &ModelFiles, device: Device) -> Result<Self> {
        let (raw_config, config_json) = read_config(&files.config_path)?;
        let config: BertConfig =
            serde_json::from_str(&raw_config).context("Failed to parse BERT config")?;
        let labels = parse_id2label(&config_json)?;

        let tokenizer = load_tokenizer(&files.tokenizer_path, WINDOW_STRIDE)?;
        let vb = load_weights(&files.weights, &device)?;

        let classifier_weight = vb
            .pp("classifier")
            .get((labels.len(), config.hidden_size), "weight")
            .context("Failed to load classifier.weight")?;
        let classifier_bias = vb
            .pp("classifier")
            .get(labels.len(), "bias")
            .context("Failed to load classifier.bias")?;

        let model = BertModel::load(vb.pp("bert"), &config)
            .context("Failed to construct BERT model for NER")?;

        info!(labels = labels.len(), "Token classifier loaded");

        Ok(Self {
            model,
            classifier_weight,
            classifier_bias,
            tokenizer,
            device,
            labels,
        })
    }

    /// Recognize entities in `text`, returning spans in source order.
    ///
    /// Input longer than one encoder window is tagged window by window over
    /// the tokenizer's overlapping overflow encodings.
    pub fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("NER tokenization failed: {}", e))?;

        let windows = std::iter::once(&encoding)
            .chain(encoding.get_overflowing())
            .map(|window| self.tag_window(window))
            .collect::<Result<Vec<_>>>()?;
        if windows.len() > 1 {
            debug!(windows = windows.len(), "NER input split into windows");
        }

        Ok(merge_bio(&merge_windows(windows), text))
    }

    fn tag_window(&self, encoding: &Encoding) -> Result<Vec<TaggedToken<'_>>> {
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;

        // [1, seq, hidden] @ W^T + b -> [1, seq, num_labels]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = hidden
            .broadcast_matmul(&self.classifier_weight.t()?)?
            .broadcast_add(&self.classifier_bias)?;
        let predictions = logits.argmax(2)?.squeeze(0)?.to_vec1::<u32>()?;

        let special = encoding.get_special_tokens_mask();
        let offsets = encoding.get_offsets();
        let words = encoding.get_word_ids();

        Ok(predictions
            .iter()
            .enumerate()
            .filter(|(idx, _)| special.get(*idx).copied() == Some(0))
            .filter_map(|(idx, label_idx)| {
                let (start, end) = *offsets.get(idx)?;
                Some(TaggedToken {
                    tag: self.labels.get(*label_idx as usize)?.as_str(),
                    start,
                    end,
                    word: words.get(idx).copied().flatten(),
                })
            })
            .collect())
    }
}

/// Join per-window predictions into one token stream in source order.
///
/// Offsets are relative to the full text in every window. Tokens in the
/// overlap keep the tag from the earlier window.
pub(crate) fn merge_windows(windows: Vec<Vec<TaggedToken<'_>>>) -> Vec<TaggedToken<'_>> {
    let mut merged: Vec<TaggedToken<'_>> = Vec::new();
    for window in windows {
        let seen_until = merged.last().map(|t| t.start);
        merged.extend(
            window
                .into_iter()
                .filter(|token| seen_until.map_or(true, |start| token.start > start)),
        );
    }
    merged
}

/// Merge BIO-tagged word pieces into entity spans.
///
/// Word pieces continuing the previous word extend the open span whatever
/// their tag, and never open a span of their own. An `I-` tag with no open
/// span of the same type opens one.
pub(crate) fn merge_bio(tokens: &[TaggedToken<'_>], text: &str) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    // (label, start, end)
    let mut open: Option<(String, usize, usize)> = None;
    let mut last_word: Option<u32> = None;

    for token in tokens {
        let continues_word = token.word.is_some() && token.word == last_word;
        last_word = token.word;

        if continues_word {
            if let Some((_, _, end)) = open.as_mut() {
                *end = token.end;
            }
            continue;
        }

        let (prefix, entity_type) = match token.tag.split_once('-') {
            Some((prefix, entity_type)) => (prefix, entity_type),
            None => ("O", ""),
        };

        match prefix {
            "I" if matches!(&open, Some((label, ..)) if label == entity_type) => {
                if let Some((_, _, end)) = open.as_mut() {
                    *end = token.end;
                }
            }
            "B" | "I" => {
                flush(&mut open, text, &mut spans);
                open = Some((entity_type.to_string(), token.start, token.end));
            }
            _ => flush(&mut open, text, &mut spans),
        }
    }
    flush(&mut open, text, &mut spans);

    spans
}

fn flush(open: &mut Option<(String, usize, usize)>, text: &str, spans: &mut Vec<EntitySpan>) {
    if let Some((label, start, end)) = open.take() {
        if let Some(surface) = text.get(start..end).map(str::trim) {
            if !surface.is_empty() {
                spans.push(EntitySpan {
                    text: surface.to_string(),
                    label,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok<'a>(tag: &'a str, start: usize, end: usize, word: u32) -> TaggedToken<'a> {
        TaggedToken {
            tag,
            start,
            end,
            word: Some(word),
        }
    }

    #[test]
    fn test_merges_multi_word_entity() {
        let text = "Met Ada Lovelace in London";
        let tokens = vec![
            tok("O", 0, 3, 0),
            tok("B-PER", 4, 7, 1),
            tok("I-PER", 8, 16, 2),
            tok("O", 17, 19, 3),
            tok("B-LOC", 20, 26, 4),
        ];
        let spans = merge_bio(&tokens, text);
        assert_eq!(
            spans,
            vec![
                EntitySpan {
                    text: "Ada Lovelace".into(),
                    label: "PER".into()
                },
                EntitySpan {
                    text: "London".into(),
                    label: "LOC".into()
                },
            ]
        );
    }

    #[test]
    fn test_word_pieces_extend_open_span() {
        // "Kyoto" split as "Ky" "##oto", second piece mis-tagged B-LOC
        let text = "Kyoto trip";
        let tokens = vec![
            tok("B-LOC", 0, 2, 0),
            tok("B-LOC", 2, 5, 0),
            tok("O", 6, 10, 1),
        ];
        let spans = merge_bio(&tokens, text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Kyoto");
    }

    #[test]
    fn test_orphan_inside_tag_opens_span() {
        let text = "at Acme today";
        let tokens = vec![
            tok("O", 0, 2, 0),
            tok("I-ORG", 3, 7, 1),
            tok("O", 8, 13, 2),
        ];
        let spans = merge_bio(&tokens, text);
        assert_eq!(spans[0].label, "ORG");
        assert_eq!(spans[0].text, "Acme");
    }

    #[test]
    fn test_type_change_splits_spans() {
        let text = "Paris Hilton";
        let tokens = vec![tok("B-LOC", 0, 5, 0), tok("I-PER", 6, 12, 1)];
        let spans = merge_bio(&tokens, text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].label, "PER");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let text = "Sam and Sam";
        let tokens = vec![
            tok("B-PER", 0, 3, 0),
            tok("O", 4, 7, 1),
            tok("B-PER", 8, 11, 2),
        ];
        assert_eq!(merge_bio(&tokens, text).len(), 2);
    }

    #[test]
    fn test_continuation_piece_after_outside_tag_opens_nothing() {
        // "Kyoto" split as "Ky" "##oto", only the second piece tagged
        let text = "Kyoto trip";
        let tokens = vec![
            tok("O", 0, 2, 0),
            tok("B-LOC", 2, 5, 0),
            tok("O", 6, 10, 1),
        ];
        assert!(merge_bio(&tokens, text).is_empty());
    }

    #[test]
    fn test_continuation_piece_after_type_flush_is_ignored() {
        let text = "Anna Karenina";
        let tokens = vec![
            tok("B-PER", 0, 4, 0),
            tok("O", 5, 8, 1),
            tok("I-MISC", 8, 13, 1),
        ];
        let spans = merge_bio(&tokens, text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Anna");
    }

    #[test]
    fn test_overlapping_windows_keep_late_entity() {
        let filler = "day ".repeat(600);
        let text = format!("{filler}with Maria");
        let maria = filler.len() + 5;

        let days = |from: u32, to: u32| -> Vec<TaggedToken<'static>> {
            (from..to)
                .map(|i| tok("O", i as usize * 4, i as usize * 4 + 3, i))
                .collect()
        };
        let first = days(0, 510);
        let mut second = days(382, 600);
        second.push(tok("O", filler.len(), filler.len() + 4, 600));
        second.push(tok("B-PER", maria, maria + 5, 601));

        let merged = merge_windows(vec![first, second]);
        assert_eq!(merged.len(), 602);
        assert!(merged.windows(2).all(|pair| pair[0].start < pair[1].start));

        let spans = merge_bio(&merged, &text);
        assert_eq!(
            spans,
            vec![EntitySpan {
                text: "Maria".into(),
                label: "PER".into()
            }]
        );
    }

    #[test]
    fn test_overlap_keeps_earlier_window_tags() {
        let text = "Ada met Bo";
        let first = vec![tok("B-PER", 0, 3, 0), tok("O", 4, 7, 1)];
        let second = vec![tok("B-ORG", 4, 7, 1), tok("B-PER", 8, 10, 2)];

        let spans = merge_bio(&merge_windows(vec![first, second]), text);
        let labels: Vec<_> = spans.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["PER", "PER"]);
    }
}
