// ============================================================
// Layer 5 — Sequence Decoding
// ============================================================
// Beam search for the encoder–decoder chat model, kept free of
// any tensor library so it can be tested with a scripted scorer.
//
// The caller supplies a scorer:
//
//   score(&[beam tokens]) → next-token log-probs, one row per beam
//
// Each step:
//   1. constrain each row
//        • EOS forbidden while the sequence is shorter than min_length
//        • tokens that would repeat an n-gram are forbidden
//   2. candidate = beam score + log-prob, keep the best 2·num_beams
//   3. a candidate ending in EOS becomes a finished hypothesis
//      scored sum_logprobs / len^length_penalty; the others become
//      the next beams (num_beams of them)
//   4. stop at max_length, or once num_beams hypotheses are finished
//      and no running beam can beat the worst of them
//
// Lengths count the decoder start token, like the HF generator.
//
// `greedy_decode` is the single-beam loop used by the captioner:
// the step function sees only the tokens it has not been fed yet,
// which matches a decoder that keeps its own KV cache.

use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct DecodingConfig {
    pub num_beams:              usize,
    pub min_length:             usize,
    pub max_length:             usize,
    pub no_repeat_ngram_size:   usize,
    pub length_penalty:         f64,
    pub decoder_start_token_id: u32,
    pub eos_token_id:           u32,
}

impl Default for DecodingConfig {
    /// Generation defaults shipped with blenderbot-400M-distill
    fn default() -> Self {
        Self {
            num_beams:              10,
            min_length:             20,
            max_length:             60,
            no_repeat_ngram_size:   3,
            length_penalty:         0.65,
            decoder_start_token_id: 1,
            eos_token_id:           2,
        }
    }
}

/// Tokens that would complete an n-gram already present in `tokens`.
pub fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - n..];
    let mut banned: Vec<u32> = tokens
        .windows(n)
        .filter(|gram| &gram[..n - 1] == prefix)
        .map(|gram| gram[n - 1])
        .collect();
    banned.sort_unstable();
    banned.dedup();
    banned
}

/// Numerically stable log-softmax of one row of logits
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = logits.iter().map(|&l| (l - max).exp()).sum::<f32>().ln();
    logits.iter().map(|&l| l - max - log_sum).collect()
}

fn constrain(log_probs: &mut [f32], tokens: &[u32], cfg: &DecodingConfig) {
    if tokens.len() < cfg.min_length {
        if let Some(lp) = log_probs.get_mut(cfg.eos_token_id as usize) {
            *lp = f32::NEG_INFINITY;
        }
    }
    for t in banned_ngram_tokens(tokens, cfg.no_repeat_ngram_size) {
        if let Some(lp) = log_probs.get_mut(t as usize) {
            *lp = f32::NEG_INFINITY;
        }
    }
}

fn normalised(sum_logprobs: f64, len: usize, length_penalty: f64) -> f64 {
    sum_logprobs / (len as f64).powf(length_penalty)
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    score:  f64,
}

/// Finished hypotheses, best `capacity` kept
struct Finished {
    capacity: usize,
    hyps:     Vec<(Vec<u32>, f64)>,
}

impl Finished {
    fn add(&mut self, tokens: Vec<u32>, score: f64) {
        self.hyps.push((tokens, score));
        self.hyps.sort_by(|a, b| b.1.total_cmp(&a.1));
        self.hyps.truncate(self.capacity);
    }

    fn is_full(&self) -> bool {
        self.hyps.len() >= self.capacity
    }

    fn worst(&self) -> f64 {
        self.hyps.last().map(|h| h.1).unwrap_or(f64::NEG_INFINITY)
    }
}

/// Run beam search and return the best sequence without the
/// decoder start token and without the trailing EOS.
pub fn beam_search<F>(cfg: &DecodingConfig, mut score: F) -> Result<Vec<u32>>
where
    F: FnMut(&[Vec<u32>]) -> Result<Vec<Vec<f32>>>,
{
    if cfg.num_beams == 0 {
        bail!("num_beams must be at least 1");
    }

    let mut beams = vec![Beam { tokens: vec![cfg.decoder_start_token_id], score: 0.0 }];
    let mut finished = Finished { capacity: cfg.num_beams, hyps: Vec::new() };
    let mut cur_len = 1;

    while cur_len < cfg.max_length {
        let sequences: Vec<Vec<u32>> = beams.iter().map(|b| b.tokens.clone()).collect();
        let rows = score(&sequences)?;
        if rows.len() != beams.len() {
            bail!("scorer returned {} rows for {} beams", rows.len(), beams.len());
        }

        // (beam index, token, total score)
        let mut candidates: Vec<(usize, u32, f64)> = Vec::new();
        for (b, (beam, mut row)) in beams.iter().zip(rows).enumerate() {
            constrain(&mut row, &beam.tokens, cfg);
            let mut ranked: Vec<(u32, f32)> = row
                .into_iter()
                .enumerate()
                .filter(|(_, lp)| lp.is_finite())
                .map(|(t, lp)| (t as u32, lp))
                .collect();
            let keep = (2 * cfg.num_beams).min(ranked.len());
            if keep == 0 {
                continue;
            }
            ranked.select_nth_unstable_by(keep - 1, |a, b| b.1.total_cmp(&a.1));
            ranked.truncate(keep);
            candidates.extend(ranked.into_iter().map(|(t, lp)| (b, t, beam.score + lp as f64)));
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
        candidates.truncate(2 * cfg.num_beams);

        let mut next = Vec::with_capacity(cfg.num_beams);
        for (rank, (b, token, total)) in candidates.into_iter().enumerate() {
            if token == cfg.eos_token_id {
                if rank < cfg.num_beams {
                    let tokens = beams[b].tokens.clone();
                    let len = tokens.len();
                    finished.add(tokens, normalised(total, len, cfg.length_penalty));
                }
            } else {
                let mut tokens = beams[b].tokens.clone();
                tokens.push(token);
                next.push(Beam { tokens, score: total });
            }
            if next.len() == cfg.num_beams {
                break;
            }
        }

        cur_len += 1;
        if next.is_empty() {
            break;
        }
        beams = next;

        if finished.is_full() {
            let best_running = normalised(beams[0].score, cur_len, cfg.length_penalty);
            if finished.worst() >= best_running {
                break;
            }
        }
    }

    // Still-running beams compete with finished ones at max_length
    for beam in beams {
        let len = beam.tokens.len();
        finished.add(beam.tokens, normalised(beam.score, len, cfg.length_penalty));
    }

    let best = finished.hyps.into_iter().next().map(|h| h.0).unwrap_or_default();
    Ok(best
        .into_iter()
        .skip(1)
        .take_while(|&t| t != cfg.eos_token_id)
        .collect())
}

/// Extend `seed` one argmax token at a time until `stop_id` or
/// `max_length` tokens (seed included). The first call to `step`
/// receives the whole seed; later calls only the newest token.
/// `stop_id` itself is not appended.
pub fn greedy_decode<F>(seed: Vec<u32>, max_length: usize, stop_id: u32, mut step: F) -> Result<Vec<u32>>
where
    F: FnMut(&[u32]) -> Result<u32>,
{
    let mut tokens = seed;
    let mut fed = 0;
    while tokens.len() < max_length {
        let next = step(&tokens[fed..])?;
        fed = tokens.len();
        if next == stop_id {
            break;
        }
        tokens.push(next);
    }
    Ok(tokens)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: usize = 6;
    const EOS: u32 = 2;

    fn cfg(num_beams: usize, min_length: usize, max_length: usize, ngram: usize) -> DecodingConfig {
        DecodingConfig {
            num_beams,
            min_length,
            max_length,
            no_repeat_ngram_size: ngram,
            length_penalty: 1.0,
            decoder_start_token_id: 1,
            eos_token_id: EOS,
        }
    }

    /// Every beam gets the same distribution
    fn fixed(probs: [f32; VOCAB]) -> impl FnMut(&[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        move |beams| Ok(beams.iter().map(|_| probs.iter().map(|p| p.ln()).collect()).collect())
    }

    #[test]
    fn test_banned_ngrams() {
        // "a b c a b" → next "c" would repeat the trigram "a b c"
        assert_eq!(banned_ngram_tokens(&[10, 11, 12, 10, 11], 3), vec![12]);
        assert!(banned_ngram_tokens(&[10, 11, 12, 10], 3).is_empty());
        assert!(banned_ngram_tokens(&[10], 3).is_empty());
        assert!(banned_ngram_tokens(&[10, 11, 12], 0).is_empty());
    }

    #[test]
    fn test_log_softmax_normalises() {
        let lp = log_softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = lp.iter().map(|l| l.exp()).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(lp[2] > lp[1] && lp[1] > lp[0]);
    }

    #[test]
    fn test_stops_at_eos_when_allowed() {
        // EOS is the most likely token from the start
        let out = beam_search(&cfg(2, 0, 10, 0), fixed([0.01, 0.01, 0.9, 0.03, 0.03, 0.02])).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_min_length_suppresses_eos() {
        let out = beam_search(&cfg(1, 4, 10, 0), fixed([0.01, 0.01, 0.9, 0.05, 0.02, 0.01])).unwrap();
        // start token + 3 generated = 4 before EOS becomes legal
        assert_eq!(out, vec![3, 3, 3]);
    }

    #[test]
    fn test_respects_max_length() {
        let out = beam_search(&cfg(3, 0, 8, 0), fixed([0.0, 0.0, 0.0, 0.7, 0.2, 0.1])).unwrap();
        assert_eq!(out.len(), 7);
        assert!(!out.contains(&EOS));
    }

    #[test]
    fn test_no_repeat_ngram_blocks_loops() {
        let out = beam_search(&cfg(2, 0, 12, 2), fixed([0.0, 0.0, 0.0, 0.5, 0.3, 0.2])).unwrap();
        for gram in out.windows(2) {
            let count = out.windows(2).filter(|g| *g == gram).count();
            assert_eq!(count, 1, "bigram {gram:?} repeated in {out:?}");
        }
    }

    #[test]
    fn test_beam_beats_greedy() {
        // Greedy picks 3 (0.6) then is stuck with a flat tail;
        // 4 (0.4) leads to a near-certain EOS.
        let scorer = |beams: &[Vec<u32>]| -> Result<Vec<Vec<f32>>> {
            Ok(beams
                .iter()
                .map(|b| {
                    let probs: [f32; VOCAB] = match b.last() {
                        Some(1) => [0.0, 0.0, 0.0, 0.6, 0.4, 0.0],
                        Some(4) => [0.0, 0.0, 0.99, 0.005, 0.005, 0.0],
                        _       => [0.0, 0.0, 0.2, 0.2, 0.2, 0.4],
                    };
                    probs.iter().map(|p| p.ln()).collect()
                })
                .collect())
        };
        let out = beam_search(&cfg(2, 0, 5, 0), scorer).unwrap();
        assert_eq!(out, vec![4]);
    }

    #[test]
    fn test_scorer_errors_propagate() {
        let failing = |_: &[Vec<u32>]| -> Result<Vec<Vec<f32>>> { bail!("device lost") };
        assert!(beam_search(&cfg(2, 0, 5, 0), failing).is_err());
    }

    // ─── greedy ───

    #[test]
    fn test_greedy_stops_at_stop_token() {
        let mut script = vec![7, 8, 102, 9].into_iter();
        let out = greedy_decode(vec![1, 5], 50, 102, |_| Ok(script.next().unwrap())).unwrap();
        assert_eq!(out, vec![1, 5, 7, 8]);
    }

    #[test]
    fn test_greedy_max_length_counts_seed() {
        let out = greedy_decode(vec![1, 5, 6], 6, 102, |_| Ok(40)).unwrap();
        assert_eq!(out, vec![1, 5, 6, 40, 40, 40]);
    }

    #[test]
    fn test_greedy_seed_at_or_over_max_length_is_returned_as_is() {
        let mut calls = 0;
        let out = greedy_decode(vec![1, 5, 6], 3, 102, |_| { calls += 1; Ok(40) }).unwrap();
        assert_eq!(out, vec![1, 5, 6]);
        let out = greedy_decode(vec![1, 5, 6], 0, 102, |_| { calls += 1; Ok(40) }).unwrap();
        assert_eq!(out, vec![1, 5, 6]);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_greedy_feeds_seed_then_one_token() {
        let mut fed: Vec<Vec<u32>> = Vec::new();
        let mut next = 20;
        greedy_decode(vec![1, 5, 6], 6, 102, |input| {
            fed.push(input.to_vec());
            next += 1;
            Ok(next)
        })
        .unwrap();
        assert_eq!(fed, vec![vec![1, 5, 6], vec![21], vec![22]]);
    }

    #[test]
    fn test_greedy_step_errors_propagate() {
        let out = greedy_decode(vec![1], 5, 102, |_| Err(anyhow::anyhow!("decoder failed")));
        assert!(out.is_err());
    }
}
