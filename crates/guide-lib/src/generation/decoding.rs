//! Sampling policy for answer generation.
//!
//! Each step applies, in order: repetition penalty over every token emitted
//! so far, temperature scaling, softmax, nucleus (top-p) truncation, and the
//! hard no-repeat n-gram exclusion. The surviving candidates are renormalized
//! and one token is drawn.

use std::collections::HashSet;

use rand::Rng;

use super::config::GenerationConfig;
use super::model::LanguageModel;

/// Down-weight every token already present in `emitted`.
///
/// Positive logits are divided by `penalty`, negative ones multiplied, so the
/// token always becomes less likely. Each distinct token is penalized once.
pub fn apply_repetition_penalty(logits: &mut [f32], emitted: &[u32], penalty: f32) {
    let seen: HashSet<u32> = emitted.iter().copied().collect();
    for id in seen {
        if let Some(logit) = logits.get_mut(id as usize) {
            if *logit < 0.0 {
                *logit *= penalty;
            } else {
                *logit /= penalty;
            }
        }
    }
}

pub fn apply_temperature(logits: &mut [f32], temperature: f32) {
    for logit in logits.iter_mut() {
        *logit /= temperature;
    }
}

/// Numerically stable softmax. Entries at negative infinity get probability 0.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Smallest set of most-probable tokens whose cumulative probability reaches
/// `threshold`, sorted by descending probability. Never empty for a
/// non-empty input.
pub fn nucleus(probs: &[f32], threshold: f32) -> Vec<(u32, f32)> {
    let mut ranked = ranked(probs);
    let mut cumulative = 0.0_f32;
    let mut keep = 0;
    for &(_, p) in &ranked {
        cumulative += p;
        keep += 1;
        if cumulative >= threshold {
            break;
        }
    }
    ranked.truncate(keep.max(1));
    ranked
}

/// Tokens that would complete an `n`-gram already present in `emitted`.
pub fn banned_ngram_tokens(emitted: &[u32], n: usize) -> HashSet<u32> {
    let mut banned = HashSet::new();
    if n == 0 || emitted.len() + 1 < n {
        return banned;
    }

    let prefix = &emitted[emitted.len() + 1 - n..];
    for window in emitted.windows(n) {
        if &window[..n - 1] == prefix {
            banned.insert(window[n - 1]);
        }
    }
    banned
}

/// Pick the next token given raw `logits` for the step.
///
/// If the n-gram rule excludes every nucleus candidate, the pool widens to
/// the whole vocabulary minus excluded tokens; if nothing is left, `eos` is
/// returned.
pub fn choose_next_token<R: Rng>(
    logits: &mut [f32],
    emitted: &[u32],
    config: &GenerationConfig,
    eos: u32,
    rng: &mut R,
) -> u32 {
    apply_repetition_penalty(logits, emitted, config.repetition_penalty());
    apply_temperature(logits, config.temperature());
    let probs = softmax(logits);

    let banned = banned_ngram_tokens(emitted, config.no_repeat_ngram_size());
    let allowed = |(id, _): &(u32, f32)| !banned.contains(id);

    let mut candidates: Vec<(u32, f32)> = nucleus(&probs, config.nucleus_threshold())
        .into_iter()
        .filter(allowed)
        .collect();
    if candidates.is_empty() {
        candidates = ranked(&probs).into_iter().filter(allowed).collect();
    }

    sample(&candidates, rng).unwrap_or(eos)
}

/// Draw one token from `candidates` in proportion to their weights.
fn sample<R: Rng>(candidates: &[(u32, f32)], rng: &mut R) -> Option<u32> {
    let (first, _) = candidates.first()?;
    let total: f32 = candidates.iter().map(|(_, p)| p).sum();
    if !(total.is_finite() && total > 0.0) {
        return Some(*first);
    }

    let mut target = rng.gen_range(0.0..total);
    for &(id, p) in candidates {
        if target < p {
            return Some(id);
        }
        target -= p;
    }
    candidates.last().map(|(id, _)| *id)
}

fn ranked(probs: &[f32]) -> Vec<(u32, f32)> {
    let mut ranked: Vec<(u32, f32)> = (0u32..).zip(probs.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Run the decode loop for one prompt and return the emitted token ids.
///
/// Stops at the first end-of-sequence token or after
/// [`GenerationConfig::max_tokens`] tokens. The end-of-sequence token itself
/// is not part of the result.
pub fn sample_sequence<M, R>(
    model: &mut M,
    prompt_ids: &[u32],
    config: &GenerationConfig,
    rng: &mut R,
) -> anyhow::Result<Vec<u32>>
where
    M: LanguageModel,
    R: Rng,
{
    let special = model.special_tokens();
    let context = model.encode(prompt_ids)?;

    let mut decoded = vec![special.decoder_start];
    let mut emitted = Vec::with_capacity(config.max_tokens());
    while emitted.len() < config.max_tokens() {
        let mut logits = model.next_token_logits(&context, &decoded)?;
        let next = choose_next_token(&mut logits, &emitted, config, special.eos, rng);
        if next == special.eos {
            break;
        }
        emitted.push(next);
        decoded.push(next);
    }
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::test_util::{FixedLogitsModel, RandomLogitsModel};

    fn has_repeated_ngram(tokens: &[u32], n: usize) -> bool {
        let mut seen = HashSet::new();
        tokens.windows(n).any(|w| !seen.insert(w.to_vec()))
    }

    // --- penalty / temperature / softmax ---

    #[test]
    fn repetition_penalty_shrinks_positive_and_grows_negative() {
        let mut logits = vec![4.0, -2.0, 1.0];
        apply_repetition_penalty(&mut logits, &[0, 1, 0], 2.0);
        assert_eq!(logits, vec![2.0, -4.0, 1.0]);
    }

    #[test]
    fn repetition_penalty_ignores_out_of_vocab_ids() {
        let mut logits = vec![1.0, 1.0];
        apply_repetition_penalty(&mut logits, &[7], 2.0);
        assert_eq!(logits, vec![1.0, 1.0]);
    }

    #[test]
    fn low_temperature_sharpens_distribution() {
        let base = vec![2.0, 1.0, 0.0];
        let plain = softmax(&base);

        let mut cooled = base.clone();
        apply_temperature(&mut cooled, 0.5);
        let sharp = softmax(&cooled);

        assert!(sharp[0] > plain[0]);
        assert!(sharp[2] < plain[2]);
    }

    #[test]
    fn softmax_sums_to_one_and_zeroes_neg_infinity() {
        let probs = softmax(&[1.0, f32::NEG_INFINITY, 3.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[1].abs() < f32::EPSILON);
    }

    // --- nucleus ---

    #[test]
    fn nucleus_keeps_smallest_covering_prefix() {
        let probs = [0.05, 0.5, 0.3, 0.15];
        let kept: Vec<u32> = nucleus(&probs, 0.9).into_iter().map(|(id, _)| id).collect();
        assert_eq!(kept, vec![1, 2, 3]);

        let kept: Vec<u32> = nucleus(&probs, 0.5).into_iter().map(|(id, _)| id).collect();
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn nucleus_with_full_threshold_keeps_everything() {
        assert_eq!(nucleus(&[0.25; 4], 1.0).len(), 4);
    }

    // --- n-gram exclusion ---

    #[test]
    fn banned_tokens_complete_existing_trigrams() {
        // "a b c a b" -> next "c" would repeat "a b c"
        let banned = banned_ngram_tokens(&[1, 2, 3, 1, 2], 3);
        assert_eq!(banned, HashSet::from([3]));
    }

    #[test]
    fn no_bans_before_an_ngram_can_exist() {
        assert!(banned_ngram_tokens(&[1], 3).is_empty());
        assert!(banned_ngram_tokens(&[], 2).is_empty());
    }

    #[test]
    fn unigram_size_bans_every_emitted_token() {
        let banned = banned_ngram_tokens(&[4, 5, 4], 1);
        assert_eq!(banned, HashSet::from([4, 5]));
    }

    #[test]
    fn exclusion_applies_after_nucleus() {
        // Token 0 dominates the nucleus but is banned; the widened pool picks
        // the best remaining token.
        let config = GenerationConfig::new(10, 1.0, 0.5, 1.0, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut logits = vec![10.0, 0.0, -5.0, -5.0];
        let next = choose_next_token(&mut logits, &[2, 0, 2], &config, 99, &mut rng);
        assert_ne!(next, 0);
    }

    #[test]
    fn everything_banned_yields_eos() {
        let config = GenerationConfig::new(10, 1.0, 1.0, 1.0, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut logits = vec![1.0, 1.0];
        assert_eq!(
            choose_next_token(&mut logits, &[0, 1], &config, 42, &mut rng),
            42
        );
    }

    // --- decode loop ---

    #[test]
    fn stops_at_eos() {
        let mut model = FixedLogitsModel::always(8, 1);
        let mut rng = StdRng::seed_from_u64(3);
        let tokens =
            sample_sequence(&mut model, &[5, 1], &GenerationConfig::default(), &mut rng).unwrap();
        assert!(tokens.is_empty());
        assert_eq!(model.encode_calls, 1);
    }

    #[test]
    fn never_exceeds_max_tokens() {
        let config = GenerationConfig::new(12, 0.6, 0.9, 2.5, 3).unwrap();
        let mut model = RandomLogitsModel::new(64, 11);
        let mut rng = StdRng::seed_from_u64(5);
        let tokens = sample_sequence(&mut model, &[3, 4, 1], &config, &mut rng).unwrap();
        assert!(tokens.len() <= 12);
    }

    #[test]
    fn greedy_favourite_cannot_loop() {
        // The model always prefers token 5; the n-gram rule must break the loop.
        let config = GenerationConfig::new(40, 0.6, 0.9, 1.0, 3).unwrap();
        let mut model = FixedLogitsModel::always(16, 5);
        let mut rng = StdRng::seed_from_u64(9);
        let tokens = sample_sequence(&mut model, &[2, 1], &config, &mut rng).unwrap();
        assert!(!has_repeated_ngram(&tokens, 3));
    }

    #[test]
    fn no_repeated_ngrams_across_many_seeds() {
        let config = GenerationConfig::default();
        for seed in 0..25 {
            let mut model = RandomLogitsModel::new(12, seed);
            let mut rng = StdRng::seed_from_u64(seed);
            let tokens = sample_sequence(&mut model, &[7, 1], &config, &mut rng).unwrap();
            assert!(tokens.len() <= config.max_tokens());
            assert!(
                !has_repeated_ngram(&tokens, config.no_repeat_ngram_size()),
                "seed {seed} produced a repeated trigram: {tokens:?}"
            );
        }
    }

    #[test]
    fn decoder_sees_start_token_then_emitted_prefix() {
        let config = GenerationConfig::new(3, 1.0, 1.0, 1.0, 3).unwrap();
        let mut model = RandomLogitsModel::new(32, 4);
        let mut rng = StdRng::seed_from_u64(4);
        let tokens = sample_sequence(&mut model, &[9, 1], &config, &mut rng).unwrap();

        let last_prefix = model.prefixes.last().unwrap();
        assert_eq!(last_prefix[0], 0);
        assert_eq!(&last_prefix[1..], &tokens[..last_prefix.len() - 1]);
    }
}
