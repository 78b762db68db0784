use super::*;
use crate::clips::Clip;
use crate::config::DetectorSettings;
use crate::testing::SyntheticSignal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Small-rate detector with a 380-sample chain latency (381 samples consumed)
fn test_settings() -> DetectorSettings {
    DetectorSettings {
        sample_rate: 1000.0,
        f0: 150.0,
        f1: 300.0,
        bw: 50.0,
        filter_length: 32,
        integration_time: 300,
        delay: 0.05,
        threshold: 2.0,
        min_duration: 0.1,
        max_duration: 0.4,
        initial_padding: 0,
        final_padding: 0,
    }
}

/// 10 s of noise with a 225 Hz tone over samples [1000, 1200)
fn single_transient(seed: u64) -> Vec<f64> {
    SyntheticSignal::new(1000.0, 10.0, seed)
        .noise(1.0)
        .tone(1.0, 0.2, 225.0, 20.0, 0.01)
        .into_samples()
}

fn detect_chunked<I>(settings: &DetectorSettings, samples: &[f64], sizes: I) -> Vec<Clip>
where
    I: IntoIterator<Item = usize>,
{
    let mut detector = StreamingDetector::new(settings.clone()).unwrap();
    let mut clips = Vec::new();
    let mut rest = samples;
    for size in sizes {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at(size.min(rest.len()));
        clips.extend(detector.detect(chunk));
        rest = tail;
    }
    assert!(rest.is_empty(), "chunk sizes did not cover the signal");
    clips.extend(detector.complete_detection());
    clips
}

#[test]
fn test_single_transient_detected() {
    for seed in 0..4 {
        let clips = detect_clips(&test_settings(), &single_transient(seed)).unwrap();

        assert_eq!(clips.len(), 1, "seed {}: {:?}", seed, clips);
        assert!((1000..1100).contains(&clips[0].start), "seed {}: {:?}", seed, clips);
        assert_eq!(clips[0].length, 400);
    }
}

#[test]
fn test_seven_sample_chunks_match_whole_signal() {
    let settings = test_settings();
    let samples = single_transient(1);

    let whole = detect_clips(&settings, &samples).unwrap();
    let chunked = detect_chunked(&settings, &samples, std::iter::repeat(7));

    assert_eq!(chunked, whole);
    assert_eq!(whole.len(), 1);
}

#[test]
fn test_random_partitions_match_whole_signal() {
    let settings = test_settings();
    let samples = single_transient(2);
    let whole = detect_clips(&settings, &samples).unwrap();
    let mut rng = StdRng::seed_from_u64(0xC11B);

    for _ in 0..20 {
        let max_chunk = rng.gen_range(16..3000);
        let sizes: Vec<usize> = (0..samples.len())
            .map(|_| rng.gen_range(1..=max_chunk))
            .collect();
        assert_eq!(detect_chunked(&settings, &samples, sizes), whole);
    }
}

#[test]
fn test_short_leading_chunks_match_whole_signal() {
    let settings = test_settings();
    let samples = single_transient(3);
    let whole = detect_clips(&settings, &samples).unwrap();

    // First chunks never fill the chain on their own
    for first in [1, 100, 379, 380, 381, 382] {
        let sizes = [first, 0, 5].into_iter().chain(std::iter::repeat(997));
        assert_eq!(detect_chunked(&settings, &samples, sizes), whole, "first={}", first);
    }
}

#[test]
fn test_several_transients_with_padding() {
    let settings = DetectorSettings {
        initial_padding: 1500,
        final_padding: 20,
        ..test_settings()
    };
    let samples = SyntheticSignal::new(1000.0, 10.0, 11)
        .noise(1.0)
        .tone(1.0, 0.2, 225.0, 20.0, 0.01)
        .tone(4.0, 0.2, 200.0, 20.0, 0.01)
        .tone(7.0, 0.2, 250.0, 20.0, 0.01)
        .into_samples();

    let whole = detect_clips(&settings, &samples).unwrap();
    let chunked = detect_chunked(&settings, &samples, std::iter::repeat(1024));

    assert_eq!(chunked, whole);
    assert_eq!(whole.len(), 3, "{:?}", whole);
    assert!(whole[0].start < 0);
    assert!(whole.iter().all(|clip| clip.length == 1920));
}

#[test]
fn test_noise_only_is_chunk_invariant() {
    let settings = test_settings();
    let samples = SyntheticSignal::new(1000.0, 5.0, 5).noise(1.0).into_samples();

    let whole = detect_clips(&settings, &samples).unwrap();
    let chunked = detect_chunked(&settings, &samples, std::iter::repeat(333));
    assert_eq!(chunked, whole);
}

#[test]
fn test_signal_shorter_than_latency() {
    let settings = test_settings();
    let samples = SyntheticSignal::new(1000.0, 0.3, 0).noise(1.0).into_samples();

    let mut detector = StreamingDetector::new(settings).unwrap();
    assert!(detector.detect(&samples).is_empty());
    assert!(detector.complete_detection().is_empty());
    assert!(!detector.is_primed());
}

#[test]
fn test_odd_tap_count_chain() {
    let settings = DetectorSettings {
        filter_length: 33,
        ..test_settings()
    };
    let samples = single_transient(4);

    let whole = detect_clips(&settings, &samples).unwrap();
    let chunked = detect_chunked(&settings, &samples, std::iter::repeat(7));
    assert_eq!(chunked, whole);
    assert_eq!(whole.len(), 1);
}

fn indexed_events(chain: &StageChain, input: &[f64]) -> Vec<(usize, CrossingKind)> {
    chain
        .execute(input)
        .iter()
        .enumerate()
        .filter_map(|(p, &m)| CrossingKind::from_mark(m).map(|k| (p + chain.latency(), k)))
        .collect()
}

#[test]
fn test_marker_events_are_indexed_by_crossing_sample() {
    let chain = StageChain::new(vec![Box::new(stages::ThresholdMarker::new(2.0))]);
    assert_eq!(chain.latency(), 1);
    assert_eq!(chain.consumed(), 1);

    // Ratio crosses above the threshold at sample 3, below the inverse at 6
    let ratios = [1.0, 1.0, 1.0, 3.0, 3.0, 1.0, 0.1, 0.1];
    assert_eq!(
        indexed_events(&chain, &ratios),
        vec![(3, CrossingKind::Rise), (6, CrossingKind::Fall)]
    );
}

#[test]
fn test_delay_ratio_events_are_indexed_one_sample_early() {
    let chain = StageChain::new(vec![
        Box::new(stages::DelayRatio::new(2)),
        Box::new(stages::ThresholdMarker::new(2.0)),
    ]);
    assert_eq!(chain.latency(), 2);
    assert_eq!(chain.consumed(), 3);

    // Power steps up at sample 4 and back down at sample 9
    let power = [1.0, 1.0, 1.0, 1.0, 4.0, 4.0, 4.0, 4.0, 4.0, 1.0, 1.0, 1.0];
    assert_eq!(chain.execute(&power).len(), power.len() - 3);
    assert_eq!(
        indexed_events(&chain, &power),
        vec![(3, CrossingKind::Rise), (8, CrossingKind::Fall)]
    );
}

#[test]
fn test_clip_start_is_first_rise_plus_chain_latency() {
    let settings = test_settings();
    let chain = StageChain::from_settings(&settings).unwrap();
    assert_eq!(chain.latency(), 31 + 299 + 49 + 1);

    for seed in 0..3 {
        let samples = single_transient(seed);
        let marks = chain.execute(&samples);
        let first_rise = marks
            .iter()
            .position(|&m| m == stages::RISE_MARK)
            .expect("tone produces a rise");

        let expected = (first_rise + chain.latency()) as i64;
        let whole = detect_clips(&settings, &samples).unwrap();
        assert_eq!(whole[0].start, expected, "seed {}", seed);

        let chunked = detect_chunked(&settings, &samples, std::iter::repeat(7));
        assert_eq!(chunked[0].start, expected, "seed {}", seed);
    }
}
