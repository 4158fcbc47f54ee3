use molebeat_core::{detect_beats, AnalysisConfig, AnalysisError, AudioBuffer, OfflineBeatAnalyzer};
use proptest::prelude::*;
use std::time::Duration;

/// Random signal plus a config that is always valid for it
fn case() -> impl Strategy<Value = (Vec<i16>, u32, AnalysisConfig)> {
    (
        prop::collection::vec(any::<i16>(), 2000..6000),
        prop_oneof![Just(8000u32), Just(16_000u32), Just(22_050u32)],
        1u64..=10,
        0.0f64..=1.0,
        0u64..=50,
        0u64..=50,
        0.0f64..2000.0,
        0.0f64..4000.0,
    )
        .prop_map(
            |(samples, rate, block_ms, threshold, ignore_ms, skip_ms, low, width)| {
                let config = AnalysisConfig::default()
                    .with_analysis_period(Duration::from_millis(block_ms))
                    .with_band(low, low + width)
                    .with_threshold(threshold)
                    .with_ignore_period(Duration::from_millis(ignore_ms))
                    .with_calibration_skip(Duration::from_millis(skip_ms));
                (samples, rate, config)
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn timeline_is_ascending_and_inside_buffer((samples, rate, config) in case()) {
        let buffer = AudioBuffer::new(samples, rate).unwrap();
        let timeline = detect_beats(&buffer, config).unwrap();

        for pair in timeline.as_slice().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for beat in timeline.iter() {
            prop_assert!(beat < buffer.duration());
        }
    }

    #[test]
    fn beats_are_at_least_one_block_apart((samples, rate, config) in case()) {
        let buffer = AudioBuffer::new(samples, rate).unwrap();
        let analyzer = OfflineBeatAnalyzer::new(config);
        let plan = analyzer.plan(&buffer).unwrap();
        let timeline = analyzer.analyze(&buffer).unwrap();

        for gap in timeline.intervals() {
            prop_assert!(gap >= plan.block_span, "gap {:?} < block {:?}", gap, plan.block_span);
        }
    }

    #[test]
    fn analysis_is_deterministic((samples, rate, config) in case()) {
        let buffer = AudioBuffer::new(samples, rate).unwrap();
        let first = detect_beats(&buffer, config).unwrap();
        let second = detect_beats(&buffer.clone(), config).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn silence_never_beats(
        len in 200usize..4000,
        rate in prop_oneof![Just(8000u32), Just(44_100u32)],
        threshold in 0.01f64..=1.0,
    ) {
        let buffer = AudioBuffer::new(vec![0i16; len], rate).unwrap();
        let config = AnalysisConfig::default()
            .with_analysis_period(Duration::from_millis(2))
            .with_threshold(threshold);
        prop_assert!(detect_beats(&buffer, config).unwrap().is_empty());
    }

    #[test]
    fn short_buffer_is_a_config_error(len in 1usize..80) {
        // 10 ms at 8 kHz = 80 samples per block
        let buffer = AudioBuffer::new(vec![1000i16; len], 8000).unwrap();
        let config = AnalysisConfig::default().with_analysis_period(Duration::from_millis(10));
        let is_block_error = matches!(
            detect_beats(&buffer, config),
            Err(AnalysisError::BlockLargerThanSignal { block_size: 80, .. })
        );
        prop_assert!(is_block_error);
    }
}
