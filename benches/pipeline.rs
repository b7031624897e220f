//! Benchmarks for the per-frame receive path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use optical_link::classify::{ChannelMap, SymbolClassifier};
use optical_link::locate::Roi;
use optical_link::protocol::{validate_and_decode, ProtocolConfig};
use optical_link::sampling::{BitSampler, SamplingConfig, SamplingMode};
use optical_link::sender::encode_frame;
use optical_link::Frame;

/// Generate a frame of alternating horizontal stripes
fn generate_striped(width: u32, height: u32) -> Frame {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        let value = if (y / 8) % 2 == 0 { 255 } else { 0 };
        for _ in 0..width {
            pixels.extend([value, value, value]);
        }
    }
    Frame::new(pixels, width, height, 0)
}

/// Benchmark whole-region symbol classification
fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_region");
    let classifier = SymbolClassifier::new(ChannelMap::default());

    for (width, height) in [(320, 240), (640, 480), (1280, 720)] {
        let roi = Roi::new(width / 4, height / 4, width / 2, height / 2);
        group.throughput(Throughput::Elements(roi.area() as u64));

        let green = Frame::solid(width, height, [0, 255, 0], 0);
        group.bench_with_input(
            BenchmarkId::new("chromatic", format!("{}x{}", width, height)),
            &green,
            |b, frame| b.iter(|| classifier.classify_region(black_box(frame), black_box(&roi))),
        );

        let gray = Frame::solid(width, height, [200, 200, 200], 0);
        group.bench_with_input(
            BenchmarkId::new("luminance", format!("{}x{}", width, height)),
            &gray,
            |b, frame| b.iter(|| classifier.classify_region(black_box(frame), black_box(&roi))),
        );
    }

    group.finish();
}

/// Benchmark lines-mode sampling at increasing band counts
fn bench_sample_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_lines");
    let frame = generate_striped(640, 480);
    let roi = Roi::new(160, 120, 320, 240);

    for bands in [1, 4, 8, 16] {
        let config = SamplingConfig {
            mode: SamplingMode::Lines,
            bits_per_tick: bands,
            ..Default::default()
        };
        let sampler = BitSampler::new(SymbolClassifier::new(ChannelMap::default()), &config);

        group.throughput(Throughput::Elements(bands as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bands), &sampler, |b, sampler| {
            b.iter(|| sampler.sample_lines(black_box(&roi), black_box(&frame)))
        });
    }

    group.finish();
}

/// Benchmark frame extraction plus validation over a buffered stream
fn bench_sync_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_decode");
    let protocol = ProtocolConfig::default();
    let sync = protocol.synchronizer();
    let validator = protocol.validator();

    for len in [8, 64, 256] {
        let text: String = "abcdefgh".chars().cycle().take(len).collect();
        let mut stream = vec![0u8; 32];
        stream.extend(encode_frame(&text, &protocol).expect("ascii text encodes"));

        group.throughput(Throughput::Elements(stream.len() as u64));
        group.bench_with_input(BenchmarkId::new("chars", len), &stream, |b, stream| {
            b.iter(|| {
                let extracted = sync.try_extract(black_box(stream)).expect("frame present");
                validate_and_decode(&extracted.payload, &validator)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify, bench_sample_lines, bench_sync_decode);
criterion_main!(benches);
