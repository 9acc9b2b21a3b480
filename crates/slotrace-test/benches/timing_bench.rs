//! Benchmarks for sensor decoding and lap timing

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use slotrace_core::RaceTime;
use slotrace_sensor::LineDecoder;
use slotrace_time::{Countdown, CountdownConfig, LapTimer};

fn bench_decoder_pulse_line(c: &mut Criterion) {
    let mut decoder = LineDecoder::new();

    c.bench_function("decoder_pulse_line", |b| {
        b.iter(|| {
            decoder.push(black_box(b"1\r\n"));
            black_box(decoder.take_pulse())
        })
    });
}

fn bench_decoder_noisy_chunk(c: &mut Criterion) {
    let mut decoder = LineDecoder::new();
    let chunk = b"0\r\n0\r\n1\r\n0\r\ngarbage\r\n1";

    c.bench_function("decoder_noisy_chunk", |b| {
        b.iter(|| {
            decoder.push(black_box(chunk));
            while decoder.take_pulse() {}
            black_box(decoder.queued_pulses())
        })
    });
}

fn bench_lap_timer_race(c: &mut Criterion) {
    let pulses: Vec<RaceTime> = (1..=51).map(|i| RaceTime::from_millis(i * 2_350)).collect();

    c.bench_function("lap_timer_50_laps", |b| {
        b.iter(|| {
            let timer = LapTimer::new(50, false, RaceTime::ZERO).unwrap();
            black_box(timer.laps(pulses.iter().copied()).count())
        })
    });
}

fn bench_countdown_full(c: &mut Criterion) {
    let config = CountdownConfig::default();

    c.bench_function("countdown_full", |b| {
        b.iter(|| {
            let mut countdown = Countdown::new(&config);
            countdown.begin();
            while !countdown.is_expired() {
                black_box(countdown.advance());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_decoder_pulse_line,
    bench_decoder_noisy_chunk,
    bench_lap_timer_race,
    bench_countdown_full,
);
criterion_main!(benches);
