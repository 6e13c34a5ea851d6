//! Criterion benchmarks for the GlueNet frame codec.
//!
//! Run with:
//! ```bash
//! cargo bench --package gluenet-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gluenet_core::device::DisplayCommand;
use gluenet_core::protocol::codec::{decode_frame, encode_frame, write_length_prefixed_str};
use gluenet_core::protocol::messages::{DeviceKind, Frame};

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn make_handshake() -> Frame {
    Frame::Handshake { sid: 42 }
}

fn make_add_device() -> Frame {
    Frame::AddDevice {
        kind: DeviceKind::DISPLAY,
        did: 3,
    }
}

fn make_pointer_move() -> Frame {
    Frame::Event {
        did: 1,
        event_id: 2,
        payload: vec![40, 12],
    }
}

fn make_key_down() -> Frame {
    let mut payload = Vec::new();
    write_length_prefixed_str(&mut payload, "ArrowLeft");
    Frame::Event {
        did: 2,
        event_id: 0,
        payload,
    }
}

fn make_write_command() -> Frame {
    let cmd = DisplayCommand::Write {
        x: 4,
        y: 10,
        text: "the quick brown fox jumps over the lazy dog".to_string(),
    };
    Frame::Command {
        did: 0,
        command_id: cmd.id(),
        payload: cmd.encode_payload(),
    }
}

fn fixtures() -> Vec<(&'static str, Frame)> {
    vec![
        ("handshake", make_handshake()),
        ("add_device", make_add_device()),
        ("pointer_move", make_pointer_move()),
        ("key_down", make_key_down()),
        ("write_command", make_write_command()),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for (name, frame) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &frame, |b, frame| {
            b.iter(|| encode_frame(black_box(frame)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for (name, frame) in fixtures() {
        let bytes = encode_frame(&frame);
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| decode_frame(black_box(bytes)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
