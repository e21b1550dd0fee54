//! Benchmarks for the streaming relay
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use studyhub::relay::markers::encode_block;
use studyhub::relay::sse::SseDecoder;
use studyhub::relay::{Delta, MarkerParser, ToolCallAccumulator, ToolCallCard, ToolCallDelta};

fn create_sse_payload(chunks: usize) -> Vec<u8> {
    let mut payload = String::new();
    for i in 0..chunks {
        let chunk = json!({
            "id": "chatcmpl-bench",
            "choices": [{"index": 0, "delta": {"content": format!("word{} ", i)}}]
        });
        payload.push_str(&format!("data: {}\n\n", chunk));
    }
    payload.push_str("data: [DONE]\n\n");
    payload.into_bytes()
}

fn create_call_deltas(calls: u32) -> Vec<Delta> {
    let mut deltas = Vec::new();
    for index in 0..calls {
        deltas.push(Delta::tool_call(ToolCallDelta::start(
            index,
            format!("call_{}", index),
            "create_study_session",
        )));
        for fragment in [
            r#"{"subject":"Mathematics","#,
            r#""title":"Algebra review","#,
            r#""date":"2026-10-20","#,
            r#""duration_minutes":45}"#,
        ] {
            deltas.push(Delta::tool_call(ToolCallDelta::arguments(index, fragment)));
        }
    }
    deltas
}

fn bench_sse(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse");

    for size in [100, 1000] {
        let payload = create_sse_payload(size);
        group.throughput(Throughput::Bytes(payload.len() as u64));

        group.bench_function(format!("decode_{}", size), |b| {
            b.iter(|| {
                let mut decoder = SseDecoder::new();
                let mut events = 0;
                // Feed in small slices like a real network read
                for piece in black_box(&payload).chunks(64) {
                    events += decoder.push(piece).len();
                }
                events
            })
        });
    }

    group.finish();
}

fn bench_accumulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator");

    for calls in [1, 10, 50] {
        let deltas = create_call_deltas(calls);
        group.throughput(Throughput::Elements(calls as u64));

        group.bench_function(format!("reassemble_{}_calls", calls), |b| {
            b.iter(|| {
                let mut acc = ToolCallAccumulator::new();
                let mut events = 0;
                for delta in black_box(&deltas) {
                    events += acc.push_delta(delta).len();
                }
                events + acc.finish().len()
            })
        });
    }

    group.finish();
}

fn bench_markers(c: &mut Criterion) {
    let mut group = c.benchmark_group("markers");

    let card = ToolCallCard {
        id: "call_0".to_string(),
        name: "create_practice_task".to_string(),
        arguments: json!({"subject": "Physics", "title": "Lens problems"}),
        result: json!({"id": "42", "subject": "Physics", "title": "Lens problems"}),
    };
    let mut stream = String::new();
    for _ in 0..20 {
        stream.push_str("Here is what I added to your planner. ");
        stream.push_str(&encode_block(&card).unwrap());
    }

    group.bench_function("encode_block", |b| {
        b.iter(|| encode_block(black_box(&card)).unwrap())
    });

    group.bench_function("parse_stream", |b| {
        b.iter(|| {
            let mut parser = MarkerParser::new();
            let mut items = 0;
            for piece in black_box(&stream).as_bytes().chunks(32) {
                // Chunks are ASCII-only so each slice is valid UTF-8
                items += parser.push(std::str::from_utf8(piece).unwrap()).len();
            }
            items + parser.finish().len()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sse, bench_accumulator, bench_markers);
criterion_main!(benches);
