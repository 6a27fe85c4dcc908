//! Criterion benchmarks for the scoreboard packet codec.
//!
//! A full refresh of a 15-line board encodes up to 30 packets per viewer, so
//! per-packet encode cost multiplied by the viewer count is the engine's hot
//! path.
//!
//! Run with:
//! ```bash
//! cargo bench --package sidebar-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sidebar_core::protocol::packets::{NumberFormat, ObjectiveAction, TeamAction};
use sidebar_core::{decode_packet, encode_packet, ProtocolVersion, ScoreboardPacket, WireText};

// ── Packet fixtures ───────────────────────────────────────────────────────────

fn make_objective() -> ScoreboardPacket {
    ScoreboardPacket::Objective {
        name: "sb-c0ffee".to_string(),
        action: ObjectiveAction::Update {
            title: WireText::from_json(r#"{"text":"Stats","color":"gold","bold":true}"#),
            number_format: Some(NumberFormat::Blank),
        },
    }
}

fn make_team_update() -> ScoreboardPacket {
    ScoreboardPacket::Team {
        name: "sb-c0ffee3".to_string(),
        action: TeamAction::Update {
            text: WireText::from_legacy("§aPlayers online: §f128"),
        },
    }
}

fn make_set_score() -> ScoreboardPacket {
    ScoreboardPacket::SetScore {
        entry: "§3§r".to_string(),
        objective: "sb-c0ffee".to_string(),
        value: 12,
        number_format: None,
    }
}

const VERSIONS: [(&str, ProtocolVersion); 3] = [
    ("legacy", ProtocolVersion::MINECRAFT_1_8),
    ("mid", ProtocolVersion::MINECRAFT_1_16),
    ("modern", ProtocolVersion::MINECRAFT_1_20_5),
];

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let packets = [
        ("objective", make_objective()),
        ("team_update", make_team_update()),
        ("set_score", make_set_score()),
    ];
    for (era, version) in VERSIONS {
        for (name, packet) in &packets {
            group.bench_with_input(BenchmarkId::new(*name, era), packet, |b, p| {
                b.iter(|| encode_packet(black_box(p), version).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (era, version) in VERSIONS {
        let bytes = encode_packet(&make_team_update(), version).unwrap();
        group.bench_with_input(BenchmarkId::new("team_update", era), &bytes, |b, bytes| {
            b.iter(|| decode_packet(black_box(bytes), version).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
