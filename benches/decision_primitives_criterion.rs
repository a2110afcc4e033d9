use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use human_chess::analysis::en_pris::hanging_pieces;
use human_chess::analysis::king_danger::king_danger;
use human_chess::analysis::phase::phase_of_game;
use human_chess::engines::candidates::{calculate_caps, generate_candidates};
use human_chess::engines::policy::HumanPolicy;
use human_chess::game_state::game_state::GameState;
use human_chess::move_generation::legal_move_generator::generate_legal_moves;
use human_chess::predictor::centrality_predictor::CentralityPredictor;

#[derive(Clone, Copy)]
struct BenchCase {
    name: &'static str,
    fen: &'static str,
    legal_moves: usize,
}

const CASES: &[BenchCase] = &[
    BenchCase {
        name: "startpos",
        fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        legal_moves: 20,
    },
    BenchCase {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        legal_moves: 48,
    },
    BenchCase {
        name: "middlegame",
        fen: "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        legal_moves: 46,
    },
];

fn bench_primitives(c: &mut Criterion) {
    let policy = HumanPolicy::default();
    let predictor = CentralityPredictor::new();

    let mut group = c.benchmark_group("decision_primitives");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));
    group.sample_size(30);

    for case in CASES {
        let game = GameState::from_fen(case.fen).expect("benchmark FEN should parse");
        let legal = generate_legal_moves(&game).expect("legal moves");
        assert_eq!(legal.len(), case.legal_moves, "legal move count for {}", case.name);
        let side = game.side_to_move;
        let phase = phase_of_game(&game);

        group.bench_with_input(BenchmarkId::new("legal_moves", case.name), &game, |b, game| {
            b.iter(|| black_box(generate_legal_moves(black_box(game)).expect("legal moves").len()));
        });

        group.bench_with_input(BenchmarkId::new("hanging_pieces", case.name), &game, |b, game| {
            b.iter(|| black_box(hanging_pieces(black_box(game), side)));
        });

        group.bench_with_input(BenchmarkId::new("king_danger", case.name), &game, |b, game| {
            b.iter(|| black_box(king_danger(black_box(game), side, phase)));
        });

        group.bench_with_input(BenchmarkId::new("candidates", case.name), &game, |b, game| {
            b.iter(|| {
                let caps = calculate_caps(game, phase, false, &legal, &policy.caps);
                let candidates = generate_candidates(game, side, &caps, &legal, &predictor, &policy.caps)
                    .expect("candidates");
                black_box(candidates.len())
            });
        });
    }

    group.finish();
}

criterion_group!(decision_benches, bench_primitives);
criterion_main!(decision_benches);
