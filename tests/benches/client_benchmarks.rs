//! # Crowdfund Client Benchmarks
//!
//! Hot paths of a render or refresh cycle:
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Lifecycle | `phase_of` + `check_action` | < 100ns |
//! | Amounts | `parse_ether` / `format_ether` | < 1µs |
//! | ABI | `decode_campaign` | < 5µs |
//! | Views | `build_views` over N campaigns | linear in N |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cf_campaign_client::adapters::abi::{decode_campaign, encode_campaign};
use cf_campaign_client::{
    build_views, check_action, format_ether, parse_ether, phase_of, ActionKind, Address, Amount,
    Campaign, CampaignEntry, CampaignId, CampaignSnapshot,
};

const NOW: u64 = 1_700_000_000;

fn campaign(index: u64) -> Campaign {
    let mut campaign = Campaign::new(
        CampaignId(index),
        Address::repeat_byte((index % 255) as u8),
        format!("Campaign number {}", index),
        Amount::exp10(18),
        NOW + index * 60,
    );
    campaign.raised = Amount::exp10(17) * Amount::from(index % 15);
    campaign
}

fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");
    let active = campaign(10);
    let mut failed = campaign(0);
    failed.finalized = true;

    group.bench_function("phase_of", |b| {
        b.iter(|| black_box(phase_of(black_box(&active), black_box(NOW))))
    });
    group.bench_function("check_action_refund", |b| {
        b.iter(|| {
            black_box(check_action(
                ActionKind::ClaimRefund,
                black_box(&failed),
                Amount::from(1),
                NOW,
            ))
        })
    });
    group.finish();
}

fn bench_amounts(c: &mut Criterion) {
    let mut group = c.benchmark_group("amounts");
    group.bench_function("parse_ether", |b| {
        b.iter(|| black_box(parse_ether(black_box("1234.567890123456789"))))
    });
    let value = parse_ether("1234.56789").unwrap();
    group.bench_function("format_ether", |b| {
        b.iter(|| black_box(format_ether(black_box(value))))
    });
    group.finish();
}

fn bench_abi(c: &mut Criterion) {
    let encoded = encode_campaign(&campaign(7));
    c.bench_function("abi/decode_campaign", |b| {
        b.iter(|| black_box(decode_campaign(CampaignId(7), black_box(&encoded))))
    });
}

fn bench_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("views");
    for size in [10u64, 100, 1_000] {
        let snapshot = CampaignSnapshot {
            identity: Some(Address::repeat_byte(1)),
            entries: (0..size)
                .map(|i| CampaignEntry {
                    campaign: campaign(i),
                    contribution: Amount::from(i),
                })
                .collect(),
            generation: 1,
            fetched_at: NOW,
        };
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("build_views", size), &snapshot, |b, s| {
            b.iter(|| black_box(build_views(s, NOW + 300)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lifecycle, bench_amounts, bench_abi, bench_views);
criterion_main!(benches);
