use aid_ledger::{
    chain::{compute_hash, verify_chain},
    AidRequestSubmission, Config, DonationType, Ledger, LedgerParts, NeedType, NewDonation,
};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

fn submission() -> AidRequestSubmission {
    AidRequestSubmission {
        beneficiary_id: "ben-bench".to_string(),
        amount: Decimal::new(1_000_000_000, 0),
        purpose: "Benchmark".to_string(),
        description: String::new(),
        category: "other".to_string(),
        need_type: NeedType::Other,
        is_urgent: false,
        monthly_income: None,
        dependents: None,
        has_assets: None,
    }
}

fn donation(request_id: &str) -> NewDonation {
    NewDonation {
        donor_id: "donor-bench".to_string(),
        donor_name: None,
        is_anonymous: true,
        beneficiary_id: "ben-bench".to_string(),
        request_id: request_id.to_string(),
        amount: Decimal::ONE,
        donation_type: DonationType::Sadaqah,
        purpose: "Benchmark".to_string(),
    }
}

fn bench_append(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let (ledger, request_id) = rt.block_on(async {
        let parts = LedgerParts::in_memory().expect("parts");
        let ledger = Ledger::open_with(Config::default(), parts)
            .await
            .expect("ledger");
        let request = ledger.submit_request(submission()).expect("request");
        (ledger, request.id)
    });

    c.bench_function("ledger_append", |b| {
        b.iter(|| {
            rt.block_on(ledger.donate(donation(&request_id)))
                .expect("append")
        })
    });
}

fn bench_verify(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let entries = rt.block_on(async {
        let parts = LedgerParts::in_memory().expect("parts");
        let ledger = Ledger::open_with(Config::default(), parts)
            .await
            .expect("ledger");
        let request = ledger.submit_request(submission()).expect("request");
        for _ in 0..1_000 {
            ledger.donate(donation(&request.id)).await.expect("append");
        }
        ledger.entries().await.expect("entries")
    });

    c.bench_function("verify_chain_1000", |b| b.iter(|| verify_chain(&entries)));

    c.bench_function("compute_hash", |b| {
        b.iter_batched(
            || entries[0].clone(),
            |entry| compute_hash(&entry),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_append, bench_verify);
criterion_main!(benches);
