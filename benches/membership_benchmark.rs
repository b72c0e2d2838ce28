use adalert_api::db::{DocRef, Document, Fields};
use adalert_api::models::{AdsAccount, UserRole};
use adalert_api::services::plan_membership;
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::collections::HashSet;
use std::hint::black_box;

/// A company with `count` connected accounts, each shared by 25 users.
fn company_accounts(count: usize) -> Vec<AdsAccount> {
    (0..count)
        .map(|n| {
            let members: Vec<String> = (0..25).map(|u| format!("users/user{}", (n + u) % 40)).collect();
            let fields: Fields = serde_json::from_value(json!({
                "Account Name Original": format!("Account {n}"),
                "User": "users/admin",
                "Is Connected": true,
                "Selected Users": members,
            }))
            .expect("Failed to build account fields");
            Document::new(format!("acc{n}"), fields)
                .decode("adsAccounts")
                .expect("Failed to decode account")
        })
        .collect()
}

fn benchmark_plan_membership(c: &mut Criterion) {
    let accounts = company_accounts(500);
    let user = DocRef::user("user7");
    let targets: HashSet<String> = (0..500).step_by(3).map(|n| format!("acc{n}")).collect();

    let mut group = c.benchmark_group("plan_membership");

    group.bench_function("manager_500_accounts", |b| {
        b.iter(|| plan_membership(black_box(&accounts), &user, UserRole::Manager, &targets))
    });

    group.bench_function("admin_500_accounts", |b| {
        b.iter(|| plan_membership(black_box(&accounts), &user, UserRole::Admin, &targets))
    });

    group.finish();
}

criterion_group!(benches, benchmark_plan_membership);
criterion_main!(benches);
