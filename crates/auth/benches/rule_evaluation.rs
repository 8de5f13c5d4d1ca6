use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use dashkit_auth::{AccessControl, Action, Principal, RbacConfig, Role, RoleRules, Rule, user_can};

fn config_with(resources: usize) -> RbacConfig {
    let names: Vec<String> = (0..resources).map(|i| format!("resource{i}")).collect();
    let half: Vec<String> = names.iter().step_by(2).cloned().collect();

    RbacConfig::new()
        .with_resources(names.clone())
        .with_role(
            "admin",
            RoleRules::from([
                (Action::CREATE, Rule::all()),
                (Action::UPDATE, Rule::all().except(half.clone())),
            ]),
        )
        .with_role(
            "user",
            RoleRules::from([(Action::READ, Rule::only(half))]),
        )
        .with_default_resource("auth")
}

fn bench_user_can(c: &mut Criterion) {
    let mut group = c.benchmark_group("user_can");

    for size in [10usize, 100, 1_000] {
        let config = config_with(size);
        let roles = vec![Role::from("ghost"), Role::from("user"), Role::from("admin")];
        let last = format!("resource{}", size - 1);

        group.bench_with_input(BenchmarkId::new("worst_case_lookup", size), &size, |b, _| {
            b.iter(|| {
                black_box(user_can(
                    black_box(&roles),
                    "update",
                    black_box(&last),
                    &config.rules,
                    config.default_resource.as_ref(),
                ))
            })
        });
    }

    group.finish();
}

fn bench_resource_for_url(c: &mut Criterion) {
    let config = config_with(200);
    let access = AccessControl::new(config).expect("valid config");
    let principal = Principal::from_role("admin");

    c.bench_function("resource_for_url_then_is_allowed", |b| {
        b.iter(|| {
            let resource = access.resource_for_url(black_box("/resource199/42"));
            black_box(access.is_allowed(Some(&principal), "create", resource.as_str()))
        })
    });
}

criterion_group!(benches, bench_user_can, bench_resource_for_url);
criterion_main!(benches);
