//! Auth benchmarks

use apigate::auth::secret::verify_secret;
use apigate::auth::{AudienceType, AuthorizationGuard, SigningSecrets, TokenIssuer};
use apigate::model::ServiceAccount;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const EXTERNAL_SECRET: &str = "external-secret-0123456789abcdefghij";
const INTERNAL_SECRET: &str = "internal-secret-0123456789abcdefghij";

/// bcrypt("s3cr3t"), cost 10
const STORED_HASH: &str = "$2b$10$CYQfOFIpaec8OXJWKFxQEeGTBjFF0MgvYPnrV3zsJUZ2HFElCRd9e";

fn account() -> ServiceAccount {
    ServiceAccount {
        id: 1,
        org_id: 7,
        identifier: "billing-sync".to_string(),
        client_id: "c1".to_string(),
        client_secret_hash: String::new(),
        inactivated_at: None,
    }
}

fn benchmark_tokens(c: &mut Criterion) {
    let secrets = SigningSecrets::new(EXTERNAL_SECRET, INTERNAL_SECRET);
    let issuer = TokenIssuer::new(&secrets);
    let guard = AuthorizationGuard::new(&secrets, AudienceType::External);
    let account = account();

    let mut group = c.benchmark_group("tokens");

    group.bench_function("issue_external", |b| {
        b.iter(|| issuer.issue_for_service_account(black_box(&account)))
    });

    let token = match issuer.issue_for_service_account(&account) {
        Ok(token) => token.access_token,
        Err(e) => panic!("failed to issue token: {}", e),
    };
    group.bench_function("verify_external", |b| {
        b.iter(|| guard.verify_token(black_box(&token)))
    });

    group.finish();
}

fn benchmark_secret_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("secret_verification");
    group.sample_size(10);

    // The two should be indistinguishable
    group.bench_function("known_principal", |b| {
        b.iter(|| verify_secret(black_box(Some(STORED_HASH)), black_box("wrong")))
    });
    group.bench_function("unknown_principal", |b| {
        b.iter(|| verify_secret(black_box(None), black_box("wrong")))
    });

    group.finish();
}

criterion_group!(benches, benchmark_tokens, benchmark_secret_verification);
criterion_main!(benches);
