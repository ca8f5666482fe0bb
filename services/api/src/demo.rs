use crate::infra::{parse_variable, InMemoryBackends};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use loan_intake::config::AppConfig;
use loan_intake::error::AppError;
use loan_intake::workflows::loan_requests::{
    BureauVariable, CreditVerifier, ExpirationSweep, LoanRequestDraft, StaticExpirationSettings,
    SweepReport,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Expiration threshold in days. Defaults to LOAN_EXPIRATION_DAYS.
    #[arg(long)]
    pub(crate) days: Option<u32>,
    /// Ages in days of the pending requests seeded before the sweep runs.
    #[arg(long = "seed-age-days", value_delimiter = ',', default_values_t = [45u32, 31, 12])]
    pub(crate) seed_age_days: Vec<u32>,
}

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Bureau variable as NAME:KIND=VALUE (kinds: integer, decimal, text, boolean). Repeatable.
    #[arg(long = "var", value_parser = parse_variable)]
    pub(crate) variables: Vec<BureauVariable>,
    /// Print the rule set before the verdict.
    #[arg(long)]
    pub(crate) show_rules: bool,
}

pub(crate) async fn run_sweep_demo(args: SweepArgs) -> Result<(), AppError> {
    let SweepArgs {
        days,
        seed_age_days,
    } = args;

    let threshold = match days {
        Some(days) => days,
        None => AppConfig::load()?.lifecycle.expiration_days,
    };

    println!("Loan request expiration sweep (threshold {threshold} days)");
    let backends = InMemoryBackends::new();
    let clients = backends.directory.clients();
    let merchants = backends.directory.merchant_ids();

    for (index, age) in seed_age_days.iter().enumerate() {
        let client = &clients[index % clients.len()];
        let draft = LoanRequestDraft {
            client_id: client.id,
            client_dni: client.dni.clone(),
            client_tax_id: None,
            merchant_id: (index % 2 == 0).then(|| merchants[index / 2 % merchants.len()]),
            requested_amount: Some(150_000 + 25_000 * index as u64),
            attached_document: None,
        };
        let created_at = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(*age)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let request = backends
            .store
            .insert_at(draft, created_at)
            .map_err(|err| AppError::Lifecycle(err.into()))?;
        println!(
            "- Seeded request #{} for {} ({} days old)",
            request.id(),
            client.full_name,
            age
        );
    }

    let sweep = ExpirationSweep::new(
        backends.ports(),
        Arc::new(StaticExpirationSettings::new(threshold)),
    );
    let report = match sweep.run().await {
        Ok(report) => report,
        Err(err) => {
            println!("  Sweep aborted: {err}");
            return Err(err.into());
        }
    };
    render_sweep_report(&report);

    println!("\nRequests after the sweep:");
    for request in backends.store.all() {
        println!(
            "  - #{} {} | {}",
            request.id(),
            request.status(),
            request.comments().join(" / ")
        );
    }

    let notices = backends.outbox.sent();
    if notices.is_empty() {
        println!("Notifications: none dispatched");
    } else {
        println!("Notifications:");
        for notice in notices {
            println!("  - user {} [{:?}] {}", notice.user_id, notice.kind, notice.message);
        }
    }

    println!("Audit trail: {} events recorded", backends.audit.events().len());
    Ok(())
}

fn render_sweep_report(report: &SweepReport) {
    println!(
        "- {} eligible | {} expired | {} failures",
        report.eligible,
        report.successes(),
        report.failures
    );
    if !report.expired.is_empty() {
        let ids: Vec<String> = report.expired.iter().map(ToString::to_string).collect();
        println!("  Expired ids: {}", ids.join(", "));
    }
}

pub(crate) fn run_verification(args: VerifyArgs) -> Result<(), AppError> {
    let verifier = CreditVerifier::default();

    if args.show_rules {
        println!("Rule set:");
        for rule in verifier.rules() {
            println!(
                "  - {} {} {:?} -> {}",
                rule.variable,
                rule.operator.symbol(),
                rule.value,
                rule.failure_message
            );
        }
    }

    let result = verifier.verify(&args.variables);
    let verdict = if result.is_approved() {
        "approved"
    } else {
        "rejected"
    };
    println!("Credit verification: {verdict} (score {})", result.score);
    println!("  Reason: {}", result.reason);
    for failure in &result.failed_rules {
        println!("    - {failure}");
    }
    Ok(())
}
