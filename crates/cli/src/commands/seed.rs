use crate::commands::{
    open_pool, prepare, CommandResult, StepFailure, EXIT_MIGRATION, EXIT_VERIFICATION,
};
use hcplog_db::{migrations, DemoHcp, DemoHcpDataset};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let seed_result = DemoHcpDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

        let verification = DemoHcpDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;

        let run_result: Result<Vec<DemoHcp>, StepFailure> = if verification.all_present {
            Ok(seed_result.hcps_seeded)
        } else {
            let message = verification_failure_message(&verification.checks);
            Err(("seed_verification", message, EXIT_VERIFICATION))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(hcps) => CommandResult::success("seed", seed_summary(&hcps)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_summary(hcps: &[DemoHcp]) -> String {
    let lines = hcps
        .iter()
        .map(|hcp| format!("  - {}: {} ({})", hcp.id, hcp.name, hcp.specialty))
        .collect::<Vec<_>>();
    format!("demo HCP dataset loaded ({} contacts):\n{}", hcps.len(), lines.join("\n"))
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let missing = checks
        .iter()
        .filter_map(|(check, present)| (!present).then_some(*check))
        .collect::<Vec<_>>();
    if missing.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for: {}", missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use hcplog_db::fixtures::DEMO_HCPS;

    use super::{seed_summary, verification_failure_message};

    #[test]
    fn verification_message_names_missing_contacts() {
        let checks = [("Dr. Maya Lee", true), ("Dr. Arjun Patel", false), ("Dr. Hannah Kim", false)];

        assert_eq!(
            verification_failure_message(&checks),
            "Seed verification failed for: Dr. Arjun Patel, Dr. Hannah Kim"
        );
    }

    #[test]
    fn verification_message_falls_back_to_generic_without_labels() {
        assert_eq!(verification_failure_message(&[]), "Some seed data failed to load");
    }

    #[test]
    fn summary_lists_every_contact() {
        let summary = seed_summary(DEMO_HCPS);

        assert!(summary.starts_with("demo HCP dataset loaded (5 contacts):"));
        assert!(summary.contains("  - 1: Dr. Maya Lee (Cardiology)"));
        assert_eq!(summary.lines().count(), DEMO_HCPS.len() + 1);
    }
}
