//! Calibrate command - recompute skill node difficulty offline.
//!
//! ```bash
//! learnpath calibrate --dry-run
//! learnpath calibrate --subject 6f1c...
//! ```

use crate::cli::args::CalibrateArgs;
use crate::config::{Config, CALIBRATION_BATCH_SIZE};
use crate::errors::{AppError, AppResult};
use crate::infra::Database;
use crate::services::{batch, CalibrationReport, Services};

pub async fn execute(args: CalibrateArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;
    let services = Services::from_connection(db.get_connection(), config);
    let skill_tree = services.skill_tree();

    let subjects = match args.subject {
        Some(id) => vec![id],
        None => skill_tree.calibration_targets().await?,
    };
    tracing::info!(subjects = subjects.len(), dry_run = args.dry_run, "Calibrating skill trees");

    let dry_run = args.dry_run;
    let reports = batch::process(subjects, CALIBRATION_BATCH_SIZE, |subject_id| {
        let skill_tree = skill_tree.clone();
        async move { skill_tree.recalibrate(subject_id, dry_run).await }
    })
    .await?;

    for report in &reports {
        print_report(report);
    }

    let changed: usize = reports.iter().map(|r| r.adjustments.len()).sum();
    tracing::info!(changed, "Calibration finished");
    Ok(())
}

fn print_report(report: &CalibrationReport) {
    if report.adjustments.is_empty() {
        return;
    }
    let verb = if report.dry_run { "would change" } else { "changed" };
    println!("Subject {}: {} {} node(s)", report.subject_id, verb, report.adjustments.len());
    for a in &report.adjustments {
        println!(
            "  {} ({} attempts, {:.0}% passed): {} -> {}",
            a.title,
            a.attempts,
            a.pass_rate * 100.0,
            a.previous,
            a.suggested
        );
    }
}
