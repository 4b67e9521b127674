use crate::infra::InMemoryStudentRepository;
use chrono::{DateTime, Local};
use clap::Args;
use mentors_eye::config::AppConfig;
use mentors_eye::error::AppError;
use mentors_eye::scoring::{RiskEngine, RiskVerdict, ScoringMode, StudentRecord};
use mentors_eye::students::{RiskAssessmentService, RosterReport, StudentCsvImporter};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding one student record keyed by field name
    #[arg(long)]
    pub(crate) record: PathBuf,
    /// Model artifact to load (defaults to MODEL_ARTIFACT_PATH)
    #[arg(long)]
    pub(crate) artifact: Option<PathBuf>,
    /// Fall back to the rule overlay alone when the model cannot be loaded
    #[arg(long)]
    pub(crate) rules_only: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RosterArgs {
    /// Student export with StudentID and optional ReportingPeriod columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Model artifact to load (defaults to MODEL_ARTIFACT_PATH)
    #[arg(long)]
    pub(crate) artifact: Option<PathBuf>,
    /// Fall back to the rule overlay alone when the model cannot be loaded
    #[arg(long)]
    pub(crate) rules_only: bool,
    /// Only list the highest-risk students
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

fn scoring_mode(rules_only: bool) -> ScoringMode {
    if rules_only {
        ScoringMode::AllowRulesOnly
    } else {
        ScoringMode::Strict
    }
}

fn load_engine(artifact: Option<PathBuf>) -> Result<RiskEngine, AppError> {
    let config = AppConfig::load()?;
    let artifact = artifact.unwrap_or(config.scoring.artifact_path);
    Ok(RiskEngine::from_artifact_path(
        artifact,
        config.scoring.rules,
    ))
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        record,
        artifact,
        rules_only,
    } = args;

    let raw = std::fs::read_to_string(&record)?;
    let record: StudentRecord = serde_json::from_str(&raw)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;

    let engine = load_engine(artifact)?;
    let verdict = engine.score_with(&record, scoring_mode(rules_only))?;
    print!("{}", render_verdict(&verdict));
    Ok(())
}

pub(crate) fn run_roster_report(args: RosterArgs) -> Result<(), AppError> {
    let RosterArgs {
        csv,
        artifact,
        rules_only,
        limit,
    } = args;

    let snapshots = StudentCsvImporter::from_path(&csv)?;
    let engine = Arc::new(load_engine(artifact)?);
    let service = RiskAssessmentService::new(
        engine,
        Arc::new(InMemoryStudentRepository::default()),
    );
    service.import(snapshots)?;

    let report = service.roster(scoring_mode(rules_only))?;
    print!("{}", render_roster(&report, limit, Local::now()));
    Ok(())
}

pub(crate) fn render_verdict(verdict: &RiskVerdict) -> String {
    let mut out = format!(
        "Risk level: {} (score {}/100)\n",
        verdict.level().label(),
        verdict.score()
    );

    if verdict.probabilities().is_empty() {
        out.push_str("Outcome probabilities: unavailable (rules only)\n");
    } else {
        out.push_str("Outcome probabilities:\n");
        for (label, percent) in verdict.probabilities() {
            out.push_str(&format!("  - {label}: {percent}%\n"));
        }
    }

    if verdict.factors().is_empty() {
        out.push_str("Risk factors: none\n");
    } else {
        out.push_str("Risk factors:\n");
        for factor in verdict.factors() {
            out.push_str(&format!(
                "  - {} (importance {:.1})\n",
                factor.text, factor.importance
            ));
        }
    }

    out
}

pub(crate) fn render_roster(
    report: &RosterReport,
    limit: Option<usize>,
    generated_at: DateTime<Local>,
) -> String {
    let mut out = format!(
        "Student risk roster generated {}\n",
        generated_at.format("%Y-%m-%d %H:%M")
    );
    out.push_str(&format!(
        "{} students scored | {} set aside\n",
        report.students.len(),
        report.rejected.len()
    ));

    let shown = limit.unwrap_or(report.students.len());
    for summary in report.students.iter().take(shown) {
        let top_factor = summary
            .risk
            .factors()
            .first()
            .map(|factor| factor.text.as_str())
            .unwrap_or("-");
        out.push_str(&format!(
            "  {:<10} period {:<3} {:<6} {:>3}  {}\n",
            summary.student_id,
            summary.reporting_period,
            summary.risk.level().label(),
            summary.risk.score(),
            top_factor
        ));
    }

    if !report.rejected.is_empty() {
        out.push_str("Set aside:\n");
        for rejected in &report.rejected {
            out.push_str(&format!(
                "  {} period {}: {}\n",
                rejected.student_id, rejected.reporting_period, rejected.reason
            ));
        }
    }

    out
}
