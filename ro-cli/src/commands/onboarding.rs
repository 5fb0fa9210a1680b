//! Onboarding commands.

use clap::Subcommand;

use ro_core::error::RoResult;
use ro_services::ServiceRegistry;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum OnboardingAction {
    /// Show whether onboarding was completed.
    Status,
    /// Mark onboarding as completed.
    Complete,
    /// Forget that onboarding was completed.
    Reset,
}

pub async fn run(registry: &ServiceRegistry, action: OnboardingAction, format: OutputFormat) -> RoResult<()> {
    match action {
        OnboardingAction::Status => {}
        OnboardingAction::Complete => registry.onboarding.mark_complete()?,
        OnboardingAction::Reset => registry.onboarding.reset()?,
    }

    let complete = registry.onboarding.is_complete();
    match format {
        OutputFormat::Json => super::print_json(&serde_json::json!({ "complete": complete })),
        OutputFormat::Text => {
            if complete {
                super::print_ok("Onboarding complete");
            } else {
                println!("Onboarding not completed.");
            }
        }
    }
    Ok(())
}
