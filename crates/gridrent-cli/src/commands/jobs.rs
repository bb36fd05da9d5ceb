use crate::{
    config::Config,
    display::{
        display_job_details, display_jobs_table, print_info, print_success, print_warning,
        prompt_confirm,
    },
    CliError, JobCommands, Result,
};
use gridrent_api::GridRentApiClient;
use log::debug;

/// Handle `gridrent jobs <action>`
pub async fn handle(action: JobCommands, config: &Config) -> Result<()> {
    let client = GridRentApiClient::from_config(config)?;

    match action {
        JobCommands::List { page, limit } => {
            if page == 0 || limit == 0 {
                return Err(CliError::InvalidInput(
                    "--page and --limit must be at least 1".to_string(),
                ));
            }
            let jobs = client.list_jobs(page, limit).await?;
            debug!("Fetched {} of {} jobs", jobs.items.len(), jobs.total);
            display_jobs_table(&jobs);
        }
        JobCommands::Show { id } => {
            let job = client.get_job(&id).await?;
            display_job_details(&job);
        }
        JobCommands::Cancel { id, yes } => {
            let job = client.get_job(&id).await?;
            if job.status.is_terminal() {
                print_warning(&format!(
                    "Job {} is already {} and cannot be cancelled.",
                    job.id, job.status
                ));
                return Ok(());
            }
            if !yes && !prompt_confirm(&format!("Cancel job '{}' ({})?", job.name, job.id), false)? {
                print_info("Operation cancelled.");
                return Ok(());
            }
            let job = client.cancel_job(&id).await?;
            print_success(&format!("Job {} is now {}", job.id, job.status));
        }
        JobCommands::Logs { id } => {
            let logs = client.job_logs(&id).await?;
            if logs.is_empty() {
                print_info(&format!("No logs yet for job {}", id));
            }
            for line in logs {
                println!("{}", line);
            }
        }
        JobCommands::Confirm { id, yes } => {
            if !yes
                && !prompt_confirm(
                    &format!("Confirm job {} completed and release payment?", id),
                    false,
                )?
            {
                print_info("Operation cancelled.");
                return Ok(());
            }
            let job = client.confirm_job(&id).await?;
            print_success(&format!("Job {} confirmed", job.id));
        }
        JobCommands::Dispute { id, reason } => {
            let job = client.dispute_job(&id, &reason).await?;
            print_warning(&format!("Dispute opened for job {} ({})", job.id, job.status));
        }
        JobCommands::Retry { id } => {
            let job = client.retry_job(&id).await?;
            print_success(&format!("Job {} resubmitted, status {}", job.id, job.status));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_rejects_zero_page_before_any_request() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path().join("config.toml")).unwrap();
        // Unroutable port: the request must never be attempted
        config.set_value("api.base_url", "http://127.0.0.1:9").unwrap();

        let result = handle(JobCommands::List { page: 0, limit: 10 }, &config).await;
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}
