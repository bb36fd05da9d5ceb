use crate::{
    config::Config,
    display::{display_estimate, display_job_details, print_info, print_success, prompt_confirm},
    CliError, Result,
};
use clap::Args;
use gridrent_api::{GridRentApiClient, Marketplace};
use gridrent_core::{InputKind, JobRequest, ResourceRequirement};
use gridrent_utils::parse_memory_gb;
use log::debug;

/// Arguments for `gridrent submit`.
///
/// ```bash
/// gridrent submit pytorch/pytorch:2.1.0-cuda12.1 --vram 24GB --hours 12 --budget 40
/// gridrent submit myorg/render:latest --input-type ipfs --input QmXyz... -y
/// ```
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Docker image to run
    pub image: String,

    /// Job name (generated when omitted)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Free-form description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Minimum VRAM, e.g. "24GB"
    #[arg(long, default_value = "16")]
    pub vram: String,

    /// Maximum runtime in hours
    #[arg(long, default_value_t = 24.0)]
    pub hours: f64,

    /// Budget ceiling for the whole job
    #[arg(long, default_value_t = 50.0)]
    pub budget: f64,

    /// Preferred GPU model
    #[arg(long)]
    pub model: Option<String>,

    /// Preferred region
    #[arg(long)]
    pub region: Option<String>,

    /// Where the input data lives
    #[arg(long, value_enum, default_value = "none")]
    pub input_type: InputType,

    /// Input source: CID, URL or inline payload
    #[arg(long)]
    pub input: Option<String>,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum InputType {
    #[default]
    None,
    Ipfs,
    Url,
    Inline,
}

impl InputType {
    fn kind(self) -> Option<InputKind> {
        match self {
            InputType::None => None,
            InputType::Ipfs => Some(InputKind::Ipfs),
            InputType::Url => Some(InputKind::Url),
            InputType::Inline => Some(InputKind::Inline),
        }
    }
}

pub async fn handle(args: SubmitArgs, config: &Config) -> Result<()> {
    let request = build_request(&args)?;
    request.validate()?;
    debug!("Job request: {:?}", request);

    let client = GridRentApiClient::from_config(config)?;
    let market = Marketplace::new(client).with_schedule(config.tier_schedule()?);
    let currency = config.currency();

    let quote = market.quote(&request)?;
    println!("Job '{}' running {}", request.name, request.image);
    display_estimate(
        &quote,
        request.requirements.min_vram_gb,
        Some(request.max_budget),
        &currency,
    );

    if !quote.within_budget {
        return Err(CliError::InvalidInput(
            "Estimated cost exceeds the budget. Raise --budget or lower --hours/--vram."
                .to_string(),
        ));
    }

    if !args.yes && !prompt_confirm("Submit this job?", true)? {
        print_info("Submission cancelled.");
        return Ok(());
    }

    let job = market.submit(&request).await?;
    print_success(&format!("Job submitted: {}", job.id));
    display_job_details(&job);

    Ok(())
}

/// Turn the command-line arguments into a job request. Validation is left to
/// `JobRequest::validate`.
pub fn build_request(args: &SubmitArgs) -> Result<JobRequest> {
    let min_vram_gb = parse_memory_gb(&args.vram).map_err(|e| {
        CliError::InvalidInput(format!("Invalid VRAM '{}': {}", args.vram, e))
    })?;

    let name = match &args.name {
        Some(name) => name.clone(),
        None => generate_job_name(),
    };

    let requirements = ResourceRequirement {
        min_vram_gb,
        max_duration: args.hours,
        gpu_model: args.model.clone(),
        region: args.region.clone(),
    };
    let mut request = JobRequest::new(name, args.image.trim(), requirements, args.budget);

    if let Some(description) = &args.description {
        request = request.with_description(description.as_str());
    }

    match (args.input_type.kind(), &args.input) {
        (Some(kind), Some(source)) => request = request.with_input(kind, source.as_str()),
        (Some(kind), None) => {
            return Err(CliError::InvalidInput(format!(
                "--input is required with --input-type {:?}",
                kind
            )))
        }
        (None, Some(_)) => {
            return Err(CliError::InvalidInput(
                "--input needs --input-type ipfs, url or inline".to_string(),
            ))
        }
        (None, None) => {}
    }

    Ok(request)
}

fn generate_job_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("job-{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(image: &str) -> SubmitArgs {
        SubmitArgs {
            image: image.to_string(),
            name: None,
            description: None,
            vram: "16".to_string(),
            hours: 24.0,
            budget: 50.0,
            model: None,
            region: None,
            input_type: InputType::None,
            input: None,
            yes: true,
        }
    }

    #[test]
    fn test_build_request_defaults() {
        let request = build_request(&args("pytorch/pytorch:latest")).unwrap();

        assert!(request.name.starts_with("job-"));
        assert_eq!(request.name.len(), 12);
        assert_eq!(request.requirements.min_vram_gb, 16.0);
        assert_eq!(request.requirements.max_duration, 24.0);
        assert_eq!(request.max_budget, 50.0);
        assert!(request.input_data.is_none());
        request.validate().unwrap();
    }

    #[test]
    fn test_build_request_with_input_and_preferences() {
        let mut submit = args("myorg/render:latest");
        submit.name = Some("render".to_string());
        submit.vram = "24GB".to_string();
        submit.model = Some("RTX 4090".to_string());
        submit.input_type = InputType::Ipfs;
        submit.input = Some("QmHash".to_string());

        let request = build_request(&submit).unwrap();
        assert_eq!(request.name, "render");
        assert_eq!(request.requirements.min_vram_gb, 24.0);
        assert_eq!(request.requirements.gpu_model.as_deref(), Some("RTX 4090"));

        let input = request.input_data.unwrap();
        assert_eq!(input.kind, InputKind::Ipfs);
        assert_eq!(input.source, "QmHash");
    }

    #[test]
    fn test_build_request_input_pairing() {
        let mut missing_source = args("a/b:c");
        missing_source.input_type = InputType::Url;
        assert!(matches!(
            build_request(&missing_source),
            Err(CliError::InvalidInput(_))
        ));

        let mut missing_type = args("a/b:c");
        missing_type.input = Some("https://example.com/data.tar".to_string());
        assert!(matches!(
            build_request(&missing_type),
            Err(CliError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_image_fails_validation() {
        let request = build_request(&args("Not An Image")).unwrap();
        assert!(request.validate().is_err());
    }
}
