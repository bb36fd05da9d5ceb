use crate::errors::{GridRentError, Result};
use crate::models::{JobRequest, ListingDraft};

pub const MIN_JOB_VRAM_GB: f64 = 4.0;
pub const MIN_JOB_HOURS: f64 = 1.0;
pub const MIN_JOB_BUDGET: f64 = 0.10;

/// Validate a container image reference such as `pytorch/pytorch:2.1.0`
pub fn validate_docker_image(image: &str) -> Result<()> {
    if image.trim().is_empty() {
        return Err(GridRentError::ValidationFailed(
            "Docker image is required".to_string(),
        ));
    }

    // Lowercase letters, digits and separators; '@' allows pinning by digest
    let valid_chars = image.chars().all(|c| {
        c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
    });

    if !valid_chars {
        return Err(GridRentError::ValidationFailed(format!(
            "Docker image '{}' contains invalid characters",
            image
        )));
    }

    Ok(())
}

fn field_error(field: &str, message: impl Into<String>) -> GridRentError {
    GridRentError::ValidationFailed(format!("{}: {}", field, message.into()))
}

impl JobRequest {
    /// Check the submission rules a job must meet before it is sent.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(field_error("name", "Job name is required"));
        }

        validate_docker_image(&self.image)?;

        if let Some(input) = &self.input_data {
            if input.source.trim().is_empty() {
                return Err(field_error(
                    "inputData.source",
                    "a source is required when input data is provided",
                ));
            }
        }

        let req = &self.requirements;
        if !(req.min_vram_gb >= MIN_JOB_VRAM_GB) {
            return Err(field_error(
                "requirements.minVRAM",
                format!("Minimum {}GB VRAM required", MIN_JOB_VRAM_GB),
            ));
        }
        if !(req.max_duration >= MIN_JOB_HOURS) {
            return Err(field_error(
                "requirements.maxDuration",
                "Duration must be at least 1 hour",
            ));
        }
        if !(self.max_budget >= MIN_JOB_BUDGET) {
            return Err(field_error("maxBudget", "Budget must be at least $0.10"));
        }

        Ok(())
    }
}

impl ListingDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(field_error("name", "Node name is required"));
        }
        if self.specs.model.trim().is_empty() {
            return Err(field_error("specs.model", "GPU model is required"));
        }
        if !(self.specs.vram_gb > 0.0) || self.specs.cores == 0 || !(self.specs.storage_gb > 0.0) {
            return Err(field_error(
                "specs",
                "VRAM, cores and storage must be greater than zero",
            ));
        }
        if !(self.pricing.price_per_hour >= 0.0) {
            return Err(field_error("pricing.pricePerHour", "price cannot be negative"));
        }
        if !(self.rental_window.min_duration >= 0.0)
            || self.rental_window.min_duration > self.rental_window.max_duration
        {
            return Err(field_error(
                "availability",
                "minimum duration must not exceed maximum duration",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputKind, ListingSpecs, Pricing, RentalWindow, ResourceRequirement};

    fn request() -> JobRequest {
        JobRequest::new(
            "fine-tune",
            "pytorch/pytorch:2.1.0-cuda12.1",
            ResourceRequirement {
                min_vram_gb: 16.0,
                max_duration: 24.0,
                gpu_model: Some("RTX 4090".to_string()),
                region: None,
            },
            50.0,
        )
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
        assert!(request()
            .with_input(InputKind::Url, "https://example.com/data.tar")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_request_rules() {
        let mut r = request();
        r.name = "  ".to_string();
        assert!(r.validate().is_err());

        let mut r = request();
        r.image = "PyTorch/PyTorch".to_string();
        assert!(r.validate().is_err());

        let mut r = request();
        r.requirements.min_vram_gb = 2.0;
        let err = r.validate().unwrap_err().to_string();
        assert!(err.contains("minVRAM"), "{}", err);

        let mut r = request();
        r.requirements.max_duration = 0.5;
        assert!(r.validate().is_err());

        let mut r = request();
        r.max_budget = 0.05;
        assert!(r.validate().is_err());

        let r = request().with_input(InputKind::Ipfs, "");
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_validate_docker_image() {
        assert!(validate_docker_image("ubuntu:22.04").is_ok());
        assert!(validate_docker_image("ghcr.io/org/app@sha256:abc123").is_ok());
        assert!(validate_docker_image("").is_err());
        assert!(validate_docker_image("my image").is_err());
    }

    #[test]
    fn test_listing_draft_rules() {
        let draft = ListingDraft {
            name: "home-rig".to_string(),
            specs: ListingSpecs {
                model: "RTX 4090".to_string(),
                vram_gb: 24.0,
                cores: 16_384,
                memory_gb: 64.0,
                storage_gb: 2000.0,
            },
            location: None,
            pricing: Pricing {
                price_per_hour: 0.75,
                currency: "USD".to_string(),
            },
            rental_window: RentalWindow {
                max_duration: 72.0,
                min_duration: 1.0,
                scheduled_downtime: Vec::new(),
            },
        };
        assert!(draft.validate().is_ok());

        let mut inverted = draft.clone();
        inverted.rental_window.min_duration = 100.0;
        assert!(inverted.validate().is_err());

        let mut no_model = draft;
        no_model.specs.model.clear();
        assert!(no_model.validate().is_err());
    }
}
