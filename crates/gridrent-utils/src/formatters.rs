/// Trait for formatting different types of data
pub trait Formatter<T> {
    fn format(&self, input: T) -> String;
}

/// Currency formatter: fixed currency code, two to four fraction digits
pub struct PriceFormatter {
    currency: String,
}

impl PriceFormatter {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into().to_ascii_uppercase(),
        }
    }

    fn symbol(&self) -> String {
        match self.currency.as_str() {
            "USD" => "$".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "JPY" => "¥".to_string(),
            other => format!("{} ", other),
        }
    }
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl Formatter<f64> for PriceFormatter {
    /// Format an amount, e.g. `$0.85`, `$0.1234`, `$1,250.00`
    fn format(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return format!("{}--", self.symbol());
        }

        let sign = if amount < 0.0 { "-" } else { "" };
        let fixed = format!("{:.4}", amount.abs());
        let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "0000"));

        let mut fraction = fraction.trim_end_matches('0').to_string();
        while fraction.len() < 2 {
            fraction.push('0');
        }

        format!(
            "{}{}{}.{}",
            sign,
            self.symbol(),
            group_thousands(whole),
            fraction
        )
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Duration formatter for minute counts
pub struct DurationFormatter;

impl Formatter<u64> for DurationFormatter {
    /// Format minutes as `2h 5m`, or `45m` under an hour
    fn format(&self, minutes: u64) -> String {
        let hours = minutes / 60;
        let mins = minutes % 60;

        if hours > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}m", mins)
        }
    }
}

// Convenience functions
pub fn format_price(amount: f64) -> String {
    PriceFormatter::default().format(amount)
}

pub fn format_price_in(amount: f64, currency: &str) -> String {
    PriceFormatter::new(currency).format(amount)
}

pub fn format_duration(minutes: u64) -> String {
    DurationFormatter.format(minutes)
}

/// Format fractional hours, e.g. `72h` or `1h 30m`
pub fn format_hours(hours: f64) -> String {
    let minutes = (hours.max(0.0) * 60.0).round() as u64;
    if minutes % 60 == 0 && minutes > 0 {
        format!("{}h", minutes / 60)
    } else {
        format_duration(minutes)
    }
}

pub fn format_gpu_specs(vram_gb: f64, model: &str) -> String {
    format!("{} ({}GB VRAM)", model, vram_gb)
}

/// Shorten a wallet address to `0x1234...abcd`
pub fn truncate_address(address: &str, chars: usize) -> String {
    if address.is_empty() {
        return String::new();
    }

    let len = address.chars().count();
    if len <= chars * 2 + 2 {
        return address.to_string();
    }

    let head: String = address.chars().take(chars + 2).collect();
    let tail: String = address.chars().skip(len - chars).collect();
    format!("{}...{}", head, tail)
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}
