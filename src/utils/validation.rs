use crate::models::User;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

/// A day of reading on one page is noise, not engagement.
const MAX_DURATION_SECS: f64 = 86_400.0;

pub fn validate_interaction(
    user_id: &str,
    museum_id: i64,
    duration_secs: Option<f64>,
) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(anyhow!("User id cannot be empty"));
    }

    if museum_id <= 0 {
        return Err(anyhow!("Museum id must be positive"));
    }

    if let Some(duration) = duration_secs {
        if !duration.is_finite() {
            return Err(anyhow!("Duration must be a finite number of seconds"));
        }
        if duration > MAX_DURATION_SECS {
            return Err(anyhow!("Duration too large (max 24 hours)"));
        }
    }

    Ok(())
}

pub fn validate_timestamp(timestamp: DateTime<Utc>) -> Result<()> {
    let now = Utc::now();
    if timestamp > now + chrono::Duration::hours(1) {
        return Err(anyhow!("Timestamp cannot be more than 1 hour in the future"));
    }
    if timestamp < now - chrono::Duration::days(365) {
        return Err(anyhow!("Timestamp cannot be more than 1 year in the past"));
    }
    Ok(())
}

pub fn validate_onboarding(user: &User) -> Result<()> {
    if user.pseudo.trim().is_empty() {
        return Err(anyhow!("Pseudo is required"));
    }

    if user.pseudo.len() > 100 {
        return Err(anyhow!("Pseudo too long (max 100 characters)"));
    }

    if user.preferred_themes.iter().all(|t| t.trim().is_empty()) {
        return Err(anyhow!("Select at least one theme preference"));
    }

    if let Some(hub) = user.hub_city.as_deref() {
        if crate::algorithms::distance::hub_coordinates(hub).is_none() {
            return Err(anyhow!("Unknown hub city: {}", hub));
        }
    }

    Ok(())
}

pub fn sanitize_string(input: &str, max_length: usize) -> String {
    input
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || "-_.,!?'".contains(*c))
        .take(max_length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_interaction() {
        assert!(validate_interaction("u1", 3, None).is_ok());
        assert!(validate_interaction("u1", 3, Some(120.0)).is_ok());
        assert!(validate_interaction("", 3, None).is_err());
        assert!(validate_interaction("u1", 0, None).is_err());
        assert!(validate_interaction("u1", 3, Some(f64::NAN)).is_err());
        assert!(validate_interaction("u1", 3, Some(1e9)).is_err());
    }

    #[test]
    fn test_validate_onboarding() {
        let valid = User::new("marie", "marie")
            .with_themes(vec!["Art".to_string()])
            .with_hub_city("Lyon");
        assert!(validate_onboarding(&valid).is_ok());

        let no_pseudo = User::new("x", "").with_themes(vec!["Art".to_string()]);
        assert!(validate_onboarding(&no_pseudo).is_err());

        let no_themes = User::new("marie", "marie");
        assert!(validate_onboarding(&no_themes).is_err());

        let bad_hub = User::new("marie", "marie")
            .with_themes(vec!["Art".to_string()])
            .with_hub_city("Atlantis");
        assert!(validate_onboarding(&bad_hub).is_err());
    }

    #[test]
    fn test_validate_timestamp_window() {
        assert!(validate_timestamp(Utc::now()).is_ok());
        assert!(validate_timestamp(Utc::now() + chrono::Duration::hours(2)).is_err());
        assert!(validate_timestamp(Utc::now() - chrono::Duration::days(400)).is_err());
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(sanitize_string("Hello, World! @#$%", 10), "Hello, Wor");
        assert_eq!(sanitize_string("Musée d'Orsay", 50), "Musée d'Orsay");
    }
}
