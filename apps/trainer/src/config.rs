use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub access_token: Option<String>,
    pub user_id: Option<i64>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            access_token: None,
            user_id: None,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, overridden by `trainer.toml`, overridden by environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("trainer.toml") {
        apply_file(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SENYA_API_URL") {
        settings.api_url = v;
    }
    if let Ok(v) = std::env::var("SENYA_TOKEN") {
        settings.access_token = Some(v);
    }
    if let Ok(v) = std::env::var("SENYA_USER_ID") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.user_id = Some(parsed);
        }
    }
    if let Ok(v) = std::env::var("SENYA_LOG") {
        settings.log_filter = v;
    }

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("api_url") {
        settings.api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("access_token") {
        settings.access_token = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("user_id") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.user_id = Some(parsed);
        }
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            "api_url = \"https://senya.example\"\nuser_id = \"7\"\n",
        );
        assert_eq!(settings.api_url, "https://senya.example");
        assert_eq!(settings.user_id, Some(7));
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn malformed_file_keeps_defaults() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "not toml at all [");
        assert_eq!(settings.api_url, Settings::default().api_url);
    }

    #[test]
    fn unparsable_user_id_is_ignored() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "user_id = \"abc\"\n");
        assert_eq!(settings.user_id, None);
    }
}
