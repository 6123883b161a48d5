//! Shooting settings command handlers.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use camlink_api::ccapi::ShootingSettings;

use crate::cli::{SetArgs, SettingsArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util::{self, CameraSession};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct Setting {
    name: String,
    value: Value,
    ability: Vec<Value>,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Options")]
    options: String,
}

impl From<&Setting> for SettingRow {
    fn from(s: &Setting) -> Self {
        Self {
            name: s.name.clone(),
            value: output::cell(&s.value),
            options: summarize_ability(&s.ability),
        }
    }
}

/// First few allowed values, then a count of the rest.
fn summarize_ability(ability: &[Value]) -> String {
    const SHOWN: usize = 6;
    let mut shown: Vec<String> = ability.iter().take(SHOWN).map(output::cell).collect();
    if ability.len() > SHOWN {
        shown.push(format!("+{} more", ability.len() - SHOWN));
    }
    shown.join(", ")
}

fn collect(settings: &ShootingSettings) -> Vec<Setting> {
    let mut rows: Vec<Setting> = settings
        .0
        .keys()
        .map(|name| Setting {
            name: name.clone(),
            value: settings.value(name).cloned().unwrap_or(Value::Null),
            ability: settings.ability(name).cloned().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_list(
    session: &CameraSession,
    args: SettingsArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    let settings = session.controller.camera_settings().await?;
    let mut rows = collect(&settings);

    if let Some(name) = args.name {
        rows.retain(|s| s.name == name);
        if rows.is_empty() {
            return Err(CliError::UnknownSetting { name });
        }
    }

    let out = output::render_list(
        ctx.output,
        &rows,
        |s| SettingRow::from(s),
        |s| format!("{}={}", s.name, output::cell(&s.value)),
    );
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn handle_set(
    session: &CameraSession,
    args: SetArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    let value = util::parse_value(&args.value);

    // Reject values outside the advertised ability list before sending.
    if let Some(settings) = session.controller.latest_settings() {
        if let Some(ability) = settings.ability(&args.name) {
            if !ability.is_empty() && !ability.contains(&value) {
                return Err(CliError::Validation {
                    field: args.name,
                    reason: format!(
                        "{} is not one of: {}",
                        output::cell(&value),
                        summarize_ability(ability)
                    ),
                });
            }
        }
    }

    let applied = session
        .controller
        .update_camera_setting(&args.name, value)
        .await?;
    let out = output::render_single(
        ctx.output,
        &applied,
        |v| format!("{} = {}", args.name, output::cell(v.get("value").unwrap_or(v))),
        |v| output::cell(v.get("value").unwrap_or(v)),
    );
    output::print_output(&out, ctx.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn settings_are_sorted_with_values_and_abilities() {
        let settings: ShootingSettings = serde_json::from_value(json!({
            "tv": {"value": "1/250", "ability": ["1/125", "1/250"]},
            "av": {"value": "f8.0", "ability": []},
            "iso": {"value": "auto"}
        }))
        .unwrap_or_default();

        let rows = collect(&settings);
        let names: Vec<_> = rows.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["av", "iso", "tv"]);
        assert_eq!(rows[2].value, json!("1/250"));
        assert_eq!(rows[2].ability.len(), 2);
        assert!(rows[1].ability.is_empty());
    }

    #[test]
    fn long_ability_lists_are_truncated() {
        let ability: Vec<Value> = (1..=9).map(|i| json!(i * 100)).collect();
        assert_eq!(
            summarize_ability(&ability),
            "100, 200, 300, 400, 500, 600, +3 more"
        );
    }
}
