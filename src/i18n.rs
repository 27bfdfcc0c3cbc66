use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use yuuka::derive_struct;

// Include translation TOML at compile time
const EN_US_TOML: &str = include_str!("../res/i18n/en_us.toml");
const ES_ES_TOML: &str = include_str!("../res/i18n/es_es.toml");

derive_struct! {
    #[derive(PartialEq, Serialize, Deserialize)]
    pub Lang {
        header_title: String = "header_title".to_string(),
        label_port: String = "label_port".to_string(),
        label_baud: String = "label_baud".to_string(),
        phase_connection: String = "phase_connection".to_string(),
        phase_commands: String = "phase_commands".to_string(),
        phase_sensor: String = "phase_sensor".to_string(),
        phase_hardware: String = "phase_hardware".to_string(),
        test_connection: String = "test_connection".to_string(),
        test_boot_messages: String = "test_boot_messages".to_string(),
        detail_lines: String = "detail_lines".to_string(),
        detail_no_response: String = "detail_no_response".to_string(),
        test_sensor_detected: String = "test_sensor_detected".to_string(),
        detail_sensor_at: String = "detail_sensor_at".to_string(),
        detail_sensor_missing: String = "detail_sensor_missing".to_string(),
        test_templates: String = "test_templates".to_string(),
        detail_templates: String = "detail_templates".to_string(),
        test_baud_sync: String = "test_baud_sync".to_string(),
        detail_baud_sync: String = "detail_baud_sync".to_string(),
        prompt_hardware: String = "prompt_hardware".to_string(),
        test_hardware: String = "test_hardware".to_string(),
        hardware_skipped: String = "hardware_skipped".to_string(),
        summary_title: String = "summary_title".to_string(),
        summary_passed: String = "summary_passed".to_string(),
        verdict_healthy: String = "verdict_healthy".to_string(),
        verdict_healthy_hint: String = "verdict_healthy_hint".to_string(),
        verdict_degraded: String = "verdict_degraded".to_string(),
        verdict_degraded_hint: String = "verdict_degraded_hint".to_string(),
        verdict_failing: String = "verdict_failing".to_string(),
        verdict_failing_hint: String = "verdict_failing_hint".to_string(),
        check_firmware: String = "check_firmware".to_string(),
        check_baud: String = "check_baud".to_string(),
        check_wiring: String = "check_wiring".to_string(),
        check_port: String = "check_port".to_string(),
        commands_title: String = "commands_title".to_string(),
        cmd_ping: String = "cmd_ping".to_string(),
        cmd_status: String = "cmd_status".to_string(),
        cmd_count: String = "cmd_count".to_string(),
        cmd_info: String = "cmd_info".to_string(),
        cmd_detect: String = "cmd_detect".to_string(),
        cmd_enroll: String = "cmd_enroll".to_string(),
        cmd_verify: String = "cmd_verify".to_string(),
        cmd_delete: String = "cmd_delete".to_string(),
        cmd_empty: String = "cmd_empty".to_string(),
        cmd_hardware: String = "cmd_hardware".to_string(),
        cmd_buzzer_on: String = "cmd_buzzer_on".to_string(),
        cmd_buzzer_off: String = "cmd_buzzer_off".to_string(),
        port_closed: String = "port_closed".to_string(),
        interrupted: String = "interrupted".to_string(),
        unexpected_error: String = "unexpected_error".to_string(),
        no_ports: String = "no_ports".to_string(),
        send_no_reply: String = "send_no_reply".to_string(),
    }
}

static LANG_SELECTED: OnceCell<Lang> = OnceCell::new();
static LOCALE: OnceCell<String> = OnceCell::new();

fn parse_toml_to_lang(content: &str) -> Lang {
    match toml::from_str::<Lang>(content) {
        Ok(l) => l,
        Err(e) => {
            log::warn!(
                "i18n: failed to parse toml: {}\ncontent preview: {}",
                e,
                &content.chars().take(200).collect::<String>()
            );
            // Fallback: return the default Lang (keys as values)
            Lang::default()
        }
    }
}

/// Return a reference to the currently selected `Lang`.
/// Callers can access fields directly, e.g. `i18n::lang().summary_title`.
pub fn lang() -> &'static Lang {
    // English until `init_i18n` picks something else.
    LANG_SELECTED.get_or_init(|| parse_toml_to_lang(EN_US_TOML))
}

/// Locale key chosen by `init_i18n`, or "-" before initialisation.
pub fn locale() -> &'static str {
    LOCALE.get().map(|s| s.as_str()).unwrap_or("-")
}

/// Substitute `{name}` placeholders in a translated template.
pub fn fill(template: &str, values: &[(&str, &dyn std::fmt::Display)]) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        out = out.replace(&format!("{{{name}}}"), &value.to_string());
    }
    out
}

/// Map environment language preferences to one of the bundled locales.
pub(crate) fn pick_locale(prefs: &[String]) -> &'static str {
    for p in prefs {
        if p.starts_with("es") {
            return "es_es";
        }
        if p.starts_with("en") {
            return "en_us";
        }
    }
    "en_us"
}

pub fn init_i18n() {
    // Detect preferred languages from env vars
    let mut prefs: Vec<String> = Vec::new();
    if let Ok(v) = std::env::var("LANGUAGE") {
        prefs.extend(v.split(':').map(|s| s.to_lowercase()));
    }
    if let Ok(v) = std::env::var("LC_ALL") {
        prefs.push(v.to_lowercase());
    }
    if let Ok(v) = std::env::var("LANG") {
        prefs.push(v.to_lowercase());
    }
    // Windows common env
    if let Ok(v) = std::env::var("USERLANGUAGE") {
        prefs.push(v.to_lowercase());
    }
    prefs.retain(|p| !p.is_empty() && p != "c" && p != "posix");

    let chosen = pick_locale(&prefs);
    let content = match chosen {
        "es_es" => ES_ES_TOML,
        _ => EN_US_TOML,
    };
    LOCALE.set(chosen.to_string()).ok();
    LANG_SELECTED.set(parse_toml_to_lang(content)).ok();

    let user = whoami::username();
    log::info!("i18n: user={} locale={}", user, locale());
}
