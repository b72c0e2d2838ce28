//! Per-user alert notification toggles.

use crate::db::DocRef;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Alert settings stored in the `alertSettings` collection (one per user).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AlertSettings {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    #[serde(rename = "User", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub user: Option<DocRef>,

    // ─── Level ───────────────────────────────────────────────────
    #[serde(rename = "Level Account", default)]
    pub level_account: bool,
    #[serde(rename = "Level Ads", default)]
    pub level_ads: bool,
    #[serde(rename = "Level Keyword", default)]
    pub level_keyword: bool,

    // ─── Delivery ────────────────────────────────────────────────
    #[serde(rename = "Send Email Alerts", default)]
    pub send_email_alerts: bool,
    #[serde(rename = "Send SMS Alerts", default)]
    pub send_sms_alerts: bool,
    #[serde(rename = "Send Weekly Summaries", default)]
    pub send_weekly_summaries: bool,

    // ─── Severity ────────────────────────────────────────────────
    #[serde(rename = "Severity Critical", default)]
    pub severity_critical: bool,
    #[serde(rename = "Severity Low", default)]
    pub severity_low: bool,
    #[serde(rename = "Severity Medium", default)]
    pub severity_medium: bool,

    // ─── Type ────────────────────────────────────────────────────
    #[serde(rename = "Type Ad Performance", default)]
    pub type_ad_performance: bool,
    #[serde(rename = "Type Brand Checker", default)]
    pub type_brand_checker: bool,
    #[serde(rename = "Type Budget", default)]
    pub type_budget: bool,
    #[serde(rename = "Type KPI Trends", default)]
    pub type_kpi_trends: bool,
    #[serde(rename = "Type Keyword Performance", default)]
    pub type_keyword_performance: bool,
    #[serde(rename = "Type Landing Page", default)]
    pub type_landing_page: bool,
    #[serde(rename = "Type Optimization Score", default)]
    pub type_optimization_score: bool,
    #[serde(rename = "Type Policy", default)]
    pub type_policy: bool,
    #[serde(rename = "Type Serving Ads", default)]
    pub type_serving_ads: bool,
}

/// Partial update of alert settings; absent toggles are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSettingsPatch {
    #[serde(rename = "Level Account", skip_serializing_if = "Option::is_none")]
    pub level_account: Option<bool>,
    #[serde(rename = "Level Ads", skip_serializing_if = "Option::is_none")]
    pub level_ads: Option<bool>,
    #[serde(rename = "Level Keyword", skip_serializing_if = "Option::is_none")]
    pub level_keyword: Option<bool>,
    #[serde(rename = "Send Email Alerts", skip_serializing_if = "Option::is_none")]
    pub send_email_alerts: Option<bool>,
    #[serde(rename = "Send SMS Alerts", skip_serializing_if = "Option::is_none")]
    pub send_sms_alerts: Option<bool>,
    #[serde(rename = "Send Weekly Summaries", skip_serializing_if = "Option::is_none")]
    pub send_weekly_summaries: Option<bool>,
    #[serde(rename = "Severity Critical", skip_serializing_if = "Option::is_none")]
    pub severity_critical: Option<bool>,
    #[serde(rename = "Severity Low", skip_serializing_if = "Option::is_none")]
    pub severity_low: Option<bool>,
    #[serde(rename = "Severity Medium", skip_serializing_if = "Option::is_none")]
    pub severity_medium: Option<bool>,
    #[serde(rename = "Type Ad Performance", skip_serializing_if = "Option::is_none")]
    pub type_ad_performance: Option<bool>,
    #[serde(rename = "Type Brand Checker", skip_serializing_if = "Option::is_none")]
    pub type_brand_checker: Option<bool>,
    #[serde(rename = "Type Budget", skip_serializing_if = "Option::is_none")]
    pub type_budget: Option<bool>,
    #[serde(rename = "Type KPI Trends", skip_serializing_if = "Option::is_none")]
    pub type_kpi_trends: Option<bool>,
    #[serde(rename = "Type Keyword Performance", skip_serializing_if = "Option::is_none")]
    pub type_keyword_performance: Option<bool>,
    #[serde(rename = "Type Landing Page", skip_serializing_if = "Option::is_none")]
    pub type_landing_page: Option<bool>,
    #[serde(rename = "Type Optimization Score", skip_serializing_if = "Option::is_none")]
    pub type_optimization_score: Option<bool>,
    #[serde(rename = "Type Policy", skip_serializing_if = "Option::is_none")]
    pub type_policy: Option<bool>,
    #[serde(rename = "Type Serving Ads", skip_serializing_if = "Option::is_none")]
    pub type_serving_ads: Option<bool>,
}

impl AlertSettings {
    /// Overlay the toggles present in `patch`.
    pub fn apply(&mut self, patch: &AlertSettingsPatch) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field {
                    self.$field = v;
                })*
            };
        }

        overlay!(
            level_account,
            level_ads,
            level_keyword,
            send_email_alerts,
            send_sms_alerts,
            send_weekly_summaries,
            severity_critical,
            severity_low,
            severity_medium,
            type_ad_performance,
            type_brand_checker,
            type_budget,
            type_kpi_trends,
            type_keyword_performance,
            type_landing_page,
            type_optimization_score,
            type_policy,
            type_serving_ads,
        );
    }

    /// Settings for a user who has never saved any: every toggle on.
    pub fn defaults_for(user: DocRef) -> Self {
        Self {
            id: String::new(),
            user: Some(user),
            level_account: true,
            level_ads: true,
            level_keyword: true,
            send_email_alerts: true,
            send_sms_alerts: false,
            send_weekly_summaries: true,
            severity_critical: true,
            severity_low: true,
            severity_medium: true,
            type_ad_performance: true,
            type_brand_checker: true,
            type_budget: true,
            type_kpi_trends: true,
            type_keyword_performance: true,
            type_landing_page: true,
            type_optimization_score: true,
            type_policy: true,
            type_serving_ads: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_overlays_only_given_toggles() {
        let mut settings = AlertSettings::defaults_for(DocRef::user("u1"));
        let patch = AlertSettingsPatch {
            type_budget: Some(false),
            send_sms_alerts: Some(true),
            ..Default::default()
        };

        settings.apply(&patch);

        assert!(!settings.type_budget);
        assert!(settings.send_sms_alerts);
        assert!(settings.level_account);
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = AlertSettingsPatch {
            level_ads: Some(false),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({ "Level Ads": false }));
    }
}
