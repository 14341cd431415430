//! Feature importance report for the dashboard

use crate::bulk::normalize::title_case;
use crate::types::FeatureImportance;

use super::model::ModelBundle;

/// Shown when the model exposes no importances of its own.
const FALLBACK_IMPORTANCE: [(&str, f64); 5] = [
    ("Deriva Histórica", 45.0),
    ("Uso del Equipo", 25.0),
    ("Humedad/Temp", 15.0),
    ("Incertidumbre", 10.0),
    ("Antigüedad", 5.0),
];

/// Importances as percentages (2 dp), labelled and sorted descending.
pub fn feature_importance_list(bundle: Option<&ModelBundle>) -> Vec<FeatureImportance> {
    let from_model = bundle.and_then(|b| {
        let importances = b.model().feature_importances()?;
        if importances.len() != b.feature_names().len() {
            return None;
        }
        let mut list: Vec<FeatureImportance> = b
            .feature_names()
            .iter()
            .zip(importances)
            .filter(|(_, imp)| imp.is_finite())
            .map(|(name, imp)| FeatureImportance {
                variable: title_case(&name.replace('_', " ")),
                importance: (imp * 100.0 * 100.0).round() / 100.0,
            })
            .collect();
        list.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Some(list)
    });

    match from_model {
        Some(list) if !list.is_empty() => list,
        _ => FALLBACK_IMPORTANCE
            .iter()
            .map(|(variable, importance)| FeatureImportance {
                variable: (*variable).to_string(),
                importance: *importance,
            })
            .collect(),
    }
}
