//! Filter type for housing cache and snapshot reads.

use crate::enums::{HousingMetric, HousingTipo};
use serde::{Deserialize, Serialize};

/// Conjunctive filter over housing rows.
///
/// Metric and housing type are mandatory. The region filter has a
/// deliberate special case: `ccaa = Some("00")` selects only the
/// national-aggregate rows, while `ccaa = None` applies no region
/// filter at all. The two must never be conflated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingFilter {
    pub metric: HousingMetric,
    pub tipo: HousingTipo,
    /// Region code filter; `None` = all regions, `Some("00")` = national only.
    pub ccaa: Option<String>,
    /// Inclusive lower bound on the year.
    pub anio_desde: Option<i32>,
    /// Inclusive upper bound on the year.
    pub anio_hasta: Option<i32>,
}

impl HousingFilter {
    pub fn new(metric: HousingMetric, tipo: HousingTipo) -> Self {
        Self {
            metric,
            tipo,
            ccaa: None,
            anio_desde: None,
            anio_hasta: None,
        }
    }

    pub fn with_ccaa(mut self, ccaa: impl Into<String>) -> Self {
        self.ccaa = Some(ccaa.into());
        self
    }

    pub fn with_years(mut self, desde: Option<i32>, hasta: Option<i32>) -> Self {
        self.anio_desde = desde;
        self.anio_hasta = hasta;
        self
    }

    /// Whether a row with the given attributes matches this filter.
    pub fn matches(
        &self,
        metrica: &str,
        tipo_vivienda: &str,
        ccaa_codigo: &str,
        anio: i32,
    ) -> bool {
        if metrica != self.metric.as_label() {
            return false;
        }
        if tipo_vivienda != self.tipo.as_label() {
            return false;
        }
        if let Some(ref code) = self.ccaa {
            // "00" is a literal filter for the national aggregate, not "no filter".
            if ccaa_codigo != code {
                return false;
            }
        }
        if let Some(desde) = self.anio_desde {
            if anio < desde {
                return false;
            }
        }
        if let Some(hasta) = self.anio_hasta {
            if anio > hasta {
                return false;
            }
        }
        true
    }
}
