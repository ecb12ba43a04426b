//! Spanish autonomous-community (CCAA) region codes.
//!
//! The INE feed keys regional rows by a two-digit code. Code "00" is
//! reserved for the national aggregate.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Region code of the national aggregate pseudo-region.
pub const NATIONAL_CCAA_CODE: &str = "00";

/// CCAA code to official name, as published by the INE.
pub static CCAA_CODES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("00", "Nacional"),
        ("01", "Andalucía"),
        ("02", "Aragón"),
        ("03", "Asturias, Principado de"),
        ("04", "Balears, Illes"),
        ("05", "Canarias"),
        ("06", "Cantabria"),
        ("07", "Castilla y León"),
        ("08", "Castilla - La Mancha"),
        ("09", "Cataluña"),
        ("10", "Comunitat Valenciana"),
        ("11", "Extremadura"),
        ("12", "Galicia"),
        ("13", "Madrid, Comunidad de"),
        ("14", "Murcia, Región de"),
        ("15", "Navarra, Comunidad Foral de"),
        ("16", "País Vasco"),
        ("17", "Rioja, La"),
        ("18", "Ceuta"),
        ("19", "Melilla"),
    ])
});

/// Look up the official name for a CCAA code.
pub fn ccaa_name(code: &str) -> Option<&'static str> {
    CCAA_CODES.get(code).copied()
}
