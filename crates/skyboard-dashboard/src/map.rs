//! Embedded map for the resolved location.

const MAP_ZOOM: u8 = 14;

/// Embeddable map URL, or `None` until both coordinates are known.
pub fn map_embed_url(latitude: Option<f64>, longitude: Option<f64>) -> Option<String> {
    let (lat, lon) = (latitude?, longitude?);
    Some(format!(
        "https://maps.google.com/maps?q={},{}&z={}&output=embed",
        lat, lon, MAP_ZOOM
    ))
}
