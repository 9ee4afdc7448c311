/// Both components present, finite, and within WGS84 bounds.
pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> bool {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => {
            (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
        }
        _ => false,
    }
}
