use serde::{Deserialize, Serialize};

use crate::sync::error::{validation, SyncResult};

/// Where an observation was made.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> SyncResult<Self> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(validation("O nome do local não pode estar vazio"));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(validation(format!("Latitude inválida: {latitude}")));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(validation(format!("Longitude inválida: {longitude}")));
        }
        Ok(Self {
            name,
            latitude,
            longitude,
        })
    }
}

/// Reads a `location` column, dropping values that are not a complete location object.
pub(crate) fn lenient_location<'de, D>(deserializer: D) -> Result<Option<Location>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::error::SyncErrorCode;

    #[test]
    fn rejects_out_of_range_coordinates() {
        let err = Location::new("Lagoa", 91.0, 0.0).unwrap_err();
        assert_eq!(err.code, SyncErrorCode::Validation);
        assert!(Location::new("Lagoa", 10.0, -181.0).is_err());
        assert!(Location::new("   ", 10.0, 10.0).is_err());
    }

    #[test]
    fn trims_name() {
        let location = Location::new("  Parque Ibirapuera ", -23.58, -46.65).unwrap();
        assert_eq!(location.name, "Parque Ibirapuera");
    }
}
