//! Delivery-zone math. Fees depend on the haversine distance between the
//! warehouse (company record coordinates) and the delivery address.

use crate::app_error::AppError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Flat fee charged when an address carries no coordinates.
pub const DEFAULT_DELIVERY_FEE: f64 = 10_000.0;

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Zone names as stored on slots and deliveries.
pub const ZONE_NAMES: [&str; 3] = ["inner", "middle", "outer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryZone {
    Inner,
    Middle,
    Outer,
}

impl DeliveryZone {
    pub fn for_distance_km(distance: f64) -> Option<Self> {
        if distance <= 5.0 {
            Some(DeliveryZone::Inner)
        } else if distance <= 15.0 {
            Some(DeliveryZone::Middle)
        } else if distance <= 25.0 {
            Some(DeliveryZone::Outer)
        } else {
            None
        }
    }

    pub fn fee(self) -> f64 {
        match self {
            DeliveryZone::Inner => 0.0,
            DeliveryZone::Middle => 5_000.0,
            DeliveryZone::Outer => 10_000.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryZone::Inner => "inner",
            DeliveryZone::Middle => "middle",
            DeliveryZone::Outer => "outer",
        }
    }
}

/// Computes the delivery fee for a destination. Addresses without
/// coordinates pay the flat default fee; destinations beyond the outermost
/// zone are refused.
pub fn delivery_fee(
    warehouse: (f64, f64),
    destination: Option<(f64, f64)>,
) -> Result<(f64, Option<DeliveryZone>), AppError> {
    let Some((lat, lon)) = destination else {
        return Ok((DEFAULT_DELIVERY_FEE, None));
    };

    let distance = haversine_km(warehouse.0, warehouse.1, lat, lon);
    let zone = DeliveryZone::for_distance_km(distance).ok_or_else(|| {
        AppError::BadRequest("This address is outside our delivery area".into())
    })?;
    Ok((zone.fee(), Some(zone)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASHKENT: (f64, f64) = (41.2995, 69.2401);

    #[test]
    fn zero_distance_for_identical_points() {
        let d = haversine_km(TASHKENT.0, TASHKENT.1, TASHKENT.0, TASHKENT.1);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn tashkent_to_samarkand_is_about_266_km() {
        let d = haversine_km(TASHKENT.0, TASHKENT.1, 39.6542, 66.9597);
        assert!((260.0..272.0).contains(&d), "got {d}");
    }

    #[test]
    fn zones_nest_by_distance() {
        assert_eq!(DeliveryZone::for_distance_km(0.0), Some(DeliveryZone::Inner));
        assert_eq!(DeliveryZone::for_distance_km(5.0), Some(DeliveryZone::Inner));
        assert_eq!(
            DeliveryZone::for_distance_km(5.01),
            Some(DeliveryZone::Middle)
        );
        assert_eq!(
            DeliveryZone::for_distance_km(15.0),
            Some(DeliveryZone::Middle)
        );
        assert_eq!(
            DeliveryZone::for_distance_km(24.9),
            Some(DeliveryZone::Outer)
        );
        assert_eq!(DeliveryZone::for_distance_km(25.1), None);
    }

    #[test]
    fn inner_zone_delivers_free() {
        assert_eq!(DeliveryZone::Inner.fee(), 0.0);
        assert_eq!(DeliveryZone::Middle.fee(), 5_000.0);
        assert_eq!(DeliveryZone::Outer.fee(), 10_000.0);
    }

    #[test]
    fn missing_coordinates_fall_back_to_flat_fee() {
        let (fee, zone) = delivery_fee(TASHKENT, None).unwrap();
        assert_eq!(fee, DEFAULT_DELIVERY_FEE);
        assert_eq!(zone, None);
    }

    #[test]
    fn nearby_address_is_in_the_inner_zone() {
        // About 2 km north of the warehouse.
        let (fee, zone) = delivery_fee(TASHKENT, Some((41.3175, 69.2401))).unwrap();
        assert_eq!(fee, 0.0);
        assert_eq!(zone, Some(DeliveryZone::Inner));
    }

    #[test]
    fn remote_address_is_refused() {
        let err = delivery_fee(TASHKENT, Some((39.6542, 66.9597))).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
