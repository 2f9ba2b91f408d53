use ahash::AHashMap;

use crate::geo::{distance_km, is_offshore};
use crate::{Station, StationId, StationType};

/// The immutable station set, shared read-only by every other component.
#[derive(Debug, Clone, Default)]
pub struct StationNetwork {
    stations: Vec<Station>,
    index: AHashMap<StationId, usize>,
}

impl StationNetwork {
    pub fn new(stations: Vec<Station>) -> Self {
        let index = stations
            .iter()
            .enumerate()
            .map(|(i, station)| (station.id.clone(), i))
            .collect();
        Self { stations, index }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn get(&self, id: &StationId) -> Option<&Station> {
        self.index.get(id).map(|&i| &self.stations[i])
    }

    pub fn station_type(&self, id: &StationId) -> Option<StationType> {
        self.get(id).map(|station| station.station_type)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn of_type(&self, station_type: StationType) -> impl Iterator<Item = &Station> {
        self.stations
            .iter()
            .filter(move |station| station.station_type == station_type)
    }

    /// Human-readable place name: the nearest major station, prefixed for sea areas.
    pub fn region_name(&self, lat: f64, lng: f64) -> String {
        let nearest = self
            .stations
            .iter()
            .filter(|station| station.is_major)
            .map(|station| (distance_km(lat, lng, station.lat, station.lng), station))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((_, station)) if is_offshore(lat, lng) => format!("Off {}", station.name),
            Some((_, station)) => format!("Near {}", station.name),
            None if is_offshore(lat, lng) => "Open sea".to_string(),
            None => "Unknown area".to_string(),
        }
    }
}
