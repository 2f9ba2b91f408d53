//! Seconds-until-shaking boards for named stations.

use ahash::AHashMap;

use crate::attenuation::to_discrete_scale;
use crate::{ActiveEvent, Constants, Countdown, CountdownList, EventType, StationId};

/// Builds the main (main shock and volcanic) and secondary (aftershock) boards.
///
/// Only alerting events contribute. A station reached by several events of the
/// same type shows the soonest arrival.
pub fn build(
    events: &[ActiveEvent],
    elapsed: f64,
    constants: &Constants,
) -> (CountdownList, CountdownList) {
    let mut soonest: AHashMap<(StationId, EventType), Countdown> = AHashMap::new();

    for event in events.iter().filter(|e| e.is_alerting()) {
        let event_elapsed = elapsed - event.start_time;
        if event_elapsed < 0.0 {
            continue;
        }
        for &index in &event.major_indices {
            let Some(impact) = event.impacts.get(index) else {
                continue;
            };
            if impact.s_intensity <= constants.countdown_min_intensity {
                continue;
            }
            let seconds = (impact.s_time - event_elapsed).max(0.0);
            let key = (impact.station.id.clone(), event.event_type);
            let replace = soonest
                .get(&key)
                .is_none_or(|existing| seconds < existing.seconds);
            if replace {
                soonest.insert(
                    key,
                    Countdown {
                        station_id: impact.station.id.clone(),
                        name: impact.station.name.clone(),
                        seconds,
                        intensity: impact.s_intensity,
                        class: to_discrete_scale(impact.s_intensity),
                        event_type: event.event_type,
                    },
                );
            }
        }
    }

    let mut all: Vec<Countdown> = soonest.into_values().collect();
    all.sort_by(|a, b| {
        a.seconds
            .total_cmp(&b.seconds)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.station_id.cmp(&b.station_id))
    });

    let size = constants.countdown_size;
    let main = all
        .iter()
        .filter(|c| matches!(c.event_type, EventType::Main | EventType::Volcano))
        .take(size)
        .cloned()
        .collect();
    let secondary = all
        .iter()
        .filter(|c| c.event_type == EventType::Aftershock)
        .take(size)
        .cloned()
        .collect();
    (main, secondary)
}
