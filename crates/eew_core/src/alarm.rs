//! Global alarm arbitration across concurrent events.
//!
//! One audible alarm channel is shared by every event. A volcanic alert
//! outranks everything; otherwise alarms closer together than the minimum
//! interval are suppressed unless they escalate.

use crate::{
    AlarmPriority, AlarmState, Counters, EventId, EventType, Signal, SignalEnvelope,
    SuppressReason,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmDecision {
    Fire { overrode: bool },
    Suppress(SuppressReason),
}

pub fn priority_for(event_type: EventType) -> AlarmPriority {
    match event_type {
        EventType::Aftershock => AlarmPriority::Low,
        EventType::Main => AlarmPriority::Normal,
        EventType::Volcano => AlarmPriority::Critical,
    }
}

/// Priority of the second alarm raised when an event escalates to a tsunami warning.
pub fn tsunami_priority(event_type: EventType) -> AlarmPriority {
    priority_for(event_type).max(AlarmPriority::Elevated)
}

pub fn arbitrate(
    alarm: &AlarmState,
    volcano_active: bool,
    priority: AlarmPriority,
    now: f64,
    min_interval_s: f64,
) -> AlarmDecision {
    if volcano_active && priority < AlarmPriority::Critical {
        return AlarmDecision::Suppress(SuppressReason::VolcanoPriority);
    }
    match alarm.last_fired {
        Some(last) if now - last < min_interval_s => {
            if priority >= AlarmPriority::Elevated {
                AlarmDecision::Fire { overrode: true }
            } else {
                AlarmDecision::Suppress(SuppressReason::WithinInterval)
            }
        }
        _ => AlarmDecision::Fire { overrode: false },
    }
}

/// Arbitrate, update the shared alarm clock on fire, and emit the outcome.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sound(
    alarm: &mut AlarmState,
    counters: &mut Counters,
    volcano_active: bool,
    event_id: &EventId,
    event_type: EventType,
    priority: AlarmPriority,
    now: f64,
    min_interval_s: f64,
) -> SignalEnvelope {
    let signal = match arbitrate(alarm, volcano_active, priority, now, min_interval_s) {
        AlarmDecision::Fire { overrode } => {
            alarm.last_fired = Some(now);
            Signal::AlarmFired {
                event_id: event_id.clone(),
                event_type,
                priority,
                overrode,
            }
        }
        AlarmDecision::Suppress(reason) => Signal::AlarmSuppressed {
            event_id: event_id.clone(),
            event_type,
            priority,
            reason,
        },
    };
    crate::emit(counters, now, signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: f64 = 5.0;

    fn fired_at(t: f64) -> AlarmState {
        AlarmState {
            last_fired: Some(t),
        }
    }

    #[test]
    fn first_alarm_always_fires() {
        for event_type in [EventType::Main, EventType::Aftershock, EventType::Volcano] {
            let decision = arbitrate(
                &AlarmState::default(),
                false,
                priority_for(event_type),
                0.0,
                INTERVAL,
            );
            assert_eq!(decision, AlarmDecision::Fire { overrode: false });
        }
    }

    #[test]
    fn second_main_alarm_inside_interval_is_suppressed() {
        let decision = arbitrate(&fired_at(10.0), false, AlarmPriority::Normal, 13.0, INTERVAL);
        assert_eq!(
            decision,
            AlarmDecision::Suppress(SuppressReason::WithinInterval)
        );
    }

    #[test]
    fn alarm_after_interval_fires_again() {
        let decision = arbitrate(&fired_at(10.0), false, AlarmPriority::Low, 15.0, INTERVAL);
        assert_eq!(decision, AlarmDecision::Fire { overrode: false });
    }

    #[test]
    fn volcanic_alarm_overrides_inside_interval() {
        let decision = arbitrate(&fired_at(10.0), true, AlarmPriority::Critical, 11.0, INTERVAL);
        assert_eq!(decision, AlarmDecision::Fire { overrode: true });
    }

    #[test]
    fn tsunami_escalation_overrides_inside_interval() {
        let priority = tsunami_priority(EventType::Main);
        assert_eq!(priority, AlarmPriority::Elevated);
        let decision = arbitrate(&fired_at(10.0), false, priority, 12.0, INTERVAL);
        assert_eq!(decision, AlarmDecision::Fire { overrode: true });
    }

    #[test]
    fn active_volcano_alert_silences_lower_priorities() {
        for priority in [
            AlarmPriority::Low,
            AlarmPriority::Normal,
            AlarmPriority::Elevated,
        ] {
            let decision = arbitrate(&AlarmState::default(), true, priority, 100.0, INTERVAL);
            assert_eq!(
                decision,
                AlarmDecision::Suppress(SuppressReason::VolcanoPriority)
            );
        }
    }

    #[test]
    fn sound_records_fire_time_only_when_fired() {
        let mut alarm = AlarmState::default();
        let mut counters = Counters::default();
        let id = EventId("EVT-1".to_string());

        let first = sound(
            &mut alarm,
            &mut counters,
            false,
            &id,
            EventType::Main,
            AlarmPriority::Normal,
            2.0,
            INTERVAL,
        );
        assert!(matches!(first.signal, Signal::AlarmFired { overrode: false, .. }));
        assert_eq!(alarm.last_fired, Some(2.0));

        let second = sound(
            &mut alarm,
            &mut counters,
            false,
            &id,
            EventType::Main,
            AlarmPriority::Normal,
            4.0,
            INTERVAL,
        );
        assert!(matches!(second.signal, Signal::AlarmSuppressed { .. }));
        assert_eq!(alarm.last_fired, Some(2.0));
        assert_ne!(first.id, second.id);
    }
}
